//! 顶点权重归约
//!
//! 导入时每个控制点可能挂有任意数量的骨骼影响，这里裁剪为最多 4 个并归一化。

use std::collections::HashMap;

use crate::config::SkinningConfig;
use crate::model::SkinnedVertex;
use crate::skeleton::Skeleton;

/// 每个顶点保留的最大骨骼影响数
pub const MAX_INFLUENCES: usize = 4;

/// 归约后的顶点骨骼影响
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct VertexInfluences {
    pub bone_indices: [u32; MAX_INFLUENCES],
    pub bone_weights: [f32; MAX_INFLUENCES],
    /// 没有任何有效权重，整体绑定到兜底骨骼
    pub used_fallback: bool,
}

impl VertexInfluences {
    /// 全部权重绑定到单根骨骼
    pub fn single(bone: u32) -> Self {
        Self {
            bone_indices: [bone, 0, 0, 0],
            bone_weights: [1.0, 0.0, 0.0, 0.0],
            used_fallback: false,
        }
    }

    /// 非零影响的数量
    pub fn count(&self) -> usize {
        self.bone_weights.iter().filter(|w| **w > 0.0).count()
    }

    /// 写入顶点
    pub fn apply_to(&self, vertex: &mut SkinnedVertex) {
        vertex.bone_indices = self.bone_indices;
        vertex.bone_weights = self.bone_weights;
    }
}

/// 归约原始权重
///
/// 丢弃越界索引、非有限值和不大于 `weight_epsilon` 的权重，合并重复骨骼，
/// 按权重降序（相同权重时索引小者优先）保留前 4 个并归一化。
/// 什么都没剩下时全部权重交给配置的兜底骨骼。
pub fn reduce_influences(raw: &[(u32, f32)], bone_count: usize, config: &SkinningConfig) -> VertexInfluences {
    let valid: Vec<(u32, f32)> = raw
        .iter()
        .copied()
        .filter(|&(bone, weight)| {
            let keep = (bone as usize) < bone_count && weight.is_finite() && weight > config.weight_epsilon;
            if !keep {
                log::debug!("丢弃骨骼影响: bone={}, weight={}", bone, weight);
            }
            keep
        })
        .collect();

    // 先按最大权重缩放到 (0, 1]，合并与求和都不会溢出
    let peak = valid.iter().fold(0.0f32, |m, &(_, w)| m.max(w));
    let mut merged: Vec<(u32, f32)> = Vec::with_capacity(valid.len());
    for (bone, weight) in valid {
        let weight = weight / peak;
        if weight <= 0.0 {
            continue;
        }
        match merged.iter_mut().find(|(b, _)| *b == bone) {
            Some((_, w)) => *w += weight,
            None => merged.push((bone, weight)),
        }
    }

    if merged.is_empty() {
        let mut influences = VertexInfluences::single(config.fallback_bone.resolve(bone_count));
        influences.used_fallback = true;
        return influences;
    }

    merged.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));
    merged.truncate(MAX_INFLUENCES);

    let total: f32 = merged.iter().map(|(_, w)| w).sum();
    let mut influences = VertexInfluences {
        bone_indices: [0; MAX_INFLUENCES],
        bone_weights: [0.0; MAX_INFLUENCES],
        used_fallback: false,
    };
    for (slot, (bone, weight)) in merged.into_iter().enumerate() {
        influences.bone_indices[slot] = bone;
        influences.bone_weights[slot] = weight / total;
    }
    influences
}

/// 按骨骼名称归约原始权重，未知名称直接丢弃
pub fn reduce_named_influences(
    raw: &[(String, f32)],
    skeleton: &Skeleton,
    config: &SkinningConfig,
) -> VertexInfluences {
    let resolved: Vec<(u32, f32)> = raw
        .iter()
        .filter_map(|(name, weight)| match skeleton.find_bone(name) {
            Some(index) => Some((index as u32, *weight)),
            None => {
                log::debug!("权重引用了未知骨骼: {}", name);
                None
            }
        })
        .collect();
    reduce_influences(&resolved, skeleton.bone_count(), config)
}

/// 把按控制点记录的原始权重写入顶点
///
/// `control_points[i]` 是第 i 个顶点对应的控制点。返回使用兜底骨骼的顶点数。
pub fn apply_control_point_weights(
    vertices: &mut [SkinnedVertex],
    control_points: &[u32],
    raw_weights: &HashMap<u32, Vec<(String, f32)>>,
    skeleton: &Skeleton,
    config: &SkinningConfig,
) -> usize {
    // 同一控制点被多个顶点共享，只归约一次
    let mut cache: HashMap<u32, VertexInfluences> = HashMap::new();
    let mut fallback_count = 0;

    for (vertex, control_point) in vertices.iter_mut().zip(control_points) {
        let influences = *cache.entry(*control_point).or_insert_with(|| match raw_weights.get(control_point) {
            Some(raw) => reduce_named_influences(raw, skeleton, config),
            None => reduce_influences(&[], skeleton.bone_count(), config),
        });
        if influences.used_fallback {
            fallback_count += 1;
        }
        influences.apply_to(vertex);
    }

    if fallback_count > 0 {
        log::warn!(
            "{} 个顶点没有有效骨骼权重，已绑定到骨骼 {}",
            fallback_count,
            config.fallback_bone.resolve(skeleton.bone_count())
        );
    }
    fallback_count
}
