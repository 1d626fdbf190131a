//! 骨架：按拓扑序存储的骨骼数组
//!
//! 每个骨骼的父索引都小于自身索引，因此任何逐骨骼的层级计算
//! 都可以单次正序遍历完成，不需要递归。

use glam::Mat4;
use std::collections::HashMap;

use crate::{Result, SkinError};

use super::{Bone, Pose, RawBone};

/// 骨架（构建后不可变）
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Skeleton {
    bones: Vec<Bone>,
    name_to_index: HashMap<String, usize>,
}

impl Skeleton {
    /// 空骨架
    pub fn empty() -> Self {
        Self::default()
    }

    /// 从导入数据构建骨骼层级
    ///
    /// 失败时（无骨骼、重名、存在环）记录错误并返回空骨架。
    pub fn build_hierarchy(raw_bones: &[RawBone]) -> Self {
        Self::build_hierarchy_with_offset(raw_bones, Mat4::IDENTITY)
    }

    /// 同 [`Skeleton::build_hierarchy`]，逆绑定矩阵额外包含网格几何偏移
    pub fn build_hierarchy_with_offset(raw_bones: &[RawBone], geometric_offset: Mat4) -> Self {
        match Self::try_build(raw_bones, geometric_offset) {
            Ok(skeleton) => skeleton,
            Err(e) => {
                log::error!("Failed to build skeleton hierarchy: {}", e);
                Self::empty()
            }
        }
    }

    /// 构建骨骼层级，返回具体错误
    pub fn try_build(raw_bones: &[RawBone], geometric_offset: Mat4) -> Result<Self> {
        if raw_bones.is_empty() {
            return Err(SkinError::InvalidSkeleton("no bones found".to_string()));
        }

        let mut raw_index: HashMap<&str, usize> = HashMap::with_capacity(raw_bones.len());
        for (i, raw) in raw_bones.iter().enumerate() {
            if raw_index.insert(raw.name.as_str(), i).is_some() {
                return Err(SkinError::InvalidSkeleton(format!(
                    "duplicate bone name '{}'",
                    raw.name
                )));
            }
        }

        // 建立子节点列表，保持输入顺序
        let mut roots = Vec::new();
        let mut children: Vec<Vec<usize>> = vec![Vec::new(); raw_bones.len()];
        for (i, raw) in raw_bones.iter().enumerate() {
            match raw.parent.as_deref() {
                None => roots.push(i),
                Some(parent_name) => match raw_index.get(parent_name) {
                    Some(&parent) => children[parent].push(i),
                    None => {
                        log::warn!(
                            "骨骼 '{}' 的父骨骼 '{}' 不存在，作为根骨骼处理",
                            raw.name,
                            parent_name
                        );
                        roots.push(i);
                    }
                },
            }
        }

        // 深度优先展开，父节点总是先于子节点获得索引
        let mut order: Vec<(usize, i32)> = Vec::with_capacity(raw_bones.len());
        for &root in &roots {
            flatten_recursive(root, -1, &children, &mut order);
        }

        // 从根出发无法到达的骨骼一定处在环上
        if order.len() != raw_bones.len() {
            let mut reached = vec![false; raw_bones.len()];
            for &(i, _) in &order {
                reached[i] = true;
            }
            let cyclic: Vec<&str> = raw_bones
                .iter()
                .enumerate()
                .filter(|(i, _)| !reached[*i])
                .map(|(_, raw)| raw.name.as_str())
                .collect();
            return Err(SkinError::InvalidSkeleton(format!(
                "cycle detected among bones {:?}",
                cyclic
            )));
        }

        let mut bones = Vec::with_capacity(order.len());
        for (raw_i, parent_index) in order {
            let raw = &raw_bones[raw_i];
            let det = raw.global_bind.determinant();
            if det == 0.0 || !det.is_finite() {
                return Err(SkinError::InvalidSkeleton(format!(
                    "bone '{}' has a singular bind matrix",
                    raw.name
                )));
            }
            bones.push(Bone {
                name: raw.name.clone(),
                parent_index,
                inverse_bind_matrix: raw.global_bind.inverse() * geometric_offset,
                local_bind_matrix: raw.local_bind,
            });
        }

        let skeleton = Self::from_bones(bones)?;
        log::debug!(
            "骨骼层级构建完成: {} 个骨骼, {} 个根骨骼",
            skeleton.bone_count(),
            roots.len()
        );
        Ok(skeleton)
    }

    /// 从已排好序的骨骼数组创建（用于缓存加载），会校验拓扑序
    pub fn from_bones(bones: Vec<Bone>) -> Result<Self> {
        let mut name_to_index = HashMap::with_capacity(bones.len());
        for (i, bone) in bones.iter().enumerate() {
            if name_to_index.insert(bone.name.clone(), i).is_some() {
                return Err(SkinError::InvalidSkeleton(format!(
                    "duplicate bone name '{}'",
                    bone.name
                )));
            }
        }
        let skeleton = Self { bones, name_to_index };
        skeleton.validate()?;
        Ok(skeleton)
    }

    /// 校验层级：父索引为 -1 或指向更靠前的骨骼
    pub fn validate(&self) -> Result<()> {
        for (i, bone) in self.bones.iter().enumerate() {
            if bone.parent_index < -1 || bone.parent_index >= i as i32 {
                return Err(SkinError::InvalidSkeleton(format!(
                    "bone {} '{}' has parent index {} (bones must be in topological order)",
                    i, bone.name, bone.parent_index
                )));
            }
        }
        Ok(())
    }

    /// 获取骨骼数量
    pub fn bone_count(&self) -> usize {
        self.bones.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bones.is_empty()
    }

    /// 获取骨骼
    pub fn bone(&self, index: usize) -> Option<&Bone> {
        self.bones.get(index)
    }

    pub fn bones(&self) -> &[Bone] {
        &self.bones
    }

    /// 名称 -> 索引映射
    pub fn name_map(&self) -> &HashMap<String, usize> {
        &self.name_to_index
    }

    /// 通过名称查找骨骼
    pub fn find_bone(&self, name: &str) -> Option<usize> {
        self.name_to_index.get(name).copied()
    }

    /// 父索引等于 `bone_index` 的所有骨骼，`-1` 返回全部根骨骼
    pub fn children_of(&self, bone_index: i32) -> Vec<usize> {
        self.bones
            .iter()
            .enumerate()
            .filter(|(_, bone)| bone.parent_index == bone_index)
            .map(|(i, _)| i)
            .collect()
    }

    /// 逆绑定矩阵，越界返回单位矩阵
    pub fn inverse_bind_pose(&self, bone_index: usize) -> Mat4 {
        self.bones
            .get(bone_index)
            .map(|b| b.inverse_bind_matrix)
            .unwrap_or(Mat4::IDENTITY)
    }

    /// 参考姿势（绑定时的局部变换）
    pub fn reference_pose(&self) -> Pose {
        Pose::from_transforms(self.bones.iter().map(Bone::reference_transform).collect())
    }
}

/// 递归展开一棵子树
fn flatten_recursive(raw: usize, parent_index: i32, children: &[Vec<usize>], order: &mut Vec<(usize, i32)>) {
    let index = order.len() as i32;
    order.push((raw, parent_index));
    for &child in &children[raw] {
        flatten_recursive(child, index, children, order);
    }
}
