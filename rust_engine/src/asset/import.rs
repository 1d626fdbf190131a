//! 导入数据与网格资源构建

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use glam::{Mat4, Vec2, Vec3};

use crate::animation::{AnimationClip, FrameRate};
use crate::config::SkinningConfig;
use crate::model::{Material, MeshAsset, MeshKind, SkinnedVertex, SubMesh};
use crate::skeleton::{RawBone, Skeleton};
use crate::skinning::apply_control_point_weights;
use crate::{Result, SkinError};

/// 导入端提供的动画栈（只有时间信息）
#[derive(Clone, Debug, PartialEq)]
pub struct RawAnimationStack {
    pub name: String,
    /// 开始时间（秒）
    pub start_time: f32,
    /// 结束时间（秒）
    pub stop_time: f32,
    pub frame_rate: FrameRate,
}

/// 导入端提供的顶点
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct RawVertex {
    pub position: Vec3,
    pub normal: Vec3,
    pub tangent: Vec3,
    pub uv: Vec2,
    /// 顶点所属控制点，蒙皮权重按控制点记录
    pub control_point: u32,
}

/// 一次导入得到的全部原始数据
#[derive(Clone, Debug, Default)]
pub struct RawMeshData {
    pub name: String,
    pub materials: Vec<Material>,
    pub vertices: Vec<RawVertex>,
    pub indices: Vec<u32>,
    pub subsets: Vec<SubMesh>,
    /// 为空时构建静态网格
    pub bones: Vec<RawBone>,
    /// 网格节点的几何偏移，先于逆绑定矩阵作用在顶点上
    pub geometric_offset: Mat4,
    /// 控制点 -> (骨骼名, 权重)
    pub skin_weights: HashMap<u32, Vec<(String, f32)>>,
    pub animation_stacks: Vec<RawAnimationStack>,
}

/// 网格导入器（具体文件格式由调用方实现）
pub trait MeshImporter {
    fn import(&mut self, path: &Path) -> Result<RawMeshData>;
}

/// 由原始数据构建网格资源
///
/// 有骨骼时构建骨架、归约权重并为每个动画栈创建剪辑；
/// 任何一步失败都返回错误，不产生半成品。
pub fn build_mesh_asset(raw: RawMeshData, config: &SkinningConfig) -> Result<MeshAsset> {
    if raw.vertices.is_empty() {
        return Err(SkinError::Import(format!("mesh '{}' has no vertices", raw.name)));
    }

    let mut vertices: Vec<SkinnedVertex> = raw
        .vertices
        .iter()
        .map(|v| SkinnedVertex::new(v.position, v.normal, v.tangent, v.uv))
        .collect();

    let kind = if raw.bones.is_empty() {
        if !raw.skin_weights.is_empty() {
            log::warn!("网格 '{}' 有蒙皮权重但没有骨骼，按静态网格处理", raw.name);
        }
        MeshKind::Static
    } else {
        let skeleton = Skeleton::try_build(&raw.bones, raw.geometric_offset)?;
        let control_points: Vec<u32> = raw.vertices.iter().map(|v| v.control_point).collect();
        apply_control_point_weights(&mut vertices, &control_points, &raw.skin_weights, &skeleton, config);

        let clips = raw
            .animation_stacks
            .iter()
            .map(|stack| Arc::new(AnimationClip::from_stack_metadata(stack)))
            .collect();
        MeshKind::Skeletal {
            skeleton: Arc::new(skeleton),
            clips,
        }
    };

    let mesh = MeshAsset {
        name: raw.name,
        materials: raw.materials,
        vertices,
        indices: raw.indices,
        subsets: raw.subsets,
        kind,
    };
    mesh.validate()?;
    Ok(mesh)
}
