//! 网格资源与骨骼网格组件

mod component;
mod material;
mod mesh;
mod submesh;

pub use component::SkeletalMeshComponent;
pub use material::{Material, MATERIAL_CASTS_SHADOW, MATERIAL_DOUBLE_SIDED, MATERIAL_RECEIVES_SHADOW};
pub use mesh::{MeshAsset, MeshKind};
pub use submesh::SubMesh;

use glam::{Vec2, Vec3};

/// 蒙皮顶点
///
/// 骨骼权重已归约为最多 4 个并归一化，未使用的槽位权重为 0。
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct SkinnedVertex {
    pub position: Vec3,
    pub normal: Vec3,
    pub tangent: Vec3,
    pub uv: Vec2,
    pub bone_indices: [u32; 4],
    pub bone_weights: [f32; 4],
}

impl SkinnedVertex {
    /// 无骨骼影响的顶点
    pub fn new(position: Vec3, normal: Vec3, tangent: Vec3, uv: Vec2) -> Self {
        Self {
            position,
            normal,
            tangent,
            uv,
            bone_indices: [0; 4],
            bone_weights: [0.0; 4],
        }
    }
}
