//! 蒙皮计算
//!
//! 蒙皮矩阵每帧只计算一次，之后既可以在 CPU 上改写顶点缓冲区，
//! 也可以原样导出给渲染端。

mod matrices;
mod skinning;
mod weights;

pub use matrices::{compute_skinning_matrices, compute_skinning_matrices_into, SkinningPalette};
pub use skinning::{compute_skinning, compute_skinning_into, skin_vertex, SkinningContext};
pub use weights::{
    apply_control_point_weights, reduce_influences, reduce_named_influences, VertexInfluences,
    MAX_INFLUENCES,
};

use glam::Mat4;

use crate::model::SkinnedVertex;

/// 蒙皮输入数据
pub struct SkinningInput<'a> {
    /// 静止姿势下的顶点
    pub vertices: &'a [SkinnedVertex],
    /// 蒙皮矩阵（已乘以逆绑定矩阵）
    pub bone_matrices: &'a [Mat4],
}

/// 交给渲染端的蒙皮结果
#[derive(Clone, Copy, Debug)]
pub enum SkinningOutput<'a> {
    /// 已在 CPU 上变形的顶点
    Vertices(&'a [SkinnedVertex]),
    /// 蒙皮矩阵调色板，由渲染端逐顶点应用
    Matrices(&'a [Mat4]),
}
