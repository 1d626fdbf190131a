//! 顶点蒙皮计算（线性混合蒙皮）

use glam::{Mat4, Vec3};
use rayon::prelude::*;

use crate::config::SkinningConfig;
use crate::model::SkinnedVertex;

use super::SkinningInput;

/// 蒙皮上下文
#[derive(Clone, Copy, Debug)]
pub struct SkinningContext {
    /// 顶点数超过此值时并行计算
    pub parallel_threshold: usize,
}

impl SkinningContext {
    pub fn from_config(config: &SkinningConfig) -> Self {
        Self {
            parallel_threshold: config.parallel_vertex_threshold,
        }
    }
}

impl Default for SkinningContext {
    fn default() -> Self {
        Self::from_config(&SkinningConfig::default())
    }
}

/// 计算蒙皮
pub fn compute_skinning(input: &SkinningInput) -> Vec<SkinnedVertex> {
    let mut output = Vec::with_capacity(input.vertices.len());
    compute_skinning_into(input, &mut output, &SkinningContext::default());
    output
}

/// 计算蒙皮并写入已有缓冲区
pub fn compute_skinning_into(input: &SkinningInput, output: &mut Vec<SkinnedVertex>, context: &SkinningContext) {
    output.clear();
    output.extend_from_slice(input.vertices);

    let matrices = input.bone_matrices;
    if output.len() > context.parallel_threshold {
        output
            .par_iter_mut()
            .zip(input.vertices.par_iter())
            .for_each(|(out, vertex)| *out = skin_vertex(vertex, matrices));
    } else {
        for (out, vertex) in output.iter_mut().zip(input.vertices) {
            *out = skin_vertex(vertex, matrices);
        }
    }
}

/// 计算单个顶点的蒙皮
///
/// 法线和切线只做方向变换，混合后不重新归一化。
/// 所有权重都为 0 的顶点原样返回。
pub fn skin_vertex(vertex: &SkinnedVertex, matrices: &[Mat4]) -> SkinnedVertex {
    let mut position = Vec3::ZERO;
    let mut normal = Vec3::ZERO;
    let mut tangent = Vec3::ZERO;
    let mut influenced = false;

    for (&bone, &weight) in vertex.bone_indices.iter().zip(&vertex.bone_weights) {
        if weight == 0.0 {
            continue;
        }
        influenced = true;
        let m = get_matrix(matrices, bone);
        position += m.transform_point3(vertex.position) * weight;
        normal += m.transform_vector3(vertex.normal) * weight;
        tangent += m.transform_vector3(vertex.tangent) * weight;
    }

    if !influenced {
        return *vertex;
    }

    SkinnedVertex {
        position,
        normal,
        tangent,
        ..*vertex
    }
}

fn get_matrix(matrices: &[Mat4], index: u32) -> Mat4 {
    matrices.get(index as usize).copied().unwrap_or(Mat4::IDENTITY)
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::{Quat, Vec2};

    fn vertex(position: Vec3, bones: [u32; 4], weights: [f32; 4]) -> SkinnedVertex {
        SkinnedVertex {
            position,
            normal: Vec3::Y,
            tangent: Vec3::X,
            uv: Vec2::new(0.25, 0.75),
            bone_indices: bones,
            bone_weights: weights,
        }
    }

    #[test]
    fn test_identity_matrices_keep_vertex() {
        let v = vertex(Vec3::new(1.0, 2.0, 3.0), [0, 1, 0, 0], [0.5, 0.5, 0.0, 0.0]);
        let out = skin_vertex(&v, &[Mat4::IDENTITY, Mat4::IDENTITY]);
        assert!(out.position.abs_diff_eq(v.position, 1e-6));
        assert!(out.normal.abs_diff_eq(v.normal, 1e-6));
        assert_eq!(out.uv, v.uv);
    }

    #[test]
    fn test_weighted_blend_of_translations() {
        let matrices = [
            Mat4::from_translation(Vec3::new(10.0, 0.0, 0.0)),
            Mat4::from_translation(Vec3::new(0.0, 10.0, 0.0)),
        ];
        let v = vertex(Vec3::ZERO, [0, 1, 0, 0], [0.25, 0.75, 0.0, 0.0]);
        let out = skin_vertex(&v, &matrices);
        assert!(out.position.abs_diff_eq(Vec3::new(2.5, 7.5, 0.0), 1e-5));
        // 方向变换忽略平移
        assert!(out.normal.abs_diff_eq(Vec3::Y, 1e-6));
        assert!(out.tangent.abs_diff_eq(Vec3::X, 1e-6));
    }

    #[test]
    fn test_blended_normal_not_renormalized() {
        let matrices = [
            Mat4::IDENTITY,
            Mat4::from_quat(Quat::from_rotation_z(std::f32::consts::FRAC_PI_2)),
        ];
        let v = vertex(Vec3::ZERO, [0, 1, 0, 0], [0.5, 0.5, 0.0, 0.0]);
        let out = skin_vertex(&v, &matrices);
        // Y 与 -X 的平均，长度约 0.707
        assert!(out.normal.abs_diff_eq(Vec3::new(-0.5, 0.5, 0.0), 1e-5));
        assert!((out.normal.length() - std::f32::consts::FRAC_1_SQRT_2).abs() < 1e-5);
    }

    #[test]
    fn test_out_of_range_bone_uses_identity() {
        let v = vertex(Vec3::ONE, [7, 0, 0, 0], [1.0, 0.0, 0.0, 0.0]);
        let out = skin_vertex(&v, &[Mat4::from_translation(Vec3::X)]);
        assert!(out.position.abs_diff_eq(Vec3::ONE, 1e-6));
    }

    #[test]
    fn test_zero_weights_pass_through() {
        let v = vertex(Vec3::new(4.0, 5.0, 6.0), [0; 4], [0.0; 4]);
        let out = skin_vertex(&v, &[Mat4::from_translation(Vec3::X)]);
        assert_eq!(out, v);
    }

    #[test]
    fn test_parallel_matches_serial() {
        let matrices = [
            Mat4::from_rotation_translation(Quat::from_rotation_y(0.3), Vec3::new(1.0, 0.0, 0.0)),
            Mat4::from_scale(Vec3::splat(2.0)),
        ];
        let vertices: Vec<SkinnedVertex> = (0..64)
            .map(|i| {
                let w = (i % 8) as f32 / 8.0;
                vertex(Vec3::new(i as f32, 1.0, -1.0), [0, 1, 0, 0], [w, 1.0 - w, 0.0, 0.0])
            })
            .collect();
        let input = SkinningInput {
            vertices: &vertices,
            bone_matrices: &matrices,
        };

        let mut serial = Vec::new();
        compute_skinning_into(&input, &mut serial, &SkinningContext { parallel_threshold: usize::MAX });
        let mut parallel = Vec::new();
        compute_skinning_into(&input, &mut parallel, &SkinningContext { parallel_threshold: 0 });
        assert_eq!(serial, parallel);
        assert_eq!(compute_skinning(&input), serial);
    }
}
