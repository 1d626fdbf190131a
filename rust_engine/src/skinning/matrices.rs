//! 蒙皮矩阵计算

use glam::Mat4;

use crate::skeleton::{Pose, Skeleton};

/// 蒙皮矩阵调色板
///
/// 保留中间的骨骼 -> 模型矩阵，避免每帧重新分配。
#[derive(Clone, Debug, Default)]
pub struct SkinningPalette {
    bone_to_model: Vec<Mat4>,
    matrices: Vec<Mat4>,
}

impl SkinningPalette {
    pub fn new() -> Self {
        Self::default()
    }

    /// 按骨架顺序单次遍历计算所有蒙皮矩阵
    ///
    /// 拓扑序保证访问子骨骼时父骨骼的模型矩阵已经算好。
    /// 姿势比骨架短时，缺少的骨骼使用参考姿势。
    pub fn compute(&mut self, pose: &Pose, skeleton: &Skeleton) {
        let bone_count = skeleton.bone_count();
        self.bone_to_model.clear();
        self.bone_to_model.reserve(bone_count);
        self.matrices.clear();
        self.matrices.reserve(bone_count);

        if pose.len() != bone_count {
            log::warn!(
                "姿势长度 {} 与骨骼数量 {} 不一致，缺失部分使用参考姿势",
                pose.len(),
                bone_count
            );
        }

        for (i, bone) in skeleton.bones().iter().enumerate() {
            let local = match pose.get(i) {
                Some(transform) => transform.to_matrix(),
                None => bone.local_bind_matrix,
            };

            let bone_to_model = match bone.parent() {
                Some(parent) => self.bone_to_model[parent] * local,
                None => local,
            };

            self.bone_to_model.push(bone_to_model);
            self.matrices.push(bone_to_model * bone.inverse_bind_matrix);
        }
    }

    /// 蒙皮矩阵（骨架顺序）
    pub fn matrices(&self) -> &[Mat4] {
        &self.matrices
    }

    /// 当前姿势下各骨骼的模型空间变换
    pub fn bone_to_model(&self) -> &[Mat4] {
        &self.bone_to_model
    }

    pub fn len(&self) -> usize {
        self.matrices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.matrices.is_empty()
    }
}

/// 计算蒙皮矩阵
pub fn compute_skinning_matrices(pose: &Pose, skeleton: &Skeleton) -> Vec<Mat4> {
    let mut palette = SkinningPalette::new();
    palette.compute(pose, skeleton);
    palette.matrices
}

/// 计算蒙皮矩阵并写入已有调色板
pub fn compute_skinning_matrices_into(pose: &Pose, skeleton: &Skeleton, palette: &mut SkinningPalette) {
    palette.compute(pose, skeleton);
}
