//! 运行时姿势：每个骨骼一个局部变换

use super::{Skeleton, Transform};

/// 骨骼姿势，长度与骨骼数量一致
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Pose {
    transforms: Vec<Transform>,
}

impl Pose {
    pub fn from_transforms(transforms: Vec<Transform>) -> Self {
        Self { transforms }
    }

    /// 全部为单位变换的姿势
    pub fn identity(bone_count: usize) -> Self {
        Self {
            transforms: vec![Transform::IDENTITY; bone_count],
        }
    }

    pub fn len(&self) -> usize {
        self.transforms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transforms.is_empty()
    }

    pub fn get(&self, bone_index: usize) -> Option<&Transform> {
        self.transforms.get(bone_index)
    }

    /// 设置单个骨骼的局部变换（编辑器手动调整），越界时忽略
    pub fn set(&mut self, bone_index: usize, transform: Transform) {
        if let Some(slot) = self.transforms.get_mut(bone_index) {
            *slot = transform;
        }
    }

    pub fn transforms(&self) -> &[Transform] {
        &self.transforms
    }

    pub fn transforms_mut(&mut self) -> &mut [Transform] {
        &mut self.transforms
    }

    /// 原地重置为骨架的参考姿势（复用已有分配）
    pub fn reset_to_reference(&mut self, skeleton: &Skeleton) {
        self.transforms.clear();
        self.transforms
            .extend(skeleton.bones().iter().map(|bone| bone.reference_transform()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::skeleton::RawBone;
    use glam::{Mat4, Vec3};

    #[test]
    fn test_set_ignores_out_of_range() {
        let mut pose = Pose::identity(2);
        pose.set(5, Transform::from_translation(Vec3::X));
        assert_eq!(pose, Pose::identity(2));

        pose.set(1, Transform::from_translation(Vec3::X));
        assert_eq!(pose.get(1).unwrap().translation, Vec3::X);
    }

    #[test]
    fn test_reset_to_reference() {
        let local = Mat4::from_translation(Vec3::new(0.0, 2.0, 0.0));
        let skeleton = Skeleton::build_hierarchy(&[
            RawBone::new("a", None, local, local),
            RawBone::new("b", Some("a"), local * local, local),
        ]);

        let mut pose = Pose::identity(7);
        pose.reset_to_reference(&skeleton);
        assert_eq!(pose.len(), 2);
        assert!(pose.get(1).unwrap().translation.abs_diff_eq(Vec3::new(0.0, 2.0, 0.0), 1e-6));
    }
}
