//! 骨骼系统：骨骼层级、参考姿势与运行时姿势

mod bone;
mod pose;
mod skeleton;

pub use bone::{Bone, RawBone};
pub use pose::Pose;
pub use skeleton::Skeleton;

use glam::{Mat4, Quat, Vec3};

/// 骨骼局部变换
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Transform {
    pub translation: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Transform {
    pub const IDENTITY: Self = Self {
        translation: Vec3::ZERO,
        rotation: Quat::IDENTITY,
        scale: Vec3::ONE,
    };

    pub fn new(translation: Vec3, rotation: Quat, scale: Vec3) -> Self {
        Self { translation, rotation, scale }
    }

    pub fn from_translation(translation: Vec3) -> Self {
        Self { translation, ..Self::IDENTITY }
    }

    /// 从矩阵分解（用于由绑定矩阵得到参考姿势）
    pub fn from_matrix(matrix: &Mat4) -> Self {
        let (scale, rotation, translation) = matrix.to_scale_rotation_translation();
        Self {
            translation,
            rotation: rotation.normalize(),
            scale,
        }
    }

    /// 合成局部矩阵：先缩放，再旋转，最后平移
    ///
    /// 顺序固定，非均匀缩放的骨骼对顺序敏感。
    pub fn to_matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.translation)
    }

    /// 插值到另一个变换：平移/缩放线性插值，旋转球面插值并重新归一化
    ///
    /// `alpha <= 0` 精确返回自身，`alpha >= 1` 精确返回 `other`。
    pub fn interpolate(&self, other: &Transform, alpha: f32) -> Transform {
        if alpha <= 0.0 {
            return *self;
        }
        if alpha >= 1.0 {
            return *other;
        }
        Transform {
            translation: self.translation.lerp(other.translation, alpha),
            rotation: self.rotation.slerp(other.rotation, alpha).normalize(),
            scale: self.scale.lerp(other.scale, alpha),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transform_matrix_order() {
        // 非均匀缩放 + 旋转 + 平移：点 (1,0,0) 先缩放到 (2,0,0)，绕 Z 转 90° 到 (0,2,0)，再平移
        let t = Transform::new(
            Vec3::new(10.0, 0.0, 0.0),
            Quat::from_rotation_z(std::f32::consts::FRAC_PI_2),
            Vec3::new(2.0, 1.0, 1.0),
        );
        let p = t.to_matrix().transform_point3(Vec3::X);
        assert!(p.abs_diff_eq(Vec3::new(10.0, 2.0, 0.0), 1e-5));
    }

    #[test]
    fn test_transform_from_matrix_roundtrip() {
        let t = Transform::new(
            Vec3::new(1.0, 2.0, 3.0),
            Quat::from_rotation_y(0.7),
            Vec3::splat(1.5),
        );
        let back = Transform::from_matrix(&t.to_matrix());
        assert!(back.translation.abs_diff_eq(t.translation, 1e-5));
        assert!(back.rotation.abs_diff_eq(t.rotation, 1e-5));
        assert!(back.scale.abs_diff_eq(t.scale, 1e-5));
    }

    #[test]
    fn test_interpolate_endpoints_exact() {
        let a = Transform::from_translation(Vec3::new(0.1, 0.2, 0.3));
        let b = Transform::new(Vec3::new(7.3, -1.1, 0.9), Quat::from_rotation_x(1.2), Vec3::splat(3.0));
        assert_eq!(a.interpolate(&b, 0.0), a);
        assert_eq!(a.interpolate(&b, 1.0), b);
    }

    #[test]
    fn test_interpolate_rotation_normalized() {
        let a = Transform::IDENTITY;
        let b = Transform::new(Vec3::ZERO, Quat::from_rotation_z(2.5), Vec3::ONE);
        let mid = a.interpolate(&b, 0.37);
        assert!((mid.rotation.length() - 1.0).abs() < 1e-6);
    }
}
