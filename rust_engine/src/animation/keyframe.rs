//! 关键帧轨道

use glam::{Quat, Vec3};

use crate::skeleton::Transform;
use crate::{Result, SkinError};

/// 单个骨骼的关键帧轨道
///
/// 每个通道的关键帧数量只能是 0（使用参考姿势）、1（常量通道）
/// 或剪辑的总帧数。
#[derive(Clone, Debug, Default, PartialEq)]
pub struct KeyframeTrack {
    pub positions: Vec<Vec3>,
    pub rotations: Vec<Quat>,
    pub scales: Vec<Vec3>,
}

impl KeyframeTrack {
    pub fn new(positions: Vec<Vec3>, rotations: Vec<Quat>, scales: Vec<Vec3>) -> Self {
        Self { positions, rotations, scales }
    }

    /// 常量轨道：三个通道各只有一个关键帧
    pub fn constant(transform: Transform) -> Self {
        Self {
            positions: vec![transform.translation],
            rotations: vec![transform.rotation],
            scales: vec![transform.scale],
        }
    }

    /// 所有通道都不超过一个关键帧
    pub fn is_constant(&self) -> bool {
        self.positions.len() <= 1 && self.rotations.len() <= 1 && self.scales.len() <= 1
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty() && self.rotations.is_empty() && self.scales.is_empty()
    }

    /// 校验每个通道的关键帧数量
    pub fn validate(&self, number_of_frames: u32) -> Result<()> {
        let n = number_of_frames as usize;
        let channels = [
            ("position", self.positions.len()),
            ("rotation", self.rotations.len()),
            ("scale", self.scales.len()),
        ];
        for (channel, len) in channels {
            if len > 1 && len != n {
                return Err(SkinError::InvalidTrack(format!(
                    "{} channel has {} keys, expected 1 or {}",
                    channel, len, number_of_frames
                )));
            }
        }
        if self.rotations.iter().any(|q| !q.is_finite()) {
            return Err(SkinError::InvalidTrack("rotation key is not finite".to_string()));
        }
        Ok(())
    }

    /// 取单帧变换，空通道使用 `reference` 对应分量
    pub fn key_transform(&self, frame: usize, reference: &Transform) -> Transform {
        Transform {
            translation: key_at(&self.positions, frame).unwrap_or(reference.translation),
            rotation: key_at(&self.rotations, frame).unwrap_or(reference.rotation),
            scale: key_at(&self.scales, frame).unwrap_or(reference.scale),
        }
    }

    /// 在两帧之间插值
    pub fn sample(&self, frame1: usize, frame2: usize, alpha: f32, reference: &Transform) -> Transform {
        let start = self.key_transform(frame1, reference);
        if frame1 == frame2 {
            return start;
        }
        let end = self.key_transform(frame2, reference);
        start.interpolate(&end, alpha)
    }
}

/// 常量通道总是返回唯一的关键帧；越界索引钳制到最后一帧
fn key_at<T: Copy>(keys: &[T], index: usize) -> Option<T> {
    match keys.len() {
        0 => None,
        1 => Some(keys[0]),
        n => Some(keys[index.min(n - 1)]),
    }
}
