//! 动画剪辑与姿势采样

use crate::asset::RawAnimationStack;
use crate::skeleton::{Pose, Skeleton};
use crate::{Result, SkinError};

use super::KeyframeTrack;

/// 非循环播放时帧号钳制到 `N - 1 - ε`，保证最后一帧可达且不越界
pub const FRAME_CLAMP_EPSILON: f32 = 1e-4;

/// 有理数帧率
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FrameRate {
    pub numerator: u32,
    pub denominator: u32,
}

impl FrameRate {
    pub fn new(numerator: u32, denominator: u32) -> Self {
        Self { numerator, denominator }
    }

    /// 整数帧率
    pub fn fps(fps: u32) -> Self {
        Self::new(fps, 1)
    }

    /// 每秒帧数，分母为 0 时返回 0
    pub fn as_f32(&self) -> f32 {
        if self.denominator == 0 {
            return 0.0;
        }
        self.numerator as f32 / self.denominator as f32
    }
}

impl Default for FrameRate {
    fn default() -> Self {
        Self::fps(30)
    }
}

/// 动画剪辑
///
/// 时长和帧数独立于各轨道的关键帧数量；没有轨道的骨骼使用参考姿势。
#[derive(Clone, Debug, PartialEq)]
pub struct AnimationClip {
    pub name: String,
    pub frame_rate: FrameRate,
    /// 时长（秒）
    pub duration: f32,
    pub number_of_frames: u32,
    /// 按骨骼索引升序排列
    tracks: Vec<(i32, KeyframeTrack)>,
}

impl AnimationClip {
    pub fn new(name: impl Into<String>, frame_rate: FrameRate, duration: f32, number_of_frames: u32) -> Self {
        Self {
            name: name.into(),
            frame_rate,
            duration,
            number_of_frames,
            tracks: Vec::new(),
        }
    }

    /// 从导入端的动画栈元数据创建
    ///
    /// 导入端目前只提供时间信息，不提取逐骨骼关键帧，因此返回的剪辑没有轨道，
    /// 采样时退回参考姿势。
    pub fn from_stack_metadata(stack: &RawAnimationStack) -> Self {
        let duration = (stack.stop_time - stack.start_time).max(0.0);
        let number_of_frames = (duration * stack.frame_rate.as_f32()).round().max(0.0) as u32;
        log::debug!(
            "动画栈 '{}': 时长 {:.3}s, {} 帧（仅元数据，无关键帧轨道）",
            stack.name,
            duration,
            number_of_frames
        );
        Self::new(stack.name.clone(), stack.frame_rate, duration, number_of_frames)
    }

    /// 添加骨骼轨道，同一骨骼已有轨道时替换
    pub fn add_track(&mut self, bone_index: i32, track: KeyframeTrack) -> Result<()> {
        if bone_index < 0 {
            return Err(SkinError::InvalidTrack(format!(
                "track bone index {} is negative",
                bone_index
            )));
        }
        track.validate(self.number_of_frames)?;
        match self.tracks.binary_search_by_key(&bone_index, |(i, _)| *i) {
            Ok(pos) => self.tracks[pos].1 = track,
            Err(pos) => self.tracks.insert(pos, (bone_index, track)),
        }
        Ok(())
    }

    /// 查找骨骼轨道
    pub fn track_for(&self, bone_index: i32) -> Option<&KeyframeTrack> {
        self.tracks
            .binary_search_by_key(&bone_index, |(i, _)| *i)
            .ok()
            .map(|pos| &self.tracks[pos].1)
    }

    pub fn tracks(&self) -> &[(i32, KeyframeTrack)] {
        &self.tracks
    }

    pub fn has_tracks(&self) -> bool {
        !self.tracks.is_empty()
    }

    /// 是否能产生非参考姿势
    pub fn is_playable(&self) -> bool {
        let fps = self.frame_rate.as_f32();
        self.has_tracks()
            && self.number_of_frames > 0
            && self.duration > 0.0
            && fps > 0.0
            && fps.is_finite()
    }

    /// 采样指定时间的姿势
    pub fn get_pose_at_time(&self, time: f32, skeleton: &Skeleton, looping: bool) -> Pose {
        let mut pose = Pose::default();
        self.sample_pose_into(time, skeleton, looping, &mut pose);
        pose
    }

    /// 采样到已有姿势中（复用分配）
    ///
    /// 任何无效输入都退回参考姿势，永不失败。
    pub fn sample_pose_into(&self, time: f32, skeleton: &Skeleton, looping: bool, pose: &mut Pose) {
        pose.reset_to_reference(skeleton);
        if !self.is_playable() || !time.is_finite() {
            return;
        }

        let (frame1, frame2, alpha) = self.frame_position(time, looping);

        let bone_count = skeleton.bone_count();
        let transforms = pose.transforms_mut();
        for (bone_index, track) in &self.tracks {
            let bone_index = *bone_index as usize;
            if bone_index >= bone_count || track.is_empty() {
                continue;
            }
            let reference = transforms[bone_index];
            transforms[bone_index] = track.sample(frame1, frame2, alpha, &reference);
        }
    }

    /// 时间 -> (起始帧, 结束帧, 插值系数)
    fn frame_position(&self, time: f32, looping: bool) -> (usize, usize, f32) {
        let frame_count = self.number_of_frames as f32;
        let mut frame = time * self.frame_rate.as_f32();
        if !frame.is_finite() {
            frame = 0.0;
        }

        if looping {
            frame %= frame_count;
            if frame < 0.0 {
                frame += frame_count;
            }
            // 极小的负数加上帧数后可能恰好等于帧数
            if frame >= frame_count {
                frame = 0.0;
            }
        } else {
            let upper = (frame_count - 1.0 - FRAME_CLAMP_EPSILON).max(0.0);
            frame = frame.clamp(0.0, upper);
        }

        let floor = frame.floor();
        let alpha = frame - floor;
        let last = self.number_of_frames as usize - 1;
        let frame1 = (floor as usize).min(last);
        let mut frame2 = frame.ceil() as usize;
        if looping && frame2 == self.number_of_frames as usize {
            frame2 = 0;
        }
        (frame1, frame2.min(last), alpha)
    }
}
