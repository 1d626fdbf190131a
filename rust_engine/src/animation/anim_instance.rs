//! 动画实例：单剪辑播放状态机
//!
//! 持有播放时间、循环设置与速率倍数，每帧推进时间并向剪辑请求姿势。

use std::sync::Arc;

use crate::skeleton::{Pose, Skeleton};

use super::AnimationClip;

/// 播放状态
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PlaybackState {
    /// 停止状态
    Stopped,
    /// 播放中
    Playing,
}

/// 动画实例
#[derive(Clone, Debug)]
pub struct AnimInstance {
    /// 当前剪辑
    clip: Option<Arc<AnimationClip>>,
    /// 当前播放时间（秒）
    current_time: f32,
    /// 当前状态
    state: PlaybackState,
    /// 是否循环播放
    looping: bool,
    /// 播放速率倍数，负数为倒放
    rate_scale: f32,
}

impl AnimInstance {
    pub fn new(looping: bool, rate_scale: f32) -> Self {
        Self {
            clip: None,
            current_time: 0.0,
            state: PlaybackState::Stopped,
            looping,
            rate_scale,
        }
    }

    /// 设置剪辑
    ///
    /// 同一剪辑且不要求重置时间时什么都不做，避免重复调用导致重新开始播放。
    pub fn set_clip(&mut self, clip: Option<Arc<AnimationClip>>, reset_time: bool) {
        let same = match (&self.clip, &clip) {
            (Some(a), Some(b)) => Arc::ptr_eq(a, b),
            (None, None) => true,
            _ => false,
        };
        if same && !reset_time {
            return;
        }

        self.clip = clip;
        self.current_time = 0.0;
        if self.clip.is_none() {
            self.state = PlaybackState::Stopped;
        }
    }

    /// 播放动画
    ///
    /// 非循环剪辑已播放到尽头时从头（倒放时从尾）重新开始。
    pub fn play(&mut self) {
        let Some(clip) = &self.clip else {
            return;
        };
        if !self.looping {
            let duration = clip.duration;
            if self.rate_scale >= 0.0 && self.current_time >= duration {
                self.current_time = 0.0;
            } else if self.rate_scale < 0.0 && self.current_time <= 0.0 {
                self.current_time = duration.max(0.0);
            }
        }
        self.state = PlaybackState::Playing;
    }

    /// 停止动画（保留当前时间与姿势）
    pub fn stop(&mut self) {
        self.state = PlaybackState::Stopped;
    }

    /// 跳转到指定时间，下一次 tick/evaluate 生效
    pub fn seek(&mut self, time: f32) {
        if time.is_finite() {
            self.current_time = time;
        }
    }

    pub fn set_looping(&mut self, looping: bool) {
        self.looping = looping;
    }

    pub fn set_rate_scale(&mut self, rate_scale: f32) {
        if rate_scale.is_finite() {
            self.rate_scale = rate_scale;
        }
    }

    /// 每帧推进
    pub fn tick(&mut self, delta_seconds: f32, skeleton: &Skeleton, pose: &mut Pose) {
        if self.state == PlaybackState::Stopped {
            if pose.len() != skeleton.bone_count() {
                pose.reset_to_reference(skeleton);
            }
            return;
        }

        let Some(clip) = self.clip.clone() else {
            self.state = PlaybackState::Stopped;
            pose.reset_to_reference(skeleton);
            return;
        };

        let duration = clip.duration;
        if duration.is_nan() || duration <= 0.0 {
            log::warn!("动画 '{}' 时长无效 ({})，停止播放", clip.name, duration);
            self.state = PlaybackState::Stopped;
            pose.reset_to_reference(skeleton);
            return;
        }

        if delta_seconds.is_finite() {
            self.current_time += delta_seconds * self.rate_scale;
        }
        self.wrap_time(duration);

        clip.sample_pose_into(self.current_time, skeleton, self.looping, pose);
    }

    /// 不推进时间，按当前时间重新采样（停止状态下也有效）
    pub fn evaluate(&self, skeleton: &Skeleton, pose: &mut Pose) {
        match &self.clip {
            Some(clip) => clip.sample_pose_into(self.current_time, skeleton, self.looping, pose),
            None => pose.reset_to_reference(skeleton),
        }
    }

    /// 循环时回绕，非循环时钳制并在到达端点后停止
    fn wrap_time(&mut self, duration: f32) {
        if self.looping {
            if self.current_time >= duration {
                self.current_time %= duration;
            } else if self.current_time < 0.0 {
                self.current_time = duration - (-self.current_time % duration);
                if self.current_time >= duration {
                    self.current_time = 0.0;
                }
            }
        } else if self.current_time >= duration {
            self.current_time = duration;
            self.state = PlaybackState::Stopped;
        } else if self.current_time <= 0.0 && self.rate_scale < 0.0 {
            self.current_time = 0.0;
            self.state = PlaybackState::Stopped;
        } else if self.current_time < 0.0 {
            self.current_time = 0.0;
        }
    }

    /// 获取当前状态
    pub fn state(&self) -> PlaybackState {
        self.state
    }

    /// 是否正在播放
    pub fn is_playing(&self) -> bool {
        self.state == PlaybackState::Playing
    }

    /// 获取当前时间
    pub fn current_time(&self) -> f32 {
        self.current_time
    }

    pub fn clip(&self) -> Option<&Arc<AnimationClip>> {
        self.clip.as_ref()
    }

    pub fn is_looping(&self) -> bool {
        self.looping
    }

    pub fn rate_scale(&self) -> f32 {
        self.rate_scale
    }
}

impl Default for AnimInstance {
    fn default() -> Self {
        Self::new(true, 1.0)
    }
}
