//! 动画系统
//!
//! 提供关键帧轨道、动画剪辑采样和单剪辑播放实例。

mod anim_instance;
mod clip;
mod keyframe;

pub use anim_instance::{AnimInstance, PlaybackState};
pub use clip::{AnimationClip, FrameRate, FRAME_CLAMP_EPSILON};
pub use keyframe::KeyframeTrack;
