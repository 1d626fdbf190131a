//! Skinning Engine - 骨骼动画与顶点蒙皮运行时
//!
//! 提供以下功能：
//! - 骨骼层级构建（拓扑排序、逆绑定矩阵）
//! - 关键帧动画采样（线性插值 / 球面插值）
//! - 单剪辑动画播放（循环、钳制、倒放）
//! - 蒙皮矩阵计算
//! - 线性混合蒙皮（CPU 路径与矩阵调色板路径）
//! - 资源注册表与二进制缓存

pub mod animation;
pub mod asset;
pub mod config;
pub mod model;
pub mod skeleton;
pub mod skinning;

pub use animation::{AnimInstance, AnimationClip, FrameRate, KeyframeTrack, PlaybackState};
pub use asset::{AssetId, AssetRegistry, MeshImporter, RawMeshData};
pub use config::{FallbackBone, SkinningConfig, SkinningMode};
pub use model::{Material, MeshAsset, MeshKind, SkeletalMeshComponent, SkinnedVertex, SubMesh};
pub use skeleton::{Bone, Pose, RawBone, Skeleton, Transform};
pub use skinning::{compute_skinning_matrices, SkinningOutput, SkinningPalette};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SkinError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid skeleton: {0}")]
    InvalidSkeleton(String),

    #[error("Invalid keyframe track: {0}")]
    InvalidTrack(String),

    #[error("Import error: {0}")]
    Import(String),

    #[error("Cache error: {0}")]
    Cache(String),

    #[error("Mesh '{0}' has no skeleton")]
    NotSkeletal(String),
}

pub type Result<T> = std::result::Result<T, SkinError>;
