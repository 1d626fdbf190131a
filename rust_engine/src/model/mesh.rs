//! 网格资源

use std::sync::Arc;

use crate::animation::AnimationClip;
use crate::skeleton::Skeleton;
use crate::{Result, SkinError};

use super::{Material, SkinnedVertex, SubMesh};

/// 网格种类：静态网格或带骨架的网格，在构建时确定
#[derive(Clone, Debug, PartialEq)]
pub enum MeshKind {
    Static,
    Skeletal {
        skeleton: Arc<Skeleton>,
        clips: Vec<Arc<AnimationClip>>,
    },
}

/// 网格资源（导入后不可变，实例间通过 Arc 共享）
#[derive(Clone, Debug, PartialEq)]
pub struct MeshAsset {
    pub name: String,
    pub materials: Vec<Material>,
    /// 静止姿势下的顶点
    pub vertices: Vec<SkinnedVertex>,
    pub indices: Vec<u32>,
    pub subsets: Vec<SubMesh>,
    pub kind: MeshKind,
}

impl MeshAsset {
    pub fn new_static(
        name: impl Into<String>,
        materials: Vec<Material>,
        vertices: Vec<SkinnedVertex>,
        indices: Vec<u32>,
        subsets: Vec<SubMesh>,
    ) -> Self {
        Self {
            name: name.into(),
            materials,
            vertices,
            indices,
            subsets,
            kind: MeshKind::Static,
        }
    }

    pub fn has_skeleton(&self) -> bool {
        matches!(self.kind, MeshKind::Skeletal { .. })
    }

    pub fn is_static(&self) -> bool {
        matches!(self.kind, MeshKind::Static)
    }

    /// 是否带有动画剪辑
    pub fn has_animation_data(&self) -> bool {
        match &self.kind {
            MeshKind::Skeletal { clips, .. } => !clips.is_empty(),
            MeshKind::Static => false,
        }
    }

    pub fn skeleton(&self) -> Option<&Arc<Skeleton>> {
        match &self.kind {
            MeshKind::Skeletal { skeleton, .. } => Some(skeleton),
            MeshKind::Static => None,
        }
    }

    pub fn clips(&self) -> &[Arc<AnimationClip>] {
        match &self.kind {
            MeshKind::Skeletal { clips, .. } => clips,
            MeshKind::Static => &[],
        }
    }

    /// 按名称查找剪辑
    pub fn find_clip(&self, name: &str) -> Option<&Arc<AnimationClip>> {
        self.clips().iter().find(|clip| clip.name == name)
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn index_count(&self) -> usize {
        self.indices.len()
    }

    /// 校验索引、子网格与骨骼引用都在范围内
    pub fn validate(&self) -> Result<()> {
        let vertex_count = self.vertices.len();
        if let Some(index) = self.indices.iter().find(|i| **i as usize >= vertex_count) {
            return Err(SkinError::Import(format!(
                "mesh '{}': index {} out of range ({} vertices)",
                self.name, index, vertex_count
            )));
        }

        for (i, subset) in self.subsets.iter().enumerate() {
            if subset.end_index() as usize > self.indices.len() {
                return Err(SkinError::Import(format!(
                    "mesh '{}': subset {} covers indices {}..{} but only {} exist",
                    self.name,
                    i,
                    subset.begin_index,
                    subset.end_index(),
                    self.indices.len()
                )));
            }
            if !self.materials.is_empty() && subset.material_index as usize >= self.materials.len() {
                return Err(SkinError::Import(format!(
                    "mesh '{}': subset {} references material {} ({} materials)",
                    self.name,
                    i,
                    subset.material_index,
                    self.materials.len()
                )));
            }
        }

        if let Some(skeleton) = self.skeleton() {
            let bone_count = skeleton.bone_count() as u32;
            for (i, vertex) in self.vertices.iter().enumerate() {
                let bad = vertex
                    .bone_indices
                    .iter()
                    .zip(&vertex.bone_weights)
                    .any(|(&bone, &weight)| weight > 0.0 && bone >= bone_count);
                if bad {
                    return Err(SkinError::Import(format!(
                        "mesh '{}': vertex {} references a bone outside the skeleton ({} bones)",
                        self.name, i, bone_count
                    )));
                }
            }
        }
        Ok(())
    }
}
