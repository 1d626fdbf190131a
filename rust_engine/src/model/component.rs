//! 骨骼网格组件：单个网格实例的运行时状态

use std::sync::Arc;

use glam::Mat4;

use crate::animation::AnimInstance;
use crate::config::{SkinningConfig, SkinningMode};
use crate::skeleton::{Pose, Skeleton, Transform};
use crate::skinning::{compute_skinning_into, SkinningContext, SkinningInput, SkinningOutput, SkinningPalette};
use crate::{Result, SkinError};

use super::{MeshAsset, SkinnedVertex};

/// 骨骼网格组件
///
/// 独占自己的姿势、播放状态和蒙皮结果；网格资源与骨架通过 Arc 与其他实例共享。
/// 每次 tick 只计算一次蒙皮矩阵，渲染端通过只读切片读取同一份结果。
pub struct SkeletalMeshComponent {
    mesh: Arc<MeshAsset>,
    skeleton: Arc<Skeleton>,
    pose: Pose,
    anim: AnimInstance,

    // 蒙皮结果
    palette: SkinningPalette,
    skinned_vertices: Vec<SkinnedVertex>,

    skinning_mode: SkinningMode,
    context: SkinningContext,
    frame_index: u64,
    debug_log: bool,
    debug_logged: bool,
}

impl SkeletalMeshComponent {
    /// 创建组件并计算绑定姿势下的蒙皮结果
    pub fn new(mesh: Arc<MeshAsset>, config: &SkinningConfig) -> Result<Self> {
        let skeleton = skeleton_of(&mesh)?;
        let mut component = Self {
            mesh,
            skeleton,
            pose: Pose::default(),
            anim: AnimInstance::new(config.default_looping, config.default_rate_scale),
            palette: SkinningPalette::new(),
            skinned_vertices: Vec::new(),
            skinning_mode: config.skinning_mode,
            context: SkinningContext::from_config(config),
            frame_index: 0,
            debug_log: config.debug_log,
            debug_logged: false,
        };
        component.pose.reset_to_reference(&component.skeleton);
        component.refresh();
        Ok(component)
    }

    /// 绑定新的网格资源，姿势重置为参考姿势
    pub fn bind_mesh(&mut self, mesh: Arc<MeshAsset>) -> Result<()> {
        let skeleton = skeleton_of(&mesh)?;
        self.mesh = mesh;
        self.skeleton = skeleton;
        self.anim.set_clip(None, true);
        self.pose.reset_to_reference(&self.skeleton);
        self.debug_logged = false;
        self.refresh();
        Ok(())
    }

    /// 每帧更新：推进动画，计算一次蒙皮矩阵，按模式应用到顶点
    pub fn tick(&mut self, delta_seconds: f32) {
        self.anim.tick(delta_seconds, &self.skeleton, &mut self.pose);
        self.refresh();
        self.frame_index += 1;

        if self.debug_log {
            log::debug!(
                "[{}] frame={} time={:.3} state={:?}",
                self.mesh.name,
                self.frame_index,
                self.anim.current_time(),
                self.anim.state()
            );
        }
    }

    /// 不推进时间，按当前姿势重新计算蒙皮结果
    pub fn refresh(&mut self) {
        self.palette.compute(&self.pose, &self.skeleton);

        match self.skinning_mode {
            SkinningMode::Cpu => {
                let input = SkinningInput {
                    vertices: &self.mesh.vertices,
                    bone_matrices: self.palette.matrices(),
                };
                compute_skinning_into(&input, &mut self.skinned_vertices, &self.context);
            }
            SkinningMode::MatrixPalette => self.skinned_vertices.clear(),
        }

        if !self.debug_logged {
            self.debug_logged = true;
            log::info!(
                "骨骼网格 '{}': vertex_count={}, bone_count={}, mode={:?}",
                self.mesh.name,
                self.mesh.vertex_count(),
                self.skeleton.bone_count(),
                self.skinning_mode
            );
        }
    }

    /// 按名称播放剪辑，找不到时返回 false
    pub fn play_clip(&mut self, name: &str, looping: bool) -> bool {
        let Some(clip) = self.mesh.find_clip(name).cloned() else {
            log::warn!("网格 '{}' 没有名为 '{}' 的动画", self.mesh.name, name);
            return false;
        };
        if !clip.is_playable() {
            log::warn!("动画 '{}' 没有关键帧轨道，播放时保持参考姿势", name);
        }
        self.anim.set_looping(looping);
        self.anim.set_clip(Some(clip), false);
        self.anim.play();
        true
    }

    /// 停止播放，保留当前姿势
    pub fn stop(&mut self) {
        self.anim.stop();
    }

    /// 手动设置骨骼局部变换，在下一次 refresh/tick 时生效
    ///
    /// 播放中的动画会在 tick 时覆盖被设置的骨骼。
    pub fn set_bone_transform(&mut self, bone_index: usize, transform: Transform) -> bool {
        if bone_index >= self.pose.len() {
            return false;
        }
        self.pose.set(bone_index, transform);
        true
    }

    /// 按名称设置骨骼局部变换
    pub fn set_bone_transform_by_name(&mut self, name: &str, transform: Transform) -> bool {
        match self.skeleton.find_bone(name) {
            Some(index) => self.set_bone_transform(index, transform),
            None => false,
        }
    }

    /// 切换输出路径，模式变化时立即重建输出
    pub fn set_skinning_mode(&mut self, mode: SkinningMode) {
        if self.skinning_mode == mode {
            return;
        }
        self.skinning_mode = mode;
        self.refresh();
    }

    pub fn skinning_mode(&self) -> SkinningMode {
        self.skinning_mode
    }

    /// 本帧的蒙皮矩阵（骨架顺序）
    pub fn skinning_matrices(&self) -> &[Mat4] {
        self.palette.matrices()
    }

    /// 各骨骼当前的模型空间变换
    pub fn bone_to_model(&self) -> &[Mat4] {
        self.palette.bone_to_model()
    }

    /// 本帧的顶点
    ///
    /// 矩阵调色板模式下返回静止姿势顶点，由渲染端自行变形。
    pub fn skinned_vertices(&self) -> &[SkinnedVertex] {
        match self.skinning_mode {
            SkinningMode::Cpu => &self.skinned_vertices,
            SkinningMode::MatrixPalette => &self.mesh.vertices,
        }
    }

    /// 按当前模式交给渲染端的结果
    pub fn output(&self) -> SkinningOutput<'_> {
        match self.skinning_mode {
            SkinningMode::Cpu => SkinningOutput::Vertices(&self.skinned_vertices),
            SkinningMode::MatrixPalette => SkinningOutput::Matrices(self.palette.matrices()),
        }
    }

    /// 已执行的 tick 次数
    pub fn frame_index(&self) -> u64 {
        self.frame_index
    }

    pub fn pose(&self) -> &Pose {
        &self.pose
    }

    pub fn anim_instance(&self) -> &AnimInstance {
        &self.anim
    }

    pub fn anim_instance_mut(&mut self) -> &mut AnimInstance {
        &mut self.anim
    }

    pub fn skeleton(&self) -> &Arc<Skeleton> {
        &self.skeleton
    }

    pub fn mesh(&self) -> &Arc<MeshAsset> {
        &self.mesh
    }
}

fn skeleton_of(mesh: &MeshAsset) -> Result<Arc<Skeleton>> {
    match mesh.skeleton() {
        Some(skeleton) => Ok(skeleton.clone()),
        None => Err(SkinError::NotSkeletal(mesh.name.clone())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::animation::{AnimationClip, FrameRate, KeyframeTrack, PlaybackState};
    use crate::model::{Material, MeshKind, SubMesh};
    use crate::skeleton::RawBone;
    use glam::{Quat, Vec2, Vec3};

    /// 两根骨骼：root 在原点，tip 在 (0,1,0)；顶点 0 绑定 root，顶点 1 绑定 tip
    fn two_bone_mesh() -> Arc<MeshAsset> {
        let up = Mat4::from_translation(Vec3::Y);
        let skeleton = Skeleton::build_hierarchy(&[
            RawBone::new("root", None, Mat4::IDENTITY, Mat4::IDENTITY),
            RawBone::new("tip", Some("root"), up, up),
        ]);

        // 1 秒 2 帧，root 沿 x 从 0 移动到 4
        let mut clip = AnimationClip::new("slide", FrameRate::fps(2), 1.0, 2);
        clip.add_track(
            0,
            KeyframeTrack::new(vec![Vec3::ZERO, Vec3::new(4.0, 0.0, 0.0)], vec![], vec![]),
        )
        .unwrap();

        let mut root_vertex = SkinnedVertex::new(Vec3::ZERO, Vec3::Z, Vec3::X, Vec2::ZERO);
        root_vertex.bone_weights = [1.0, 0.0, 0.0, 0.0];
        let mut tip_vertex = SkinnedVertex::new(Vec3::Y, Vec3::Z, Vec3::X, Vec2::ONE);
        tip_vertex.bone_indices = [1, 0, 0, 0];
        tip_vertex.bone_weights = [1.0, 0.0, 0.0, 0.0];

        Arc::new(MeshAsset {
            name: "arm".into(),
            materials: vec![Material::new("default")],
            vertices: vec![root_vertex, tip_vertex],
            indices: vec![0, 1, 0],
            subsets: vec![SubMesh::new(0, 3, 0)],
            kind: MeshKind::Skeletal {
                skeleton: Arc::new(skeleton),
                clips: vec![Arc::new(clip)],
            },
        })
    }

    #[test]
    fn test_static_mesh_rejected() {
        let mesh = Arc::new(MeshAsset::new_static("rock", Vec::new(), Vec::new(), Vec::new(), Vec::new()));
        let result = SkeletalMeshComponent::new(mesh, &SkinningConfig::default());
        assert!(matches!(result, Err(SkinError::NotSkeletal(name)) if name == "rock"));
    }

    #[test]
    fn test_bind_pose_output() {
        let mesh = two_bone_mesh();
        let component = SkeletalMeshComponent::new(mesh.clone(), &SkinningConfig::default()).unwrap();
        assert_eq!(component.skinning_matrices().len(), 2);
        for (out, rest) in component.skinned_vertices().iter().zip(&mesh.vertices) {
            assert!(out.position.abs_diff_eq(rest.position, 1e-5));
        }
        assert_eq!(component.frame_index(), 0);
    }

    #[test]
    fn test_tick_plays_clip() {
        let mut component = SkeletalMeshComponent::new(two_bone_mesh(), &SkinningConfig::default()).unwrap();
        assert!(component.play_clip("slide", false));
        component.tick(0.25);

        // 帧位置 0.5，root 平移 (2,0,0)，子骨骼随之移动
        let vertices = component.skinned_vertices();
        assert!(vertices[0].position.abs_diff_eq(Vec3::new(2.0, 0.0, 0.0), 1e-4));
        assert!(vertices[1].position.abs_diff_eq(Vec3::new(2.0, 1.0, 0.0), 1e-4));
        assert_eq!(component.frame_index(), 1);
        assert_eq!(component.anim_instance().state(), PlaybackState::Playing);
    }

    #[test]
    fn test_unknown_clip() {
        let mut component = SkeletalMeshComponent::new(two_bone_mesh(), &SkinningConfig::default()).unwrap();
        assert!(!component.play_clip("jump", true));
        assert!(!component.anim_instance().is_playing());
    }

    #[test]
    fn test_manual_bone_edit_applies_on_refresh() {
        let mut component = SkeletalMeshComponent::new(two_bone_mesh(), &SkinningConfig::default()).unwrap();
        let bent = Transform::new(
            Vec3::Y,
            Quat::from_rotation_z(std::f32::consts::FRAC_PI_2),
            Vec3::ONE,
        );
        assert!(component.set_bone_transform_by_name("tip", bent));
        assert!(!component.set_bone_transform(5, bent));

        // 刷新前仍是旧结果
        assert!(component.skinned_vertices()[1].position.abs_diff_eq(Vec3::Y, 1e-5));
        component.refresh();
        // 顶点位于 tip 原点，只受平移影响；法线绕 Z 旋转后不变
        assert!(component.skinned_vertices()[1].position.abs_diff_eq(Vec3::Y, 1e-5));
        assert!(component.skinned_vertices()[1].tangent.abs_diff_eq(Vec3::Y, 1e-5));

        // 停止状态下 tick 不覆盖手动姿势
        component.tick(0.1);
        assert!(component.skinned_vertices()[1].tangent.abs_diff_eq(Vec3::Y, 1e-5));
    }

    #[test]
    fn test_matrix_palette_mode() {
        let config = SkinningConfig {
            skinning_mode: SkinningMode::MatrixPalette,
            ..Default::default()
        };
        let mesh = two_bone_mesh();
        let mut component = SkeletalMeshComponent::new(mesh.clone(), &config).unwrap();
        component.play_clip("slide", true);
        component.tick(0.25);

        match component.output() {
            SkinningOutput::Matrices(matrices) => {
                assert_eq!(matrices.len(), 2);
                let p = matrices[1].transform_point3(Vec3::Y);
                assert!(p.abs_diff_eq(Vec3::new(2.0, 1.0, 0.0), 1e-4));
            }
            SkinningOutput::Vertices(_) => panic!("expected matrices"),
        }
        // 顶点保持静止姿势
        assert_eq!(component.skinned_vertices(), &mesh.vertices[..]);
    }

    #[test]
    fn test_mode_switch_rebuilds_output() {
        let config = SkinningConfig {
            skinning_mode: SkinningMode::MatrixPalette,
            ..Default::default()
        };
        let mesh = two_bone_mesh();
        let mut component = SkeletalMeshComponent::new(mesh.clone(), &config).unwrap();
        component.play_clip("slide", true);
        component.tick(0.25);

        component.set_skinning_mode(SkinningMode::Cpu);
        match component.output() {
            SkinningOutput::Vertices(vertices) => {
                assert_eq!(vertices.len(), mesh.vertices.len());
                assert!(vertices[1].position.abs_diff_eq(Vec3::new(2.0, 1.0, 0.0), 1e-4));
            }
            SkinningOutput::Matrices(_) => panic!("expected vertices"),
        }
        assert_eq!(component.skinned_vertices().len(), mesh.vertices.len());
        // 切换不算一次 tick
        assert_eq!(component.frame_index(), 1);

        component.set_skinning_mode(SkinningMode::MatrixPalette);
        assert!(matches!(component.output(), SkinningOutput::Matrices(m) if m.len() == 2));
    }

    #[test]
    fn test_palette_shared_between_reads() {
        let mut component = SkeletalMeshComponent::new(two_bone_mesh(), &SkinningConfig::default()).unwrap();
        component.play_clip("slide", true);
        component.tick(0.25);

        // 同一 tick 内多次读取得到同一块缓冲区与相同内容
        let first = component.skinning_matrices();
        let second = component.skinning_matrices();
        assert_eq!(first.as_ptr(), second.as_ptr());
        assert_eq!(first, second);

        let vertices_ptr = component.skinned_vertices().as_ptr();
        match component.output() {
            SkinningOutput::Vertices(vertices) => assert_eq!(vertices.as_ptr(), vertices_ptr),
            SkinningOutput::Matrices(_) => panic!("expected vertices"),
        }
        let snapshot = first.to_vec();
        assert_eq!(component.skinning_matrices(), &snapshot[..]);

        // 只有下一次 tick 才会更新结果
        component.tick(0.25);
        assert_ne!(component.skinning_matrices(), &snapshot[..]);
    }

    #[test]
    fn test_bind_mesh_resets_pose() {
        let mesh = two_bone_mesh();
        let mut component = SkeletalMeshComponent::new(mesh.clone(), &SkinningConfig::default()).unwrap();
        component.play_clip("slide", true);
        component.tick(0.25);

        component.bind_mesh(mesh.clone()).unwrap();
        assert_eq!(component.pose(), &component.skeleton().reference_pose());
        assert!(component.anim_instance().clip().is_none());
        assert!(component.skinned_vertices()[0].position.abs_diff_eq(Vec3::ZERO, 1e-5));

        let rock = Arc::new(MeshAsset::new_static("rock", Vec::new(), Vec::new(), Vec::new(), Vec::new()));
        assert!(component.bind_mesh(rock).is_err());
    }
}
