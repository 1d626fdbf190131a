//! 骨骼节点

use glam::Mat4;

use super::Transform;

/// 导入端提供的原始骨骼
///
/// 父子关系通过父骨骼名称链接，输入顺序任意。
#[derive(Clone, Debug)]
pub struct RawBone {
    pub name: String,
    /// 父骨骼名称，None 表示根骨骼
    pub parent: Option<String>,
    /// 绑定时的全局变换（骨骼空间 -> 模型空间）
    pub global_bind: Mat4,
    /// 绑定时相对父骨骼的局部变换
    pub local_bind: Mat4,
}

impl RawBone {
    pub fn new(name: impl Into<String>, parent: Option<&str>, global_bind: Mat4, local_bind: Mat4) -> Self {
        Self {
            name: name.into(),
            parent: parent.map(str::to_string),
            global_bind,
            local_bind,
        }
    }
}

/// 骨骼节点
#[derive(Clone, Debug, PartialEq)]
pub struct Bone {
    pub name: String,
    /// 父骨骼索引，-1 表示根骨骼；总是小于自身索引
    pub parent_index: i32,
    /// 逆绑定矩阵（模型空间 -> 绑定时的骨骼空间）
    pub inverse_bind_matrix: Mat4,
    /// 绑定时的局部变换
    pub local_bind_matrix: Mat4,
}

impl Bone {
    pub fn new(name: impl Into<String>, parent_index: i32) -> Self {
        Self {
            name: name.into(),
            parent_index,
            inverse_bind_matrix: Mat4::IDENTITY,
            local_bind_matrix: Mat4::IDENTITY,
        }
    }

    pub fn is_root(&self) -> bool {
        self.parent_index < 0
    }

    /// 父骨骼索引（根骨骼返回 None）
    pub fn parent(&self) -> Option<usize> {
        if self.parent_index < 0 {
            None
        } else {
            Some(self.parent_index as usize)
        }
    }

    /// 参考姿势下的局部变换
    pub fn reference_transform(&self) -> Transform {
        Transform::from_matrix(&self.local_bind_matrix)
    }
}

impl Default for Bone {
    fn default() -> Self {
        Self::new(String::new(), -1)
    }
}
