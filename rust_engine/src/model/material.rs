//! 网格材质

use glam::{Vec3, Vec4};

/// 双面渲染
pub const MATERIAL_DOUBLE_SIDED: u8 = 0x01;
/// 投射阴影
pub const MATERIAL_CASTS_SHADOW: u8 = 0x02;
/// 接收阴影
pub const MATERIAL_RECEIVES_SHADOW: u8 = 0x04;

/// 网格材质（只保存渲染端需要的参数，不持有纹理数据）
#[derive(Clone, Debug, PartialEq)]
pub struct Material {
    pub name: String,
    pub diffuse: Vec4,
    pub specular: Vec3,
    pub shininess: f32,
    pub ambient: Vec3,
    /// 漫反射纹理路径，空字符串表示没有纹理
    pub diffuse_texture: String,
    pub flags: u8,
}

impl Material {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn has_texture(&self) -> bool {
        !self.diffuse_texture.is_empty()
    }

    /// 是否双面渲染
    pub fn is_double_sided(&self) -> bool {
        (self.flags & MATERIAL_DOUBLE_SIDED) != 0
    }

    /// 是否投射阴影
    pub fn casts_shadow(&self) -> bool {
        (self.flags & MATERIAL_CASTS_SHADOW) != 0
    }

    /// 是否接收阴影
    pub fn receives_shadow(&self) -> bool {
        (self.flags & MATERIAL_RECEIVES_SHADOW) != 0
    }
}

impl Default for Material {
    fn default() -> Self {
        Self {
            name: String::new(),
            diffuse: Vec4::ONE,
            specular: Vec3::ZERO,
            shininess: 0.0,
            ambient: Vec3::splat(0.5),
            diffuse_texture: String::new(),
            flags: MATERIAL_CASTS_SHADOW | MATERIAL_RECEIVES_SHADOW,
        }
    }
}
