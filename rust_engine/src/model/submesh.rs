//! 子网格定义

/// 子网格：索引缓冲区中共用同一材质的一段
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SubMesh {
    pub begin_index: u32,
    pub index_count: u32,
    pub material_index: u32,
}

impl SubMesh {
    pub fn new(begin_index: u32, index_count: u32, material_index: u32) -> Self {
        Self { begin_index, index_count, material_index }
    }

    /// 结束位置（不含）
    pub fn end_index(&self) -> u32 {
        self.begin_index.saturating_add(self.index_count)
    }
}
