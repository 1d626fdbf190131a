//! 蒙皮运行时配置
//!
//! 所有参数扁平化，由调用方持有并按引用传入各组件，不存在全局配置实例。

/// 蒙皮结果的输出路径
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SkinningMode {
    /// CPU 每帧重写顶点缓冲区
    Cpu,
    /// 只导出蒙皮矩阵，由渲染端逐顶点应用
    MatrixPalette,
}

/// 顶点没有任何有效权重时的兜底骨骼
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FallbackBone {
    /// 根骨骼（拓扑序下索引 0 一定是根）
    Root,
    /// 指定骨骼索引，越界时退回根骨骼
    Index(u32),
}

impl FallbackBone {
    /// 解析为实际骨骼索引
    pub fn resolve(self, bone_count: usize) -> u32 {
        match self {
            FallbackBone::Root => 0,
            FallbackBone::Index(index) if (index as usize) < bone_count => index,
            FallbackBone::Index(_) => 0,
        }
    }
}

/// 蒙皮配置（扁平化，不嵌套）
#[derive(Debug, Clone)]
pub struct SkinningConfig {
    // ========== 输出 ==========
    /// 蒙皮输出路径，默认 Cpu
    pub skinning_mode: SkinningMode,
    /// 顶点数超过此值时 CPU 蒙皮使用 rayon 并行，默认 2048
    pub parallel_vertex_threshold: usize,

    // ========== 权重 ==========
    /// 小于等于此值的原始权重被丢弃，默认 1e-6
    pub weight_epsilon: f32,
    /// 无有效权重时的兜底骨骼，默认根骨骼
    pub fallback_bone: FallbackBone,

    // ========== 播放 ==========
    /// 新组件播放剪辑时的默认循环设置，默认 true
    pub default_looping: bool,
    /// 默认播放速率倍数，默认 1.0
    pub default_rate_scale: f32,

    // ========== 调试 ==========
    /// 是否输出每帧调试日志，默认 false
    pub debug_log: bool,
}

impl Default for SkinningConfig {
    fn default() -> Self {
        Self {
            // ====== 输出 ======
            skinning_mode: SkinningMode::Cpu,

            // 顶点较少时线程调度开销比蒙皮本身还大
            parallel_vertex_threshold: 2048,

            // ====== 权重 ======
            weight_epsilon: 1e-6,
            fallback_bone: FallbackBone::Root,

            // ====== 播放 ======
            default_looping: true,
            default_rate_scale: 1.0,

            // ====== 调试 ======
            debug_log: false,
        }
    }
}
