//! 控制器错误类型定义

use grip_physics::PhysicsError;
use grip_types::ConfigError;
use thiserror::Error;

/// 控制器错误
///
/// 除 `Disabled` 外均可恢复；`Disabled` 只对当前控制器实例致命，
/// 不影响宿主进程。
#[derive(Error, Debug)]
pub enum GripError {
    /// 配置错误
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// 物理引擎错误
    #[error("Physics error: {0}")]
    Physics(#[from] PhysicsError),

    /// 控制器已禁用（初始化时未发现任何关节段）
    #[error("Controller disabled: {reason}")]
    Disabled {
        /// 禁用原因
        reason: String,
    },

    /// 关节段索引越界
    #[error("Unknown segment index {index} (segment count: {count})")]
    UnknownSegment {
        /// 请求的索引
        index: usize,
        /// 关节段总数
        count: usize,
    },
}

impl GripError {
    /// 是否为致命错误（控制器实例不可继续使用）
    pub fn is_fatal(&self) -> bool {
        matches!(self, GripError::Disabled { .. })
    }
}
