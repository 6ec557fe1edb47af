//! # Grip Types - 共享类型定义
//!
//! **依赖原则**: 不依赖任何 workspace 内部 crate
//!
//! ## 包含模块
//!
//! - `units` - 强类型角度单位（`Deg` / `Rad`）
//! - `ids` - 关节段、刚体、附着关节的标识符
//! - `drive` - 驱动增益配置（drive / hold 两档）
//! - `config` - 控制器配置（TOML 加载 + 校验）
//! - `error` - 配置错误类型

pub mod config;
pub mod drive;
pub mod error;
pub mod ids;
pub mod units;

// 重新导出常用类型
pub use config::{
    DriveConfig, GrabbableConfig, GraspConfig, GripConfig, InputConfig, StallConfig, TimingConfig,
};
pub use drive::{DriveCommand, DriveGains, DriveProfile};
pub use error::ConfigError;
pub use ids::{AttachmentHandle, BodyHandle, SegmentId};
pub use units::{Deg, Rad};
