//! 驱动器参数
//!
//! 每个关节段的驱动器暴露 目标角度 + 刚度/阻尼/力限 四个参数，
//! 控制器每个 tick 整体写入一次（写入是幂等的）。

use crate::units::Deg;
use serde::{Deserialize, Serialize};

/// 驱动增益
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DriveGains {
    /// 刚度
    pub stiffness: f64,
    /// 阻尼
    pub damping: f64,
    /// 最大输出力
    pub force_limit: f64,
}

impl DriveGains {
    /// 创建增益
    pub const fn new(stiffness: f64, damping: f64, force_limit: f64) -> Self {
        Self {
            stiffness,
            damping,
            force_limit,
        }
    }

    /// 默认的 drive 档（高增益，自由运动时响应快）
    pub const DRIVE: Self = Self::new(10_000.0, 100.0, 1_000.0);

    /// 默认的 hold 档（低增益，保持抓握但不压坏物体）
    pub const HOLD: Self = Self::new(500.0, 50.0, 50.0);

    /// 三个参数都非负
    pub fn is_valid(&self) -> bool {
        self.stiffness >= 0.0 && self.damping >= 0.0 && self.force_limit >= 0.0
    }
}

/// 增益档位
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DriveProfile {
    /// 自由运动（高增益）
    Drive,
    /// 保持（低增益）
    Hold,
}

/// 单个关节段一次完整的驱动写入
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DriveCommand {
    /// 目标角度
    pub target: Deg,
    /// 增益档位（仅用于诊断）
    pub profile: DriveProfile,
    /// 实际写入的增益
    pub gains: DriveGains,
}

impl DriveCommand {
    /// 创建驱动命令
    pub const fn new(target: Deg, profile: DriveProfile, gains: DriveGains) -> Self {
        Self {
            target,
            profile,
            gains,
        }
    }
}
