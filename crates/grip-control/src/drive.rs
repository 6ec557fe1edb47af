//! 驱动指令
//!
//! 每个 tick 为每个关节段选择一种档位并生成驱动命令：
//!
//! | 档位 | 条件 | 目标 | 增益 |
//! |------|------|------|------|
//! | `HoldFrozen` | 抓取保持中 | 冻结角 | hold |
//! | `HoldStalled` | 堵转（无抓取） | 最后一次驱动目标 | hold |
//! | `Free` | 其他 | 以 `rotation_speed × dt` 斜坡追踪弯曲目标 | drive |
//!
//! 增益每个 tick 都会重新写入（写入是幂等的）。

use crate::segment::{DriveMode, Segment};
use grip_types::{Deg, DriveCommand, DriveGains, DriveProfile, GripConfig};

/// `set_curl_command` 的结果
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CurlOutcome {
    /// 弯曲目标已更新
    Applied {
        /// 更新后的弯曲目标
        target: Deg,
    },
    /// 抓取中，输入被抑制
    Grasping,
    /// 关节段堵转，继续弯曲的输入被阻止（伸展始终允许）
    Stalled,
}

impl CurlOutcome {
    /// 输入是否被接受
    pub fn is_applied(&self) -> bool {
        matches!(self, CurlOutcome::Applied { .. })
    }
}

/// 驱动指令生成器
#[derive(Debug, Clone, Copy)]
pub struct DriveCommander {
    rotation_speed_deg_per_s: f64,
    dt_s: f64,
    min_curl: Deg,
    drive_gains: DriveGains,
    hold_gains: DriveGains,
}

impl DriveCommander {
    /// 从配置创建
    pub fn new(config: &GripConfig) -> Self {
        Self {
            rotation_speed_deg_per_s: config.drive.rotation_speed_deg_per_s,
            dt_s: config.timing.fixed_dt_s,
            min_curl: config.drive.min_curl_angle(),
            drive_gains: config.drive.drive_gains,
            hold_gains: config.drive.hold_gains,
        }
    }

    /// 最大弯曲角
    pub fn min_curl(&self) -> Deg {
        self.min_curl
    }

    /// 单个 tick 驱动目标的最大变化
    pub fn max_step(&self) -> Deg {
        Deg(self.rotation_speed_deg_per_s * self.dt_s)
    }

    /// 选择档位（冻结优先于堵转）
    pub fn select_mode(segment: &Segment) -> DriveMode {
        if segment.frozen_angle().is_some() {
            DriveMode::HoldFrozen
        } else if segment.is_stalled() {
            DriveMode::HoldStalled
        } else {
            DriveMode::Free
        }
    }

    /// 更新一个关节段的驱动目标并生成本 tick 的驱动命令
    pub fn update(&self, segment: &mut Segment) -> DriveCommand {
        let mode = Self::select_mode(segment);
        segment.mode = mode;

        match (mode, segment.frozen_angle()) {
            (DriveMode::HoldFrozen, Some(frozen)) => {
                DriveCommand::new(frozen, DriveProfile::Hold, self.hold_gains)
            },
            (DriveMode::HoldStalled, _) => {
                DriveCommand::new(segment.drive_target(), DriveProfile::Hold, self.hold_gains)
            },
            _ => {
                segment.drive_target = segment
                    .drive_target()
                    .step_toward(segment.target_curl(), self.max_step());
                DriveCommand::new(segment.drive_target(), DriveProfile::Drive, self.drive_gains)
            },
        }
    }

    /// 累加弯曲输入
    ///
    /// `input` 限制到 `[-1, 1]`（NaN 视为 0），负值为弯曲、正值为伸展。
    /// 目标按 `input × rotation_speed × dt` 累加并限制到 `[min_curl, 0]`。
    ///
    /// # 参数
    ///
    /// - `grasping`: 是否存在任何抓取记录；为 `true` 时输入被抑制
    pub fn set_curl(&self, segment: &mut Segment, input: f64, grasping: bool) -> CurlOutcome {
        if grasping {
            return CurlOutcome::Grasping;
        }
        let input = if input.is_nan() { 0.0 } else { input.clamp(-1.0, 1.0) };
        if segment.is_stalled() && input < 0.0 {
            return CurlOutcome::Stalled;
        }

        let delta = Deg(input * self.rotation_speed_deg_per_s * self.dt_s);
        let target = (segment.target_curl() + delta).clamp(self.min_curl, Deg::ZERO);
        segment.target_curl = target;
        CurlOutcome::Applied { target }
    }
}
