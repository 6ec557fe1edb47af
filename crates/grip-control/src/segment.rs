//! 关节段状态
//!
//! 每个手指关节段在初始化时从关节链创建，此后每个 tick 由
//! StallDetector / DriveCommander / GraspStateMachine 原地更新。

use grip_types::{Deg, SegmentId};
use std::fmt;

/// 驱动档位选择结果
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DriveMode {
    /// 自由运动：驱动目标斜坡追踪用户弯曲目标，drive 增益
    #[default]
    Free,
    /// 堵转保持：停在最后一次驱动目标，hold 增益
    HoldStalled,
    /// 抓取冻结：停在冻结角，hold 增益
    HoldFrozen,
}

impl fmt::Display for DriveMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DriveMode::Free => "free",
            DriveMode::HoldStalled => "hold-stalled",
            DriveMode::HoldFrozen => "hold-frozen",
        };
        f.write_str(name)
    }
}

/// 手指关节段
///
/// **不变量**：
/// - `target_curl` 始终位于 `[min_curl_angle, 0]`
/// - `frozen_angle` 仅在抓取保持期间为 `Some`
#[derive(Debug, Clone, PartialEq)]
pub struct Segment {
    id: SegmentId,
    name: String,
    /// 本 tick 读到的角度
    pub(crate) current_angle: Deg,
    /// 上一 tick 的角度
    pub(crate) previous_angle: Deg,
    /// 用户命令的弯曲目标
    pub(crate) target_curl: Deg,
    /// 实际写入驱动器的目标（斜坡追踪 `target_curl`）
    pub(crate) drive_target: Deg,
    /// 抓取开始时的角度快照
    pub(crate) frozen_angle: Option<Deg>,
    /// 连续堵转帧计数
    pub(crate) stall_counter: u32,
    /// 是否判定为堵转
    pub(crate) stalled: bool,
    /// 本 tick 选择的驱动档位
    pub(crate) mode: DriveMode,
}

impl Segment {
    /// 以初始角度创建关节段
    ///
    /// 驱动目标从当前角度开始，弯曲目标为当前角度限制到 `[min_curl, 0]`，
    /// 上电时不会跳变。
    pub fn new(id: SegmentId, name: impl Into<String>, initial: Deg, min_curl: Deg) -> Self {
        Self {
            id,
            name: name.into(),
            current_angle: initial,
            previous_angle: initial,
            target_curl: initial.clamp(min_curl, Deg::ZERO),
            drive_target: initial,
            frozen_angle: None,
            stall_counter: 0,
            stalled: false,
            mode: DriveMode::Free,
        }
    }

    pub fn id(&self) -> SegmentId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn current_angle(&self) -> Deg {
        self.current_angle
    }

    pub fn previous_angle(&self) -> Deg {
        self.previous_angle
    }

    pub fn target_curl(&self) -> Deg {
        self.target_curl
    }

    pub fn drive_target(&self) -> Deg {
        self.drive_target
    }

    pub fn frozen_angle(&self) -> Option<Deg> {
        self.frozen_angle
    }

    pub fn stall_counter(&self) -> u32 {
        self.stall_counter
    }

    pub fn is_stalled(&self) -> bool {
        self.stalled
    }

    pub fn mode(&self) -> DriveMode {
        self.mode
    }

    /// 记录新一帧的角度
    pub(crate) fn observe(&mut self, angle: Deg) {
        self.previous_angle = self.current_angle;
        self.current_angle = angle;
    }

    /// 冻结到当前角度
    pub(crate) fn freeze(&mut self) {
        self.frozen_angle = Some(self.current_angle);
    }

    /// 解除冻结
    ///
    /// 驱动目标从冻结角继续，避免解除瞬间跳回冻结前的目标。
    pub(crate) fn unfreeze(&mut self) {
        if let Some(angle) = self.frozen_angle.take() {
            self.drive_target = angle;
        }
    }

    /// 清除堵转状态
    pub(crate) fn clear_stall(&mut self) {
        self.stall_counter = 0;
        self.stalled = false;
    }
}
