//! 只读观察器
//!
//! 控制器在每个 tick 结束时发布一份完整快照，`GraspObserver` 可在任意线程
//! 无锁读取（ArcSwap::load，Wait-Free），用于 UI 和诊断。
//!
//! # 使用示例
//!
//! ```rust
//! use grip_control::GraspController;
//! use grip_physics::MockPhysics;
//! use grip_types::{GripConfig, SegmentId};
//!
//! # fn main() -> Result<(), grip_control::GripError> {
//! let physics = MockPhysics::with_segments(["index_0", "index_1"]);
//! let mut controller = GraspController::new(physics, GripConfig::default())?;
//! let observer = controller.observer();
//!
//! let ui = std::thread::spawn(move || observer.is_stalled(SegmentId(0)));
//! controller.tick()?;
//! assert!(!ui.join().unwrap());
//! # Ok(())
//! # }
//! ```

use crate::controller::ControllerStatus;
use crate::grasp::GraspState;
use crate::segment::{DriveMode, Segment};
use arc_swap::ArcSwap;
use grip_types::{BodyHandle, Deg, SegmentId};
use std::sync::Arc;

/// 单个关节段快照
#[derive(Debug, Clone, PartialEq)]
pub struct SegmentSnapshot {
    pub id: SegmentId,
    pub name: String,
    pub angle: Deg,
    pub target_curl: Deg,
    pub drive_target: Deg,
    pub frozen_angle: Option<Deg>,
    pub stall_counter: u32,
    pub stalled: bool,
    pub mode: DriveMode,
}

impl From<&Segment> for SegmentSnapshot {
    fn from(segment: &Segment) -> Self {
        Self {
            id: segment.id(),
            name: segment.name().to_string(),
            angle: segment.current_angle(),
            target_curl: segment.target_curl(),
            drive_target: segment.drive_target(),
            frozen_angle: segment.frozen_angle(),
            stall_counter: segment.stall_counter(),
            stalled: segment.is_stalled(),
            mode: segment.mode(),
        }
    }
}

/// 控制器快照
#[derive(Debug, Clone, PartialEq, Default)]
pub struct GraspSnapshot {
    /// 发布时的 tick 编号（0 表示尚未 tick）
    pub tick: u64,
    pub status: ControllerStatus,
    pub state: GraspState,
    pub is_grasping: bool,
    pub angles_frozen: bool,
    /// 等待确认的物体
    pub pending: Option<BodyHandle>,
    /// 已确认抓取的物体
    pub grasped: Vec<BodyHandle>,
    pub segments: Vec<SegmentSnapshot>,
}

impl GraspSnapshot {
    /// 按标识查找关节段（标识不要求连续）
    pub fn segment(&self, segment: SegmentId) -> Option<&SegmentSnapshot> {
        self.segments.iter().find(|s| s.id == segment)
    }
}

/// 只读观察器（可克隆，跨线程共享）
#[derive(Debug, Clone)]
pub struct GraspObserver {
    snapshot: Arc<ArcSwap<GraspSnapshot>>,
}

impl GraspObserver {
    pub(crate) fn new(initial: GraspSnapshot) -> Self {
        Self {
            snapshot: Arc::new(ArcSwap::from_pointee(initial)),
        }
    }

    /// 发布新快照（仅控制器调用）
    pub(crate) fn publish(&self, snapshot: GraspSnapshot) {
        self.snapshot.store(Arc::new(snapshot));
    }

    /// 最新快照
    pub fn snapshot(&self) -> Arc<GraspSnapshot> {
        self.snapshot.load_full()
    }

    pub fn is_grasping(&self) -> bool {
        self.snapshot.load().is_grasping
    }

    /// 关节段是否堵转（越界返回 `false`）
    pub fn is_stalled(&self, segment: SegmentId) -> bool {
        self.snapshot.load().segment(segment).is_some_and(|s| s.stalled)
    }

    pub fn state(&self) -> GraspState {
        self.snapshot.load().state
    }
}
