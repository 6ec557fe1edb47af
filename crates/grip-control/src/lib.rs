//! # Grip Control - 手指抓取控制器
//!
//! 仅依靠关节位置反馈与接触事件（无力/力矩传感器）完成抓取判定：
//!
//! ```text
//! 接触事件 ──► ContactTracker ──(达到阈值)──► GraspStateMachine ──► 冻结目标 + 附着物体
//! 关节遥测 ──► StallDetector ──────────────► DriveCommander（hold 覆盖）
//! 控制输入 ──► InputMapper ────────────────► DriveCommander（抓取中被抑制）
//! ```
//!
//! 所有状态转换都发生在固定步长的 tick 上（单线程、协作式），
//! 接触事件可以从任意线程经 `ContactSender` 入队，在下一个 tick 统一处理。
//!
//! # 快速开始
//!
//! ```rust
//! use grip_control::GraspController;
//! use grip_physics::MockPhysics;
//! use grip_types::GripConfig;
//!
//! # fn main() -> Result<(), grip_control::GripError> {
//! let physics = MockPhysics::with_segments(["index_0", "index_1", "thumb_0"]);
//! let mut controller = GraspController::new(physics, GripConfig::default())?;
//!
//! controller.curl_all_fingers(-1.0)?;
//! controller.tick()?;
//! assert!(!controller.is_grasping());
//! # Ok(())
//! # }
//! ```

pub mod contact;
pub mod controller;
pub mod drive;
mod error;
pub mod grabbable;
pub mod grasp;
pub mod hooks;
pub mod input;
pub mod observer;
pub mod segment;
pub mod stall;
pub mod telemetry;

pub use contact::{ContactCandidate, ContactOutcome, ContactTracker, IgnoreReason};
pub use controller::{ControllerStatus, GraspController, TickReport};
pub use drive::{CurlOutcome, DriveCommander};
pub use error::GripError;
pub use grabbable::{GrabbablePolicy, TagOrNamePolicy};
pub use grasp::{GraspPhase, GraspRecord, GraspState, GraspStateMachine};
pub use hooks::{AbortReason, ChannelEventHook, GraspEvent, GraspEventCallback, HookManager, ReleaseReason};
pub use input::InputMapper;
pub use observer::{GraspObserver, GraspSnapshot, SegmentSnapshot};
pub use segment::{DriveMode, Segment};
pub use stall::{StallDetector, StallTransition};
pub use telemetry::{JointTelemetry, TelemetrySample};
