//! Prelude - 常用类型的便捷导入
//!
//! ```rust
//! use grip_sdk::prelude::*;
//! ```

// 控制器
pub use grip_control::{
    CurlOutcome, GraspController, GraspEvent, GraspEventCallback, GraspObserver, GraspSnapshot,
    GraspState, GripError,
};

// 物理引擎边界（常用 Trait）
pub use grip_physics::{ContactEvent, ContactSink, PhysicsBackend, PhysicsError};

// 类型
pub use grip_types::{BodyHandle, Deg, GripConfig, Rad, SegmentId};

#[cfg(feature = "mock")]
pub use grip_physics::MockPhysics;
