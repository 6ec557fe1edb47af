//! # Grip SDK - 接触式手指抓取控制
//!
//! 仅使用关节位置反馈和接触事件完成抓取判定、稳定与释放。
//!
//! # 架构设计
//!
//! 从底层到高层：
//!
//! - **类型层** (`types`): 角度单位、标识符、驱动增益、配置
//! - **物理层** (`physics`): 物理引擎接口、接触事件队列、Mock 引擎
//! - **控制层** (`control`): 堵转检测、驱动档位、接触计数、抓取状态机
//!
//! # 快速开始
//!
//! ```rust
//! use grip_sdk::prelude::*;
//! # use grip_physics::MockPhysics;
//!
//! # fn main() -> Result<(), GripError> {
//! grip_sdk::logging::init_logger();
//!
//! let physics = MockPhysics::with_segments(["thumb_0", "index_0", "index_1"]);
//! let mut controller = GraspController::new(physics, GripConfig::default())?;
//! let observer = controller.observer();
//!
//! controller.curl_all_fingers(-0.5)?;
//! controller.tick()?;
//! assert_eq!(observer.snapshot().tick, 1);
//! # Ok(())
//! # }
//! ```

pub mod logging;
pub mod prelude;

pub use grip_control as control;
pub use grip_physics as physics;
pub use grip_types as types;

// --- 用户以此为界 ---

pub use grip_control::{GraspController, GraspObserver, GripError};
pub use grip_physics::{PhysicsBackend, PhysicsError};
pub use grip_types::{ConfigError, GripConfig};
