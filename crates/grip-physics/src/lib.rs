//! # Grip Physics - 物理引擎边界
//!
//! 抓取控制器不实现任何碰撞检测、刚体动力学或关节求解，
//! 这些全部由外部物理引擎提供。本 crate 定义控制器消费的接口：
//!
//! - `backend` - `PhysicsBackend` trait（关节遥测、驱动写入、刚体查询、附着关节）
//! - `body` - 刚体信息、速度、附着关节参数
//! - `contact` - 接触事件与单消费者事件队列
//! - `mock` - 确定性 Mock 引擎（`mock` feature）

pub mod backend;
pub mod body;
pub mod contact;
mod error;

#[cfg(feature = "mock")]
pub mod mock;

pub use backend::{PhysicsBackend, SegmentInfo};
pub use body::{AttachmentSpec, BodyInfo, BodyVelocity};
pub use contact::{
    ContactEvent, ContactKind, ContactReceiver, ContactSender, ContactSink, contact_queue,
};
pub use error::PhysicsError;

#[cfg(feature = "mock")]
pub use mock::{MockBody, MockPhysics, MockSegment};
