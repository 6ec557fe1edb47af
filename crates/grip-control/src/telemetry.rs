//! 关节遥测
//!
//! 读取单个关节段的当前角度（引擎报告弧度，这里统一换算为角度）
//! 以及相对驱动目标的跟踪误差。

use crate::segment::Segment;
use grip_physics::{PhysicsBackend, PhysicsError};
use grip_types::Deg;

/// 单帧遥测
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TelemetrySample {
    /// 当前角度
    pub angle: Deg,
    /// 跟踪误差 `|drive_target - angle|`
    pub error: Deg,
}

/// 关节遥测读取器
#[derive(Debug, Default, Clone, Copy)]
pub struct JointTelemetry;

impl JointTelemetry {
    /// 读取一个关节段
    pub fn sample<B: PhysicsBackend + ?Sized>(
        backend: &B,
        segment: &Segment,
    ) -> Result<TelemetrySample, PhysicsError> {
        let angle = backend.joint_angle(segment.id())?.to_deg();
        Ok(TelemetrySample {
            angle,
            error: segment.drive_target().distance(angle),
        })
    }
}
