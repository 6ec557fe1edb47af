//! 物理引擎接口
//!
//! 控制器通过 `PhysicsBackend` 访问外部物理引擎。所有方法都在控制器的
//! tick 线程上同步调用，实现无需内部加锁。

use crate::body::{AttachmentSpec, BodyInfo, BodyVelocity};
use crate::error::PhysicsError;
use grip_types::{AttachmentHandle, BodyHandle, DriveCommand, Rad, SegmentId};

/// 关节段描述（初始化时从关节链发现）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmentInfo {
    /// 关节段索引
    pub id: SegmentId,
    /// 关节段名称
    pub name: String,
}

impl SegmentInfo {
    /// 创建关节段描述
    pub fn new(id: impl Into<SegmentId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

/// 物理引擎 Trait
///
/// # 约定
///
/// - 角度以弧度报告，驱动目标以角度写入（由实现负责转换）
/// - `body_info` 返回 `None` 表示刚体已不存在
/// - 附着关节可能被引擎自行断开（超过断裂阈值），控制器通过
///   `attachment_alive` 周期性检查
pub trait PhysicsBackend {
    /// 发现手指关节链上的所有关节段
    fn segments(&self) -> Vec<SegmentInfo>;

    /// 读取关节当前角度
    fn joint_angle(&self, segment: SegmentId) -> Result<Rad, PhysicsError>;

    /// 写入驱动目标和增益
    fn apply_drive(&mut self, segment: SegmentId, command: &DriveCommand)
    -> Result<(), PhysicsError>;

    /// 查询刚体信息
    fn body_info(&self, body: BodyHandle) -> Option<BodyInfo>;

    /// 读取刚体速度
    fn body_velocity(&self, body: BodyHandle) -> Result<BodyVelocity, PhysicsError>;

    /// 设置刚体速度
    fn set_body_velocity(
        &mut self,
        body: BodyHandle,
        velocity: BodyVelocity,
    ) -> Result<(), PhysicsError>;

    /// 读取机械臂参考系（附着锚点）的速度
    fn anchor_velocity(&self) -> Result<BodyVelocity, PhysicsError>;

    /// 在刚体与锚点之间创建可断裂的附着关节
    fn create_attachment(
        &mut self,
        body: BodyHandle,
        spec: &AttachmentSpec,
    ) -> Result<AttachmentHandle, PhysicsError>;

    /// 销毁附着关节
    fn destroy_attachment(&mut self, handle: AttachmentHandle) -> Result<(), PhysicsError>;

    /// 附着关节是否仍然存在
    fn attachment_alive(&self, handle: AttachmentHandle) -> bool;
}
