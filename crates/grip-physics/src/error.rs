//! 物理层错误类型定义

use grip_types::{AttachmentHandle, BodyHandle, SegmentId};
use thiserror::Error;

/// 物理引擎错误
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PhysicsError {
    /// 关节段不存在
    #[error("Unknown segment: {0}")]
    UnknownSegment(SegmentId),

    /// 刚体不存在（可能已被销毁）
    #[error("Unknown body: {0}")]
    UnknownBody(BodyHandle),

    /// 附着关节不存在
    #[error("Unknown attachment: {0}")]
    UnknownAttachment(AttachmentHandle),

    /// 机械臂上的附着锚点缺失
    #[error("Attachment anchor missing")]
    AnchorMissing,

    /// 引擎拒绝创建附着关节
    #[error("Attachment rejected: {0}")]
    AttachmentRejected(String),

    /// 其他引擎错误
    #[error("Backend error: {0}")]
    Backend(String),
}
