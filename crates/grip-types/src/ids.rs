//! 标识符类型
//!
//! 物理引擎中的对象以不透明句柄表示；控制器只保存句柄，不持有引擎对象本身。

use serde::{Deserialize, Serialize};
use std::fmt;

/// 手指关节段索引
///
/// 索引顺序即每个 tick 的遍历顺序（初始化时由关节链发现顺序决定）。
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SegmentId(pub usize);

impl SegmentId {
    /// 获取索引
    #[inline]
    pub const fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for SegmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "S{}", self.0)
    }
}

impl From<usize> for SegmentId {
    fn from(index: usize) -> Self {
        SegmentId(index)
    }
}

/// 外部刚体句柄（稳定标识）
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BodyHandle(pub u64);

impl fmt::Display for BodyHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "body#{}", self.0)
    }
}

/// 可断裂附着关节句柄
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AttachmentHandle(pub u64);

impl fmt::Display for AttachmentHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "joint#{}", self.0)
    }
}
