//! 事件钩子
//!
//! 抓取状态变化（开始、取代、确认、中止、释放）和关节段堵转变化
//! 以 `GraspEvent` 的形式通知注册的回调，用于 UI、诊断或录制。
//!
//! # 设计原则
//!
//! - **非阻塞**: 回调在 tick 线程上同步执行，必须立即返回
//! - **Channel 模式**: 需要耗时处理时使用 `ChannelEventHook` 转发到其他线程
//!
//! # 使用示例
//!
//! ```rust
//! use grip_control::{ChannelEventHook, GraspEvent, GraspEventCallback, HookManager};
//! use grip_types::SegmentId;
//! use std::sync::Arc;
//!
//! let mut hooks = HookManager::new();
//! let (hook, rx) = ChannelEventHook::new(64);
//! hooks.add_callback(Arc::new(hook));
//!
//! hooks.trigger_all(&GraspEvent::SegmentRecovered { segment: SegmentId(0) });
//! assert!(rx.try_recv().is_ok());
//! ```

use crossbeam_channel::{Receiver, Sender, TrySendError, bounded};
use grip_physics::PhysicsError;
use grip_types::{AttachmentHandle, BodyHandle, Deg, SegmentId};
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// 等待确认的抓取被中止的原因
#[derive(Debug, Clone, PartialEq)]
pub enum AbortReason {
    /// 结束事件使接触数降到阈值以下
    ContactLost {
        /// 剩余接触数
        touching: usize,
    },
    /// 等待结束时接触数不足
    Disqualified {
        touching: usize,
    },
    /// 物体在等待期间消失
    BodyVanished,
    /// 同步速度或创建附着关节失败（不重试）
    AttachFailed(PhysicsError),
    /// 外部取消
    Cancelled,
}

impl fmt::Display for AbortReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AbortReason::ContactLost { touching } => {
                write!(f, "contact lost ({touching} segments touching)")
            },
            AbortReason::Disqualified { touching } => {
                write!(f, "not enough contacts at settle expiry ({touching} touching)")
            },
            AbortReason::BodyVanished => f.write_str("body vanished"),
            AbortReason::AttachFailed(err) => write!(f, "attach failed: {err}"),
            AbortReason::Cancelled => f.write_str("cancelled"),
        }
    }
}

/// 已确认抓取被释放的原因
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReleaseReason {
    /// 外部请求释放
    External,
    /// 附着关节被引擎断开（超过断裂阈值）
    AttachmentBroken,
    /// 物体被销毁
    BodyVanished,
}

impl fmt::Display for ReleaseReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            ReleaseReason::External => "external release",
            ReleaseReason::AttachmentBroken => "attachment broken",
            ReleaseReason::BodyVanished => "body vanished",
        };
        f.write_str(text)
    }
}

/// 抓取事件
#[derive(Debug, Clone, PartialEq)]
pub enum GraspEvent {
    /// 接触数达到阈值，进入等待确认
    OnsetStarted {
        body: BodyHandle,
        touching: usize,
    },
    /// 新的抓取开始取代了尚在等待的抓取
    Superseded {
        previous: BodyHandle,
        by: BodyHandle,
    },
    /// 抓取确认，物体已附着
    Confirmed {
        body: BodyHandle,
        attachment: AttachmentHandle,
    },
    /// 等待确认的抓取被中止
    Aborted {
        body: BodyHandle,
        reason: AbortReason,
    },
    /// 已确认的抓取被释放
    Released {
        body: BodyHandle,
        reason: ReleaseReason,
    },
    /// 关节段判定为堵转
    SegmentStalled {
        segment: SegmentId,
        angle: Deg,
    },
    /// 关节段从堵转恢复
    SegmentRecovered {
        segment: SegmentId,
    },
}

impl GraspEvent {
    /// 事件关联的刚体（堵转事件为 `None`）
    pub fn body(&self) -> Option<BodyHandle> {
        match self {
            GraspEvent::OnsetStarted { body, .. }
            | GraspEvent::Confirmed { body, .. }
            | GraspEvent::Aborted { body, .. }
            | GraspEvent::Released { body, .. } => Some(*body),
            GraspEvent::Superseded { previous, .. } => Some(*previous),
            GraspEvent::SegmentStalled { .. } | GraspEvent::SegmentRecovered { .. } => None,
        }
    }
}

/// 抓取事件回调 Trait
///
/// # 性能要求
///
/// - **非阻塞**: 在 tick 线程上调用，禁止 I/O 和长时间持锁
/// - 推荐使用 `try_send` 转发
pub trait GraspEventCallback: Send + Sync {
    /// 事件发生时调用
    fn on_event(&self, event: &GraspEvent);
}

/// 钩子管理器
///
/// 回调列表本身不做同步，控制器通过 `parking_lot::RwLock<HookManager>` 共享。
#[derive(Default)]
pub struct HookManager {
    callbacks: Vec<Arc<dyn GraspEventCallback>>,
}

impl fmt::Debug for HookManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HookManager").field("callbacks", &self.callbacks.len()).finish()
    }
}

impl HookManager {
    /// 创建新的钩子管理器
    #[must_use]
    pub const fn new() -> Self {
        Self {
            callbacks: Vec::new(),
        }
    }

    /// 添加回调
    pub fn add_callback(&mut self, callback: Arc<dyn GraspEventCallback>) {
        self.callbacks.push(callback);
    }

    /// 移除所有回调
    pub fn clear(&mut self) {
        self.callbacks.clear();
    }

    /// 按注册顺序触发所有回调
    pub fn trigger_all(&self, event: &GraspEvent) {
        for callback in &self.callbacks {
            callback.on_event(event);
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.callbacks.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.callbacks.is_empty()
    }
}

/// 基于有界 Channel 的事件转发钩子
///
/// 队列满或接收端已销毁时丢弃事件并计数，从不阻塞 tick 线程。
pub struct ChannelEventHook {
    tx: Sender<GraspEvent>,
    dropped_events: Arc<AtomicU64>,
}

impl ChannelEventHook {
    /// 默认队列容量
    pub const DEFAULT_CAPACITY: usize = 1024;

    /// 创建转发钩子
    ///
    /// # 返回
    ///
    /// - `(hook, rx)`: 钩子实例和接收端
    #[must_use]
    pub fn new(capacity: usize) -> (Self, Receiver<GraspEvent>) {
        let (tx, rx) = bounded(capacity);
        let hook = Self {
            tx,
            dropped_events: Arc::new(AtomicU64::new(0)),
        };
        (hook, rx)
    }

    /// 丢弃事件计数器
    ///
    /// 返回 `Arc` 引用，可在注册钩子之前克隆出来用于监控。
    pub fn dropped_events(&self) -> &Arc<AtomicU64> {
        &self.dropped_events
    }
}

impl GraspEventCallback for ChannelEventHook {
    fn on_event(&self, event: &GraspEvent) {
        match self.tx.try_send(event.clone()) {
            Ok(()) => {},
            Err(TrySendError::Full(_) | TrySendError::Disconnected(_)) => {
                self.dropped_events.fetch_add(1, Ordering::Relaxed);
            },
        }
    }
}
