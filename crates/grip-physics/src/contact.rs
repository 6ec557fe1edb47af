//! 接触事件
//!
//! 物理引擎的接触回调（begin / persist / end）被转换为显式的 `ContactEvent`，
//! 经由单消费者队列交给控制器，在下一个 tick 的状态机步进之前统一处理。
//!
//! # 使用示例
//!
//! ```rust
//! use grip_physics::{ContactSink, ContactKind, contact_queue};
//! use grip_types::{BodyHandle, SegmentId};
//!
//! let (sender, receiver) = contact_queue();
//!
//! // 物理回调线程
//! let cb = sender.clone();
//! std::thread::spawn(move || {
//!     cb.on_contact_begin(SegmentId(0), Some(BodyHandle(42)));
//! })
//! .join()
//! .unwrap();
//!
//! // tick 线程：每个 tick 排空一次
//! let events: Vec<_> = receiver.drain().collect();
//! assert_eq!(events.len(), 1);
//! assert_eq!(events[0].kind, ContactKind::Begin);
//! ```

use crossbeam_channel::{Receiver, Sender, TryRecvError, unbounded};
use grip_types::{BodyHandle, SegmentId};
use tracing::trace;

/// 接触事件类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContactKind {
    /// 开始接触
    Begin,
    /// 持续接触（每个物理步都可能上报）
    Persist,
    /// 结束接触
    End,
}

/// 接触事件
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContactEvent {
    /// 事件类型
    pub kind: ContactKind,
    /// 发生接触的关节段
    pub segment: SegmentId,
    /// 另一方刚体；非物理对象（无刚体）为 `None`
    pub body: Option<BodyHandle>,
}

impl ContactEvent {
    /// 创建接触事件
    pub const fn new(kind: ContactKind, segment: SegmentId, body: Option<BodyHandle>) -> Self {
        Self {
            kind,
            segment,
            body,
        }
    }

    /// 开始接触
    pub const fn begin(segment: SegmentId, body: BodyHandle) -> Self {
        Self::new(ContactKind::Begin, segment, Some(body))
    }

    /// 持续接触
    pub const fn persist(segment: SegmentId, body: BodyHandle) -> Self {
        Self::new(ContactKind::Persist, segment, Some(body))
    }

    /// 结束接触
    pub const fn end(segment: SegmentId, body: BodyHandle) -> Self {
        Self::new(ContactKind::End, segment, Some(body))
    }
}

/// 接触事件接收端 Trait
///
/// 物理引擎的回调入口。实现必须非阻塞。
pub trait ContactSink {
    /// 提交事件
    fn submit(&self, event: ContactEvent);

    /// 开始接触回调
    fn on_contact_begin(&self, segment: SegmentId, body: Option<BodyHandle>) {
        self.submit(ContactEvent::new(ContactKind::Begin, segment, body));
    }

    /// 持续接触回调
    fn on_contact_persist(&self, segment: SegmentId, body: Option<BodyHandle>) {
        self.submit(ContactEvent::new(ContactKind::Persist, segment, body));
    }

    /// 结束接触回调
    fn on_contact_end(&self, segment: SegmentId, body: Option<BodyHandle>) {
        self.submit(ContactEvent::new(ContactKind::End, segment, body));
    }
}

/// 接触事件发送端（可跨线程克隆）
#[derive(Debug, Clone)]
pub struct ContactSender {
    tx: Sender<ContactEvent>,
}

impl ContactSink for ContactSender {
    fn submit(&self, event: ContactEvent) {
        // 接收端已销毁（控制器已退出）时静默丢弃
        if self.tx.send(event).is_err() {
            trace!(?event, "contact queue closed, event dropped");
        }
    }
}

/// 接触事件接收端（单消费者）
#[derive(Debug)]
pub struct ContactReceiver {
    rx: Receiver<ContactEvent>,
}

impl ContactReceiver {
    /// 排空当前队列中的所有事件
    ///
    /// 只返回调用时刻之前已入队的事件；此后到达的事件留到下一个 tick。
    pub fn drain(&self) -> impl Iterator<Item = ContactEvent> + '_ {
        let pending = self.rx.len();
        (0..pending).map_while(move |_| match self.rx.try_recv() {
            Ok(event) => Some(event),
            Err(TryRecvError::Empty | TryRecvError::Disconnected) => None,
        })
    }

    /// 队列中的事件数
    pub fn len(&self) -> usize {
        self.rx.len()
    }

    /// 队列是否为空
    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }
}

/// 创建接触事件队列
pub fn contact_queue() -> (ContactSender, ContactReceiver) {
    let (tx, rx) = unbounded();
    (ContactSender { tx }, ContactReceiver { rx })
}
