//! 抓取控制器
//!
//! `GraspController` 把各组件串成固定步长的 tick 循环。每个 tick 的顺序固定：
//!
//! 1. 按关节段顺序读取遥测（冻结快照使用本 tick 的角度）
//! 2. 排空接触事件队列并逐个分发
//! 3. 抓取状态机步进（物体与附着关节存活检查、等待计时）
//! 4. 按关节段顺序：堵转检测 → 驱动更新 → 写入驱动器
//! 5. 发布快照，触发事件钩子
//!
//! 第 N 个 tick 之前入队的接触事件在第 N 个 tick 的等待到期判定之前生效。
//!
//! 单线程协作式：任何操作都不阻塞，接触事件可从其他线程经
//! `contact_sender()` 入队。
//!
//! # 使用示例
//!
//! ```rust
//! use grip_control::{ChannelEventHook, GraspController};
//! use grip_physics::{ContactSink, MockPhysics};
//! use grip_types::{GripConfig, SegmentId};
//! use std::sync::Arc;
//!
//! # fn main() -> Result<(), grip_control::GripError> {
//! let mut physics = MockPhysics::with_segments(["s0", "s1", "s2"]);
//! let cube = physics.add_body("cube", Some("Grabbable"));
//!
//! let mut controller = GraspController::new(physics, GripConfig::default())?;
//! let (hook, events) = ChannelEventHook::new(64);
//! controller.hooks().write().add_callback(Arc::new(hook));
//!
//! let contacts = controller.contact_sender();
//! for i in 0..3 {
//!     contacts.on_contact_begin(SegmentId(i), Some(cube));
//! }
//! controller.tick()?;
//!
//! assert!(controller.is_grasping());
//! assert!(events.try_recv().is_ok());
//! # Ok(())
//! # }
//! ```

use crate::contact::{ContactOutcome, ContactTracker};
use crate::drive::{CurlOutcome, DriveCommander};
use crate::error::GripError;
use crate::grabbable::{GrabbablePolicy, TagOrNamePolicy};
use crate::grasp::{GraspState, GraspStateMachine};
use crate::hooks::{AbortReason, GraspEvent, HookManager, ReleaseReason};
use crate::input::InputMapper;
use crate::observer::{GraspObserver, GraspSnapshot, SegmentSnapshot};
use crate::segment::Segment;
use crate::stall::{StallDetector, StallTransition};
use crate::telemetry::{JointTelemetry, TelemetrySample};
use grip_physics::{
    ContactEvent, ContactKind, ContactReceiver, ContactSender, PhysicsBackend, contact_queue,
};
use grip_types::{BodyHandle, GripConfig, SegmentId};
use parking_lot::RwLock;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, trace, warn};

/// 控制器状态
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ControllerStatus {
    /// 正常运行
    #[default]
    Active,
    /// 已禁用（初始化时未发现关节段），所有操作返回 `GripError::Disabled`
    Disabled { reason: String },
}

impl ControllerStatus {
    pub fn is_active(&self) -> bool {
        matches!(self, ControllerStatus::Active)
    }
}

impl fmt::Display for ControllerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ControllerStatus::Active => f.write_str("active"),
            ControllerStatus::Disabled { reason } => write!(f, "disabled ({reason})"),
        }
    }
}

/// 单个 tick 的执行结果
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TickReport {
    /// tick 编号（从 1 开始）
    pub tick: u64,
    /// 本 tick 处理的接触事件数
    pub contacts_processed: usize,
    /// 本 tick 产生的事件（已同步触发钩子）
    pub events: Vec<GraspEvent>,
}

/// 抓取控制器
pub struct GraspController<B: PhysicsBackend> {
    backend: B,
    config: GripConfig,
    status: ControllerStatus,
    segments: Vec<Segment>,
    stall: StallDetector,
    drive: DriveCommander,
    tracker: ContactTracker,
    grasp: GraspStateMachine,
    input: InputMapper,
    contact_tx: ContactSender,
    contact_rx: ContactReceiver,
    observer: GraspObserver,
    hooks: Arc<RwLock<HookManager>>,
    tick: u64,
}

impl<B: PhysicsBackend + fmt::Debug> fmt::Debug for GraspController<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GraspController")
            .field("backend", &self.backend)
            .field("status", &self.status)
            .field("tick", &self.tick)
            .field("segments", &self.segments)
            .field("grasp", &self.grasp)
            .finish_non_exhaustive()
    }
}

impl<B: PhysicsBackend> GraspController<B> {
    /// 创建控制器
    ///
    /// 从关节链发现关节段并以当前角度初始化（上电不跳变）。
    ///
    /// # 错误
    ///
    /// - `GripError::Config`: 配置校验失败
    /// - `GripError::UnknownSegment`: `input.finger_groups` 引用了不存在的关节段
    /// - `GripError::Physics`: 读取初始角度失败
    ///
    /// 未发现任何关节段时**不**返回错误，而是返回 `Disabled` 状态的控制器。
    pub fn new(backend: B, config: GripConfig) -> Result<Self, GripError> {
        config.validate()?;

        let infos = backend.segments();
        let status = if infos.is_empty() {
            let reason = "no finger segments discovered".to_string();
            warn!(%reason, "grasp controller disabled");
            ControllerStatus::Disabled { reason }
        } else {
            ControllerStatus::Active
        };

        let count = infos.len();
        if let Some(index) = config
            .input
            .finger_groups
            .iter()
            .flatten()
            .copied()
            .find(|index| *index >= count)
            .filter(|_| status.is_active())
        {
            return Err(GripError::UnknownSegment { index, count });
        }

        let min_curl = config.drive.min_curl_angle();
        let mut segments = Vec::with_capacity(count);
        for info in infos {
            let angle = backend.joint_angle(info.id)?.to_deg();
            segments.push(Segment::new(info.id, info.name, angle, min_curl));
        }

        let (contact_tx, contact_rx) = contact_queue();
        let mut controller = Self {
            stall: StallDetector::new(&config.stall, &config.drive),
            drive: DriveCommander::new(&config),
            tracker: ContactTracker::new(
                config.grasp.required_segments,
                TagOrNamePolicy::new(&config.grabbable),
            ),
            grasp: GraspStateMachine::new(&config.grasp),
            input: InputMapper::new(&config.input, count),
            observer: GraspObserver::new(GraspSnapshot::default()),
            hooks: Arc::new(RwLock::new(HookManager::new())),
            backend,
            config,
            status,
            segments,
            contact_tx,
            contact_rx,
            tick: 0,
        };
        controller.publish();

        if controller.is_enabled() {
            info!(
                segments = controller.segments.len(),
                required = controller.config.grasp.required_segments,
                settle_ticks = controller.config.grasp.settle_ticks,
                "grasp controller initialised"
            );
        }
        Ok(controller)
    }

    pub fn status(&self) -> &ControllerStatus {
        &self.status
    }

    pub fn is_enabled(&self) -> bool {
        self.status.is_active()
    }

    pub fn config(&self) -> &GripConfig {
        &self.config
    }

    /// 已执行的 tick 数
    pub fn tick_count(&self) -> u64 {
        self.tick
    }

    /// 执行一个固定步长 tick
    pub fn tick(&mut self) -> Result<TickReport, GripError> {
        self.ensure_enabled()?;
        self.tick += 1;
        let mut events = Vec::new();

        let samples = self.sample_segments();

        let contacts: Vec<ContactEvent> = self.contact_rx.drain().collect();
        for event in &contacts {
            self.dispatch_contact(*event, &mut events);
        }

        self.grasp.step(
            &mut self.backend,
            &mut self.tracker,
            &mut self.segments,
            &mut events,
        );

        self.update_segments(&samples, &mut events);

        self.publish();
        self.trigger(&events);
        Ok(TickReport {
            tick: self.tick,
            contacts_processed: contacts.len(),
            events,
        })
    }

    /// 累加单个关节段的弯曲输入
    ///
    /// # 参数
    ///
    /// - `segment`: 关节段
    /// - `input`: `[-1, 1]`，负值弯曲、正值伸展
    pub fn set_curl_command(
        &mut self,
        segment: impl Into<SegmentId>,
        input: f64,
    ) -> Result<CurlOutcome, GripError> {
        self.ensure_enabled()?;
        let id = segment.into();
        let grasping = self.grasp.is_grasping();
        let count = self.segments.len();
        let segment = self
            .segments
            .iter_mut()
            .find(|s| s.id() == id)
            .ok_or(GripError::UnknownSegment {
                index: id.index(),
                count,
            })?;
        Ok(self.drive.set_curl(segment, input, grasping))
    }

    /// 对所有关节段广播同一个弯曲输入
    ///
    /// # 返回
    ///
    /// 被接受的关节段数
    pub fn curl_all_fingers(&mut self, input: f64) -> Result<usize, GripError> {
        self.ensure_enabled()?;
        let grasping = self.grasp.is_grasping();
        let mut applied = 0;
        for segment in self.segments.iter_mut() {
            if self.drive.set_curl(segment, input, grasping).is_applied() {
                applied += 1;
            }
        }
        Ok(applied)
    }

    /// 按手指分组应用多轴输入（每组一个轴）
    ///
    /// # 返回
    ///
    /// 被接受的关节段数
    pub fn apply_input(&mut self, axes: &[f64]) -> Result<usize, GripError> {
        self.ensure_enabled()?;
        let mut applied = 0;
        for (segment, value) in self.input.map(axes) {
            if self.set_curl_command(segment, value)?.is_applied() {
                applied += 1;
            }
        }
        Ok(applied)
    }

    /// 同步分发一个接触事件（物理回调与 tick 在同一线程时使用）
    pub fn handle_contact(&mut self, event: ContactEvent) -> Result<(), GripError> {
        self.ensure_enabled()?;
        let mut events = Vec::new();
        self.dispatch_contact(event, &mut events);
        self.publish();
        self.trigger(&events);
        Ok(())
    }

    /// 接触事件发送端（可克隆到物理回调线程）
    pub fn contact_sender(&self) -> ContactSender {
        self.contact_tx.clone()
    }

    /// 外部释放一个物体
    ///
    /// 已确认的抓取被释放；等待确认的抓取被取消。
    ///
    /// # 返回
    ///
    /// 该物体存在抓取记录时返回 `true`
    pub fn release(&mut self, body: BodyHandle) -> Result<bool, GripError> {
        self.ensure_enabled()?;
        let mut events = Vec::new();
        let released = self.grasp.release(
            body,
            ReleaseReason::External,
            &mut self.backend,
            &mut self.tracker,
            &mut self.segments,
            &mut events,
        ) || self
            .grasp
            .abort(body, AbortReason::Cancelled, &mut self.segments, &mut events);
        self.publish();
        self.trigger(&events);
        Ok(released)
    }

    /// 外部释放全部物体
    pub fn release_all(&mut self) -> Result<(), GripError> {
        self.ensure_enabled()?;
        let mut events = Vec::new();
        self.grasp.release_all(
            &mut self.backend,
            &mut self.tracker,
            &mut self.segments,
            &mut events,
        );
        self.publish();
        self.trigger(&events);
        Ok(())
    }

    /// 替换可抓取识别策略
    pub fn set_grabbable_policy(&mut self, policy: impl GrabbablePolicy + 'static) {
        self.tracker.set_policy(policy);
    }

    /// 是否存在任何抓取记录（等待或已确认）
    pub fn is_grasping(&self) -> bool {
        self.grasp.is_grasping()
    }

    pub fn angles_frozen(&self) -> bool {
        self.grasp.angles_frozen()
    }

    pub fn grasp_state(&self) -> GraspState {
        self.grasp.state()
    }

    pub fn grasp(&self) -> &GraspStateMachine {
        &self.grasp
    }

    /// 关节段是否堵转（不存在的关节段返回 `false`）
    pub fn is_stalled(&self, segment: SegmentId) -> bool {
        self.segment(segment).is_some_and(Segment::is_stalled)
    }

    pub fn segment(&self, segment: SegmentId) -> Option<&Segment> {
        self.segments.iter().find(|s| s.id() == segment)
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// 接触某个物体的关节段数
    pub fn touching_count(&self, body: BodyHandle) -> usize {
        self.tracker.count(body)
    }

    pub fn tracker(&self) -> &ContactTracker {
        &self.tracker
    }

    /// 只读观察器（可跨线程）
    pub fn observer(&self) -> GraspObserver {
        self.observer.clone()
    }

    /// 事件钩子
    pub fn hooks(&self) -> &Arc<RwLock<HookManager>> {
        &self.hooks
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    fn ensure_enabled(&self) -> Result<(), GripError> {
        match &self.status {
            ControllerStatus::Active => Ok(()),
            ControllerStatus::Disabled { reason } => Err(GripError::Disabled {
                reason: reason.clone(),
            }),
        }
    }

    fn dispatch_contact(&mut self, event: ContactEvent, events: &mut Vec<GraspEvent>) {
        let Some(body) = event.body else {
            trace!(segment = %event.segment, kind = ?event.kind, "non-physical contact ignored");
            return;
        };
        if self.segment(event.segment).is_none() {
            debug!(segment = %event.segment, %body, "contact for unknown segment ignored");
            return;
        }

        let outcome = match event.kind {
            ContactKind::Begin => {
                let info = self.backend.body_info(body);
                let engaged = self.grasp.is_engaged(body);
                self.tracker.on_begin(event.segment, body, info.as_ref(), engaged)
            },
            ContactKind::Persist => {
                let info = self.backend.body_info(body);
                self.tracker.on_persist(event.segment, body, info.as_ref())
            },
            ContactKind::End => {
                let confirmed = self.grasp.is_confirmed(body);
                self.tracker.on_end(event.segment, body, confirmed)
            },
        };

        match outcome {
            ContactOutcome::ThresholdReached { count } => {
                self.grasp.begin_onset(body, count, &mut self.segments, events);
            },
            ContactOutcome::BelowThreshold { count } => {
                self.grasp.abort(
                    body,
                    AbortReason::ContactLost { touching: count },
                    &mut self.segments,
                    events,
                );
            },
            ContactOutcome::Ignored(reason) => {
                debug!(segment = %event.segment, %body, kind = ?event.kind, ?reason, "contact ignored");
            },
            ContactOutcome::Tracked { .. } => {},
        }
    }

    /// 读取全部关节段遥测；读取失败的关节段本 tick 跳过
    fn sample_segments(&mut self) -> Vec<Option<TelemetrySample>> {
        self.segments
            .iter_mut()
            .map(|segment| match JointTelemetry::sample(&self.backend, segment) {
                Ok(sample) => {
                    segment.observe(sample.angle);
                    Some(sample)
                },
                Err(err) => {
                    warn!(segment = %segment.id(), error = %err, "telemetry read failed, segment skipped");
                    None
                },
            })
            .collect()
    }

    fn update_segments(
        &mut self,
        samples: &[Option<TelemetrySample>],
        events: &mut Vec<GraspEvent>,
    ) {
        for (segment, sample) in self.segments.iter_mut().zip(samples) {
            let Some(sample) = sample else { continue };

            match self.stall.update(segment) {
                Some(StallTransition::Stalled { angle }) => {
                    events.push(GraspEvent::SegmentStalled {
                        segment: segment.id(),
                        angle,
                    });
                },
                Some(StallTransition::Recovered) => {
                    events.push(GraspEvent::SegmentRecovered {
                        segment: segment.id(),
                    });
                },
                None => {},
            }

            let command = self.drive.update(segment);
            if let Err(err) = self.backend.apply_drive(segment.id(), &command) {
                warn!(segment = %segment.id(), error = %err, "failed to apply drive command");
            }
            trace!(
                segment = %segment.id(),
                angle = %sample.angle,
                error = %sample.error,
                mode = %segment.mode(),
                target = %command.target,
                "segment updated"
            );
        }
    }

    fn snapshot(&self) -> GraspSnapshot {
        GraspSnapshot {
            tick: self.tick,
            status: self.status.clone(),
            state: self.grasp.state(),
            is_grasping: self.grasp.is_grasping(),
            angles_frozen: self.grasp.angles_frozen(),
            pending: self.grasp.pending().map(|r| r.body),
            grasped: self.grasp.grasped().collect(),
            segments: self.segments.iter().map(SegmentSnapshot::from).collect(),
        }
    }

    fn publish(&self) {
        self.observer.publish(self.snapshot());
    }

    fn trigger(&self, events: &[GraspEvent]) {
        if events.is_empty() {
            return;
        }
        let hooks = self.hooks.read();
        for event in events {
            hooks.trigger_all(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use grip_physics::{ContactSink, MockPhysics};
    use grip_types::Deg;

    #[test]
    fn test_no_segments_disables_controller() {
        let mut controller = GraspController::new(MockPhysics::new(), GripConfig::default()).unwrap();
        assert!(!controller.is_enabled());
        assert!(matches!(controller.status(), ControllerStatus::Disabled { .. }));

        let err = controller.tick().unwrap_err();
        assert!(err.is_fatal());
        assert!(controller.curl_all_fingers(-1.0).is_err());
        assert!(!controller.is_stalled(SegmentId(0)));
        assert!(!controller.observer().is_grasping());
    }

    #[test]
    fn test_invalid_config_rejected() {
        let mut config = GripConfig::default();
        config.grasp.required_segments = 0;
        let result = GraspController::new(MockPhysics::with_segments(["s0"]), config);
        assert!(matches!(result, Err(GripError::Config(_))));
    }

    #[test]
    fn test_finger_group_out_of_range() {
        let mut config = GripConfig::default();
        config.input.finger_groups = vec![vec![0, 5]];
        let result = GraspController::new(MockPhysics::with_segments(["s0", "s1"]), config);
        assert!(matches!(
            result,
            Err(GripError::UnknownSegment { index: 5, count: 2 })
        ));
    }

    #[test]
    fn test_initialises_from_current_angles() {
        let mut physics = MockPhysics::with_segments(["s0", "s1"]);
        physics.set_joint_angle(SegmentId(1), Deg(-40.0));
        let controller = GraspController::new(physics, GripConfig::default()).unwrap();

        let segment = controller.segment(SegmentId(1)).unwrap();
        assert!((segment.drive_target().0 + 40.0).abs() < 1e-9);
        assert!((segment.target_curl().0 + 40.0).abs() < 1e-9);
    }

    #[test]
    fn test_tick_writes_drive_for_every_segment() {
        let physics = MockPhysics::with_segments(["s0", "s1", "s2"]);
        let mut controller = GraspController::new(physics, GripConfig::default()).unwrap();
        controller.curl_all_fingers(-1.0).unwrap();

        let report = controller.tick().unwrap();
        assert_eq!(report.tick, 1);
        for i in 0..3 {
            let command = controller.backend().last_command(SegmentId(i)).unwrap();
            assert!(command.target.0 < 0.0);
        }
    }

    #[test]
    fn test_unknown_segment_curl() {
        let physics = MockPhysics::with_segments(["s0"]);
        let mut controller = GraspController::new(physics, GripConfig::default()).unwrap();
        assert!(matches!(
            controller.set_curl_command(SegmentId(3), -1.0),
            Err(GripError::UnknownSegment { index: 3, count: 1 })
        ));
    }

    #[test]
    fn test_non_physical_and_unknown_bodies_ignored() {
        let physics = MockPhysics::with_segments(["s0", "s1", "s2"]);
        let mut controller = GraspController::new(physics, GripConfig::default()).unwrap();
        let sender = controller.contact_sender();
        for i in 0..3 {
            sender.on_contact_begin(SegmentId(i), None);
            sender.on_contact_begin(SegmentId(i), Some(BodyHandle(77)));
        }
        sender.on_contact_end(SegmentId(0), Some(BodyHandle(78)));

        let report = controller.tick().unwrap();
        assert_eq!(report.contacts_processed, 7);
        assert!(!controller.is_grasping());
        assert!(controller.tracker().is_empty());
    }

    #[test]
    fn test_handle_contact_dispatches_synchronously() {
        let mut physics = MockPhysics::with_segments(["s0", "s1", "s2"]);
        let cube = physics.add_body("grabbable_cube", None);
        let mut controller = GraspController::new(physics, GripConfig::default()).unwrap();

        for i in 0..3 {
            controller.handle_contact(ContactEvent::begin(SegmentId(i), cube)).unwrap();
        }
        assert!(controller.is_grasping());
        assert!(controller.observer().is_grasping());
        assert_eq!(controller.touching_count(cube), 3);
    }
}
