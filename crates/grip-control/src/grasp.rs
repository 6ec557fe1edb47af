//! 抓取状态机
//!
//! ```text
//!            接触达到阈值                 等待 N 个 tick 且仍满足条件
//!   Idle ───────────────────► PendingSettle ──────────────────────────► Confirmed
//!    ▲                             │                                       │
//!    │   接触丢失 / 物体消失 / 附着失败 │      外部释放 / 附着断开 / 物体消失   │
//!    └─────────────────────────────┴───────────────────────────────────────┘
//! ```
//!
//! # 关键约束
//!
//! - 同一物体最多一条抓取记录
//! - 同一时刻最多一条 `PendingSettle` 记录：新的抓取开始会取代旧的等待
//! - `is_grasping` / `angles_frozen` 由"是否存在任何记录"推导，不单独存储
//! - 等待计时以 tick 计数，不阻塞；取消即丢弃记录
//! - 计时从抓取开始后的下一个 tick 起算：第 N 个 tick 开始、等待 k 个 tick，
//!   在第 N + k 个 tick 确认
//!
//! 所有冻结状态由全部记录共享：最后一条记录销毁时才解除冻结。

use crate::contact::ContactTracker;
use crate::hooks::{AbortReason, GraspEvent, ReleaseReason};
use crate::segment::Segment;
use grip_physics::{AttachmentSpec, PhysicsBackend, PhysicsError};
use grip_types::{AttachmentHandle, BodyHandle, GraspConfig};
use tracing::{debug, info, warn};

/// 抓取记录阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GraspPhase {
    /// 等待确认，`remaining` 为剩余 tick 数
    PendingSettle { remaining: u32 },
    /// 已确认，物体通过附着关节固定在锚点上
    Confirmed { attachment: AttachmentHandle },
}

/// 一个物体的抓取记录
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GraspRecord {
    /// 被抓取的物体
    pub body: BodyHandle,
    /// 当前阶段
    pub phase: GraspPhase,
}

impl GraspRecord {
    pub fn is_pending(&self) -> bool {
        matches!(self.phase, GraspPhase::PendingSettle { .. })
    }

    pub fn is_confirmed(&self) -> bool {
        matches!(self.phase, GraspPhase::Confirmed { .. })
    }

    /// 附着关节（仅已确认时）
    pub fn attachment(&self) -> Option<AttachmentHandle> {
        match self.phase {
            GraspPhase::Confirmed { attachment } => Some(attachment),
            GraspPhase::PendingSettle { .. } => None,
        }
    }
}

/// 抓取状态概览
///
/// 存在等待记录时报告 `PendingSettle`；否则报告最近一次确认的抓取。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GraspState {
    #[default]
    Idle,
    PendingSettle {
        body: BodyHandle,
        remaining: u32,
    },
    Confirmed {
        body: BodyHandle,
        attachment: AttachmentHandle,
    },
}

impl GraspState {
    /// 状态名称（用于日志和 CLI 输出）
    pub fn name(&self) -> &'static str {
        match self {
            GraspState::Idle => "idle",
            GraspState::PendingSettle { .. } => "pending-settle",
            GraspState::Confirmed { .. } => "confirmed",
        }
    }
}

/// 抓取状态机
#[derive(Debug, Clone)]
pub struct GraspStateMachine {
    /// 按创建顺序保存，遍历顺序确定
    records: Vec<GraspRecord>,
    /// 本 tick 刚开始等待的物体，下一次 `step` 不计时
    fresh: Option<BodyHandle>,
    settle_ticks: u32,
    required: usize,
    attachment: AttachmentSpec,
}

impl GraspStateMachine {
    /// 从配置创建
    pub fn new(config: &GraspConfig) -> Self {
        Self {
            records: Vec::new(),
            fresh: None,
            settle_ticks: config.settle_ticks,
            required: config.required_segments,
            attachment: AttachmentSpec {
                break_force: config.break_force,
                break_torque: config.break_torque,
            },
        }
    }

    /// 是否存在任何抓取记录（等待或已确认）
    pub fn is_grasping(&self) -> bool {
        !self.records.is_empty()
    }

    /// 手指目标是否锁定在冻结快照上
    pub fn angles_frozen(&self) -> bool {
        !self.records.is_empty()
    }

    pub fn records(&self) -> &[GraspRecord] {
        &self.records
    }

    pub fn record(&self, body: BodyHandle) -> Option<&GraspRecord> {
        self.records.iter().find(|r| r.body == body)
    }

    /// 该物体是否已有抓取记录
    pub fn is_engaged(&self, body: BodyHandle) -> bool {
        self.record(body).is_some()
    }

    /// 该物体是否已确认抓取
    pub fn is_confirmed(&self, body: BodyHandle) -> bool {
        self.record(body).is_some_and(GraspRecord::is_confirmed)
    }

    /// 等待确认的记录
    pub fn pending(&self) -> Option<&GraspRecord> {
        self.records.iter().find(|r| r.is_pending())
    }

    /// 已确认抓取的物体
    pub fn grasped(&self) -> impl Iterator<Item = BodyHandle> + '_ {
        self.records.iter().filter(|r| r.is_confirmed()).map(|r| r.body)
    }

    /// 状态概览
    pub fn state(&self) -> GraspState {
        if let Some(record) = self.pending() {
            if let GraspPhase::PendingSettle { remaining } = record.phase {
                return GraspState::PendingSettle {
                    body: record.body,
                    remaining,
                };
            }
        }
        self.records
            .iter()
            .rev()
            .find_map(|r| {
                r.attachment().map(|attachment| GraspState::Confirmed {
                    body: r.body,
                    attachment,
                })
            })
            .unwrap_or_default()
    }

    /// Idle → PendingSettle
    ///
    /// 已有等待记录时先取代它（只保留最近一次等待计时）。
    /// 没有其他记录时冻结全部关节段（不仅是接触中的关节段）。
    pub fn begin_onset(
        &mut self,
        body: BodyHandle,
        touching: usize,
        segments: &mut [Segment],
        events: &mut Vec<GraspEvent>,
    ) {
        if let Some(index) = self.records.iter().position(GraspRecord::is_pending) {
            let previous = self.records.remove(index).body;
            info!(%previous, by = %body, "pending grasp superseded");
            events.push(GraspEvent::Superseded { previous, by: body });
        }

        if self.records.is_empty() {
            for segment in segments.iter_mut() {
                segment.freeze();
            }
        }

        self.records.push(GraspRecord {
            body,
            phase: GraspPhase::PendingSettle {
                remaining: self.settle_ticks,
            },
        });
        self.fresh = Some(body);
        info!(%body, touching, settle_ticks = self.settle_ticks, "grasp onset, fingers frozen");
        events.push(GraspEvent::OnsetStarted { body, touching });
    }

    /// 每个 tick 调用一次（接触事件分发之后）
    ///
    /// 检查记录和接触候选对应的物体是否仍然存在、附着关节是否仍然有效，
    /// 再推进等待计时。
    pub fn step<B: PhysicsBackend + ?Sized>(
        &mut self,
        backend: &mut B,
        tracker: &mut ContactTracker,
        segments: &mut [Segment],
        events: &mut Vec<GraspEvent>,
    ) {
        let fresh = self.fresh.take();

        // 已确认抓取的存活检查
        let broken: Vec<(BodyHandle, ReleaseReason)> = self
            .records
            .iter()
            .filter_map(|record| {
                let attachment = record.attachment()?;
                if backend.body_info(record.body).is_none() {
                    Some((record.body, ReleaseReason::BodyVanished))
                } else if !backend.attachment_alive(attachment) {
                    Some((record.body, ReleaseReason::AttachmentBroken))
                } else {
                    None
                }
            })
            .collect();
        for (body, reason) in broken {
            self.release(body, reason, backend, tracker, segments, events);
        }

        // 等待中的物体消失
        if let Some(body) = self.pending().map(|r| r.body) {
            if backend.body_info(body).is_none() {
                tracker.remove(body);
                self.abort(body, AbortReason::BodyVanished, segments, events);
            }
        }

        // 只被跟踪、没有抓取记录的物体消失时不会再有结束事件
        for body in tracker.retain(|body| backend.body_info(body).is_some()) {
            debug!(%body, "vanished contact candidate dropped");
        }

        // 等待计时
        let Some(index) = self.records.iter().position(GraspRecord::is_pending) else {
            return;
        };
        let record = &mut self.records[index];
        if fresh == Some(record.body) {
            return;
        }
        let GraspPhase::PendingSettle { remaining } = &mut record.phase else {
            return;
        };
        *remaining = remaining.saturating_sub(1);
        let (body, left) = (record.body, *remaining);
        debug!(%body, remaining = left, "settle countdown");
        if left == 0 {
            self.try_confirm(body, backend, tracker, segments, events);
        }
    }

    /// PendingSettle → Confirmed，不满足条件时回到 Idle
    fn try_confirm<B: PhysicsBackend + ?Sized>(
        &mut self,
        body: BodyHandle,
        backend: &mut B,
        tracker: &mut ContactTracker,
        segments: &mut [Segment],
        events: &mut Vec<GraspEvent>,
    ) {
        if backend.body_info(body).is_none() {
            tracker.remove(body);
            self.abort(body, AbortReason::BodyVanished, segments, events);
            return;
        }
        let touching = tracker.count(body);
        if touching < self.required {
            self.abort(body, AbortReason::Disqualified { touching }, segments, events);
            return;
        }

        match self.attach(body, backend) {
            Ok(attachment) => {
                if let Some(record) = self.records.iter_mut().find(|r| r.body == body) {
                    record.phase = GraspPhase::Confirmed { attachment };
                }
                info!(%body, %attachment, touching, "grasp confirmed");
                events.push(GraspEvent::Confirmed { body, attachment });
            },
            Err(err) => {
                // 不重试：需要重新放置物体
                self.abort(body, AbortReason::AttachFailed(err), segments, events);
            },
        }
    }

    /// 同步物体速度到锚点，再创建附着关节
    fn attach<B: PhysicsBackend + ?Sized>(
        &self,
        body: BodyHandle,
        backend: &mut B,
    ) -> Result<AttachmentHandle, PhysicsError> {
        let velocity = backend.anchor_velocity()?;
        backend.set_body_velocity(body, velocity)?;
        backend.create_attachment(body, &self.attachment)
    }

    /// 中止等待中的抓取（PendingSettle → Idle）
    ///
    /// # 返回
    ///
    /// 该物体确实存在等待记录时返回 `true`
    pub fn abort(
        &mut self,
        body: BodyHandle,
        reason: AbortReason,
        segments: &mut [Segment],
        events: &mut Vec<GraspEvent>,
    ) -> bool {
        let Some(index) = self.records.iter().position(|r| r.body == body && r.is_pending())
        else {
            return false;
        };
        self.records.remove(index);
        if self.records.is_empty() {
            for segment in segments.iter_mut() {
                segment.unfreeze();
            }
        }
        info!(%body, %reason, "grasp attempt aborted");
        events.push(GraspEvent::Aborted { body, reason });
        true
    }

    /// 释放已确认的抓取（Confirmed → Idle）
    ///
    /// 销毁附着关节并移除该物体的接触记录。最后一条记录释放后
    /// 解除冻结并清除所有关节段的堵转状态。
    ///
    /// # 返回
    ///
    /// 该物体确实存在已确认记录时返回 `true`
    pub fn release<B: PhysicsBackend + ?Sized>(
        &mut self,
        body: BodyHandle,
        reason: ReleaseReason,
        backend: &mut B,
        tracker: &mut ContactTracker,
        segments: &mut [Segment],
        events: &mut Vec<GraspEvent>,
    ) -> bool {
        let Some(index) = self.records.iter().position(|r| r.body == body && r.is_confirmed())
        else {
            return false;
        };
        let record = self.records.remove(index);

        if let Some(attachment) = record.attachment() {
            if backend.attachment_alive(attachment) {
                if let Err(err) = backend.destroy_attachment(attachment) {
                    warn!(%body, %attachment, error = %err, "failed to destroy attachment");
                }
            }
        }
        tracker.remove(body);

        if self.records.is_empty() {
            for segment in segments.iter_mut() {
                segment.unfreeze();
                segment.clear_stall();
            }
        }
        info!(%body, %reason, "grasp released");
        events.push(GraspEvent::Released { body, reason });
        true
    }

    /// 取消等待并释放全部已确认抓取
    pub fn release_all<B: PhysicsBackend + ?Sized>(
        &mut self,
        backend: &mut B,
        tracker: &mut ContactTracker,
        segments: &mut [Segment],
        events: &mut Vec<GraspEvent>,
    ) {
        if let Some(pending) = self.pending().map(|r| r.body) {
            self.abort(pending, AbortReason::Cancelled, segments, events);
        }
        let bodies: Vec<_> = self.grasped().collect();
        for body in bodies {
            self.release(body, ReleaseReason::External, backend, tracker, segments, events);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grabbable::TagOrNamePolicy;
    use grip_physics::{BodyInfo, MockPhysics};
    use grip_types::{Deg, GrabbableConfig, SegmentId};

    struct Fixture {
        physics: MockPhysics,
        tracker: ContactTracker,
        segments: Vec<Segment>,
        machine: GraspStateMachine,
        events: Vec<GraspEvent>,
    }

    impl Fixture {
        fn new(settle_ticks: u32) -> Self {
            let config = GraspConfig {
                settle_ticks,
                ..GraspConfig::default()
            };
            let segments = (0..4)
                .map(|i| Segment::new(SegmentId(i), format!("s{i}"), Deg(-10.0), Deg(-90.0)))
                .collect();
            Self {
                physics: MockPhysics::with_segments(["s0", "s1", "s2", "s3"]),
                tracker: ContactTracker::new(
                    config.required_segments,
                    TagOrNamePolicy::new(&GrabbableConfig::default()),
                ),
                segments,
                machine: GraspStateMachine::new(&config),
                events: Vec::new(),
            }
        }

        fn touch(&mut self, body: BodyHandle, count: usize) {
            let info = BodyInfo::new("cube", Some("Grabbable"));
            for i in 0..count {
                self.tracker.on_begin(SegmentId(i), body, Some(&info), false);
            }
        }

        /// 开始等待，并执行同一 tick 内的 `step`
        fn onset(&mut self, body: BodyHandle) {
            let touching = self.tracker.count(body);
            self.machine
                .begin_onset(body, touching, &mut self.segments, &mut self.events);
            self.step();
        }

        fn step(&mut self) {
            self.machine.step(
                &mut self.physics,
                &mut self.tracker,
                &mut self.segments,
                &mut self.events,
            );
        }
    }

    #[test]
    fn test_onset_freezes_every_segment() {
        let mut fx = Fixture::new(3);
        let cube = fx.physics.add_body("cube", Some("Grabbable"));
        fx.touch(cube, 3);
        fx.onset(cube);

        assert!(fx.machine.is_grasping());
        assert!(fx.machine.angles_frozen());
        assert!(fx.segments.iter().all(|s| s.frozen_angle() == Some(Deg(-10.0))));
        assert_eq!(
            fx.machine.state(),
            GraspState::PendingSettle {
                body: cube,
                remaining: 3
            }
        );
    }

    #[test]
    fn test_confirm_after_settle_ticks() {
        let mut fx = Fixture::new(3);
        let cube = fx.physics.add_body("cube", Some("Grabbable"));
        fx.touch(cube, 3);
        fx.onset(cube);

        fx.step();
        fx.step();
        assert!(fx.machine.pending().is_some());
        fx.step();

        assert!(fx.machine.is_confirmed(cube));
        assert_eq!(fx.physics.attachments_for(cube).len(), 1);
        assert!(matches!(fx.events.last(), Some(GraspEvent::Confirmed { body, .. }) if *body == cube));
    }

    #[test]
    fn test_disqualified_at_expiry_unfreezes() {
        let mut fx = Fixture::new(1);
        let cube = fx.physics.add_body("cube", Some("Grabbable"));
        fx.touch(cube, 3);
        fx.onset(cube);
        fx.tracker.on_end(SegmentId(0), cube, false);

        fx.step();
        assert!(!fx.machine.is_grasping());
        assert!(fx.segments.iter().all(|s| s.frozen_angle().is_none()));
        assert!(matches!(
            fx.events.last(),
            Some(GraspEvent::Aborted {
                reason: AbortReason::Disqualified { touching: 2 },
                ..
            })
        ));
    }

    #[test]
    fn test_missing_anchor_aborts_silently() {
        let mut fx = Fixture::new(1);
        let cube = fx.physics.add_body("cube", Some("Grabbable"));
        fx.physics.set_anchor_present(false);
        fx.touch(cube, 3);
        fx.onset(cube);

        fx.step();
        assert_eq!(fx.machine.state(), GraspState::Idle);
        assert_eq!(fx.physics.live_attachment_count(), 0);
        assert!(matches!(
            fx.events.last(),
            Some(GraspEvent::Aborted {
                reason: AbortReason::AttachFailed(PhysicsError::AnchorMissing),
                ..
            })
        ));
    }

    #[test]
    fn test_supersede_keeps_single_pending() {
        let mut fx = Fixture::new(5);
        let a = fx.physics.add_body("a", Some("Grabbable"));
        let b = fx.physics.add_body("b", Some("Grabbable"));
        fx.touch(a, 3);
        fx.onset(a);
        fx.step();
        fx.touch(b, 3);
        fx.onset(b);

        assert_eq!(fx.machine.records().len(), 1);
        assert_eq!(fx.machine.pending().map(|r| r.body), Some(b));
        assert!(fx.events.contains(&GraspEvent::Superseded { previous: a, by: b }));
        // 取代时不解冻
        assert!(fx.segments.iter().all(|s| s.frozen_angle().is_some()));
    }

    #[test]
    fn test_release_clears_stall_state() {
        let mut fx = Fixture::new(1);
        let cube = fx.physics.add_body("cube", Some("Grabbable"));
        fx.segments[2].stall_counter = 3;
        fx.segments[2].stalled = true;
        fx.touch(cube, 3);
        fx.onset(cube);
        fx.step();
        assert!(fx.machine.is_confirmed(cube));

        assert!(fx.machine.release(
            cube,
            ReleaseReason::External,
            &mut fx.physics,
            &mut fx.tracker,
            &mut fx.segments,
            &mut fx.events,
        ));
        assert!(!fx.machine.is_grasping());
        assert_eq!(fx.physics.live_attachment_count(), 0);
        assert_eq!(fx.tracker.count(cube), 0);
        for segment in &fx.segments {
            assert_eq!(segment.stall_counter(), 0);
            assert!(!segment.is_stalled());
            assert!(segment.frozen_angle().is_none());
        }
    }

    #[test]
    fn test_broken_attachment_detected_on_step() {
        let mut fx = Fixture::new(1);
        let cube = fx.physics.add_body("cube", Some("Grabbable"));
        fx.touch(cube, 3);
        fx.onset(cube);
        fx.step();
        let attachment = fx.machine.record(cube).and_then(GraspRecord::attachment).unwrap();

        assert!(fx.physics.apply_load(attachment, 5_000.0, 0.0));
        fx.step();
        assert_eq!(fx.machine.state(), GraspState::Idle);
        assert_eq!(
            fx.events.last(),
            Some(&GraspEvent::Released {
                body: cube,
                reason: ReleaseReason::AttachmentBroken
            })
        );
    }

    #[test]
    fn test_release_all_cancels_pending() {
        let mut fx = Fixture::new(5);
        let cube = fx.physics.add_body("cube", Some("Grabbable"));
        fx.touch(cube, 3);
        fx.onset(cube);

        fx.machine
            .release_all(&mut fx.physics, &mut fx.tracker, &mut fx.segments, &mut fx.events);
        assert!(!fx.machine.is_grasping());
        assert_eq!(
            fx.events.last(),
            Some(&GraspEvent::Aborted {
                body: cube,
                reason: AbortReason::Cancelled
            })
        );
    }

    #[test]
    fn test_countdown_starts_after_onset_tick() {
        let mut fx = Fixture::new(2);
        let cube = fx.physics.add_body("cube", Some("Grabbable"));
        fx.touch(cube, 3);
        fx.onset(cube);
        assert_eq!(
            fx.machine.state(),
            GraspState::PendingSettle {
                body: cube,
                remaining: 2
            }
        );

        fx.step();
        assert!(!fx.machine.is_confirmed(cube));
        fx.step();
        assert!(fx.machine.is_confirmed(cube));
    }

    #[test]
    fn test_pending_body_vanishing_aborts_on_next_step() {
        let mut fx = Fixture::new(5);
        let cube = fx.physics.add_body("cube", Some("Grabbable"));
        fx.touch(cube, 3);
        fx.onset(cube);

        fx.physics.destroy_body(cube);
        fx.step();
        assert!(!fx.machine.is_grasping());
        assert!(fx.tracker.is_empty());
        assert_eq!(
            fx.events.last(),
            Some(&GraspEvent::Aborted {
                body: cube,
                reason: AbortReason::BodyVanished
            })
        );
    }

    #[test]
    fn test_vanished_candidate_without_record_is_dropped() {
        let mut fx = Fixture::new(5);
        let cube = fx.physics.add_body("cube", Some("Grabbable"));
        let ball = fx.physics.add_body("ball", Some("Grabbable"));
        fx.touch(cube, 2);
        fx.touch(ball, 1);

        fx.physics.destroy_body(cube);
        fx.step();
        assert_eq!(fx.tracker.count(cube), 0);
        assert!(fx.tracker.candidate(cube).is_none());
        assert_eq!(fx.tracker.count(ball), 1);
        assert!(fx.events.is_empty());
    }
}
