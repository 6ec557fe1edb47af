//! Mock 物理引擎
//!
//! 确定性的进程内引擎，用于测试和 CLI 仿真，不依赖任何真实物理库。
//!
//! # 模型
//!
//! - 每个关节段以不超过 `joint_speed_deg_per_s` 的速度追踪最近一次写入的驱动目标
//! - 关节段可以设置一个障碍角：弯曲（负方向）无法越过该角度
//! - 障碍绑定刚体时，关节段停在障碍上即视为与该刚体接触，
//!   `step()` 会向已连接的 `ContactSender` 上报 begin / persist / end
//! - 附着关节在 `apply_load()` 超过断裂阈值时断开
//!
//! # 使用示例
//!
//! ```rust
//! use grip_physics::{MockPhysics, PhysicsBackend};
//! use grip_types::{Deg, SegmentId};
//!
//! let mut physics = MockPhysics::with_segments(["thumb_0", "index_0", "middle_0"]);
//! let cube = physics.add_body("cube", Some("Grabbable"));
//! physics.set_obstacle(SegmentId(1), Deg(-30.0), Some(cube));
//!
//! assert_eq!(physics.segments().len(), 3);
//! assert!(physics.body_info(cube).is_some());
//! ```

use crate::backend::{PhysicsBackend, SegmentInfo};
use crate::body::{AttachmentSpec, BodyInfo, BodyVelocity};
use crate::contact::{ContactEvent, ContactKind, ContactSender, ContactSink};
use crate::error::PhysicsError;
use grip_types::{AttachmentHandle, BodyHandle, Deg, DriveCommand, Rad, SegmentId};
use std::collections::HashMap;
use tracing::{debug, trace};

/// 关节段停靠在障碍上的判定容差（度）
const CONTACT_TOLERANCE_DEG: f64 = 0.01;

/// 模拟关节段
#[derive(Debug, Clone)]
pub struct MockSegment {
    /// 名称
    pub name: String,
    /// 当前角度
    pub angle: Deg,
    /// 障碍角（弯曲无法越过）
    pub obstacle: Option<Deg>,
    /// 障碍对应的刚体
    pub obstacle_body: Option<BodyHandle>,
    /// 最近一次写入的驱动命令
    pub last_command: Option<DriveCommand>,
    /// 驱动写入次数
    pub drive_writes: u64,
    /// 当前接触的刚体
    in_contact: Option<BodyHandle>,
}

impl MockSegment {
    fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            angle: Deg::ZERO,
            obstacle: None,
            obstacle_body: None,
            last_command: None,
            drive_writes: 0,
            in_contact: None,
        }
    }

    fn is_resting_on_obstacle(&self) -> bool {
        self.obstacle
            .is_some_and(|limit| self.angle.0 <= limit.0 + CONTACT_TOLERANCE_DEG)
    }
}

/// 模拟刚体
#[derive(Debug, Clone)]
pub struct MockBody {
    /// 静态信息
    pub info: BodyInfo,
    /// 当前速度
    pub velocity: BodyVelocity,
    /// 是否存在
    pub alive: bool,
}

#[derive(Debug, Clone)]
struct MockAttachment {
    body: BodyHandle,
    spec: AttachmentSpec,
    alive: bool,
}

/// Mock 物理引擎
#[derive(Debug)]
pub struct MockPhysics {
    segments: Vec<MockSegment>,
    bodies: HashMap<BodyHandle, MockBody>,
    attachments: HashMap<AttachmentHandle, MockAttachment>,
    next_body: u64,
    next_attachment: u64,
    anchor_present: bool,
    anchor_velocity: BodyVelocity,
    joint_speed_deg_per_s: f64,
    contact_sink: Option<ContactSender>,
}

impl Default for MockPhysics {
    fn default() -> Self {
        Self::new()
    }
}

impl MockPhysics {
    /// 默认关节最大速度（度/秒）
    pub const DEFAULT_JOINT_SPEED: f64 = 360.0;

    /// 创建空引擎（无关节段）
    pub fn new() -> Self {
        Self {
            segments: Vec::new(),
            bodies: HashMap::new(),
            attachments: HashMap::new(),
            next_body: 1,
            next_attachment: 1,
            anchor_present: true,
            anchor_velocity: BodyVelocity::zero(),
            joint_speed_deg_per_s: Self::DEFAULT_JOINT_SPEED,
            contact_sink: None,
        }
    }

    /// 创建带有指定关节段的引擎
    pub fn with_segments<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut physics = Self::new();
        for name in names {
            physics.add_segment(name);
        }
        physics
    }

    /// 设置关节最大速度
    pub fn set_joint_speed(&mut self, deg_per_s: f64) {
        self.joint_speed_deg_per_s = deg_per_s;
    }

    /// 添加关节段
    pub fn add_segment(&mut self, name: impl Into<String>) -> SegmentId {
        self.segments.push(MockSegment::new(name));
        SegmentId(self.segments.len() - 1)
    }

    /// 添加刚体
    pub fn add_body(&mut self, name: impl Into<String>, tag: Option<&str>) -> BodyHandle {
        let handle = BodyHandle(self.next_body);
        self.next_body += 1;
        self.bodies.insert(
            handle,
            MockBody {
                info: BodyInfo::new(name, tag),
                velocity: BodyVelocity::zero(),
                alive: true,
            },
        );
        handle
    }

    /// 销毁刚体（同时销毁连接到它的附着关节，不产生 end 事件）
    pub fn destroy_body(&mut self, body: BodyHandle) {
        if let Some(entry) = self.bodies.get_mut(&body) {
            entry.alive = false;
        }
        for attachment in self.attachments.values_mut() {
            if attachment.body == body {
                attachment.alive = false;
            }
        }
        for segment in &mut self.segments {
            if segment.in_contact == Some(body) {
                segment.in_contact = None;
            }
        }
    }

    /// 访问刚体
    pub fn body(&self, body: BodyHandle) -> Option<&MockBody> {
        self.bodies.get(&body)
    }

    /// 设置障碍角
    pub fn set_obstacle(&mut self, segment: SegmentId, angle: Deg, body: Option<BodyHandle>) {
        if let Some(entry) = self.segments.get_mut(segment.index()) {
            entry.obstacle = Some(angle);
            entry.obstacle_body = body;
        }
    }

    /// 移除障碍（物体被拿走）
    pub fn clear_obstacle(&mut self, segment: SegmentId) {
        if let Some(entry) = self.segments.get_mut(segment.index()) {
            entry.obstacle = None;
            entry.obstacle_body = None;
        }
    }

    /// 直接设置关节角（测试用）
    pub fn set_joint_angle(&mut self, segment: SegmentId, angle: Deg) {
        if let Some(entry) = self.segments.get_mut(segment.index()) {
            entry.angle = angle;
        }
    }

    /// 访问关节段
    pub fn segment(&self, segment: SegmentId) -> Option<&MockSegment> {
        self.segments.get(segment.index())
    }

    /// 最近一次写入的驱动命令
    pub fn last_command(&self, segment: SegmentId) -> Option<DriveCommand> {
        self.segments.get(segment.index()).and_then(|s| s.last_command)
    }

    /// 设置锚点是否存在
    pub fn set_anchor_present(&mut self, present: bool) {
        self.anchor_present = present;
    }

    /// 设置锚点速度
    pub fn set_anchor_velocity(&mut self, velocity: BodyVelocity) {
        self.anchor_velocity = velocity;
    }

    /// 设置刚体速度（测试用，不检查存活）
    pub fn set_velocity(&mut self, body: BodyHandle, velocity: BodyVelocity) {
        if let Some(entry) = self.bodies.get_mut(&body) {
            entry.velocity = velocity;
        }
    }

    /// 对附着关节施加载荷，超过阈值则断开
    ///
    /// # 返回
    ///
    /// 附着关节是否因此断开
    pub fn apply_load(&mut self, handle: AttachmentHandle, force: f64, torque: f64) -> bool {
        match self.attachments.get_mut(&handle) {
            Some(attachment) if attachment.alive => {
                if force > attachment.spec.break_force || torque > attachment.spec.break_torque {
                    attachment.alive = false;
                    debug!(%handle, force, torque, "mock attachment broke under load");
                    true
                } else {
                    false
                }
            },
            _ => false,
        }
    }

    /// 连接到指定刚体的存活附着关节
    pub fn attachments_for(&self, body: BodyHandle) -> Vec<AttachmentHandle> {
        let mut handles: Vec<_> = self
            .attachments
            .iter()
            .filter(|(_, a)| a.alive && a.body == body)
            .map(|(handle, _)| *handle)
            .collect();
        handles.sort_by_key(|h| h.0);
        handles
    }

    /// 存活附着关节总数
    pub fn live_attachment_count(&self) -> usize {
        self.attachments.values().filter(|a| a.alive).count()
    }

    /// 连接接触事件输出
    pub fn connect_contacts(&mut self, sink: ContactSender) {
        self.contact_sink = Some(sink);
    }

    /// 推进一个物理步
    pub fn step(&mut self, dt_s: f64) {
        let max_step = Deg(self.joint_speed_deg_per_s * dt_s);

        for (index, segment) in self.segments.iter_mut().enumerate() {
            if let Some(command) = segment.last_command {
                let mut next = segment.angle.step_toward(command.target, max_step);
                if let Some(limit) = segment.obstacle {
                    if next.0 < limit.0 {
                        next = limit;
                    }
                }
                segment.angle = next;
            }

            let body = segment
                .obstacle_body
                .filter(|b| self.bodies.get(b).is_some_and(|entry| entry.alive));
            let touching = body.filter(|_| segment.is_resting_on_obstacle());

            let event = match (segment.in_contact, touching) {
                (None, Some(body)) => Some(ContactEvent::begin(SegmentId(index), body)),
                (Some(prev), Some(body)) if prev == body => {
                    Some(ContactEvent::persist(SegmentId(index), body))
                },
                // 障碍换成了另一个刚体：本步只上报旧刚体的 end，下一步再 begin
                (Some(prev), _) => Some(ContactEvent::end(SegmentId(index), prev)),
                (None, None) => None,
            };
            segment.in_contact = match event {
                Some(ContactEvent {
                    kind: ContactKind::End,
                    ..
                }) => None,
                _ => touching,
            };

            let Some(event) = event else { continue };
            trace!(?event, "mock contact");
            if let Some(sink) = &self.contact_sink {
                sink.submit(event);
            }
        }
    }

    fn segment_mut(&mut self, segment: SegmentId) -> Result<&mut MockSegment, PhysicsError> {
        self.segments
            .get_mut(segment.index())
            .ok_or(PhysicsError::UnknownSegment(segment))
    }

    fn live_body_mut(&mut self, body: BodyHandle) -> Result<&mut MockBody, PhysicsError> {
        self.bodies
            .get_mut(&body)
            .filter(|entry| entry.alive)
            .ok_or(PhysicsError::UnknownBody(body))
    }
}

impl PhysicsBackend for MockPhysics {
    fn segments(&self) -> Vec<SegmentInfo> {
        self.segments
            .iter()
            .enumerate()
            .map(|(index, segment)| SegmentInfo::new(index, segment.name.clone()))
            .collect()
    }

    fn joint_angle(&self, segment: SegmentId) -> Result<Rad, PhysicsError> {
        self.segments
            .get(segment.index())
            .map(|s| s.angle.to_rad())
            .ok_or(PhysicsError::UnknownSegment(segment))
    }

    fn apply_drive(
        &mut self,
        segment: SegmentId,
        command: &DriveCommand,
    ) -> Result<(), PhysicsError> {
        let entry = self.segment_mut(segment)?;
        entry.last_command = Some(*command);
        entry.drive_writes += 1;
        Ok(())
    }

    fn body_info(&self, body: BodyHandle) -> Option<BodyInfo> {
        self.bodies
            .get(&body)
            .filter(|entry| entry.alive)
            .map(|entry| entry.info.clone())
    }

    fn body_velocity(&self, body: BodyHandle) -> Result<BodyVelocity, PhysicsError> {
        self.bodies
            .get(&body)
            .filter(|entry| entry.alive)
            .map(|entry| entry.velocity)
            .ok_or(PhysicsError::UnknownBody(body))
    }

    fn set_body_velocity(
        &mut self,
        body: BodyHandle,
        velocity: BodyVelocity,
    ) -> Result<(), PhysicsError> {
        self.live_body_mut(body)?.velocity = velocity;
        Ok(())
    }

    fn anchor_velocity(&self) -> Result<BodyVelocity, PhysicsError> {
        if self.anchor_present {
            Ok(self.anchor_velocity)
        } else {
            Err(PhysicsError::AnchorMissing)
        }
    }

    fn create_attachment(
        &mut self,
        body: BodyHandle,
        spec: &AttachmentSpec,
    ) -> Result<AttachmentHandle, PhysicsError> {
        if !self.anchor_present {
            return Err(PhysicsError::AnchorMissing);
        }
        self.live_body_mut(body)?;

        let handle = AttachmentHandle(self.next_attachment);
        self.next_attachment += 1;
        self.attachments.insert(
            handle,
            MockAttachment {
                body,
                spec: *spec,
                alive: true,
            },
        );
        Ok(handle)
    }

    fn destroy_attachment(&mut self, handle: AttachmentHandle) -> Result<(), PhysicsError> {
        match self.attachments.get_mut(&handle) {
            Some(attachment) if attachment.alive => {
                attachment.alive = false;
                Ok(())
            },
            _ => Err(PhysicsError::UnknownAttachment(handle)),
        }
    }

    fn attachment_alive(&self, handle: AttachmentHandle) -> bool {
        self.attachments.get(&handle).is_some_and(|a| a.alive)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contact::contact_queue;
    use grip_types::{DriveGains, DriveProfile};

    fn drive_to(physics: &mut MockPhysics, segment: SegmentId, target: Deg) {
        let command = DriveCommand::new(target, DriveProfile::Drive, DriveGains::DRIVE);
        physics.apply_drive(segment, &command).unwrap();
    }

    #[test]
    fn test_joint_tracks_drive_target_at_bounded_speed() {
        let mut physics = MockPhysics::with_segments(["s0"]);
        physics.set_joint_speed(100.0);
        drive_to(&mut physics, SegmentId(0), Deg(-30.0));

        physics.step(0.1);
        assert_eq!(physics.segment(SegmentId(0)).unwrap().angle, Deg(-10.0));
        physics.step(0.1);
        physics.step(0.1);
        physics.step(0.1);
        assert_eq!(physics.segment(SegmentId(0)).unwrap().angle, Deg(-30.0));
    }

    #[test]
    fn test_obstacle_blocks_and_reports_contacts() {
        let (sender, receiver) = contact_queue();
        let mut physics = MockPhysics::with_segments(["s0"]);
        physics.connect_contacts(sender);
        let cube = physics.add_body("cube", Some("Grabbable"));
        physics.set_obstacle(SegmentId(0), Deg(-5.0), Some(cube));
        drive_to(&mut physics, SegmentId(0), Deg(-40.0));

        physics.step(0.02); // -7.2 → 被障碍挡在 -5
        physics.step(0.02);
        assert_eq!(physics.segment(SegmentId(0)).unwrap().angle, Deg(-5.0));

        drive_to(&mut physics, SegmentId(0), Deg(0.0));
        physics.step(0.02);

        let kinds: Vec<_> = receiver.drain().map(|e| e.kind).collect();
        assert_eq!(
            kinds,
            vec![ContactKind::Begin, ContactKind::Persist, ContactKind::End]
        );
    }

    #[test]
    fn test_attachment_breaks_under_load() {
        let mut physics = MockPhysics::with_segments(["s0"]);
        let cube = physics.add_body("cube", None);
        let spec = AttachmentSpec {
            break_force: 100.0,
            break_torque: 10.0,
        };
        let handle = physics.create_attachment(cube, &spec).unwrap();
        assert!(physics.attachment_alive(handle));

        assert!(!physics.apply_load(handle, 50.0, 5.0));
        assert!(physics.apply_load(handle, 50.0, 20.0));
        assert!(!physics.attachment_alive(handle));
        assert!(physics.destroy_attachment(handle).is_err());
    }

    #[test]
    fn test_missing_anchor_rejects_attachment() {
        let mut physics = MockPhysics::new();
        let cube = physics.add_body("cube", None);
        physics.set_anchor_present(false);
        let spec = AttachmentSpec {
            break_force: 1.0,
            break_torque: 1.0,
        };
        assert_eq!(
            physics.create_attachment(cube, &spec),
            Err(PhysicsError::AnchorMissing)
        );
        assert_eq!(physics.anchor_velocity(), Err(PhysicsError::AnchorMissing));
    }

    #[test]
    fn test_destroyed_body_disappears() {
        let mut physics = MockPhysics::new();
        let cube = physics.add_body("cube", None);
        let spec = AttachmentSpec {
            break_force: 1.0,
            break_torque: 1.0,
        };
        let handle = physics.create_attachment(cube, &spec).unwrap();

        physics.destroy_body(cube);
        assert!(physics.body_info(cube).is_none());
        assert!(!physics.attachment_alive(handle));
        assert!(physics.body_velocity(cube).is_err());
    }
}
