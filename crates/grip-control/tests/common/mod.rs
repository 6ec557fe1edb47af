//! 集成测试公共工具

#![allow(dead_code)]

use grip_control::{GraspController, GraspEvent, TickReport};
use grip_physics::{ContactSender, ContactSink, MockPhysics};
use grip_types::{BodyHandle, GripConfig, SegmentId};

/// 4 个关节段，需要 3 个接触，等待 4 个 tick
pub fn scenario_config() -> GripConfig {
    let mut config = GripConfig::default();
    config.grasp.required_segments = 3;
    config.grasp.settle_ticks = 4;
    config
}

pub struct Rig {
    pub controller: GraspController<MockPhysics>,
    pub contacts: ContactSender,
    pub events: Vec<GraspEvent>,
}

impl Rig {
    pub fn new(physics: MockPhysics, config: GripConfig) -> Self {
        let controller = GraspController::new(physics, config).unwrap();
        let contacts = controller.contact_sender();
        Self {
            controller,
            contacts,
            events: Vec::new(),
        }
    }

    /// 4 个关节段 + 一个可抓取物体
    pub fn four_fingers() -> (Self, BodyHandle) {
        let mut physics = MockPhysics::with_segments(["index_0", "index_1", "middle_0", "thumb_0"]);
        let cube = physics.add_body("cube", Some("Grabbable"));
        (Self::new(physics, scenario_config()), cube)
    }

    pub fn begin(&self, body: BodyHandle, segments: &[usize]) {
        for &i in segments {
            self.contacts.on_contact_begin(SegmentId(i), Some(body));
        }
    }

    pub fn end(&self, body: BodyHandle, segments: &[usize]) {
        for &i in segments {
            self.contacts.on_contact_end(SegmentId(i), Some(body));
        }
    }

    pub fn tick(&mut self) -> TickReport {
        let report = self.controller.tick().unwrap();
        self.events.extend(report.events.iter().cloned());
        report
    }

    /// 物理步进 + 控制 tick
    pub fn step(&mut self) -> TickReport {
        let dt = self.controller.config().timing.fixed_dt_s;
        self.controller.backend_mut().step(dt);
        self.tick()
    }

    pub fn confirmed(&self, body: BodyHandle) -> bool {
        self.events
            .iter()
            .any(|e| matches!(e, GraspEvent::Confirmed { body: b, .. } if *b == body))
    }

    pub fn all_unfrozen(&self) -> bool {
        self.controller
            .segments()
            .iter()
            .all(|s| s.frozen_angle().is_none())
    }

    pub fn all_frozen(&self) -> bool {
        self.controller
            .segments()
            .iter()
            .all(|s| s.frozen_angle().is_some())
    }
}
