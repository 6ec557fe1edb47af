//! 仿真场景
//!
//! JSON 描述的 Mock 物理场景（关节段、障碍、物体、锚点）加一串脚本步骤，
//! 由 `ScenarioRunner` 逐 tick 回放。

use anyhow::{Context, Result, bail};
use crossbeam_channel::Receiver;
use grip_control::{ChannelEventHook, GraspController, GraspEvent, GraspState};
use grip_physics::{BodyVelocity, MockPhysics};
use grip_types::{BodyHandle, Deg, GripConfig, SegmentId};
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};
use spin_sleep::SpinSleeper;
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

/// 仿真场景
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scenario {
    /// 场景名称
    pub name: String,

    /// 场景描述
    #[serde(default)]
    pub description: String,

    /// 关节段（顺序即索引）
    pub segments: Vec<SegmentSpec>,

    /// 物体
    #[serde(default)]
    pub bodies: Vec<BodySpec>,

    /// 锚点
    #[serde(default)]
    pub anchor: AnchorSpec,

    /// 脚本步骤
    pub steps: Vec<ScenarioStep>,
}

/// 关节段描述
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SegmentSpec {
    pub name: String,

    /// 初始角度（度）
    #[serde(default)]
    pub initial_deg: f64,

    /// 障碍角（度）：弯曲无法越过
    #[serde(default)]
    pub obstacle_deg: Option<f64>,

    /// 障碍所属物体名称（停在障碍上即接触该物体）
    #[serde(default)]
    pub touches: Option<String>,
}

/// 物体描述
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BodySpec {
    pub name: String,
    #[serde(default)]
    pub tag: Option<String>,
}

/// 锚点描述
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnchorSpec {
    #[serde(default = "default_true")]
    pub present: bool,
    #[serde(default)]
    pub linear: [f64; 3],
    #[serde(default)]
    pub angular: [f64; 3],
}

fn default_true() -> bool {
    true
}

impl Default for AnchorSpec {
    fn default() -> Self {
        Self {
            present: true,
            linear: [0.0; 3],
            angular: [0.0; 3],
        }
    }
}

/// 脚本步骤
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ScenarioStep {
    /// 每个 tick 对所有手指施加同一弯曲输入
    Curl { input: f64, ticks: u64 },

    /// 每个 tick 按手指分组施加多轴输入
    Input { axes: Vec<f64>, ticks: u64 },

    /// 空转
    Wait { ticks: u64 },

    /// 对物体的附着关节施加载荷
    Load {
        body: String,
        force: f64,
        #[serde(default)]
        torque: f64,
    },

    /// 销毁物体（同时移除它的障碍）
    DestroyBody { body: String },

    /// 移除关节段的障碍
    RemoveObstacle { segment: usize },

    /// 外部释放；未指定物体时释放全部
    Release {
        #[serde(default)]
        body: Option<String>,
    },
}

impl Scenario {
    /// 加载场景文件
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("读取场景文件失败: {}", path.display()))?;
        Self::from_json(&content)
    }

    /// 解析并校验场景 JSON
    pub fn from_json(content: &str) -> Result<Self> {
        let scenario: Scenario = serde_json::from_str(content).context("解析场景 JSON 失败")?;
        scenario.validate()?;
        Ok(scenario)
    }

    /// 检查物体名称引用
    pub fn validate(&self) -> Result<()> {
        let mut names = HashSet::new();
        for body in &self.bodies {
            if !names.insert(body.name.as_str()) {
                bail!("物体名称重复: {}", body.name);
            }
        }
        let known = |name: &str| names.contains(name);

        for segment in &self.segments {
            if let Some(body) = &segment.touches {
                if !known(body) {
                    bail!("关节段 {} 引用了未定义的物体: {}", segment.name, body);
                }
                if segment.obstacle_deg.is_none() {
                    bail!("关节段 {} 指定了 touches 但没有 obstacle_deg", segment.name);
                }
            }
        }

        for (i, step) in self.steps.iter().enumerate() {
            match step {
                ScenarioStep::Load { body, .. } | ScenarioStep::DestroyBody { body } => {
                    if !known(body) {
                        bail!("步骤 {} 引用了未定义的物体: {}", i + 1, body);
                    }
                },
                ScenarioStep::Release { body: Some(body) } if !known(body) => {
                    bail!("步骤 {} 引用了未定义的物体: {}", i + 1, body);
                },
                ScenarioStep::RemoveObstacle { segment } if *segment >= self.segments.len() => {
                    bail!("步骤 {} 引用了不存在的关节段: {}", i + 1, segment);
                },
                _ => {},
            }
        }
        Ok(())
    }

    /// 按场景构建 Mock 物理引擎
    ///
    /// # 返回
    ///
    /// - `(physics, bodies)`: 引擎和物体名称到句柄的映射
    pub fn build_physics(&self) -> (MockPhysics, HashMap<String, BodyHandle>) {
        let mut physics = MockPhysics::new();
        let mut bodies = HashMap::new();
        for body in &self.bodies {
            let handle = physics.add_body(body.name.clone(), body.tag.as_deref());
            bodies.insert(body.name.clone(), handle);
        }

        for spec in &self.segments {
            let id = physics.add_segment(spec.name.clone());
            physics.set_joint_angle(id, Deg(spec.initial_deg));
            if let Some(obstacle) = spec.obstacle_deg {
                let body = spec.touches.as_ref().and_then(|name| bodies.get(name)).copied();
                physics.set_obstacle(id, Deg(obstacle), body);
            }
        }

        physics.set_anchor_present(self.anchor.present);
        physics.set_anchor_velocity(BodyVelocity::new(
            Vector3::from(self.anchor.linear),
            Vector3::from(self.anchor.angular),
        ));
        (physics, bodies)
    }

    /// 脚本总 tick 数
    pub fn total_ticks(&self) -> u64 {
        self.steps
            .iter()
            .map(|step| match step {
                ScenarioStep::Curl { ticks, .. }
                | ScenarioStep::Input { ticks, .. }
                | ScenarioStep::Wait { ticks } => *ticks,
                _ => 0,
            })
            .sum()
    }
}

/// 回放选项
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// 按 `fixed_dt_s` 实时节拍
    pub realtime: bool,
    /// tick 上限
    pub max_ticks: Option<u64>,
}

/// 回放结果
#[derive(Debug)]
pub struct SimulationSummary {
    /// 执行的 tick 数
    pub ticks: u64,
    /// 全部事件（tick 编号, 事件）
    pub events: Vec<(u64, GraspEvent)>,
    /// 结束时的抓取状态
    pub final_state: GraspState,
    /// 是否被 Ctrl-C / tick 上限提前终止
    pub interrupted: bool,
}

/// 场景回放器
pub struct ScenarioRunner {
    controller: GraspController<MockPhysics>,
    events_rx: Receiver<GraspEvent>,
    bodies: HashMap<String, BodyHandle>,
    names: HashMap<BodyHandle, String>,
    options: RunOptions,
    stop: Arc<AtomicBool>,
    sleeper: SpinSleeper,
    period: Duration,
    events: Vec<(u64, GraspEvent)>,
    verbose: bool,
}

impl ScenarioRunner {
    /// 构建回放器
    pub fn new(scenario: &Scenario, config: GripConfig, options: RunOptions) -> Result<Self> {
        let (physics, bodies) = scenario.build_physics();
        let period = Duration::try_from_secs_f64(config.timing.fixed_dt_s)
            .with_context(|| format!("无效的步长: {} s", config.timing.fixed_dt_s))?;

        let mut controller = GraspController::new(physics, config).context("创建控制器失败")?;
        if !controller.is_enabled() {
            bail!("控制器已禁用: {}", controller.status());
        }

        // 引擎的接触事件进入控制器的队列，下一个 tick 处理
        let sender = controller.contact_sender();
        controller.backend_mut().connect_contacts(sender);

        // tick 内外（含外部释放）的事件都经由钩子收集
        let (hook, events_rx) = ChannelEventHook::new(ChannelEventHook::DEFAULT_CAPACITY);
        controller.hooks().write().add_callback(Arc::new(hook));

        let names = bodies.iter().map(|(name, handle)| (*handle, name.clone())).collect();
        Ok(Self {
            controller,
            events_rx,
            bodies,
            names,
            options,
            stop: Arc::new(AtomicBool::new(false)),
            sleeper: SpinSleeper::default(),
            period,
            events: Vec::new(),
            verbose: false,
        })
    }

    /// 打印每个事件
    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// 停止标志（Ctrl-C 处理器置位）
    pub fn stop_flag(&self) -> Arc<AtomicBool> {
        self.stop.clone()
    }

    /// 按名称查找物体
    pub fn body(&self, name: &str) -> Option<BodyHandle> {
        self.bodies.get(name).copied()
    }

    /// 回放全部步骤
    pub fn run(mut self, scenario: &Scenario) -> Result<SimulationSummary> {
        let mut interrupted = false;
        'steps: for (i, step) in scenario.steps.iter().enumerate() {
            match step {
                ScenarioStep::Curl { input, ticks } => {
                    for _ in 0..*ticks {
                        self.controller.curl_all_fingers(*input)?;
                        if !self.advance()? {
                            interrupted = true;
                            break 'steps;
                        }
                    }
                },
                ScenarioStep::Input { axes, ticks } => {
                    for _ in 0..*ticks {
                        self.controller.apply_input(axes)?;
                        if !self.advance()? {
                            interrupted = true;
                            break 'steps;
                        }
                    }
                },
                ScenarioStep::Wait { ticks } => {
                    for _ in 0..*ticks {
                        if !self.advance()? {
                            interrupted = true;
                            break 'steps;
                        }
                    }
                },
                ScenarioStep::Load {
                    body,
                    force,
                    torque,
                } => {
                    let handle = self.resolve(body)?;
                    let physics = self.controller.backend_mut();
                    let mut broken = false;
                    for attachment in physics.attachments_for(handle) {
                        broken |= physics.apply_load(attachment, *force, *torque);
                    }
                    if broken {
                        self.say(format!("步骤 {}: {} 的附着关节断开", i + 1, body));
                    }
                },
                ScenarioStep::DestroyBody { body } => {
                    let handle = self.resolve(body)?;
                    let physics = self.controller.backend_mut();
                    for index in 0..scenario.segments.len() {
                        let id = SegmentId(index);
                        if physics.segment(id).is_some_and(|s| s.obstacle_body == Some(handle)) {
                            physics.clear_obstacle(id);
                        }
                    }
                    physics.destroy_body(handle);
                    self.say(format!("步骤 {}: 销毁 {}", i + 1, body));
                },
                ScenarioStep::RemoveObstacle { segment } => {
                    self.controller.backend_mut().clear_obstacle(SegmentId(*segment));
                },
                ScenarioStep::Release { body: Some(body) } => {
                    let handle = self.resolve(body)?;
                    if !self.controller.release(handle)? {
                        self.say(format!("步骤 {}: {} 未被抓取", i + 1, body));
                    }
                    self.collect();
                },
                ScenarioStep::Release { body: None } => {
                    self.controller.release_all()?;
                    self.collect();
                },
            }
        }

        self.collect();
        Ok(SimulationSummary {
            ticks: self.controller.tick_count(),
            events: self.events,
            final_state: self.controller.grasp_state(),
            interrupted,
        })
    }

    /// 推进一个 tick；返回 `false` 表示应停止
    fn advance(&mut self) -> Result<bool> {
        if self.stop.load(Ordering::Relaxed) {
            return Ok(false);
        }
        if self
            .options
            .max_ticks
            .is_some_and(|max| self.controller.tick_count() >= max)
        {
            return Ok(false);
        }

        let dt = self.controller.config().timing.fixed_dt_s;
        self.controller.backend_mut().step(dt);
        self.controller.tick()?;
        self.collect();

        if self.options.realtime {
            self.sleeper.sleep(self.period);
        }
        Ok(true)
    }

    /// 取出钩子收到的事件
    fn collect(&mut self) {
        let tick = self.controller.tick_count();
        while let Ok(event) = self.events_rx.try_recv() {
            if self.verbose {
                println!("  [tick {:>4}] {}", tick, describe(&event, &self.names));
            }
            self.events.push((tick, event));
        }
    }

    fn resolve(&self, name: &str) -> Result<BodyHandle> {
        self.body(name).with_context(|| format!("未定义的物体: {name}"))
    }

    fn say(&self, line: String) {
        if self.verbose {
            println!("  {line}");
        }
    }
}

/// 事件的可读描述
pub fn describe(event: &GraspEvent, names: &HashMap<BodyHandle, String>) -> String {
    let name = |body: &BodyHandle| names.get(body).cloned().unwrap_or_else(|| body.to_string());
    match event {
        GraspEvent::OnsetStarted { body, touching } => {
            format!("⏳ {} 接触 {} 个关节段，开始等待确认", name(body), touching)
        },
        GraspEvent::Superseded { previous, by } => {
            format!("↪️  {} 的等待被 {} 取代", name(previous), name(by))
        },
        GraspEvent::Confirmed { body, attachment } => {
            format!("✅ 抓取确认: {} ({})", name(body), attachment)
        },
        GraspEvent::Aborted { body, reason } => {
            format!("❌ 抓取中止: {} ({})", name(body), reason)
        },
        GraspEvent::Released { body, reason } => {
            format!("🔓 释放: {} ({})", name(body), reason)
        },
        GraspEvent::SegmentStalled { segment, angle } => {
            format!("⚠️  {} 堵转于 {}", segment, angle)
        },
        GraspEvent::SegmentRecovered { segment } => format!("   {} 恢复", segment),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use grip_control::{AbortReason, ReleaseReason};

    const PINCH: &str = include_str!("../scenarios/pinch.json");
    const DROP: &str = include_str!("../scenarios/drop.json");

    fn run(scenario: &Scenario, options: RunOptions) -> SimulationSummary {
        let runner = ScenarioRunner::new(scenario, GripConfig::default(), options).unwrap();
        runner.run(scenario).unwrap()
    }

    #[test]
    fn test_pinch_scenario_grasps_then_releases() {
        let scenario = Scenario::from_json(PINCH).unwrap();
        assert_eq!(scenario.total_ticks(), 65);

        let runner =
            ScenarioRunner::new(&scenario, GripConfig::default(), RunOptions::default()).unwrap();
        let cube = runner.body("cube").unwrap();
        let summary = runner.run(&scenario).unwrap();

        assert!(!summary.interrupted);
        assert_eq!(summary.ticks, 65);
        assert!(summary.events.iter().any(
            |(_, e)| matches!(e, GraspEvent::Confirmed { body, .. } if *body == cube)
        ));
        assert!(summary.events.iter().any(|(_, e)| matches!(
            e,
            GraspEvent::Released {
                reason: ReleaseReason::External,
                ..
            }
        )));
        assert_eq!(summary.final_state, GraspState::Idle);
    }

    #[test]
    fn test_drop_scenario_breaks_attachment() {
        let scenario = Scenario::from_json(DROP).unwrap();
        let summary = run(&scenario, RunOptions::default());

        let released: Vec<_> = summary
            .events
            .iter()
            .filter_map(|(_, e)| match e {
                GraspEvent::Released { reason, .. } => Some(*reason),
                _ => None,
            })
            .collect();
        assert_eq!(released, vec![ReleaseReason::AttachmentBroken]);
        assert_eq!(summary.final_state, GraspState::Idle);
    }

    #[test]
    fn test_destroyed_body_aborts_pending_grasp() {
        let scenario = Scenario::from_json(
            r#"{
                "name": "vanish",
                "segments": [
                    { "name": "a", "obstacle_deg": -10.0, "touches": "box" },
                    { "name": "b", "obstacle_deg": -10.0, "touches": "box" },
                    { "name": "c", "obstacle_deg": -10.0, "touches": "box" }
                ],
                "bodies": [{ "name": "box", "tag": "Grabbable" }],
                "steps": [
                    { "type": "Curl", "input": -1.0, "ticks": 9 },
                    { "type": "DestroyBody", "body": "box" },
                    { "type": "Wait", "ticks": 10 }
                ]
            }"#,
        )
        .unwrap();
        let summary = run(&scenario, RunOptions::default());

        assert!(summary.events.iter().any(|(_, e)| matches!(
            e,
            GraspEvent::OnsetStarted { .. }
        )));
        assert!(summary.events.iter().any(|(_, e)| matches!(
            e,
            GraspEvent::Aborted {
                reason: AbortReason::BodyVanished,
                ..
            }
        )));
        assert!(!summary.events.iter().any(|(_, e)| matches!(e, GraspEvent::Confirmed { .. })));
        assert_eq!(summary.final_state, GraspState::Idle);
    }

    #[test]
    fn test_unrepresentable_step_is_rejected() {
        let scenario = Scenario::from_json(PINCH).unwrap();
        let mut config = GripConfig::default();
        config.timing.fixed_dt_s = 1e300;

        let err = ScenarioRunner::new(&scenario, config, RunOptions::default())
            .err()
            .unwrap();
        assert!(err.to_string().contains("步长"));
    }

    #[test]
    fn test_max_ticks_interrupts_run() {
        let scenario = Scenario::from_json(PINCH).unwrap();
        let summary = run(
            &scenario,
            RunOptions {
                realtime: false,
                max_ticks: Some(3),
            },
        );
        assert!(summary.interrupted);
        assert_eq!(summary.ticks, 3);
    }

    #[test]
    fn test_validate_rejects_unknown_references() {
        let unknown_body = r#"{
            "name": "bad",
            "segments": [{ "name": "a", "obstacle_deg": -10.0, "touches": "ghost" }],
            "steps": []
        }"#;
        assert!(Scenario::from_json(unknown_body).is_err());

        let missing_obstacle = r#"{
            "name": "bad",
            "segments": [{ "name": "a", "touches": "box" }],
            "bodies": [{ "name": "box" }],
            "steps": []
        }"#;
        assert!(Scenario::from_json(missing_obstacle).is_err());

        let bad_segment = r#"{
            "name": "bad",
            "segments": [{ "name": "a" }],
            "steps": [{ "type": "RemoveObstacle", "segment": 4 }]
        }"#;
        assert!(Scenario::from_json(bad_segment).is_err());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pinch.json");
        std::fs::write(&path, PINCH).unwrap();

        let scenario = Scenario::load(&path).unwrap();
        assert_eq!(scenario.name, "pinch");
        assert_eq!(scenario.segments.len(), 4);
        assert!(scenario.anchor.present);
        assert_eq!(
            scenario.steps[2],
            ScenarioStep::Release {
                body: Some("cube".to_string())
            }
        );
    }
}
