//! 场景仿真命令
//!
//! 在 Mock 物理引擎上回放 JSON 场景，打印抓取事件和最终状态。

use crate::scenario::{RunOptions, Scenario, ScenarioRunner, SimulationSummary};
use anyhow::{Context, Result};
use clap::Args;
use grip_control::{GraspEvent, GraspState};
use grip_types::GripConfig;
use std::path::PathBuf;
use std::sync::atomic::Ordering;
use tracing::info;

/// 仿真命令参数
#[derive(Args, Debug)]
pub struct SimulateCommand {
    /// 场景文件（JSON）
    pub scenario: PathBuf,

    /// 控制器配置文件（TOML，缺省使用默认配置）
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// 按固定步长实时运行
    #[arg(long)]
    pub realtime: bool,

    /// tick 上限
    #[arg(long)]
    pub ticks: Option<u64>,

    /// 只打印汇总
    #[arg(short, long)]
    pub quiet: bool,
}

impl SimulateCommand {
    pub fn execute(self) -> Result<()> {
        let scenario = Scenario::load(&self.scenario)?;
        let config = match &self.config {
            Some(path) => GripConfig::load(path)
                .with_context(|| format!("加载配置失败: {}", path.display()))?,
            None => GripConfig::default(),
        };

        println!("▶️  场景: {}", scenario.name);
        if !scenario.description.is_empty() {
            println!("   {}", scenario.description);
        }
        info!(
            segments = scenario.segments.len(),
            bodies = scenario.bodies.len(),
            ticks = scenario.total_ticks(),
            "Starting simulation"
        );

        let options = RunOptions {
            realtime: self.realtime,
            max_ticks: self.ticks,
        };
        let runner = ScenarioRunner::new(&scenario, config, options)?.verbose(!self.quiet);

        let stop = runner.stop_flag();
        ctrlc::set_handler(move || {
            stop.store(true, Ordering::Relaxed);
        })
        .context("注册 Ctrl-C 处理器失败")?;

        let summary = runner.run(&scenario)?;
        print_summary(&summary);
        Ok(())
    }
}

fn print_summary(summary: &SimulationSummary) {
    let count = |f: fn(&GraspEvent) -> bool| summary.events.iter().filter(|(_, e)| f(e)).count();

    println!();
    if summary.interrupted {
        println!("⏹️  提前终止");
    }
    println!("📊 汇总");
    println!("  ticks:     {}", summary.ticks);
    println!(
        "  onsets:    {}",
        count(|e| matches!(e, GraspEvent::OnsetStarted { .. }))
    );
    println!(
        "  confirmed: {}",
        count(|e| matches!(e, GraspEvent::Confirmed { .. }))
    );
    println!(
        "  aborted:   {}",
        count(|e| matches!(e, GraspEvent::Aborted { .. }))
    );
    println!(
        "  released:  {}",
        count(|e| matches!(e, GraspEvent::Released { .. }))
    );
    println!(
        "  stalls:    {}",
        count(|e| matches!(e, GraspEvent::SegmentStalled { .. }))
    );

    let state = match summary.final_state {
        GraspState::Idle => "Idle".to_string(),
        GraspState::PendingSettle { body, remaining } => {
            format!("PendingSettle({body}, {remaining} ticks left)")
        },
        GraspState::Confirmed { body, attachment } => format!("Confirmed({body}, {attachment})"),
    };
    println!("  state:     {state}");
}
