//! # Grip CLI
//!
//! 抓取控制器的命令行工具：在 Mock 物理引擎上回放脚本场景，管理控制器配置。
//!
//! ```bash
//! # 回放场景
//! grip-cli simulate scenarios/pinch.json
//!
//! # 使用自定义配置，实时节拍
//! grip-cli simulate scenarios/pinch.json --config grip.toml --realtime
//!
//! # 生成并检查配置
//! grip-cli config write grip.toml
//! grip-cli config check grip.toml
//! ```

use anyhow::Result;
use clap::{Parser, Subcommand};

mod commands;
mod scenario;

use commands::{ConfigCommand, SimulateCommand};

/// Grip CLI - 抓取控制器命令行工具
#[derive(Parser, Debug)]
#[command(name = "grip-cli")]
#[command(about = "Scripted grasp simulations and controller configuration", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// 回放仿真场景
    Simulate {
        #[command(flatten)]
        args: SimulateCommand,
    },

    /// 配置管理
    #[command(subcommand)]
    Config(ConfigCommand),
}

fn main() -> Result<()> {
    // 初始化日志（RUST_LOG 优先）
    grip_sdk::logging::init_logger_with("grip=info");

    let cli = Cli::parse();

    match cli.command {
        Commands::Simulate { args } => args.execute(),
        Commands::Config(cmd) => cmd.execute(),
    }
}
