//! 配置管理命令
//!
//! 生成、检查控制器 TOML 配置文件

use anyhow::{Context, Result, bail};
use clap::Subcommand;
use grip_types::GripConfig;
use std::path::{Path, PathBuf};

/// 配置命令
#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// 打印默认配置
    Default,

    /// 写入默认配置文件
    Write {
        /// 输出路径
        path: PathBuf,

        /// 覆盖已存在的文件
        #[arg(short, long)]
        force: bool,
    },

    /// 检查配置文件
    Check {
        /// 配置文件路径
        path: PathBuf,
    },
}

impl ConfigCommand {
    pub fn execute(self) -> Result<()> {
        match self {
            ConfigCommand::Default => {
                print!("{}", default_toml()?);
                Ok(())
            },
            ConfigCommand::Write { path, force } => {
                write_default(&path, force)?;
                println!("✅ 已写入默认配置: {}", path.display());
                Ok(())
            },
            ConfigCommand::Check { path } => {
                let config = check(&path)?;
                println!("✅ 配置有效: {}", path.display());
                print_summary(&config);
                Ok(())
            },
        }
    }
}

/// 默认配置的 TOML 文本
pub fn default_toml() -> Result<String> {
    GripConfig::default()
        .to_toml_string()
        .context("序列化默认配置失败")
}

/// 写入默认配置
pub fn write_default(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        bail!("文件已存在: {}（使用 --force 覆盖）", path.display());
    }
    GripConfig::default()
        .save(path)
        .with_context(|| format!("写入配置文件失败: {}", path.display()))
}

/// 加载并校验配置
pub fn check(path: &Path) -> Result<GripConfig> {
    GripConfig::load(path).with_context(|| format!("配置无效: {}", path.display()))
}

fn print_summary(config: &GripConfig) {
    println!("  fixed_dt:          {} s", config.timing.fixed_dt_s);
    println!("  stall frames:      {}", config.stall.frames);
    println!("  min curl angle:    {}°", config.drive.min_curl_angle_deg);
    println!("  required segments: {}", config.grasp.required_segments);
    println!("  settle ticks:      {}", config.grasp.settle_ticks);
    println!("  finger groups:     {}", config.input.finger_groups.len());
}
