//! # 控制器配置
//!
//! 抓取控制器的全部可调参数，支持从 TOML 加载。
//!
//! ```toml
//! [timing]
//! fixed_dt_s = 0.02
//!
//! [stall]
//! error_threshold_deg = 5.0
//! move_threshold_deg = 0.5
//! frames = 3
//!
//! [grasp]
//! required_segments = 3
//! settle_ticks = 5
//! ```
//!
//! 缺省的段落或字段使用默认值。

use crate::drive::DriveGains;
use crate::error::ConfigError;
use crate::units::Deg;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// 控制器完整配置
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GripConfig {
    /// 调度周期
    pub timing: TimingConfig,
    /// 堵转检测
    pub stall: StallConfig,
    /// 驱动器
    pub drive: DriveConfig,
    /// 抓取判定
    pub grasp: GraspConfig,
    /// 可抓取物体识别
    pub grabbable: GrabbableConfig,
    /// 输入映射
    pub input: InputConfig,
}

impl GripConfig {
    /// 从 TOML 字符串解析（不做校验）
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// 从文件加载并校验
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        let config = Self::from_toml_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// 序列化为 TOML
    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// 保存到文件
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        fs::write(path, self.to_toml_string()?)?;
        Ok(())
    }

    /// 校验所有参数
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.timing.validate()?;
        self.stall.validate()?;
        self.drive.validate()?;
        self.grasp.validate()?;
        self.input.validate()
    }
}

/// 调度周期配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    /// 固定物理步长（秒）
    pub fixed_dt_s: f64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self { fixed_dt_s: 0.02 }
    }
}

impl TimingConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if !(self.fixed_dt_s > 0.0) {
            return Err(ConfigError::invalid("timing.fixed_dt_s", self.fixed_dt_s, "must be > 0"));
        }
        Ok(())
    }
}

/// 堵转检测配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StallConfig {
    /// 跟踪误差阈值（度），误差大于此值才可能判定堵转
    pub error_threshold_deg: f64,
    /// 运动阈值（度/帧），单帧位移小于此值视为未移动
    pub move_threshold_deg: f64,
    /// 连续满足条件的帧数
    pub frames: u32,
}

impl Default for StallConfig {
    fn default() -> Self {
        Self {
            error_threshold_deg: 5.0,
            move_threshold_deg: 0.5,
            frames: 3,
        }
    }
}

impl StallConfig {
    /// 误差阈值
    pub fn error_threshold(&self) -> Deg {
        Deg(self.error_threshold_deg)
    }

    /// 运动阈值
    pub fn move_threshold(&self) -> Deg {
        Deg(self.move_threshold_deg)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if !(self.error_threshold_deg > 0.0) {
            return Err(ConfigError::invalid(
                "stall.error_threshold_deg",
                self.error_threshold_deg,
                "must be > 0",
            ));
        }
        if !(self.move_threshold_deg > 0.0) {
            return Err(ConfigError::invalid(
                "stall.move_threshold_deg",
                self.move_threshold_deg,
                "must be > 0",
            ));
        }
        if self.frames == 0 {
            return Err(ConfigError::invalid("stall.frames", self.frames, "must be >= 1"));
        }
        Ok(())
    }
}

/// 驱动器配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DriveConfig {
    /// 弯曲速度（度/秒），同时用于输入累积和目标斜坡
    pub rotation_speed_deg_per_s: f64,
    /// 最大弯曲角（度，负值），目标弯曲角被限制在 `[min_curl_angle_deg, 0]`
    pub min_curl_angle_deg: f64,
    /// 自由运动增益
    pub drive_gains: DriveGains,
    /// 保持增益
    pub hold_gains: DriveGains,
}

impl Default for DriveConfig {
    fn default() -> Self {
        Self {
            rotation_speed_deg_per_s: 90.0,
            min_curl_angle_deg: -90.0,
            drive_gains: DriveGains::DRIVE,
            hold_gains: DriveGains::HOLD,
        }
    }
}

impl DriveConfig {
    /// 最大弯曲角
    pub fn min_curl_angle(&self) -> Deg {
        Deg(self.min_curl_angle_deg)
    }

    /// 单个 tick 允许的最大角度变化
    pub fn max_step(&self, dt_s: f64) -> Deg {
        Deg(self.rotation_speed_deg_per_s * dt_s)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if !(self.rotation_speed_deg_per_s > 0.0) {
            return Err(ConfigError::invalid(
                "drive.rotation_speed_deg_per_s",
                self.rotation_speed_deg_per_s,
                "must be > 0",
            ));
        }
        if !(self.min_curl_angle_deg < 0.0) {
            return Err(ConfigError::invalid(
                "drive.min_curl_angle_deg",
                self.min_curl_angle_deg,
                "must be < 0",
            ));
        }
        if !self.drive_gains.is_valid() {
            return Err(ConfigError::invalid(
                "drive.drive_gains",
                format!("{:?}", self.drive_gains),
                "gains must be >= 0",
            ));
        }
        if !self.hold_gains.is_valid() {
            return Err(ConfigError::invalid(
                "drive.hold_gains",
                format!("{:?}", self.hold_gains),
                "gains must be >= 0",
            ));
        }
        Ok(())
    }
}

/// 抓取判定配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GraspConfig {
    /// 触发抓取所需的接触关节段数
    pub required_segments: usize,
    /// 稳定等待的 tick 数
    pub settle_ticks: u32,
    /// 附着关节断裂力
    pub break_force: f64,
    /// 附着关节断裂力矩
    pub break_torque: f64,
}

impl Default for GraspConfig {
    fn default() -> Self {
        Self {
            required_segments: 3,
            settle_ticks: 5,
            break_force: 1_000.0,
            break_torque: 1_000.0,
        }
    }
}

impl GraspConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.required_segments == 0 {
            return Err(ConfigError::invalid(
                "grasp.required_segments",
                self.required_segments,
                "must be >= 1",
            ));
        }
        if self.settle_ticks == 0 {
            return Err(ConfigError::invalid(
                "grasp.settle_ticks",
                self.settle_ticks,
                "must be >= 1",
            ));
        }
        if !(self.break_force > 0.0) {
            return Err(ConfigError::invalid("grasp.break_force", self.break_force, "must be > 0"));
        }
        if !(self.break_torque > 0.0) {
            return Err(ConfigError::invalid(
                "grasp.break_torque",
                self.break_torque,
                "must be > 0",
            ));
        }
        Ok(())
    }
}

/// 可抓取物体识别配置
///
/// 标签精确匹配，或名称（忽略大小写）包含任一关键字。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GrabbableConfig {
    /// 可抓取标签
    pub tags: Vec<String>,
    /// 名称关键字
    pub name_keywords: Vec<String>,
}

impl Default for GrabbableConfig {
    fn default() -> Self {
        Self {
            tags: vec!["Grabbable".to_string()],
            name_keywords: vec!["grabbable".to_string()],
        }
    }
}

/// 输入映射配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InputConfig {
    /// 死区，绝对值小于此值的输入视为 0
    pub deadzone: f64,
    /// 手指分组：第 i 个输入轴驱动 `finger_groups[i]` 中的所有关节段
    ///
    /// 为空时每个关节段独占一个输入轴。
    pub finger_groups: Vec<Vec<usize>>,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            deadzone: 0.05,
            finger_groups: Vec::new(),
        }
    }
}

impl InputConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..1.0).contains(&self.deadzone) {
            return Err(ConfigError::invalid("input.deadzone", self.deadzone, "must be in [0, 1)"));
        }
        if let Some(group) = self.finger_groups.iter().position(Vec::is_empty) {
            return Err(ConfigError::EmptyFingerGroup { group });
        }
        Ok(())
    }
}
