//! 刚体与附着关节

use nalgebra::Vector3;

/// 刚体静态信息（用于可抓取识别）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BodyInfo {
    /// 对象名称
    pub name: String,
    /// 引擎标签（可选）
    pub tag: Option<String>,
}

impl BodyInfo {
    /// 创建刚体信息
    pub fn new(name: impl Into<String>, tag: Option<&str>) -> Self {
        Self {
            name: name.into(),
            tag: tag.map(str::to_string),
        }
    }
}

/// 刚体速度（世界坐标系）
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BodyVelocity {
    /// 线速度（m/s）
    pub linear: Vector3<f64>,
    /// 角速度（rad/s）
    pub angular: Vector3<f64>,
}

impl BodyVelocity {
    /// 静止
    pub fn zero() -> Self {
        Self {
            linear: Vector3::zeros(),
            angular: Vector3::zeros(),
        }
    }

    /// 创建速度
    pub fn new(linear: Vector3<f64>, angular: Vector3<f64>) -> Self {
        Self { linear, angular }
    }

    /// 两个速度之间的最大分量差（用于比较）
    pub fn max_difference(&self, other: &Self) -> f64 {
        (self.linear - other.linear)
            .abs()
            .max()
            .max((self.angular - other.angular).abs().max())
    }
}

impl Default for BodyVelocity {
    fn default() -> Self {
        Self::zero()
    }
}

/// 附着关节参数
///
/// 物体与机械臂锚点之间的刚性连接，超过断裂阈值时由引擎自行断开。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AttachmentSpec {
    /// 断裂力
    pub break_force: f64,
    /// 断裂力矩
    pub break_torque: f64,
}
