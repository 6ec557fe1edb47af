//! 强类型角度单位
//!
//! 使用 NewType 模式防止弧度与角度混用。物理引擎以弧度报告关节角，
//! 而抓取逻辑（阈值、弯曲限位、旋转速度）全部以角度表达。
//!
//! # 示例
//!
//! ```rust
//! use grip_types::{Deg, Rad};
//!
//! let angle = Rad(std::f64::consts::FRAC_PI_2).to_deg();
//! assert!((angle.0 - 90.0).abs() < 1e-9);
//!
//! // 类型安全：以下代码无法编译
//! // let _ = Rad(1.0) + Deg(1.0);  // ❌ 类型不匹配
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, AddAssign, Mul, Neg, Sub, SubAssign};

/// 弧度（NewType）
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
pub struct Rad(pub f64);

impl Rad {
    /// 零弧度常量
    pub const ZERO: Self = Rad(0.0);

    /// 转换为角度
    #[inline]
    pub fn to_deg(self) -> Deg {
        Deg(self.0.to_degrees())
    }

    /// 获取原始值
    #[inline]
    pub fn value(self) -> f64 {
        self.0
    }
}

impl fmt::Display for Rad {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.4} rad", self.0)
    }
}

/// 角度（NewType）
///
/// 弯曲方向约定：`0°` 为完全伸展，负值为弯曲（向掌心收拢）。
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
pub struct Deg(pub f64);

impl Deg {
    /// 零角度常量（完全伸展）
    pub const ZERO: Self = Deg(0.0);

    /// 转换为弧度
    #[inline]
    pub fn to_rad(self) -> Rad {
        Rad(self.0.to_radians())
    }

    /// 获取原始值
    #[inline]
    pub fn value(self) -> f64 {
        self.0
    }

    /// 取绝对值
    #[inline]
    pub fn abs(self) -> Self {
        Deg(self.0.abs())
    }

    /// 两个角度之间的绝对差
    #[inline]
    pub fn distance(self, other: Self) -> Self {
        Deg((self.0 - other.0).abs())
    }

    /// 限制范围
    #[inline]
    pub fn clamp(self, min: Self, max: Self) -> Self {
        Deg(self.0.clamp(min.0, max.0))
    }

    /// 以不超过 `max_step` 的步长向 `target` 靠近
    ///
    /// `max_step` 取绝对值；步长足够时直接落在 `target` 上，不会越过。
    pub fn step_toward(self, target: Self, max_step: Self) -> Self {
        let step = max_step.0.abs();
        let delta = target.0 - self.0;
        if delta.abs() <= step {
            target
        } else {
            Deg(self.0 + step.copysign(delta))
        }
    }
}

impl fmt::Display for Deg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}°", self.0)
    }
}

impl From<Rad> for Deg {
    #[inline]
    fn from(rad: Rad) -> Self {
        rad.to_deg()
    }
}

impl From<Deg> for Rad {
    #[inline]
    fn from(deg: Deg) -> Self {
        deg.to_rad()
    }
}

// 运算符重载（仅角度需要，弧度只作为引擎接口的载体）
impl Add for Deg {
    type Output = Self;
    #[inline]
    fn add(self, rhs: Self) -> Self {
        Deg(self.0 + rhs.0)
    }
}

impl Sub for Deg {
    type Output = Self;
    #[inline]
    fn sub(self, rhs: Self) -> Self {
        Deg(self.0 - rhs.0)
    }
}

impl Mul<f64> for Deg {
    type Output = Self;
    #[inline]
    fn mul(self, rhs: f64) -> Self {
        Deg(self.0 * rhs)
    }
}

impl Neg for Deg {
    type Output = Self;
    #[inline]
    fn neg(self) -> Self {
        Deg(-self.0)
    }
}

impl AddAssign for Deg {
    #[inline]
    fn add_assign(&mut self, rhs: Self) {
        self.0 += rhs.0;
    }
}

impl SubAssign for Deg {
    #[inline]
    fn sub_assign(&mut self, rhs: Self) {
        self.0 -= rhs.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_rad_deg_conversion() {
        let deg = Rad(std::f64::consts::PI).to_deg();
        assert!((deg.0 - 180.0).abs() < 1e-9);

        let rad = Deg(-90.0).to_rad();
        assert!((rad.0 + std::f64::consts::FRAC_PI_2).abs() < 1e-9);
    }

    #[test]
    fn test_step_toward_reaches_target() {
        assert_eq!(Deg(0.0).step_toward(Deg(-1.0), Deg(5.0)), Deg(-1.0));
        assert_eq!(Deg(0.0).step_toward(Deg(-10.0), Deg(2.0)), Deg(-2.0));
        assert_eq!(Deg(-10.0).step_toward(Deg(0.0), Deg(2.0)), Deg(-8.0));
        // 负步长按绝对值处理
        assert_eq!(Deg(0.0).step_toward(Deg(10.0), Deg(-3.0)), Deg(3.0));
    }

    #[test]
    fn test_distance_is_symmetric() {
        assert_eq!(Deg(-30.0).distance(Deg(10.0)), Deg(40.0));
        assert_eq!(Deg(10.0).distance(Deg(-30.0)), Deg(40.0));
    }

    #[test]
    fn test_display() {
        assert_eq!(format!("{}", Deg(-12.5)), "-12.50°");
        assert_eq!(format!("{}", Rad(1.0)), "1.0000 rad");
    }

    proptest! {
        #[test]
        fn prop_step_toward_is_bounded(start in -180.0f64..180.0, target in -180.0f64..180.0, step in 0.0f64..50.0) {
            let next = Deg(start).step_toward(Deg(target), Deg(step));
            prop_assert!((next.0 - start).abs() <= step + 1e-9);
            // 不越过目标
            prop_assert!((next.0 - target).abs() <= (start - target).abs() + 1e-9);
        }
    }
}
