//! # 误差传递
//!
//! 带标准不确定度和单位的物理量，按一阶（线性）近似传递误差，输入视为相互独立。
//!
//! ## 单位
//! 单位只记录纳米的幂次：`nm⁰` 为无量纲，`C1` 为 nm²，`C2` 为 nm⁴。
//!
//! ## 依赖关系
//! - 被 `xrd/vonk.rs` 用于由 C0, C1, C2 计算 fc 和 k

use serde::Serialize;
use std::fmt;
use std::ops::{Add, Mul};

/// 纳米的幂次
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct Unit {
    pub nm_power: i32,
}

impl Unit {
    pub const DIMENSIONLESS: Unit = Unit { nm_power: 0 };
    pub const NM2: Unit = Unit { nm_power: 2 };
    pub const NM4: Unit = Unit { nm_power: 4 };

    pub fn nm(power: i32) -> Self {
        Unit { nm_power: power }
    }

    pub fn is_dimensionless(&self) -> bool {
        self.nm_power == 0
    }
}

fn superscript(n: i32) -> String {
    n.to_string()
        .chars()
        .map(|c| match c {
            '-' => '⁻',
            '0' => '⁰',
            '1' => '¹',
            '2' => '²',
            '3' => '³',
            '4' => '⁴',
            '5' => '⁵',
            '6' => '⁶',
            '7' => '⁷',
            '8' => '⁸',
            '9' => '⁹',
            other => other,
        })
        .collect()
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.nm_power {
            0 => write!(f, "1"),
            1 => write!(f, "nm"),
            p => write!(f, "nm{}", superscript(p)),
        }
    }
}

/// 带不确定度的物理量
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct UncertainQuantity {
    pub value: f64,
    /// 一倍标准差
    pub uncertainty: f64,
    pub unit: Unit,
}

impl UncertainQuantity {
    pub fn new(value: f64, uncertainty: f64, unit: Unit) -> Self {
        Self {
            value,
            uncertainty: uncertainty.abs(),
            unit,
        }
    }

    pub fn dimensionless(value: f64, uncertainty: f64) -> Self {
        Self::new(value, uncertainty, Unit::DIMENSIONLESS)
    }

    /// 相对不确定度
    pub fn relative_uncertainty(&self) -> f64 {
        self.uncertainty / self.value.abs()
    }

    /// 1/x，σ = σx / x²
    pub fn recip(self) -> Self {
        Self::new(
            1.0 / self.value,
            self.uncertainty / (self.value * self.value),
            Unit::nm(-self.unit.nm_power),
        )
    }

    /// c·x，σ = |c|·σx
    pub fn scale(self, c: f64) -> Self {
        Self::new(c * self.value, c.abs() * self.uncertainty, self.unit)
    }

    /// xⁿ，σ = |n·xⁿ⁻¹|·σx
    pub fn powi(self, n: i32) -> Self {
        let derivative = f64::from(n) * self.value.powi(n - 1);
        Self::new(
            self.value.powi(n),
            (derivative * self.uncertainty).abs(),
            Unit::nm(self.unit.nm_power * n),
        )
    }

    /// √x，σ = σx / (2√x)
    ///
    /// x = 0 时导数发散：σx = 0 则结果不确定度为 0，否则为 +∞。
    pub fn sqrt(self) -> Self {
        debug_assert!(
            self.unit.nm_power % 2 == 0,
            "square root of odd unit power {}",
            self.unit
        );
        let value = self.value.sqrt();
        let uncertainty = if value == 0.0 {
            if self.uncertainty == 0.0 {
                0.0
            } else {
                f64::INFINITY
            }
        } else {
            self.uncertainty / (2.0 * value)
        };
        Self::new(value, uncertainty, Unit::nm(self.unit.nm_power / 2))
    }
}

impl Mul<f64> for UncertainQuantity {
    type Output = UncertainQuantity;

    fn mul(self, rhs: f64) -> Self::Output {
        self.scale(rhs)
    }
}

/// x·y，σ² = (y·σx)² + (x·σy)²
impl Mul for UncertainQuantity {
    type Output = UncertainQuantity;

    fn mul(self, rhs: Self) -> Self::Output {
        let uncertainty = (rhs.value * self.uncertainty).hypot(self.value * rhs.uncertainty);
        UncertainQuantity::new(
            self.value * rhs.value,
            uncertainty,
            Unit::nm(self.unit.nm_power + rhs.unit.nm_power),
        )
    }
}

/// x + y，σ² = σx² + σy²；单位必须一致
impl Add for UncertainQuantity {
    type Output = UncertainQuantity;

    fn add(self, rhs: Self) -> Self::Output {
        assert_eq!(
            self.unit, rhs.unit,
            "cannot add quantities in {} and {}",
            self.unit, rhs.unit
        );
        UncertainQuantity::new(
            self.value + rhs.value,
            self.uncertainty.hypot(rhs.uncertainty),
            self.unit,
        )
    }
}

impl fmt::Display for UncertainQuantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.4} ± {:.4}", self.value, self.uncertainty)?;
        if !self.unit.is_dimensionless() {
            write!(f, " {}", self.unit)?;
        }
        Ok(())
    }
}
