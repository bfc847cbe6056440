//! # 参数边界变换
//!
//! 将带边界的外部参数映射为无约束的内部参数，求解器只在内部空间工作。
//!
//! ## 变换
//! - 仅下界：u = sqrt((x - min + 1)² - 1)，x = min - 1 + sqrt(u² + 1)
//! - 仅上界：u = sqrt((max - x + 1)² - 1)，x = max + 1 - sqrt(u² + 1)
//! - 双边界：u = asin(2(x - min)/(max - min) - 1)，x = min + (sin u + 1)(max - min)/2
//! - 无边界：恒等变换
//!
//! ## 依赖关系
//! - 被 `xrd/fit/mod.rs` 的 `BoundedProblem` 使用

/// 单个参数的边界
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Bounds {
    pub min: Option<f64>,
    pub max: Option<f64>,
}

impl Bounds {
    pub fn new(min: Option<f64>, max: Option<f64>) -> Self {
        Self { min, max }
    }

    /// 将外部值截断到边界内
    pub fn clamp(&self, x: f64) -> f64 {
        let x = self.min.map_or(x, |min| x.max(min));
        self.max.map_or(x, |max| x.min(max))
    }

    /// 外部值 -> 内部值
    pub fn to_internal(&self, x: f64) -> f64 {
        let x = self.clamp(x);
        match (self.min, self.max) {
            (None, None) => x,
            (Some(min), None) => ((x - min + 1.0).powi(2) - 1.0).max(0.0).sqrt(),
            (None, Some(max)) => ((max - x + 1.0).powi(2) - 1.0).max(0.0).sqrt(),
            (Some(min), Some(max)) => (2.0 * (x - min) / (max - min) - 1.0).clamp(-1.0, 1.0).asin(),
        }
    }

    /// 内部值 -> 外部值
    pub fn to_external(&self, u: f64) -> f64 {
        match (self.min, self.max) {
            (None, None) => u,
            (Some(min), None) => min - 1.0 + (u * u + 1.0).sqrt(),
            (None, Some(max)) => max + 1.0 - (u * u + 1.0).sqrt(),
            (Some(min), Some(max)) => min + (u.sin() + 1.0) * (max - min) / 2.0,
        }
    }
}
