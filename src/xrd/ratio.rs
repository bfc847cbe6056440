//! # Vonk/Ruland 比值函数
//!
//! - R 函数：观测强度与结晶参考强度的 s² 加权累积积分之比
//! - T 函数：(<f²> + J) 与观测强度的 s² 加权累积积分之比，用于求解非相干散射 J
//!
//! 两者输出长度均为 `vects.len() - 1`，要求 `vects` 升序且与强度逐点对齐。
//!
//! ## 依赖关系
//! - 被 `xrd/vonk.rs` 调用
//! - 使用 `xrd/integrate.rs` 累积积分
//! - 使用 `xrd/scattering.rs` 计算 <f²>

use crate::xrd::integrate::cumulative_trapezoid;
use crate::xrd::scattering::{mean_squared_scattering_factor, AtomicModel};

/// s² 加权的累积积分
fn weighted_cumulative(y: impl Iterator<Item = f64>, vects: &[f64]) -> Vec<f64> {
    let weighted: Vec<f64> = y.zip(vects).map(|(y, s)| y * s * s).collect();
    cumulative_trapezoid(&weighted, vects)
}

/// Ruland R 函数
pub fn r_ratio(yobs: &[f64], ycryst: &[f64], vects: &[f64]) -> Vec<f64> {
    let observed = weighted_cumulative(yobs.iter().copied(), vects);
    let crystalline = weighted_cumulative(ycryst.iter().copied(), vects);

    observed
        .iter()
        .zip(crystalline.iter())
        .map(|(o, c)| o / c)
        .collect()
}

/// Vonk T 函数
pub fn t_ratio(atoms: &[AtomicModel], yobs: &[f64], vects: &[f64], j: f64) -> Vec<f64> {
    let fsquared = mean_squared_scattering_factor(atoms, vects);
    let theory = weighted_cumulative(fsquared.iter().map(|f2| f2 + j), vects);
    let observed = weighted_cumulative(yobs.iter().copied(), vects);

    theory
        .iter()
        .zip(observed.iter())
        .map(|(t, o)| t / o)
        .collect()
}
