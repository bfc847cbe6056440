//! # Vonk 模型函数
//!
//! - 线性形式：R ≈ 1/fc + (k / 2fc)·s²（备用模型，默认流程不使用）
//! - 偶次多项式：R ≈ C0 + C1·s² + C2·s⁴（对 R 函数拟合的目标）
//!
//! ## 依赖关系
//! - 被 `xrd/vonk.rs` 和 `xrd/plot.rs` 调用

/// Vonk 线性模型（单点）
pub fn vonk_linear_at(s: f64, fc: f64, k: f64) -> f64 {
    1.0 / fc + (k / (2.0 * fc)) * s * s
}

/// Vonk 线性模型
pub fn vonk_linear(vects: &[f64], fc: f64, k: f64) -> Vec<f64> {
    vects.iter().map(|&s| vonk_linear_at(s, fc, k)).collect()
}

/// 二次（s² 的）多项式模型（单点）
pub fn vonk_polynomial_at(s: f64, c0: f64, c1: f64, c2: f64) -> f64 {
    let s2 = s * s;
    c0 + c1 * s2 + c2 * s2 * s2
}

/// 二次（s² 的）多项式模型
pub fn vonk_polynomial(vects: &[f64], c0: f64, c1: f64, c2: f64) -> Vec<f64> {
    vects
        .iter()
        .map(|&s| vonk_polynomial_at(s, c0, c1, c2))
        .collect()
}
