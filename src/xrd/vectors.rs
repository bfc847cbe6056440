//! # 散射矢量变换
//!
//! 将衍射角 2θ（度）与波长（nm）换算为散射矢量 s = 2 sin(θ)/λ（nm⁻¹）。
//!
//! ## 依赖关系
//! - 被 `xrd/vonk.rs` 调用
//! - 无外部模块依赖

/// 计算散射矢量序列
///
/// 波长不做校验，NaN 或负值按数值规则直接传播。
pub fn scattering_vectors(two_theta_deg: &[f64], wavelength_nm: f64) -> Vec<f64> {
    two_theta_deg
        .iter()
        .map(|&two_theta| scattering_vector(two_theta, wavelength_nm))
        .collect()
}

/// 单点散射矢量
pub fn scattering_vector(two_theta_deg: f64, wavelength_nm: f64) -> f64 {
    2.0 * (two_theta_deg / 2.0).to_radians().sin() / wavelength_nm
}

/// 选出 `vects[i + 1] > cutoff` 的下标 `i`
///
/// R/T 函数比散射矢量少一个点，下标按平移一位后的序列选取。
pub fn select_above_cutoff(vects: &[f64], cutoff: f64) -> Vec<usize> {
    vects
        .iter()
        .skip(1)
        .enumerate()
        .filter(|&(_, &s)| s > cutoff)
        .map(|(i, _)| i)
        .collect()
}
