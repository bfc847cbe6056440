//! # 累积数值积分
//!
//! 累积梯形积分，输出长度比输入少一（首点无定义）。
//!
//! ## 依赖关系
//! - 被 `xrd/ratio.rs` 调用

/// 累积梯形积分 ∫ y dx，第 `i` 个元素为从 `x[0]` 积分到 `x[i + 1]`
///
/// `y` 与 `x` 必须等长；长度不足 2 时返回空序列。
pub fn cumulative_trapezoid(y: &[f64], x: &[f64]) -> Vec<f64> {
    debug_assert_eq!(y.len(), x.len());

    let mut total = 0.0;
    y.windows(2)
        .zip(x.windows(2))
        .map(|(yw, xw)| {
            total += 0.5 * (yw[0] + yw[1]) * (xw[1] - xw[0]);
            total
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constant_integrand() {
        let x = [0.0, 0.5, 1.5, 3.0];
        let y = [2.0; 4];
        let integral = cumulative_trapezoid(&y, &x);
        assert_eq!(integral.len(), 3);
        assert!((integral[0] - 1.0).abs() < 1e-12);
        assert!((integral[1] - 3.0).abs() < 1e-12);
        assert!((integral[2] - 6.0).abs() < 1e-12);
    }

    #[test]
    fn test_linear_integrand_is_exact() {
        let x: Vec<f64> = (0..=10).map(|i| i as f64 * 0.1).collect();
        let y: Vec<f64> = x.iter().map(|v| 3.0 * v).collect();
        let integral = cumulative_trapezoid(&y, &x);
        assert!((integral.last().unwrap() - 1.5).abs() < 1e-12);
    }

    #[test]
    fn test_short_input() {
        assert!(cumulative_trapezoid(&[1.0], &[0.0]).is_empty());
        assert!(cumulative_trapezoid(&[], &[]).is_empty());
    }
}
