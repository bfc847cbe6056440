//! # Levenberg-Marquardt 最小二乘
//!
//! 在内部（无约束）参数空间迭代求解阻尼法方程
//! `(JᵀJ + λ·diag(JᵀJ)) δ = -Jᵀr`，收敛后在外部参数空间计算协方差矩阵
//! `cov = (JᵀJ)⁻¹ · χ² / (m - n)`，其对角线平方根即标准误差。
//!
//! ## 依赖关系
//! - 被 `xrd/fit/mod.rs` 的 `TwoPassFit` 使用
//! - 使用 `nalgebra` 的 Cholesky 分解和矩阵求逆

use super::{
    chi_square, default_max_nfev, BoundedProblem, FitParameters, FitResult, MinimizeError,
    Minimizer,
};
use nalgebra::{DMatrix, DVector};

const METHOD: &str = "least_squares";

const LAMBDA_INIT: f64 = 1e-3;
const LAMBDA_FACTOR: f64 = 10.0;
const LAMBDA_MAX: f64 = 1e16;
const MIN_DIAGONAL: f64 = 1e-12;

/// Levenberg-Marquardt 求解器
#[derive(Debug, Clone, PartialEq)]
pub struct LeastSquares {
    /// 残差平方和相对下降量阈值
    pub ftol: f64,
    /// 参数步长相对阈值
    pub xtol: f64,
    /// 残差与 Jacobian 各列夹角余弦的阈值
    pub gtol: f64,
    /// 最大函数调用次数，`None` 时为 2000·(n+1)
    pub max_nfev: Option<usize>,
}

impl Default for LeastSquares {
    fn default() -> Self {
        Self {
            ftol: 1e-10,
            xtol: 1e-10,
            gtol: 1e-10,
            max_nfev: None,
        }
    }
}

impl LeastSquares {
    pub fn with_max_nfev(mut self, max_nfev: usize) -> Self {
        self.max_nfev = Some(max_nfev);
        self
    }
}

/// 前向差分 Jacobian（m × n）
fn jacobian<F>(f: F, x: &[f64], r0: &[f64], step_sign: &[f64]) -> Option<DMatrix<f64>>
where
    F: Fn(&[f64]) -> Vec<f64>,
{
    let m = r0.len();
    let n = x.len();
    let mut jac = DMatrix::zeros(m, n);
    let mut xp = x.to_vec();
    for j in 0..n {
        let h = step_sign[j] * f64::EPSILON.sqrt() * x[j].abs().max(1.0);
        xp[j] = x[j] + h;
        let rp = f(&xp);
        xp[j] = x[j];
        if rp.len() != m {
            return None;
        }
        for i in 0..m {
            let d = (rp[i] - r0[i]) / h;
            if !d.is_finite() {
                return None;
            }
            jac[(i, j)] = d;
        }
    }
    Some(jac)
}

/// 梯度收敛判据：max_j |Jⱼ·r| / (‖Jⱼ‖·‖r‖)
fn gradient_cosine(jac: &DMatrix<f64>, r: &DVector<f64>, g: &DVector<f64>) -> f64 {
    let rnorm = r.norm();
    if rnorm == 0.0 {
        return 0.0;
    }
    (0..jac.ncols())
        .filter_map(|j| {
            let cnorm = jac.column(j).norm();
            (cnorm > 0.0).then(|| g[j].abs() / (cnorm * rnorm))
        })
        .fold(0.0, f64::max)
}

impl LeastSquares {
    /// 在最优外部参数处计算标准误差
    fn standard_errors(
        &self,
        problem: &BoundedProblem,
        best: &[f64],
        residual: &[f64],
        chisqr: f64,
    ) -> Result<Option<Vec<f64>>, MinimizeError> {
        let m = residual.len();
        let n = best.len();
        if m <= n {
            return Ok(None);
        }

        // 落在上界的参数向内取差分步长
        let step_sign: Vec<f64> = problem
            .bounds()
            .iter()
            .zip(best)
            .map(|(b, &x)| match b.max {
                Some(max) if x + f64::EPSILON.sqrt() * x.abs().max(1.0) > max => -1.0,
                _ => 1.0,
            })
            .collect();

        let jac = jacobian(|x| problem.residual_external(x), best, residual, &step_sign)
            .ok_or(MinimizeError::NonFiniteJacobian { method: METHOD })?;
        let alpha = jac.transpose() * &jac;
        let inverse = alpha
            .try_inverse()
            .ok_or(MinimizeError::SingularCovariance { method: METHOD })?;

        let scale = chisqr / (m - n) as f64;
        let stderr: Vec<f64> = (0..n)
            .map(|j| (inverse[(j, j)] * scale).max(0.0).sqrt())
            .collect();
        if stderr.iter().any(|e| !e.is_finite()) {
            return Err(MinimizeError::SingularCovariance { method: METHOD });
        }
        Ok(Some(stderr))
    }
}

impl Minimizer for LeastSquares {
    fn name(&self) -> &'static str {
        METHOD
    }

    fn minimize(
        &self,
        residual: &dyn Fn(&[f64]) -> Vec<f64>,
        params: &FitParameters,
    ) -> Result<FitResult, MinimizeError> {
        let n = params.len();
        if n == 0 {
            return Err(MinimizeError::NoParameters);
        }

        let problem = BoundedProblem::new(residual, params);
        let max_nfev = self.max_nfev.unwrap_or_else(|| default_max_nfev(n));
        let exhausted = || MinimizeError::MaxEvaluations {
            method: METHOD,
            max_nfev,
        };

        let mut u = problem.initial_internal();
        let mut r = problem.residual_internal(&u);
        if r.is_empty() {
            return Err(MinimizeError::EmptyResidual);
        }
        let ndata = r.len();
        let mut chisqr = chi_square(&r);
        if !chisqr.is_finite() {
            return Err(MinimizeError::NonFiniteStart { method: METHOD });
        }

        let forward = vec![1.0; n];
        let mut lambda = LAMBDA_INIT;

        'outer: loop {
            if chisqr == 0.0 {
                break;
            }
            if problem.nfev() + n > max_nfev {
                return Err(exhausted());
            }

            let jac = jacobian(|x| problem.residual_internal(x), &u, &r, &forward)
                .ok_or(MinimizeError::NonFiniteJacobian { method: METHOD })?;
            let rv = DVector::from_column_slice(&r);
            let jt = jac.transpose();
            let alpha = &jt * &jac;
            let g = &jt * &rv;

            if gradient_cosine(&jac, &rv, &g) <= self.gtol {
                break;
            }

            loop {
                if lambda > LAMBDA_MAX {
                    log::debug!("damping saturated, no further descent from chi² = {:.6e}", chisqr);
                    break 'outer;
                }

                let mut damped = alpha.clone();
                for j in 0..n {
                    damped[(j, j)] += lambda * alpha[(j, j)].max(MIN_DIAGONAL);
                }
                let Some(delta) = damped.cholesky().map(|c| c.solve(&(-&g))) else {
                    lambda *= LAMBDA_FACTOR;
                    continue;
                };

                if problem.nfev() >= max_nfev {
                    return Err(exhausted());
                }
                let trial: Vec<f64> = u.iter().zip(delta.iter()).map(|(x, d)| x + d).collect();
                let r_trial = problem.residual_internal(&trial);
                let chi_trial = chi_square(&r_trial);

                if chi_trial.is_finite() && chi_trial < chisqr {
                    let reduction = (chisqr - chi_trial) / chisqr;
                    let unorm = u.iter().map(|x| x * x).sum::<f64>().sqrt();
                    let small_step = delta.norm() <= self.xtol * (self.xtol + unorm);

                    u = trial;
                    r = r_trial;
                    chisqr = chi_trial;
                    lambda = (lambda / LAMBDA_FACTOR).max(f64::MIN_POSITIVE);

                    if reduction <= self.ftol || small_step {
                        break 'outer;
                    }
                    break;
                }
                lambda *= LAMBDA_FACTOR;
            }
        }

        let best = problem.to_external(&u);
        if let Some(name) = problem.non_finite_parameter(&best) {
            return Err(MinimizeError::NonFiniteParameter {
                method: METHOD,
                name,
            });
        }
        let stderr = self.standard_errors(&problem, &best, &r, chisqr)?;

        Ok(FitResult {
            params: params.updated(&best, stderr.as_deref()),
            chisqr,
            nfev: problem.nfev(),
            ndata,
            converged: true,
            method: METHOD,
        })
    }
}
