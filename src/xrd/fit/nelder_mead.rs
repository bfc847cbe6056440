//! # Nelder-Mead 单纯形法
//!
//! 在内部（无约束）参数空间最小化残差平方和，不需要导数。
//! 用作两遍拟合的第一遍：参数初值落在边界上时梯度为零，单纯形仍能移动。
//!
//! ## 依赖关系
//! - 被 `xrd/fit/mod.rs` 的 `TwoPassFit` 使用
//! - 使用 `BoundedProblem` 处理边界

use super::{
    chi_square, default_max_nfev, BoundedProblem, FitParameters, FitResult, MinimizeError,
    Minimizer,
};

const METHOD: &str = "nelder";

// 反射、扩张、收缩、缩小系数
const RHO: f64 = 1.0;
const CHI: f64 = 2.0;
const PSI: f64 = 0.5;
const SIGMA: f64 = 0.5;

// 初始单纯形的相对步长，以及零初值时的绝对步长
const NONZERO_DELTA: f64 = 0.05;
const ZERO_DELTA: f64 = 0.00025;

/// Nelder-Mead 求解器
#[derive(Debug, Clone, PartialEq)]
pub struct NelderMead {
    /// 单纯形顶点间最大坐标差的收敛阈值
    pub xatol: f64,
    /// 单纯形顶点间最大目标函数差的收敛阈值
    pub fatol: f64,
    /// 最大函数调用次数，`None` 时为 2000·(n+1)
    pub max_nfev: Option<usize>,
}

impl Default for NelderMead {
    fn default() -> Self {
        Self {
            xatol: 1e-4,
            fatol: 1e-4,
            max_nfev: None,
        }
    }
}

impl NelderMead {
    pub fn with_tolerance(mut self, xatol: f64, fatol: f64) -> Self {
        self.xatol = xatol;
        self.fatol = fatol;
        self
    }

    pub fn with_max_nfev(mut self, max_nfev: usize) -> Self {
        self.max_nfev = Some(max_nfev);
        self
    }
}

/// 目标函数：残差平方和，非有限值视为 +∞
fn objective(problem: &BoundedProblem, internal: &[f64]) -> f64 {
    let chisqr = chi_square(&problem.residual_internal(internal));
    if chisqr.is_finite() {
        chisqr
    } else {
        f64::INFINITY
    }
}

/// 按目标函数值升序排列顶点
fn sort_simplex(simplex: &mut Vec<Vec<f64>>, fsim: &mut Vec<f64>) {
    let mut order: Vec<usize> = (0..fsim.len()).collect();
    order.sort_by(|&a, &b| fsim[a].total_cmp(&fsim[b]));
    *simplex = order.iter().map(|&i| simplex[i].clone()).collect();
    *fsim = order.iter().map(|&i| fsim[i]).collect();
}

/// 沿 `xbar` 到最差顶点方向的线性组合：(1 + t)·xbar - t·worst
fn along(xbar: &[f64], worst: &[f64], t: f64) -> Vec<f64> {
    xbar.iter()
        .zip(worst)
        .map(|(b, w)| (1.0 + t) * b - t * w)
        .collect()
}

impl Minimizer for NelderMead {
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

        let x0 = problem.initial_internal();
        let r0 = problem.residual_internal(&x0);
        if r0.is_empty() {
            return Err(MinimizeError::EmptyResidual);
        }
        let ndata = r0.len();
        let f0 = chi_square(&r0);
        if !f0.is_finite() {
            return Err(MinimizeError::NonFiniteStart { method: METHOD });
        }

        let mut simplex = vec![x0.clone()];
        let mut fsim = vec![f0];
        for k in 0..n {
            let mut vertex = x0.clone();
            vertex[k] = if vertex[k] != 0.0 {
                (1.0 + NONZERO_DELTA) * vertex[k]
            } else {
                ZERO_DELTA
            };
            fsim.push(objective(&problem, &vertex));
            simplex.push(vertex);
        }
        sort_simplex(&mut simplex, &mut fsim);

        let mut converged = false;
        while problem.nfev() < max_nfev {
            let xspread = simplex[1..]
                .iter()
                .flat_map(|v| v.iter().zip(&simplex[0]).map(|(a, b)| (a - b).abs()))
                .fold(0.0_f64, f64::max);
            let fspread = fsim[1..]
                .iter()
                .map(|f| (f - fsim[0]).abs())
                .fold(0.0_f64, f64::max);
            if xspread <= self.xatol && fspread <= self.fatol {
                converged = true;
                break;
            }

            let mut xbar = vec![0.0; n];
            for vertex in &simplex[..n] {
                for (b, v) in xbar.iter_mut().zip(vertex) {
                    *b += v / n as f64;
                }
            }

            let worst = simplex[n].clone();
            let xr = along(&xbar, &worst, RHO);
            let fxr = objective(&problem, &xr);
            let mut shrink = false;

            if fxr < fsim[0] {
                let xe = along(&xbar, &worst, RHO * CHI);
                let fxe = objective(&problem, &xe);
                if fxe < fxr {
                    simplex[n] = xe;
                    fsim[n] = fxe;
                } else {
                    simplex[n] = xr;
                    fsim[n] = fxr;
                }
            } else if fxr < fsim[n - 1] {
                simplex[n] = xr;
                fsim[n] = fxr;
            } else if fxr < fsim[n] {
                // 外收缩
                let xc = along(&xbar, &worst, PSI * RHO);
                let fxc = objective(&problem, &xc);
                if fxc <= fxr {
                    simplex[n] = xc;
                    fsim[n] = fxc;
                } else {
                    shrink = true;
                }
            } else {
                // 内收缩
                let xcc = along(&xbar, &worst, -PSI);
                let fxcc = objective(&problem, &xcc);
                if fxcc < fsim[n] {
                    simplex[n] = xcc;
                    fsim[n] = fxcc;
                } else {
                    shrink = true;
                }
            }

            if shrink {
                let best = simplex[0].clone();
                for j in 1..=n {
                    simplex[j] = simplex[j]
                        .iter()
                        .zip(&best)
                        .map(|(v, b)| b + SIGMA * (v - b))
                        .collect();
                    fsim[j] = objective(&problem, &simplex[j]);
                }
            }

            sort_simplex(&mut simplex, &mut fsim);
        }

        if !converged {
            log::warn!(
                "Nelder-Mead stopped after {} evaluations without meeting tolerance (chi² = {:.6e})",
                problem.nfev(),
                fsim[0]
            );
        }

        let best = problem.to_external(&simplex[0]);
        if let Some(name) = problem.non_finite_parameter(&best) {
            return Err(MinimizeError::NonFiniteParameter {
                method: METHOD,
                name,
            });
        }

        Ok(FitResult {
            params: params.updated(&best, None),
            chisqr: fsim[0],
            nfev: problem.nfev(),
            ndata,
            converged,
            method: METHOD,
        })
    }
}
