//! # 非线性拟合
//!
//! 为 Vonk 两阶段拟合提供带边界的参数集和两种求解器。
//!
//! ## 子模块
//! - `bounds`: 边界参数与无约束内部参数之间的变换
//! - `nelder_mead`: 无导数单纯形法（粗拟合，不给出标准误差）
//! - `least_squares`: Levenberg-Marquardt 最小二乘（精修，给出标准误差）
//!
//! ## 拟合策略
//! `TwoPassFit` 先用粗拟合摆脱不良初值，再以粗拟合结果为初值、沿用相同边界做精修。
//!
//! ## 依赖关系
//! - 被 `xrd/vonk.rs` 调用
//! - 使用 `nalgebra` 求解法方程和协方差矩阵

pub mod bounds;
pub mod least_squares;
pub mod nelder_mead;

pub use bounds::Bounds;
pub use least_squares::LeastSquares;
pub use nelder_mead::NelderMead;

use std::cell::Cell;
use thiserror::Error;

/// 求解器错误
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MinimizeError {
    #[error("no parameters to fit")]
    NoParameters,

    #[error("residual function returned no values")]
    EmptyResidual,

    #[error("{method}: residual is not finite at the starting point")]
    NonFiniteStart { method: &'static str },

    #[error("{method}: Jacobian contains non-finite values")]
    NonFiniteJacobian { method: &'static str },

    #[error("{method}: parameter '{name}' became non-finite")]
    NonFiniteParameter { method: &'static str, name: String },

    #[error("{method}: no convergence within {max_nfev} function evaluations")]
    MaxEvaluations {
        method: &'static str,
        max_nfev: usize,
    },

    #[error("{method}: covariance matrix is singular, standard errors undefined")]
    SingularCovariance { method: &'static str },
}

/// 拟合参数
#[derive(Debug, Clone, PartialEq)]
pub struct FitParameter {
    pub name: String,
    pub value: f64,
    pub min: Option<f64>,
    pub max: Option<f64>,
    /// 标准误差，仅在最小二乘精修后存在
    pub stderr: Option<f64>,
}

impl FitParameter {
    pub fn new(name: impl Into<String>, value: f64) -> Self {
        FitParameter {
            name: name.into(),
            value,
            min: None,
            max: None,
            stderr: None,
        }
    }

    pub fn with_min(mut self, min: f64) -> Self {
        self.min = Some(min);
        self
    }

    pub fn with_max(mut self, max: f64) -> Self {
        self.max = Some(max);
        self
    }

    pub fn bounds(&self) -> Bounds {
        Bounds::new(self.min, self.max)
    }
}

/// 有序的具名参数集
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FitParameters {
    params: Vec<FitParameter>,
}

impl FitParameters {
    pub fn new() -> Self {
        Self::default()
    }

    /// 追加参数（同名参数会被替换）
    pub fn with(mut self, param: FitParameter) -> Self {
        match self.params.iter_mut().find(|p| p.name == param.name) {
            Some(existing) => *existing = param,
            None => self.params.push(param),
        }
        self
    }

    pub fn get(&self, name: &str) -> Option<&FitParameter> {
        self.params.iter().find(|p| p.name == name)
    }

    pub fn value(&self, name: &str) -> Option<f64> {
        self.get(name).map(|p| p.value)
    }

    pub fn stderr(&self, name: &str) -> Option<f64> {
        self.get(name).and_then(|p| p.stderr)
    }

    pub fn values(&self) -> Vec<f64> {
        self.params.iter().map(|p| p.value).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &FitParameter> {
        self.params.iter()
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    /// 以另一参数集的值为初值，保留自身边界，清除标准误差
    pub fn reseeded_from(&self, other: &FitParameters) -> FitParameters {
        let params = self
            .params
            .iter()
            .map(|p| FitParameter {
                value: other.value(&p.name).unwrap_or(p.value),
                stderr: None,
                ..p.clone()
            })
            .collect();
        FitParameters { params }
    }

    /// 以新的值（和可选标准误差）构造参数集
    pub(crate) fn updated(&self, values: &[f64], stderr: Option<&[f64]>) -> FitParameters {
        let params = self
            .params
            .iter()
            .enumerate()
            .map(|(i, p)| FitParameter {
                value: values[i],
                stderr: stderr.map(|e| e[i]),
                ..p.clone()
            })
            .collect();
        FitParameters { params }
    }

    fn bounds(&self) -> Vec<Bounds> {
        self.params.iter().map(FitParameter::bounds).collect()
    }

    fn non_finite(&self, values: &[f64]) -> Option<String> {
        self.params
            .iter()
            .zip(values)
            .find(|(_, v)| !v.is_finite())
            .map(|(p, _)| p.name.clone())
    }
}

/// 单次拟合结果
#[derive(Debug, Clone, PartialEq)]
pub struct FitResult {
    pub params: FitParameters,
    /// 残差平方和
    pub chisqr: f64,
    /// 残差函数调用次数
    pub nfev: usize,
    /// 残差个数
    pub ndata: usize,
    pub converged: bool,
    pub method: &'static str,
}

impl FitResult {
    /// 约化卡方
    pub fn redchi(&self) -> f64 {
        let nfree = self.ndata.saturating_sub(self.params.len());
        if nfree == 0 {
            self.chisqr
        } else {
            self.chisqr / nfree as f64
        }
    }
}

/// 最小化器接口
///
/// `residual` 接收外部（带边界）参数值，顺序与 `params` 一致。
pub trait Minimizer {
    fn name(&self) -> &'static str;

    fn minimize(
        &self,
        residual: &dyn Fn(&[f64]) -> Vec<f64>,
        params: &FitParameters,
    ) -> Result<FitResult, MinimizeError>;
}

/// 两遍拟合结果
#[derive(Debug, Clone, PartialEq)]
pub struct TwoPassResult {
    pub coarse: FitResult,
    pub refined: FitResult,
}

/// 两遍拟合策略：粗拟合 -> 精修
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TwoPassFit<C, R> {
    pub coarse: C,
    pub refine: R,
}

impl<C: Minimizer, R: Minimizer> TwoPassFit<C, R> {
    pub fn new(coarse: C, refine: R) -> Self {
        Self { coarse, refine }
    }

    pub fn fit(
        &self,
        residual: &dyn Fn(&[f64]) -> Vec<f64>,
        params: &FitParameters,
    ) -> Result<TwoPassResult, MinimizeError> {
        let coarse = self.coarse.minimize(residual, params)?;
        log::debug!(
            "{} pass: chi² = {:.6e} after {} evaluations",
            coarse.method,
            coarse.chisqr,
            coarse.nfev
        );

        let reseeded = params.reseeded_from(&coarse.params);
        let refined = self.refine.minimize(residual, &reseeded)?;
        log::debug!(
            "{} pass: chi² = {:.6e} after {} evaluations",
            refined.method,
            refined.chisqr,
            refined.nfev
        );

        Ok(TwoPassResult { coarse, refined })
    }
}

impl<C: Minimizer, R: Minimizer> Minimizer for TwoPassFit<C, R> {
    fn name(&self) -> &'static str {
        self.refine.name()
    }

    fn minimize(
        &self,
        residual: &dyn Fn(&[f64]) -> Vec<f64>,
        params: &FitParameters,
    ) -> Result<FitResult, MinimizeError> {
        self.fit(residual, params).map(|result| result.refined)
    }
}

/// 默认的最大函数调用次数
pub(crate) fn default_max_nfev(nparams: usize) -> usize {
    2000 * (nparams + 1)
}

/// 残差平方和
pub(crate) fn chi_square(residual: &[f64]) -> f64 {
    residual.iter().map(|r| r * r).sum()
}

/// 在内部（无约束）空间上包装残差函数，并统计调用次数
pub(crate) struct BoundedProblem<'a> {
    residual: &'a dyn Fn(&[f64]) -> Vec<f64>,
    params: &'a FitParameters,
    bounds: Vec<Bounds>,
    nfev: Cell<usize>,
}

impl<'a> BoundedProblem<'a> {
    pub(crate) fn new(
        residual: &'a dyn Fn(&[f64]) -> Vec<f64>,
        params: &'a FitParameters,
    ) -> Self {
        Self {
            residual,
            params,
            bounds: params.bounds(),
            nfev: Cell::new(0),
        }
    }

    pub(crate) fn bounds(&self) -> &[Bounds] {
        &self.bounds
    }

    pub(crate) fn initial_internal(&self) -> Vec<f64> {
        self.params
            .iter()
            .zip(&self.bounds)
            .map(|(p, b)| b.to_internal(p.value))
            .collect()
    }

    pub(crate) fn to_external(&self, internal: &[f64]) -> Vec<f64> {
        internal
            .iter()
            .zip(&self.bounds)
            .map(|(&u, b)| b.to_external(u))
            .collect()
    }

    pub(crate) fn residual_external(&self, external: &[f64]) -> Vec<f64> {
        self.nfev.set(self.nfev.get() + 1);
        (self.residual)(external)
    }

    pub(crate) fn residual_internal(&self, internal: &[f64]) -> Vec<f64> {
        self.residual_external(&self.to_external(internal))
    }

    pub(crate) fn nfev(&self) -> usize {
        self.nfev.get()
    }

    /// 检查外部参数是否有限，返回第一个非有限参数名
    pub(crate) fn non_finite_parameter(&self, external: &[f64]) -> Option<String> {
        self.params.non_finite(external)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quadratic_params() -> FitParameters {
        FitParameters::new()
            .with(FitParameter::new("C0", 1.0).with_min(1.0))
            .with(FitParameter::new("C1", 0.0).with_min(0.0))
            .with(FitParameter::new("C2", 0.0).with_min(0.0))
    }

    #[test]
    fn test_parameter_lookup() {
        let params = quadratic_params();
        assert_eq!(params.len(), 3);
        assert_eq!(params.value("C1"), Some(0.0));
        assert_eq!(params.get("C0").unwrap().min, Some(1.0));
        assert!(params.get("J").is_none());
        assert!(params.stderr("C0").is_none());
    }

    #[test]
    fn test_with_replaces_same_name() {
        let params = quadratic_params().with(FitParameter::new("C1", 5.0));
        assert_eq!(params.len(), 3);
        assert_eq!(params.value("C1"), Some(5.0));
        assert_eq!(params.get("C1").unwrap().min, None);
    }

    #[test]
    fn test_reseed_keeps_bounds() {
        let initial = quadratic_params();
        let coarse = initial.updated(&[1.4, 0.9, 0.05], Some(&[0.1, 0.1, 0.1]));
        let reseeded = initial.reseeded_from(&coarse);

        assert_eq!(reseeded.values(), vec![1.4, 0.9, 0.05]);
        assert_eq!(reseeded.get("C0").unwrap().min, Some(1.0));
        assert!(reseeded.iter().all(|p| p.stderr.is_none()));
    }

    /// 线性模型 y = a + b·x 的残差
    fn line_data() -> (Vec<f64>, Vec<f64>) {
        let x: Vec<f64> = (0..20).map(|i| i as f64 * 0.5).collect();
        let y: Vec<f64> = x.iter().map(|x| 2.0 + 0.75 * x).collect();
        (x, y)
    }

    #[test]
    fn test_two_pass_recovers_quadratic() {
        let x: Vec<f64> = (0..40).map(|i| 4.0 + 0.1 * i as f64).collect();
        let y: Vec<f64> = x
            .iter()
            .map(|s| 1.5 + 0.8 * s * s + 0.02 * s.powi(4))
            .collect();
        let residual = |p: &[f64]| -> Vec<f64> {
            x.iter()
                .zip(&y)
                .map(|(s, y)| y - (p[0] + p[1] * s * s + p[2] * s.powi(4)))
                .collect()
        };

        let strategy = TwoPassFit::new(NelderMead::default(), LeastSquares::default());
        let result = strategy.fit(&residual, &quadratic_params()).unwrap();

        assert!(result.coarse.params.iter().all(|p| p.stderr.is_none()));
        let refined = &result.refined.params;
        assert!((refined.value("C0").unwrap() - 1.5).abs() < 1e-4);
        assert!((refined.value("C1").unwrap() - 0.8).abs() < 1e-5);
        assert!((refined.value("C2").unwrap() - 0.02).abs() < 1e-6);
        assert!(refined.iter().all(|p| p.stderr.is_some()));
    }

    #[test]
    fn test_minimizers_share_interface() {
        let (x, y) = line_data();
        let residual = |p: &[f64]| -> Vec<f64> {
            x.iter().zip(&y).map(|(x, y)| y - (p[0] + p[1] * x)).collect()
        };
        let params = FitParameters::new()
            .with(FitParameter::new("a", 0.0))
            .with(FitParameter::new("b", 0.0));

        let solvers: Vec<Box<dyn Minimizer>> = vec![
            Box::new(NelderMead::default()),
            Box::new(LeastSquares::default()),
        ];
        for solver in &solvers {
            let result = solver.minimize(&residual, &params).unwrap();
            assert!(result.converged, "{} did not converge", solver.name());
            assert!((result.params.value("a").unwrap() - 2.0).abs() < 1e-2);
            assert!((result.params.value("b").unwrap() - 0.75).abs() < 1e-2);
        }
    }

    #[test]
    fn test_redchi() {
        let result = FitResult {
            params: quadratic_params(),
            chisqr: 6.0,
            nfev: 10,
            ndata: 5,
            converged: true,
            method: "least_squares",
        };
        assert!((result.redchi() - 3.0).abs() < 1e-12);
    }
}
