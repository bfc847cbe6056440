//! # Vonk/Ruland 两阶段拟合
//!
//! 由广角 X 射线衍射强度计算结晶相关参数：
//! - `fc`：结晶度相关的尺寸因子（无量纲，0 < fc ≤ 1）
//! - `k`：晶格畸变参数（nm²）
//! - `J`：非相干散射修正（无量纲）
//!
//! ## 流程
//! 1. 2θ -> 散射矢量 s = 2 sin(θ)/λ (nm⁻¹)
//! 2. 阶段 A：在 s > 6 nm⁻¹ 区间拟合 J，使 T 函数趋于常数（锚点），
//!    观测强度整体减去 J/锚点
//! 3. 阶段 B：在 s > 4 nm⁻¹ 区间用 C0 + C1·s² + C2·s⁴ 拟合 R 函数，
//!    先 Nelder-Mead 粗拟合，再最小二乘精修得到标准误差
//! 4. fc = 1/C0，k = 2·fc·sqrt(C1² + C2)，一阶误差传递
//!
//! 选区规则：下标 i 入选当且仅当 s[i+1] 超过截断值；
//! 阶段 A 子集取 yobs[i], s[i]；阶段 B 的 R[i] 同样与 s[i] 配对。
//!
//! ## 依赖关系
//! - 被 `commands/fit.rs`、`commands/batch.rs` 调用
//! - 使用 `xrd/{vectors, scattering, ratio, model, fit, uncertainty}`
//! - 可选调用 `xrd/plot.rs` 输出诊断图

use crate::error::{FitStage, Result, VonkError};
use crate::xrd::fit::{
    FitParameter, FitParameters, FitResult, LeastSquares, Minimizer, NelderMead, TwoPassFit,
};
use crate::xrd::model::vonk_polynomial_at;
use crate::xrd::plot;
use crate::xrd::ratio::{r_ratio, t_ratio};
use crate::xrd::scattering::{resolve_species, AtomSpecies, AtomicModel, FormFactorArgument};
use crate::xrd::uncertainty::{UncertainQuantity, Unit};
use crate::xrd::vectors::{scattering_vectors, select_above_cutoff};

use serde::{Deserialize, Serialize};
use std::path::Path;

/// 阶段 A 的散射矢量截断值 (nm⁻¹)
pub const INCOHERENT_CUTOFF: f64 = 6.0;

/// 阶段 B 的散射矢量截断值 (nm⁻¹)
pub const RULAND_CUTOFF: f64 = 4.0;

/// 每个选区的最少点数
pub const MIN_SELECTED_POINTS: usize = 5;

/// J 的初值
pub const INITIAL_J: f64 = 1.0;

/// 分析配置
#[derive(Debug, Clone, PartialEq)]
pub struct VonkConfig {
    pub incoherent_cutoff: f64,
    pub ruland_cutoff: f64,
    pub min_selected_points: usize,
    pub initial_j: f64,
    /// 散射因子自变量的换算约定
    pub form_factor_argument: FormFactorArgument,
    /// 阶段 B 粗拟合
    pub coarse: NelderMead,
    /// 阶段 A 拟合与阶段 B 精修
    pub refine: LeastSquares,
}

impl Default for VonkConfig {
    fn default() -> Self {
        Self {
            incoherent_cutoff: INCOHERENT_CUTOFF,
            ruland_cutoff: RULAND_CUTOFF,
            min_selected_points: MIN_SELECTED_POINTS,
            initial_j: INITIAL_J,
            form_factor_argument: FormFactorArgument::default(),
            coarse: NelderMead::default(),
            refine: LeastSquares::default(),
        }
    }
}

impl VonkConfig {
    pub fn with_incoherent_cutoff(mut self, cutoff: f64) -> Self {
        self.incoherent_cutoff = cutoff;
        self
    }

    pub fn with_ruland_cutoff(mut self, cutoff: f64) -> Self {
        self.ruland_cutoff = cutoff;
        self
    }

    pub fn with_min_selected_points(mut self, points: usize) -> Self {
        self.min_selected_points = points;
        self
    }

    pub fn with_initial_j(mut self, j: f64) -> Self {
        self.initial_j = j;
        self
    }

    pub fn with_form_factor_argument(mut self, argument: FormFactorArgument) -> Self {
        self.form_factor_argument = argument;
        self
    }

    pub fn with_coarse(mut self, coarse: NelderMead) -> Self {
        self.coarse = coarse;
        self
    }

    pub fn with_refine(mut self, refine: LeastSquares) -> Self {
        self.refine = refine;
        self
    }

    /// 同时设置两个求解器的最大函数调用次数
    pub fn with_max_nfev(mut self, max_nfev: usize) -> Self {
        self.coarse = self.coarse.with_max_nfev(max_nfev);
        self.refine = self.refine.with_max_nfev(max_nfev);
        self
    }
}

/// 阶段 A 结果
#[derive(Debug, Clone, PartialEq)]
pub struct IncoherentFit {
    pub result: FitResult,
    pub j: UncertainQuantity,
    /// T 函数在最优 J 处的末值
    pub anchor: f64,
    /// 从观测强度中减去的常数 J/anchor
    pub correction: f64,
    pub selection: Vec<usize>,
}

/// 阶段 B 结果
#[derive(Debug, Clone, PartialEq)]
pub struct RulandFit {
    pub coarse: FitResult,
    pub refined: FitResult,
    pub selection: Vec<usize>,
}

impl RulandFit {
    fn coefficient(&self, name: &str, unit: Unit) -> UncertainQuantity {
        let param = self.refined.params.get(name);
        UncertainQuantity::new(
            param.map_or(f64::NAN, |p| p.value),
            param.and_then(|p| p.stderr).unwrap_or(f64::NAN),
            unit,
        )
    }

    /// C0（无量纲）
    pub fn c0(&self) -> UncertainQuantity {
        self.coefficient("C0", Unit::DIMENSIONLESS)
    }

    /// C1 (nm²)
    pub fn c1(&self) -> UncertainQuantity {
        self.coefficient("C1", Unit::NM2)
    }

    /// C2 (nm⁴)
    pub fn c2(&self) -> UncertainQuantity {
        self.coefficient("C2", Unit::NM4)
    }

    /// 拟合多项式在 s 处的值
    pub fn evaluate(&self, s: f64) -> f64 {
        vonk_polynomial_at(s, self.c0().value, self.c1().value, self.c2().value)
    }
}

/// 最终物理量
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct VonkParameters {
    pub fc: UncertainQuantity,
    pub k: UncertainQuantity,
    pub j: UncertainQuantity,
}

impl VonkParameters {
    /// 由多项式系数和 J 计算 fc, k
    pub fn from_coefficients(
        c0: UncertainQuantity,
        c1: UncertainQuantity,
        c2: UncertainQuantity,
        j: UncertainQuantity,
    ) -> Self {
        let fc = c0.recip();
        let k = (fc * (c1.powi(2) + c2).sqrt()) * 2.0;
        Self { fc, k, j }
    }
}

/// 完整分析结果（含中间序列）
#[derive(Debug, Clone, PartialEq)]
pub struct VonkAnalysis {
    pub atoms: Vec<AtomicModel>,
    pub vects: Vec<f64>,
    /// 扣除非相干散射后的观测强度
    pub corrected: Vec<f64>,
    pub crystalline: Vec<f64>,
    /// R 函数，长度 n - 1
    pub r_ratio: Vec<f64>,
    pub incoherent: IncoherentFit,
    pub ruland: RulandFit,
    pub parameters: VonkParameters,
}

/// 单个样品的结果汇总行
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VonkSummary {
    pub name: String,
    pub fc: f64,
    pub fc_err: f64,
    pub k_nm2: f64,
    pub k_err: f64,
    pub j: f64,
    pub j_err: f64,
    pub c0: f64,
    pub c0_err: f64,
    pub c1_nm2: f64,
    pub c1_err: f64,
    pub c2_nm4: f64,
    pub c2_err: f64,
    pub anchor: f64,
    pub incoherent_points: usize,
    pub ruland_points: usize,
    pub redchi: f64,
}

impl VonkAnalysis {
    pub fn summary(&self, name: &str) -> VonkSummary {
        let p = &self.parameters;
        let (c0, c1, c2) = (self.ruland.c0(), self.ruland.c1(), self.ruland.c2());
        VonkSummary {
            name: name.to_string(),
            fc: p.fc.value,
            fc_err: p.fc.uncertainty,
            k_nm2: p.k.value,
            k_err: p.k.uncertainty,
            j: p.j.value,
            j_err: p.j.uncertainty,
            c0: c0.value,
            c0_err: c0.uncertainty,
            c1_nm2: c1.value,
            c1_err: c1.uncertainty,
            c2_nm4: c2.value,
            c2_err: c2.uncertainty,
            anchor: self.incoherent.anchor,
            incoherent_points: self.incoherent.selection.len(),
            ruland_points: self.ruland.selection.len(),
            redchi: self.ruland.refined.redchi(),
        }
    }
}

/// Vonk/Ruland 分析器
#[derive(Debug, Clone, Default)]
pub struct VonkAnalyzer {
    config: VonkConfig,
}

impl VonkAnalyzer {
    pub fn new(config: VonkConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &VonkConfig {
        &self.config
    }

    /// 执行完整分析
    ///
    /// `atoms` 可混合未解析的元素符号和已解析的原子模型；调用方的数据不会被修改。
    pub fn analyze(
        &self,
        atoms: &[AtomSpecies],
        observed: &[f64],
        crystalline: &[f64],
        two_theta_deg: &[f64],
        wavelength_nm: f64,
    ) -> Result<VonkAnalysis> {
        validate_inputs(observed, crystalline, two_theta_deg, wavelength_nm)?;
        if atoms.is_empty() {
            return Err(VonkError::InvalidArgument(
                "at least one atomic species is required".to_string(),
            ));
        }
        let atoms: Vec<AtomicModel> = resolve_species(atoms)?
            .into_iter()
            .map(|atom| atom.with_argument(self.config.form_factor_argument))
            .collect();

        let vects = scattering_vectors(two_theta_deg, wavelength_nm);
        log::debug!(
            "{} points, s = {:.3}..{:.3} nm⁻¹",
            vects.len(),
            vects.first().copied().unwrap_or_default(),
            vects.last().copied().unwrap_or_default()
        );

        let incoherent = self.fit_incoherent(&atoms, observed, &vects)?;
        let corrected: Vec<f64> = observed
            .iter()
            .map(|y| y - incoherent.correction)
            .collect();

        let r = r_ratio(&corrected, crystalline, &vects);
        let ruland = self.fit_ruland(&r, &vects)?;

        let parameters = VonkParameters::from_coefficients(
            ruland.c0(),
            ruland.c1(),
            ruland.c2(),
            incoherent.j,
        );
        log::info!(
            "fc = {}, k = {}, J = {}",
            parameters.fc,
            parameters.k,
            parameters.j
        );

        Ok(VonkAnalysis {
            atoms,
            vects,
            corrected,
            crystalline: crystalline.to_vec(),
            r_ratio: r,
            incoherent,
            ruland,
            parameters,
        })
    }

    /// 阶段 A：非相干散射 J
    fn fit_incoherent(
        &self,
        atoms: &[AtomicModel],
        observed: &[f64],
        vects: &[f64],
    ) -> Result<IncoherentFit> {
        let cutoff = self.config.incoherent_cutoff;
        let selection = select_above_cutoff(vects, cutoff);
        self.check_selection(FitStage::Incoherent, cutoff, selection.len(), 1)?;

        let yobs: Vec<f64> = selection.iter().map(|&i| observed[i]).collect();
        let v: Vec<f64> = selection.iter().map(|&i| vects[i]).collect();

        let residual = |p: &[f64]| -> Vec<f64> {
            let t = t_ratio(atoms, &yobs, &v, p[0]);
            let last = t.last().copied().unwrap_or(f64::NAN);
            t.iter().map(|x| x - last).collect()
        };
        let params = FitParameters::new()
            .with(FitParameter::new("J", self.config.initial_j).with_min(0.0));

        let result = self
            .config
            .refine
            .minimize(&residual, &params)
            .map_err(|source| VonkError::FitConvergence {
                stage: FitStage::Incoherent,
                source,
            })?;

        let j_param = result.params.get("J");
        let j = UncertainQuantity::dimensionless(
            j_param.map_or(f64::NAN, |p| p.value),
            j_param.and_then(|p| p.stderr).unwrap_or(f64::NAN),
        );
        let anchor = t_ratio(atoms, &yobs, &v, j.value)
            .last()
            .copied()
            .unwrap_or(f64::NAN);
        let correction = j.value / anchor;

        log::info!(
            "{}: J = {} from {} points, anchor = {:.6e}, correction = {:.6e}",
            FitStage::Incoherent,
            j,
            selection.len(),
            anchor,
            correction
        );

        Ok(IncoherentFit {
            result,
            j,
            anchor,
            correction,
            selection,
        })
    }

    /// 阶段 B：R 函数多项式
    fn fit_ruland(&self, r: &[f64], vects: &[f64]) -> Result<RulandFit> {
        let cutoff = self.config.ruland_cutoff;
        let selection = select_above_cutoff(vects, cutoff);
        self.check_selection(FitStage::Ruland, cutoff, selection.len(), 3)?;

        let data: Vec<(f64, f64)> = selection.iter().map(|&i| (vects[i], r[i])).collect();
        let residual = |p: &[f64]| -> Vec<f64> {
            data.iter()
                .map(|&(s, r)| r - vonk_polynomial_at(s, p[0], p[1], p[2]))
                .collect()
        };
        let params = FitParameters::new()
            .with(FitParameter::new("C0", 1.0).with_min(1.0))
            .with(FitParameter::new("C1", 0.0).with_min(0.0))
            .with(FitParameter::new("C2", 0.0).with_min(0.0));

        let strategy = TwoPassFit::new(self.config.coarse.clone(), self.config.refine.clone());
        let fit = strategy
            .fit(&residual, &params)
            .map_err(|source| VonkError::FitConvergence {
                stage: FitStage::Ruland,
                source,
            })?;

        let ruland = RulandFit {
            coarse: fit.coarse,
            refined: fit.refined,
            selection,
        };
        log::info!(
            "{}: C0 = {}, C1 = {}, C2 = {} from {} points",
            FitStage::Ruland,
            ruland.c0(),
            ruland.c1(),
            ruland.c2(),
            ruland.selection.len()
        );
        Ok(ruland)
    }

    fn check_selection(
        &self,
        stage: FitStage,
        cutoff: f64,
        found: usize,
        nparams: usize,
    ) -> Result<()> {
        let required = self.config.min_selected_points.max(nparams + 1);
        if found < required {
            return Err(VonkError::DegenerateSelection {
                stage,
                cutoff,
                found,
                required,
            });
        }
        Ok(())
    }
}

fn validate_inputs(
    observed: &[f64],
    crystalline: &[f64],
    two_theta_deg: &[f64],
    wavelength_nm: f64,
) -> Result<()> {
    let n = two_theta_deg.len();
    if n < 2 {
        return Err(VonkError::InvalidInputShape {
            series: "two_theta".to_string(),
            expected: 2,
            found: n,
        });
    }
    for (series, values) in [("observed", observed), ("crystalline", crystalline)] {
        if values.len() != n {
            return Err(VonkError::InvalidInputShape {
                series: series.to_string(),
                expected: n,
                found: values.len(),
            });
        }
    }
    if !(wavelength_nm.is_finite() && wavelength_nm > 0.0) {
        return Err(VonkError::InvalidArgument(format!(
            "wavelength must be a positive number of nm, got {}",
            wavelength_nm
        )));
    }
    Ok(())
}

/// 以默认配置计算 fc, k, J，可选输出 `<output_name>_Vonk.png`
#[allow(clippy::too_many_arguments)]
pub fn compute_vonk_parameters(
    output_name: &str,
    atoms: &[AtomSpecies],
    observed: &[f64],
    crystalline: &[f64],
    two_theta_deg: &[f64],
    wavelength_nm: f64,
    emit_plot: bool,
) -> Result<VonkParameters> {
    let analysis =
        VonkAnalyzer::default().analyze(atoms, observed, crystalline, two_theta_deg, wavelength_nm)?;
    if emit_plot {
        let path = plot::plot_path(output_name);
        plot::generate_vonk_plot(&analysis, Path::new(&path))?;
    }
    Ok(analysis.parameters)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::xrd::integrate::cumulative_trapezoid;
    use crate::xrd::plot::VonkPlotData;
    use crate::xrd::scattering::mean_squared_scattering_factor;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use tempfile::tempdir;

    const WAVELENGTH_NM: f64 = 0.15418;
    const SCALE: f64 = 0.01;
    const TRUE_J: f64 = 0.5;
    const TRUE_FC: f64 = 0.7;
    const TRUE_C1: f64 = 1.4142;
    const TRUE_C2: f64 = 0.0408;
    /// 选区内 T 的相对噪声
    const T_NOISE: f64 = 1e-6;
    /// R 的加性噪声
    const R_NOISE: f64 = 1e-5;

    struct Synthetic {
        two_theta: Vec<f64>,
        observed: Vec<f64>,
        crystalline: Vec<f64>,
    }

    fn species() -> Vec<AtomSpecies> {
        vec![AtomSpecies::from("Si"), AtomSpecies::from("O")]
    }

    fn true_k() -> f64 {
        2.0 * TRUE_FC * (TRUE_C1 * TRUE_C1 + TRUE_C2).sqrt()
    }

    fn gaussian(rng: &mut StdRng) -> f64 {
        let u1: f64 = 1.0 - rng.gen::<f64>();
        let u2: f64 = rng.gen();
        (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos()
    }

    /// 由目标累积积分反推被积函数：`cumulative_trapezoid(w, x) == targets`
    fn unwind_trapezoid(w0: f64, targets: &[f64], x: &[f64]) -> Vec<f64> {
        let mut w = vec![w0];
        let mut previous = 0.0;
        for (k, target) in targets.iter().enumerate() {
            w.push(2.0 * (target - previous) / (x[k + 1] - x[k]) - w[k]);
            previous = *target;
        }
        w
    }

    /// 构造离散梯形积分下精确成立的合成数据
    ///
    /// 阶段 A 选区内 T(J)[k] = SCALE·(1 + ε_k)，末点 ε = 0；
    /// 修正后 R[i] = C0 + C1 s[i]² + C2 s[i]⁴ + η_i。
    /// ε, η 为独立高斯噪声，标准差分别为 `noise·T_NOISE` 与 `noise·R_NOISE`。
    fn synthetic(c0: f64, c1: f64, c2: f64, noise: f64, seed: u64) -> Synthetic {
        let n = 1500;
        let two_theta: Vec<f64> = (0..n)
            .map(|i| 5.0 + 135.0 * i as f64 / (n - 1) as f64)
            .collect();
        let vects = scattering_vectors(&two_theta, WAVELENGTH_NM);
        let atoms = resolve_species(&species()).unwrap();
        let f2 = mean_squared_scattering_factor(&atoms, &vects);
        let mut rng = StdRng::seed_from_u64(seed);

        let mut observed: Vec<f64> = f2.iter().map(|f| (f + TRUE_J) / SCALE).collect();

        // 阶段 A：选区连续，由目标分母反推观测强度
        let selection = select_above_cutoff(&vects, INCOHERENT_CUTOFF);
        let start = selection[0];
        let v = &vects[start..start + selection.len()];
        let weighted: Vec<f64> = f2[start..start + selection.len()]
            .iter()
            .zip(v)
            .map(|(f, s)| (f + TRUE_J) * s * s)
            .collect();
        let numerator = cumulative_trapezoid(&weighted, v);
        let last = numerator.len() - 1;
        let targets: Vec<f64> = numerator
            .iter()
            .enumerate()
            .map(|(k, a)| {
                let eps = if k == last {
                    0.0
                } else {
                    noise * T_NOISE * gaussian(&mut rng)
                };
                a / (SCALE * (1.0 + eps))
            })
            .collect();
        let weights = unwind_trapezoid(observed[start] * v[0] * v[0], &targets, v);
        for (k, (w, s)) in weights.iter().zip(v).enumerate() {
            observed[start + k] = w / (s * s);
        }

        // 阶段 B：按阶段 A 的实际修正量构造结晶强度
        let incoherent = VonkAnalyzer::default()
            .fit_incoherent(&atoms, &observed, &vects)
            .unwrap();
        let corrected: Vec<f64> = observed
            .iter()
            .map(|y| y - incoherent.correction)
            .collect();
        let weighted: Vec<f64> = corrected
            .iter()
            .zip(&vects)
            .map(|(y, s)| y * s * s)
            .collect();
        let targets: Vec<f64> = cumulative_trapezoid(&weighted, &vects)
            .iter()
            .zip(&vects)
            .map(|(a, &s)| {
                a / (vonk_polynomial_at(s, c0, c1, c2) + noise * R_NOISE * gaussian(&mut rng))
            })
            .collect();
        let w0 = weighted[0] / vonk_polynomial_at(vects[0], c0, c1, c2);
        let crystalline: Vec<f64> = unwind_trapezoid(w0, &targets, &vects)
            .iter()
            .zip(&vects)
            .map(|(w, s)| w / (s * s))
            .collect();

        Synthetic {
            two_theta,
            observed,
            crystalline,
        }
    }

    fn analyze(data: &Synthetic) -> VonkAnalysis {
        VonkAnalyzer::default()
            .analyze(
                &species(),
                &data.observed,
                &data.crystalline,
                &data.two_theta,
                WAVELENGTH_NM,
            )
            .unwrap()
    }

    fn assert_within_three_sigma(q: &UncertainQuantity, truth: f64) {
        assert!(q.uncertainty.is_finite() && q.uncertainty > 0.0, "{}", q);
        assert!(
            (q.value - truth).abs() <= 3.0 * q.uncertainty,
            "estimate {} deviates from {} by {:.2} standard errors",
            q,
            truth,
            (q.value - truth).abs() / q.uncertainty
        );
    }

    #[test]
    fn test_synthetic_recovery() {
        let data = synthetic(1.0 / TRUE_FC, TRUE_C1, TRUE_C2, 1.0, 7);
        let analysis = analyze(&data);

        let p = &analysis.parameters;
        assert_within_three_sigma(&p.fc, TRUE_FC);
        assert_within_three_sigma(&p.k, true_k());
        assert_within_three_sigma(&p.j, TRUE_J);
        assert_eq!(p.k.unit, Unit::NM2);
        assert!(p.fc.unit.is_dimensionless());
        assert!((analysis.incoherent.anchor - SCALE).abs() < 1e-3 * SCALE);
        assert_eq!(analysis.r_ratio.len(), data.two_theta.len() - 1);
    }

    #[test]
    fn test_ruland_fit_pairs_r_with_same_index_vector() {
        let data = synthetic(1.0 / TRUE_FC, TRUE_C1, TRUE_C2, 0.0, 1);
        let analysis = analyze(&data);
        let ruland = &analysis.ruland;

        assert!((ruland.c0().value - 1.0 / TRUE_FC).abs() < 1e-6);
        assert!((ruland.c1().value - TRUE_C1).abs() < 1e-6);
        assert!((ruland.c2().value - TRUE_C2).abs() < 1e-7);
        for &i in &ruland.selection {
            let r = analysis.r_ratio[i];
            assert!((r - ruland.evaluate(analysis.vects[i])).abs() < 1e-7 * r);
        }

        // 诊断图中的 R 点与拟合使用相同的配对
        let plot = VonkPlotData::from_analysis(&analysis);
        let first = ruland.selection[0];
        assert_eq!(plot.r_points.len(), ruland.selection.len());
        assert_eq!(
            plot.r_points[0],
            (analysis.vects[first].powi(2), analysis.r_ratio[first])
        );
    }

    #[test]
    fn test_incoherent_anchor_consistency() {
        let data = synthetic(1.0 / TRUE_FC, TRUE_C1, TRUE_C2, 1.0, 11);
        let analysis = analyze(&data);

        let selection = &analysis.incoherent.selection;
        let corrected: Vec<f64> = selection.iter().map(|&i| analysis.corrected[i]).collect();
        let v: Vec<f64> = selection.iter().map(|&i| analysis.vects[i]).collect();
        let t = t_ratio(&analysis.atoms, &corrected, &v, 0.0);
        let anchor = analysis.incoherent.anchor;
        assert!((t.last().unwrap() - anchor).abs() < 1e-9 * anchor);

        // 整个序列被同一常数修正，调用方数据不变
        let shift = data.observed[0] - analysis.corrected[0];
        assert!((shift - analysis.incoherent.correction).abs() < 1e-9 * shift.abs());
        assert!(data
            .observed
            .iter()
            .zip(&analysis.corrected)
            .all(|(o, c)| (o - c - shift).abs() < 1e-9 * o.abs().max(1.0)));
    }

    #[test]
    fn test_c0_lower_bound() {
        // 真实 C0 < 1 时，拟合值停在 C0 = 1
        let data = synthetic(0.8, 0.9, 0.01, 1.0, 3);
        let analysis = analyze(&data);

        let c0 = analysis.ruland.c0().value;
        assert!(c0 >= 1.0);
        let fc = analysis.parameters.fc.value;
        assert!(fc > 0.0 && fc <= 1.0);
        assert!(analysis.ruland.c1().value >= 0.0);
        assert!(analysis.ruland.c2().value >= 0.0);
    }

    #[test]
    fn test_unresolved_species_match_resolved() {
        let data = synthetic(1.0 / TRUE_FC, TRUE_C1, TRUE_C2, 1.0, 5);
        let raw = vec![AtomSpecies::from("si"), AtomSpecies::from("o")];
        let resolved = vec![
            AtomSpecies::from(AtomicModel::from_symbol("Si").unwrap()),
            AtomSpecies::from(AtomicModel::from_symbol("O").unwrap()),
        ];

        let analyzer = VonkAnalyzer::default();
        let a = analyzer
            .analyze(
                &raw,
                &data.observed,
                &data.crystalline,
                &data.two_theta,
                WAVELENGTH_NM,
            )
            .unwrap();
        let b = analyzer
            .analyze(
                &resolved,
                &data.observed,
                &data.crystalline,
                &data.two_theta,
                WAVELENGTH_NM,
            )
            .unwrap();
        assert_eq!(a.parameters, b.parameters);
        assert!(matches!(raw[0], AtomSpecies::Unresolved(_)));
    }

    #[test]
    fn test_degenerate_selection() {
        // 2θ 最大 55.5°，s 最大约 6.05 nm⁻¹，高于 6 的点不足
        let two_theta: Vec<f64> = (0..200).map(|i| 10.0 + 45.5 * i as f64 / 199.0).collect();
        let observed = vec![100.0; 200];
        let crystalline = vec![50.0; 200];

        let err = VonkAnalyzer::default()
            .analyze(
                &species(),
                &observed,
                &crystalline,
                &two_theta,
                WAVELENGTH_NM,
            )
            .unwrap_err();
        match err {
            VonkError::DegenerateSelection {
                stage,
                found,
                required,
                ..
            } => {
                assert_eq!(stage, FitStage::Incoherent);
                assert!(found < required);
                assert_eq!(required, MIN_SELECTED_POINTS);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_ruland_selection_requirement() {
        let config = VonkConfig::default().with_ruland_cutoff(1e6);
        let data = synthetic(1.0 / TRUE_FC, TRUE_C1, TRUE_C2, 0.0, 1);
        let err = VonkAnalyzer::new(config)
            .analyze(
                &species(),
                &data.observed,
                &data.crystalline,
                &data.two_theta,
                WAVELENGTH_NM,
            )
            .unwrap_err();
        assert!(matches!(
            err,
            VonkError::DegenerateSelection {
                stage: FitStage::Ruland,
                found: 0,
                ..
            }
        ));
    }

    #[test]
    fn test_input_validation() {
        let analyzer = VonkAnalyzer::default();
        let two_theta = vec![10.0, 20.0, 30.0];

        let err = analyzer
            .analyze(&species(), &[1.0, 2.0], &[1.0, 2.0, 3.0], &two_theta, 0.154)
            .unwrap_err();
        assert!(matches!(
            err,
            VonkError::InvalidInputShape {
                expected: 3,
                found: 2,
                ..
            }
        ));

        let err = analyzer
            .analyze(&species(), &[1.0], &[1.0], &[10.0], 0.154)
            .unwrap_err();
        assert!(matches!(err, VonkError::InvalidInputShape { .. }));

        let err = analyzer
            .analyze(&[], &[1.0; 3], &[1.0; 3], &two_theta, 0.154)
            .unwrap_err();
        assert!(matches!(err, VonkError::InvalidArgument(_)));

        let err = analyzer
            .analyze(
                &[AtomSpecies::from("Xx")],
                &[1.0; 3],
                &[1.0; 3],
                &two_theta,
                0.154,
            )
            .unwrap_err();
        assert!(matches!(err, VonkError::UnresolvedSpecies(_)));
    }

    #[test]
    fn test_max_nfev_surfaces_as_convergence_error() {
        let data = synthetic(1.0 / TRUE_FC, TRUE_C1, TRUE_C2, 1.0, 2);
        let config = VonkConfig::default().with_max_nfev(2);
        let err = VonkAnalyzer::new(config)
            .analyze(
                &species(),
                &data.observed,
                &data.crystalline,
                &data.two_theta,
                WAVELENGTH_NM,
            )
            .unwrap_err();
        assert!(matches!(
            err,
            VonkError::FitConvergence {
                stage: FitStage::Incoherent,
                ..
            }
        ));
    }

    #[test]
    fn test_compute_without_plot() {
        let data = synthetic(1.0 / TRUE_FC, TRUE_C1, TRUE_C2, 0.0, 9);
        let dir = tempdir().unwrap();
        let name = dir.path().join("silica");
        let params = compute_vonk_parameters(
            name.to_str().unwrap(),
            &species(),
            &data.observed,
            &data.crystalline,
            &data.two_theta,
            WAVELENGTH_NM,
            false,
        )
        .unwrap();
        assert!((params.fc.value - TRUE_FC).abs() < 1e-6);
        assert!((params.k.value - true_k()).abs() < 1e-5);
        assert!((params.j.value - TRUE_J).abs() < 1e-6);
        assert!(std::fs::read_dir(dir.path()).unwrap().next().is_none());
    }

    #[test]
    fn test_compute_writes_plot() {
        let data = synthetic(1.0 / TRUE_FC, TRUE_C1, TRUE_C2, 1.0, 13);
        let dir = tempdir().unwrap();
        let name = dir.path().join("silica");
        let name = name.to_str().unwrap();

        let params = compute_vonk_parameters(
            name,
            &species(),
            &data.observed,
            &data.crystalline,
            &data.two_theta,
            WAVELENGTH_NM,
            true,
        )
        .unwrap();
        assert!(params.fc.value > 0.0 && params.fc.value <= 1.0);

        let path = dir.path().join("silica_Vonk.png");
        assert_eq!(plot::plot_path(name), path.to_str().unwrap());
        let bytes = std::fs::read(&path).unwrap();
        assert_eq!(&bytes[..8], b"\x89PNG\r\n\x1a\n");
        // IHDR 中的宽、高（大端）
        let width = u32::from_be_bytes(bytes[16..20].try_into().unwrap());
        let height = u32::from_be_bytes(bytes[20..24].try_into().unwrap());
        assert_eq!((width, height), (886, 626));
    }
}
