//! # 共享的分析参数
//!
//! `fit` 和 `batch` 共用的元素组成、波长和拟合参数。
//!
//! ## 依赖关系
//! - 被 `cli/fit.rs`、`cli/batch.rs` 展开使用
//! - 构造 `xrd/vonk.rs` 的 VonkConfig

use clap::{Args, ValueEnum};
use vonk_ruland::error::Result;
use vonk_ruland::parsers::{expand_formula, parse_species_list};
use vonk_ruland::xrd::vonk::{
    VonkConfig, INCOHERENT_CUTOFF, INITIAL_J, MIN_SELECTED_POINTS, RULAND_CUTOFF,
};
use vonk_ruland::{AtomSpecies, FormFactorArgument};

/// 预定义辐射源波长 (Å)
pub fn get_predefined_wavelength(name: &str) -> Option<f64> {
    match name.to_lowercase().as_str() {
        "cu-ka" | "cuka" => Some(1.5418),
        "cu-ka1" | "cuka1" => Some(1.5406),
        "cu-ka2" | "cuka2" => Some(1.5444),
        "mo-ka" | "moka" => Some(0.7107),
        "mo-ka1" | "moka1" => Some(0.7093),
        "co-ka" | "coka" => Some(1.7903),
        "fe-ka" | "feka" => Some(1.9373),
        "cr-ka" | "crka" => Some(2.2910),
        "ag-ka" | "agka" => Some(0.5609),
        _ => None,
    }
}

/// 解析波长输入：辐射源名称（换算为 nm）或以 nm 为单位的数值
pub fn parse_wavelength(input: &str) -> std::result::Result<f64, String> {
    if let Some(angstrom) = get_predefined_wavelength(input) {
        return Ok(angstrom / 10.0);
    }
    match input.trim().parse::<f64>() {
        Ok(nm) if nm.is_finite() && nm > 0.0 => Ok(nm),
        _ => Err(format!(
            "Invalid wavelength '{}'. Use a value in nm (e.g., 0.15418) or a name: cu-ka, mo-ka, co-ka, fe-ka, cr-ka, ag-ka",
            input
        )),
    }
}

/// 样品的元素组成（二选一）
#[derive(Args, Debug, Clone)]
#[group(required = true, multiple = false)]
pub struct CompositionArgs {
    /// Atomic species, one entry per atom, comma-separated (e.g., "c,h,h")
    #[arg(long)]
    pub atoms: Option<String>,

    /// Chemical formula expanded to one entry per atom (e.g., "C2H4")
    #[arg(long)]
    pub formula: Option<String>,
}

impl CompositionArgs {
    /// 元素组成 -> 原子种类列表
    pub fn species(&self) -> Result<Vec<AtomSpecies>> {
        match (&self.atoms, &self.formula) {
            (Some(list), _) => parse_species_list(list),
            (None, Some(formula)) => expand_formula(formula),
            (None, None) => parse_species_list(""),
        }
    }
}

/// 散射因子自变量约定
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormFactorConvention {
    /// Treat the scattering vector value as q in 1/Å, f evaluated at q/(4π)
    Q,
    /// Convert 2 sin(θ)/λ in 1/nm to sin(θ)/λ in 1/Å (divide by 20)
    S,
}

impl From<FormFactorConvention> for FormFactorArgument {
    fn from(convention: FormFactorConvention) -> Self {
        match convention {
            FormFactorConvention::Q => FormFactorArgument::MomentumTransfer,
            FormFactorConvention::S => FormFactorArgument::SinThetaOverLambda,
        }
    }
}

/// 分析参数
#[derive(Args, Debug, Clone)]
pub struct AnalysisOptions {
    /// X-ray wavelength: radiation source name (cu-ka, mo-ka, etc.) or value in nm (e.g., 0.15418)
    #[arg(short, long, default_value = "cu-ka")]
    pub wavelength: String,

    /// Scattering-vector cutoff for the incoherent scattering fit (1/nm)
    #[arg(long, default_value_t = INCOHERENT_CUTOFF)]
    pub incoherent_cutoff: f64,

    /// Scattering-vector cutoff for the Ruland R fit (1/nm)
    #[arg(long, default_value_t = RULAND_CUTOFF)]
    pub ruland_cutoff: f64,

    /// Minimum number of points above each cutoff
    #[arg(long, default_value_t = MIN_SELECTED_POINTS)]
    pub min_points: usize,

    /// Starting value of the incoherent correction J
    #[arg(long, default_value_t = INITIAL_J)]
    pub initial_j: f64,

    /// Argument convention for the atomic scattering factors
    #[arg(long, value_enum, default_value_t = FormFactorConvention::Q)]
    pub form_factor: FormFactorConvention,

    /// Maximum residual evaluations per solver (default: 2000 x (parameters + 1))
    #[arg(long)]
    pub max_nfev: Option<usize>,
}

impl AnalysisOptions {
    pub fn wavelength_nm(&self) -> std::result::Result<f64, String> {
        parse_wavelength(&self.wavelength)
    }

    pub fn config(&self) -> VonkConfig {
        let config = VonkConfig::default()
            .with_incoherent_cutoff(self.incoherent_cutoff)
            .with_ruland_cutoff(self.ruland_cutoff)
            .with_min_selected_points(self.min_points)
            .with_initial_j(self.initial_j)
            .with_form_factor_argument(self.form_factor.into());
        match self.max_nfev {
            Some(max_nfev) => config.with_max_nfev(max_nfev),
            None => config,
        }
    }
}
