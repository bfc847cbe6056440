//! # XRD 结晶度分析模块
//!
//! 提供 Vonk/Ruland 结晶度分析的全部计算功能。
//!
//! ## 子模块
//! - `vectors`: 衍射角 -> 散射矢量
//! - `scattering`: 原子散射因子数据库与元素解析
//! - `integrate`: 累积梯形积分
//! - `ratio`: Ruland R 函数与 Vonk T 函数
//! - `model`: Vonk 线性模型与偶次多项式模型
//! - `fit`: 带边界的参数集与求解器
//! - `uncertainty`: 误差传递
//! - `vonk`: 两阶段拟合流程
//! - `plot`: 诊断图生成
//! - `export`: 结果导出
//!
//! ## 依赖关系
//! - 被 `commands/` 使用
//! - 使用 `models/pattern.rs`

pub mod export;
pub mod fit;
pub mod integrate;
pub mod model;
pub mod plot;
pub mod ratio;
pub mod scattering;
pub mod uncertainty;
pub mod vectors;
pub mod vonk;

pub use scattering::{AtomSpecies, AtomicModel, FormFactorArgument};
pub use uncertainty::{UncertainQuantity, Unit};
pub use vonk::{
    compute_vonk_parameters, VonkAnalysis, VonkAnalyzer, VonkConfig, VonkParameters, VonkSummary,
};
