//! # vonk-ruland - 广角 X 射线衍射结晶度分析
//!
//! 用 Vonk/Ruland 方法由衍射强度计算结晶尺寸因子 fc、晶格畸变参数 k
//! 和非相干散射修正 J，并给出一阶传递的标准误差。
//!
//! ## 依赖关系
//! ```text
//! lib.rs
//!   ├── xrd/       (散射因子、比值函数、拟合、误差传递、绘图、导出)
//!   ├── parsers/   (图样文件与化学式解析)
//!   ├── models/    (数据模型)
//!   └── error.rs   (错误处理)
//! ```

pub mod error;
pub mod models;
pub mod parsers;
pub mod xrd;

pub use error::{FitStage, Result, VonkError};
pub use models::DiffractionPattern;
pub use xrd::{
    compute_vonk_parameters, AtomSpecies, AtomicModel, FormFactorArgument, UncertainQuantity,
    VonkAnalysis, VonkAnalyzer, VonkConfig, VonkParameters, VonkSummary,
};
