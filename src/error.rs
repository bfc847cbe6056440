//! # 统一错误处理模块
//!
//! 定义 Vonk/Ruland 分析的所有错误类型，使用 `thiserror` 派生。
//!
//! ## 依赖关系
//! - 被所有其他模块使用
//! - 使用 `xrd/fit` 的求解器错误作为拟合失败的来源

use crate::xrd::fit::MinimizeError;

use std::fmt;
use thiserror::Error;

/// 拟合阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FitStage {
    /// 阶段 A：非相干散射修正 J
    Incoherent,
    /// 阶段 B：Ruland R 函数多项式拟合
    Ruland,
}

impl fmt::Display for FitStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FitStage::Incoherent => write!(f, "incoherent scattering fit"),
            FitStage::Ruland => write!(f, "Ruland R fit"),
        }
    }
}

/// Vonk/Ruland 统一错误类型
#[derive(Error, Debug)]
pub enum VonkError {
    // ─────────────────────────────────────────────────────────────
    // I/O 错误
    // ─────────────────────────────────────────────────────────────
    #[error("Failed to read file: {path}")]
    FileReadError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write file: {path}")]
    FileWriteError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    // ─────────────────────────────────────────────────────────────
    // 解析错误
    // ─────────────────────────────────────────────────────────────
    #[error("Failed to parse {format} file: {path}\nReason: {reason}")]
    ParseError {
        format: String,
        path: String,
        reason: String,
    },

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    // ─────────────────────────────────────────────────────────────
    // 输入错误
    // ─────────────────────────────────────────────────────────────
    #[error("Invalid input shape: {series} has {found} points, expected {expected}")]
    InvalidInputShape {
        series: String,
        expected: usize,
        found: usize,
    },

    #[error("Unresolved atomic species '{0}': not a known element symbol")]
    UnresolvedSpecies(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    // ─────────────────────────────────────────────────────────────
    // 拟合错误
    // ─────────────────────────────────────────────────────────────
    #[error(
        "Degenerate selection in {stage}: {found} points above s = {cutoff} nm⁻¹, at least {required} required"
    )]
    DegenerateSelection {
        stage: FitStage,
        cutoff: f64,
        found: usize,
        required: usize,
    },

    #[error("{stage} failed to converge")]
    FitConvergence {
        stage: FitStage,
        #[source]
        source: MinimizeError,
    },

    // ─────────────────────────────────────────────────────────────
    // 输出错误
    // ─────────────────────────────────────────────────────────────
    #[error("Plot rendering failed: {0}")]
    PlotError(String),

    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

/// Result 类型别名
pub type Result<T> = std::result::Result<T, VonkError>;
