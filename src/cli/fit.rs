//! # fit 子命令 CLI 定义
//!
//! 分析单个衍射图样文件。
//!
//! ## 依赖关系
//! - 被 `cli/mod.rs` 使用
//! - 参数传递给 `commands/fit.rs`

use super::options::{AnalysisOptions, CompositionArgs};
use clap::Args;
use std::path::PathBuf;

/// fit 子命令参数
#[derive(Args, Debug)]
pub struct FitArgs {
    /// Pattern file with 2theta, observed and crystalline columns (.csv, .xy, .dat, .txt)
    pub input: PathBuf,

    #[command(flatten)]
    pub composition: CompositionArgs,

    #[command(flatten)]
    pub analysis: AnalysisOptions,

    /// Output name prefix for the plot (default: input path without extension)
    #[arg(short, long)]
    pub output: Option<String>,

    /// Skip the diagnostic plot
    #[arg(long, default_value_t = false)]
    pub no_plot: bool,

    /// Write the result summary (.json for JSON, CSV otherwise)
    #[arg(long)]
    pub export: Option<PathBuf>,

    /// Write the corrected pattern and R function as an XY file
    #[arg(long)]
    pub save_corrected: Option<PathBuf>,
}
