//! # batch 子命令 CLI 定义
//!
//! 并行分析目录中的多个衍射图样文件。
//!
//! ## 依赖关系
//! - 被 `cli/mod.rs` 使用
//! - 参数传递给 `commands/batch.rs`

use super::options::{AnalysisOptions, CompositionArgs};
use clap::Args;
use std::path::PathBuf;

/// batch 子命令参数
#[derive(Args, Debug)]
pub struct BatchArgs {
    /// Directory containing pattern files
    pub input: PathBuf,

    #[command(flatten)]
    pub composition: CompositionArgs,

    #[command(flatten)]
    pub analysis: AnalysisOptions,

    /// Glob patterns for input files, comma-separated
    #[arg(long, default_value = "*.csv,*.xy,*.dat")]
    pub pattern: String,

    /// Recurse into subdirectories
    #[arg(long, default_value_t = false)]
    pub recursive: bool,

    /// Number of parallel jobs (0 = auto)
    #[arg(short, long, default_value_t = 0)]
    pub jobs: usize,

    /// Directory for plots and the summary file
    #[arg(long, default_value = "vonk_results")]
    pub output_dir: PathBuf,

    /// Summary file name inside the output directory (.json for JSON, CSV otherwise)
    #[arg(long, default_value = "vonk_summary.csv")]
    pub summary: PathBuf,

    /// Skip the diagnostic plots
    #[arg(long, default_value_t = false)]
    pub no_plot: bool,
}
