//! # CLI 模块
//!
//! 使用 `clap` 定义命令行参数和子命令。
//!
//! ## 命令结构
//! - `fit`: 分析单个衍射图样
//! - `batch`: 并行分析目录中的多个图样
//!
//! ## 依赖关系
//! - 被 `main.rs` 使用
//! - 子模块: options, fit, batch

pub mod batch;
pub mod fit;
pub mod options;

use clap::{ArgAction, Parser, Subcommand};

/// vonk - Vonk/Ruland 结晶度分析
#[derive(Parser)]
#[command(name = "vonk")]
#[command(version)]
#[command(
    about = "Crystallinity analysis of wide-angle X-ray diffraction patterns (Vonk/Ruland method)",
    long_about = None
)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Increase log verbosity (-v info, -vv debug); RUST_LOG overrides
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

/// 可用的子命令
#[derive(Subcommand)]
pub enum Commands {
    /// Fit a single pattern and report fc, k and J
    Fit(fit::FitArgs),

    /// Fit every pattern in a directory in parallel and write a summary
    Batch(batch::BatchArgs),
}
