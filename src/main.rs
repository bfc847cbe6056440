//! # vonk - 广角 X 射线衍射结晶度分析命令行工具
//!
//! 用 Vonk/Ruland 方法由衍射图样计算结晶尺寸因子 fc、畸变参数 k 和
//! 非相干散射修正 J。
//!
//! ## 子命令
//! - `fit`   - 分析单个衍射图样
//! - `batch` - 并行分析目录中的多个图样
//!
//! ## 依赖关系
//! ```text
//! main.rs
//!   ├── cli/        (命令行参数定义)
//!   ├── commands/   (命令执行逻辑)
//!   │     └── vonk_ruland (库: parsers/, xrd/, models/)
//!   ├── batch/      (文件收集与并行执行)
//!   └── utils/      (输出与进度条)
//! ```

mod batch;
mod cli;
mod commands;
mod utils;

use clap::Parser;
use cli::Cli;

fn main() {
    // Initialize colored output for Windows compatibility
    #[cfg(windows)]
    colored::control::set_virtual_terminal(true).ok();

    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp(None)
        .init();

    if let Err(e) = commands::run(cli.command) {
        utils::output::print_error(&format!("{:#}", e));
        std::process::exit(1);
    }
}
