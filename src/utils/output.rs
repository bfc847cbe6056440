//! # 终端输出
//!
//! fit / batch 子命令共用的彩色状态行：阶段标题、写出文件、批量统计和失败条目。
//!
//! ## 依赖关系
//! - 被 `commands/` 和 `main.rs` 使用
//! - 使用 `colored` crate

use colored::Colorize;
use std::path::Path;

/// 标题栏宽度
const RULE_WIDTH: usize = 60;

pub fn print_success(msg: &str) {
    println!("{} {}", "[OK]".green().bold(), msg);
}

pub fn print_error(msg: &str) {
    eprintln!("{} {}", "[ERR]".red().bold(), msg);
}

pub fn print_warning(msg: &str) {
    println!("{} {}", "[WARN]".yellow().bold(), msg);
}

pub fn print_info(msg: &str) {
    println!("{} {}", "[*]".blue().bold(), msg);
}

/// 打印写出的结果文件（诊断图、汇总、修正图样）
pub fn print_written(kind: &str, path: &Path) {
    println!(
        "{} {:<18} {} {}",
        "[SAVE]".green().bold(),
        kind.dimmed(),
        "->".cyan(),
        path.display()
    );
}

/// 打印单个样品的失败原因
pub fn print_failure(path: &Path, reason: &str) {
    eprintln!(
        "{} {}: {}",
        "[FAIL]".red().bold(),
        path.display().to_string().bold(),
        reason
    );
}

/// 打印批量统计行
pub fn print_batch_counts(total: usize, succeeded: usize, failed: usize) {
    let failed = if failed == 0 {
        failed.to_string().normal()
    } else {
        failed.to_string().red().bold()
    };
    println!("{}", "─".repeat(RULE_WIDTH).dimmed());
    println!(
        "{} {} patterns: {} fitted, {} failed",
        "[*]".blue().bold(),
        total,
        succeeded.to_string().green().bold(),
        failed
    );
}

/// 打印阶段标题
pub fn print_header(title: &str) {
    let rule = "─".repeat(RULE_WIDTH);
    println!("\n{}", rule.dimmed());
    println!("  {}", title.bold());
    println!("{}\n", rule.dimmed());
}
