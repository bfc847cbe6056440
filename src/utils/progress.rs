//! # 进度显示
//!
//! 单个图样拟合时的 spinner 与批量拟合的进度条，均基于 `indicatif`。
//!
//! ## 依赖关系
//! - 被 `commands/fit.rs` 和 `batch/runner.rs` 使用
//! - 使用 `indicatif` crate

use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

const FIT_TEMPLATE: &str = "{spinner:.green} fitting {msg} [{elapsed}]";
const BATCH_TEMPLATE: &str =
    "[{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} patterns ({eta}) {wide_msg:.dim}";

/// 单个样品两阶段拟合的 spinner
pub fn fitting_spinner(sample: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::with_template(FIT_TEMPLATE)
            .expect("valid spinner template")
            .tick_strings(&["⣾", "⣽", "⣻", "⢿", "⡿", "⣟", "⣯", "⣷"]),
    );
    pb.set_message(sample.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

/// 批量拟合进度条，消息栏显示最近完成的文件
pub fn batch_progress(patterns: usize) -> ProgressBar {
    let pb = ProgressBar::new(patterns as u64);
    pb.set_style(
        ProgressStyle::with_template(BATCH_TEMPLATE)
            .expect("valid progress template")
            .progress_chars("=> "),
    );
    pb
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_templates_parse() {
        assert!(ProgressStyle::with_template(FIT_TEMPLATE).is_ok());
        assert!(ProgressStyle::with_template(BATCH_TEMPLATE).is_ok());
    }

    #[test]
    fn test_batch_progress_length() {
        let pb = batch_progress(12);
        assert_eq!(pb.length(), Some(12));
        pb.finish_and_clear();
    }
}
