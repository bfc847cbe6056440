//! # 命令执行模块
//!
//! 实现各子命令的业务逻辑，错误以 `anyhow` 附带上下文向上传递。
//!
//! ## 依赖关系
//! - 被 `main.rs` 调用
//! - 使用 `cli/`, `batch/`, `utils/` 以及库中的 `parsers/`, `xrd/`
//! - 子模块: fit, batch

pub mod batch;
pub mod fit;

use crate::cli::Commands;

use anyhow::Context;
use std::path::Path;
use vonk_ruland::xrd::export;
use vonk_ruland::VonkSummary;

/// 执行命令
pub fn run(cmd: Commands) -> anyhow::Result<()> {
    match cmd {
        Commands::Fit(args) => fit::execute(args),
        Commands::Batch(args) => batch::execute(args),
    }
}

/// 按扩展名导出结果汇总（.json 为 JSON，其余为 CSV）
pub fn export_summary(rows: &[VonkSummary], path: &Path) -> anyhow::Result<()> {
    let is_json = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("json"));

    if is_json {
        export::summary_to_json(rows, path)
    } else {
        export::summary_to_csv(rows, path)
    }
    .with_context(|| format!("failed to write summary '{}'", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn row() -> VonkSummary {
        VonkSummary {
            name: "PE".to_string(),
            fc: 0.7,
            fc_err: 0.01,
            k_nm2: 2.0,
            k_err: 0.1,
            j: 0.5,
            j_err: 0.01,
            c0: 1.43,
            c0_err: 0.02,
            c1_nm2: 1.41,
            c1_err: 0.01,
            c2_nm4: 0.04,
            c2_err: 0.001,
            anchor: 0.01,
            incoherent_points: 900,
            ruland_points: 1300,
            redchi: 1e-4,
        }
    }

    #[test]
    fn test_export_summary_by_extension() {
        let dir = tempdir().unwrap();
        let json = dir.path().join("out.JSON");
        let csv = dir.path().join("out.csv");

        export_summary(&[row()], &json).unwrap();
        export_summary(&[row()], &csv).unwrap();

        assert!(std::fs::read_to_string(&json).unwrap().trim_start().starts_with('['));
        assert!(std::fs::read_to_string(&csv).unwrap().starts_with("name,"));
    }
}
