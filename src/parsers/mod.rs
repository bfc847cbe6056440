//! # 解析器模块
//!
//! 提供衍射图样文件和元素组成的解析器。
//!
//! ## 依赖关系
//! - 被 `commands/` 模块使用
//! - 使用 `models/` 数据模型
//! - 子模块: pattern, formula

pub mod formula;
pub mod pattern;

pub use formula::{expand_formula, parse_species_list};

use crate::error::{Result, VonkError};
use crate::models::DiffractionPattern;
use std::path::Path;

/// 从文件路径推断格式并解析
pub fn parse_pattern_file(path: &Path) -> Result<DiffractionPattern> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|s| s.to_lowercase())
        .unwrap_or_default();

    match ext.as_str() {
        "csv" => pattern::parse_csv_file(path),
        "xy" | "dat" | "txt" => pattern::parse_xy_file(path),
        _ => Err(VonkError::UnsupportedFormat(format!(
            "Cannot determine format for: {}",
            path.display()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_dispatch_by_extension() {
        let dir = tempdir().unwrap();
        let csv_path = dir.path().join("film.CSV");
        fs::write(&csv_path, "2theta,yobs,ycryst\n5,10,1\n6,9,1\n").unwrap();
        let xy_path = dir.path().join("film.xy");
        fs::write(&xy_path, "5 10 1\n6 9 1\n").unwrap();

        let from_csv = parse_pattern_file(&csv_path).unwrap();
        let from_xy = parse_pattern_file(&xy_path).unwrap();
        assert_eq!(from_csv.name, "film");
        assert_eq!(from_csv.two_theta, from_xy.two_theta);
        assert_eq!(from_csv.observed, from_xy.observed);
    }

    #[test]
    fn test_unsupported_and_missing() {
        let dir = tempdir().unwrap();
        let raw = dir.path().join("film.raw");
        assert!(matches!(
            parse_pattern_file(&raw),
            Err(VonkError::UnsupportedFormat(_))
        ));

        let missing = dir.path().join("missing.xy");
        assert!(matches!(
            parse_pattern_file(&missing),
            Err(VonkError::FileReadError { .. })
        ));
    }
}
