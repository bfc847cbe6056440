//! # 衍射图样文件解析器
//!
//! 解析包含 2θ、观测强度、结晶参考强度三列数据的文件。
//!
//! ## 格式说明
//! ```text
//! CSV (.csv): 首行为表头，列按名称识别，否则取前三列
//!   two_theta,observed,crystalline
//!   5.00,1523.1,310.2
//!
//! XY (.xy/.dat/.txt): 空白分隔的三列，# 开头为注释
//!   # 2theta  observed  crystalline
//!   5.00  1523.1  310.2
//! ```
//!
//! ## 依赖关系
//! - 被 `parsers/mod.rs` 使用
//! - 使用 `models/pattern.rs`
//! - 使用 `csv` 读取 CSV 文件

use crate::error::{Result, VonkError};
use crate::models::DiffractionPattern;
use std::fs;
use std::path::Path;

/// 2θ 列可接受的表头名
const TWO_THETA_COLUMNS: &[&str] = &["two_theta", "2theta", "twotheta", "tth", "angle"];
/// 观测强度列可接受的表头名
const OBSERVED_COLUMNS: &[&str] = &["observed", "yobs", "obs", "intensity", "i_obs"];
/// 结晶参考强度列可接受的表头名
const CRYSTALLINE_COLUMNS: &[&str] = &["crystalline", "ycryst", "cryst", "reference", "i_cryst"];

fn read_file(path: &Path) -> Result<String> {
    fs::read_to_string(path).map_err(|e| VonkError::FileReadError {
        path: path.display().to_string(),
        source: e,
    })
}

fn default_name(path: &Path) -> &str {
    path.file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("unknown")
}

fn parse_value(field: &str, format: &str, source: &str, line: usize) -> Result<f64> {
    field.trim().parse().map_err(|_| VonkError::ParseError {
        format: format.to_string(),
        path: source.to_string(),
        reason: format!("line {}: '{}' is not a number", line, field.trim()),
    })
}

/// 解析 CSV 文件
pub fn parse_csv_file(path: &Path) -> Result<DiffractionPattern> {
    let content = read_file(path)?;
    parse_csv_content(&content, default_name(path))
}

/// 按表头名定位三列，找不到时回退为前三列
fn locate_columns(headers: &csv::StringRecord) -> [usize; 3] {
    let find = |aliases: &[&str]| {
        headers
            .iter()
            .position(|h| aliases.iter().any(|a| a.eq_ignore_ascii_case(h.trim())))
    };
    match (
        find(TWO_THETA_COLUMNS),
        find(OBSERVED_COLUMNS),
        find(CRYSTALLINE_COLUMNS),
    ) {
        (Some(t), Some(o), Some(c)) => [t, o, c],
        _ => [0, 1, 2],
    }
}

/// 从字符串内容解析 CSV 格式
pub fn parse_csv_content(content: &str, name: &str) -> Result<DiffractionPattern> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .comment(Some(b'#'))
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(content.as_bytes());

    let columns = locate_columns(reader.headers()?);
    let mut pattern = DiffractionPattern::new(name, Vec::new(), Vec::new(), Vec::new());

    for record in reader.records() {
        let record = record?;
        let line = record.position().map_or(0, |p| p.line() as usize);
        let field = |col: usize| {
            record.get(col).ok_or_else(|| VonkError::ParseError {
                format: "CSV".to_string(),
                path: name.to_string(),
                reason: format!("line {}: expected at least {} columns", line, col + 1),
            })
        };

        pattern
            .two_theta
            .push(parse_value(field(columns[0])?, "CSV", name, line)?);
        pattern
            .observed
            .push(parse_value(field(columns[1])?, "CSV", name, line)?);
        pattern
            .crystalline
            .push(parse_value(field(columns[2])?, "CSV", name, line)?);
    }

    pattern.validate()?;
    Ok(pattern)
}

/// 解析 XY 文件
pub fn parse_xy_file(path: &Path) -> Result<DiffractionPattern> {
    let content = read_file(path)?;
    parse_xy_content(&content, default_name(path))
}

/// 从字符串内容解析 XY 格式
pub fn parse_xy_content(content: &str, name: &str) -> Result<DiffractionPattern> {
    let mut pattern = DiffractionPattern::new(name, Vec::new(), Vec::new(), Vec::new());

    for (i, line) in content.lines().enumerate() {
        let line_no = i + 1;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let parts: Vec<&str> = line.split_whitespace().collect();
        if parts.len() < 3 {
            return Err(VonkError::ParseError {
                format: "XY".to_string(),
                path: name.to_string(),
                reason: format!(
                    "line {}: expected 3 columns (2theta, observed, crystalline), found {}",
                    line_no,
                    parts.len()
                ),
            });
        }

        pattern
            .two_theta
            .push(parse_value(parts[0], "XY", name, line_no)?);
        pattern
            .observed
            .push(parse_value(parts[1], "XY", name, line_no)?);
        pattern
            .crystalline
            .push(parse_value(parts[2], "XY", name, line_no)?);
    }

    pattern.validate()?;
    Ok(pattern)
}
