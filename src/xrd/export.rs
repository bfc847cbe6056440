//! # 结果导出
//!
//! 导出 Vonk 分析结果到 CSV、JSON 和 XY 格式。
//!
//! ## 支持格式
//! - CSV: 每个样品一行的结果汇总（fc, k, J, C0..C2 及误差）
//! - JSON: 同一汇总的结构化形式
//! - XY: 修正后的强度序列（2θ, s, 修正观测强度, 结晶强度, R）
//!
//! ## 依赖关系
//! - 被 `commands/` 调用
//! - 使用 `xrd/vonk.rs` 的 VonkAnalysis, VonkSummary 结构
//! - 使用 `csv` 和 `serde_json` 写入文件

use crate::error::{Result, VonkError};
use crate::models::DiffractionPattern;
use crate::xrd::vonk::{VonkAnalysis, VonkSummary};

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

fn write_error(path: &Path) -> impl Fn(std::io::Error) -> VonkError + '_ {
    move |source| VonkError::FileWriteError {
        path: path.display().to_string(),
        source,
    }
}

/// 导出结果汇总为 CSV（首行为表头）
pub fn summary_to_csv(rows: &[VonkSummary], output_path: &Path) -> Result<()> {
    let mut wtr = csv::Writer::from_path(output_path)?;
    for row in rows {
        wtr.serialize(row)?;
    }
    wtr.flush().map_err(write_error(output_path))?;
    Ok(())
}

/// 导出结果汇总为 JSON 数组
pub fn summary_to_json(rows: &[VonkSummary], output_path: &Path) -> Result<()> {
    let file = File::create(output_path).map_err(write_error(output_path))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, rows)?;
    writeln!(writer).map_err(write_error(output_path))?;
    writer.flush().map_err(write_error(output_path))?;
    Ok(())
}

/// 导出修正后的强度序列为 XY 格式
///
/// R 比散射矢量少一个点，首行的 R 写为 nan。
pub fn corrected_to_xy(
    analysis: &VonkAnalysis,
    pattern: &DiffractionPattern,
    output_path: &Path,
) -> Result<()> {
    let err = write_error(output_path);
    let file = File::create(output_path).map_err(&err)?;
    let mut w = BufWriter::new(file);

    writeln!(w, "# Vonk corrected pattern: {}", pattern.name).map_err(&err)?;
    writeln!(
        w,
        "# Incoherent correction: J = {}, subtracted {:.6e}",
        analysis.parameters.j, analysis.incoherent.correction
    )
    .map_err(&err)?;
    writeln!(
        w,
        "# Columns: 2theta (degrees), s (1/nm), corrected observed, crystalline, R"
    )
    .map_err(&err)?;
    writeln!(w, "#").map_err(&err)?;

    for (i, two_theta) in pattern.two_theta.iter().enumerate() {
        let r = match i {
            0 => f64::NAN,
            _ => analysis.r_ratio.get(i - 1).copied().unwrap_or(f64::NAN),
        };
        writeln!(
            w,
            "{:.4}\t{:.6}\t{:.6e}\t{:.6e}\t{:.6e}",
            two_theta, analysis.vects[i], analysis.corrected[i], analysis.crystalline[i], r
        )
        .map_err(&err)?;
    }

    w.flush().map_err(&err)?;
    Ok(())
}
