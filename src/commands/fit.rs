//! # fit 子命令实现
//!
//! 对单个衍射图样执行 Vonk/Ruland 分析。
//!
//! ## 功能
//! - 读取图样文件并解析元素组成
//! - 两阶段拟合，打印结果表格
//! - 可选输出诊断图、结果汇总和修正后的图样
//!
//! ## 依赖关系
//! - 使用 `cli/fit.rs` 定义的 FitArgs
//! - 使用库中的 `parsers/` 和 `xrd/`

use crate::cli::fit::FitArgs;
use crate::utils::{output, progress};

use anyhow::{anyhow, Context};
use std::path::{Path, PathBuf};
use tabled::{Table, Tabled};
use vonk_ruland::parsers;
use vonk_ruland::xrd::{export, plot};
use vonk_ruland::{UncertainQuantity, VonkAnalysis, VonkAnalyzer};

/// 执行单文件分析
pub fn execute(args: FitArgs) -> anyhow::Result<()> {
    output::print_header("Vonk/Ruland Crystallinity Analysis");

    let wavelength = args.analysis.wavelength_nm().map_err(|e| anyhow!(e))?;
    let species = args
        .composition
        .species()
        .context("invalid sample composition")?;

    let pattern = parsers::parse_pattern_file(&args.input)
        .with_context(|| format!("failed to load pattern '{}'", args.input.display()))?;

    output::print_info(&format!(
        "Pattern '{}': {} points",
        pattern.name,
        pattern.len()
    ));
    if let Some((min, max)) = pattern.angle_range() {
        output::print_info(&format!("2θ range: {:.2}° - {:.2}°", min, max));
    }
    output::print_info(&format!(
        "Wavelength: {:.5} nm, {} atoms per formula unit",
        wavelength,
        species.len()
    ));

    let analyzer = VonkAnalyzer::new(args.analysis.config());
    let spinner = progress::fitting_spinner(&pattern.name);
    let analysis = analyzer.analyze(
        &species,
        &pattern.observed,
        &pattern.crystalline,
        &pattern.two_theta,
        wavelength,
    );
    spinner.finish_and_clear();
    let analysis = analysis.with_context(|| format!("analysis of '{}' failed", pattern.name))?;
    output::print_success(&format!("Fitted '{}'", pattern.name));

    print_result_table(&analysis);

    let name = args
        .output
        .clone()
        .unwrap_or_else(|| default_output_name(&args.input));

    if !args.no_plot {
        let path = plot::plot_path(&name);
        plot::generate_vonk_plot(&analysis, Path::new(&path))
            .with_context(|| format!("failed to write plot '{}'", path))?;
        output::print_written("plot", Path::new(&path));
    }

    if let Some(path) = &args.export {
        super::export_summary(&[analysis.summary(&pattern.name)], path)?;
        output::print_written("summary", path);
    }

    if let Some(path) = &args.save_corrected {
        export::corrected_to_xy(&analysis, &pattern, path)
            .with_context(|| format!("failed to write '{}'", path.display()))?;
        output::print_written("corrected pattern", path);
    }

    Ok(())
}

/// 默认输出名：去掉扩展名的输入路径
fn default_output_name(input: &Path) -> String {
    let stem: PathBuf = input.with_extension("");
    stem.to_string_lossy().into_owned()
}

#[derive(Tabled)]
struct ResultRow {
    #[tabled(rename = "Parameter")]
    name: &'static str,
    #[tabled(rename = "Value")]
    value: String,
    #[tabled(rename = "Std. error")]
    stderr: String,
    #[tabled(rename = "Unit")]
    unit: String,
}

impl ResultRow {
    fn new(name: &'static str, q: &UncertainQuantity) -> Self {
        Self {
            name,
            value: format!("{:.5}", q.value),
            stderr: format!("{:.5}", q.uncertainty),
            unit: q.unit.to_string(),
        }
    }
}

/// 打印结果表格
fn print_result_table(analysis: &VonkAnalysis) {
    let p = &analysis.parameters;
    let ruland = &analysis.ruland;
    let rows = vec![
        ResultRow::new("fc", &p.fc),
        ResultRow::new("k", &p.k),
        ResultRow::new("J", &p.j),
        ResultRow::new("C0", &ruland.c0()),
        ResultRow::new("C1", &ruland.c1()),
        ResultRow::new("C2", &ruland.c2()),
    ];

    output::print_header("Vonk/Ruland Parameters");
    println!("{}", Table::new(&rows));
    println!();
    output::print_info(&format!(
        "Incoherent fit: {} points, anchor {:.6e}, subtracted {:.6e}",
        analysis.incoherent.selection.len(),
        analysis.incoherent.anchor,
        analysis.incoherent.correction
    ));
    output::print_info(&format!(
        "Ruland fit: {} points, reduced chi² {:.4e} ({} + {} evaluations)",
        ruland.selection.len(),
        ruland.refined.redchi(),
        ruland.coarse.nfev,
        ruland.refined.nfev
    ));
    if !ruland.coarse.converged {
        output::print_warning("Nelder-Mead pass stopped at its evaluation limit");
    }
}
