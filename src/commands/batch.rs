//! # batch 子命令实现
//!
//! 并行分析目录中的全部衍射图样，汇总每个样品的 fc, k, J。
//!
//! ## 依赖关系
//! - 使用 `cli/batch.rs` 定义的 BatchArgs
//! - 使用 `batch/` 的 FileCollector 和 BatchRunner
//! - 使用库中的 `parsers/` 和 `xrd/`

use crate::batch::{BatchRunner, FileCollector};
use crate::cli::batch::BatchArgs;
use crate::utils::output;

use anyhow::{anyhow, bail, Context};
use std::fs;
use std::path::Path;
use tabled::{Table, Tabled};
use vonk_ruland::parsers;
use vonk_ruland::xrd::plot;
use vonk_ruland::xrd::scattering::resolve_species;
use vonk_ruland::{AtomSpecies, VonkAnalyzer, VonkSummary};

/// 失败列表最多显示的条数
const MAX_LISTED_FAILURES: usize = 10;

/// 执行批量分析
pub fn execute(args: BatchArgs) -> anyhow::Result<()> {
    output::print_header("Batch Vonk/Ruland Analysis");

    let wavelength = args.analysis.wavelength_nm().map_err(|e| anyhow!(e))?;
    let species = args
        .composition
        .species()
        .context("invalid sample composition")?;
    let species: Vec<AtomSpecies> = resolve_species(&species)
        .context("invalid sample composition")?
        .into_iter()
        .map(AtomSpecies::from)
        .collect();

    let files = FileCollector::new(args.input.clone())
        .with_pattern(&args.pattern)
        .map_err(|e| anyhow!(e))?
        .recursive(args.recursive)
        .collect();

    if files.is_empty() {
        output::print_warning(&format!(
            "No files matching '{}' found in {}",
            args.pattern,
            args.input.display()
        ));
        return Ok(());
    }

    fs::create_dir_all(&args.output_dir).with_context(|| {
        format!(
            "failed to create output directory '{}'",
            args.output_dir.display()
        )
    })?;

    let runner = BatchRunner::new(args.jobs);
    output::print_info(&format!(
        "Found {} files, running with {} jobs",
        files.len(),
        runner.jobs()
    ));

    let analyzer = VonkAnalyzer::new(args.analysis.config());
    let result = runner
        .run(&files, |path| {
            analyze_file(&analyzer, path, &species, wavelength, &args)
                .map_err(|e| format!("{:#}", e))
        })
        .map_err(|e| anyhow!(e))?;

    output::print_batch_counts(result.total(), result.success(), result.failed());

    for (path, err) in result.failures.iter().take(MAX_LISTED_FAILURES) {
        output::print_failure(path, err);
    }
    if result.failed() > MAX_LISTED_FAILURES {
        output::print_warning(&format!(
            "... and {} more failures",
            result.failed() - MAX_LISTED_FAILURES
        ));
    }

    if result.outputs.is_empty() {
        bail!("all {} files failed", result.total());
    }

    let rows: Vec<VonkSummary> = result.outputs.into_iter().map(|(_, row)| row).collect();
    print_summary_table(&rows);

    let summary_path = args.output_dir.join(&args.summary);
    super::export_summary(&rows, &summary_path)?;
    output::print_written("summary", &summary_path);
    Ok(())
}

/// 分析单个文件，样品名取文件名主干
fn analyze_file(
    analyzer: &VonkAnalyzer,
    path: &Path,
    species: &[AtomSpecies],
    wavelength: f64,
    args: &BatchArgs,
) -> anyhow::Result<VonkSummary> {
    let pattern = parsers::parse_pattern_file(path)?;
    let analysis = analyzer.analyze(
        species,
        &pattern.observed,
        &pattern.crystalline,
        &pattern.two_theta,
        wavelength,
    )?;

    if !args.no_plot {
        let plot_file = args.output_dir.join(plot::plot_path(&pattern.name));
        plot::generate_vonk_plot(&analysis, &plot_file)
            .with_context(|| format!("failed to write plot '{}'", plot_file.display()))?;
    }

    log::info!(
        "{}: fc = {}, k = {}",
        pattern.name,
        analysis.parameters.fc,
        analysis.parameters.k
    );
    Ok(analysis.summary(&pattern.name))
}

#[derive(Tabled)]
struct SummaryRow {
    #[tabled(rename = "Sample")]
    name: String,
    #[tabled(rename = "fc")]
    fc: String,
    #[tabled(rename = "k (nm²)")]
    k: String,
    #[tabled(rename = "J")]
    j: String,
}

impl From<&VonkSummary> for SummaryRow {
    fn from(s: &VonkSummary) -> Self {
        Self {
            name: s.name.clone(),
            fc: format!("{:.4} ± {:.4}", s.fc, s.fc_err),
            k: format!("{:.4} ± {:.4}", s.k_nm2, s.k_err),
            j: format!("{:.4} ± {:.4}", s.j, s.j_err),
        }
    }
}

fn print_summary_table(rows: &[VonkSummary]) {
    let table_rows: Vec<SummaryRow> = rows.iter().map(SummaryRow::from).collect();
    println!("{}", Table::new(&table_rows));
    println!();
}
