//! # Vonk 诊断图
//!
//! 使用 `plotters` 绘制 Vonk/Ruland 分析的诊断图 `<name>_Vonk.png`。
//!
//! ## 图面
//! - 左轴：R 函数（实线）与拟合多项式（虚线），横轴 s² (nm⁻²)
//! - 右轴：修正后的观测强度（实线）与结晶参考强度（虚线），不显示刻度标签
//! - 两个纵轴均从 0 开始
//! - 尺寸 7.5 cm × 5.3 cm，300 dpi
//!
//! ## 依赖关系
//! - 被 `xrd/vonk.rs` 和 `commands/` 调用
//! - 使用 `xrd/vonk.rs` 的 VonkAnalysis 结构
//! - 使用 `plotters` 渲染图表

use crate::error::{Result, VonkError};
use crate::xrd::vonk::VonkAnalysis;

use plotters::prelude::*;
use plotters::series::DashedLineSeries;
use std::path::Path;

/// 图宽 (cm)
const FIGURE_WIDTH_CM: f64 = 7.5;
/// 图高 (cm)
const FIGURE_HEIGHT_CM: f64 = 5.3;
const FIGURE_DPI: f64 = 300.0;
/// 拟合曲线采样点数
const CURVE_POINTS: usize = 50;

/// 诊断图文件名
pub fn plot_path(output_name: &str) -> String {
    format!("{}_Vonk.png", output_name)
}

/// 按物理尺寸和分辨率换算像素尺寸
pub fn figure_size_px(width_cm: f64, height_cm: f64, dpi: f64) -> (u32, u32) {
    let px = |cm: f64| (cm / 2.54 * dpi).round() as u32;
    (px(width_cm), px(height_cm))
}

/// [start, end] 上的等距采样
fn linspace(start: f64, end: f64, n: usize) -> Vec<f64> {
    match n {
        0 => Vec::new(),
        1 => vec![start],
        _ => (0..n)
            .map(|i| start + (end - start) * i as f64 / (n - 1) as f64)
            .collect(),
    }
}

/// 纵轴上限：数据最大值留 5% 余量，无有效数据时取 1
fn axis_upper<'a>(values: impl Iterator<Item = &'a f64>) -> f64 {
    let max = values
        .copied()
        .filter(|v| v.is_finite())
        .fold(f64::NEG_INFINITY, f64::max);
    if max.is_finite() && max > 0.0 {
        max * 1.05
    } else {
        1.0
    }
}

/// 绘图所需的数据序列，横坐标均为 s²
#[derive(Debug, Clone, PartialEq)]
pub struct VonkPlotData {
    pub r_points: Vec<(f64, f64)>,
    pub fit_curve: Vec<(f64, f64)>,
    pub observed: Vec<(f64, f64)>,
    pub crystalline: Vec<(f64, f64)>,
}

impl VonkPlotData {
    pub fn from_analysis(analysis: &VonkAnalysis) -> Self {
        let vects = &analysis.vects;

        let r_points = analysis
            .ruland
            .selection
            .iter()
            .map(|&i| (vects[i].powi(2), analysis.r_ratio[i]))
            .collect();

        let s_max = vects.iter().copied().fold(0.0, f64::max);
        let fit_curve = linspace(0.0, s_max, CURVE_POINTS)
            .into_iter()
            .map(|s| (s * s, analysis.ruland.evaluate(s)))
            .collect();

        let squared = |y: &[f64]| -> Vec<(f64, f64)> {
            vects.iter().zip(y).map(|(s, y)| (s * s, *y)).collect()
        };

        Self {
            r_points,
            fit_curve,
            observed: squared(&analysis.corrected),
            crystalline: squared(&analysis.crystalline),
        }
    }

    fn x_upper(&self) -> f64 {
        axis_upper(
            self.fit_curve
                .iter()
                .chain(&self.observed)
                .map(|(x, _)| x),
        )
    }

    fn r_upper(&self) -> f64 {
        axis_upper(self.r_points.iter().chain(&self.fit_curve).map(|(_, y)| y))
    }

    fn intensity_upper(&self) -> f64 {
        axis_upper(self.observed.iter().chain(&self.crystalline).map(|(_, y)| y))
    }
}

/// 生成 Vonk 诊断图 (PNG)
pub fn generate_vonk_plot(analysis: &VonkAnalysis, output_path: &Path) -> Result<()> {
    let data = VonkPlotData::from_analysis(analysis);
    let size = figure_size_px(FIGURE_WIDTH_CM, FIGURE_HEIGHT_CM, FIGURE_DPI);

    let root = BitMapBackend::new(output_path, size).into_drawing_area();
    draw_vonk_chart(&root, &data)?;
    root.present()
        .map_err(|e| VonkError::PlotError(e.to_string()))?;

    log::debug!("plot written to {}", output_path.display());
    Ok(())
}

/// 绘制双纵轴图表的核心逻辑
fn draw_vonk_chart<DB: DrawingBackend>(
    root: &DrawingArea<DB, plotters::coord::Shift>,
    data: &VonkPlotData,
) -> Result<()>
where
    DB::ErrorType: 'static,
{
    root.fill(&WHITE)
        .map_err(|e| VonkError::PlotError(format!("{:?}", e)))?;

    let x_max = data.x_upper();

    let mut chart = ChartBuilder::on(root)
        .margin(20)
        .x_label_area_size(70)
        .y_label_area_size(90)
        .right_y_label_area_size(50)
        .build_cartesian_2d(0.0..x_max, 0.0..data.r_upper())
        .map_err(|e| VonkError::PlotError(format!("{:?}", e)))?
        .set_secondary_coord(0.0..x_max, 0.0..data.intensity_upper());

    chart
        .configure_mesh()
        .disable_mesh()
        .x_desc("s² (nm⁻²)")
        .y_desc("R")
        .x_label_style(("sans-serif", 30))
        .y_label_style(("sans-serif", 30))
        .axis_desc_style(("sans-serif", 36))
        .draw()
        .map_err(|e| VonkError::PlotError(format!("{:?}", e)))?;

    chart
        .configure_secondary_axes()
        .y_desc("I")
        .y_labels(0)
        .axis_desc_style(("sans-serif", 36))
        .draw()
        .map_err(|e| VonkError::PlotError(format!("{:?}", e)))?;

    let line = BLACK.stroke_width(2);

    chart
        .draw_series(LineSeries::new(data.r_points.iter().copied(), line))
        .map_err(|e| VonkError::PlotError(format!("{:?}", e)))?;
    chart
        .draw_series(DashedLineSeries::new(
            data.fit_curve.iter().copied(),
            12,
            8,
            line,
        ))
        .map_err(|e| VonkError::PlotError(format!("{:?}", e)))?;

    chart
        .draw_secondary_series(LineSeries::new(data.observed.iter().copied(), line))
        .map_err(|e| VonkError::PlotError(format!("{:?}", e)))?;
    chart
        .draw_secondary_series(DashedLineSeries::new(
            data.crystalline.iter().copied(),
            12,
            8,
            line,
        ))
        .map_err(|e| VonkError::PlotError(format!("{:?}", e)))?;

    Ok(())
}
