use crate::utils::error::{PipelineError, Result};
use plotters::element::Pie;
use plotters::prelude::*;
use std::path::Path;

const CHART_SIZE: (u32, u32) = (900, 600);
const BAR_COLOR: RGBColor = RGBColor(91, 155, 213);
const LINE_COLOR: RGBColor = RGBColor(46, 139, 87);
const PIE_PALETTE: [RGBColor; 8] = [
    RGBColor(91, 155, 213),
    RGBColor(237, 125, 49),
    RGBColor(112, 173, 71),
    RGBColor(255, 192, 0),
    RGBColor(68, 114, 196),
    RGBColor(158, 72, 14),
    RGBColor(99, 99, 99),
    RGBColor(165, 165, 165),
];

fn chart_err<E: std::fmt::Display>(e: E) -> PipelineError {
    PipelineError::ChartError {
        message: e.to_string(),
    }
}

/// Vertical bar chart of labeled totals, one bar per group key.
pub fn render_bar_chart(
    path: &Path,
    title: &str,
    x_label: &str,
    y_label: &str,
    entries: &[(String, f64)],
) -> Result<()> {
    if entries.is_empty() {
        return Err(PipelineError::ChartError {
            message: "no defined values to plot".to_string(),
        });
    }

    let root = BitMapBackend::new(path, CHART_SIZE).into_drawing_area();
    root.fill(&WHITE).map_err(chart_err)?;

    let y_max = entries.iter().map(|e| e.1).fold(0.0f64, f64::max);
    let y_max = if y_max <= 0.0 { 1.0 } else { y_max * 1.1 };

    let mut chart = ChartBuilder::on(&root)
        .caption(title, ("sans-serif", 28))
        .margin(20)
        .x_label_area_size(50)
        .y_label_area_size(70)
        .build_cartesian_2d((0..entries.len()).into_segmented(), 0f64..y_max)
        .map_err(chart_err)?;

    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_desc(x_label)
        .y_desc(y_label)
        .x_label_formatter(&|seg| match seg {
            SegmentValue::CenterOf(i) | SegmentValue::Exact(i) => entries
                .get(*i)
                .map(|e| e.0.clone())
                .unwrap_or_default(),
            SegmentValue::Last => String::new(),
        })
        .draw()
        .map_err(chart_err)?;

    chart
        .draw_series(
            Histogram::vertical(&chart)
                .style(BAR_COLOR.mix(0.8).filled())
                .margin(10)
                .data(entries.iter().enumerate().map(|(i, e)| (i, e.1))),
        )
        .map_err(chart_err)?;

    root.present().map_err(chart_err)?;
    Ok(())
}

/// Pie chart of labeled totals, one slice per group key, labeled with the
/// share of the total. Callers must pass positive values only.
pub fn render_pie_chart(path: &Path, title: &str, entries: &[(String, f64)]) -> Result<()> {
    if entries.is_empty() {
        return Err(PipelineError::ChartError {
            message: "no positive values to plot".to_string(),
        });
    }

    let root = BitMapBackend::new(path, CHART_SIZE).into_drawing_area();
    root.fill(&WHITE).map_err(chart_err)?;
    let plot_area = root.titled(title, ("sans-serif", 28)).map_err(chart_err)?;

    let sizes: Vec<f64> = entries.iter().map(|e| e.1).collect();
    let labels: Vec<String> = entries.iter().map(|e| e.0.clone()).collect();
    let colors: Vec<RGBColor> = (0..entries.len())
        .map(|i| PIE_PALETTE[i % PIE_PALETTE.len()])
        .collect();

    let center = (CHART_SIZE.0 as i32 / 2, CHART_SIZE.1 as i32 / 2 + 14);
    let radius = CHART_SIZE.1 as f64 * 0.35;
    let mut pie = Pie::new(&center, &radius, &sizes, &colors, &labels);
    pie.label_style(("sans-serif", 20).into_font());
    pie.percentages(("sans-serif", 16).into_font());

    plot_area.draw(&pie).map_err(chart_err)?;
    root.present().map_err(chart_err)?;
    Ok(())
}

/// Line chart of an ordered series (e.g. monthly totals), with markers.
pub fn render_line_chart(
    path: &Path,
    title: &str,
    x_label: &str,
    y_label: &str,
    entries: &[(String, f64)],
) -> Result<()> {
    if entries.is_empty() {
        return Err(PipelineError::ChartError {
            message: "no defined values to plot".to_string(),
        });
    }

    let root = BitMapBackend::new(path, CHART_SIZE).into_drawing_area();
    root.fill(&WHITE).map_err(chart_err)?;

    let y_min = entries.iter().map(|e| e.1).fold(f64::INFINITY, f64::min);
    let y_max = entries.iter().map(|e| e.1).fold(f64::NEG_INFINITY, f64::max);
    let pad = ((y_max - y_min) * 0.1).max(1.0);
    let x_max = (entries.len().saturating_sub(1)).max(1) as f64;

    let mut chart = ChartBuilder::on(&root)
        .caption(title, ("sans-serif", 28))
        .margin(20)
        .x_label_area_size(50)
        .y_label_area_size(70)
        .build_cartesian_2d(0f64..x_max, (y_min - pad)..(y_max + pad))
        .map_err(chart_err)?;

    chart
        .configure_mesh()
        .x_desc(x_label)
        .y_desc(y_label)
        .x_labels(entries.len())
        .x_label_formatter(&|x| {
            let i = x.round() as usize;
            if (x - i as f64).abs() < 1e-6 {
                entries.get(i).map(|e| e.0.clone()).unwrap_or_default()
            } else {
                String::new()
            }
        })
        .draw()
        .map_err(chart_err)?;

    let points: Vec<(f64, f64)> = entries
        .iter()
        .enumerate()
        .map(|(i, e)| (i as f64, e.1))
        .collect();

    chart
        .draw_series(LineSeries::new(points.iter().copied(), &LINE_COLOR))
        .map_err(chart_err)?;
    chart
        .draw_series(
            points
                .iter()
                .map(|&(x, y)| Circle::new((x, y), 4, LINE_COLOR.filled())),
        )
        .map_err(chart_err)?;

    root.present().map_err(chart_err)?;
    Ok(())
}
