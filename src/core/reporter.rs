use crate::config::OutputSection;
use crate::core::charts;
use crate::domain::model::{AggregateReport, ChartStyle, ReportOutcome, ValidationSummary};
use crate::utils::error::Result;
use std::fs;
use std::path::{Path, PathBuf};

/// Renders an `AggregateReport` as a text summary, a JSON sidecar and chart
/// images. Pure read path over the report. Every write failure is demoted to
/// a warning in the outcome; the run completes with whatever succeeded.
pub struct Reporter {
    pipeline_name: String,
    directory: PathBuf,
    text_report: String,
    json_summary: String,
    charts: bool,
}

impl Reporter {
    pub fn new(pipeline_name: &str, output: &OutputSection) -> Self {
        Self {
            pipeline_name: pipeline_name.to_string(),
            directory: PathBuf::from(&output.directory),
            text_report: output.text_report.clone(),
            json_summary: output.json_summary.clone(),
            charts: output.charts,
        }
    }

    pub fn report(
        &self,
        aggregates: &AggregateReport,
        summary: &ValidationSummary,
    ) -> Result<ReportOutcome> {
        let mut outcome = ReportOutcome::default();

        if let Err(e) = fs::create_dir_all(&self.directory) {
            let msg = format!(
                "failed to create output directory {}: {}",
                self.directory.display(),
                e
            );
            tracing::warn!("{}", msg);
            outcome.warnings.push(msg);
        }

        let text = self.render_text(aggregates, summary);
        let text_path = self.directory.join(&self.text_report);
        self.write_output(&text_path, text.as_bytes(), &mut outcome);

        let json = serde_json::json!({
            "pipeline": self.pipeline_name,
            "validation": summary,
            "aggregates": aggregates,
        });
        let bytes = serde_json::to_vec_pretty(&json)?;
        let json_path = self.directory.join(&self.json_summary);
        self.write_output(&json_path, &bytes, &mut outcome);

        if self.charts {
            self.render_charts(aggregates, &mut outcome);
        }

        Ok(outcome)
    }

    fn render_charts(&self, aggregates: &AggregateReport, outcome: &mut ReportOutcome) {
        for (name, breakdown) in &aggregates.breakdowns {
            // Undefined groups have no honest bar height; they stay in the
            // text report and JSON only.
            let entries: Vec<(String, f64)> = breakdown
                .totals
                .iter()
                .filter_map(|(k, v)| v.defined().map(|d| (k.clone(), d)))
                .collect();
            if entries.is_empty() {
                tracing::debug!(breakdown = %name, "no defined values, skipping chart");
                continue;
            }

            let path = self.directory.join(format!("{}.png", sanitize(name)));
            let title = name.replace('_', " ");
            let rendered = match breakdown.chart {
                ChartStyle::Bar => charts::render_bar_chart(
                    &path,
                    &title,
                    &breakdown.key_columns.join("/"),
                    &breakdown.value_column,
                    &entries,
                ),
                ChartStyle::Pie => {
                    // A slice needs a positive share of the total.
                    let slices: Vec<(String, f64)> =
                        entries.iter().filter(|e| e.1 > 0.0).cloned().collect();
                    charts::render_pie_chart(&path, &title, &slices)
                }
            };
            match rendered {
                Ok(()) => {
                    tracing::info!(path = %path.display(), "wrote chart");
                    outcome.written.push(path);
                }
                Err(e) => {
                    let msg = format!("failed to render chart {}: {}", path.display(), e);
                    tracing::warn!("{}", msg);
                    outcome.warnings.push(msg);
                }
            }
        }

        if let Some(trend) = &aggregates.trend {
            let entries: Vec<(String, f64)> = trend
                .totals
                .iter()
                .filter_map(|(k, v)| v.defined().map(|d| (k.clone(), d)))
                .collect();
            if entries.is_empty() {
                return;
            }

            let path = self
                .directory
                .join(format!("{}_monthly_trend.png", sanitize(&trend.value_column)));
            let title = format!("{} monthly trend", trend.value_column.replace('_', " "));
            match charts::render_line_chart(&path, &title, "month", &trend.value_column, &entries) {
                Ok(()) => {
                    tracing::info!(path = %path.display(), "wrote chart");
                    outcome.written.push(path);
                }
                Err(e) => {
                    let msg = format!("failed to render chart {}: {}", path.display(), e);
                    tracing::warn!("{}", msg);
                    outcome.warnings.push(msg);
                }
            }
        }
    }

    fn write_output(&self, path: &Path, bytes: &[u8], outcome: &mut ReportOutcome) {
        match fs::write(path, bytes) {
            Ok(()) => {
                tracing::info!(path = %path.display(), "wrote output");
                outcome.written.push(path.to_path_buf());
            }
            Err(e) => {
                let msg = format!("failed to write {}: {}", path.display(), e);
                tracing::warn!("{}", msg);
                outcome.warnings.push(msg);
            }
        }
    }

    fn render_text(&self, aggregates: &AggregateReport, summary: &ValidationSummary) -> String {
        let mut out = String::new();
        out.push_str(&format!("=== {} ===\n", self.pipeline_name));
        out.push_str(&format!(
            "generated: {}\n\n",
            chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
        ));

        out.push_str("-- data quality --\n");
        out.push_str(&format!("records loaded: {}\n", summary.total_records));
        out.push_str(&format!("valid records: {}\n", summary.valid_records));
        out.push_str(&format!("invalid records: {}\n", summary.invalid_records));
        out.push_str(&format!("skipped rows: {}\n", summary.skipped_rows));
        out.push_str(&format!("duplicate rows: {}\n", summary.duplicate_rows));
        if summary.flagged_missing > 0 {
            out.push_str(&format!("missing cells tolerated: {}\n", summary.flagged_missing));
        }
        if !summary.rule_violations.is_empty() {
            out.push_str("rule violations:\n");
            for (rule, count) in &summary.rule_violations {
                out.push_str(&format!("  {}: {}\n", rule, count));
            }
        }
        if !summary.outliers.is_empty() {
            out.push_str("outlier cells (IQR):\n");
            for (column, count) in &summary.outliers {
                out.push_str(&format!("  {}: {}\n", column, count));
            }
        }

        out.push_str("\n-- aggregates --\n");
        for (name, value) in aggregates.metrics() {
            out.push_str(&format!("{} = {}\n", name, value));
        }

        out
    }
}

fn sanitize(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_lowercase()
            } else {
                '_'
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::{AggregateValue, ColumnStats, GroupBreakdown};
    use std::collections::BTreeMap;

    fn sample_report() -> (AggregateReport, ValidationSummary) {
        let mut report = AggregateReport {
            valid_rows: 2,
            ..AggregateReport::default()
        };
        report.column_stats.insert(
            "amount".to_string(),
            ColumnStats {
                count: 2,
                sum: AggregateValue::Defined(150.0),
                mean: AggregateValue::Defined(75.0),
                min: AggregateValue::Defined(50.0),
                max: AggregateValue::Defined(100.0),
            },
        );
        let mut totals = BTreeMap::new();
        totals.insert("north".to_string(), AggregateValue::Defined(150.0));
        totals.insert("south".to_string(), AggregateValue::Undefined);
        report.breakdowns.insert(
            "amount_by_region".to_string(),
            GroupBreakdown {
                key_columns: vec!["region".to_string()],
                value_column: "amount".to_string(),
                chart: ChartStyle::Bar,
                totals,
            },
        );

        let mut summary = ValidationSummary {
            total_records: 3,
            valid_records: 2,
            invalid_records: 1,
            ..ValidationSummary::default()
        };
        summary
            .rule_violations
            .insert("type:amount".to_string(), 1);
        summary.outliers.insert("amount".to_string(), 1);

        (report, summary)
    }

    #[test]
    fn test_text_report_one_metric_per_line() {
        let (report, summary) = sample_report();
        let output = OutputSection {
            directory: "./unused".to_string(),
            text_report: "report.txt".to_string(),
            json_summary: "summary.json".to_string(),
            charts: false,
        };
        let reporter = Reporter::new("sales-report", &output);
        let text = reporter.render_text(&report, &summary);

        assert!(text.contains("valid records: 2"));
        assert!(text.contains("  type:amount: 1"));
        assert!(text.contains("outlier cells (IQR):\n  amount: 1"));
        assert!(text.contains("amount.sum = 150\n"));
        assert!(text.contains("amount.mean = 75\n"));
        assert!(text.contains("amount_by_region[north] = 150\n"));
        assert!(text.contains("amount_by_region[south] = undefined\n"));
    }

    #[test]
    fn test_report_writes_into_temp_dir() {
        let dir = tempfile::TempDir::new().unwrap();
        let (report, summary) = sample_report();
        let output = OutputSection {
            directory: dir.path().to_string_lossy().to_string(),
            text_report: "report.txt".to_string(),
            json_summary: "summary.json".to_string(),
            charts: false,
        };
        let reporter = Reporter::new("sales-report", &output);
        let outcome = reporter.report(&report, &summary).unwrap();

        assert!(outcome.warnings.is_empty());
        assert_eq!(outcome.written.len(), 2);
        assert!(dir.path().join("report.txt").exists());
        assert!(dir.path().join("summary.json").exists());

        let json: serde_json::Value =
            serde_json::from_slice(&fs::read(dir.path().join("summary.json")).unwrap()).unwrap();
        assert_eq!(json["aggregates"]["valid_rows"], 2);
        // Undefined serializes as null, never as zero.
        assert!(json["aggregates"]["breakdowns"]["amount_by_region"]["totals"]["south"].is_null());
    }

    #[test]
    fn test_sanitize_chart_names() {
        assert_eq!(sanitize("Total Sales/by Region"), "total_sales_by_region");
    }
}
