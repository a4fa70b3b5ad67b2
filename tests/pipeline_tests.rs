use csvsight::{CsvPipeline, Engine, PipelineError, ReportConfig, RunState};
use std::fs;
use tempfile::TempDir;

fn config_for(input: &str, output: &str, charts: bool) -> ReportConfig {
    let toml = format!(
        r#"
[pipeline]
name = "sales-report"

[input]
path = "{input}"
columns = [
    {{ name = "region", type = "text" }},
    {{ name = "amount", type = "float" }},
]

[validation]
required = ["region", "amount"]

[[processing.breakdown]]
name = "amount_by_region"
group_by = ["region"]
value = "amount"

[output]
directory = "{output}"
charts = {charts}
"#
    );
    ReportConfig::from_toml_str(&toml).unwrap()
}

#[test]
fn test_end_to_end_sales_scenario() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("sales.csv");
    let output = dir.path().join("out");
    fs::write(&input, "region,amount\nnorth,100\nsouth,bad\nnorth,50\n").unwrap();

    let config = config_for(
        input.to_str().unwrap(),
        output.to_str().unwrap(),
        false,
    );
    let mut engine = Engine::new(CsvPipeline::new(&config).unwrap());
    let summary = engine.run().unwrap();

    assert_eq!(engine.state(), RunState::Done);
    assert_eq!(summary.loaded_records, 3);
    assert_eq!(summary.validation.valid_records, 2);
    assert_eq!(summary.validation.invalid_records, 1);
    assert_eq!(summary.validation.skipped_rows, 0);
    assert_eq!(
        summary.validation.rule_violations.get("type:amount"),
        Some(&1)
    );
    assert!(summary.warnings.is_empty());

    let report = fs::read_to_string(output.join("report.txt")).unwrap();
    assert!(report.contains("amount.count = 2"));
    assert!(report.contains("amount.sum = 150"));
    assert!(report.contains("amount.mean = 75"));
    assert!(report.contains("amount_by_region[north] = 150"));
    assert!(report.contains("amount_by_region[south] = undefined"));

    let json: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(output.join("summary.json")).unwrap()).unwrap();
    assert_eq!(json["validation"]["valid_records"], 2);
    assert!(json["aggregates"]["breakdowns"]["amount_by_region"]["totals"]["south"].is_null());
}

#[test]
fn test_all_valid_rows_round_trip() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("sales.csv");
    let output = dir.path().join("out");
    fs::write(&input, "region,amount\nnorth,10\nsouth,20\neast,30\n").unwrap();

    let config = config_for(input.to_str().unwrap(), output.to_str().unwrap(), false);
    let mut engine = Engine::new(CsvPipeline::new(&config).unwrap());
    let summary = engine.run().unwrap();

    assert_eq!(summary.validation.valid_records, 3);
    assert_eq!(summary.validation.invalid_records, 0);
}

#[test]
fn test_zero_valid_rows_reports_undefined_not_zero() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("sales.csv");
    let output = dir.path().join("out");
    fs::write(&input, "region,amount\nnorth,bad\nsouth,\n").unwrap();

    let config = config_for(input.to_str().unwrap(), output.to_str().unwrap(), false);
    let mut engine = Engine::new(CsvPipeline::new(&config).unwrap());
    let summary = engine.run().unwrap();

    assert_eq!(summary.validation.valid_records, 0);

    let report = fs::read_to_string(output.join("report.txt")).unwrap();
    assert!(report.contains("amount.sum = undefined"));
    assert!(report.contains("amount.mean = undefined"));
    assert!(report.contains("amount.min = undefined"));
    assert!(report.contains("amount.max = undefined"));
    assert!(!report.contains("amount.sum = 0"));
}

#[test]
fn test_missing_input_fails_before_any_output() {
    let dir = TempDir::new().unwrap();
    let output = dir.path().join("out");

    let config = config_for("./definitely_missing.csv", output.to_str().unwrap(), false);
    let mut engine = Engine::new(CsvPipeline::new(&config).unwrap());
    let result = engine.run();

    assert!(matches!(result, Err(PipelineError::FileNotFound { .. })));
    assert_eq!(engine.state(), RunState::Failed);
    assert!(!output.exists());
}

#[cfg(unix)]
#[test]
fn test_read_only_output_dir_warns_but_completes() {
    use std::os::unix::fs::PermissionsExt;

    let dir = TempDir::new().unwrap();
    let input = dir.path().join("sales.csv");
    let output = dir.path().join("out");
    fs::write(&input, "region,amount\nnorth,100\n").unwrap();
    fs::create_dir(&output).unwrap();
    fs::set_permissions(&output, fs::Permissions::from_mode(0o555)).unwrap();

    let config = config_for(input.to_str().unwrap(), output.to_str().unwrap(), false);
    let mut engine = Engine::new(CsvPipeline::new(&config).unwrap());
    let summary = engine.run().unwrap();

    // Writes failed, but the run still completed.
    assert_eq!(engine.state(), RunState::Done);
    assert!(!summary.warnings.is_empty());
    assert!(summary
        .warnings
        .iter()
        .any(|w| w.contains("report.txt")));

    fs::set_permissions(&output, fs::Permissions::from_mode(0o755)).unwrap();
}

#[test]
fn test_charts_enabled_run_completes() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("sales.csv");
    let output = dir.path().join("out");
    fs::write(&input, "region,amount\nnorth,100\nsouth,60\n").unwrap();

    let config = config_for(input.to_str().unwrap(), output.to_str().unwrap(), true);
    let mut engine = Engine::new(CsvPipeline::new(&config).unwrap());
    let summary = engine.run().unwrap();

    // Chart rendering may warn on hosts without fonts; it must never fail
    // the run, and the text outputs always land first.
    assert_eq!(engine.state(), RunState::Done);
    assert!(output.join("report.txt").exists());
    assert!(output.join("summary.json").exists());
    if summary.warnings.is_empty() {
        assert!(output.join("amount_by_region.png").exists());
    }
}

#[test]
fn test_pie_breakdown_run_completes() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("sales.csv");
    let output = dir.path().join("out");
    fs::write(&input, "region,amount\nnorth,100\nsouth,60\nwest,40\n").unwrap();

    let toml = format!(
        r#"
[pipeline]
name = "sales-report"

[input]
path = "{}"
columns = [
    {{ name = "region", type = "text" }},
    {{ name = "amount", type = "float" }},
]

[[processing.breakdown]]
name = "region_share"
group_by = ["region"]
value = "amount"
chart = "pie"

[output]
directory = "{}"
charts = true
"#,
        input.to_str().unwrap(),
        output.to_str().unwrap()
    );
    let config = ReportConfig::from_toml_str(&toml).unwrap();
    let mut engine = Engine::new(CsvPipeline::new(&config).unwrap());
    let summary = engine.run().unwrap();

    // As with bar charts, rendering may warn on font-less hosts but never
    // fails the run.
    assert_eq!(engine.state(), RunState::Done);
    assert!(output.join("report.txt").exists());
    if summary.warnings.is_empty() {
        assert!(output.join("region_share.png").exists());
    }
}

#[test]
fn test_outlier_counts_reach_the_report() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("sales.csv");
    let output = dir.path().join("out");
    fs::write(
        &input,
        "region,amount\nnorth,10\nnorth,11\nnorth,12\nnorth,9\nnorth,500\n",
    )
    .unwrap();

    let toml = format!(
        r#"
[pipeline]
name = "sales-report"

[input]
path = "{}"
columns = [
    {{ name = "region", type = "text" }},
    {{ name = "amount", type = "float" }},
]

[validation.outliers]
columns = ["amount"]

[output]
directory = "{}"
charts = false
"#,
        input.to_str().unwrap(),
        output.to_str().unwrap()
    );
    let config = ReportConfig::from_toml_str(&toml).unwrap();
    let mut engine = Engine::new(CsvPipeline::new(&config).unwrap());
    let summary = engine.run().unwrap();

    // Outliers are counted, not rejected.
    assert_eq!(summary.validation.valid_records, 5);
    assert_eq!(summary.validation.outliers.get("amount"), Some(&1));

    let report = fs::read_to_string(output.join("report.txt")).unwrap();
    assert!(report.contains("outlier cells (IQR):"));
    assert!(report.contains("  amount: 1"));
}

#[test]
fn test_structurally_broken_rows_are_skipped() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("sales.csv");
    let output = dir.path().join("out");
    fs::write(
        &input,
        "region,amount\nnorth,100\nonlyonefield\nsouth,50,extra\nwest,25\n",
    )
    .unwrap();

    let config = config_for(input.to_str().unwrap(), output.to_str().unwrap(), false);
    let mut engine = Engine::new(CsvPipeline::new(&config).unwrap());
    let summary = engine.run().unwrap();

    assert_eq!(summary.loaded_records, 2);
    assert_eq!(summary.validation.skipped_rows, 2);

    let report = fs::read_to_string(output.join("report.txt")).unwrap();
    assert!(report.contains("skipped rows: 2"));
}
