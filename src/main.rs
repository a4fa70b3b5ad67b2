use anyhow::Context;
use csvsight::utils::{logger, validation::Validate};
use csvsight::{CsvPipeline, Engine, ReportConfig};
use std::path::Path;

/// No CLI flags: the run is configured here, the way the original analysis
/// scripts hard-coded their paths and rules. A `csvsight.toml` in the
/// working directory overrides this default.
const DEFAULT_CONFIG: &str = r#"
[pipeline]
name = "sales-report"
description = "Sales data quality check and aggregate report"

[input]
path = "./sales_data.csv"
columns = [
    { name = "Date", type = "date" },
    { name = "Product", type = "text" },
    { name = "Region", type = "text" },
    { name = "Units_Sold", type = "integer" },
    { name = "Unit_Price", type = "float" },
    { name = "Total_Sales", type = "float" },
]

[validation]
missing_values = "drop"
required = ["Product", "Region", "Total_Sales"]

[[validation.range]]
column = "Total_Sales"
min = 0.0

[[validation.range]]
column = "Units_Sold"
min = 0.0

[validation.outliers]
columns = ["Units_Sold", "Total_Sales"]

[[processing.breakdown]]
name = "total_sales_by_product"
group_by = ["Product"]
value = "Total_Sales"

[[processing.breakdown]]
name = "total_sales_by_region"
group_by = ["Region"]
value = "Total_Sales"
chart = "pie"

[processing.trend]
date_column = "Date"
value = "Total_Sales"

[output]
directory = "./output"
"#;

const CONFIG_FILE: &str = "csvsight.toml";

fn main() {
    logger::init_logger(false);

    if let Err(e) = run() {
        tracing::error!("run failed: {:#}", e);
        eprintln!("error: {:#}", e);
        std::process::exit(1);
    }
}

fn run() -> anyhow::Result<()> {
    let config = if Path::new(CONFIG_FILE).exists() {
        tracing::info!(path = CONFIG_FILE, "using configuration file");
        ReportConfig::from_file(CONFIG_FILE)
            .with_context(|| format!("failed to load {}", CONFIG_FILE))?
    } else {
        ReportConfig::from_toml_str(DEFAULT_CONFIG).context("built-in configuration is invalid")?
    };

    config.validate().context("configuration rejected")?;
    tracing::info!(pipeline = %config.pipeline.name, input = %config.input.path, "starting run");

    let pipeline = CsvPipeline::new(&config)?;
    let mut engine = Engine::new(pipeline);
    let summary = engine.run()?;

    println!("records loaded: {}", summary.loaded_records);
    println!(
        "valid: {}  invalid: {}  skipped: {}",
        summary.validation.valid_records,
        summary.validation.invalid_records,
        summary.validation.skipped_rows
    );
    for path in &summary.outputs {
        println!("wrote {}", path.display());
    }
    for warning in &summary.warnings {
        println!("warning: {}", warning);
    }

    Ok(())
}
