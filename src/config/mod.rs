use crate::domain::model::{ChartStyle, ColumnSpec, MissingValuePolicy, Schema};
use chrono::NaiveDate;
use crate::utils::error::{PipelineError, Result};
use crate::utils::validation::{
    validate_known_columns, validate_non_empty_string, validate_path, validate_range_bounds,
    Validate,
};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Full pipeline configuration. There are no CLI flags: the binary embeds a
/// hard-coded default and optionally overrides it from a TOML file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    pub pipeline: PipelineSection,
    pub input: InputSection,
    #[serde(default)]
    pub validation: ValidationSection,
    #[serde(default)]
    pub processing: ProcessingSection,
    pub output: OutputSection,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineSection {
    pub name: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputSection {
    pub path: String,
    /// Drop exact duplicate rows after loading (they are always counted).
    #[serde(default)]
    pub drop_duplicates: bool,
    pub columns: Vec<ColumnSpec>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ValidationSection {
    #[serde(default)]
    pub missing_values: MissingValuePolicy,
    /// Columns that must be non-null in every record.
    #[serde(default)]
    pub required: Vec<String>,
    #[serde(default)]
    pub range: Vec<RangeRule>,
    #[serde(default)]
    pub allowed: Vec<AllowedRule>,
    #[serde(default)]
    pub pattern: Vec<PatternRule>,
    #[serde(default)]
    pub daterange: Vec<DateRangeRule>,
    pub outliers: Option<OutlierConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RangeRule {
    pub column: String,
    pub min: Option<f64>,
    pub max: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AllowedRule {
    pub column: String,
    pub values: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatternRule {
    pub column: String,
    pub pattern: String,
}

/// Bounds for a date column, e.g. `min = "2024-01-01"`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DateRangeRule {
    pub column: String,
    pub min: Option<NaiveDate>,
    pub max: Option<NaiveDate>,
}

/// IQR outlier check over the listed numeric columns. Outliers are counted
/// in the summary only; they never invalidate a record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutlierConfig {
    pub columns: Vec<String>,
    #[serde(default = "default_iqr_multiplier")]
    pub iqr_multiplier: f64,
}

fn default_iqr_multiplier() -> f64 {
    1.5
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProcessingSection {
    #[serde(default)]
    pub breakdown: Vec<BreakdownConfig>,
    pub trend: Option<TrendConfig>,
}

/// One group-by aggregate: sum of `value` keyed by `group_by` column(s).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BreakdownConfig {
    pub name: String,
    pub group_by: Vec<String>,
    pub value: String,
    #[serde(default)]
    pub chart: ChartStyle,
}

/// Monthly totals of `value` bucketed by the `YYYY-MM` of `date_column`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrendConfig {
    pub date_column: String,
    pub value: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputSection {
    pub directory: String,
    #[serde(default = "default_text_report")]
    pub text_report: String,
    #[serde(default = "default_json_summary")]
    pub json_summary: String,
    #[serde(default = "default_charts")]
    pub charts: bool,
}

fn default_text_report() -> String {
    "report.txt".to_string()
}

fn default_json_summary() -> String {
    "summary.json".to_string()
}

fn default_charts() -> bool {
    true
}

impl ReportConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(PipelineError::IoError)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed = Self::substitute_env_vars(content);

        toml::from_str(&processed).map_err(|e| PipelineError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// Replace `${VAR_NAME}` with the environment value; unknown variables
    /// are left as-is.
    fn substitute_env_vars(content: &str) -> String {
        use regex::Regex;
        let re = Regex::new(r"\$\{([^}]+)\}").expect("static regex");

        re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        })
        .to_string()
    }

    pub fn schema(&self) -> Schema {
        Schema::new(self.input.columns.clone())
    }
}

impl Validate for ReportConfig {
    fn validate(&self) -> Result<()> {
        validate_non_empty_string("pipeline.name", &self.pipeline.name)?;
        validate_path("input.path", &self.input.path)?;
        validate_path("output.directory", &self.output.directory)?;

        if self.input.columns.is_empty() {
            return Err(PipelineError::MissingConfigError {
                field: "input.columns".to_string(),
            });
        }

        let schema = self.schema();
        let columns = schema.column_names();

        validate_known_columns("validation.required", &self.validation.required, &columns)?;

        for rule in &self.validation.range {
            validate_known_columns(
                "validation.range.column",
                std::slice::from_ref(&rule.column),
                &columns,
            )?;
            if let (Some(min), Some(max)) = (rule.min, rule.max) {
                validate_range_bounds("validation.range", min, max)?;
            }
            match schema.column_type(&rule.column) {
                Some(t) if t.is_numeric() => {}
                _ => {
                    return Err(PipelineError::InvalidConfigValueError {
                        field: "validation.range.column".to_string(),
                        value: rule.column.clone(),
                        reason: "Range rules apply to numeric columns only".to_string(),
                    })
                }
            }
        }

        for rule in &self.validation.allowed {
            validate_known_columns(
                "validation.allowed.column",
                std::slice::from_ref(&rule.column),
                &columns,
            )?;
            if rule.values.is_empty() {
                return Err(PipelineError::InvalidConfigValueError {
                    field: "validation.allowed.values".to_string(),
                    value: rule.column.clone(),
                    reason: "Allowed set cannot be empty".to_string(),
                });
            }
        }

        for rule in &self.validation.pattern {
            validate_known_columns(
                "validation.pattern.column",
                std::slice::from_ref(&rule.column),
                &columns,
            )?;
            if let Err(e) = regex::Regex::new(&rule.pattern) {
                return Err(PipelineError::InvalidConfigValueError {
                    field: "validation.pattern".to_string(),
                    value: rule.pattern.clone(),
                    reason: format!("Invalid regex: {}", e),
                });
            }
        }

        for rule in &self.validation.daterange {
            validate_known_columns(
                "validation.daterange.column",
                std::slice::from_ref(&rule.column),
                &columns,
            )?;
            if schema.column_type(&rule.column) != Some(crate::domain::model::ColumnType::Date) {
                return Err(PipelineError::InvalidConfigValueError {
                    field: "validation.daterange.column".to_string(),
                    value: rule.column.clone(),
                    reason: "Date range rules apply to columns of type 'date' only".to_string(),
                });
            }
            if let (Some(min), Some(max)) = (rule.min, rule.max) {
                if min > max {
                    return Err(PipelineError::InvalidConfigValueError {
                        field: "validation.daterange".to_string(),
                        value: rule.column.clone(),
                        reason: format!("min date {} is after max date {}", min, max),
                    });
                }
            }
        }

        if let Some(outliers) = &self.validation.outliers {
            validate_known_columns("validation.outliers.columns", &outliers.columns, &columns)?;
            for column in &outliers.columns {
                match schema.column_type(column) {
                    Some(t) if t.is_numeric() => {}
                    _ => {
                        return Err(PipelineError::InvalidConfigValueError {
                            field: "validation.outliers.columns".to_string(),
                            value: column.clone(),
                            reason: "Outlier checks apply to numeric columns only".to_string(),
                        })
                    }
                }
            }
            if outliers.iqr_multiplier <= 0.0 {
                return Err(PipelineError::InvalidConfigValueError {
                    field: "validation.outliers.iqr_multiplier".to_string(),
                    value: outliers.iqr_multiplier.to_string(),
                    reason: "IQR multiplier must be positive".to_string(),
                });
            }
        }

        for breakdown in &self.processing.breakdown {
            validate_non_empty_string("processing.breakdown.name", &breakdown.name)?;
            validate_known_columns("processing.breakdown.group_by", &breakdown.group_by, &columns)?;
            validate_known_columns(
                "processing.breakdown.value",
                std::slice::from_ref(&breakdown.value),
                &columns,
            )?;
            if breakdown.group_by.is_empty() {
                return Err(PipelineError::MissingConfigError {
                    field: "processing.breakdown.group_by".to_string(),
                });
            }
            match schema.column_type(&breakdown.value) {
                Some(t) if t.is_numeric() => {}
                _ => {
                    return Err(PipelineError::InvalidConfigValueError {
                        field: "processing.breakdown.value".to_string(),
                        value: breakdown.value.clone(),
                        reason: "Breakdown value must be a numeric column".to_string(),
                    })
                }
            }
        }

        if let Some(trend) = &self.processing.trend {
            validate_known_columns(
                "processing.trend.date_column",
                std::slice::from_ref(&trend.date_column),
                &columns,
            )?;
            validate_known_columns(
                "processing.trend.value",
                std::slice::from_ref(&trend.value),
                &columns,
            )?;
            if schema.column_type(&trend.date_column) != Some(crate::domain::model::ColumnType::Date)
            {
                return Err(PipelineError::InvalidConfigValueError {
                    field: "processing.trend.date_column".to_string(),
                    value: trend.date_column.clone(),
                    reason: "Trend date column must have type 'date'".to_string(),
                });
            }
            match schema.column_type(&trend.value) {
                Some(t) if t.is_numeric() => {}
                _ => {
                    return Err(PipelineError::InvalidConfigValueError {
                        field: "processing.trend.value".to_string(),
                        value: trend.value.clone(),
                        reason: "Trend value must be a numeric column".to_string(),
                    })
                }
            }
        }

        Ok(())
    }
}
