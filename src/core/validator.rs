use crate::config::ValidationSection;
use crate::domain::model::{
    MissingValuePolicy, Table, ValidationOutcome, ValidationResult, ValidationSummary,
};
use crate::utils::error::{PipelineError, Result};
use chrono::NaiveDate;
use regex::Regex;

/// Applies the configured rule set to every record and produces a per-record
/// verdict plus a dataset-level summary. Invalid records are excluded from
/// aggregation downstream; the summary keeps rule-name violation counts so
/// the exclusion stays auditable.
///
/// Rule names are `<kind>:<column>`, e.g. `type:amount`, `range:price`.
pub struct Validator {
    policy: MissingValuePolicy,
    required: Vec<String>,
    range: Vec<(String, Option<f64>, Option<f64>)>,
    allowed: Vec<(String, Vec<String>)>,
    patterns: Vec<(String, Regex)>,
    dateranges: Vec<(String, Option<NaiveDate>, Option<NaiveDate>)>,
    outliers: Option<(Vec<String>, f64)>,
}

impl Validator {
    pub fn from_config(section: &ValidationSection) -> Result<Self> {
        let mut patterns = Vec::with_capacity(section.pattern.len());
        for rule in &section.pattern {
            let re = Regex::new(&rule.pattern).map_err(|e| {
                PipelineError::InvalidConfigValueError {
                    field: "validation.pattern".to_string(),
                    value: rule.pattern.clone(),
                    reason: format!("Invalid regex: {}", e),
                }
            })?;
            patterns.push((rule.column.clone(), re));
        }

        Ok(Self {
            policy: section.missing_values,
            required: section.required.clone(),
            range: section
                .range
                .iter()
                .map(|r| (r.column.clone(), r.min, r.max))
                .collect(),
            allowed: section
                .allowed
                .iter()
                .map(|r| (r.column.clone(), r.values.clone()))
                .collect(),
            patterns,
            dateranges: section
                .daterange
                .iter()
                .map(|r| (r.column.clone(), r.min, r.max))
                .collect(),
            outliers: section
                .outliers
                .as_ref()
                .map(|o| (o.columns.clone(), o.iqr_multiplier)),
        })
    }

    /// Validate every record. Under the `fill` policy, missing required
    /// cells are coerced in place to the column type's zero value; records
    /// are immutable after this pass.
    pub fn validate(&self, table: &mut Table) -> ValidationOutcome {
        let schema = table.schema().clone();
        let mut results = Vec::with_capacity(table.len());
        let mut summary = ValidationSummary {
            total_records: table.len(),
            ..ValidationSummary::default()
        };

        for (row, record) in table.records_mut().iter_mut().enumerate() {
            let mut violations: Vec<String> = Vec::new();

            for column in &self.required {
                let Some(idx) = schema.index_of(column) else {
                    continue;
                };
                if !record.get(idx).is_null() {
                    continue;
                }
                match self.policy {
                    MissingValuePolicy::Drop => {
                        violations.push(format!("required:{}", column));
                    }
                    MissingValuePolicy::Fill => {
                        let default = schema
                            .column_type(column)
                            .map(|t| t.default_value())
                            .unwrap_or(crate::domain::model::Value::Null);
                        record.set(idx, default);
                        summary.flagged_missing += 1;
                    }
                    MissingValuePolicy::Flag => {
                        summary.flagged_missing += 1;
                    }
                }
            }

            for (idx, spec) in schema.columns().iter().enumerate() {
                if !record.get(idx).matches_type(spec.column_type) {
                    violations.push(format!("type:{}", spec.name));
                }
            }

            for (column, min, max) in &self.range {
                let Some(idx) = schema.index_of(column) else {
                    continue;
                };
                // A non-numeric cell is already flagged by the type rule and
                // a missing one by the required rule.
                if let Some(v) = record.get(idx).as_f64() {
                    let below = min.map_or(false, |m| v < m);
                    let above = max.map_or(false, |m| v > m);
                    if below || above {
                        violations.push(format!("range:{}", column));
                    }
                }
            }

            for (column, values) in &self.allowed {
                let Some(idx) = schema.index_of(column) else {
                    continue;
                };
                let value = record.get(idx);
                if !value.is_null() && !values.iter().any(|v| v == &value.to_string()) {
                    violations.push(format!("allowed:{}", column));
                }
            }

            for (column, re) in &self.patterns {
                let Some(idx) = schema.index_of(column) else {
                    continue;
                };
                if let crate::domain::model::Value::Text(s) = record.get(idx) {
                    if !re.is_match(s) {
                        violations.push(format!("pattern:{}", column));
                    }
                }
            }

            for (column, min, max) in &self.dateranges {
                let Some(idx) = schema.index_of(column) else {
                    continue;
                };
                // A cell that never parsed to a date is the type rule's
                // problem, a missing one the required rule's.
                if let Some(d) = record.get(idx).as_date() {
                    let before = min.map_or(false, |m| d < m);
                    let after = max.map_or(false, |m| d > m);
                    if before || after {
                        violations.push(format!("daterange:{}", column));
                    }
                }
            }

            for name in &violations {
                *summary.rule_violations.entry(name.clone()).or_default() += 1;
            }
            if violations.is_empty() {
                summary.valid_records += 1;
            } else {
                summary.invalid_records += 1;
            }

            results.push(ValidationResult { row, violations });
        }

        if let Some((columns, multiplier)) = &self.outliers {
            for column in columns {
                let Some(idx) = schema.index_of(column) else {
                    continue;
                };
                let values: Vec<f64> = table
                    .records()
                    .iter()
                    .filter_map(|r| r.get(idx).as_f64())
                    .collect();
                let count = count_iqr_outliers(&values, *multiplier);
                if count > 0 {
                    tracing::debug!(column = %column, count, "IQR outliers found");
                }
                summary.outliers.insert(column.clone(), count);
            }
        }

        ValidationOutcome { results, summary }
    }
}

/// Number of values outside `[Q1 - m*IQR, Q3 + m*IQR]`. Quartiles use linear
/// interpolation over the sorted values. Fewer than four values gives no
/// meaningful spread, so nothing is counted.
fn count_iqr_outliers(values: &[f64], multiplier: f64) -> usize {
    if values.len() < 4 {
        return 0;
    }

    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let q1 = percentile(&sorted, 0.25);
    let q3 = percentile(&sorted, 0.75);
    let iqr = q3 - q1;
    let lower = q1 - multiplier * iqr;
    let upper = q3 + multiplier * iqr;

    values.iter().filter(|&&v| v < lower || v > upper).count()
}

fn percentile(sorted: &[f64], p: f64) -> f64 {
    let rank = p * (sorted.len() - 1) as f64;
    let low = rank.floor() as usize;
    let high = rank.ceil() as usize;
    if low == high {
        sorted[low]
    } else {
        let weight = rank - low as f64;
        sorted[low] * (1.0 - weight) + sorted[high] * weight
    }
}
