use crate::config::{BreakdownConfig, ProcessingSection, TrendConfig};
use crate::domain::model::{
    AggregateReport, AggregateValue, ChartStyle, ColumnStats, GroupBreakdown, Table,
    ValidationOutcome,
};
use std::collections::{BTreeMap, HashSet};

/// Computes the fixed aggregate set over the valid subset of a table:
/// count/sum/mean/min/max per numeric column, configured group-by totals, and
/// an optional monthly trend.
///
/// Output is deterministic and order-independent (BTreeMap keys, plain f64
/// accumulation). A zero-count aggregate is `Undefined`, never a raised
/// division error and never a silent zero.
pub struct Processor {
    breakdowns: Vec<BreakdownConfig>,
    trend: Option<TrendConfig>,
}

impl Processor {
    pub fn from_config(section: &ProcessingSection) -> Self {
        Self {
            breakdowns: section.breakdown.clone(),
            trend: section.trend.clone(),
        }
    }

    pub fn process(&self, table: &Table, validation: &ValidationOutcome) -> AggregateReport {
        let valid_rows: Vec<usize> = validation
            .results
            .iter()
            .filter(|r| r.is_valid())
            .map(|r| r.row)
            .collect();

        let mut report = AggregateReport {
            valid_rows: valid_rows.len(),
            ..AggregateReport::default()
        };

        let schema = table.schema();
        for spec in schema.numeric_columns() {
            let Some(idx) = schema.index_of(&spec.name) else {
                continue;
            };
            let values: Vec<f64> = valid_rows
                .iter()
                .filter_map(|&row| table.records()[row].get(idx).as_f64())
                .collect();
            report
                .column_stats
                .insert(spec.name.clone(), column_stats(&values));
        }

        for config in &self.breakdowns {
            report
                .breakdowns
                .insert(config.name.clone(), group_totals(table, &valid_rows, config));
        }

        if let Some(config) = &self.trend {
            report.trend = Some(monthly_trend(table, &valid_rows, config));
        }

        report
    }
}

fn column_stats(values: &[f64]) -> ColumnStats {
    let count = values.len();
    if count == 0 {
        return ColumnStats::default();
    }

    let sum: f64 = values.iter().sum();
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);

    ColumnStats {
        count,
        sum: AggregateValue::Defined(sum),
        mean: AggregateValue::Defined(sum / count as f64),
        min: AggregateValue::Defined(min),
        max: AggregateValue::Defined(max),
    }
}

/// Sum of `config.value` per group key. Keys are collected from every record
/// so a group whose rows were all invalid still shows up, as `Undefined`.
fn group_totals(table: &Table, valid_rows: &[usize], config: &BreakdownConfig) -> GroupBreakdown {
    let schema = table.schema();
    let valid: HashSet<usize> = valid_rows.iter().copied().collect();
    let key_indices: Vec<usize> = config
        .group_by
        .iter()
        .filter_map(|c| schema.index_of(c))
        .collect();
    let value_index = schema.index_of(&config.value);

    let mut totals: BTreeMap<String, Option<f64>> = BTreeMap::new();

    for (row, record) in table.records().iter().enumerate() {
        let parts: Vec<String> = key_indices
            .iter()
            .map(|&i| record.get(i))
            .filter(|v| !v.is_null())
            .map(|v| v.to_string())
            .collect();
        // A record with a missing key contributes to no group.
        if parts.len() != key_indices.len() || parts.is_empty() {
            continue;
        }
        let key = parts.join("/");

        let entry = totals.entry(key).or_insert(None);
        if valid.contains(&row) {
            if let Some(v) = value_index.and_then(|i| record.get(i).as_f64()) {
                *entry = Some(entry.unwrap_or(0.0) + v);
            }
        }
    }

    GroupBreakdown {
        key_columns: config.group_by.clone(),
        value_column: config.value.clone(),
        chart: config.chart,
        totals: totals
            .into_iter()
            .map(|(k, v)| {
                (
                    k,
                    v.map(AggregateValue::Defined)
                        .unwrap_or(AggregateValue::Undefined),
                )
            })
            .collect(),
    }
}

/// Totals of `config.value` bucketed by the `YYYY-MM` of the date column.
fn monthly_trend(table: &Table, valid_rows: &[usize], config: &TrendConfig) -> GroupBreakdown {
    let schema = table.schema();
    let valid: HashSet<usize> = valid_rows.iter().copied().collect();
    let date_index = schema.index_of(&config.date_column);
    let value_index = schema.index_of(&config.value);

    let mut totals: BTreeMap<String, Option<f64>> = BTreeMap::new();

    for (row, record) in table.records().iter().enumerate() {
        let Some(date) = date_index.and_then(|i| record.get(i).as_date()) else {
            continue;
        };
        let month = date.format("%Y-%m").to_string();

        let entry = totals.entry(month).or_insert(None);
        if valid.contains(&row) {
            if let Some(v) = value_index.and_then(|i| record.get(i).as_f64()) {
                *entry = Some(entry.unwrap_or(0.0) + v);
            }
        }
    }

    GroupBreakdown {
        key_columns: vec![config.date_column.clone()],
        value_column: config.value.clone(),
        // The reporter draws trends as line charts regardless.
        chart: ChartStyle::Bar,
        totals: totals
            .into_iter()
            .map(|(k, v)| {
                (
                    k,
                    v.map(AggregateValue::Defined)
                        .unwrap_or(AggregateValue::Undefined),
                )
            })
            .collect(),
    }
}
