use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

/// Declared type of a schema column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    Integer,
    Float,
    Text,
    Date,
}

impl ColumnType {
    pub fn is_numeric(self) -> bool {
        matches!(self, ColumnType::Integer | ColumnType::Float)
    }

    /// Zero value used by the `fill` missing-value policy.
    pub fn default_value(self) -> Value {
        match self {
            ColumnType::Integer => Value::Integer(0),
            ColumnType::Float => Value::Float(0.0),
            ColumnType::Text => Value::Text(String::new()),
            ColumnType::Date => Value::Null,
        }
    }
}

/// One scalar cell. `Null` stands for a missing (empty) cell; a cell that
/// failed to parse to its declared type is kept as `Text` so the validator
/// can name the violation.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Integer(i64),
    Float(f64),
    Text(String),
    Date(NaiveDate),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Integer(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            Value::Date(d) => Some(*d),
            _ => None,
        }
    }

    /// Whether this value satisfies the declared column type. `Null` is a
    /// missing value, not a type mismatch; the `required` rule owns it.
    pub fn matches_type(&self, column_type: ColumnType) -> bool {
        match (self, column_type) {
            (Value::Null, _) => true,
            (Value::Integer(_), ColumnType::Integer) => true,
            (Value::Integer(_) | Value::Float(_), ColumnType::Float) => true,
            (Value::Text(_), ColumnType::Text) => true,
            (Value::Date(_), ColumnType::Date) => true,
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => Ok(()),
            Value::Integer(i) => write!(f, "{}", i),
            Value::Float(v) => write!(f, "{}", v),
            Value::Text(s) => write!(f, "{}", s),
            Value::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnSpec {
    pub name: String,
    #[serde(rename = "type")]
    pub column_type: ColumnType,
}

/// Ordered list of expected columns with their declared types.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Schema {
    columns: Vec<ColumnSpec>,
}

impl Schema {
    pub fn new(columns: Vec<ColumnSpec>) -> Self {
        Self { columns }
    }

    pub fn columns(&self) -> &[ColumnSpec] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    pub fn column_type(&self, name: &str) -> Option<ColumnType> {
        self.columns
            .iter()
            .find(|c| c.name == name)
            .map(|c| c.column_type)
    }

    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }

    pub fn numeric_columns(&self) -> Vec<&ColumnSpec> {
        self.columns
            .iter()
            .filter(|c| c.column_type.is_numeric())
            .collect()
    }
}

/// One parsed input row, values aligned with the schema order.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    values: Vec<Value>,
}

impl Record {
    pub fn new(values: Vec<Value>) -> Self {
        Self { values }
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn get(&self, index: usize) -> &Value {
        self.values.get(index).unwrap_or(&Value::Null)
    }

    pub(crate) fn set(&mut self, index: usize, value: Value) {
        if index < self.values.len() {
            self.values[index] = value;
        }
    }
}

/// Ordered collection of records sharing a schema. Owned by the loader,
/// borrowed by the validator and processor.
#[derive(Debug, Clone)]
pub struct Table {
    schema: Schema,
    records: Vec<Record>,
}

impl Table {
    pub fn new(schema: Schema, records: Vec<Record>) -> Self {
        Self { schema, records }
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn records_mut(&mut self) -> &mut [Record] {
        &mut self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Cell lookup by row index and column name.
    pub fn value(&self, row: usize, column: &str) -> Option<&Value> {
        let idx = self.schema.index_of(column)?;
        self.records.get(row).map(|r| r.get(idx))
    }
}

/// How the validator treats a missing (empty) cell in a required column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MissingValuePolicy {
    /// Record is invalid and excluded from aggregation (documented default).
    #[default]
    Drop,
    /// Coerce to the column type's zero value; record stays valid.
    Fill,
    /// Count the miss in the summary; record stays valid.
    Flag,
}

/// Per-record verdict: valid iff no rule was violated.
#[derive(Debug, Clone)]
pub struct ValidationResult {
    pub row: usize,
    pub violations: Vec<String>,
}

impl ValidationResult {
    pub fn is_valid(&self) -> bool {
        self.violations.is_empty()
    }
}

/// Dataset-level validation summary. `rule_violations` maps rule name to the
/// number of records that violated it, so the final report is auditable.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ValidationSummary {
    pub total_records: usize,
    pub valid_records: usize,
    pub invalid_records: usize,
    pub rule_violations: BTreeMap<String, usize>,
    /// Rows the loader skipped for structural reasons (wrong field count).
    pub skipped_rows: usize,
    /// Exact duplicate rows seen by the loader.
    pub duplicate_rows: usize,
    /// Missing cells tolerated under the `fill` or `flag` policies.
    pub flagged_missing: usize,
    /// IQR outlier counts per checked column. Report-only: an outlier never
    /// invalidates its record.
    pub outliers: BTreeMap<String, usize>,
}

#[derive(Debug, Clone)]
pub struct ValidationOutcome {
    pub results: Vec<ValidationResult>,
    pub summary: ValidationSummary,
}

/// A computed metric. A zero-count aggregate is `Undefined`, never a
/// division-by-zero failure and never a silent zero.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum AggregateValue {
    Defined(f64),
    #[default]
    Undefined,
}

impl AggregateValue {
    pub fn defined(self) -> Option<f64> {
        match self {
            AggregateValue::Defined(v) => Some(v),
            AggregateValue::Undefined => None,
        }
    }

    pub fn is_undefined(self) -> bool {
        matches!(self, AggregateValue::Undefined)
    }
}

impl fmt::Display for AggregateValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AggregateValue::Defined(v) => write!(f, "{}", v),
            AggregateValue::Undefined => write!(f, "undefined"),
        }
    }
}

impl Serialize for AggregateValue {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.defined().serialize(serializer)
    }
}

/// Descriptive statistics for one numeric column, over valid records only.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ColumnStats {
    pub count: usize,
    pub sum: AggregateValue,
    pub mean: AggregateValue,
    pub min: AggregateValue,
    pub max: AggregateValue,
}

/// How the reporter draws a group breakdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartStyle {
    #[default]
    Bar,
    /// Share-of-total view; drawn as a pie chart.
    Pie,
}

/// Group-by totals of one numeric column keyed by categorical column(s).
/// A key whose every contributing record was invalid stays present, as
/// `Undefined`.
#[derive(Debug, Clone, Serialize)]
pub struct GroupBreakdown {
    pub key_columns: Vec<String>,
    pub value_column: String,
    pub chart: ChartStyle,
    pub totals: BTreeMap<String, AggregateValue>,
}

/// The processor's output: metric name to computed value, consumed read-only
/// by the reporter.
#[derive(Debug, Clone, Default, Serialize)]
pub struct AggregateReport {
    pub valid_rows: usize,
    pub column_stats: BTreeMap<String, ColumnStats>,
    pub breakdowns: BTreeMap<String, GroupBreakdown>,
    /// Monthly totals keyed "YYYY-MM", when a trend is configured.
    pub trend: Option<GroupBreakdown>,
}

impl AggregateReport {
    /// Flatten into one-metric-per-line pairs, in deterministic order.
    pub fn metrics(&self) -> Vec<(String, AggregateValue)> {
        let mut out = Vec::new();
        out.push((
            "valid_rows".to_string(),
            AggregateValue::Defined(self.valid_rows as f64),
        ));

        for (column, stats) in &self.column_stats {
            out.push((
                format!("{}.count", column),
                AggregateValue::Defined(stats.count as f64),
            ));
            out.push((format!("{}.sum", column), stats.sum));
            out.push((format!("{}.mean", column), stats.mean));
            out.push((format!("{}.min", column), stats.min));
            out.push((format!("{}.max", column), stats.max));
        }

        for (name, breakdown) in &self.breakdowns {
            for (key, value) in &breakdown.totals {
                out.push((format!("{}[{}]", name, key), *value));
            }
        }

        if let Some(trend) = &self.trend {
            for (month, value) in &trend.totals {
                out.push((format!("trend[{}]", month), *value));
            }
        }

        out
    }
}

/// What the loader hands downstream.
#[derive(Debug)]
pub struct LoadOutcome {
    pub table: Table,
    pub skipped_rows: usize,
    pub duplicate_rows: usize,
}

/// What the reporter managed to write. Write failures are warnings, not
/// errors; the run completes with whatever succeeded.
#[derive(Debug, Default)]
pub struct ReportOutcome {
    pub written: Vec<PathBuf>,
    pub warnings: Vec<String>,
}

/// Final run summary returned by the engine.
#[derive(Debug)]
pub struct RunSummary {
    pub loaded_records: usize,
    pub validation: ValidationSummary,
    pub outputs: Vec<PathBuf>,
    pub warnings: Vec<String>,
}
