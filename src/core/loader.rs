use crate::domain::model::{ColumnType, LoadOutcome, Record, Schema, Table, Value};
use crate::utils::error::{PipelineError, Result};
use chrono::NaiveDate;
use csv::{ReaderBuilder, Trim};
use std::collections::HashSet;
use std::path::PathBuf;

/// Reads a comma-separated UTF-8 file with a header row into a `Table`.
///
/// A missing or unreadable file is fatal; a row that fails to parse
/// structurally is counted as skipped and the run continues. Cells are parsed
/// best-effort against the declared column type; a cell that does not parse
/// is kept as text so the validator can name the violation.
pub struct CsvLoader {
    path: PathBuf,
    schema: Schema,
    drop_duplicates: bool,
}

impl CsvLoader {
    pub fn new(path: impl Into<PathBuf>, schema: Schema, drop_duplicates: bool) -> Self {
        Self {
            path: path.into(),
            schema,
            drop_duplicates,
        }
    }

    pub fn load(&self) -> Result<LoadOutcome> {
        if !self.path.exists() {
            return Err(PipelineError::FileNotFound {
                path: self.path.clone(),
            });
        }

        let mut reader = ReaderBuilder::new()
            .flexible(true)
            .trim(Trim::All)
            .from_path(&self.path)?;

        let headers = reader.headers()?.clone();

        // Map each schema column to its position in the header. Columns the
        // header lacks load as Null; if the header matches nothing, there is
        // no recognizable schema and the run aborts.
        let mapping: Vec<Option<usize>> = self
            .schema
            .columns()
            .iter()
            .map(|spec| headers.iter().position(|h| h == spec.name))
            .collect();

        if mapping.iter().all(Option::is_none) {
            return Err(PipelineError::SchemaMissing {
                path: self.path.clone(),
                message: format!(
                    "header [{}] contains none of the expected columns [{}]",
                    headers.iter().collect::<Vec<_>>().join(", "),
                    self.schema.column_names().join(", ")
                ),
            });
        }

        let expected_fields = headers.len();
        let mut records = Vec::new();
        let mut skipped_rows = 0usize;
        let mut duplicate_rows = 0usize;
        let mut seen: HashSet<String> = HashSet::new();

        for row in reader.records() {
            let row = match row {
                Ok(row) => row,
                Err(e) => {
                    tracing::warn!("skipping unparseable row: {}", e);
                    skipped_rows += 1;
                    continue;
                }
            };

            if row.len() != expected_fields {
                tracing::debug!(
                    got = row.len(),
                    expected = expected_fields,
                    "skipping row with wrong field count"
                );
                skipped_rows += 1;
                continue;
            }

            let fingerprint = row.iter().collect::<Vec<_>>().join("\u{1f}");
            if !seen.insert(fingerprint) {
                duplicate_rows += 1;
                if self.drop_duplicates {
                    continue;
                }
            }

            let values = self
                .schema
                .columns()
                .iter()
                .zip(&mapping)
                .map(|(spec, idx)| match idx {
                    Some(i) => parse_cell(row.get(*i).unwrap_or(""), spec.column_type),
                    None => Value::Null,
                })
                .collect();

            records.push(Record::new(values));
        }

        Ok(LoadOutcome {
            table: Table::new(self.schema.clone(), records),
            skipped_rows,
            duplicate_rows,
        })
    }
}

fn parse_cell(raw: &str, column_type: ColumnType) -> Value {
    let raw = raw.trim();
    if raw.is_empty() {
        return Value::Null;
    }

    match column_type {
        ColumnType::Integer => raw
            .parse::<i64>()
            .map(Value::Integer)
            .unwrap_or_else(|_| Value::Text(raw.to_string())),
        ColumnType::Float => raw
            .parse::<f64>()
            .map(Value::Float)
            .unwrap_or_else(|_| Value::Text(raw.to_string())),
        ColumnType::Text => Value::Text(raw.to_string()),
        ColumnType::Date => parse_date(raw)
            .map(Value::Date)
            .unwrap_or_else(|| Value::Text(raw.to_string())),
    }
}

fn parse_date(raw: &str) -> Option<NaiveDate> {
    const FORMATS: [&str; 3] = ["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y"];
    FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(raw, fmt).ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::ColumnSpec;
    use std::io::Write;

    fn sales_schema() -> Schema {
        Schema::new(vec![
            ColumnSpec {
                name: "region".to_string(),
                column_type: ColumnType::Text,
            },
            ColumnSpec {
                name: "amount".to_string(),
                column_type: ColumnType::Float,
            },
        ])
    }

    fn write_csv(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_parse_cell_types() {
        assert_eq!(parse_cell("42", ColumnType::Integer), Value::Integer(42));
        assert_eq!(parse_cell("1.5", ColumnType::Float), Value::Float(1.5));
        assert_eq!(
            parse_cell("bad", ColumnType::Float),
            Value::Text("bad".to_string())
        );
        assert_eq!(parse_cell("", ColumnType::Float), Value::Null);
        assert_eq!(
            parse_cell("2024-05-09", ColumnType::Date),
            Value::Date(NaiveDate::from_ymd_opt(2024, 5, 9).unwrap())
        );
    }

    #[test]
    fn test_load_valid_rows_round_trip() {
        let file = write_csv("region,amount\nnorth,100\nsouth,200\neast,50\n");
        let loader = CsvLoader::new(file.path(), sales_schema(), false);
        let outcome = loader.load().unwrap();

        assert_eq!(outcome.table.len(), 3);
        assert_eq!(outcome.skipped_rows, 0);
        assert_eq!(
            outcome.table.value(0, "amount"),
            Some(&Value::Float(100.0))
        );
    }

    #[test]
    fn test_wrong_field_count_is_skipped_not_fatal() {
        let file = write_csv("region,amount\nnorth,100\nsouth\nwest,30\n");
        let loader = CsvLoader::new(file.path(), sales_schema(), false);
        let outcome = loader.load().unwrap();

        assert_eq!(outcome.table.len(), 2);
        assert_eq!(outcome.skipped_rows, 1);
    }

    #[test]
    fn test_missing_file_is_fatal() {
        let loader = CsvLoader::new("./no_such_file.csv", sales_schema(), false);
        assert!(matches!(
            loader.load(),
            Err(PipelineError::FileNotFound { .. })
        ));
    }

    #[test]
    fn test_unrecognizable_header_is_fatal() {
        let file = write_csv("a,b\n1,2\n");
        let loader = CsvLoader::new(file.path(), sales_schema(), false);
        assert!(matches!(
            loader.load(),
            Err(PipelineError::SchemaMissing { .. })
        ));
    }

    #[test]
    fn test_duplicates_counted_and_optionally_dropped() {
        let file = write_csv("region,amount\nnorth,100\nnorth,100\nsouth,50\n");

        let keep = CsvLoader::new(file.path(), sales_schema(), false)
            .load()
            .unwrap();
        assert_eq!(keep.table.len(), 3);
        assert_eq!(keep.duplicate_rows, 1);

        let drop = CsvLoader::new(file.path(), sales_schema(), true)
            .load()
            .unwrap();
        assert_eq!(drop.table.len(), 2);
        assert_eq!(drop.duplicate_rows, 1);
    }

    #[test]
    fn test_column_absent_from_header_loads_null() {
        let file = write_csv("region\nnorth\n");
        let loader = CsvLoader::new(file.path(), sales_schema(), false);
        let outcome = loader.load().unwrap();

        assert_eq!(outcome.table.value(0, "amount"), Some(&Value::Null));
    }
}
