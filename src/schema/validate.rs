// src/schema/validate.rs

use arrow::{
    array::{Array, Date32Array, Float64Array, StringArray},
    record_batch::RecordBatch,
};
use std::fmt;
use thiserror::Error;
use tracing::debug;

use super::convert::{coerce_column, CoerceError, Coerced};
use super::types::{Check, DType, TableSchema};

/// Rows listed in a violation message before it is truncated.
const SHOWN_ROWS: usize = 10;

#[derive(Debug, Clone, PartialEq)]
pub enum Violation {
    MissingColumn {
        column: String,
    },
    UnexpectedColumn {
        column: String,
    },
    DuplicateColumn {
        column: String,
    },
    WrongType {
        column: String,
        expected: DType,
        found: String,
    },
    Coercion {
        column: String,
        expected: DType,
        rows: Vec<usize>,
    },
    Check {
        column: String,
        check: Check,
        rows: Vec<usize>,
    },
    /// The rule pairs a check with a dtype it cannot inspect.
    InapplicableCheck {
        column: String,
        check: Check,
        dtype: DType,
    },
}

impl Violation {
    pub fn column(&self) -> &str {
        match self {
            Violation::MissingColumn { column }
            | Violation::UnexpectedColumn { column }
            | Violation::DuplicateColumn { column }
            | Violation::WrongType { column, .. }
            | Violation::Coercion { column, .. }
            | Violation::Check { column, .. }
            | Violation::InapplicableCheck { column, .. } => column,
        }
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Violation::MissingColumn { column } => write!(f, "column '{}' is missing", column),
            Violation::UnexpectedColumn { column } => {
                write!(f, "column '{}' is not in the schema", column)
            }
            Violation::DuplicateColumn { column } => {
                write!(f, "column '{}' appears more than once", column)
            }
            Violation::WrongType {
                column,
                expected,
                found,
            } => write!(
                f,
                "column '{}' has type {}, expected {}",
                column, found, expected
            ),
            Violation::Coercion {
                column,
                expected,
                rows,
            } => write!(
                f,
                "column '{}' could not be coerced to {} at rows {}",
                column,
                expected,
                RowList(rows)
            ),
            Violation::Check {
                column,
                check,
                rows,
            } => write!(
                f,
                "column '{}' failed {} at rows {}",
                column,
                check,
                RowList(rows)
            ),
            Violation::InapplicableCheck {
                column,
                check,
                dtype,
            } => write!(f, "column '{}': {} cannot apply to {}", column, check, dtype),
        }
    }
}

struct RowList<'a>(&'a [usize]);

impl fmt::Display for RowList<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let shown: Vec<String> = self.0.iter().take(SHOWN_ROWS).map(usize::to_string).collect();
        write!(f, "[{}", shown.join(", "))?;
        if self.0.len() > SHOWN_ROWS {
            write!(f, ", ... {} more", self.0.len() - SHOWN_ROWS)?;
        }
        f.write_str("]")
    }
}

fn join_violations(violations: &[Violation]) -> String {
    violations
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

#[derive(Debug, Clone, PartialEq, Error)]
#[error("schema validation failed: {}", join_violations(.violations))]
pub struct ValidationError {
    pub violations: Vec<Violation>,
}

impl ValidationError {
    pub fn single(violation: Violation) -> Self {
        Self {
            violations: vec![violation],
        }
    }
}

/// Stop at the first violation, or collect all of them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    FailFast,
    Aggregate,
}

struct Report {
    mode: Mode,
    violations: Vec<Violation>,
}

impl Report {
    fn push(&mut self, violation: Violation) -> Result<(), ValidationError> {
        debug!(%violation, "schema violation");
        if self.mode == Mode::FailFast {
            return Err(ValidationError::single(violation));
        }
        self.violations.push(violation);
        Ok(())
    }

    fn finish(self) -> Result<(), ValidationError> {
        if self.violations.is_empty() {
            Ok(())
        } else {
            Err(ValidationError {
                violations: self.violations,
            })
        }
    }
}

/// Columns that passed validation, coerced to their declared types.
#[derive(Debug, Clone)]
pub struct ValidatedColumns {
    columns: Vec<(&'static str, Coerced)>,
    num_rows: usize,
}

impl ValidatedColumns {
    pub fn num_rows(&self) -> usize {
        self.num_rows
    }

    fn get(&self, name: &str) -> Option<&Coerced> {
        self.columns
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, c)| c)
    }

    pub fn utf8(&self, name: &str) -> Option<&StringArray> {
        match self.get(name)? {
            Coerced::Utf8(a) => Some(a),
            _ => None,
        }
    }

    pub fn float64(&self, name: &str) -> Option<&Float64Array> {
        match self.get(name)? {
            Coerced::Float64(a) => Some(a),
            _ => None,
        }
    }

    pub fn date(&self, name: &str) -> Option<&Date32Array> {
        match self.get(name)? {
            Coerced::Date(a) => Some(a),
            _ => None,
        }
    }
}

impl TableSchema {
    /// Validate `batch`, failing on the first violation.
    pub fn validate(&self, batch: &RecordBatch) -> Result<ValidatedColumns, ValidationError> {
        self.evaluate(batch, Mode::FailFast)
    }

    /// Validate `batch`, reporting every violation at once.
    pub fn validate_all(&self, batch: &RecordBatch) -> Result<ValidatedColumns, ValidationError> {
        self.evaluate(batch, Mode::Aggregate)
    }

    pub fn evaluate(
        &self,
        batch: &RecordBatch,
        mode: Mode,
    ) -> Result<ValidatedColumns, ValidationError> {
        let schema = batch.schema();
        let mut report = Report {
            mode,
            violations: Vec::new(),
        };

        // 1) column presence
        if self.strict {
            for field in schema.fields() {
                if self.column(field.name()).is_none() {
                    report.push(Violation::UnexpectedColumn {
                        column: field.name().clone(),
                    })?;
                }
            }
        }
        for rule in self.columns {
            match schema.fields().iter().filter(|f| f.name() == rule.name).count() {
                0 => report.push(Violation::MissingColumn {
                    column: rule.name.to_string(),
                })?,
                1 => {}
                _ => report.push(Violation::DuplicateColumn {
                    column: rule.name.to_string(),
                })?,
            }
        }

        // 2) coercion, then checks, column by column
        let mut columns = Vec::with_capacity(self.columns.len());
        for rule in self.columns {
            let Some(arr) = batch.column_by_name(rule.name) else {
                continue;
            };
            let col = match coerce_column(arr, rule.dtype, self.coerce) {
                Ok(col) => col,
                Err(CoerceError::WrongType { found }) => {
                    report.push(Violation::WrongType {
                        column: rule.name.to_string(),
                        expected: rule.dtype,
                        found: found.to_string(),
                    })?;
                    continue;
                }
                Err(CoerceError::Values { rows }) => {
                    report.push(Violation::Coercion {
                        column: rule.name.to_string(),
                        expected: rule.dtype,
                        rows,
                    })?;
                    continue;
                }
            };

            for check in rule.checks {
                match failing_rows(&col, check) {
                    Some(rows) if rows.is_empty() => {}
                    Some(rows) => report.push(Violation::Check {
                        column: rule.name.to_string(),
                        check: *check,
                        rows,
                    })?,
                    None => report.push(Violation::InapplicableCheck {
                        column: rule.name.to_string(),
                        check: *check,
                        dtype: rule.dtype,
                    })?,
                }
            }
            columns.push((rule.name, col));
        }

        report.finish()?;
        Ok(ValidatedColumns {
            columns,
            num_rows: batch.num_rows(),
        })
    }
}

/// Row indices failing `check`, or `None` when the check does not apply
/// to the column's type.
fn failing_rows(col: &Coerced, check: &Check) -> Option<Vec<usize>> {
    let rows = match (col, check) {
        (Coerced::Utf8(a), Check::StrLength { max }) => (0..a.len())
            .filter(|&i| a.value(i).chars().count() > *max)
            .collect(),
        (Coerced::Utf8(a), Check::Eq(expected)) => (0..a.len())
            .filter(|&i| a.value(i) != *expected)
            .collect(),
        // NaN never satisfies the bound
        (Coerced::Float64(a), Check::Ge(min)) => (0..a.len())
            .filter(|&i| !(a.value(i) >= *min))
            .collect(),
        _ => return None,
    };
    Some(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::types::ColumnRule;
    use arrow::{
        array::ArrayRef,
        datatypes::{DataType, Field, Schema},
    };
    use std::sync::Arc;

    static FRUIT: TableSchema = TableSchema {
        columns: &[
            ColumnRule {
                name: "Name",
                dtype: DType::Utf8,
                checks: &[Check::StrLength { max: 5 }],
            },
            ColumnRule {
                name: "Weight",
                dtype: DType::Float64,
                checks: &[Check::Ge(0.0)],
            },
        ],
        strict: true,
        coerce: true,
    };

    fn batch(columns: &[(&str, &[&str])]) -> RecordBatch {
        let fields: Vec<Field> = columns
            .iter()
            .map(|(name, _)| Field::new(*name, DataType::Utf8, true))
            .collect();
        let arrays: Vec<ArrayRef> = columns
            .iter()
            .map(|(_, values)| Arc::new(StringArray::from(values.to_vec())) as ArrayRef)
            .collect();
        RecordBatch::try_new(Arc::new(Schema::new(fields)), arrays).unwrap()
    }

    #[test]
    fn test_valid_batch_is_coerced() {
        let b = batch(&[("Name", &["kiwi", "fig"]), ("Weight", &["0.1", "0"])]);
        let cols = FRUIT.validate(&b).unwrap();
        assert_eq!(cols.num_rows(), 2);
        assert_eq!(cols.float64("Weight").unwrap().value(0), 0.1);
        assert!(cols.utf8("Weight").is_none());
    }

    #[test]
    fn test_fail_fast_reports_first_violation() {
        let b = batch(&[("Name", &["banana", "fig"]), ("Weight", &["-1", "x"])]);
        let err = FRUIT.validate(&b).unwrap_err();
        assert_eq!(
            err.violations,
            vec![Violation::Check {
                column: "Name".into(),
                check: Check::StrLength { max: 5 },
                rows: vec![0],
            }]
        );
    }

    #[test]
    fn test_aggregate_reports_everything() {
        let b = batch(&[
            ("Name", &["banana", "fig"]),
            ("Weight", &["-1", "x"]),
            ("Colour", &["yellow", "purple"]),
        ]);
        let err = FRUIT.validate_all(&b).unwrap_err();
        let columns: Vec<&str> = err.violations.iter().map(Violation::column).collect();
        assert_eq!(columns, vec!["Colour", "Name", "Weight"]);
        assert!(matches!(
            err.violations[2],
            Violation::Coercion { ref rows, .. } if rows == &vec![1]
        ));
    }

    #[test]
    fn test_missing_column() {
        let b = batch(&[("Name", &["fig"])]);
        let err = FRUIT.validate(&b).unwrap_err();
        assert_eq!(
            err.violations,
            vec![Violation::MissingColumn {
                column: "Weight".into()
            }]
        );
        assert!(err.to_string().contains("'Weight' is missing"), "{err}");
    }

    #[test]
    fn test_non_strict_allows_extra_columns() {
        let lenient = TableSchema {
            strict: false,
            ..FRUIT.clone()
        };
        let b = batch(&[("Name", &["fig"]), ("Weight", &["1"]), ("Colour", &["purple"])]);
        assert!(lenient.validate(&b).is_ok());
        assert!(FRUIT.validate(&b).is_err());
    }

    #[test]
    fn test_inapplicable_check() {
        static ODD: TableSchema = TableSchema {
            columns: &[ColumnRule {
                name: "Name",
                dtype: DType::Utf8,
                checks: &[Check::Ge(0.0)],
            }],
            strict: true,
            coerce: true,
        };
        let b = batch(&[("Name", &["fig"])]);
        let err = ODD.validate(&b).unwrap_err();
        assert!(matches!(err.violations[0], Violation::InapplicableCheck { .. }));
    }

    #[test]
    fn test_row_list_truncates() {
        let rows: Vec<usize> = (0..12).collect();
        assert_eq!(
            RowList(&rows).to_string(),
            "[0, 1, 2, 3, 4, 5, 6, 7, 8, 9, ... 2 more]"
        );
    }
}
