pub mod convert;
pub mod types;
pub mod validate;

use arrow::record_batch::RecordBatch;

pub use types::{Check, ColumnRule, DType, TableSchema};
pub use validate::{Mode, ValidatedColumns, ValidationError, Violation};

use crate::process::date_parser;
use crate::table::PriceRecord;

/// The only unit label the dataset is published with.
pub const UNITS: &str = "£/kg";
pub const MAX_ORIGIN_LEN: usize = 50;

pub static PRICE_SCHEMA: TableSchema = TableSchema {
    columns: &[
        ColumnRule {
            name: "Origin",
            dtype: DType::Utf8,
            checks: &[Check::StrLength {
                max: MAX_ORIGIN_LEN,
            }],
        },
        ColumnRule {
            name: "Date",
            dtype: DType::Date,
            checks: &[],
        },
        ColumnRule {
            name: "Price",
            dtype: DType::Float64,
            checks: &[Check::Ge(0.0)],
        },
        ColumnRule {
            name: "Units",
            dtype: DType::Utf8,
            checks: &[Check::Eq(UNITS)],
        },
    ],
    strict: true,
    coerce: true,
};

/// Validate a loaded batch against [`PRICE_SCHEMA`] and convert it to
/// records in batch order. Stops at the first violated rule.
pub fn validate_prices(batch: &RecordBatch) -> Result<Vec<PriceRecord>, ValidationError> {
    price_records(&PRICE_SCHEMA.validate(batch)?)
}

/// Like [`validate_prices`], but lists every violation.
pub fn validate_prices_all(batch: &RecordBatch) -> Result<Vec<PriceRecord>, ValidationError> {
    price_records(&PRICE_SCHEMA.validate_all(batch)?)
}

fn price_records(cols: &ValidatedColumns) -> Result<Vec<PriceRecord>, ValidationError> {
    let missing = |column: &str| {
        ValidationError::single(Violation::MissingColumn {
            column: column.to_string(),
        })
    };
    let origin = cols.utf8("Origin").ok_or_else(|| missing("Origin"))?;
    let date = cols.date("Date").ok_or_else(|| missing("Date"))?;
    let price = cols.float64("Price").ok_or_else(|| missing("Price"))?;
    let units = cols.utf8("Units").ok_or_else(|| missing("Units"))?;

    (0..cols.num_rows())
        .map(|i| {
            let day = date_parser::from_date32(date.value(i)).ok_or_else(|| {
                ValidationError::single(Violation::Coercion {
                    column: "Date".to_string(),
                    expected: DType::Date,
                    rows: vec![i],
                })
            })?;
            Ok(PriceRecord {
                origin: origin.value(i).to_string(),
                date: day,
                price: price.value(i),
                units: units.value(i).to_string(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::parse_csv;
    use chrono::NaiveDate;

    fn csv(rows: &[&str]) -> RecordBatch {
        let text = format!("Origin,Date,Price,Units\n{}\n", rows.join("\n"));
        parse_csv(&text, "Date").unwrap()
    }

    #[test]
    fn test_valid_rows() {
        let records = validate_prices(&csv(&[
            "all_bananas,01/11/2021,0.86,£/kg",
            "colombia,25/10/2021,0,£/kg",
        ]))
        .unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].origin, "all_bananas");
        assert_eq!(records[0].date, NaiveDate::from_ymd_opt(2021, 11, 1).unwrap());
        assert_eq!(records[0].price, 0.86);
        assert_eq!(records[1].units, UNITS);
    }

    #[test]
    fn test_wrong_units_fail() {
        let err = validate_prices(&csv(&[
            "all_bananas,01/11/2021,0.86,£/kg",
            "colombia,25/10/2021,0.84,$/lb",
        ]))
        .unwrap_err();
        assert_eq!(
            err.violations,
            vec![Violation::Check {
                column: "Units".into(),
                check: Check::Eq(UNITS),
                rows: vec![1],
            }]
        );
    }

    #[test]
    fn test_negative_price_fails() {
        let err = validate_prices(&csv(&["colombia,25/10/2021,-1,£/kg"])).unwrap_err();
        assert_eq!(err.violations[0].column(), "Price");
        assert!(err.to_string().contains("greater_than_or_equal_to(0)"), "{err}");
    }

    #[test]
    fn test_origin_length_limit() {
        let fifty = "a".repeat(50);
        let fifty_one = "a".repeat(51);

        let ok = validate_prices(&csv(&[format!("{fifty},25/10/2021,0.84,£/kg").as_str()]));
        assert!(ok.is_ok());

        let err = validate_prices(&csv(&[format!("{fifty_one},25/10/2021,0.84,£/kg").as_str()]))
            .unwrap_err();
        assert_eq!(err.violations[0].column(), "Origin");
    }

    #[test]
    fn test_origin_length_counts_characters() {
        // 50 two-byte characters
        let origin = "é".repeat(50);
        assert!(validate_prices(&csv(&[format!("{origin},25/10/2021,0.84,£/kg").as_str()])).is_ok());
    }

    #[test]
    fn test_non_numeric_price_fails() {
        let err = validate_prices(&csv(&["colombia,25/10/2021,n/a,£/kg"])).unwrap_err();
        assert!(matches!(
            err.violations[0],
            Violation::Coercion { ref column, .. } if column == "Price"
        ));
    }

    #[test]
    fn test_infinite_price_fails() {
        let err = validate_prices(&csv(&["colombia,01/11/2021,inf,£/kg"])).unwrap_err();
        assert_eq!(
            err.violations,
            vec![Violation::Coercion {
                column: "Price".into(),
                expected: DType::Float64,
                rows: vec![0],
            }]
        );
    }

    #[test]
    fn test_extra_column_fails() {
        let text = "Origin,Date,Price,Units,Market\ncolombia,25/10/2021,0.84,£/kg,London\n";
        let err = validate_prices(&parse_csv(text, "Date").unwrap()).unwrap_err();
        assert_eq!(
            err.violations,
            vec![Violation::UnexpectedColumn {
                column: "Market".into()
            }]
        );
    }

    #[test]
    fn test_aggregate_lists_all_columns() {
        let err = validate_prices_all(&csv(&[format!("{},25/10/2021,-1,$/lb", "a".repeat(51)).as_str()]))
        .unwrap_err();
        let columns: Vec<&str> = err.violations.iter().map(Violation::column).collect();
        assert_eq!(columns, vec!["Origin", "Price", "Units"]);
    }
}
