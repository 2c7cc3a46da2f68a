// src/process/mod.rs
pub mod date_parser;
pub mod decode;

use arrow::{
    array::{ArrayRef, Date32Builder, StringArray},
    datatypes::{DataType, Field, Schema},
    error::ArrowError,
    record_batch::RecordBatch,
};
use csv::{ReaderBuilder, Trim};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, trace};

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("CSV parse error at record {record}: {source}")]
    Csv {
        record: usize,
        #[source]
        source: csv::Error,
    },
    #[error("CSV header has no {0:?} column")]
    MissingColumn(String),
    #[error("row {row}: {column} value {value:?} does not match {format}")]
    Date {
        row: usize,
        column: String,
        value: String,
        format: &'static str,
    },
    #[error("building record batch: {0}")]
    Arrow(#[from] ArrowError),
}

/// Parse CSV text into a single record batch.
///
/// Every column is kept as `Utf8` except `date_column`, which must parse
/// under the source `DD/MM/YYYY` layout on every row and becomes `Date32`.
/// Record 0 is the header; data rows are numbered from 0 in errors.
pub fn parse_csv(text: &str, date_column: &str) -> Result<RecordBatch, ParseError> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .trim(Trim::All)
        .from_reader(text.as_bytes());

    let headers: Vec<String> = rdr
        .headers()
        .map_err(|source| ParseError::Csv { record: 0, source })?
        .iter()
        .map(str::to_string)
        .collect();
    let date_idx = headers
        .iter()
        .position(|h| h == date_column)
        .ok_or_else(|| ParseError::MissingColumn(date_column.to_string()))?;
    trace!(?headers, "parsed CSV header");

    // column-major buffers, one per header
    let mut columns: Vec<Vec<String>> = vec![Vec::new(); headers.len()];
    for (idx, result) in rdr.records().enumerate() {
        let record = result.map_err(|source| ParseError::Csv {
            record: idx + 1,
            source,
        })?;
        for (col, field) in columns.iter_mut().zip(record.iter()) {
            col.push(field.to_string());
        }
    }

    let mut fields = Vec::with_capacity(headers.len());
    let mut arrays: Vec<ArrayRef> = Vec::with_capacity(headers.len());
    for (i, (name, values)) in headers.iter().zip(columns).enumerate() {
        if i == date_idx {
            let mut b = Date32Builder::with_capacity(values.len());
            for (row, value) in values.iter().enumerate() {
                let date = date_parser::parse_source_date(value).ok_or_else(|| {
                    ParseError::Date {
                        row,
                        column: name.clone(),
                        value: value.clone(),
                        format: date_parser::SOURCE_DATE_FORMAT,
                    }
                })?;
                b.append_value(date_parser::to_date32(date));
            }
            fields.push(Field::new(name, DataType::Date32, false));
            arrays.push(Arc::new(b.finish()));
        } else {
            fields.push(Field::new(name, DataType::Utf8, false));
            arrays.push(Arc::new(StringArray::from(values)));
        }
    }

    let batch = RecordBatch::try_new(Arc::new(Schema::new(fields)), arrays)?;
    debug!(
        rows = batch.num_rows(),
        columns = batch.num_columns(),
        "parsed CSV"
    );
    Ok(batch)
}
