// src/table.rs

use arrow::record_batch::RecordBatch;
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::BTreeSet;

use crate::schema::{self, ValidationError};

/// Origin value of the aggregate series, selected by default.
pub const ALL_ORIGINS: &str = "all_bananas";

/// One weekly price observation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriceRecord {
    pub origin: String,
    pub date: NaiveDate,
    /// GBP per kilogram.
    pub price: f64,
    pub units: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PricePoint {
    pub date: NaiveDate,
    pub price: f64,
}

/// Selection made in the dashboard; both dates inclusive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PriceFilter {
    pub origin: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
}

/// Validated prices, sorted by date. Never mutated once built.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PriceTable {
    records: Vec<PriceRecord>,
}

impl PriceTable {
    /// Stable sort, so rows sharing a date keep their file order.
    pub fn from_records(mut records: Vec<PriceRecord>) -> Self {
        records.sort_by_key(|r| r.date);
        Self { records }
    }

    /// Validate a loaded batch and sort it.
    pub fn from_batch(batch: &RecordBatch) -> Result<Self, ValidationError> {
        schema::validate_prices(batch).map(Self::from_records)
    }

    pub fn records(&self) -> &[PriceRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Distinct origins in sorted order, always including [`ALL_ORIGINS`].
    pub fn origins(&self) -> Vec<String> {
        let mut set: BTreeSet<&str> = self.records.iter().map(|r| r.origin.as_str()).collect();
        set.insert(ALL_ORIGINS);
        set.into_iter().map(str::to_string).collect()
    }

    /// Earliest and latest date, `None` for an empty table.
    pub fn date_bounds(&self) -> Option<(NaiveDate, NaiveDate)> {
        Some((self.records.first()?.date, self.records.last()?.date))
    }

    /// Chart series for one origin within `[start, end]`, in date order.
    pub fn series(&self, filter: &PriceFilter) -> Vec<PricePoint> {
        self.records
            .iter()
            .filter(|r| r.origin == filter.origin)
            .filter(|r| filter.start <= r.date && r.date <= filter.end)
            .map(|r| PricePoint {
                date: r.date,
                price: r.price,
            })
            .collect()
    }
}
