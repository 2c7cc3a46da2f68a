// src/schema/types.rs

use std::fmt;

/// Target type a column is coerced to before its checks run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DType {
    Utf8,
    Float64,
    Date,
}

impl fmt::Display for DType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DType::Utf8 => "str",
            DType::Float64 => "float64",
            DType::Date => "date",
        })
    }
}

/// Per-value predicate applied after coercion.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Check {
    /// String length in characters, inclusive.
    StrLength { max: usize },
    /// Numeric lower bound, inclusive.
    Ge(f64),
    /// Exact string equality.
    Eq(&'static str),
}

impl fmt::Display for Check {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Check::StrLength { max } => write!(f, "str_length(max_value={})", max),
            Check::Ge(min) => write!(f, "greater_than_or_equal_to({})", min),
            Check::Eq(value) => write!(f, "equal_to({:?})", value),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ColumnRule {
    pub name: &'static str,
    pub dtype: DType,
    pub checks: &'static [Check],
}

/// A declarative table schema: one rule per column.
#[derive(Debug, Clone, PartialEq)]
pub struct TableSchema {
    pub columns: &'static [ColumnRule],
    /// Reject columns not named by a rule.
    pub strict: bool,
    /// Convert values to the rule's dtype where unambiguous; otherwise the
    /// column must already have that type.
    pub coerce: bool,
}

impl TableSchema {
    pub fn column(&self, name: &str) -> Option<&ColumnRule> {
        self.columns.iter().find(|c| c.name == name)
    }
}
