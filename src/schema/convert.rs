use arrow::{
    array::{Array, ArrayRef, Date32Array, Date32Builder, Float64Array, Float64Builder, StringArray},
    compute::cast,
    datatypes::DataType,
};
use tracing::trace;

use super::types::DType;
use crate::process::date_parser;

/// A column after coercion to its rule's dtype.
#[derive(Debug, Clone)]
pub enum Coerced {
    Utf8(StringArray),
    Float64(Float64Array),
    Date(Date32Array),
}

impl Coerced {
    pub fn as_array(&self) -> &dyn Array {
        match self {
            Coerced::Utf8(a) => a as &dyn Array,
            Coerced::Float64(a) => a as &dyn Array,
            Coerced::Date(a) => a as &dyn Array,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum CoerceError {
    /// Column type differs and coercion is off or impossible.
    WrongType { found: DataType },
    /// Rows whose value is null or could not be converted.
    Values { rows: Vec<usize> },
}

/// Convert `arr` to `dtype`.
///
/// Text is parsed (numbers via `f64` parsing, dates via the source
/// `DD/MM/YYYY` layout or ISO); other arrow types go through arrow's safe
/// cast. Nulls, in the input or from failed conversion, are errors, as are
/// non-finite floats.
pub fn coerce_column(arr: &ArrayRef, dtype: DType, coerce: bool) -> Result<Coerced, CoerceError> {
    let found = arr.data_type().clone();
    let coerced = match (dtype, &found) {
        (DType::Utf8, DataType::Utf8) => Coerced::Utf8(downcast::<StringArray>(arr)?.clone()),
        (DType::Float64, DataType::Float64) => {
            Coerced::Float64(downcast::<Float64Array>(arr)?.clone())
        }
        (DType::Date, DataType::Date32) => Coerced::Date(downcast::<Date32Array>(arr)?.clone()),
        _ if !coerce => {
            return Err(CoerceError::WrongType {
                found: found.clone(),
            })
        }

        // Text → f64
        (DType::Float64, DataType::Utf8) => {
            let sarr = downcast::<StringArray>(arr)?;
            let mut b = Float64Builder::with_capacity(sarr.len());
            for opt in sarr.iter() {
                b.append_option(opt.and_then(|s| s.trim().parse::<f64>().ok()));
            }
            Coerced::Float64(b.finish())
        }

        // Text → date
        (DType::Date, DataType::Utf8) => {
            let sarr = downcast::<StringArray>(arr)?;
            let mut b = Date32Builder::with_capacity(sarr.len());
            for opt in sarr.iter() {
                b.append_option(
                    opt.and_then(date_parser::parse_any_date)
                        .map(date_parser::to_date32),
                );
            }
            Coerced::Date(b.finish())
        }

        // Everything else through arrow's cast kernel
        (target, _) => {
            let to = match target {
                DType::Utf8 => DataType::Utf8,
                DType::Float64 => DataType::Float64,
                DType::Date => DataType::Date32,
            };
            trace!(from = ?found, to = ?to, "casting column");
            let casted = cast(arr.as_ref(), &to).map_err(|_| CoerceError::WrongType {
                found: found.clone(),
            })?;
            return coerce_column(&casted, dtype, false);
        }
    };

    // inf and NaN are never valid measurements
    let bad: Vec<usize> = match &coerced {
        Coerced::Float64(a) => (0..a.len())
            .filter(|&i| a.is_null(i) || !a.value(i).is_finite())
            .collect(),
        other => (0..other.as_array().len())
            .filter(|&i| other.as_array().is_null(i))
            .collect(),
    };
    if bad.is_empty() {
        Ok(coerced)
    } else {
        Err(CoerceError::Values { rows: bad })
    }
}

fn downcast<T: Array + 'static>(arr: &ArrayRef) -> Result<&T, CoerceError> {
    arr.as_any()
        .downcast_ref::<T>()
        .ok_or_else(|| CoerceError::WrongType {
            found: arr.data_type().clone(),
        })
}
