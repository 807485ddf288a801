//! Field-level checks applied when a draft becomes a record

use serde_json::Value;
use thiserror::Error;

/// Reasons a draft is rejected before it reaches storage
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("record url is empty")]
    EmptyUrl,

    #[error("{field} must be non-negative, got {value}")]
    Negative { field: &'static str, value: String },

    #[error("{field} is not a number: {value}")]
    NotANumber { field: &'static str, value: String },

    #[error("{field} has the wrong type, expected {expected}")]
    WrongType {
        field: &'static str,
        expected: &'static str,
    },

    #[error("{field} is out of range: {value}")]
    OutOfRange { field: &'static str, value: String },
}

/// Accepts JSON numbers and numeric strings that are finite and >= 0
pub(crate) fn non_negative_decimal(field: &'static str, value: &Value) -> Result<f64, ValidationError> {
    let number = match value {
        Value::Number(n) => n.as_f64().ok_or_else(|| ValidationError::NotANumber {
            field,
            value: n.to_string(),
        })?,
        Value::String(s) => s.trim().parse::<f64>().map_err(|_| ValidationError::NotANumber {
            field,
            value: s.clone(),
        })?,
        _ => {
            return Err(ValidationError::WrongType {
                field,
                expected: "decimal",
            })
        }
    };

    if !number.is_finite() {
        return Err(ValidationError::NotANumber {
            field,
            value: number.to_string(),
        });
    }
    if number < 0.0 {
        return Err(ValidationError::Negative {
            field,
            value: number.to_string(),
        });
    }

    Ok(number)
}

/// Accepts JSON integers, integral floats and integer strings that are >= 0
pub(crate) fn non_negative_integer(field: &'static str, value: &Value) -> Result<u32, ValidationError> {
    let number: i64 = match value {
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                i
            } else if let Some(u) = n.as_u64() {
                i64::try_from(u).map_err(|_| ValidationError::OutOfRange {
                    field,
                    value: u.to_string(),
                })?
            } else {
                let f = n.as_f64().unwrap_or(f64::NAN);
                if !f.is_finite() || f.fract() != 0.0 {
                    return Err(ValidationError::NotANumber {
                        field,
                        value: n.to_string(),
                    });
                }
                f as i64
            }
        }
        Value::String(s) => s.trim().parse::<i64>().map_err(|_| ValidationError::NotANumber {
            field,
            value: s.clone(),
        })?,
        _ => {
            return Err(ValidationError::WrongType {
                field,
                expected: "integer",
            })
        }
    };

    if number < 0 {
        return Err(ValidationError::Negative {
            field,
            value: number.to_string(),
        });
    }

    u32::try_from(number).map_err(|_| ValidationError::OutOfRange {
        field,
        value: number.to_string(),
    })
}

pub(crate) fn string_value(field: &'static str, value: &Value) -> Result<String, ValidationError> {
    match value {
        Value::String(s) => Ok(s.clone()),
        _ => Err(ValidationError::WrongType {
            field,
            expected: "string",
        }),
    }
}

/// Trims surrounding whitespace; blank strings become `None`
pub(crate) fn stripped(value: Option<String>) -> Option<String> {
    value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}
