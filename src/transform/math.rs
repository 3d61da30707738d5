use crate::fieldpath::resolver::kind_of;
use crate::transform::errors::TransformError;
use crate::transform::schema::MathTransform;
use serde_json::{Number, Value};

impl MathTransform {
    /// Integer inputs stay integers whenever the result is integral.
    pub fn apply(&self, input: Value) -> Result<Value, TransformError> {
        let Value::Number(n) = &input else {
            return Err(TransformError::TypeMismatch {
                transform: "math",
                expected: "a number",
                found: kind_of(&input),
            });
        };
        let as_int = n.as_i64();
        let as_float = n.as_f64().unwrap_or(f64::NAN);

        match *self {
            MathTransform::Multiply { value } => match (as_int, integral(value)) {
                (Some(i), Some(factor)) => i
                    .checked_mul(factor)
                    .map(Value::from)
                    .ok_or_else(|| TransformError::InvalidNumber {
                        message: format!("{i} * {factor} overflows a 64-bit integer"),
                    }),
                _ => float_value(as_float * value),
            },
            MathTransform::ClampMin { value } => {
                if as_float < value {
                    bound(value, as_int.is_some())
                } else {
                    Ok(input)
                }
            }
            MathTransform::ClampMax { value } => {
                if as_float > value {
                    bound(value, as_int.is_some())
                } else {
                    Ok(input)
                }
            }
        }
    }
}

fn integral(value: f64) -> Option<i64> {
    (value.fract() == 0.0 && value >= i64::MIN as f64 && value <= i64::MAX as f64)
        .then_some(value as i64)
}

fn bound(value: f64, prefer_int: bool) -> Result<Value, TransformError> {
    match integral(value) {
        Some(i) if prefer_int => Ok(Value::from(i)),
        _ => float_value(value),
    }
}

fn float_value(f: f64) -> Result<Value, TransformError> {
    Number::from_f64(f)
        .map(Value::Number)
        .ok_or_else(|| TransformError::InvalidNumber {
            message: format!("{f} is not finite"),
        })
}
