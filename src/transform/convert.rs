use crate::fieldpath::resolver::kind_of;
use crate::transform::errors::TransformError;
use crate::transform::schema::{ConvertFormat, ConvertTransform, TransformIoType};
use serde_json::{Number, Value};

impl ConvertTransform {
    pub fn apply(&self, input: Value) -> Result<Value, TransformError> {
        if input.is_null() {
            return Err(TransformError::TypeMismatch {
                transform: "convert",
                expected: "a non-null value",
                found: "null",
            });
        }

        let to = self.to_type.as_str();
        let from = kind_of(&input);
        let failed = |message: String| TransformError::ConversionFailed { from, to, message };

        match self.to_type {
            TransformIoType::String => to_string(input, self.format).map_err(failed),
            TransformIoType::Bool => to_bool(&input).map(Value::Bool).map_err(failed),
            TransformIoType::Int | TransformIoType::Int64 => {
                to_int(&input).map(Value::from).map_err(failed)
            }
            TransformIoType::Float64 => to_float(&input).map(Value::Number).map_err(failed),
            TransformIoType::Object => from_json(input, self.format, Value::is_object).map_err(failed),
            TransformIoType::Array => from_json(input, self.format, Value::is_array).map_err(failed),
        }
    }
}

fn to_string(input: Value, format: ConvertFormat) -> Result<Value, String> {
    match input {
        Value::String(_) => Ok(input),
        Value::Number(n) => Ok(Value::String(n.to_string())),
        Value::Bool(b) => Ok(Value::String(b.to_string())),
        Value::Array(_) | Value::Object(_) if format == ConvertFormat::Json => {
            serde_json::to_string(&input)
                .map(Value::String)
                .map_err(|e| e.to_string())
        }
        _ => Err("structured values need format 'json'".to_string()),
    }
}

fn to_bool(input: &Value) -> Result<bool, String> {
    match input {
        Value::Bool(b) => Ok(*b),
        Value::String(s) => s
            .parse::<bool>()
            .map_err(|_| format!("'{s}' is not 'true' or 'false'")),
        Value::Number(n) => match n.as_f64() {
            Some(f) if f == 1.0 => Ok(true),
            Some(f) if f == 0.0 => Ok(false),
            _ => Err(format!("{n} is neither 0 nor 1")),
        },
        _ => Err("no conversion defined".to_string()),
    }
}

fn to_int(input: &Value) -> Result<i64, String> {
    match input {
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                return Ok(i);
            }
            match n.as_f64() {
                // Truncates toward zero, matching a cast from float.
                Some(f) if f.is_finite() && f >= i64::MIN as f64 && f <= i64::MAX as f64 => {
                    Ok(f as i64)
                }
                _ => Err(format!("{n} does not fit in a 64-bit integer")),
            }
        }
        Value::String(s) => s
            .trim()
            .parse::<i64>()
            .map_err(|e| format!("'{s}': {e}")),
        Value::Bool(b) => Ok(i64::from(*b)),
        _ => Err("no conversion defined".to_string()),
    }
}

fn to_float(input: &Value) -> Result<Number, String> {
    let f = match input {
        Value::Number(n) => n.as_f64().ok_or_else(|| format!("{n} is not a float"))?,
        Value::String(s) => s.trim().parse::<f64>().map_err(|e| format!("'{s}': {e}"))?,
        Value::Bool(b) => {
            if *b {
                1.0
            } else {
                0.0
            }
        }
        _ => return Err("no conversion defined".to_string()),
    };
    Number::from_f64(f).ok_or_else(|| format!("{f} is not a finite number"))
}

fn from_json(
    input: Value,
    format: ConvertFormat,
    is_target: fn(&Value) -> bool,
) -> Result<Value, String> {
    if is_target(&input) {
        return Ok(input);
    }
    match input {
        Value::String(s) if format == ConvertFormat::Json => {
            let parsed: Value = serde_json::from_str(&s).map_err(|e| e.to_string())?;
            if is_target(&parsed) {
                Ok(parsed)
            } else {
                Err(format!("JSON text decodes to {}", kind_of(&parsed)))
            }
        }
        Value::String(_) => Err("strings need format 'json'".to_string()),
        _ => Err("no conversion defined".to_string()),
    }
}
