use crate::cache::get_or_compile_regex;
use crate::fieldpath::resolver::kind_of;
use crate::template;
use crate::transform::errors::TransformError;
use crate::transform::schema::{StringConversion, StringTransform};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde_json::Value;
use sha2::{Digest, Sha256};

impl StringTransform {
    pub fn apply(&self, input: Value) -> Result<Value, TransformError> {
        match self {
            StringTransform::Format { fmt } => {
                let text = scalar_text(&input).ok_or_else(|| mismatch("a scalar", &input))?;
                Ok(Value::String(template::render(fmt, &[text])?))
            }
            StringTransform::Convert { convert } => apply_conversion(*convert, input),
            StringTransform::TrimPrefix { trim } => {
                let s = expect_string(input)?;
                match s.strip_prefix(trim.as_str()) {
                    Some(rest) => Ok(Value::String(rest.to_string())),
                    None => Err(TransformError::AffixNotFound {
                        input: s,
                        affix: trim.clone(),
                        position: "start",
                    }),
                }
            }
            StringTransform::TrimSuffix { trim } => {
                let s = expect_string(input)?;
                match s.strip_suffix(trim.as_str()) {
                    Some(rest) => Ok(Value::String(rest.to_string())),
                    None => Err(TransformError::AffixNotFound {
                        input: s,
                        affix: trim.clone(),
                        position: "end",
                    }),
                }
            }
            StringTransform::Regexp { pattern, group } => {
                let s = expect_string(input)?;
                extract_regexp(pattern, *group, &s).map(Value::String)
            }
            StringTransform::Replace { search, replace } => {
                let s = expect_string(input)?;
                Ok(Value::String(s.replace(search.as_str(), replace)))
            }
            StringTransform::Join { separator } => {
                let Value::Array(items) = &input else {
                    return Err(mismatch("a sequence", &input));
                };
                let parts = items
                    .iter()
                    .map(|item| scalar_text(item).ok_or_else(|| mismatch("a sequence of scalars", item)))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Value::String(parts.join(separator)))
            }
        }
    }
}

fn apply_conversion(convert: StringConversion, input: Value) -> Result<Value, TransformError> {
    let out = match convert {
        StringConversion::ToJson => {
            serde_json::to_string(&input).map_err(|e| TransformError::ConversionFailed {
                from: kind_of(&input),
                to: "a JSON string",
                message: e.to_string(),
            })?
        }
        StringConversion::ToUpper => expect_string(input)?.to_uppercase(),
        StringConversion::ToLower => expect_string(input)?.to_lowercase(),
        StringConversion::ToBase64 => STANDARD.encode(expect_string(input)?.as_bytes()),
        StringConversion::FromBase64 => {
            let bytes = STANDARD
                .decode(expect_string(input)?.as_bytes())
                .map_err(|e| conversion_failed("base64 text", e.to_string()))?;
            String::from_utf8(bytes).map_err(|e| conversion_failed("base64 text", e.to_string()))?
        }
        StringConversion::ToSha256 => {
            format!("{:x}", Sha256::digest(expect_string(input)?.as_bytes()))
        }
    };
    Ok(Value::String(out))
}

fn conversion_failed(from: &'static str, message: String) -> TransformError {
    TransformError::ConversionFailed {
        from,
        to: "a UTF-8 string",
        message,
    }
}

fn extract_regexp(pattern: &str, group: Option<usize>, input: &str) -> Result<String, TransformError> {
    let re = get_or_compile_regex(pattern).map_err(|e| TransformError::InvalidRegex {
        pattern: pattern.to_string(),
        message: e.to_string(),
    })?;
    let no_match = || TransformError::NoMatch {
        pattern: pattern.to_string(),
        input: input.to_string(),
    };

    let caps = re.captures(input).ok_or_else(no_match)?;
    let group = group.unwrap_or(0);
    if group >= caps.len() {
        return Err(TransformError::NoSuchGroup {
            pattern: pattern.to_string(),
            group,
        });
    }
    // The group exists but did not take part in this match.
    caps.get(group)
        .map(|m| m.as_str().to_string())
        .ok_or_else(no_match)
}

/// Text form of a scalar. Returns `None` for null, maps and sequences.
pub(crate) fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

fn expect_string(input: Value) -> Result<String, TransformError> {
    match input {
        Value::String(s) => Ok(s),
        other => Err(mismatch("a string", &other)),
    }
}

fn mismatch(expected: &'static str, found: &Value) -> TransformError {
    TransformError::TypeMismatch {
        transform: "string",
        expected,
        found: kind_of(found),
    }
}
