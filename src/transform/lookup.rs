use crate::cache::get_or_compile_regex;
use crate::fieldpath::resolver::kind_of;
use crate::transform::errors::TransformError;
use crate::transform::schema::{MapTransform, MatchFallbackTo, MatchPattern, MatchTransform};
use serde_json::Value;

impl MapTransform {
    pub fn apply(&self, input: Value) -> Result<Value, TransformError> {
        let key = expect_string("map", &input)?;
        if let Some(value) = self.pairs.get(key) {
            return Ok(value.clone());
        }
        self.default
            .clone()
            .ok_or_else(|| TransformError::KeyNotFound {
                key: key.to_string(),
            })
    }
}

impl MatchTransform {
    pub fn apply(&self, input: Value) -> Result<Value, TransformError> {
        let candidate = expect_string("match", &input)?;

        for pattern in &self.patterns {
            if pattern.matches(candidate)? {
                return Ok(pattern.result().clone());
            }
        }

        match self.fallback_to {
            MatchFallbackTo::Input => Ok(input),
            MatchFallbackTo::Value => Ok(self.fallback_value.clone().unwrap_or(Value::Null)),
        }
    }
}

impl MatchPattern {
    fn matches(&self, candidate: &str) -> Result<bool, TransformError> {
        match self {
            MatchPattern::Literal { literal, .. } => Ok(literal == candidate),
            MatchPattern::Regexp { regexp, .. } => {
                let re = get_or_compile_regex(regexp).map_err(|e| TransformError::InvalidRegex {
                    pattern: regexp.clone(),
                    message: e.to_string(),
                })?;
                Ok(re.is_match(candidate))
            }
        }
    }

    fn result(&self) -> &Value {
        match self {
            MatchPattern::Literal { result, .. } | MatchPattern::Regexp { result, .. } => result,
        }
    }
}

fn expect_string<'a>(transform: &'static str, input: &'a Value) -> Result<&'a str, TransformError> {
    input.as_str().ok_or_else(|| TransformError::TypeMismatch {
        transform,
        expected: "a string",
        found: kind_of(input),
    })
}
