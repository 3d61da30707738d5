//! Combining several source fields into one value.
//!
//! Each variable names a field in the source document. Missing required
//! variables abort the combine; missing optional ones contribute the
//! strategy's absent value (an empty string for the string strategy).

use crate::fieldpath::{self, FieldPath, FieldPathError};
use crate::template::{self, TemplateError};
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;
use tracing::trace;

#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct Combine {
    pub variables: Vec<CombineVariable>,
    pub strategy: CombineStrategy,
}

#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct CombineVariable {
    pub from_field_path: String,
    #[serde(default)]
    pub required: bool,
}

#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum CombineStrategy {
    /// Substitute the variables, in declared order, into `{0}`, `{1}`, ...
    String { fmt: String },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CombineError {
    #[error(transparent)]
    InvalidPath(#[from] FieldPathError),

    #[error("required variable {path} not found")]
    RequiredVariableMissing { path: String },

    #[error("combine strategy expects {expected} variable(s) but {found} were declared")]
    ArityMismatch { expected: usize, found: usize },

    #[error("invalid combine template: {0}")]
    Template(TemplateError),
}

impl From<TemplateError> for CombineError {
    fn from(e: TemplateError) -> Self {
        match e {
            TemplateError::ArityMismatch { expected, found } => {
                CombineError::ArityMismatch { expected, found }
            }
            other => CombineError::Template(other),
        }
    }
}

impl CombineStrategy {
    /// Number of variables the strategy consumes.
    pub fn arity(&self) -> Result<usize, CombineError> {
        match self {
            CombineStrategy::String { fmt } => Ok(template::arity(fmt)?),
        }
    }

    fn absent_value(&self) -> Value {
        match self {
            CombineStrategy::String { .. } => Value::String(String::new()),
        }
    }

    fn apply(&self, values: &[Value]) -> Result<Value, CombineError> {
        match self {
            CombineStrategy::String { fmt } => {
                let args: Vec<String> = values.iter().map(render_text).collect();
                Ok(Value::String(template::render(fmt, &args)?))
            }
        }
    }
}

/// Resolve every variable of `definition` in `source` and combine them.
///
/// With `require_all` set every variable is treated as required. Returns
/// `Ok(None)` when no variable resolved at all, meaning there is nothing to
/// combine.
pub fn combine(
    definition: &Combine,
    source: &Value,
    require_all: bool,
) -> Result<Option<Value>, CombineError> {
    let expected = definition.strategy.arity()?;
    if expected != definition.variables.len() {
        return Err(CombineError::ArityMismatch {
            expected,
            found: definition.variables.len(),
        });
    }

    let mut values = Vec::with_capacity(definition.variables.len());
    let mut resolved = 0;
    for variable in &definition.variables {
        let path = FieldPath::parse(&variable.from_field_path)?;
        match fieldpath::get(source, &path) {
            Some(value) => {
                resolved += 1;
                values.push(value.clone());
            }
            None if variable.required || require_all => {
                return Err(CombineError::RequiredVariableMissing {
                    path: variable.from_field_path.clone(),
                });
            }
            None => {
                trace!(path = %variable.from_field_path, "optional combine variable not found");
                values.push(definition.strategy.absent_value());
            }
        }
    }

    if resolved == 0 && !definition.variables.is_empty() {
        return Ok(None);
    }

    definition.strategy.apply(&values).map(Some)
}

fn render_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn variable(path: &str, required: bool) -> CombineVariable {
        CombineVariable {
            from_field_path: path.to_string(),
            required,
        }
    }

    fn string_combine(fmt: &str, variables: Vec<CombineVariable>) -> Combine {
        Combine {
            variables,
            strategy: CombineStrategy::String {
                fmt: fmt.to_string(),
            },
        }
    }

    #[test]
    fn combines_in_declared_order() {
        let source = json!({"spec": {"name": "db", "region": "eu", "replicas": 3}});
        let definition = string_combine(
            "{0}-{1}-{2}",
            vec![
                variable("spec.name", true),
                variable("spec.region", true),
                variable("spec.replicas", false),
            ],
        );
        assert_eq!(
            combine(&definition, &source, false).unwrap(),
            Some(json!("db-eu-3"))
        );
    }

    #[test]
    fn optional_missing_variable_is_empty() {
        let source = json!({"spec": {"a": "a"}});
        let definition = string_combine(
            "{0}-{1}",
            vec![variable("spec.a", false), variable("spec.b", false)],
        );
        assert_eq!(combine(&definition, &source, false).unwrap(), Some(json!("a-")));
    }

    #[test]
    fn required_missing_variable_aborts() {
        let source = json!({"spec": {"a": "a"}});
        let definition = string_combine(
            "{0}-{1}",
            vec![variable("spec.a", false), variable("spec.b", true)],
        );
        assert_eq!(
            combine(&definition, &source, false).unwrap_err(),
            CombineError::RequiredVariableMissing {
                path: "spec.b".to_string()
            }
        );

        let optional = string_combine(
            "{0}-{1}",
            vec![variable("spec.a", false), variable("spec.b", false)],
        );
        assert!(matches!(
            combine(&optional, &source, true),
            Err(CombineError::RequiredVariableMissing { .. })
        ));
    }

    #[test]
    fn nothing_resolved_is_none() {
        let definition = string_combine(
            "{0}-{1}",
            vec![variable("spec.a", false), variable("spec.b", false)],
        );
        assert_eq!(combine(&definition, &json!({}), false).unwrap(), None);
    }

    #[test]
    fn arity_mismatch() {
        let definition = string_combine("{0}-{1}", vec![variable("spec.a", false)]);
        assert_eq!(
            combine(&definition, &json!({"spec": {"a": "a"}}), false).unwrap_err(),
            CombineError::ArityMismatch {
                expected: 2,
                found: 1
            }
        );
    }

    #[test]
    fn renders_structured_values_as_json() {
        let source = json!({"tags": ["a", "b"], "flag": true, "empty": null});
        let definition = string_combine(
            "{0}|{1}|{2}",
            vec![
                variable("tags", true),
                variable("flag", true),
                variable("empty", true),
            ],
        );
        assert_eq!(
            combine(&definition, &source, false).unwrap(),
            Some(json!(r#"["a","b"]|true|"#))
        );
    }

    #[test]
    fn deserializes_from_json() {
        let definition: Combine = serde_json::from_value(json!({
            "variables": [{"from_field_path": "spec.a"}, {"from_field_path": "spec.b", "required": true}],
            "strategy": {"type": "string", "fmt": "{0}.{1}"}
        }))
        .unwrap();
        assert!(!definition.variables[0].required);
        assert!(definition.variables[1].required);
    }
}
