use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum Transform {
    /// Look the input up in a static table.
    Map(MapTransform),
    /// Pick a result from the first literal or regexp pattern the input matches.
    Match(MatchTransform),
    Math(MathTransform),
    String(StringTransform),
    Convert(ConvertTransform),
}

impl Transform {
    pub fn kind(&self) -> &'static str {
        match self {
            Transform::Map(_) => "map",
            Transform::Match(_) => "match",
            Transform::Math(_) => "math",
            Transform::String(_) => "string",
            Transform::Convert(_) => "convert",
        }
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq, Default)]
pub struct MapTransform {
    #[serde(default)]
    pub pairs: BTreeMap<String, Value>,
    /// Returned when the input is not a key of `pairs`.
    #[serde(default)]
    pub default: Option<Value>,
}

#[derive(Debug, Deserialize, Clone, PartialEq, Default)]
pub struct MatchTransform {
    #[serde(default)]
    pub patterns: Vec<MatchPattern>,
    #[serde(default)]
    pub fallback_value: Option<Value>,
    #[serde(default)]
    pub fallback_to: MatchFallbackTo,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum MatchPattern {
    Literal { literal: String, result: Value },
    Regexp { regexp: String, result: Value },
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum MatchFallbackTo {
    #[default]
    Value,
    Input,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq)]
#[serde(tag = "op", rename_all = "kebab-case")]
pub enum MathTransform {
    Multiply { value: f64 },
    ClampMin { value: f64 },
    ClampMax { value: f64 },
}

#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
#[serde(tag = "op", rename_all = "kebab-case")]
pub enum StringTransform {
    /// Render the input into a single-placeholder template such as `db-{0}`.
    Format { fmt: String },
    Convert { convert: StringConversion },
    TrimPrefix { trim: String },
    TrimSuffix { trim: String },
    /// Extract the whole match, or capture group `group`, of `pattern`.
    Regexp {
        pattern: String,
        #[serde(default)]
        group: Option<usize>,
    },
    Replace { search: String, replace: String },
    Join { separator: String },
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum StringConversion {
    ToUpper,
    ToLower,
    ToBase64,
    FromBase64,
    ToJson,
    ToSha256,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
pub struct ConvertTransform {
    pub to_type: TransformIoType,
    #[serde(default)]
    pub format: ConvertFormat,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TransformIoType {
    String,
    Bool,
    Int,
    Int64,
    Float64,
    Object,
    Array,
}

impl TransformIoType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransformIoType::String => "string",
            TransformIoType::Bool => "bool",
            TransformIoType::Int => "int",
            TransformIoType::Int64 => "int64",
            TransformIoType::Float64 => "float64",
            TransformIoType::Object => "object",
            TransformIoType::Array => "array",
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ConvertFormat {
    #[default]
    None,
    Json,
}
