use crate::combine::Combine;
use crate::fieldpath::{FieldPath, MergeOptions};
use crate::template;
use crate::transform::{StringTransform, Transform};
use serde::Deserialize;
use std::collections::HashSet;
use std::fmt;

#[derive(Debug, Deserialize, Default, Clone, PartialEq)]
pub struct PatchConfig {
    #[serde(default)]
    pub meta: Metadata,
    #[serde(default)]
    pub patch_sets: Vec<PatchSet>,
    #[serde(default)]
    pub patches: Vec<Patch>,
}

impl PatchConfig {
    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut issues = Vec::new();

        if self.patches.is_empty() {
            issues.push(ValidationIssue::EmptyPatchList);
        }

        let mut seen = HashSet::new();
        for set in &self.patch_sets {
            if set.name.trim().is_empty() {
                issues.push(ValidationIssue::MissingField {
                    location: "patch_sets".to_string(),
                    field: "name",
                });
            } else if !seen.insert(set.name.as_str()) {
                issues.push(ValidationIssue::DuplicatePatchSet {
                    name: set.name.clone(),
                });
            }
            for (idx, patch) in set.patches.iter().enumerate() {
                patch.validate_into(&format!("patch_sets['{}'][{idx}]", set.name), &mut issues);
            }
        }

        for (idx, patch) in self.patches.iter().enumerate() {
            patch.validate_into(&format!("patches[{idx}]"), &mut issues);
        }

        if issues.is_empty() {
            Ok(())
        } else {
            Err(ValidationError { issues })
        }
    }
}

#[derive(Debug, Deserialize, Default, Clone, PartialEq, Eq)]
pub struct Metadata {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

/// A named, reusable list of patches referenced by `PatchSet` patches.
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct PatchSet {
    pub name: String,
    #[serde(default)]
    pub patches: Vec<Patch>,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PatchType {
    FromCompositeFieldPath,
    ToCompositeFieldPath,
    FromEnvironmentFieldPath,
    ToEnvironmentFieldPath,
    CombineFromComposite,
    CombineToComposite,
    CombineFromEnvironment,
    CombineToEnvironment,
    PatchSet,
}

impl PatchType {
    /// The type a patch behaves as when none was declared.
    pub fn effective(declared: Option<PatchType>) -> PatchType {
        declared.unwrap_or(PatchType::FromCompositeFieldPath)
    }

    pub fn is_combine(&self) -> bool {
        matches!(
            self,
            PatchType::CombineFromComposite
                | PatchType::CombineToComposite
                | PatchType::CombineFromEnvironment
                | PatchType::CombineToEnvironment
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PatchType::FromCompositeFieldPath => "FromCompositeFieldPath",
            PatchType::ToCompositeFieldPath => "ToCompositeFieldPath",
            PatchType::FromEnvironmentFieldPath => "FromEnvironmentFieldPath",
            PatchType::ToEnvironmentFieldPath => "ToEnvironmentFieldPath",
            PatchType::CombineFromComposite => "CombineFromComposite",
            PatchType::CombineToComposite => "CombineToComposite",
            PatchType::CombineFromEnvironment => "CombineFromEnvironment",
            PatchType::CombineToEnvironment => "CombineToEnvironment",
            PatchType::PatchSet => "PatchSet",
        }
    }
}

impl fmt::Display for PatchType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Deserialize, Default, Clone, PartialEq)]
pub struct Patch {
    #[serde(default, rename = "type")]
    pub patch_type: Option<PatchType>,
    #[serde(default)]
    pub from_field_path: Option<String>,
    /// Defaults to `from_field_path` for single-path patches.
    #[serde(default)]
    pub to_field_path: Option<String>,
    #[serde(default)]
    pub combine: Option<Combine>,
    #[serde(default)]
    pub patch_set_name: Option<String>,
    #[serde(default)]
    pub transforms: Vec<Transform>,
    #[serde(default)]
    pub policy: PatchPolicy,
}

impl Patch {
    pub fn effective_type(&self) -> PatchType {
        PatchType::effective(self.patch_type)
    }

    pub fn destination(&self) -> Option<&str> {
        self.to_field_path
            .as_deref()
            .or(self.from_field_path.as_deref())
    }

    fn validate_into(&self, location: &str, issues: &mut Vec<ValidationIssue>) {
        let patch_type = self.effective_type();
        let missing = |field: &'static str| ValidationIssue::MissingField {
            location: location.to_string(),
            field,
        };
        let invalid = |message: String| ValidationIssue::InvalidCombo {
            location: location.to_string(),
            message,
        };

        match patch_type {
            PatchType::PatchSet => {
                if self.patch_set_name.as_deref().unwrap_or("").trim().is_empty() {
                    issues.push(missing("patch_set_name"));
                }
                return;
            }
            t if t.is_combine() => match &self.combine {
                None => issues.push(missing("combine")),
                Some(combine) => {
                    if combine.variables.is_empty() {
                        issues.push(missing("combine.variables"));
                    }
                    for variable in &combine.variables {
                        if let Err(e) = FieldPath::parse(&variable.from_field_path) {
                            issues.push(invalid(format!("combine variable: {e}")));
                        }
                    }
                    match combine.strategy.arity() {
                        Ok(expected) if expected != combine.variables.len() => {
                            issues.push(invalid(format!(
                                "combine strategy expects {expected} variable(s) but {} were declared",
                                combine.variables.len()
                            )));
                        }
                        Ok(_) => {}
                        Err(e) => issues.push(invalid(e.to_string())),
                    }
                    if self.to_field_path.is_none() {
                        issues.push(missing("to_field_path"));
                    }
                }
            },
            _ => match &self.from_field_path {
                None => issues.push(missing("from_field_path")),
                Some(path) => {
                    if let Err(e) = FieldPath::parse(path) {
                        issues.push(invalid(format!("from_field_path: {e}")));
                    }
                }
            },
        }

        if let Some(path) = &self.to_field_path {
            if let Err(e) = FieldPath::parse(path) {
                issues.push(invalid(format!("to_field_path: {e}")));
            }
        }

        for (idx, transform) in self.transforms.iter().enumerate() {
            if let Transform::String(StringTransform::Format { fmt }) = transform {
                match template::arity(fmt) {
                    Ok(1) => {}
                    Ok(n) => issues.push(invalid(format!(
                        "transforms[{idx}]: format template must use exactly one placeholder, found {n}"
                    ))),
                    Err(e) => issues.push(invalid(format!("transforms[{idx}]: {e}"))),
                }
            }
        }
    }
}

#[derive(Debug, Deserialize, Default, Clone, Copy, PartialEq, Eq)]
pub struct PatchPolicy {
    #[serde(default)]
    pub from_field_path: FromFieldPathPolicy,
    #[serde(default)]
    pub to_field_path: ToFieldPathPolicy,
}

/// What happens when the source field of a patch does not exist.
#[derive(Debug, Deserialize, Default, Clone, Copy, PartialEq, Eq)]
pub enum FromFieldPathPolicy {
    /// Skip the patch and leave the destination untouched.
    #[default]
    Optional,
    /// Fail the patch.
    Required,
}

/// How a written value combines with the value already at the destination.
#[derive(Debug, Deserialize, Default, Clone, Copy, PartialEq, Eq)]
pub enum ToFieldPathPolicy {
    #[default]
    Replace,
    MergeObjects,
    MergeObjectsAppendArrays,
    ForceMergeObjects,
    ForceMergeObjectsAppendArrays,
}

impl ToFieldPathPolicy {
    pub fn merge_options(&self) -> Option<MergeOptions> {
        match self {
            ToFieldPathPolicy::Replace => None,
            ToFieldPathPolicy::MergeObjects => Some(MergeOptions::merge_objects()),
            ToFieldPathPolicy::MergeObjectsAppendArrays => {
                Some(MergeOptions::merge_objects().with_append_slice())
            }
            ToFieldPathPolicy::ForceMergeObjects => Some(MergeOptions::force_merge_objects()),
            ToFieldPathPolicy::ForceMergeObjectsAppendArrays => {
                Some(MergeOptions::force_merge_objects().with_append_slice())
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct ValidationError {
    pub issues: Vec<ValidationIssue>,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, issue) in self.issues.iter().enumerate() {
            if idx > 0 {
                writeln!(f)?;
            }
            write!(f, "{issue}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationError {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationIssue {
    EmptyPatchList,
    MissingField {
        location: String,
        field: &'static str,
    },
    InvalidCombo {
        location: String,
        message: String,
    },
    DuplicatePatchSet {
        name: String,
    },
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationIssue::EmptyPatchList => write!(f, "patch config contains no patches"),
            ValidationIssue::MissingField { location, field } => {
                write!(f, "{location} missing required field '{field}'")
            }
            ValidationIssue::InvalidCombo { location, message } => {
                write!(f, "{location} has invalid configuration: {message}")
            }
            ValidationIssue::DuplicatePatchSet { name } => {
                write!(f, "patch set '{name}' is defined more than once")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::combine::{CombineStrategy, CombineVariable};

    fn from_composite(from: &str) -> Patch {
        Patch {
            from_field_path: Some(from.to_string()),
            ..Patch::default()
        }
    }

    #[test]
    fn effective_type_defaults_to_from_composite() {
        assert_eq!(
            PatchType::effective(None),
            PatchType::FromCompositeFieldPath
        );
        assert_eq!(
            PatchType::effective(Some(PatchType::CombineToComposite)),
            PatchType::CombineToComposite
        );
        assert_eq!(
            from_composite("spec.a").effective_type(),
            PatchType::FromCompositeFieldPath
        );
    }

    #[test]
    fn destination_defaults_to_source() {
        let mut patch = from_composite("spec.a");
        assert_eq!(patch.destination(), Some("spec.a"));
        patch.to_field_path = Some("status.a".to_string());
        assert_eq!(patch.destination(), Some("status.a"));
    }

    #[test]
    fn validate_accepts_well_formed_config() {
        let config = PatchConfig {
            meta: Metadata::default(),
            patch_sets: vec![PatchSet {
                name: "common".to_string(),
                patches: vec![from_composite("spec.region")],
            }],
            patches: vec![
                Patch {
                    patch_type: Some(PatchType::PatchSet),
                    patch_set_name: Some("common".to_string()),
                    ..Patch::default()
                },
                from_composite("metadata.labels['team']"),
            ],
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn validate_reports_every_issue() {
        let config = PatchConfig {
            meta: Metadata::default(),
            patch_sets: vec![
                PatchSet {
                    name: "dup".to_string(),
                    patches: vec![],
                },
                PatchSet {
                    name: "dup".to_string(),
                    patches: vec![],
                },
            ],
            patches: vec![
                Patch::default(),
                Patch {
                    patch_type: Some(PatchType::CombineFromComposite),
                    combine: Some(Combine {
                        variables: vec![CombineVariable {
                            from_field_path: "spec.a".to_string(),
                            required: false,
                        }],
                        strategy: CombineStrategy::String {
                            fmt: "{0}-{1}".to_string(),
                        },
                    }),
                    ..Patch::default()
                },
                Patch {
                    patch_type: Some(PatchType::PatchSet),
                    ..Patch::default()
                },
                Patch {
                    from_field_path: Some("spec..bad".to_string()),
                    ..Patch::default()
                },
            ],
        };

        let err = config.validate().unwrap_err();
        assert!(err
            .issues
            .contains(&ValidationIssue::DuplicatePatchSet {
                name: "dup".to_string()
            }));
        assert!(err.issues.contains(&ValidationIssue::MissingField {
            location: "patches[0]".to_string(),
            field: "from_field_path"
        }));
        assert!(err.issues.contains(&ValidationIssue::MissingField {
            location: "patches[1]".to_string(),
            field: "to_field_path"
        }));
        assert!(err.issues.contains(&ValidationIssue::MissingField {
            location: "patches[2]".to_string(),
            field: "patch_set_name"
        }));
        assert!(err.issues.iter().any(|issue| matches!(
            issue,
            ValidationIssue::InvalidCombo { location, message }
                if location == "patches[1]" && message.contains("expects 2")
        )));
        assert!(err.issues.iter().any(|issue| matches!(
            issue,
            ValidationIssue::InvalidCombo { location, .. } if location == "patches[3]"
        )));
    }

    #[test]
    fn merge_options_follow_policy() {
        assert_eq!(ToFieldPathPolicy::Replace.merge_options(), None);
        assert_eq!(
            ToFieldPathPolicy::MergeObjects.merge_options(),
            Some(MergeOptions {
                keep_map_values: true,
                append_slice: false
            })
        );
        assert_eq!(
            ToFieldPathPolicy::ForceMergeObjectsAppendArrays.merge_options(),
            Some(MergeOptions {
                keep_map_values: false,
                append_slice: true
            })
        );
    }
}
