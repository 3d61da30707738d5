//! Patch applicator - moves values between the composite resource and the
//! environment
//!
//! Patches to the environment always read from the observed composite
//! resource. Patches from the environment always write to the desired
//! composite resource. Each patch either succeeds completely, is skipped, or
//! fails without touching its destination.

use crate::combine::{combine, CombineError};
use crate::config::expand::{expand_patch_sets, ExpandError};
use crate::config::schema::{FromFieldPathPolicy, Patch, PatchConfig, PatchType};
use crate::fieldpath::{self, FieldPath, FieldPathError};
use crate::transform::{apply_transforms, TransformFailed};
use serde_json::Value;
use std::fmt;
use tracing::{debug, warn};

/// Result of applying a single patch
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use = "PatchResult should be checked for applied/skipped"]
pub enum PatchResult {
    /// A value was written to the destination path
    Applied { to: String },
    /// Nothing was written and the destination is untouched
    Skipped { reason: String },
}

impl fmt::Display for PatchResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PatchResult::Applied { to } => write!(f, "Applied to {}", to),
            PatchResult::Skipped { reason } => write!(f, "Skipped: {}", reason),
        }
    }
}

/// Errors during patch application
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PatchError {
    /// The patch lacks a field its type needs
    MissingField {
        patch_type: PatchType,
        field: &'static str,
    },
    /// A required source field does not exist
    SourceFieldNotFound { path: String },
    /// Invalid path, or the destination could not be written
    Path(FieldPathError),
    Transform(TransformFailed),
    Combine(CombineError),
    /// A patch set reference reached the dispatcher without being expanded
    UnexpandedPatchSet { name: Option<String> },
}

impl fmt::Display for PatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PatchError::MissingField { patch_type, field } => {
                write!(f, "{} patch requires '{}'", patch_type, field)
            }
            PatchError::SourceFieldNotFound { path } => {
                write!(f, "required source field {} not found", path)
            }
            PatchError::Path(e) => write!(f, "field path error: {}", e),
            PatchError::Transform(e) => write!(f, "{}", e),
            PatchError::Combine(e) => write!(f, "combine error: {}", e),
            PatchError::UnexpandedPatchSet { name } => write!(
                f,
                "patch set '{}' must be expanded before patches are applied",
                name.as_deref().unwrap_or("")
            ),
        }
    }
}

impl std::error::Error for PatchError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            PatchError::Path(e) => Some(e),
            PatchError::Transform(e) => Some(e),
            PatchError::Combine(e) => Some(e),
            _ => None,
        }
    }
}

impl From<FieldPathError> for PatchError {
    fn from(e: FieldPathError) -> Self {
        PatchError::Path(e)
    }
}

impl From<TransformFailed> for PatchError {
    fn from(e: TransformFailed) -> Self {
        PatchError::Transform(e)
    }
}

impl From<CombineError> for PatchError {
    fn from(e: CombineError) -> Self {
        PatchError::Combine(e)
    }
}

/// Apply every patch of `config`, in order, between the composite resource
/// and the environment.
///
/// Patch sets are expanded first; an expansion error aborts before any patch
/// is applied. After that, a failing patch is reported in its slot and the
/// remaining patches still run.
///
/// # Returns
///
/// One entry per patch of the expanded list, tagged with its position
pub fn apply_patches(
    config: &PatchConfig,
    observed: &Value,
    desired: &mut Value,
    environment: &mut Value,
) -> Result<Vec<(usize, Result<PatchResult, PatchError>)>, ExpandError> {
    let patches = expand_patch_sets(&config.patches, &config.patch_sets)?;
    debug!(
        declared = config.patches.len(),
        expanded = patches.len(),
        "expanded patch sets"
    );

    let mut results = Vec::with_capacity(patches.len());
    for (index, patch) in patches.iter().enumerate() {
        let result = apply_environment_patch(patch, observed, desired, environment);
        match &result {
            Ok(PatchResult::Applied { to }) => debug!(index, to = %to, "patch applied"),
            Ok(PatchResult::Skipped { reason }) => debug!(index, reason = %reason, "patch skipped"),
            Err(e) => warn!(index, error = %e, "patch failed"),
        }
        results.push((index, result));
    }

    Ok(results)
}

/// Apply a single patch to or from the environment.
pub fn apply_environment_patch(
    patch: &Patch,
    observed: &Value,
    desired: &mut Value,
    environment: &mut Value,
) -> Result<PatchResult, PatchError> {
    let patch_type = patch.effective_type();
    match patch_type {
        // From observed composite to environment.
        PatchType::FromCompositeFieldPath | PatchType::ToEnvironmentFieldPath => {
            apply_from_field_path(patch, observed, environment)
        }
        PatchType::CombineFromComposite => apply_combine(patch, observed, environment),

        // From environment to desired composite.
        PatchType::ToCompositeFieldPath | PatchType::FromEnvironmentFieldPath => {
            apply_from_field_path(patch, environment, desired)
        }
        PatchType::CombineToComposite => apply_combine(patch, environment, desired),

        // Recognized, but there is nothing to do between these two documents.
        PatchType::CombineFromEnvironment | PatchType::CombineToEnvironment => {
            Ok(PatchResult::Skipped {
                reason: format!("{patch_type} has no effect on the environment"),
            })
        }

        PatchType::PatchSet => Err(PatchError::UnexpandedPatchSet {
            name: patch.patch_set_name.clone(),
        }),
    }
}

fn apply_from_field_path(
    patch: &Patch,
    source: &Value,
    destination: &mut Value,
) -> Result<PatchResult, PatchError> {
    let from = patch
        .from_field_path
        .as_deref()
        .ok_or(PatchError::MissingField {
            patch_type: patch.effective_type(),
            field: "from_field_path",
        })?;
    let from_path = FieldPath::parse(from)?;
    let to_path = match patch.to_field_path.as_deref() {
        Some(to) => FieldPath::parse(to)?,
        None => from_path.clone(),
    };

    let Some(value) = fieldpath::get(source, &from_path) else {
        return match patch.policy.from_field_path {
            FromFieldPathPolicy::Required => Err(PatchError::SourceFieldNotFound {
                path: from.to_string(),
            }),
            FromFieldPathPolicy::Optional => Ok(PatchResult::Skipped {
                reason: format!("source field {from} not found"),
            }),
        };
    };

    let value = apply_transforms(value.clone(), &patch.transforms)?;
    write(patch, destination, &to_path, value)
}

fn apply_combine(
    patch: &Patch,
    source: &Value,
    destination: &mut Value,
) -> Result<PatchResult, PatchError> {
    let missing = |field| PatchError::MissingField {
        patch_type: patch.effective_type(),
        field,
    };
    let definition = patch.combine.as_ref().ok_or_else(|| missing("combine"))?;
    let to = patch
        .to_field_path
        .as_deref()
        .ok_or_else(|| missing("to_field_path"))?;
    let to_path = FieldPath::parse(to)?;

    let require_all = patch.policy.from_field_path == FromFieldPathPolicy::Required;
    let Some(value) = combine(definition, source, require_all)? else {
        return Ok(PatchResult::Skipped {
            reason: "no combine variable could be resolved".to_string(),
        });
    };

    let value = apply_transforms(value, &patch.transforms)?;
    write(patch, destination, &to_path, value)
}

fn write(
    patch: &Patch,
    destination: &mut Value,
    to_path: &FieldPath,
    value: Value,
) -> Result<PatchResult, PatchError> {
    fieldpath::set_with(
        destination,
        to_path,
        value,
        patch.policy.to_field_path.merge_options(),
    )?;
    Ok(PatchResult::Applied {
        to: to_path.to_string(),
    })
}
