//! Patch-set expansion.
//!
//! Every `PatchSet` patch is replaced, in place, by the patches of the set it
//! names. Sets may not reference other sets, so expansion is a single pass
//! and always terminates.

use crate::config::schema::{Patch, PatchSet, PatchType};
use std::collections::HashMap;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExpandError {
    #[error("patch {index} is a PatchSet reference without a patch_set_name")]
    MissingPatchSetName { index: usize },

    #[error(
        "patch {index} references unknown patch set '{name}'{}",
        .suggestion.as_ref().map(|s| format!(" (did you mean '{s}'?)")).unwrap_or_default()
    )]
    UnknownPatchSet {
        index: usize,
        name: String,
        suggestion: Option<String>,
    },

    #[error("patch set '{name}' contains a nested patch set reference at position {position}")]
    NestedPatchSet { name: String, position: usize },
}

/// Replace every `PatchSet` reference in `patches` with the referenced
/// set's patches, preserving order.
pub fn expand_patch_sets(patches: &[Patch], sets: &[PatchSet]) -> Result<Vec<Patch>, ExpandError> {
    let by_name: HashMap<&str, &PatchSet> = sets.iter().map(|set| (set.name.as_str(), set)).collect();
    let mut expanded = Vec::with_capacity(patches.len());

    for (index, patch) in patches.iter().enumerate() {
        if patch.effective_type() != PatchType::PatchSet {
            expanded.push(patch.clone());
            continue;
        }

        let name = patch
            .patch_set_name
            .as_deref()
            .ok_or(ExpandError::MissingPatchSetName { index })?;
        let set = by_name
            .get(name)
            .ok_or_else(|| ExpandError::UnknownPatchSet {
                index,
                name: name.to_string(),
                suggestion: closest_name(name, sets),
            })?;

        if let Some(position) = set
            .patches
            .iter()
            .position(|p| p.effective_type() == PatchType::PatchSet)
        {
            return Err(ExpandError::NestedPatchSet {
                name: set.name.clone(),
                position,
            });
        }

        expanded.extend(set.patches.iter().cloned());
    }

    Ok(expanded)
}

fn closest_name(name: &str, sets: &[PatchSet]) -> Option<String> {
    let threshold = (name.len() / 3).max(2);
    sets.iter()
        .map(|set| (strsim::levenshtein(name, &set.name), &set.name))
        .filter(|(distance, _)| *distance <= threshold)
        .min_by_key(|(distance, _)| *distance)
        .map(|(_, candidate)| candidate.clone())
}
