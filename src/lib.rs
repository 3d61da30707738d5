//! Patch and Transform: declarative value movement between documents
//!
//! A patch reads a value at a field path in one document, runs it through an
//! ordered list of transforms, and writes the result at a field path in
//! another document. Patches are declared in TOML or JSON and applied in
//! order against three documents: the observed composite resource (read
//! only), the desired composite resource, and the environment.
//!
//! # Architecture
//!
//! - [`fieldpath`]: path parsing and get/set/delete on `serde_json::Value`
//! - [`transform`]: map, match, math, string and convert transforms
//! - [`combine`]: several source fields rendered into one value
//! - [`config`]: patch schema, loading, patch-set expansion and dispatch
//!
//! # Example
//!
//! ```
//! use patch_and_transform::{apply_patches, load_from_str, PatchResult};
//! use serde_json::json;
//!
//! let config = load_from_str(
//!     r#"
//! [[patches]]
//! type = "FromCompositeFieldPath"
//! from_field_path = "spec.region"
//! to_field_path = "data.region"
//! "#,
//! )
//! .unwrap();
//!
//! let observed = json!({"spec": {"region": "eu-west-1"}});
//! let mut desired = json!({});
//! let mut environment = json!({});
//!
//! let results = apply_patches(&config, &observed, &mut desired, &mut environment).unwrap();
//! assert!(matches!(results[0].1, Ok(PatchResult::Applied { .. })));
//! assert_eq!(environment, json!({"data": {"region": "eu-west-1"}}));
//! ```

pub mod cache;
pub mod combine;
pub mod config;
pub mod fieldpath;
pub mod telemetry;
pub mod template;
pub mod transform;

// Re-exports
pub use combine::{combine, Combine, CombineError, CombineStrategy, CombineVariable};
pub use config::{
    apply_environment_patch, apply_patches, expand_patch_sets, load_from_json_str,
    load_from_path, load_from_str, ConfigError, ExpandError, Patch, PatchConfig, PatchError,
    PatchResult, PatchSet, PatchType,
};
pub use fieldpath::{FieldPath, FieldPathError, Segment};
pub use transform::{apply_transforms, Transform, TransformError, TransformFailed};
