pub mod applicator;
pub mod expand;
pub mod loader;
pub mod schema;

pub use applicator::{apply_environment_patch, apply_patches, PatchError, PatchResult};
pub use expand::{expand_patch_sets, ExpandError};
pub use loader::{load_from_json_str, load_from_path, load_from_str, ConfigError};
pub use schema::{
    FromFieldPathPolicy, Metadata, Patch, PatchConfig, PatchPolicy, PatchSet, PatchType,
    ToFieldPathPolicy, ValidationError, ValidationIssue,
};
