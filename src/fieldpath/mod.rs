pub mod errors;
pub mod merge;
pub mod path;
pub mod resolver;

pub use errors::FieldPathError;
pub use merge::{merge_values, MergeOptions};
pub use path::{FieldPath, Segment};
pub use resolver::{delete, exists, get, set, set_with};
