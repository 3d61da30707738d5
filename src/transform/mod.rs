//! Value transforms applied between reading a source field and writing the
//! destination field.
//!
//! Transforms run strictly in declared order and each one consumes the
//! output of the previous. Every transform checks the kind of its input and
//! fails rather than coercing silently.

pub mod convert;
pub mod errors;
pub mod lookup;
pub mod math;
pub mod pipeline;
pub mod schema;
pub mod string;

pub use errors::{TransformError, TransformFailed};
pub use pipeline::apply_transforms;
pub use schema::{
    ConvertFormat, ConvertTransform, MapTransform, MatchFallbackTo, MatchPattern, MatchTransform,
    MathTransform, StringConversion, StringTransform, Transform, TransformIoType,
};
