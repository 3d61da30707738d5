use crate::transform::errors::{TransformError, TransformFailed};
use crate::transform::schema::Transform;
use serde_json::Value;
use tracing::trace;

impl Transform {
    pub fn apply(&self, input: Value) -> Result<Value, TransformError> {
        match self {
            Transform::Map(t) => t.apply(input),
            Transform::Match(t) => t.apply(input),
            Transform::Math(t) => t.apply(input),
            Transform::String(t) => t.apply(input),
            Transform::Convert(t) => t.apply(input),
        }
    }
}

/// Run `transforms` over `value` in order.
///
/// The first failure stops the chain; its position is reported in
/// [`TransformFailed::index`] and no partial result is returned.
pub fn apply_transforms(value: Value, transforms: &[Transform]) -> Result<Value, TransformFailed> {
    transforms
        .iter()
        .enumerate()
        .try_fold(value, |current, (index, transform)| {
            trace!(index, kind = transform.kind(), "applying transform");
            transform
                .apply(current)
                .map_err(|source| TransformFailed { index, source })
        })
}
