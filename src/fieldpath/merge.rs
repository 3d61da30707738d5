//! Deep merging of a written value into an existing destination value.

use serde_json::Value;

/// How a write combines with the value already at its destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MergeOptions {
    /// On a key conflict inside a merged map, keep the existing value.
    pub keep_map_values: bool,
    /// Append sequences instead of replacing them.
    pub append_slice: bool,
}

impl MergeOptions {
    pub fn merge_objects() -> Self {
        Self {
            keep_map_values: true,
            append_slice: false,
        }
    }

    pub fn force_merge_objects() -> Self {
        Self {
            keep_map_values: false,
            append_slice: false,
        }
    }

    pub fn with_append_slice(mut self) -> Self {
        self.append_slice = true;
        self
    }
}

/// Merge `src` into `dst`.
///
/// Two maps are merged key by key, recursively. Two sequences are appended
/// when `append_slice` is set. Any other combination replaces `dst`.
pub fn merge_values(dst: &mut Value, src: Value, options: MergeOptions) {
    match (dst, src) {
        (Value::Object(existing), Value::Object(incoming)) => {
            for (key, value) in incoming {
                match existing.get_mut(&key) {
                    Some(slot) => merge_nested(slot, value, options),
                    None => {
                        existing.insert(key, value);
                    }
                }
            }
        }
        (Value::Array(existing), Value::Array(incoming)) if options.append_slice => {
            existing.extend(incoming);
        }
        (dst, src) => *dst = src,
    }
}

fn merge_nested(slot: &mut Value, value: Value, options: MergeOptions) {
    let mergeable = matches!(
        (&*slot, &value),
        (Value::Object(_), Value::Object(_)) | (Value::Array(_), Value::Array(_))
    );
    if mergeable && (slot.is_object() || options.append_slice) {
        merge_values(slot, value, options);
    } else if !options.keep_map_values || slot.is_null() {
        *slot = value;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn merge_objects_keeps_existing_on_conflict() {
        let mut dst = json!({"a": 1, "nested": {"x": "old"}, "empty": null});
        merge_values(
            &mut dst,
            json!({"a": 2, "b": 3, "nested": {"x": "new", "y": "added"}, "empty": "filled"}),
            MergeOptions::merge_objects(),
        );
        assert_eq!(
            dst,
            json!({"a": 1, "b": 3, "nested": {"x": "old", "y": "added"}, "empty": "filled"})
        );
    }

    #[test]
    fn force_merge_overwrites_on_conflict() {
        let mut dst = json!({"a": 1, "nested": {"x": "old", "z": true}});
        merge_values(
            &mut dst,
            json!({"a": 2, "nested": {"x": "new"}}),
            MergeOptions::force_merge_objects(),
        );
        assert_eq!(dst, json!({"a": 2, "nested": {"x": "new", "z": true}}));
    }

    #[test]
    fn sequences_replace_unless_append_requested() {
        let mut dst = json!({"tags": ["a"]});
        merge_values(
            &mut dst,
            json!({"tags": ["b"]}),
            MergeOptions::force_merge_objects(),
        );
        assert_eq!(dst, json!({"tags": ["b"]}));

        let mut dst = json!({"tags": ["a"]});
        merge_values(
            &mut dst,
            json!({"tags": ["b"]}),
            MergeOptions::merge_objects().with_append_slice(),
        );
        assert_eq!(dst, json!({"tags": ["a", "b"]}));

        let mut dst = json!(["a"]);
        merge_values(
            &mut dst,
            json!(["b", "c"]),
            MergeOptions::force_merge_objects().with_append_slice(),
        );
        assert_eq!(dst, json!(["a", "b", "c"]));
    }

    #[test]
    fn non_map_values_replace_at_top_level() {
        let mut dst = json!("scalar");
        merge_values(&mut dst, json!({"a": 1}), MergeOptions::merge_objects());
        assert_eq!(dst, json!({"a": 1}));

        let mut dst = json!({"a": 1});
        merge_values(&mut dst, json!(5), MergeOptions::merge_objects());
        assert_eq!(dst, json!(5));
    }
}
