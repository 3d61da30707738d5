//! Reading and writing values at a [`FieldPath`] inside a document.
//!
//! Reads never fail: a missing key, an out-of-range index or an intermediate
//! of the wrong kind all resolve to `None`. Writes create missing
//! intermediate maps and sequences, and refuse to overwrite an intermediate
//! value whose kind does not fit the next segment.

use crate::fieldpath::errors::FieldPathError;
use crate::fieldpath::merge::{merge_values, MergeOptions};
use crate::fieldpath::path::{FieldPath, Segment};
use serde_json::{Map, Value};

/// Resolve `path` in `doc`. An explicit `null` at the path counts as found.
pub fn get<'a>(doc: &'a Value, path: &FieldPath) -> Option<&'a Value> {
    let mut current = doc;
    for seg in path.segments() {
        current = match (seg, current) {
            (Segment::Field(name), Value::Object(map)) => map.get(name)?,
            (Segment::Index(index), Value::Array(items)) => {
                let pos = resolve_get_index(*index, items.len())?;
                &items[pos]
            }
            _ => return None,
        };
    }
    Some(current)
}

pub fn exists(doc: &Value, path: &FieldPath) -> bool {
    get(doc, path).is_some()
}

/// Remove the value at `path` and return it. Sequence elements after a
/// removed index shift down by one.
pub fn delete(doc: &mut Value, path: &FieldPath) -> Option<Value> {
    let (leaf, parents) = path.segments().split_last()?;
    let mut current = doc;
    for seg in parents {
        current = match (seg, current) {
            (Segment::Field(name), Value::Object(map)) => map.get_mut(name)?,
            (Segment::Index(index), Value::Array(items)) => {
                let pos = resolve_get_index(*index, items.len())?;
                &mut items[pos]
            }
            _ => return None,
        };
    }
    match (leaf, current) {
        (Segment::Field(name), Value::Object(map)) => map.remove(name),
        (Segment::Index(index), Value::Array(items)) => {
            let pos = resolve_get_index(*index, items.len())?;
            Some(items.remove(pos))
        }
        _ => None,
    }
}

/// Write `value` at `path`, replacing whatever is there.
pub fn set(doc: &mut Value, path: &FieldPath, value: Value) -> Result<(), FieldPathError> {
    set_with(doc, path, value, None)
}

/// Write `value` at `path`. With `merge` set, the value is merged into any
/// existing destination value instead of replacing it.
///
/// The document is left untouched when the write fails.
pub fn set_with(
    doc: &mut Value,
    path: &FieldPath,
    value: Value,
    merge: Option<MergeOptions>,
) -> Result<(), FieldPathError> {
    check_writable(doc, path)?;

    let segments = path.segments();
    let last = segments.len() - 1;
    let mut current = doc;

    for (depth, seg) in segments.iter().enumerate() {
        if current.is_null() {
            *current = empty_container_for(seg);
        }
        let found = kind_of(current);

        let slot = match (seg, current) {
            (Segment::Field(name), Value::Object(map)) => {
                map.entry(name.clone()).or_insert(Value::Null)
            }
            (Segment::Index(index), Value::Array(items)) => {
                let len = items.len();
                let pos = resolve_set_index(*index, len)
                    .ok_or_else(|| out_of_range(path, depth, *index, len))?;
                if pos == len {
                    items.push(Value::Null);
                }
                &mut items[pos]
            }
            (seg, _) => return Err(conflict(path, seg, found)),
        };

        if depth == last {
            match merge {
                Some(options) => merge_values(slot, value, options),
                None => *slot = value,
            }
            return Ok(());
        }
        current = slot;
    }

    Ok(())
}

/// Walk the existing document and confirm a write to `path` can succeed
/// without mutating anything.
fn check_writable(doc: &Value, path: &FieldPath) -> Result<(), FieldPathError> {
    let mut current = Some(doc);

    for (depth, seg) in path.segments().iter().enumerate() {
        let node = match current {
            Some(node) if !node.is_null() => node,
            // Everything below here is created fresh, so only index 0 fits.
            _ => return check_fresh(path, depth),
        };

        current = match (seg, node) {
            (Segment::Field(name), Value::Object(map)) => map.get(name),
            (Segment::Index(index), Value::Array(items)) => {
                let len = items.len();
                let pos = resolve_set_index(*index, len)
                    .ok_or_else(|| out_of_range(path, depth, *index, len))?;
                items.get(pos)
            }
            (seg, node) => return Err(conflict(path, seg, kind_of(node))),
        };
    }

    Ok(())
}

fn check_fresh(path: &FieldPath, from: usize) -> Result<(), FieldPathError> {
    for (depth, seg) in path.segments().iter().enumerate().skip(from) {
        if let Segment::Index(index) = seg {
            if *index != 0 {
                return Err(out_of_range(path, depth, *index, 0));
            }
        }
    }
    Ok(())
}

fn out_of_range(path: &FieldPath, depth: usize, index: i64, len: usize) -> FieldPathError {
    FieldPathError::IndexOutOfRange {
        path: path.prefix_string(depth + 1),
        index,
        len,
    }
}

fn conflict(path: &FieldPath, seg: &Segment, found: &'static str) -> FieldPathError {
    FieldPathError::PathConflict {
        path: path.to_string(),
        segment: seg.to_string(),
        expected: if seg.is_index() { "a sequence" } else { "a map" },
        found,
    }
}

fn empty_container_for(seg: &Segment) -> Value {
    match seg {
        Segment::Field(_) => Value::Object(Map::new()),
        Segment::Index(_) => Value::Array(Vec::new()),
    }
}

pub(crate) fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a bool",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a sequence",
        Value::Object(_) => "a map",
    }
}

fn resolve_get_index(index: i64, len: usize) -> Option<usize> {
    let resolved = if index < 0 {
        i64::try_from(len).ok()? + index
    } else {
        index
    };
    let pos = usize::try_from(resolved).ok()?;
    (pos < len).then_some(pos)
}

/// Like [`resolve_get_index`], but `len` itself is a valid append position.
fn resolve_set_index(index: i64, len: usize) -> Option<usize> {
    if index >= 0 {
        let pos = usize::try_from(index).ok()?;
        return (pos <= len).then_some(pos);
    }
    resolve_get_index(index, len)
}
