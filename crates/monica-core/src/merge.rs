//! Deep merge of partial conversation state.
//!
//! Objects merge key by key; every other pairing (arrays included) is a
//! wholesale replacement by the source value. Keys present only in the target
//! are left untouched.

use serde_json::{Map, Value};
use thiserror::Error;

/// Maximum object nesting followed before the merge gives up.
pub const MAX_MERGE_DEPTH: usize = 128;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MergeError {
    #[error("Merge nesting exceeded {0} levels")]
    DepthExceeded(usize),
}

/// Merge `source` into `target`.
pub fn deep_merge(target: &mut Value, source: Value) -> Result<(), MergeError> {
    merge_value(target, source, 0)
}

/// Merge the entries of `source` into the `target` object.
pub fn merge_into(target: &mut Map<String, Value>, source: Map<String, Value>) -> Result<(), MergeError> {
    merge_map(target, source, 0)
}

fn merge_value(target: &mut Value, source: Value, depth: usize) -> Result<(), MergeError> {
    match (target, source) {
        (Value::Object(target), Value::Object(source)) => merge_map(target, source, depth),
        (target, source) => {
            *target = source;
            Ok(())
        }
    }
}

fn merge_map(
    target: &mut Map<String, Value>,
    source: Map<String, Value>,
    depth: usize,
) -> Result<(), MergeError> {
    if depth >= MAX_MERGE_DEPTH {
        return Err(MergeError::DepthExceeded(MAX_MERGE_DEPTH));
    }

    for (key, value) in source {
        let both_objects = value.is_object() && target.get(&key).is_some_and(Value::is_object);
        match target.get_mut(&key) {
            Some(existing) if both_objects => merge_value(existing, value, depth + 1)?,
            _ => {
                target.insert(key, value);
            }
        }
    }

    Ok(())
}
