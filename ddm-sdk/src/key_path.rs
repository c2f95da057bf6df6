//! Dotted key-path access into the shared data.
//!
//! `"user.id"` addresses `data["user"]["id"]`. Numeric segments index into
//! arrays (`"cart.lineItems.0.product"`).

use serde_json::{Map, Value};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KeyPathError {
    #[error("empty key path")]
    Empty,

    #[error("array index {index} is too far past the end (length {len})")]
    IndexOutOfRange { index: usize, len: usize },
}

/// Largest number of `null`s a single write may pad an array with.
pub const MAX_ARRAY_GAP: usize = 1024;

fn step<'a>(value: &'a Value, segment: &str) -> Option<&'a Value> {
    match value {
        Value::Object(map) => map.get(segment),
        Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    }
}

/// Resolve `path` against `root`. Returns `None` when any segment is absent,
/// which is distinct from a present `null`.
pub fn get<'a>(path: &str, root: &'a Value) -> Option<&'a Value> {
    if path.is_empty() {
        return Some(root);
    }
    path.split('.').try_fold(root, step)
}

fn step_mut<'a>(value: &'a mut Value, segment: &str) -> Result<&'a mut Value, KeyPathError> {
    let index = match &*value {
        Value::Array(_) => segment.parse::<usize>().ok(),
        _ => None,
    };
    if index.is_none() && !value.is_object() {
        *value = Value::Object(Map::new());
    }
    match (value, index) {
        (Value::Array(items), Some(i)) => {
            let len = items.len();
            if i >= len {
                let new_len = i
                    .checked_add(1)
                    .filter(|n| n - len <= MAX_ARRAY_GAP)
                    .ok_or(KeyPathError::IndexOutOfRange { index: i, len })?;
                items.resize(new_len, Value::Null);
            }
            Ok(&mut items[i])
        }
        (Value::Object(map), _) => Ok(map.entry(segment).or_insert(Value::Null)),
        (other, _) => Ok(other),
    }
}

/// Write `value` at `path`, creating intermediate objects as needed.
/// Intermediate scalars are replaced by objects.
pub fn set(path: &str, value: Value, root: &mut Value) -> Result<(), KeyPathError> {
    if path.is_empty() {
        return Err(KeyPathError::Empty);
    }
    let mut segments = path.split('.').peekable();
    let mut cursor = root;
    while let Some(segment) = segments.next() {
        let slot = step_mut(cursor, segment)?;
        if segments.peek().is_none() {
            *slot = value;
            return Ok(());
        }
        cursor = slot;
    }
    Ok(())
}
