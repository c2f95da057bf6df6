//! Change operations carried by the changes queue.

use compact_str::CompactString;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A pending write of `value` at a dotted key path.
///
/// On the wire a change op is a two-element array, `["user.id", "42"]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "(CompactString, Value)", into = "(CompactString, Value)")]
pub struct ChangeOp {
    pub key: CompactString,
    pub value: Value,
}

impl ChangeOp {
    pub fn new(key: impl Into<CompactString>, value: impl Into<Value>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

impl From<(CompactString, Value)> for ChangeOp {
    fn from((key, value): (CompactString, Value)) -> Self {
        Self { key, value }
    }
}

impl From<ChangeOp> for (CompactString, Value) {
    fn from(op: ChangeOp) -> Self {
        (op.key, op.value)
    }
}
