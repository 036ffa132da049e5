//! Runtime type tags for decoded documents
//!
//! Documents arrive as `serde_json::Value`. Grammar nodes constrain them with
//! a small, closed set of type tags:
//! - bool
//! - int: integral numbers only
//! - float: any number (integers are accepted)
//! - string
//! - sequence: JSON arrays
//! - mapping: JSON objects
//! - null
//!
//! Mapping keys are always text on the wire, so a key is classified by what it
//! spells: `"1"` is an int key, `"true"` a bool key, anything else a string key.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Type constraint a grammar node can place on a value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueType {
    Bool,
    Int,
    Float,
    String,
    Sequence,
    Mapping,
    Null,
}

impl ValueType {
    /// Name used in error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            ValueType::Bool => "bool",
            ValueType::Int => "int",
            ValueType::Float => "float",
            ValueType::String => "string",
            ValueType::Sequence => "sequence",
            ValueType::Mapping => "mapping",
            ValueType::Null => "null",
        }
    }

    /// Most specific tag describing `value`
    pub fn of(value: &Value) -> Self {
        match value {
            Value::Null => ValueType::Null,
            Value::Bool(_) => ValueType::Bool,
            Value::Number(n) if n.is_i64() || n.is_u64() => ValueType::Int,
            Value::Number(_) => ValueType::Float,
            Value::String(_) => ValueType::String,
            Value::Array(_) => ValueType::Sequence,
            Value::Object(_) => ValueType::Mapping,
        }
    }

    /// Most specific tag describing a mapping key. Int keys fit an `i64`;
    /// `NaN` and infinities spell strings, not floats.
    pub fn of_key(key: &str) -> Self {
        if key.parse::<i64>().is_ok() {
            ValueType::Int
        } else if key.parse::<f64>().map(f64::is_finite).unwrap_or(false) {
            ValueType::Float
        } else if key == "true" || key == "false" {
            ValueType::Bool
        } else {
            ValueType::String
        }
    }

    /// Whether `value` satisfies this constraint
    pub fn matches(&self, value: &Value) -> bool {
        self.accepts(ValueType::of(value))
    }

    /// Whether a mapping key satisfies this constraint
    pub fn matches_key(&self, key: &str) -> bool {
        match self {
            // every key is text
            ValueType::String => true,
            other => other.accepts(ValueType::of_key(key)),
        }
    }

    /// Whether this constraint can hold elements (and so carry a subtype)
    pub fn is_collection(&self) -> bool {
        matches!(self, ValueType::Sequence | ValueType::Mapping)
    }

    /// Whether a value of this type has a length
    pub fn is_measurable(&self) -> bool {
        matches!(
            self,
            ValueType::String | ValueType::Sequence | ValueType::Mapping
        )
    }

    fn accepts(&self, found: ValueType) -> bool {
        match (self, found) {
            (ValueType::Float, ValueType::Int) => true,
            (expected, found) => *expected == found,
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.type_name())
    }
}
