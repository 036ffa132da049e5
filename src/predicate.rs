//! Comparator predicates attached to grammar nodes
//!
//! A predicate measures a value (its length, or its numeric value) and the
//! measurement is compared against an expected number under a `CompareMode`.
//! Predicates are plain data so grammar tables can be written to and read
//! from files.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

use crate::error::{Result, SchemaError};
use crate::value_type::ValueType;

/// How a measurement is compared against the expected value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompareMode {
    #[default]
    Eq,
    Gt,
    Gte,
    Lt,
    Lte,
}

impl CompareMode {
    pub fn symbol(&self) -> &'static str {
        match self {
            CompareMode::Eq => "==",
            CompareMode::Gt => ">",
            CompareMode::Gte => ">=",
            CompareMode::Lt => "<",
            CompareMode::Lte => "<=",
        }
    }

    /// `actual <mode> expected`
    pub fn compare(&self, actual: f64, expected: f64) -> bool {
        match self {
            CompareMode::Eq => actual == expected,
            CompareMode::Gt => actual > expected,
            CompareMode::Gte => actual >= expected,
            CompareMode::Lt => actual < expected,
            CompareMode::Lte => actual <= expected,
        }
    }
}

impl fmt::Display for CompareMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

/// What a predicate measures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Predicate {
    /// Character count of a string, element count of a sequence or mapping
    Length,
    /// The number itself
    Value,
}

impl Predicate {
    pub fn name(&self) -> &'static str {
        match self {
            Predicate::Length => "length",
            Predicate::Value => "value",
        }
    }

    /// Measure `value`, or `None` when this predicate cannot measure it
    pub fn measure(&self, value: &Value) -> Option<f64> {
        match (self, value) {
            (Predicate::Length, Value::String(s)) => Some(s.chars().count() as f64),
            (Predicate::Length, Value::Array(items)) => Some(items.len() as f64),
            (Predicate::Length, Value::Object(map)) => Some(map.len() as f64),
            (Predicate::Value, Value::Number(n)) => n.as_f64(),
            _ => None,
        }
    }

    /// Whether values of `primary` can be measured at all
    pub fn applies_to(&self, primary: ValueType) -> bool {
        match self {
            Predicate::Length => primary.is_measurable(),
            Predicate::Value => matches!(primary, ValueType::Int | ValueType::Float),
        }
    }
}

/// A predicate together with the expected value and comparison mode
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Check {
    pub predicate: Predicate,
    pub expected: f64,
    #[serde(default)]
    pub mode: CompareMode,
}

impl Check {
    pub const fn new(predicate: Predicate, expected: f64, mode: CompareMode) -> Self {
        Self {
            predicate,
            expected,
            mode,
        }
    }

    /// Length of at least `n`
    pub const fn min_length(n: f64) -> Self {
        Self::new(Predicate::Length, n, CompareMode::Gte)
    }

    /// Run the check against `value`
    pub fn evaluate(&self, value: &Value) -> Result<()> {
        let actual = self.predicate.measure(value).ok_or_else(|| {
            SchemaError::PredicateMismatch {
                actual: format!("<no {} for {}>", self.predicate.name(), ValueType::of(value)),
                mode: self.mode.symbol().to_string(),
                expected: self.expected.to_string(),
            }
        })?;

        if self.mode.compare(actual, self.expected) {
            Ok(())
        } else {
            Err(SchemaError::PredicateMismatch {
                actual: actual.to_string(),
                mode: self.mode.symbol().to_string(),
                expected: self.expected.to_string(),
            })
        }
    }
}
