//! Numeric statistic kinds

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

use crate::error::{Result, SchemaError};

/// Placeholder substituted in output messages
pub const PLACEHOLDER: &str = "%s";

/// Default number of digits evaluated values are rounded to
pub const DEFAULT_ROUND_DIGITS: u32 = 3;
/// Most digits an `f64` can meaningfully be rounded to
pub const MAX_ROUND_DIGITS: u32 = 15;

/// Result of evaluating a statistic
#[derive(Debug, Clone, PartialEq)]
pub enum StatValue {
    Single(f64),
    Parts(Vec<f64>),
}

impl StatValue {
    /// Values in placeholder order
    pub fn parts(&self) -> Vec<f64> {
        match self {
            StatValue::Single(v) => vec![*v],
            StatValue::Parts(parts) => parts.clone(),
        }
    }
}

/// A statistic tracked for a game
pub trait Statistic: fmt::Debug {
    /// Registry name of this statistic kind
    fn kind(&self) -> &'static str;

    fn output_msg(&self) -> &str;

    fn update(&mut self, value: f64);

    fn eval(&self) -> StatValue;

    /// Persistable state
    fn to_json(&self) -> Value;

    /// Restore state written by `to_json`; unknown attributes are rejected
    fn from_json(&mut self, attrs: &Value) -> Result<()>;

    /// Output message with each placeholder replaced by the next evaluated part
    fn render(&self) -> String {
        let mut parts = self.eval().parts().into_iter();
        let mut pieces = self.output_msg().split(PLACEHOLDER);
        let mut out = pieces.next().unwrap_or_default().to_string();
        for piece in pieces {
            match parts.next() {
                Some(part) => out.push_str(&part.to_string()),
                None => out.push_str(PLACEHOLDER),
            }
            out.push_str(piece);
        }
        out
    }
}

/// Running total and sample count shared by the numeric kinds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NumericState {
    pub value: f64,
    /// Population size
    pub n: u64,
    #[serde(default = "default_round_digits")]
    pub rnd_digits: u32,
}

fn default_round_digits() -> u32 {
    DEFAULT_ROUND_DIGITS
}

impl Default for NumericState {
    fn default() -> Self {
        Self {
            value: 0.0,
            n: 0,
            rnd_digits: DEFAULT_ROUND_DIGITS,
        }
    }
}

impl NumericState {
    fn to_json(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }

    fn load(&mut self, kind: &str, attrs: &Value) -> Result<()> {
        let state: NumericState = serde_json::from_value(attrs.clone()).map_err(|e| {
            SchemaError::Construction(format!("failed to load {} statistic: {}", kind, e))
        })?;
        if state.rnd_digits > MAX_ROUND_DIGITS {
            return Err(SchemaError::Construction(format!(
                "failed to load {} statistic: rnd_digits {} exceeds {}",
                kind, state.rnd_digits, MAX_ROUND_DIGITS
            )));
        }
        *self = state;
        Ok(())
    }

    fn round(&self, value: f64) -> f64 {
        // MAX_ROUND_DIGITS fits an i32
        let scale = 10f64.powi(self.rnd_digits.min(MAX_ROUND_DIGITS) as i32);
        (value * scale).round() / scale
    }

    /// `value / n`, zero before any sample
    fn quotient(&self) -> f64 {
        if self.n == 0 {
            0.0
        } else {
            self.value / self.n as f64
        }
    }
}

/// A plain accumulated number. Expects one placeholder.
#[derive(Debug, Clone, PartialEq)]
pub struct Number {
    output_msg: String,
    state: NumericState,
}

impl Number {
    pub fn new(output_msg: impl Into<String>) -> Self {
        Self {
            output_msg: output_msg.into(),
            state: NumericState::default(),
        }
    }
}

impl Statistic for Number {
    fn kind(&self) -> &'static str {
        "Number"
    }

    fn output_msg(&self) -> &str {
        &self.output_msg
    }

    fn update(&mut self, value: f64) {
        self.state.value += value;
    }

    fn eval(&self) -> StatValue {
        StatValue::Single(self.state.value)
    }

    fn to_json(&self) -> Value {
        self.state.to_json()
    }

    fn from_json(&mut self, attrs: &Value) -> Result<()> {
        self.state.load(self.kind(), attrs)
    }
}

/// Mean of all samples. Expects one placeholder.
#[derive(Debug, Clone, PartialEq)]
pub struct Mean {
    output_msg: String,
    state: NumericState,
}

impl Mean {
    pub fn new(output_msg: impl Into<String>) -> Self {
        Self {
            output_msg: output_msg.into(),
            state: NumericState::default(),
        }
    }
}

impl Statistic for Mean {
    fn kind(&self) -> &'static str {
        "Mean"
    }

    fn output_msg(&self) -> &str {
        &self.output_msg
    }

    fn update(&mut self, value: f64) {
        self.state.value += value;
        self.state.n += 1;
    }

    fn eval(&self) -> StatValue {
        StatValue::Single(self.state.round(self.state.quotient()))
    }

    fn to_json(&self) -> Value {
        self.state.to_json()
    }

    fn from_json(&mut self, attrs: &Value) -> Result<()> {
        self.state.load(self.kind(), attrs)
    }
}

/// Successes out of attempts, then the percentage. A message with only two
/// placeholders leaves the percentage out.
#[derive(Debug, Clone, PartialEq)]
pub struct Ratio {
    output_msg: String,
    state: NumericState,
}

impl Ratio {
    pub fn new(output_msg: impl Into<String>) -> Self {
        Self {
            output_msg: output_msg.into(),
            state: NumericState::default(),
        }
    }
}

impl Statistic for Ratio {
    fn kind(&self) -> &'static str {
        "Ratio"
    }

    fn output_msg(&self) -> &str {
        &self.output_msg
    }

    fn update(&mut self, value: f64) {
        self.state.value += value;
        self.state.n += 1;
    }

    fn eval(&self) -> StatValue {
        StatValue::Parts(vec![
            self.state.value,
            self.state.n as f64,
            self.state.round(self.state.quotient() * 100.0),
        ])
    }

    fn to_json(&self) -> Value {
        self.state.to_json()
    }

    fn from_json(&mut self, attrs: &Value) -> Result<()> {
        self.state.load(self.kind(), attrs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_number_accumulates() {
        let mut stat = Number::new("Words typed: %s");
        stat.update(3.0);
        stat.update(4.0);
        assert_eq!(stat.eval(), StatValue::Single(7.0));
        assert_eq!(stat.render(), "Words typed: 7");
    }

    #[test]
    fn test_mean_rounds() {
        let mut stat = Mean::new("Average: %s");
        stat.update(1.0);
        stat.update(1.0);
        stat.update(0.0);
        assert_eq!(stat.eval(), StatValue::Single(0.667));
    }

    #[test]
    fn test_mean_without_samples_is_zero() {
        assert_eq!(Mean::new("%s").eval(), StatValue::Single(0.0));
    }

    #[test]
    fn test_ratio_with_and_without_percentage() {
        let mut stat = Ratio::new("%s of %s (%s%)");
        stat.update(1.0);
        stat.update(0.0);
        stat.update(1.0);
        stat.update(1.0);
        assert_eq!(stat.render(), "3 of 4 (75%)");

        let mut plain = Ratio::new("%s/%s");
        plain.update(1.0);
        assert_eq!(plain.render(), "1/1");
    }

    #[test]
    fn test_render_leaves_extra_placeholders() {
        let stat = Number::new("%s and %s");
        assert_eq!(stat.render(), "0 and %s");
    }

    #[test]
    fn test_state_round_trips_through_json() {
        let mut stat = Mean::new("%s");
        stat.update(5.0);
        let saved = stat.to_json();
        assert_eq!(saved, json!({"value": 5.0, "n": 1, "rnd_digits": 3}));

        let mut restored = Mean::new("%s");
        restored.from_json(&saved).unwrap();
        assert_eq!(restored, stat);
    }

    #[test]
    fn test_from_json_rejects_unknown_attributes() {
        let mut stat = Number::new("%s");
        let err = stat
            .from_json(&json!({"value": 1.0, "n": 0, "streak": 2}))
            .unwrap_err();
        assert!(err.to_string().contains("streak"));
    }

    #[test]
    fn test_round_digits_are_bounded() {
        let mut stat = Mean::new("%s");
        let err = stat
            .from_json(&json!({"value": 2.0, "n": 3, "rnd_digits": 400}))
            .unwrap_err();
        assert!(matches!(err, SchemaError::Construction(ref msg) if msg.contains("rnd_digits")));

        let err = stat
            .from_json(&json!({"value": 2.0, "n": 3, "rnd_digits": u32::MAX}))
            .unwrap_err();
        assert!(matches!(err, SchemaError::Construction(_)));

        stat.from_json(&json!({"value": 2.0, "n": 3, "rnd_digits": MAX_ROUND_DIGITS}))
            .unwrap();
        let StatValue::Single(mean) = stat.eval() else {
            panic!("Expected a single value");
        };
        assert!((mean - 2.0 / 3.0).abs() < 1e-12);
    }
}
