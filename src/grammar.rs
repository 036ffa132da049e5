//! Grammar tables
//!
//! A grammar table maps slash-delimited paths (`stat_settings/order_by`) to a
//! `GrammarSpec` describing the value expected at that path. Tables are
//! ordered: entries are compiled in declaration order, which decides where
//! duplicate declarations are reported.
//!
//! ## Example table (JSON):
//! ```json
//! {
//!   "difficulties": {
//!     "kind": "enforced_mapping",
//!     "key": "int",
//!     "value": "string",
//!     "check": { "predicate": "length", "expected": 1, "mode": "gte" }
//!   },
//!   "stat_settings/include_default_statistics": {
//!     "kind": "single_typed",
//!     "primary": "bool"
//!   }
//! }
//! ```

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs;
use std::path::Path;

use crate::error::{Result, SchemaError};
use crate::predicate::Check;
use crate::value_type::ValueType;

/// Separator between path segments
pub const PATH_SEPARATOR: char = '/';

/// Top-level key holding the games collection
pub const GAMES: &str = "games";
/// Top-level key holding the default game settings
pub const DEFAULTS: &str = "defaults";
/// Difficulty number to label
pub const DIFFICULTY: &str = "difficulties";
/// Whether default difficulties are merged into a game's own
pub const DIFFICULTY_INCLUDE: &str = "include_default_diffs";
/// Game documentation
pub const DOC: &str = "game_docstring";
/// Name shown in the main menu
pub const GAME_DISPLAY_NAME: &str = "display_name";
/// Whether a game is unlocked for new players
pub const GAME_UNLOCKED: &str = "unlocked_by_default";
/// Variation number to name
pub const GAME_VARIATIONS: &str = "game_variations";
/// Whether default variations are merged into a game's own
pub const GAME_VARIATION_INCLUSION: &str = "include_default_variations";
/// Statistic descriptors, keyed by statistic name
pub const GAME_STATS: &str = "stat_items";
/// Statistic settings block
pub const GAME_STAT_SETTINGS: &str = "stat_settings";
/// Whether default statistics are merged into a game's own
pub const STAT_INCLUSION: &str = "include_default_statistics";
/// Display order of statistics
pub const STAT_ORDER: &str = "order_by";
/// Statistic class identifier
pub const STAT_CLS_TYPE: &str = "cls";
/// Statistic output message
pub const STAT_OUTPUT_MSG: &str = "output_msg";

/// Keys every document must carry
pub const REQUIRED_DATA_KEYS: &[&str] = &[GAMES, DEFAULTS];
/// Keys every statistic descriptor must carry
pub const REQUIRED_STAT_KEYS: &[&str] = &[STAT_CLS_TYPE, STAT_OUTPUT_MSG];
/// Game grammar paths the defaults block may leave out
pub const DEFAULT_EXCLUSIONS: &[&str] = &[GAME_DISPLAY_NAME, "stat_settings/order_by"];

const NON_EMPTY: Check = Check::min_length(1.0);

/// Grammar for game objects and the defaults block
pub const GAME_GRAMMAR: &[(&str, GrammarSpec)] = &[
    (
        DIFFICULTY,
        GrammarSpec::enforced_mapping(ValueType::Int, ValueType::String).with_check(NON_EMPTY),
    ),
    (DIFFICULTY_INCLUDE, GrammarSpec::single(ValueType::Bool)),
    (DOC, GrammarSpec::single(ValueType::String).with_check(NON_EMPTY)),
    (GAME_UNLOCKED, GrammarSpec::single(ValueType::Bool)),
    (
        GAME_DISPLAY_NAME,
        GrammarSpec::single(ValueType::String).with_check(NON_EMPTY),
    ),
    (
        GAME_VARIATIONS,
        GrammarSpec::enforced_mapping(ValueType::Int, ValueType::String).with_check(NON_EMPTY),
    ),
    (GAME_VARIATION_INCLUSION, GrammarSpec::single(ValueType::Bool)),
    (
        "stat_settings/include_default_statistics",
        GrammarSpec::single(ValueType::Bool),
    ),
    (
        "stat_settings/order_by",
        GrammarSpec::single(ValueType::Sequence)
            .with_subtype(ValueType::String)
            .with_check(NON_EMPTY),
    ),
];

/// Grammar applied to every statistic descriptor as a whole
pub const STAT_GRAMMAR: GrammarSpec =
    GrammarSpec::enforced_mapping(ValueType::String, ValueType::String).with_check(NON_EMPTY);

/// Constraint declared for one grammar path
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum GrammarSpec {
    /// One value of `primary` type, optionally a collection of `subtype`
    SingleTyped {
        primary: ValueType,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        subtype: Option<ValueType>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        check: Option<Check>,
    },
    /// A mapping whose keys are all `key` and whose values are all `value`
    EnforcedMapping {
        key: ValueType,
        value: ValueType,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        check: Option<Check>,
    },
}

impl GrammarSpec {
    pub const fn single(primary: ValueType) -> Self {
        GrammarSpec::SingleTyped {
            primary,
            subtype: None,
            check: None,
        }
    }

    pub const fn enforced_mapping(key: ValueType, value: ValueType) -> Self {
        GrammarSpec::EnforcedMapping {
            key,
            value,
            check: None,
        }
    }

    /// Element type of the collection. On an `EnforcedMapping` this replaces
    /// the value type, since its values are its elements.
    pub const fn with_subtype(self, subtype: ValueType) -> Self {
        match self {
            GrammarSpec::SingleTyped { primary, check, .. } => GrammarSpec::SingleTyped {
                primary,
                subtype: Some(subtype),
                check,
            },
            GrammarSpec::EnforcedMapping { key, check, .. } => GrammarSpec::EnforcedMapping {
                key,
                value: subtype,
                check,
            },
        }
    }

    pub const fn with_check(self, check: Check) -> Self {
        match self {
            GrammarSpec::SingleTyped {
                primary, subtype, ..
            } => GrammarSpec::SingleTyped {
                primary,
                subtype,
                check: Some(check),
            },
            GrammarSpec::EnforcedMapping { key, value, .. } => GrammarSpec::EnforcedMapping {
                key,
                value,
                check: Some(check),
            },
        }
    }
}

/// An ordered `{path: GrammarSpec}` table
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GrammarTable {
    entries: Vec<(String, GrammarSpec)>,
}

impl GrammarTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Table from static `(path, spec)` pairs, in order
    pub fn from_static(entries: &[(&str, GrammarSpec)]) -> Self {
        Self {
            entries: entries
                .iter()
                .map(|(path, spec)| (path.to_string(), *spec))
                .collect(),
        }
    }

    /// The built-in game grammar
    pub fn game() -> Self {
        Self::from_static(GAME_GRAMMAR)
    }

    /// Append an entry. Duplicate paths are kept; the compiler rejects them.
    pub fn push(&mut self, path: impl Into<String>, spec: GrammarSpec) {
        self.entries.push((path.into(), spec));
    }

    /// Table from a JSON object, keeping the object's key order
    pub fn from_json_value(value: &Value) -> Result<Self> {
        let object = value.as_object().ok_or_else(|| {
            SchemaError::Construction(format!(
                "grammar table must be a mapping, found {}",
                ValueType::of(value)
            ))
        })?;

        let mut table = Self::new();
        for (path, spec) in object {
            let spec: GrammarSpec = serde_json::from_value(spec.clone())
                .map_err(|e| SchemaError::Construction(format!("{}: {}", path, e)))?;
            table.push(path.clone(), spec);
        }
        Ok(table)
    }

    pub fn from_json_str(content: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(content)?;
        Self::from_json_value(&value)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_json_str(&content)
    }

    /// JSON object form of this table. Later duplicates overwrite earlier ones.
    pub fn to_json(&self) -> Result<Value> {
        let mut object = serde_json::Map::new();
        for (path, spec) in &self.entries {
            object.insert(path.clone(), serde_json::to_value(spec)?);
        }
        Ok(Value::Object(object))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &GrammarSpec)> {
        self.entries.iter().map(|(path, spec)| (path.as_str(), spec))
    }

    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(path, _)| path.as_str())
    }

    /// Keys a defaults block checked against this table must carry: every
    /// path except the ones defaults cannot sensibly provide
    pub fn required_defaults(&self) -> Vec<String> {
        self.paths()
            .filter(|path| !DEFAULT_EXCLUSIONS.contains(path))
            .map(String::from)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Split `path` into its segments, rejecting empty ones
pub fn split_path(path: &str) -> Result<Vec<&str>> {
    let segments: Vec<&str> = path.split(PATH_SEPARATOR).collect();
    if segments.iter().any(|segment| segment.is_empty()) {
        return Err(SchemaError::Construction(format!(
            "empty segment in grammar path \"{}\"",
            path
        )));
    }
    Ok(segments)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::predicate::{CompareMode, Predicate};
    use serde_json::json;

    #[test]
    fn test_required_defaults_exclude_display_name_and_order() {
        let keys = GrammarTable::game().required_defaults();
        assert!(keys.iter().any(|k| k == DIFFICULTY));
        assert!(keys.iter().any(|k| k == "stat_settings/include_default_statistics"));
        assert!(!keys.iter().any(|k| k == GAME_DISPLAY_NAME));
        assert!(!keys.iter().any(|k| k == "stat_settings/order_by"));
        assert_eq!(keys.len(), GAME_GRAMMAR.len() - 2);
    }

    #[test]
    fn test_subtype_on_enforced_mapping_sets_value_type() {
        let spec = GrammarSpec::enforced_mapping(ValueType::Int, ValueType::String)
            .with_check(Check::min_length(1.0))
            .with_subtype(ValueType::Sequence);
        assert_eq!(
            spec,
            GrammarSpec::EnforcedMapping {
                key: ValueType::Int,
                value: ValueType::Sequence,
                check: Some(Check::min_length(1.0)),
            }
        );
    }

    #[test]
    fn test_builder_sets_subtype_and_check() {
        let spec = GrammarSpec::single(ValueType::Sequence)
            .with_subtype(ValueType::String)
            .with_check(Check::new(Predicate::Length, 2.0, CompareMode::Lt));
        assert_eq!(
            spec,
            GrammarSpec::SingleTyped {
                primary: ValueType::Sequence,
                subtype: Some(ValueType::String),
                check: Some(Check::new(Predicate::Length, 2.0, CompareMode::Lt)),
            }
        );
    }

    #[test]
    fn test_table_from_json_keeps_order() {
        let table = GrammarTable::from_json_value(&json!({
            "zeta": { "kind": "single_typed", "primary": "bool" },
            "alpha/beta": {
                "kind": "enforced_mapping",
                "key": "int",
                "value": "string",
                "check": { "predicate": "length", "expected": 1, "mode": "gte" }
            }
        }))
        .unwrap();

        let paths: Vec<_> = table.paths().collect();
        assert_eq!(paths, vec!["zeta", "alpha/beta"]);
        let (_, spec) = table.iter().nth(1).unwrap();
        assert_eq!(
            *spec,
            GrammarSpec::enforced_mapping(ValueType::Int, ValueType::String)
                .with_check(Check::min_length(1.0))
        );
    }

    #[test]
    fn test_builtin_table_survives_json() {
        let table = GrammarTable::game();
        let json = table.to_json().unwrap();
        assert_eq!(GrammarTable::from_json_value(&json).unwrap(), table);
    }

    #[test]
    fn test_unknown_kind_is_a_construction_error() {
        let err = GrammarTable::from_json_value(&json!({
            "doc": { "kind": "one_of", "primary": "string" }
        }))
        .unwrap_err();
        assert!(matches!(err, SchemaError::Construction(msg) if msg.starts_with("doc:")));
    }

    #[test]
    fn test_split_path_rejects_empty_segments() {
        assert_eq!(split_path("a/b").unwrap(), vec!["a", "b"]);
        assert!(split_path("a//b").is_err());
        assert!(split_path("/a").is_err());
        assert!(split_path("").is_err());
    }
}
