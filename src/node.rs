//! Schema tree nodes
//!
//! A `SchemaNode` carries an optional primary type, an optional element type,
//! an optional comparator check, and uniquely keyed children. A node without
//! any constraint is a router: it never rejects a value, it only forwards the
//! entries of a mapping to the children declared for them.
//!
//! Checking is sparse. When a mapping reaches a node, every entry with a
//! declared child is handed to that child, and every other entry is checked
//! against the node's own constraints. Since routers carry none, undeclared
//! keys pass untouched.
//!
//! Nodes typed as mappings are the exception: the mapping is their value, so
//! they check it as a whole before forwarding entries to any declared children.
//! An enforced mapping (one with a key type) applies its comparator to each
//! value rather than to the mapping itself.

use serde_json::{Map, Value};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use crate::error::{Result, SchemaError};
use crate::grammar::GrammarSpec;
use crate::predicate::Check;
use crate::value_type::ValueType;

/// A node of a compiled grammar tree
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SchemaNode {
    primary: Option<ValueType>,
    /// Type of sequence elements or mapping values
    subtype: Option<ValueType>,
    /// Type of mapping keys
    key_type: Option<ValueType>,
    check: Option<Check>,
    children: BTreeMap<String, SchemaNode>,
}

impl SchemaNode {
    /// Create a constrained node
    ///
    /// Fails when a subtype is given without a primary type, when the primary
    /// type cannot hold elements, or when the check cannot measure values of
    /// the primary type.
    pub fn new(
        primary: Option<ValueType>,
        subtype: Option<ValueType>,
        check: Option<Check>,
    ) -> Result<Self> {
        if let Some(subtype) = subtype {
            match primary {
                None => {
                    return Err(SchemaError::Construction(format!(
                        "subtype {} given without a primary type",
                        subtype
                    )))
                }
                Some(primary) if !primary.is_collection() => {
                    return Err(SchemaError::Construction(format!(
                        "subtype {} given for non-collection type {}",
                        subtype, primary
                    )))
                }
                Some(_) => {}
            }
        }

        if let (Some(check), Some(primary)) = (check, primary) {
            if !check.predicate.applies_to(primary) {
                return Err(SchemaError::Construction(format!(
                    "predicate {} cannot be applied to type {}",
                    check.predicate.name(),
                    primary
                )));
            }
        }

        Ok(Self {
            primary,
            subtype,
            key_type: None,
            check,
            children: BTreeMap::new(),
        })
    }

    /// A node with no constraints
    pub fn router() -> Self {
        Self::default()
    }

    /// A mapping node whose keys are all `key` and values all `value`
    ///
    /// The check measures each value, so it must apply to `value`.
    pub fn enforced_mapping(key: ValueType, value: ValueType, check: Option<Check>) -> Result<Self> {
        if let Some(check) = check {
            if !check.predicate.applies_to(value) {
                return Err(SchemaError::Construction(format!(
                    "predicate {} cannot be applied to mapping values of type {}",
                    check.predicate.name(),
                    value
                )));
            }
        }

        Ok(Self {
            primary: Some(ValueType::Mapping),
            subtype: Some(value),
            key_type: Some(key),
            check,
            children: BTreeMap::new(),
        })
    }

    /// The leaf node a grammar entry describes
    pub fn from_spec(spec: &GrammarSpec) -> Result<Self> {
        match *spec {
            GrammarSpec::SingleTyped {
                primary,
                subtype,
                check,
            } => Self::new(Some(primary), subtype, check),
            GrammarSpec::EnforcedMapping { key, value, check } => {
                Self::enforced_mapping(key, value, check)
            }
        }
    }

    pub fn primary(&self) -> Option<ValueType> {
        self.primary
    }

    pub fn subtype(&self) -> Option<ValueType> {
        self.subtype
    }

    /// Whether this node only routes
    pub fn is_router(&self) -> bool {
        self.primary.is_none() && self.subtype.is_none() && self.check.is_none()
    }

    pub fn child_exists(&self, segment: &str) -> bool {
        self.children.contains_key(segment)
    }

    pub fn child(&self, segment: &str) -> Option<&SchemaNode> {
        self.children.get(segment)
    }

    pub fn child_mut(&mut self, segment: &str) -> Option<&mut SchemaNode> {
        self.children.get_mut(segment)
    }

    pub fn children(&self) -> impl Iterator<Item = (&str, &SchemaNode)> {
        self.children.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Attach `child` under `segment`; a segment can only be used once
    pub fn insert_child(&mut self, segment: impl Into<String>, child: SchemaNode) -> Result<()> {
        let segment = segment.into();
        if self.children.contains_key(&segment) {
            return Err(SchemaError::DuplicateKey { key: segment });
        }
        self.children.insert(segment, child);
        Ok(())
    }

    /// Check `value` against this node and everything beneath it
    pub fn visit(&self, value: &Value) -> Result<()> {
        match value {
            Value::Object(map) if self.primary == Some(ValueType::Mapping) => {
                self.leaf_check(value)?;
                for (key, sub) in map {
                    if let Some(child) = self.children.get(key) {
                        child.visit(sub)?;
                    }
                }
                Ok(())
            }
            Value::Object(map) => {
                for (key, sub) in map {
                    match self.children.get(key) {
                        Some(child) => child.visit(sub)?,
                        None => self.leaf_check(sub)?,
                    }
                }
                Ok(())
            }
            _ => self.leaf_check(value),
        }
    }

    /// Check `value` against this node's own constraints: primary type first,
    /// then key and element types, then the comparator (on every value of an
    /// enforced mapping)
    pub fn leaf_check(&self, value: &Value) -> Result<()> {
        if let Some(primary) = self.primary {
            if !primary.matches(value) {
                return Err(SchemaError::TypeMismatch {
                    found: ValueType::of(value).to_string(),
                    expected: primary.to_string(),
                });
            }
        }

        if let (Some(key_type), Value::Object(map)) = (self.key_type, value) {
            self.check_keys(key_type, map)?;
        }

        if let Some(subtype) = self.subtype {
            self.check_elements(subtype, value)?;
        }

        if let Some(check) = &self.check {
            match (self.key_type, value) {
                (Some(_), Value::Object(map)) => {
                    for entry in map.values() {
                        check.evaluate(entry)?;
                    }
                }
                _ => check.evaluate(value)?,
            }
        }

        Ok(())
    }

    fn check_keys(&self, key_type: ValueType, map: &Map<String, Value>) -> Result<()> {
        let offending: BTreeSet<&'static str> = map
            .keys()
            .filter(|key| !key_type.matches_key(key))
            .map(|key| ValueType::of_key(key).type_name())
            .collect();

        if offending.is_empty() {
            Ok(())
        } else {
            Err(SchemaError::TypeMismatch {
                found: format!(
                    "{} key",
                    offending.into_iter().collect::<Vec<_>>().join(", ")
                ),
                expected: format!("{} key", key_type),
            })
        }
    }

    fn check_elements(&self, subtype: ValueType, value: &Value) -> Result<()> {
        let elements: Box<dyn Iterator<Item = &Value> + '_> = match value {
            Value::Array(items) => Box::new(items.iter()),
            Value::Object(map) => Box::new(map.values()),
            other => {
                return Err(SchemaError::TypeMismatch {
                    found: ValueType::of(other).to_string(),
                    expected: format!("collection of {}", subtype),
                })
            }
        };

        let offending: BTreeSet<&'static str> = elements
            .filter(|element| !subtype.matches(element))
            .map(|element| ValueType::of(element).type_name())
            .collect();

        if offending.is_empty() {
            Ok(())
        } else {
            Err(SchemaError::SubtypeMismatch {
                primary: ValueType::of(value).to_string(),
                found: offending.into_iter().map(String::from).collect(),
                expected: subtype.to_string(),
            })
        }
    }

    /// One-line description of this node's own constraints
    pub fn describe(&self) -> String {
        if self.is_router() {
            return "*".to_string();
        }

        let mut out = match (self.primary, self.key_type, self.subtype) {
            (Some(primary), Some(key), Some(value)) => format!("{}<{}, {}>", primary, key, value),
            (Some(primary), None, Some(sub)) => format!("{}<{}>", primary, sub),
            (Some(primary), _, None) => primary.to_string(),
            (None, _, _) => "any".to_string(),
        };
        if let Some(check) = &self.check {
            out.push_str(&format!(
                " where {} {} {}",
                check.predicate.name(),
                check.mode,
                check.expected
            ));
        }
        out
    }

    fn write_tree(&self, f: &mut fmt::Formatter<'_>, depth: usize) -> fmt::Result {
        for (segment, child) in &self.children {
            writeln!(f, "{}{}: {}", "  ".repeat(depth), segment, child.describe())?;
            child.write_tree(f, depth + 1)?;
        }
        Ok(())
    }
}

impl fmt::Display for SchemaNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.describe())?;
        self.write_tree(f, 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::predicate::{CompareMode, Predicate};
    use serde_json::json;

    fn tags_node() -> SchemaNode {
        SchemaNode::new(
            Some(ValueType::Sequence),
            Some(ValueType::String),
            Some(Check::min_length(1.0)),
        )
        .unwrap()
    }

    #[test]
    fn test_subtype_requires_primary() {
        let err = SchemaNode::new(None, Some(ValueType::String), None).unwrap_err();
        assert!(matches!(err, SchemaError::Construction(_)));
    }

    #[test]
    fn test_subtype_requires_collection_primary() {
        let err = SchemaNode::new(Some(ValueType::Int), Some(ValueType::String), None).unwrap_err();
        assert!(matches!(err, SchemaError::Construction(_)));
    }

    #[test]
    fn test_predicate_must_apply_to_primary() {
        let err = SchemaNode::new(Some(ValueType::Bool), None, Some(Check::min_length(1.0)))
            .unwrap_err();
        assert!(matches!(err, SchemaError::Construction(_)));

        let ok = SchemaNode::new(
            Some(ValueType::Int),
            None,
            Some(Check::new(Predicate::Value, 0.0, CompareMode::Gt)),
        );
        assert!(ok.is_ok());
    }

    #[test]
    fn test_insert_child_rejects_duplicates() {
        let mut node = SchemaNode::router();
        node.insert_child("a", SchemaNode::router()).unwrap();
        let err = node.insert_child("a", SchemaNode::router()).unwrap_err();
        assert!(matches!(err, SchemaError::DuplicateKey { key } if key == "a"));
    }

    #[test]
    fn test_router_accepts_anything() {
        let node = SchemaNode::router();
        assert!(node.is_router());
        assert!(node.visit(&json!(12345)).is_ok());
        assert!(node.visit(&json!({"x": [1, "y"], "z": null})).is_ok());
    }

    #[test]
    fn test_unknown_keys_pass_through_router() {
        let mut root = SchemaNode::router();
        root.insert_child("doc", SchemaNode::new(Some(ValueType::String), None, None).unwrap())
            .unwrap();

        assert!(root.visit(&json!({"doc": "hi", "extra_field": 12345})).is_ok());
        assert!(root.visit(&json!({"doc": 5})).is_err());
    }

    #[test]
    fn test_subtype_check() {
        let node = tags_node();
        assert!(node.visit(&json!(["a", "b"])).is_ok());

        let err = node.visit(&json!([1, 2])).unwrap_err();
        assert!(matches!(
            err,
            SchemaError::SubtypeMismatch { ref found, ref expected, .. }
                if found == &vec!["int".to_string()] && expected == "string"
        ));
    }

    #[test]
    fn test_subtype_mismatch_names_distinct_offending_types() {
        let err = tags_node().visit(&json!(["a", 1, true, 2, false])).unwrap_err();
        match err {
            SchemaError::SubtypeMismatch { found, .. } => {
                assert_eq!(found, vec!["bool".to_string(), "int".to_string()]);
            }
            other => panic!("Expected SubtypeMismatch, got {:?}", other),
        }
    }

    #[test]
    fn test_empty_sequence_fails_length_predicate() {
        let err = tags_node().visit(&json!([])).unwrap_err();
        assert_eq!(err.to_string(), "Predicate failed: 0 >= 1");
    }

    #[test]
    fn test_type_checked_before_subtype_and_predicate() {
        let err = tags_node().visit(&json!("not a list")).unwrap_err();
        assert!(matches!(
            err,
            SchemaError::TypeMismatch { ref found, ref expected }
                if found == "string" && expected == "sequence"
        ));
    }

    fn difficulties_node() -> SchemaNode {
        SchemaNode::enforced_mapping(
            ValueType::Int,
            ValueType::String,
            Some(Check::min_length(1.0)),
        )
        .unwrap()
    }

    #[test]
    fn test_enforced_mapping_checks_keys_and_values() {
        let node = difficulties_node();
        assert!(node.visit(&json!({"1": "easy", "2": "hard"})).is_ok());

        let err = node.visit(&json!({"one": "easy"})).unwrap_err();
        assert!(matches!(
            err,
            SchemaError::TypeMismatch { ref found, ref expected }
                if found == "string key" && expected == "int key"
        ));

        let err = node.visit(&json!({"1": 5})).unwrap_err();
        assert!(matches!(err, SchemaError::SubtypeMismatch { .. }));

        let err = node.visit(&json!("easy")).unwrap_err();
        assert!(matches!(err, SchemaError::TypeMismatch { .. }));
    }

    #[test]
    fn test_enforced_mapping_measures_each_value() {
        let node = difficulties_node();

        let err = node.visit(&json!({"1": ""})).unwrap_err();
        assert_eq!(err.to_string(), "Predicate failed: 0 >= 1");

        let err = node.visit(&json!({"1": "easy", "2": ""})).unwrap_err();
        assert!(matches!(err, SchemaError::PredicateMismatch { .. }));

        // no values, nothing to measure
        assert!(node.visit(&json!({})).is_ok());
    }

    #[test]
    fn test_empty_output_msg_rejected() {
        let node = SchemaNode::enforced_mapping(
            ValueType::String,
            ValueType::String,
            Some(Check::min_length(1.0)),
        )
        .unwrap();

        assert!(node
            .visit(&json!({"cls": "Ratio", "output_msg": "Won %s of %s games (%s%%)"}))
            .is_ok());
        let err = node
            .visit(&json!({"cls": "Ratio", "output_msg": ""}))
            .unwrap_err();
        assert!(matches!(err, SchemaError::PredicateMismatch { .. }));
    }

    #[test]
    fn test_enforced_mapping_check_must_apply_to_values() {
        let err = SchemaNode::enforced_mapping(
            ValueType::String,
            ValueType::Bool,
            Some(Check::min_length(1.0)),
        )
        .unwrap_err();
        assert!(matches!(err, SchemaError::Construction(_)));

        let ok = SchemaNode::enforced_mapping(
            ValueType::String,
            ValueType::Int,
            Some(Check::new(Predicate::Value, 0.0, CompareMode::Gt)),
        );
        assert!(ok.is_ok());
    }

    #[test]
    fn test_mapping_node_still_routes_to_children() {
        let mut node = SchemaNode::new(Some(ValueType::Mapping), None, None).unwrap();
        node.insert_child("flag", SchemaNode::new(Some(ValueType::Bool), None, None).unwrap())
            .unwrap();

        assert!(node.visit(&json!({"flag": true, "other": 1})).is_ok());
        assert!(node.visit(&json!({"flag": "yes"})).is_err());
    }

    #[test]
    fn test_mapping_node_checks_whole_value_before_children() {
        let mut node =
            SchemaNode::new(Some(ValueType::Mapping), None, Some(Check::min_length(2.0))).unwrap();
        node.insert_child("flag", SchemaNode::new(Some(ValueType::Bool), None, None).unwrap())
            .unwrap();

        // the child would reject "yes", but the entry count fails first
        let err = node.visit(&json!({"flag": "yes"})).unwrap_err();
        assert_eq!(err.to_string(), "Predicate failed: 1 >= 2");

        let err = node.visit(&json!({"flag": "yes", "other": 1})).unwrap_err();
        assert!(matches!(err, SchemaError::TypeMismatch { ref found, .. } if found == "string"));
    }

    #[test]
    fn test_constrained_node_checks_each_undeclared_entry() {
        let node = SchemaNode::new(Some(ValueType::Bool), None, None).unwrap();
        assert!(node.visit(&json!({"a": true, "b": false})).is_ok());
        assert!(node.visit(&json!({"a": true, "b": 1})).is_err());
    }

    #[test]
    fn test_describe() {
        assert_eq!(SchemaNode::router().describe(), "*");
        assert_eq!(tags_node().describe(), "sequence<string> where length >= 1");
        let mapping =
            SchemaNode::enforced_mapping(ValueType::Int, ValueType::String, None).unwrap();
        assert_eq!(mapping.describe(), "mapping<int, string>");
    }
}
