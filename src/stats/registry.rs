//! Statistic kind registry
//!
//! Maps the names used in `cls` fields to factories. Registration is
//! explicit; a name can only be claimed once.

use serde_json::Value;
use std::collections::BTreeMap;
use tracing::debug;

use super::aggregator::StatAggregator;
use super::numeric::{Mean, Number, Ratio, Statistic};
use crate::error::{Result, SchemaError};
use crate::grammar::{STAT_CLS_TYPE, STAT_OUTPUT_MSG};

/// Builds a statistic from its output message
pub type StatFactory = fn(&str) -> Box<dyn Statistic>;

#[derive(Clone)]
pub struct StatRegistry {
    factories: BTreeMap<String, StatFactory>,
}

impl std::fmt::Debug for StatRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StatRegistry")
            .field("kinds", &self.factories.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl Default for StatRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

impl StatRegistry {
    /// An empty registry
    pub fn new() -> Self {
        Self {
            factories: BTreeMap::new(),
        }
    }

    /// Registry with `Number`, `Mean` and `Ratio`
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        let builtins: [(&str, StatFactory); 3] = [
            ("Number", |msg| Box::new(Number::new(msg))),
            ("Mean", |msg| Box::new(Mean::new(msg))),
            ("Ratio", |msg| Box::new(Ratio::new(msg))),
        ];
        for (name, factory) in builtins {
            registry.factories.insert(name.to_string(), factory);
        }
        registry
    }

    pub fn register(&mut self, name: impl Into<String>, factory: StatFactory) -> Result<()> {
        let name = name.into();
        if self.factories.contains_key(&name) {
            return Err(SchemaError::DuplicateKey { key: name });
        }
        debug!(kind = %name, "registered statistic kind");
        self.factories.insert(name, factory);
        Ok(())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    pub fn kinds(&self) -> impl Iterator<Item = &str> {
        self.factories.keys().map(String::as_str)
    }

    pub fn create(&self, name: &str, output_msg: &str) -> Result<Box<dyn Statistic>> {
        let factory = self
            .factories
            .get(name)
            .ok_or_else(|| SchemaError::UnknownStatType(name.to_string()))?;
        Ok(factory(output_msg))
    }

    /// One statistic per descriptor of a validated `stat_items` block, in
    /// document order
    pub fn build_aggregator(&self, stat_items: &Value) -> Result<StatAggregator> {
        let mut aggregator = StatAggregator::new();
        let Some(items) = stat_items.as_object() else {
            return Ok(aggregator);
        };

        for (title, descriptor) in items {
            let field = |key: &str| {
                descriptor.get(key).and_then(Value::as_str).ok_or_else(|| {
                    SchemaError::at(
                        format!("{}/{}", title, key),
                        SchemaError::MissingRequiredKey {
                            key: key.to_string(),
                        },
                    )
                })
            };
            let stat = self
                .create(field(STAT_CLS_TYPE)?, field(STAT_OUTPUT_MSG)?)
                .map_err(|e| SchemaError::at(title.as_str(), e))?;
            aggregator.add(title.clone(), stat)?;
        }
        Ok(aggregator)
    }
}
