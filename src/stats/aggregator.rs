//! Per-game statistic collection

use serde_json::{Map, Value};

use super::numeric::Statistic;
use crate::error::{Result, SchemaError};

/// Statistics of one game keyed by title, in insertion order
#[derive(Debug, Default)]
pub struct StatAggregator {
    stats: Vec<(String, Box<dyn Statistic>)>,
}

impl StatAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, title: impl Into<String>, stat: Box<dyn Statistic>) -> Result<()> {
        let title = title.into();
        if self.position(&title).is_some() {
            return Err(SchemaError::DuplicateKey { key: title });
        }
        self.stats.push((title, stat));
        Ok(())
    }

    pub fn remove(&mut self, title: &str) -> Result<Box<dyn Statistic>> {
        let index = self.position(title).ok_or_else(|| missing(title))?;
        Ok(self.stats.remove(index).1)
    }

    pub fn get(&self, title: &str) -> Option<&dyn Statistic> {
        self.stats
            .iter()
            .find(|(t, _)| t == title)
            .map(|(_, stat)| stat.as_ref())
    }

    pub fn get_mut(&mut self, title: &str) -> Option<&mut Box<dyn Statistic>> {
        self.stats
            .iter_mut()
            .find(|(t, _)| t == title)
            .map(|(_, stat)| stat)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &dyn Statistic)> {
        self.stats.iter().map(|(t, stat)| (t.as_str(), stat.as_ref()))
    }

    pub fn titles(&self) -> impl Iterator<Item = &str> {
        self.stats.iter().map(|(t, _)| t.as_str())
    }

    pub fn len(&self) -> usize {
        self.stats.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stats.is_empty()
    }

    /// Saved state of every statistic keyed by title
    pub fn to_json(&self) -> Value {
        let map: Map<String, Value> = self
            .stats
            .iter()
            .map(|(t, stat)| (t.clone(), stat.to_json()))
            .collect();
        Value::Object(map)
    }

    /// Restore saved state; titles absent from `saved` keep their state
    pub fn load_json(&mut self, saved: &Value) -> Result<()> {
        let Some(saved) = saved.as_object() else {
            return Ok(());
        };
        for (title, stat) in &mut self.stats {
            if let Some(attrs) = saved.get(title.as_str()) {
                stat.from_json(attrs)
                    .map_err(|e| SchemaError::at(title.as_str(), e))?;
            }
        }
        Ok(())
    }

    fn position(&self, title: &str) -> Option<usize> {
        self.stats.iter().position(|(t, _)| t == title)
    }
}

fn missing(title: &str) -> SchemaError {
    SchemaError::MissingRequiredKey {
        key: title.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stats::{Mean, Number};
    use serde_json::json;

    fn aggregator() -> StatAggregator {
        let mut agg = StatAggregator::new();
        agg.add("played", Box::new(Number::new("Played %s"))).unwrap();
        agg.add("guesses", Box::new(Mean::new("Average guesses %s"))).unwrap();
        agg
    }

    #[test]
    fn test_duplicate_title_rejected() {
        let mut agg = aggregator();
        let err = agg.add("played", Box::new(Number::new("%s"))).unwrap_err();
        assert!(matches!(err, SchemaError::DuplicateKey { key } if key == "played"));
        assert_eq!(agg.len(), 2);
    }

    #[test]
    fn test_remove() {
        let mut agg = aggregator();
        assert_eq!(agg.remove("played").unwrap().kind(), "Number");
        assert!(agg.get("played").is_none());
        assert!(matches!(
            agg.remove("played").unwrap_err(),
            SchemaError::MissingRequiredKey { .. }
        ));
    }

    #[test]
    fn test_save_and_load_state() {
        let mut agg = aggregator();
        agg.get_mut("played").unwrap().update(4.0);
        let saved = agg.to_json();
        assert_eq!(saved["played"], json!({"value": 4.0, "n": 0, "rnd_digits": 3}));

        let mut fresh = aggregator();
        fresh.load_json(&saved).unwrap();
        assert_eq!(fresh.get("played").unwrap().render(), "Played 4");
    }

    #[test]
    fn test_load_reports_bad_state_by_title() {
        let mut agg = aggregator();
        let err = agg
            .load_json(&json!({"guesses": {"value": 1.0, "n": 1, "best": 3}}))
            .unwrap_err();
        assert_eq!(err.path(), Some("guesses"));
    }
}
