//! Resolved game catalog
//!
//! A validated document leaves a lot implicit: games may omit any setting and
//! fall back on `defaults`, or merge their own difficulties, variations and
//! statistics with the default ones. `GameCatalog` resolves all of that into
//! one `GameEntry` per game.
//!
//! ```text
//! defaults.difficulties = {1: Easy, 2: Hard}
//! hangman.difficulties  = {3: Expert}, include_default_diffs = true
//!     -> hangman: {1: Easy, 2: Hard, 3: Expert}
//! ```

use serde::Serialize;
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;
use tracing::debug;

use crate::error::{Result, SchemaError};
use crate::grammar::{
    DEFAULTS, DIFFICULTY, DIFFICULTY_INCLUDE, DOC, GAMES, GAME_DISPLAY_NAME, GAME_STATS,
    GAME_STAT_SETTINGS, GAME_UNLOCKED, GAME_VARIATIONS, GAME_VARIATION_INCLUSION, STAT_INCLUSION,
    STAT_ORDER,
};
use crate::stats::{StatAggregator, StatRegistry};

/// One game with every default applied
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GameEntry {
    pub name: String,
    pub display_name: String,
    pub docstring: String,
    pub unlocked_by_default: bool,
    pub difficulties: BTreeMap<i64, String>,
    pub variations: BTreeMap<i64, String>,
    /// Statistic descriptors in display order
    pub stat_items: Map<String, Value>,
}

/// Every game of a document, in document order
#[derive(Debug, Clone, Serialize)]
pub struct GameCatalog {
    games: Vec<GameEntry>,
}

impl GameCatalog {
    /// Resolve a document that already passed validation
    pub fn from_document(document: &Value) -> Result<Self> {
        let defaults = document
            .get(DEFAULTS)
            .and_then(Value::as_object)
            .ok_or_else(|| SchemaError::Catalog(format!("document has no {} block", DEFAULTS)))?;
        let games = document
            .get(GAMES)
            .and_then(Value::as_object)
            .ok_or_else(|| SchemaError::Catalog(format!("document has no {} block", GAMES)))?;

        let games = games
            .iter()
            .map(|(name, game)| {
                let game = game.as_object().ok_or_else(|| {
                    SchemaError::at(name.as_str(), SchemaError::Catalog("not a mapping".into()))
                })?;
                resolve_game(name, game, defaults).map_err(|e| SchemaError::at(name.as_str(), e))
            })
            .collect::<Result<Vec<_>>>()?;

        debug!(games = games.len(), "resolved game catalog");
        Ok(Self { games })
    }

    pub fn games(&self) -> &[GameEntry] {
        &self.games
    }

    pub fn game(&self, name: &str) -> Option<&GameEntry> {
        self.games.iter().find(|g| g.name == name)
    }

    pub fn len(&self) -> usize {
        self.games.len()
    }

    pub fn is_empty(&self) -> bool {
        self.games.is_empty()
    }

    /// Games unlocked for a new player, each with its lowest variation and
    /// lowest difficulty
    pub fn unlocked_games(&self) -> Vec<(&str, i64, i64)> {
        self.games
            .iter()
            .filter(|g| g.unlocked_by_default)
            .filter_map(|g| {
                let variation = *g.variations.keys().next()?;
                let difficulty = *g.difficulties.keys().next()?;
                Some((g.name.as_str(), variation, difficulty))
            })
            .collect()
    }

    /// Initial save data: `{game: {game_variations: {variation: [difficulty]}}}`
    pub fn new_player_data(&self) -> Value {
        let data: Map<String, Value> = self
            .unlocked_games()
            .into_iter()
            .map(|(name, variation, difficulty)| {
                let mut variations = Map::new();
                variations.insert(variation.to_string(), json!([difficulty]));
                let mut entry = Map::new();
                entry.insert(GAME_VARIATIONS.to_string(), Value::Object(variations));
                (name.to_string(), Value::Object(entry))
            })
            .collect();
        Value::Object(data)
    }

    /// Fresh statistics for `game`, in display order
    pub fn build_stats(&self, game: &str, registry: &StatRegistry) -> Result<StatAggregator> {
        let entry = self
            .game(game)
            .ok_or_else(|| SchemaError::Catalog(format!("unknown game \"{}\"", game)))?;
        registry
            .build_aggregator(&Value::Object(entry.stat_items.clone()))
            .map_err(|e| SchemaError::at(game, e))
    }
}

fn resolve_game(name: &str, game: &Map<String, Value>, defaults: &Map<String, Value>) -> Result<GameEntry> {
    // a game's own setting wins; the defaults block fills the rest
    let setting = |key: &str| game.get(key).or_else(|| defaults.get(key));

    let display_name = game
        .get(GAME_DISPLAY_NAME)
        .and_then(Value::as_str)
        .unwrap_or(name)
        .to_string();
    let docstring = setting(DOC).and_then(Value::as_str).unwrap_or_default().to_string();
    let unlocked_by_default = setting(GAME_UNLOCKED).and_then(Value::as_bool).unwrap_or(false);

    let difficulties = merge_numbered(game, defaults, DIFFICULTY, DIFFICULTY_INCLUDE)?;
    let variations = merge_numbered(game, defaults, GAME_VARIATIONS, GAME_VARIATION_INCLUSION)?;
    let stat_items = merge_stats(game, defaults)?;

    Ok(GameEntry {
        name: name.to_string(),
        display_name,
        docstring,
        unlocked_by_default,
        difficulties,
        variations,
        stat_items,
    })
}

/// Defaults first, then the game's own entries on top when the include flag
/// allows it. A game without entries of its own always takes the defaults.
fn merge_numbered(
    game: &Map<String, Value>,
    defaults: &Map<String, Value>,
    key: &str,
    include_flag: &str,
) -> Result<BTreeMap<i64, String>> {
    let own = numbered(game.get(key), key)?;
    if own.is_empty() {
        return numbered(defaults.get(key), key);
    }
    if !include_flag_set(game, defaults, include_flag) {
        return Ok(own);
    }

    let mut merged = numbered(defaults.get(key), key)?;
    merged.extend(own);
    Ok(merged)
}

fn numbered(value: Option<&Value>, key: &str) -> Result<BTreeMap<i64, String>> {
    let Some(entries) = value.and_then(Value::as_object) else {
        return Ok(BTreeMap::new());
    };
    entries
        .iter()
        .map(|(number, label)| {
            let number = number
                .parse::<i64>()
                .map_err(|_| SchemaError::Catalog(format!("{} key \"{}\" is not an integer", key, number)))?;
            let label = label
                .as_str()
                .ok_or_else(|| SchemaError::Catalog(format!("{} label for {} is not text", key, number)))?;
            Ok((number, label.to_string()))
        })
        .collect()
}

fn include_flag_set(game: &Map<String, Value>, defaults: &Map<String, Value>, flag: &str) -> bool {
    game.get(flag)
        .or_else(|| defaults.get(flag))
        .and_then(Value::as_bool)
        .unwrap_or(false)
}

fn stat_setting<'a>(block: &'a Map<String, Value>, key: &str) -> Option<&'a Value> {
    block.get(GAME_STAT_SETTINGS).and_then(|s| s.get(key))
}

fn merge_stats(game: &Map<String, Value>, defaults: &Map<String, Value>) -> Result<Map<String, Value>> {
    let include = stat_setting(game, STAT_INCLUSION)
        .or_else(|| stat_setting(defaults, STAT_INCLUSION))
        .and_then(Value::as_bool)
        .unwrap_or(false);

    let mut stats = Map::new();
    let own = game.get(GAME_STATS).and_then(Value::as_object);
    if include || own.is_none() {
        if let Some(default_stats) = defaults.get(GAME_STATS).and_then(Value::as_object) {
            stats.extend(default_stats.iter().map(|(k, v)| (k.clone(), v.clone())));
        }
    }
    if let Some(own) = own {
        stats.extend(own.iter().map(|(k, v)| (k.clone(), v.clone())));
    }

    // an inherited order may name default statistics this game leaves out
    match stat_setting(game, STAT_ORDER).and_then(Value::as_array) {
        Some(order) => apply_order(stats, order, true),
        None => match stat_setting(defaults, STAT_ORDER).and_then(Value::as_array) {
            Some(order) => apply_order(stats, order, false),
            None => Ok(stats),
        },
    }
}

/// Listed statistics first, in listed order, then the rest in document order
fn apply_order(stats: Map<String, Value>, order: &[Value], strict: bool) -> Result<Map<String, Value>> {
    let mut ordered = Map::new();
    for title in order.iter().filter_map(Value::as_str) {
        match stats.get(title) {
            Some(stat) => {
                ordered.insert(title.to_string(), stat.clone());
            }
            None if strict => {
                return Err(SchemaError::Catalog(format!(
                    "{} names unknown statistic \"{}\"",
                    STAT_ORDER, title
                )));
            }
            None => {}
        }
    }
    for (title, stat) in stats {
        if !ordered.contains_key(&title) {
            ordered.insert(title, stat);
        }
    }
    Ok(ordered)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn document() -> Value {
        json!({
            "defaults": {
                "difficulties": {"1": "Easy", "2": "Hard"},
                "include_default_diffs": true,
                "game_docstring": "A word game",
                "unlocked_by_default": false,
                "game_variations": {"1": "Classic"},
                "include_default_variations": false,
                "stat_settings": {"include_default_statistics": true},
                "stat_items": {
                    "played": {"cls": "Number", "output_msg": "Played %s"}
                }
            },
            "games": {
                "hangman": {
                    "display_name": "Hangman",
                    "unlocked_by_default": true,
                    "difficulties": {"3": "Expert"},
                    "game_variations": {"2": "Timed"},
                    "stat_settings": {"order_by": ["wins", "played"]},
                    "stat_items": {
                        "wins": {"cls": "Ratio", "output_msg": "%s/%s (%s%)"}
                    }
                },
                "jotto": {
                    "stat_settings": {"include_default_statistics": false},
                    "stat_items": {
                        "guesses": {"cls": "Mean", "output_msg": "Average %s"}
                    }
                }
            }
        })
    }

    fn catalog() -> GameCatalog {
        GameCatalog::from_document(&document()).unwrap()
    }

    #[test]
    fn test_defaults_fill_missing_settings() {
        let catalog = catalog();
        let jotto = catalog.game("jotto").unwrap();
        assert_eq!(jotto.display_name, "jotto");
        assert_eq!(jotto.docstring, "A word game");
        assert!(!jotto.unlocked_by_default);
        assert_eq!(jotto.variations, BTreeMap::from([(1, "Classic".to_string())]));
    }

    #[test]
    fn test_include_flag_merges_numbered_settings() {
        let catalog = catalog();
        let hangman = catalog.game("hangman").unwrap();
        assert_eq!(hangman.difficulties.keys().copied().collect::<Vec<_>>(), [1, 2, 3]);
        // include_default_variations is false in defaults
        assert_eq!(hangman.variations, BTreeMap::from([(2, "Timed".to_string())]));
    }

    #[test]
    fn test_stats_merged_and_ordered() {
        let catalog = catalog();
        let hangman = catalog.game("hangman").unwrap();
        assert_eq!(hangman.stat_items.keys().collect::<Vec<_>>(), ["wins", "played"]);

        let jotto = catalog.game("jotto").unwrap();
        assert_eq!(jotto.stat_items.keys().collect::<Vec<_>>(), ["guesses"]);
    }

    #[test]
    fn test_unknown_order_entry_rejected() {
        let mut doc = document();
        doc["games"]["hangman"]["stat_settings"]["order_by"] = json!(["losses"]);
        let err = GameCatalog::from_document(&doc).unwrap_err();
        assert_eq!(err.path(), Some("hangman"));
        assert!(matches!(err.root_cause(), SchemaError::Catalog(_)));
    }

    #[test]
    fn test_inherited_order_skips_missing_stats() {
        let mut doc = document();
        doc["defaults"]["stat_settings"]["order_by"] = json!(["played", "wins"]);
        let catalog = GameCatalog::from_document(&doc).unwrap();
        let jotto = catalog.game("jotto").unwrap();
        assert_eq!(jotto.stat_items.keys().collect::<Vec<_>>(), ["guesses"]);
    }

    #[test]
    fn test_new_player_data() {
        assert_eq!(
            catalog().new_player_data(),
            json!({"hangman": {"game_variations": {"2": [1]}}})
        );
    }

    #[test]
    fn test_build_stats_for_game() {
        let stats = catalog()
            .build_stats("hangman", &StatRegistry::default())
            .unwrap();
        assert_eq!(stats.titles().collect::<Vec<_>>(), ["wins", "played"]);

        let err = catalog()
            .build_stats("memory", &StatRegistry::default())
            .unwrap_err();
        assert!(matches!(err, SchemaError::Catalog(_)));
    }
}
