//! Game data validation
//!
//! Drives validation of a whole configuration document:
//! 1. the top level must carry `games` and `defaults`
//! 2. `defaults` is checked against the game grammar and must carry every
//!    key a game may fall back on
//! 3. the defaults' statistic descriptors are checked one by one
//! 4. every game is checked against the game grammar, without required keys
//!    (missing values are filled in from the defaults later), along with its
//!    own statistic descriptors
//!
//! The first violation aborts the run. Errors carry the path of the offending
//! object (`defaults/stat_items/wins`, `hangman`, ...).

use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use crate::compiler::{SchemaCompiler, TreeRegistry};
use crate::error::{Result, SchemaError};
use crate::grammar::{
    split_path, GrammarSpec, GrammarTable, DEFAULTS, GAMES, GAME_STATS,
    REQUIRED_DATA_KEYS, REQUIRED_STAT_KEYS, STAT_CLS_TYPE, STAT_GRAMMAR,
};
use crate::stats::StatRegistry;
use crate::value_type::ValueType;

/// Label of the game tree in the registry
pub const GAME_TREE: &str = "game";
/// Label of the statistic descriptor tree in the registry
pub const STAT_TREE: &str = "stats";

/// Validates game configuration documents
#[derive(Debug, Clone)]
pub struct GameDataValidator {
    trees: TreeRegistry,
    required_defaults: Vec<String>,
}

impl GameDataValidator {
    /// Validator for the built-in grammars
    pub fn new() -> Result<Self> {
        Self::with_grammars(&GrammarTable::game(), &STAT_GRAMMAR)
    }

    /// Validator for custom grammars. The defaults block must carry every
    /// path of `game` except the standard exclusions.
    pub fn with_grammars(game: &GrammarTable, stat: &GrammarSpec) -> Result<Self> {
        let mut trees = TreeRegistry::new();
        trees.add_table(GAME_TREE, game)?;
        trees.add_tree(STAT_TREE, SchemaCompiler::new().compile_root(stat)?)?;

        let required_defaults = game.required_defaults();

        Ok(Self {
            trees,
            required_defaults,
        })
    }

    pub fn trees(&self) -> &TreeRegistry {
        &self.trees
    }

    /// Keys the defaults block is required to carry
    pub fn required_defaults(&self) -> &[String] {
        &self.required_defaults
    }

    /// The document must be a mapping carrying both `games` and `defaults`
    pub fn verify_top_level(&self, document: &Value) -> Result<()> {
        let object = as_mapping("data", document)?;
        ensure_keys_exist(None, object, REQUIRED_DATA_KEYS)
    }

    /// Check one game-shaped object, then the presence of `required_keys`
    pub fn verify_game<K: AsRef<str>>(
        &self,
        name: &str,
        game: &Value,
        required_keys: Option<&[K]>,
    ) -> Result<()> {
        debug!(game = name, "verifying game");
        self.trees
            .validate(GAME_TREE, game)
            .map_err(|e| SchemaError::at(name, e))?;

        if let Some(keys) = required_keys {
            ensure_keys_exist(Some(name), as_mapping(name, game)?, keys)?;
        }
        Ok(())
    }

    /// Check every statistic descriptor of a `stat_items` block
    pub fn verify_stats<K: AsRef<str>>(
        &self,
        name: &str,
        stats: &Value,
        required_keys: Option<&[K]>,
    ) -> Result<()> {
        for (stat_name, descriptor) in as_mapping(name, stats)? {
            let path = format!("{}/{}", name, stat_name);
            debug!(stat = %path, "verifying statistic");
            self.trees
                .validate(STAT_TREE, descriptor)
                .map_err(|e| SchemaError::at(path.as_str(), e))?;

            if let Some(keys) = required_keys {
                ensure_keys_exist(Some(path.as_str()), as_mapping(&path, descriptor)?, keys)?;
            }
        }
        Ok(())
    }

    /// Validate a whole document, stopping at the first violation
    pub fn verify_data(&self, document: &Value) -> Result<()> {
        let result = self.verify_document(document);
        match &result {
            Ok(()) => info!("game data validated"),
            Err(e) => warn!(error = %e, "game data rejected"),
        }
        result
    }

    fn verify_document(&self, document: &Value) -> Result<()> {
        self.verify_top_level(document)?;

        let defaults = &document[DEFAULTS];
        self.verify_game(DEFAULTS, defaults, Some(self.required_defaults.as_slice()))?;

        // empty defaults stats only mean every game has to declare its own
        let empty = Value::Object(Map::new());
        self.verify_stats(
            &format!("{}/{}", DEFAULTS, GAME_STATS),
            defaults.get(GAME_STATS).unwrap_or(&empty),
            Some(REQUIRED_STAT_KEYS),
        )?;

        let games = as_mapping(GAMES, &document[GAMES])?;
        for (name, game) in games {
            as_mapping(name, game)?;
            self.verify_game::<&str>(name, game, None)?;
            if let Some(stats) = game.get(GAME_STATS) {
                self.verify_stats(name, stats, Some(REQUIRED_STAT_KEYS))?;
            }
        }

        debug!(games = games.len(), "verified games");
        Ok(())
    }

    /// Confirm every statistic class named by the document is registered.
    /// Expects a document that already passed `verify_data`.
    pub fn verify_stat_classes(&self, document: &Value, registry: &StatRegistry) -> Result<()> {
        let defaults_path = format!("{}/{}", DEFAULTS, GAME_STATS);
        let mut blocks = vec![(defaults_path, document[DEFAULTS].get(GAME_STATS))];
        if let Some(games) = document[GAMES].as_object() {
            blocks.extend(
                games
                    .iter()
                    .map(|(name, game)| (name.clone(), game.get(GAME_STATS))),
            );
        }

        for (name, stats) in blocks {
            let Some(stats) = stats.and_then(Value::as_object) else {
                continue;
            };
            for (stat_name, descriptor) in stats {
                let cls = descriptor
                    .get(STAT_CLS_TYPE)
                    .and_then(Value::as_str)
                    .unwrap_or_default();
                if !registry.contains(cls) {
                    return Err(SchemaError::at(
                        format!("{}/{}", name, stat_name),
                        SchemaError::UnknownStatType(cls.to_string()),
                    ));
                }
            }
        }
        Ok(())
    }
}

fn as_mapping<'a>(path: &str, value: &'a Value) -> Result<&'a Map<String, Value>> {
    value.as_object().ok_or_else(|| {
        SchemaError::at(
            path,
            SchemaError::TypeMismatch {
                found: ValueType::of(value).to_string(),
                expected: ValueType::Mapping.to_string(),
            },
        )
    })
}

/// Every key must resolve in `object`; nested keys are followed segment by segment
fn ensure_keys_exist<K: AsRef<str>>(
    name: Option<&str>,
    object: &Map<String, Value>,
    keys: &[K],
) -> Result<()> {
    for key in keys {
        let key = key.as_ref();
        if !key_exists(object, key) {
            let path = match name {
                Some(name) => format!("{}/{}", name, key),
                None => key.to_string(),
            };
            return Err(SchemaError::at(
                path,
                SchemaError::MissingRequiredKey {
                    key: key.to_string(),
                },
            ));
        }
    }
    Ok(())
}

fn key_exists(object: &Map<String, Value>, key: &str) -> bool {
    let Ok(segments) = split_path(key) else {
        return object.contains_key(key);
    };

    let mut current = object;
    for (i, segment) in segments.iter().enumerate() {
        match current.get(*segment) {
            Some(_) if i + 1 == segments.len() => return true,
            Some(Value::Object(next)) => current = next,
            _ => return false,
        }
    }
    false
}
