//! Configuration for the game data validator
//!
//! Supports loading configuration from:
//! - Default values
//! - Config file (gamedata.toml)
//! - Environment variables (GAMEDATA_*)
//!
//! ## Example config file (gamedata.toml):
//! ```toml
//! [document]
//! path = "assets/info.json"
//!
//! [grammar]
//! game_table = "grammars/game.json"
//! stat_table = "grammars/stat.json"
//!
//! [logging]
//! filter = "game_grammar=debug"
//!
//! [output]
//! format = "compact"
//! ```

use config_crate::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::grammar::{GrammarSpec, GrammarTable, STAT_GRAMMAR};

/// Main configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ValidatorConfig {
    #[serde(default)]
    pub document: DocumentConfig,

    /// Grammar overrides; the built-in grammars are used when unset
    #[serde(default)]
    pub grammar: GrammarConfig,

    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub output: OutputConfig,
}

/// Document location
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentConfig {
    /// Game data document validated when no path is given
    #[serde(default = "default_document_path")]
    pub path: PathBuf,
}

/// Grammar table files
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GrammarConfig {
    /// JSON grammar table for games and the defaults block
    #[serde(default)]
    pub game_table: Option<PathBuf>,

    /// JSON grammar spec applied to each statistic descriptor
    #[serde(default)]
    pub stat_table: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// `tracing_subscriber::EnvFilter` directive, overridden by `RUST_LOG`
    #[serde(default = "default_log_filter")]
    pub filter: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    #[serde(default)]
    pub format: OutputFormat,
}

/// Output format for JSON
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Pretty,
    Compact,
}

impl OutputFormat {
    pub fn render<T: Serialize>(&self, value: &T) -> serde_json::Result<String> {
        match self {
            OutputFormat::Pretty => serde_json::to_string_pretty(value),
            OutputFormat::Compact => serde_json::to_string(value),
        }
    }
}

// Default value functions
fn default_document_path() -> PathBuf {
    PathBuf::from("info.json")
}

fn default_log_filter() -> String {
    "info".to_string()
}

impl Default for DocumentConfig {
    fn default() -> Self {
        Self {
            path: default_document_path(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: default_log_filter(),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: OutputFormat::Pretty,
        }
    }
}

impl ValidatorConfig {
    /// Load configuration from default locations
    pub fn load() -> std::result::Result<Self, ConfigError> {
        Self::load_from(None)
    }

    /// Load configuration, layering an explicit file over the default locations
    pub fn load_from(config_path: Option<&str>) -> std::result::Result<Self, ConfigError> {
        let mut builder = Config::builder();

        let config_locations = ["gamedata.toml", ".gamedata.toml", "config/gamedata.toml"];
        for location in config_locations {
            builder = builder.add_source(File::with_name(location).required(false));
        }

        // XDG config directory
        if let Some(dirs) = directories::ProjectDirs::from("dev", "gamedata", "validator") {
            let xdg_config = dirs.config_dir().join("gamedata.toml");
            if xdg_config.exists() {
                builder = builder.add_source(File::from(xdg_config).required(false));
            }
        }

        if let Some(path) = config_path {
            builder = builder.add_source(File::with_name(path).required(true));
        }

        // GAMEDATA_OUTPUT__FORMAT=compact
        builder = builder.add_source(
            Environment::with_prefix("GAMEDATA")
                .separator("__")
                .try_parsing(true),
        );

        builder.build()?.try_deserialize()
    }

    /// Save configuration to a file
    pub fn save(&self, path: impl AsRef<Path>) -> std::io::Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        std::fs::write(path, content)
    }

    /// Game grammar from the configured table, or the built-in one
    pub fn game_table(&self) -> Result<GrammarTable> {
        match &self.grammar.game_table {
            Some(path) => GrammarTable::from_file(path),
            None => Ok(GrammarTable::game()),
        }
    }

    /// Statistic descriptor grammar from the configured file, or the built-in one
    pub fn stat_spec(&self) -> Result<GrammarSpec> {
        match &self.grammar.stat_table {
            Some(path) => {
                let content = std::fs::read_to_string(path)?;
                Ok(serde_json::from_str(&content)?)
            }
            None => Ok(STAT_GRAMMAR),
        }
    }
}
