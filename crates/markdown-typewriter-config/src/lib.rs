use markdown_typewriter_engine::EngineOptions;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {config_path}: {source}")]
    ConfigReadError {
        config_path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file at {config_path}: {source}")]
    ConfigParseError {
        config_path: PathBuf,
        source: toml::de::Error,
    },

    #[error("Invalid value in config file at {config_path}: {field} {reason}")]
    ConfigValueError {
        config_path: PathBuf,
        field: &'static str,
        reason: &'static str,
    },
}

/// Host settings: where notes live plus the editor tunables.
///
/// The `[editor]` table may be partial or missing; every engine option has
/// a default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    pub notes_path: PathBuf,
    #[serde(default)]
    pub editor: EngineOptions,
}

impl Config {
    pub fn new(notes_path: impl Into<PathBuf>) -> Self {
        Self {
            notes_path: notes_path.into(),
            editor: EngineOptions::default(),
        }
    }

    pub fn load_from_path<P: AsRef<Path>>(config_path: P) -> Result<Option<Self>, ConfigError> {
        let config_path = config_path.as_ref();
        if !config_path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(config_path).map_err(|source| {
            ConfigError::ConfigReadError {
                config_path: config_path.to_path_buf(),
                source,
            }
        })?;

        let mut config: Config =
            toml::from_str(&content).map_err(|source| ConfigError::ConfigParseError {
                config_path: config_path.to_path_buf(),
                source,
            })?;

        // Expand shell variables and tilde in the loaded notes path
        config.notes_path = Self::expand_path(&config.notes_path).unwrap_or(config.notes_path);
        config.validate(config_path)?;

        Ok(Some(config))
    }

    pub fn load() -> Result<Option<Self>, ConfigError> {
        let config_path = Self::config_path();
        Self::load_from_path(&config_path)
    }

    /// Write the config, leaving out editor options still at their
    /// defaults. An invalid config is refused before anything is written.
    pub fn save_to_path<P: AsRef<Path>>(&self, config_path: P) -> anyhow::Result<()> {
        let config_path = config_path.as_ref();
        self.validate(config_path)?;
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(&self.overrides()?)?;
        std::fs::write(config_path, content)?;
        Ok(())
    }

    pub fn save(&self) -> anyhow::Result<()> {
        let config_path = Self::config_path();
        self.save_to_path(&config_path)
    }

    pub fn config_path() -> PathBuf {
        let config_dir = shellexpand::tilde("~/.config/markdown-typewriter");
        PathBuf::from(config_dir.as_ref()).join("config.toml")
    }

    fn expand_path(path: &Path) -> Option<PathBuf> {
        let path_str = path.to_string_lossy();
        match shellexpand::full(&path_str) {
            Ok(expanded) => Some(PathBuf::from(expanded.as_ref())),
            Err(_) => None,
        }
    }

    fn overrides(&self) -> Result<toml::Table, toml::ser::Error> {
        let toml::Value::Table(mut table) = toml::Value::try_from(self)? else {
            return Ok(toml::Table::new());
        };
        if let toml::Value::Table(defaults) = toml::Value::try_from(EngineOptions::default())? {
            if let Some(toml::Value::Table(editor)) = table.get_mut("editor") {
                prune_defaults(editor, &defaults);
                if editor.is_empty() {
                    table.remove("editor");
                }
            }
        }
        Ok(table)
    }

    fn validate(&self, config_path: &Path) -> Result<(), ConfigError> {
        let invalid = |field, reason| ConfigError::ConfigValueError {
            config_path: config_path.to_path_buf(),
            field,
            reason,
        };
        let editor = &self.editor;
        if !(editor.base_font_size > 0.0) {
            return Err(invalid("editor.base_font_size", "must be positive"));
        }
        if editor.heading_scales.iter().any(|s| !(*s > 0.0)) {
            return Err(invalid("editor.heading_scales", "must all be positive"));
        }
        if editor.char_advance < 0.0 || editor.table_cell_inset < 0.0 {
            return Err(invalid("editor.char_advance", "and table_cell_inset must not be negative"));
        }
        let glyphs = &editor.glyphs;
        if [&glyphs.bullet, &glyphs.unchecked, &glyphs.checked, &glyphs.quote, &glyphs.rule]
            .iter()
            .any(|g| g.is_empty())
        {
            return Err(invalid("editor.glyphs", "must not be empty"));
        }
        Ok(())
    }
}

/// Drop every entry of `table` equal to its counterpart in `defaults`,
/// recursing into nested tables and dropping those left empty.
fn prune_defaults(table: &mut toml::Table, defaults: &toml::Table) {
    let mut unchanged = Vec::new();
    for (key, value) in table.iter_mut() {
        let same = match (value, defaults.get(key)) {
            (toml::Value::Table(nested), Some(toml::Value::Table(base))) => {
                prune_defaults(nested, base);
                nested.is_empty()
            }
            (value, Some(base)) => value == base,
            (_, None) => false,
        };
        if same {
            unchanged.push(key.clone());
        }
    }
    for key in unchanged {
        table.remove(&key);
    }
}
