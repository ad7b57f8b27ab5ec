//! User settings stored as TOML.
//!
//! Every option has a default, so a sparse file (or none at all) is fine.
//! A missing file is created with the full set of defaults the first time
//! it is loaded so the available options are discoverable.

use crate::app_dirs::AppDirs;
use log::{info, warn};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use toml::{Table, Value};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("could not write config file {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("config file {path} is not valid TOML: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("could not serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("invalid value for `{option}` in section [{section}]: {reason}")]
    InvalidValue {
        section: String,
        option: String,
        reason: String,
    },
}

/// Foreground and background color indices, written as `[fg, bg]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColorPair(pub u8, pub u8);

impl ColorPair {
    pub fn fg(&self) -> u8 {
        self.0
    }

    pub fn bg(&self) -> u8 {
        self.1
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Colors {
    pub author: ColorPair,
    pub background: u8,
    pub correct: ColorPair,
    pub incorrect: ColorPair,
    pub prompt: ColorPair,
    pub quote: ColorPair,
    pub score: ColorPair,
    pub status: ColorPair,
}

impl Colors {
    fn extended() -> Self {
        Self {
            author: ColorPair(240, 233),
            background: 233,
            correct: ColorPair(240, 233),
            incorrect: ColorPair(197, 52),
            prompt: ColorPair(244, 233),
            quote: ColorPair(195, 233),
            score: ColorPair(230, 197),
            status: ColorPair(51, 24),
        }
    }

    fn basic() -> Self {
        // ANSI indices: 0 black, 1 red, 3 yellow, 4 blue, 6 cyan, 7 white.
        Self {
            author: ColorPair(7, 0),
            background: 0,
            correct: ColorPair(7, 0),
            incorrect: ColorPair(7, 1),
            prompt: ColorPair(7, 0),
            quote: ColorPair(7, 0),
            score: ColorPair(3, 1),
            status: ColorPair(6, 4),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TerminalSettings {
    /// Milliseconds to wait after ESC before treating it as a lone key press.
    /// Only raw byte input uses it; terminal events arrive already decoded.
    pub escape_delay: u64,
    /// Milliseconds to wait for a key before redrawing.
    pub window_timeout: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WpmSettings {
    /// Upper bound on the quote width. Zero or less means the full terminal.
    pub wrap_width: i64,
    pub confidence_level: f64,
    pub histogram: bool,
}

impl Default for TerminalSettings {
    fn default() -> Self {
        Self {
            escape_delay: 15,
            window_timeout: 20,
        }
    }
}

impl Default for WpmSettings {
    fn default() -> Self {
        Self {
            wrap_width: -1,
            confidence_level: 0.95,
            histogram: false,
        }
    }
}

impl WpmSettings {
    pub fn quote_width(&self, cols: usize) -> usize {
        match usize::try_from(self.wrap_width) {
            Ok(width) if width > 0 => width.min(cols),
            _ => cols,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Config {
    pub terminal: TerminalSettings,
    pub wpm: WpmSettings,
    #[serde(rename = "xterm-256color")]
    pub xterm_256color: Colors,
    #[serde(rename = "xterm-colors")]
    pub xterm_colors: Colors,
    pub monochrome: Colors,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            terminal: TerminalSettings::default(),
            wpm: WpmSettings::default(),
            xterm_256color: Colors::extended(),
            xterm_colors: Colors::basic(),
            monochrome: Colors::basic(),
        }
    }
}

impl Config {
    /// Builds a config from TOML text, filling in defaults for anything absent.
    pub fn parse(text: &str, path: &Path) -> Result<Self, ConfigError> {
        let table: Table = toml::from_str(text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_table(&table)
    }

    pub fn from_table(table: &Table) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let cfg = Self {
            terminal: section(table, "terminal", defaults.terminal)?,
            wpm: section(table, "wpm", defaults.wpm)?,
            xterm_256color: section(table, "xterm-256color", defaults.xterm_256color)?,
            xterm_colors: section(table, "xterm-colors", defaults.xterm_colors)?,
            monochrome: section(table, "monochrome", defaults.monochrome)?,
        };

        if cfg.terminal.window_timeout == 0 {
            return Err(invalid("terminal", "window_timeout", "must be at least 1"));
        }
        let level = cfg.wpm.confidence_level;
        if !(level > 0.0 && level < 1.0) {
            return Err(invalid(
                "wpm",
                "confidence_level",
                "must be strictly between 0 and 1",
            ));
        }

        Ok(cfg)
    }

    /// Effective quote width for a terminal `cols` wide.
    pub fn quote_width(&self, cols: usize) -> usize {
        self.wpm.quote_width(cols)
    }
}

fn invalid(section: &str, option: &str, reason: impl Into<String>) -> ConfigError {
    ConfigError::InvalidValue {
        section: section.to_string(),
        option: option.to_string(),
        reason: reason.into(),
    }
}

/// Reads `[name]` from the document, keeping `defaults` for every option the
/// section leaves out. Options are applied one at a time so a bad value is
/// reported under its own name.
fn section<T>(root: &Table, name: &str, defaults: T) -> Result<T, ConfigError>
where
    T: Serialize + DeserializeOwned,
{
    let Some(value) = root.get(name) else {
        return Ok(defaults);
    };
    let Some(overrides) = value.as_table() else {
        return Err(invalid(name, name, "expected a section"));
    };

    let mut merged = match Value::try_from(&defaults)? {
        Value::Table(table) => table,
        _ => Table::new(),
    };
    let mut parsed = defaults;
    for (option, value) in overrides {
        merged.insert(option.clone(), value.clone());
        parsed = Value::Table(merged.clone())
            .try_into::<T>()
            .map_err(|err| invalid(name, option, err.message().trim()))?;
    }

    Ok(parsed)
}

pub trait ConfigStore {
    fn load(&self) -> Result<Config, ConfigError>;
    fn save(&self, cfg: &Config) -> Result<(), ConfigError>;
}

#[derive(Debug, Clone)]
pub struct FileConfigStore {
    path: PathBuf,
}

impl FileConfigStore {
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        let path = AppDirs::config_path().unwrap_or_else(|| PathBuf::from("wpm_config.toml"));
        Self { path }
    }

    pub fn with_path<P: AsRef<Path>>(p: P) -> Self {
        Self {
            path: p.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Default for FileConfigStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigStore for FileConfigStore {
    fn load(&self) -> Result<Config, ConfigError> {
        match fs::read_to_string(&self.path) {
            Ok(text) => {
                let cfg = Config::parse(&text, &self.path)?;
                info!("loaded config from {}", self.path.display());
                Ok(cfg)
            }
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                let cfg = Config::default();
                match self.save(&cfg) {
                    Ok(()) => info!("wrote default config to {}", self.path.display()),
                    Err(err) => warn!("could not write default config: {err}"),
                }
                Ok(cfg)
            }
            Err(source) => Err(ConfigError::Read {
                path: self.path.clone(),
                source,
            }),
        }
    }

    fn save(&self, cfg: &Config) -> Result<(), ConfigError> {
        let write_err = |source| ConfigError::Write {
            path: self.path.clone(),
            source,
        };
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(write_err)?;
        }
        let data = toml::to_string_pretty(cfg)?;
        fs::write(&self.path, data).map_err(write_err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use tempfile::tempdir;

    fn parse(text: &str) -> Result<Config, ConfigError> {
        Config::parse(text, Path::new("config.toml"))
    }

    #[test]
    fn roundtrip_default_config() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let store = FileConfigStore::with_path(&path);
        let cfg = Config::default();
        store.save(&cfg).unwrap();
        let loaded = store.load().unwrap();
        assert_eq!(cfg, loaded);
    }

    #[test]
    fn missing_file_writes_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let store = FileConfigStore::with_path(&path);

        let cfg = store.load().unwrap();

        assert_eq!(cfg, Config::default());
        assert!(path.exists());
        let text = fs::read_to_string(&path).unwrap();
        assert!(text.contains("[xterm-256color]"));
        assert!(text.contains("window_timeout = 20"));
    }

    #[test]
    fn save_and_load_custom_config() {
        let dir = tempdir().unwrap();
        let store = FileConfigStore::with_path(dir.path().join("config.toml"));
        let mut cfg = Config::default();
        cfg.terminal.window_timeout = 50;
        cfg.wpm.wrap_width = 72;
        cfg.wpm.confidence_level = 0.99;
        cfg.wpm.histogram = true;
        cfg.xterm_256color.incorrect = ColorPair(1, 2);
        cfg.monochrome.background = 9;

        store.save(&cfg).unwrap();

        assert_eq!(store.load().unwrap(), cfg);
    }

    #[test]
    fn sparse_file_keeps_other_defaults() {
        let cfg = parse("[wpm]
wrap_width = 60
").unwrap();
        assert_eq!(cfg.wpm.wrap_width, 60);
        assert_eq!(cfg.terminal, Config::default().terminal);
        assert_eq!(cfg.xterm_256color, Colors::extended());
    }

    #[test]
    fn color_pair_overrides() {
        let cfg = parse("[xterm-colors]
status = [2, 5]
background = 4
").unwrap();
        assert_eq!(cfg.xterm_colors.status, ColorPair(2, 5));
        assert_eq!(cfg.xterm_colors.background, 4);
        assert_eq!(cfg.xterm_colors.quote, Colors::basic().quote);
    }

    #[test]
    fn wrong_type_names_section_and_option() {
        let err = parse("[terminal]
window_timeout = \"soon\"
").unwrap_err();
        assert_matches!(
            err,
            ConfigError::InvalidValue { ref section, ref option, .. }
                if section == "terminal" && option == "window_timeout"
        );
    }

    #[test]
    fn out_of_range_values_are_rejected() {
        assert_matches!(
            parse("[wpm]
confidence_level = 1.5
"),
            Err(ConfigError::InvalidValue { .. })
        );
        assert_matches!(
            parse("[terminal]
window_timeout = 0
"),
            Err(ConfigError::InvalidValue { .. })
        );
        assert_matches!(
            parse("[terminal]
escape_delay = -3
"),
            Err(ConfigError::InvalidValue { .. })
        );
        assert_matches!(
            parse("[monochrome]
author = [1, 300]
"),
            Err(ConfigError::InvalidValue { .. })
        );
        assert_matches!(
            parse("[monochrome]
author = [1]
"),
            Err(ConfigError::InvalidValue { .. })
        );
    }

    #[test]
    fn bad_color_names_the_option() {
        let err = parse("[xterm-256color]\nquote = [195, 233]\nscore = [230, 999]\n").unwrap_err();
        assert_matches!(
            err,
            ConfigError::InvalidValue { ref section, ref option, .. }
                if section == "xterm-256color" && option == "score"
        );
    }

    #[test]
    fn unknown_options_are_ignored() {
        let cfg = parse("[wpm]\nhistogram = true\nsound = \"beep\"\n").unwrap();
        assert!(cfg.wpm.histogram);
        assert_eq!(cfg.wpm.wrap_width, -1);
    }

    #[test]
    fn malformed_toml_is_a_parse_error() {
        assert_matches!(parse("[wpm\n"), Err(ConfigError::Parse { .. }));
    }

    #[test]
    fn section_must_be_a_table() {
        assert_matches!(
            parse("wpm = 3\n"),
            Err(ConfigError::InvalidValue { ref section, .. }) if section == "wpm"
        );
    }

    #[test]
    fn quote_width_respects_wrap_width() {
        let mut cfg = Config::default();
        assert_eq!(cfg.quote_width(80), 80);
        cfg.wpm.wrap_width = 60;
        assert_eq!(cfg.quote_width(80), 60);
        assert_eq!(cfg.quote_width(40), 40);
        cfg.wpm.wrap_width = 0;
        assert_eq!(cfg.quote_width(80), 80);
    }
}
