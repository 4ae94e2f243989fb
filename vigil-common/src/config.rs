//! Configuration loading and root folder resolution
//!
//! Values resolve in this order (highest first):
//! 1. Command-line argument
//! 2. Environment variable
//! 3. TOML config file
//! 4. Compiled default
//!
//! A missing config file is not an error: services log a warning and start
//! with defaults. A config file that exists but does not parse is an error.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

use crate::{Error, Result};

/// Environment variable overriding the data root
pub const ROOT_FOLDER_ENV: &str = "VIGIL_ROOT_FOLDER";

/// Environment variable pointing at a config file
pub const CONFIG_FILE_ENV: &str = "VIGIL_CONFIG";

pub const DEFAULT_CONFIDENCE_THRESHOLD: f32 = 0.60;
pub const DEFAULT_COOLDOWN_SECS: f64 = 1.0;
pub const DEFAULT_POLL_INTERVAL_SECS: f64 = 1.0;
pub const DEFAULT_IMAGE_EXTENSION: &str = "jpg";
pub const DEFAULT_SOURCE_TAG: &str = "alert";
pub const DEFAULT_CURATOR_PORT: u16 = 5780;
pub const DEFAULT_GUARD_PORT: u16 = 5781;

/// Contents of `config.toml`
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct TomlConfig {
    /// Data root holding `alerts/` and `training_data/`
    #[serde(default)]
    pub root_folder: Option<PathBuf>,

    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub curation: CurationConfig,

    #[serde(default)]
    pub guard: GuardConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LoggingConfig {
    /// Default tracing filter when RUST_LOG is unset
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

/// Curator service settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CurationConfig {
    /// Refresh Scheduler polling period in seconds
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: f64,

    /// Append decisions to `curation_history.jsonl` and replay it at startup
    #[serde(default)]
    pub persist_history: bool,

    #[serde(default = "default_curator_port")]
    pub port: u16,
}

impl Default for CurationConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: default_poll_interval(),
            persist_history: false,
            port: default_curator_port(),
        }
    }
}

impl CurationConfig {
    /// Polling period; rejects zero, negative and out-of-range values
    pub fn poll_interval(&self) -> Result<Duration> {
        let interval = seconds_to_duration("curation.poll_interval_secs", self.poll_interval_secs)?;
        if interval.is_zero() {
            return Err(Error::Config(format!(
                "curation.poll_interval_secs must be > 0, got {}",
                self.poll_interval_secs
            )));
        }
        Ok(interval)
    }
}

/// Detection producer settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GuardConfig {
    /// Minimum detector confidence for a detection to count
    #[serde(default = "default_confidence_threshold")]
    pub confidence_threshold: f32,

    /// Minimum seconds between two emitted alerts
    #[serde(default = "default_cooldown")]
    pub cooldown_secs: f64,

    /// Extension for display and clean artifacts
    #[serde(default = "default_image_extension")]
    pub image_extension: String,

    /// Prefix of every emitted alert id
    #[serde(default = "default_source_tag")]
    pub source_tag: String,

    #[serde(default = "default_guard_port")]
    pub port: u16,
}

impl Default for GuardConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: default_confidence_threshold(),
            cooldown_secs: default_cooldown(),
            image_extension: default_image_extension(),
            source_tag: default_source_tag(),
            port: default_guard_port(),
        }
    }
}

impl GuardConfig {
    /// Cooldown between alerts; rejects negative and out-of-range values
    pub fn cooldown(&self) -> Result<Duration> {
        seconds_to_duration("guard.cooldown_secs", self.cooldown_secs)
    }
}

fn seconds_to_duration(field: &str, secs: f64) -> Result<Duration> {
    Duration::try_from_secs_f64(secs).map_err(|e| {
        Error::Config(format!(
            "{} must be a non-negative number of seconds, got {}: {}",
            field, secs, e
        ))
    })
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_poll_interval() -> f64 {
    DEFAULT_POLL_INTERVAL_SECS
}

fn default_curator_port() -> u16 {
    DEFAULT_CURATOR_PORT
}

fn default_confidence_threshold() -> f32 {
    DEFAULT_CONFIDENCE_THRESHOLD
}

fn default_cooldown() -> f64 {
    DEFAULT_COOLDOWN_SECS
}

fn default_image_extension() -> String {
    DEFAULT_IMAGE_EXTENSION.to_string()
}

fn default_source_tag() -> String {
    DEFAULT_SOURCE_TAG.to_string()
}

fn default_guard_port() -> u16 {
    DEFAULT_GUARD_PORT
}

impl TomlConfig {
    /// Parse TOML text and validate it
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: TomlConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from `path`, or defaults when no file is available
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            info!("No config file found, using compiled defaults");
            return Ok(Self::default());
        };

        if !path.exists() {
            warn!(
                "Config file {} does not exist, using compiled defaults",
                path.display()
            );
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)?;
        let config = Self::from_toml_str(&content)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?;
        info!("Loaded config file: {}", path.display());
        Ok(config)
    }

    /// Reject values the services cannot run with
    pub fn validate(&self) -> Result<()> {
        let guard = &self.guard;
        if !(0.0..=1.0).contains(&guard.confidence_threshold) {
            return Err(Error::Config(format!(
                "guard.confidence_threshold must be within [0, 1], got {}",
                guard.confidence_threshold
            )));
        }
        guard.cooldown()?;
        if !crate::triple::is_image_extension(&guard.image_extension) {
            return Err(Error::Config(format!(
                "guard.image_extension '{}' is not a supported image extension",
                guard.image_extension
            )));
        }
        if guard.source_tag.is_empty() || guard.source_tag.contains(|c: char| c == '_' || c == '/' || c == '\\') {
            return Err(Error::Config(format!(
                "guard.source_tag '{}' must be non-empty and contain no '_' or path separators",
                guard.source_tag
            )));
        }
        self.curation.poll_interval()?;
        Ok(())
    }
}

/// Locate the config file: explicit path, then `VIGIL_CONFIG`, then the
/// per-user config directory. Returns `None` when nothing is found.
pub fn config_file_path(cli_arg: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = cli_arg {
        return Some(path.to_path_buf());
    }

    if let Ok(path) = std::env::var(CONFIG_FILE_ENV) {
        if !path.is_empty() {
            return Some(PathBuf::from(path));
        }
    }

    dirs::config_dir()
        .map(|d| d.join("vigil").join("config.toml"))
        .filter(|p| p.exists())
}

/// Root folder resolution: CLI → ENV → TOML → compiled default
pub struct RootFolderResolver {
    cli_arg: Option<PathBuf>,
    toml_root: Option<PathBuf>,
}

impl RootFolderResolver {
    pub fn new(cli_arg: Option<PathBuf>, config: &TomlConfig) -> Self {
        Self {
            cli_arg,
            toml_root: config.root_folder.clone(),
        }
    }

    pub fn resolve(&self) -> PathBuf {
        // Priority 1: Command-line argument
        if let Some(path) = &self.cli_arg {
            return path.clone();
        }

        // Priority 2: Environment variable
        if let Ok(path) = std::env::var(ROOT_FOLDER_ENV) {
            if !path.is_empty() {
                return PathBuf::from(path);
            }
        }

        // Priority 3: TOML config file
        if let Some(path) = &self.toml_root {
            return path.clone();
        }

        // Priority 4: OS-dependent compiled default
        default_root_folder()
    }
}

/// OS-dependent default data root
pub fn default_root_folder() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("vigil"))
        .unwrap_or_else(|| PathBuf::from("./vigil_data"))
}
