//! Bootstrap configuration and root folder resolution
//!
//! Root folder priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable `CAFE_ROOT_FOLDER`
//! 3. TOML config file (`root_folder`)
//! 4. OS-dependent compiled default (fallback)
//!
//! A missing or unparsable TOML file never stops startup; compiled defaults
//! are used and the outcome is reported once logging is initialized.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variable overriding the root folder
pub const ROOT_FOLDER_ENV: &str = "CAFE_ROOT_FOLDER";

/// Database file name inside the root folder
pub const DATABASE_FILE: &str = "cafe-menu.db";

/// Default HTTP port
pub const DEFAULT_PORT: u16 = 5740;

/// Built-in defaults for the current platform
#[derive(Debug, Clone)]
pub struct CompiledDefaults {
    pub root_folder: PathBuf,
}

impl CompiledDefaults {
    pub fn for_current_platform() -> Self {
        Self {
            root_folder: default_root_folder(),
        }
    }
}

/// Bootstrap configuration loaded from TOML
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TomlConfig {
    #[serde(default)]
    pub root_folder: Option<PathBuf>,

    #[serde(default)]
    pub port: Option<u16>,

    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub vision: VisionSection,

    #[serde(default)]
    pub notion: NotionSection,

    #[serde(default)]
    pub matching: MatchingSection,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
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

fn default_log_level() -> String {
    "info".to_string()
}

/// `[vision]` section: image-labeling service credentials
///
/// Either `api_key`, or the service-account triple
/// (`project_id`, `client_email`, `private_key`).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VisionSection {
    pub api_key: Option<String>,
    pub project_id: Option<String>,
    pub client_email: Option<String>,
    pub private_key: Option<String>,
    /// Override for the annotate endpoint base URL
    pub endpoint: Option<String>,
    /// Override for the OAuth token URL
    pub token_url: Option<String>,
}

/// `[notion]` section: CMS credentials
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NotionSection {
    pub token: Option<String>,
    pub database_id: Option<String>,
    /// Override for the API base URL
    pub endpoint: Option<String>,
}

/// `[matching]` section: dish matcher tuning
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MatchingSection {
    pub min_score: Option<f32>,
    pub max_results: Option<usize>,
    /// `strict`, `category` or `cascade`
    pub fallback: Option<String>,
}

impl TomlConfig {
    /// Parse TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::Config(format!("Parse TOML failed: {}", e)))
    }

    /// Load from an explicit path, or the platform config path when `None`.
    ///
    /// Falls back to defaults when the file is missing or invalid. Nothing is
    /// logged here since this runs before the subscriber exists; report the
    /// returned [`ConfigLoad`] once logging is up.
    pub fn load_or_default(path: Option<&Path>) -> (Self, ConfigLoad) {
        let path = match path.map(Path::to_path_buf).or_else(default_config_path) {
            Some(p) => p,
            None => return (Self::default(), ConfigLoad::NoConfigDir),
        };

        if !path.exists() {
            return (Self::default(), ConfigLoad::Missing(path));
        }

        let parsed = std::fs::read_to_string(&path)
            .map_err(|e| Error::Config(format!("Read TOML failed: {}", e)))
            .and_then(|content| Self::from_toml_str(&content));
        match parsed {
            Ok(config) => (config, ConfigLoad::Loaded(path)),
            Err(e) => (
                Self::default(),
                ConfigLoad::Invalid {
                    path,
                    error: e.to_string(),
                },
            ),
        }
    }
}

/// Where the bootstrap config came from
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigLoad {
    Loaded(PathBuf),
    Missing(PathBuf),
    Invalid { path: PathBuf, error: String },
    NoConfigDir,
}

impl ConfigLoad {
    pub fn log(&self) {
        match self {
            ConfigLoad::Loaded(path) => info!("Loaded config from {}", path.display()),
            ConfigLoad::Missing(path) => {
                info!("Config file not found at {}, using defaults", path.display())
            }
            ConfigLoad::Invalid { path, error } => {
                warn!("{} ({}), using defaults", error, path.display())
            }
            ConfigLoad::NoConfigDir => {
                warn!("Could not determine config directory, using defaults")
            }
        }
    }
}

/// Platform config file: `<config_dir>/cafe-menu/config.toml`
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("cafe-menu").join("config.toml"))
}

fn default_root_folder() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("cafe-menu"))
        .unwrap_or_else(|| PathBuf::from("./cafe_menu_data"))
}

/// Resolves the root folder from CLI, environment, TOML and defaults
#[derive(Debug, Clone, Default)]
pub struct RootFolderResolver {
    cli_arg: Option<PathBuf>,
    toml_root: Option<PathBuf>,
}

impl RootFolderResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cli_arg(mut self, path: Option<PathBuf>) -> Self {
        self.cli_arg = path;
        self
    }

    pub fn with_toml(mut self, config: &TomlConfig) -> Self {
        self.toml_root = config.root_folder.clone();
        self
    }

    pub fn resolve(&self) -> PathBuf {
        if let Some(path) = &self.cli_arg {
            info!("Root folder from command line: {}", path.display());
            return path.clone();
        }

        if let Ok(path) = std::env::var(ROOT_FOLDER_ENV) {
            if !path.trim().is_empty() {
                info!("Root folder from {}: {}", ROOT_FOLDER_ENV, path);
                return PathBuf::from(path);
            }
        }

        if let Some(path) = &self.toml_root {
            info!("Root folder from TOML config: {}", path.display());
            return path.clone();
        }

        let fallback = CompiledDefaults::for_current_platform().root_folder;
        info!("Root folder from compiled default: {}", fallback.display());
        fallback
    }
}

/// Creates the root folder and locates the database inside it
#[derive(Debug, Clone)]
pub struct RootFolderInitializer {
    root_folder: PathBuf,
}

impl RootFolderInitializer {
    pub fn new(root_folder: PathBuf) -> Self {
        Self { root_folder }
    }

    pub fn ensure_directory_exists(&self) -> Result<()> {
        if !self.root_folder.exists() {
            std::fs::create_dir_all(&self.root_folder)?;
            info!("Created root folder: {}", self.root_folder.display());
        }
        Ok(())
    }

    pub fn database_path(&self) -> PathBuf {
        self.root_folder.join(DATABASE_FILE)
    }
}

/// A credential counts as configured when non-blank and not a template placeholder
pub fn is_valid_credential(value: &str) -> bool {
    let trimmed = value.trim();
    !trimmed.is_empty() && !trimmed.starts_with("placeholder")
}

/// Resolve one setting with ENV → TOML priority
///
/// Invalid values in either tier are ignored.
pub fn resolve_setting(env_var: &str, toml_value: Option<&str>) -> Option<String> {
    if let Ok(value) = std::env::var(env_var) {
        if is_valid_credential(&value) {
            if toml_value.map(is_valid_credential).unwrap_or(false) {
                warn!("{} set in both environment and TOML, using environment", env_var);
            }
            return Some(value);
        }
    }

    toml_value
        .filter(|v| is_valid_credential(v))
        .map(str::to_string)
}
