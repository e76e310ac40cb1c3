//! Configuration module for the module loader.
//!
//! This module provides a layered configuration system that supports:
//! - Default values
//! - TOML configuration file
//! - Environment variable overrides
//!
//! # Environment Variables
//!
//! Environment variables must be prefixed with `DECLINK_` and use double
//! underscores to separate nested levels:
//! - `DECLINK_LOADER__DECLARATION_MODEL=true` sets `loader.declaration_model`
//! - `DECLINK_RESOLVER__DEPENDENCY_ROOT=file:///deps/` sets `resolver.dependency_root`
//! - `DECLINK_LOGGING__LEVEL=debug` sets `logging.level`

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::loader::DEFAULT_DECLARATION_SUFFIX;
use crate::parsing::ParseOptionsOverride;
use crate::resolution::DEFAULT_DEPENDENCY_ROOT;

const CONFIG_DIR: &str = ".declink";
const CONFIG_FILE: &str = "settings.toml";
const ENV_PREFIX: &str = "DECLINK_";

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct Settings {
    /// Version of the configuration schema
    #[serde(default = "default_version")]
    pub version: u32,

    /// Specifier resolution settings
    #[serde(default)]
    pub resolver: ResolverConfig,

    /// Dependency loader settings
    #[serde(default)]
    pub loader: LoaderConfig,

    /// Overrides merged over the parser defaults
    #[serde(default)]
    pub parser: ParseOptionsOverride,

    /// Logging settings
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct ResolverConfig {
    /// Prefix of identifiers for bare (package) specifiers
    #[serde(default = "default_dependency_root")]
    pub dependency_root: String,

    /// Suffix appended to identifiers when registering declarations
    #[serde(default = "default_declaration_suffix")]
    pub declaration_suffix: String,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Default)]
pub struct LoaderConfig {
    /// Open an editable buffer for every fetched declaration.
    /// Slower, but declaration files then get their own diagnostics.
    #[serde(default)]
    pub declaration_model: bool,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct LoggingConfig {
    /// Default filter when `RUST_LOG` is unset (e.g. "info", "declink=debug")
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Colored output
    #[serde(default = "default_true")]
    pub ansi: bool,
}

// Default value functions
fn default_version() -> u32 {
    1
}
fn default_dependency_root() -> String {
    DEFAULT_DEPENDENCY_ROOT.to_string()
}
fn default_declaration_suffix() -> String {
    DEFAULT_DECLARATION_SUFFIX.to_string()
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_true() -> bool {
    true
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            version: default_version(),
            resolver: ResolverConfig::default(),
            loader: LoaderConfig::default(),
            parser: ParseOptionsOverride::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            dependency_root: default_dependency_root(),
            declaration_suffix: default_declaration_suffix(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            ansi: default_true(),
        }
    }
}

impl Settings {
    /// Load configuration from all sources
    pub fn load() -> Result<Self, Box<figment::Error>> {
        let config_path = Self::find_workspace_config()
            .unwrap_or_else(|| PathBuf::from(CONFIG_DIR).join(CONFIG_FILE));
        Self::load_from(config_path)
    }

    /// Load configuration from a specific file
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self, Box<figment::Error>> {
        Self::figment(path.as_ref()).extract().map_err(Box::new)
    }

    fn figment(path: &Path) -> Figment {
        Figment::new()
            // Start with defaults
            .merge(Serialized::defaults(Settings::default()))
            // Layer in config file if it exists
            .merge(Toml::file(path))
            // Double underscore separates nested levels, single underscores
            // stay part of the field name
            .merge(Env::prefixed(ENV_PREFIX).map(|key| {
                key.as_str().to_lowercase().replace("__", ".").into()
            }))
    }

    /// Find the settings file by looking for a `.declink` directory,
    /// searching from the current directory up to the root
    fn find_workspace_config() -> Option<PathBuf> {
        let current = std::env::current_dir().ok()?;

        current
            .ancestors()
            .map(|ancestor| ancestor.join(CONFIG_DIR))
            .find(|dir| dir.is_dir())
            .map(|dir| dir.join(CONFIG_FILE))
    }

    /// Save current configuration to file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), Box<dyn std::error::Error>> {
        let parent = path.as_ref().parent().ok_or("Invalid path")?;
        std::fs::create_dir_all(parent)?;

        let toml_string = toml::to_string_pretty(self)?;
        std::fs::write(path, toml_string)?;

        Ok(())
    }
}
