//! Configuration handling for migtool

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Directory under the solution root holding migtool settings.
pub const CONFIG_DIR: &str = ".migtool";

/// File name of the settings file inside [`CONFIG_DIR`].
pub const CONFIG_FILE: &str = "config.toml";

/// Errors while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {message}")]
    Parse { path: PathBuf, message: String },
}

/// Migtool configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Config {
    /// Graph build settings
    #[serde(default)]
    pub build: BuildConfig,

    /// Impact analysis settings
    #[serde(default)]
    pub analysis: AnalysisConfig,

    /// Source discovery settings
    #[serde(default)]
    pub scan: ScanConfig,
}

/// Graph build configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BuildConfig {
    /// Worker threads for parallel discovery (rayon default when unset)
    #[serde(default)]
    pub threads: Option<usize>,

    /// Surface identifiers matching several imported types as warnings
    #[serde(default = "default_report_ambiguous")]
    pub report_ambiguous_references: bool,
}

/// Complexity classification thresholds
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AnalysisConfig {
    /// Largest affected-file count still classified `Simple`
    #[serde(default = "default_simple_max_files")]
    pub simple_max_files: usize,

    /// Largest affected-file count still classified `Moderate`
    #[serde(default = "default_moderate_max_files")]
    pub moderate_max_files: usize,

    /// Affected-file count past which a namespace rename is `Breaking`
    #[serde(default = "default_large_change_threshold")]
    pub large_change_threshold: usize,
}

/// Source discovery configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScanConfig {
    /// Glob patterns (solution-relative) excluded from source discovery
    #[serde(default = "default_exclude")]
    pub exclude: Vec<String>,
}

fn default_report_ambiguous() -> bool {
    true
}

fn default_simple_max_files() -> usize {
    5
}

fn default_moderate_max_files() -> usize {
    20
}

fn default_large_change_threshold() -> usize {
    100
}

fn default_exclude() -> Vec<String> {
    vec!["**/bin/**".to_string(), "**/obj/**".to_string()]
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            threads: None,
            report_ambiguous_references: default_report_ambiguous(),
        }
    }
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            simple_max_files: default_simple_max_files(),
            moderate_max_files: default_moderate_max_files(),
            large_change_threshold: default_large_change_threshold(),
        }
    }
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            exclude: default_exclude(),
        }
    }
}

impl Config {
    /// Parse configuration from TOML text
    pub fn from_toml(text: &str, origin: &Path) -> Result<Self, ConfigError> {
        toml::from_str(text).map_err(|e| ConfigError::Parse {
            path: origin.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content, path)
    }

    /// Load configuration from .migtool/config.toml in the given solution root
    pub fn load_from_solution(solution_root: &Path) -> Result<Self, ConfigError> {
        let config_path = solution_root.join(CONFIG_DIR).join(CONFIG_FILE);
        if config_path.exists() {
            tracing::debug!(path = %config_path.display(), "loading config");
            Self::load(&config_path)
        } else {
            Ok(Config::default())
        }
    }
}
