//! Application configuration for rageval.
//!
//! Uses `figment` for layered configuration: defaults -> config file -> environment -> CLI args.
//! Configuration is loaded from `~/.config/rageval/config.toml` and/or `.rageval/config.toml`
//! in the workspace directory. Per-run tunables live in the suite itself (see [`crate::suite`]).

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::ConfigError;

/// Where rageval finds its inputs and puts its outputs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvalConfig {
    /// Suite definition used when none is given on the command line.
    #[serde(default = "default_suite_path")]
    pub suite_path: PathBuf,
    /// Directory receiving report artifacts.
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    /// SQLite knowledge base queried by the built-in retriever.
    #[serde(default = "default_knowledge_base")]
    pub knowledge_base: PathBuf,
    /// Directory for JSON log files (platform data dir when unset).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_dir: Option<PathBuf>,
}

impl Default for EvalConfig {
    fn default() -> Self {
        Self {
            suite_path: default_suite_path(),
            output_dir: default_output_dir(),
            knowledge_base: default_knowledge_base(),
            log_dir: None,
        }
    }
}

fn default_suite_path() -> PathBuf {
    PathBuf::from("suites/retrieval_tests.yaml")
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("test_results")
}

fn default_knowledge_base() -> PathBuf {
    PathBuf::from(".rageval/knowledge.db")
}

impl EvalConfig {
    /// Render as TOML, suitable for a fresh `.rageval/config.toml`.
    pub fn to_toml_string(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }
}

/// Platform project directories for rageval.
pub fn project_dirs() -> Option<directories::ProjectDirs> {
    directories::ProjectDirs::from("dev", "rageval", "rageval")
}

/// Load configuration from layered sources.
///
/// Priority (highest to lowest):
/// 1. Explicit overrides (passed as argument)
/// 2. Environment variables (prefixed with `RAGEVAL_`)
/// 3. An explicit config file, if given
/// 4. Workspace-local config (`.rageval/config.toml`)
/// 5. User config (`~/.config/rageval/config.toml`)
/// 6. Built-in defaults
pub fn load_config(
    workspace: Option<&Path>,
    config_file: Option<&Path>,
    overrides: Option<&ConfigOverrides>,
) -> Result<EvalConfig, ConfigError> {
    let mut figment = Figment::from(Serialized::defaults(EvalConfig::default()));

    if let Some(dirs) = project_dirs() {
        let user_config = dirs.config_dir().join("config.toml");
        if user_config.exists() {
            figment = figment.merge(Toml::file(&user_config));
        }
    }

    if let Some(ws) = workspace {
        let ws_config = ws.join(".rageval").join("config.toml");
        if ws_config.exists() {
            figment = figment.merge(Toml::file(&ws_config));
        }
    }

    if let Some(path) = config_file {
        if !path.exists() {
            return Err(ConfigError::FileNotFound {
                path: path.to_path_buf(),
            });
        }
        figment = figment.merge(Toml::file(path));
    }

    // RAGEVAL_OUTPUT_DIR, RAGEVAL_KNOWLEDGE_BASE, etc.
    figment = figment.merge(Env::prefixed("RAGEVAL_").split("__"));

    if let Some(overrides) = overrides {
        figment = figment.merge(Serialized::defaults(overrides));
    }

    figment.extract().map_err(|e| ConfigError::Extract(Box::new(e)))
}

/// Command-line overrides; unset fields leave lower layers untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConfigOverrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suite_path: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_dir: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub knowledge_base: Option<PathBuf>,
}
