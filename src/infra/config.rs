// src/infra/config.rs — Configuration loading (TOML)

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::infra::errors::ScadCriticError;
use crate::infra::paths;

/// Model used when neither the CLI nor the config file names one.
pub const DEFAULT_MODEL: &str = "claude-opus-4-20250514";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub renderer: RendererConfig,

    #[serde(default)]
    pub model: ModelConfig,

    #[serde(default)]
    pub agent: AgentConfig,

    #[serde(default)]
    pub data: DataConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RendererConfig {
    /// Path to the OpenSCAD binary. Falls back to $OPENSCAD_BINARY, then PATH.
    pub binary: Option<String>,
    pub timeout_seconds: u64,
    pub validate_timeout_seconds: u64,
    pub image_width: u32,
    pub image_height: u32,
    pub colorscheme: String,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            binary: None,
            timeout_seconds: 600,
            validate_timeout_seconds: 30,
            image_width: 1024,
            image_height: 768,
            colorscheme: "Cornfield".into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    pub default_model: String,
    pub max_tokens: u32,
    /// Attempt cap for transient model errors (includes the first call).
    pub max_attempts: u32,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            default_model: DEFAULT_MODEL.into(),
            max_tokens: 8192,
            max_attempts: 3,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    pub target_score: u8,
    pub max_iterations: u32,
    /// Reject evaluate() on a converged session instead of letting the
    /// caller keep polishing past the target.
    pub halt_on_convergence: bool,
    /// Idle sessions older than this are purged on the next start().
    /// 0 disables purging.
    pub session_ttl_seconds: u64,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            target_score: 8,
            max_iterations: 8,
            halt_on_convergence: false,
            session_ttl_seconds: 1800,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DataConfig {
    /// Directory where generated designs are written.
    pub dir: Option<String>,
}

impl Config {
    /// Load from the default location, falling back to defaults if no
    /// config file exists.
    pub fn load() -> Result<Self, ScadCriticError> {
        let path = paths::config_file_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn load_from(path: &Path) -> Result<Self, ScadCriticError> {
        let raw = std::fs::read_to_string(path)?;
        toml::from_str(&raw)
            .map_err(|e| ScadCriticError::Config(format!("{}: {}", path.display(), e)))
    }

    pub fn data_dir(&self) -> PathBuf {
        self.data
            .dir
            .as_ref()
            .map(PathBuf::from)
            .unwrap_or_else(paths::default_data_dir)
    }
}
