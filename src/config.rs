//! Configuration for regdraft.
//!
//! Configuration sources (highest priority first):
//! 1. Environment variables (REGDRAFT_HOME, REGDRAFT_MODEL_ENDPOINT, REGDRAFT_MODEL)
//! 2. Config file (.regdraft/config.yaml)
//! 3. Defaults (~/.regdraft, local Ollama)
//!
//! Config file discovery:
//! - Searches current directory and parents for .regdraft/config.yaml
//! - `paths.home` is relative to the .regdraft/ directory

use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::adapters::DecodingParams;
use crate::core::orchestrator::DEFAULT_MAX_ATTEMPTS;
use crate::core::{ClientSettings, RetryPolicy};

/// Global cached configuration (stores Result to handle init errors)
static CONFIG: OnceLock<Result<ResolvedConfig, String>> = OnceLock::new();

const DEFAULT_ENDPOINT: &str = "http://localhost:11434";
const DEFAULT_MODEL: &str = "llama3.1:8b";
const DEFAULT_TIMEOUT_SECONDS: u64 = 120;

/// Raw config file schema (matches YAML structure)
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConfigFile {
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub paths: PathsConfig,
    #[serde(default)]
    pub model: ModelConfig,
    #[serde(default)]
    pub transport_retry: Option<RetryPolicy>,
    #[serde(default)]
    pub generation: GenerationConfig,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PathsConfig {
    /// Engine state directory (relative to .regdraft/)
    pub home: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ModelConfig {
    pub endpoint: Option<String>,
    pub model: Option<String>,
    pub temperature: Option<f32>,
    pub top_p: Option<f32>,
    pub context_window: Option<u32>,
    pub timeout_seconds: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GenerationConfig {
    /// Semantic attempts per job (initial call plus retries)
    pub max_attempts: Option<u32>,
}

/// Model server settings after defaults and overrides
#[derive(Debug, Clone, PartialEq)]
pub struct ModelSettings {
    pub endpoint: String,
    pub model: String,
    pub params: DecodingParams,
    pub timeout_seconds: u64,
}

/// Resolved configuration with absolute paths
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    /// Absolute path to regdraft home (engine state)
    pub home: PathBuf,
    /// Path to config file (if found)
    pub config_file: Option<PathBuf>,
    /// Model server settings
    pub model: ModelSettings,
    /// Backoff for connection failures
    pub transport_retry: RetryPolicy,
    /// Semantic attempts per job
    pub max_attempts: u32,
}

impl ResolvedConfig {
    /// Directory holding the job and artifact logs
    pub fn jobs_dir(&self) -> PathBuf {
        self.home.join("jobs")
    }

    /// Settings for a `GenerationClient`
    pub fn client_settings(&self) -> ClientSettings {
        ClientSettings {
            model: self.model.model.clone(),
            params: self.model.params.clone(),
            attempt_timeout: Duration::from_secs(self.model.timeout_seconds),
            retry: self.transport_retry.clone(),
        }
    }
}

/// Find config file by searching current directory and parents
fn find_config_file() -> Option<PathBuf> {
    let mut current = std::env::current_dir().ok()?;

    loop {
        let config_path = current.join(".regdraft").join("config.yaml");
        if config_path.exists() {
            return Some(config_path);
        }

        if !current.pop() {
            break;
        }
    }

    None
}

/// Load and parse config file
fn load_config_file(path: &Path) -> Result<ConfigFile> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    serde_yaml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

/// Resolve a path that may be relative to the config directory
fn resolve_path(base: &Path, path_str: &str) -> PathBuf {
    let path = PathBuf::from(path_str);
    if path.is_absolute() {
        path
    } else {
        base.join(path)
            .canonicalize()
            .unwrap_or_else(|_| base.join(path_str))
    }
}

/// Merge a parsed config file with env overrides and defaults
fn resolve(
    file: ConfigFile,
    config_path: Option<PathBuf>,
    default_home: PathBuf,
    env: impl Fn(&str) -> Option<String>,
) -> ResolvedConfig {
    let home = if let Some(env_home) = env("REGDRAFT_HOME") {
        PathBuf::from(env_home)
    } else if let (Some(home_path), Some(path)) = (&file.paths.home, &config_path) {
        let regdraft_dir = path.parent().unwrap_or(Path::new("."));
        resolve_path(regdraft_dir, home_path)
    } else {
        default_home
    };

    let defaults = DecodingParams::default();
    let model = ModelSettings {
        endpoint: env("REGDRAFT_MODEL_ENDPOINT")
            .or(file.model.endpoint)
            .unwrap_or_else(|| DEFAULT_ENDPOINT.to_string()),
        model: env("REGDRAFT_MODEL")
            .or(file.model.model)
            .unwrap_or_else(|| DEFAULT_MODEL.to_string()),
        params: DecodingParams {
            temperature: file.model.temperature.unwrap_or(defaults.temperature),
            top_p: file.model.top_p.unwrap_or(defaults.top_p),
            context_window: file.model.context_window.unwrap_or(defaults.context_window),
        },
        timeout_seconds: file
            .model
            .timeout_seconds
            .unwrap_or(DEFAULT_TIMEOUT_SECONDS),
    };

    ResolvedConfig {
        home,
        config_file: config_path,
        model,
        transport_retry: file.transport_retry.unwrap_or_default(),
        max_attempts: file
            .generation
            .max_attempts
            .unwrap_or(DEFAULT_MAX_ATTEMPTS)
            .max(1),
    }
}

/// Load configuration from all sources
fn load_config() -> Result<ResolvedConfig> {
    let default_home = dirs::home_dir()
        .context("Failed to determine home directory")?
        .join(".regdraft");

    let config_path = find_config_file();
    let file = match &config_path {
        Some(path) => load_config_file(path)?,
        None => ConfigFile::default(),
    };

    Ok(resolve(file, config_path, default_home, |key| {
        std::env::var(key).ok()
    }))
}

/// Get the global configuration (loads once, then cached)
pub fn config() -> Result<&'static ResolvedConfig> {
    let result = CONFIG.get_or_init(|| load_config().map_err(|e| e.to_string()));

    match result {
        Ok(config) => Ok(config),
        Err(e) => anyhow::bail!("{}", e),
    }
}

/// Get the jobs directory ($REGDRAFT_HOME/jobs)
pub fn jobs_dir() -> Result<PathBuf> {
    Ok(config()?.jobs_dir())
}
