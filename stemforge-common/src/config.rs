//! Configuration loading and jobs-root resolution

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// TOML configuration file contents
///
/// All fields optional; anything absent falls back to environment variables
/// or compiled defaults (see [`resolve_jobs_root`]).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TomlConfig {
    /// Directory holding per-job directories
    pub jobs_root: Option<PathBuf>,
    /// HTTP listen port
    pub port: Option<u16>,
    /// Bounded worker pool size (concurrent heavy jobs)
    pub worker_slots: Option<usize>,
    /// Default separation model when the caller does not choose one
    pub default_model: Option<String>,
    /// Optional musical-correctness reviewer endpoint
    pub reviewer_endpoint: Option<String>,
    /// API key for the reviewer endpoint
    pub reviewer_api_key: Option<String>,
}

/// Jobs-root resolution priority order:
/// 1. Command-line argument (highest priority)
/// 2. Environment variable
/// 3. TOML config file
/// 4. OS-dependent compiled default (fallback)
pub fn resolve_jobs_root(cli_arg: Option<&Path>, env_var_name: &str) -> Result<PathBuf> {
    // Priority 1: Command-line argument
    if let Some(path) = cli_arg {
        return Ok(path.to_path_buf());
    }

    // Priority 2: Environment variable
    if let Ok(path) = std::env::var(env_var_name) {
        return Ok(PathBuf::from(path));
    }

    // Priority 3: TOML config file
    if let Ok(config_path) = default_config_path() {
        if config_path.exists() {
            let config = load_toml_config(&config_path)?;
            if let Some(jobs_root) = config.jobs_root {
                return Ok(jobs_root);
            }
        }
    }

    // Priority 4: OS-dependent compiled default
    Ok(default_jobs_root())
}

/// Load and parse a TOML config file
pub fn load_toml_config(path: &Path) -> Result<TomlConfig> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Read TOML failed ({}): {}", path.display(), e)))?;
    toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Parse TOML failed ({}): {}", path.display(), e)))
}

/// Write a TOML config file atomically (temp file + rename)
pub fn write_toml_config(config: &TomlConfig, path: &Path) -> Result<()> {
    let content = toml::to_string_pretty(config)
        .map_err(|e| Error::Config(format!("Serialize TOML failed: {}", e)))?;
    let tmp_path = path.with_extension("toml.tmp");
    std::fs::write(&tmp_path, content)?;
    std::fs::rename(&tmp_path, path)?;
    Ok(())
}

/// Default configuration file path for the platform
pub fn default_config_path() -> Result<PathBuf> {
    dirs::config_dir()
        .map(|d| d.join("stemforge").join("stemforge.toml"))
        .ok_or_else(|| Error::Config("Could not determine config directory".to_string()))
}

/// OS-dependent default jobs root
pub fn default_jobs_root() -> PathBuf {
    if cfg!(target_os = "linux") {
        dirs::data_local_dir()
            .map(|d| d.join("stemforge").join("jobs"))
            .unwrap_or_else(|| PathBuf::from("/var/lib/stemforge/jobs"))
    } else if cfg!(target_os = "macos") {
        dirs::data_dir()
            .map(|d| d.join("stemforge").join("jobs"))
            .unwrap_or_else(|| PathBuf::from("/Library/Application Support/stemforge/jobs"))
    } else if cfg!(target_os = "windows") {
        dirs::data_local_dir()
            .map(|d| d.join("stemforge").join("jobs"))
            .unwrap_or_else(|| PathBuf::from("C:\\ProgramData\\stemforge\\jobs"))
    } else {
        PathBuf::from("./stemforge_jobs")
    }
}
