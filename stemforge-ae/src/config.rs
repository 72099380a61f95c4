//! Service configuration
//!
//! Settings resolve with the usual priority: command line beats
//! environment variables, which beat the TOML config file, which beats
//! built-in defaults.

use clap::Parser;
use std::path::PathBuf;
use stemforge_common::config::{
    default_config_path, load_toml_config, resolve_jobs_root, TomlConfig,
};
use stemforge_common::Result;

/// Default HTTP listen port
pub const DEFAULT_PORT: u16 = 5740;
/// Default concurrent heavy-compute worker slots.
///
/// One slot keeps a single separation model resident, which fits
/// comfortably on consumer GPUs; hosts with more memory can raise this.
pub const DEFAULT_WORKER_SLOTS: usize = 1;
/// Default separation model
pub const DEFAULT_MODEL: &str = "htdemucs";
/// Separation models accepted at submission
pub const ACCEPTED_MODELS: &[&str] = &["htdemucs", "htdemucs_ft", "htdemucs_6s", "mdx_extra"];

/// Environment variable naming the jobs root directory
pub const JOBS_ROOT_ENV: &str = "STEMFORGE_JOBS_ROOT";

/// Command line arguments
#[derive(Parser, Debug, Default)]
#[command(name = "stemforge-ae", about = "StemForge audio engineering service")]
pub struct Args {
    /// Jobs root directory (overrides environment and config file)
    #[arg(long)]
    pub jobs_root: Option<PathBuf>,

    /// HTTP listen port
    #[arg(long, env = "STEMFORGE_PORT")]
    pub port: Option<u16>,

    /// Concurrent worker slots for heavy computations
    #[arg(long, env = "STEMFORGE_WORKER_SLOTS")]
    pub worker_slots: Option<usize>,

    /// Path to a TOML config file (defaults to the per-user config dir)
    #[arg(long)]
    pub config: Option<PathBuf>,
}

/// Fully resolved service configuration
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub jobs_root: PathBuf,
    pub port: u16,
    pub worker_slots: usize,
    pub default_model: String,
    pub accepted_models: Vec<String>,
    pub reviewer_endpoint: Option<String>,
    pub reviewer_api_key: Option<String>,
}

impl ServiceConfig {
    /// Resolve configuration from arguments, environment, and TOML
    pub fn resolve(args: &Args) -> Result<Self> {
        let toml = match &args.config {
            Some(path) => load_toml_config(path)?,
            None => {
                let path = default_config_path()?;
                if path.is_file() {
                    load_toml_config(&path)?
                } else {
                    TomlConfig::default()
                }
            }
        };

        // An explicit --config file contributes its jobs_root to the
        // chain; otherwise the shared resolver consults the default file
        let jobs_root = match (args.config.is_some(), &toml.jobs_root) {
            (true, Some(root)) => args
                .jobs_root
                .clone()
                .or_else(|| std::env::var(JOBS_ROOT_ENV).ok().map(PathBuf::from))
                .unwrap_or_else(|| root.clone()),
            _ => resolve_jobs_root(args.jobs_root.as_deref(), JOBS_ROOT_ENV)?,
        };

        let reviewer_endpoint = std::env::var("STEMFORGE_REVIEWER_ENDPOINT")
            .ok()
            .or(toml.reviewer_endpoint);
        let reviewer_api_key = std::env::var("STEMFORGE_REVIEWER_API_KEY")
            .ok()
            .or(toml.reviewer_api_key);

        Ok(Self {
            jobs_root,
            port: args.port.or(toml.port).unwrap_or(DEFAULT_PORT),
            worker_slots: args
                .worker_slots
                .or(toml.worker_slots)
                .unwrap_or(DEFAULT_WORKER_SLOTS)
                .max(1),
            default_model: toml
                .default_model
                .unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            accepted_models: ACCEPTED_MODELS.iter().map(|m| m.to_string()).collect(),
            reviewer_endpoint,
            reviewer_api_key,
        })
    }
}
