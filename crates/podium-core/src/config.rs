use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::errors::ConfigError;

pub const SUPPORTED_CONFIG_VERSION: u32 = 1;

/// Service configuration, loaded from `podium.yaml`. Every field has a
/// default so a missing file is a usable deployment.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default = "default_version")]
    pub version: u32,
    /// Address the HTTP server binds.
    #[serde(default = "default_bind")]
    pub bind: String,
    /// CSV sheet holding one evaluation row per (team, judge).
    #[serde(default = "default_evaluation_sheet")]
    pub evaluation_sheet: PathBuf,
    /// CSV sheet holding login credentials and judge flags.
    #[serde(default = "default_credentials_sheet")]
    pub credentials_sheet: PathBuf,
    /// Competing teams, in display order.
    #[serde(default = "default_teams")]
    pub teams: Vec<String>,
    /// Whole-cache staleness window for evaluations.
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,
}

fn default_version() -> u32 {
    SUPPORTED_CONFIG_VERSION
}

fn default_bind() -> String {
    "127.0.0.1:3000".to_string()
}

fn default_evaluation_sheet() -> PathBuf {
    PathBuf::from("Evaluation_Result.csv")
}

fn default_credentials_sheet() -> PathBuf {
    PathBuf::from("Login_User_Credentials.csv")
}

fn default_teams() -> Vec<String> {
    vec!["Blue".to_string(), "Red".to_string(), "Green".to_string()]
}

fn default_cache_ttl_secs() -> u64 {
    30
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: default_version(),
            bind: default_bind(),
            evaluation_sheet: default_evaluation_sheet(),
            credentials_sheet: default_credentials_sheet(),
            teams: default_teams(),
            cache_ttl_secs: default_cache_ttl_secs(),
        }
    }
}

pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| ConfigError(format!("failed to read config {}: {}", path.display(), e)))?;
    let cfg: Config = serde_yaml::from_str(&raw)
        .map_err(|e| ConfigError(format!("failed to parse YAML: {}", e)))?;
    if cfg.version != SUPPORTED_CONFIG_VERSION {
        return Err(ConfigError(format!(
            "unsupported config version {} (supported: {})",
            cfg.version, SUPPORTED_CONFIG_VERSION
        )));
    }
    if cfg.teams.is_empty() {
        return Err(ConfigError("config has no teams".into()));
    }
    Ok(cfg)
}
