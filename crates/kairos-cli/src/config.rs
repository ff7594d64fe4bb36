use kairos_common::utils::deserialize_log_level;
use serde::Deserialize;
use tracing::Level;

/// Which [`kairos_store::Store`] implementation to wire up, selected by
/// reading the `backend` string out of the YAML config and mapping it
/// to a concrete type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    File,
    Postgres,
}

/// Deserialized from a YAML config file on startup.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    #[serde(default = "default_base_interval")]
    pub base_interval_seconds: i64,
    #[serde(default = "default_delta_interval")]
    pub delta_interval_seconds: i64,
    pub backend: Backend,
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
    pub database_url: Option<String>,
    pub log_file: String,
    #[serde(deserialize_with = "deserialize_log_level")]
    pub log_level: Level,
    #[serde(default)]
    pub hack_scoring_enabled: bool,
}

fn default_base_interval() -> i64 {
    120
}

fn default_delta_interval() -> i64 {
    10
}

fn default_data_dir() -> String {
    "data".to_string()
}
