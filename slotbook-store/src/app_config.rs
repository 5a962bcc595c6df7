use serde::Deserialize;
use std::env;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub business_rules: BusinessRules,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    #[serde(default = "default_acquire_timeout_secs")]
    pub acquire_timeout_secs: u64,
    #[serde(default = "default_true")]
    pub run_migrations: bool,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    Postgres,
    Memory,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct StorageConfig {
    #[serde(default)]
    pub backend: StorageBackend,
    #[serde(default)]
    pub seed_demo_data: bool,
}

#[derive(Debug, Deserialize, Clone)]
pub struct BusinessRules {
    #[serde(default = "default_tax_rate")]
    pub tax_rate: f64,
    #[serde(default = "default_transaction_timeout_ms")]
    pub transaction_timeout_ms: u64,
    /// Days ahead shown on an experience page; unlimited when unset.
    pub slot_window_days: Option<u64>,
    #[serde(default = "default_reference_length")]
    pub reference_length: usize,
}

impl Default for BusinessRules {
    fn default() -> Self {
        Self {
            tax_rate: default_tax_rate(),
            transaction_timeout_ms: default_transaction_timeout_ms(),
            slot_window_days: None,
            reference_length: default_reference_length(),
        }
    }
}

fn default_max_connections() -> u32 { 5 }
fn default_acquire_timeout_secs() -> u64 { 3 }
fn default_true() -> bool { true }
fn default_tax_rate() -> f64 { 0.06 }
fn default_transaction_timeout_ms() -> u64 { 5000 }
fn default_reference_length() -> usize { 6 }

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = config::Config::builder()
            .add_source(config::File::with_name("config/default"))
            // optional per-environment overrides
            .add_source(config::File::with_name(&format!("config/{}", run_mode)).required(false))
            // not checked in
            .add_source(config::File::with_name("config/local").required(false))
            // e.g. SLOTBOOK__SERVER__PORT=4000
            .add_source(config::Environment::with_prefix("SLOTBOOK").separator("__"))
            .build()?;

        s.try_deserialize()
    }
}
