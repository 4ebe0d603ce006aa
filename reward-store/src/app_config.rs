use config::builder::DefaultState;
use config::{ConfigBuilder, ConfigError};
use serde::Deserialize;
use std::env;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub webhook: WebhookConfig,
    pub business_rules: BusinessRules,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub port: u16,
    /// How long shutdown waits for pending payouts to settle.
    pub shutdown_drain_seconds: u64,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Postgres,
    Memory,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub backend: StoreBackend,
    pub url: Option<String>,
    pub max_connections: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct WebhookConfig {
    pub timeout_seconds: u64,
}

/// Payout rules. Seeds the runtime policy at startup.
#[derive(Debug, Deserialize, Clone)]
pub struct BusinessRules {
    pub force_success: bool,
    pub max_pending_seconds: u64,
}

impl Config {
    pub fn load() -> Result<Self, ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = Self::with_defaults()?
            // Checked-in defaults
            .add_source(config::File::with_name("config/default").required(false))
            // Per environment overrides, optional
            .add_source(config::File::with_name(&format!("config/{}", run_mode)).required(false))
            // Local developer overrides, not checked in
            .add_source(config::File::with_name("config/local").required(false))
            .add_source(Self::environment())
            .build()?;

        let config: Self = s.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Eg. `REWARD__BUSINESS_RULES__FORCE_SUCCESS=true`
    pub fn environment() -> config::Environment {
        config::Environment::with_prefix("REWARD")
            .separator("__")
            .try_parsing(true)
    }

    /// Builder pre-populated with built-in defaults; sources added later win.
    pub fn with_defaults() -> Result<ConfigBuilder<DefaultState>, ConfigError> {
        config::Config::builder()
            .set_default("server.port", 3010)?
            .set_default("server.shutdown_drain_seconds", 15)?
            .set_default("database.backend", "postgres")?
            .set_default("database.max_connections", 5)?
            .set_default("webhook.timeout_seconds", 5)?
            .set_default("business_rules.force_success", false)?
            .set_default("business_rules.max_pending_seconds", 10)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.database.backend == StoreBackend::Postgres
            && self.database.url.as_deref().map_or(true, str::is_empty)
        {
            return Err(ConfigError::Message(
                "database.url is required for the postgres backend".into(),
            ));
        }
        if self.webhook.timeout_seconds == 0 {
            return Err(ConfigError::Message("webhook.timeout_seconds must be positive".into()));
        }
        Ok(())
    }
}
