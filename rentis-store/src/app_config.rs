use rentis_guard::GuardConfig;
use serde::Deserialize;
use std::env;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub redis: RedisConfig,
    pub auth: AuthConfig,
    pub business_rules: BusinessRules,
    #[serde(default)]
    pub guard: GuardConfig,
}

/// Company configuration consumed by the pricing/availability logic.
#[derive(Debug, Deserialize, Clone)]
pub struct BusinessRules {
    /// Hours to keep free between back-to-back bookings of the same car.
    pub buffer_time_hours: u32,
    pub base_day_rate_cents: i64,
    /// month ("1"-"12") -> multiplier; keys stay strings because that is
    /// what layered TOML/env sources can express
    #[serde(default)]
    pub season_multipliers: std::collections::HashMap<String, f64>,
    pub working_hours_start: Option<String>, // "HH:MM"
    pub working_hours_end: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AuthConfig {
    pub jwt_secret: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RedisConfig {
    pub url: String,
}

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = config::Config::builder()
            // Base configuration, always present
            .add_source(config::File::with_name("config/default"))
            // Environment-specific file, optional
            .add_source(config::File::with_name(&format!("config/{}", run_mode)).required(false))
            // Machine-local overrides, never checked in
            .add_source(config::File::with_name("config/local").required(false))
            // Environment variables win over everything:
            // RENTIS__GUARD__RATE_LIMIT_MAX=5 sets guard.rate_limit_max
            .add_source(config::Environment::with_prefix("RENTIS").separator("__"))
            .build()?;

        s.try_deserialize()
    }
}
