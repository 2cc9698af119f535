use std::env;
use std::time::Duration;

use config::{Config as ConfigBuilder, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use tripweave_itinerary::{DeriveOptions, RegenerationPolicy, StoreSettings};

/// Application configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    #[serde(default)]
    pub planner: PlannerConfig,
    #[serde(default)]
    pub providers: ProvidersConfig,
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

/// Day-plan derivation and auto-save tuning
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PlannerConfig {
    #[serde(default = "default_daily_budget_km")]
    pub daily_budget_km: f64,
    #[serde(default = "default_cost_per_km")]
    pub cost_per_km: f64,
    #[serde(default = "default_lodging_per_night")]
    pub lodging_per_night: f64,
    #[serde(default = "default_lodging_min")]
    pub lodging_min: f64,
    #[serde(default = "default_lodging_max")]
    pub lodging_max: f64,
    #[serde(default = "default_autosave_delay_secs")]
    pub autosave_delay_secs: u64,
    /// Open itineraries untouched for this long are saved and closed
    #[serde(default = "default_idle_store_secs")]
    pub idle_store_secs: u64,
    #[serde(default)]
    pub regeneration: RegenerationPolicy,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            daily_budget_km: default_daily_budget_km(),
            cost_per_km: default_cost_per_km(),
            lodging_per_night: default_lodging_per_night(),
            lodging_min: default_lodging_min(),
            lodging_max: default_lodging_max(),
            autosave_delay_secs: default_autosave_delay_secs(),
            idle_store_secs: default_idle_store_secs(),
            regeneration: RegenerationPolicy::default(),
        }
    }
}

impl PlannerConfig {
    pub fn store_settings(&self) -> StoreSettings {
        let options = DeriveOptions {
            daily_budget_km: self.daily_budget_km,
            cost_per_km: self.cost_per_km,
            lodging_per_night: self.lodging_per_night,
            lodging_range: (self.lodging_min, self.lodging_max),
            ..DeriveOptions::default()
        };

        StoreSettings {
            options,
            policy: self.regeneration,
            autosave_delay: Duration::from_secs(self.autosave_delay_secs),
            idle_ttl: Duration::from_secs(self.idle_store_secs),
        }
    }
}

fn default_daily_budget_km() -> f64 {
    tripweave_itinerary::DEFAULT_DAILY_BUDGET_KM
}

fn default_cost_per_km() -> f64 {
    8.0
}

fn default_lodging_per_night() -> f64 {
    2500.0
}

fn default_lodging_min() -> f64 {
    2000.0
}

fn default_lodging_max() -> f64 {
    4000.0
}

fn default_autosave_delay_secs() -> u64 {
    tripweave_itinerary::DEFAULT_AUTOSAVE_DELAY.as_secs()
}

fn default_idle_store_secs() -> u64 {
    tripweave_itinerary::DEFAULT_IDLE_TTL.as_secs()
}

/// Upstream services: the maps platform and the hosted LLM gateway
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ProvidersConfig {
    #[serde(default = "default_maps_url")]
    pub maps_url: String,
    #[serde(default)]
    pub maps_api_key: String,
    #[serde(default = "default_gateway_url")]
    pub gateway_url: String,
    #[serde(default)]
    pub gateway_api_key: String,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    /// Base of public share links
    #[serde(default = "default_public_base_url")]
    pub public_base_url: String,
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        Self {
            maps_url: default_maps_url(),
            maps_api_key: String::new(),
            gateway_url: default_gateway_url(),
            gateway_api_key: String::new(),
            request_timeout_secs: default_request_timeout_secs(),
            public_base_url: default_public_base_url(),
        }
    }
}

fn default_maps_url() -> String {
    "https://maps.googleapis.com/maps/api".to_string()
}

fn default_gateway_url() -> String {
    "http://localhost:8787".to_string()
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_public_base_url() -> String {
    "http://localhost:3000".to_string()
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ObservabilityConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Config {
    /// Load configuration from file and environment variables
    ///
    /// Priority (highest to lowest):
    /// 1. Environment variables (TRIPWEAVE__DATABASE__URL, etc.)
    /// 2. Config file specified by path
    /// 3. Hardcoded defaults
    pub fn load(config_path: Option<String>) -> Result<Self, ConfigError> {
        let mut builder = ConfigBuilder::builder();

        builder = builder
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 3000)?
            .set_default("database.url", "sqlite:tripweave.db")?
            .set_default("database.max_connections", 5)?;

        let config_file_path = config_path
            .or_else(|| env::var("CONFIG_PATH").ok())
            .unwrap_or_else(|| "config/default.toml".to_string());

        // Optional, ignored when missing
        if std::path::Path::new(&config_file_path).exists() {
            builder = builder.add_source(File::with_name(&config_file_path));
        }

        builder = builder.add_source(
            Environment::with_prefix("TRIPWEAVE")
                .separator("__")
                .try_parsing(true),
        );

        if let Ok(database_url) = env::var("DATABASE_URL") {
            builder = builder.set_override("database.url", database_url)?;
        }

        builder.build()?.try_deserialize()
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if !(self.planner.daily_budget_km > 0.0) {
            return Err("Planner daily_budget_km must be greater than 0".to_string());
        }
        if self.planner.idle_store_secs == 0 {
            return Err("Planner idle_store_secs must be greater than 0".to_string());
        }
        if self.planner.lodging_min > self.planner.lodging_max {
            return Err("Planner lodging_min must not exceed lodging_max".to_string());
        }
        if self.database.max_connections < 1 {
            return Err("Database max_connections must be at least 1".to_string());
        }
        if self.server.port == 0 {
            return Err("Server port must be greater than 0".to_string());
        }
        if url::Url::parse(&self.providers.public_base_url).is_err() {
            return Err("Providers public_base_url must be an absolute URL".to_string());
        }
        Ok(())
    }
}
