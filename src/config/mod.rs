use crate::core::{AppError, Result};
use std::env;
use std::time::Duration;

pub mod database;
pub mod server;

pub use database::DatabaseConfig;
pub use server::ServerConfig;

use crate::modules::gateways::GatewayEnvironment;

/// Main application configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub app: AppConfig,
    pub database: DatabaseConfig,
    pub server: ServerConfig,
    pub asaas: AsaasConfig,
    pub billing: BillingConfig,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub env: String,
    pub log_level: String,
    pub log_json: bool,
}

/// Gateway connection settings, resolved once at startup.
///
/// Changing environment or keys requires a restart; nothing re-reads these
/// values while the process runs.
#[derive(Debug, Clone)]
pub struct AsaasConfig {
    pub environment: GatewayEnvironment,
    pub sandbox_api_key: Option<String>,
    pub production_api_key: Option<String>,
    pub base_url_override: Option<String>,
    pub webhook_token: Option<String>,
    pub timeout_secs: u64,
    pub max_retries: u32,
}

#[derive(Debug, Clone)]
pub struct BillingConfig {
    /// Wallet of the platform account that owns charges created with the default key
    pub platform_wallet_id: String,
    pub charge_due_days: i64,
    pub sync_page_size: u32,
}

impl AsaasConfig {
    /// API key for the configured environment
    pub fn api_key(&self) -> Result<&str> {
        let key = match self.environment {
            GatewayEnvironment::Sandbox => self.sandbox_api_key.as_deref(),
            GatewayEnvironment::Production => self.production_api_key.as_deref(),
        };

        key.filter(|k| !k.trim().is_empty()).ok_or_else(|| {
            AppError::configuration(format!(
                "No Asaas API key configured for {} environment",
                self.environment
            ))
        })
    }

    /// Base URL for the configured environment
    pub fn base_url(&self) -> String {
        self.base_url_override
            .clone()
            .unwrap_or_else(|| self.environment.default_base_url().to_string())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if present
        dotenvy::dotenv().ok();

        let config = Config {
            app: AppConfig {
                env: env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
                log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
                log_json: env::var("LOG_FORMAT")
                    .map(|v| v.eq_ignore_ascii_case("json"))
                    .unwrap_or(false),
            },
            database: DatabaseConfig::from_env()?,
            server: ServerConfig::from_env()?,
            asaas: AsaasConfig {
                environment: env::var("ASAAS_ENVIRONMENT")
                    .unwrap_or_else(|_| "sandbox".to_string())
                    .parse()?,
                sandbox_api_key: optional_var("ASAAS_API_KEY_SANDBOX"),
                production_api_key: optional_var("ASAAS_API_KEY_PRODUCTION"),
                base_url_override: optional_var("ASAAS_BASE_URL"),
                webhook_token: optional_var("ASAAS_WEBHOOK_TOKEN"),
                timeout_secs: parse_var("ASAAS_TIMEOUT_SECS", 15)?,
                max_retries: parse_var("ASAAS_MAX_RETRIES", 3)?,
            },
            billing: BillingConfig {
                platform_wallet_id: env::var("PLATFORM_WALLET_ID").map_err(|_| {
                    AppError::configuration("PLATFORM_WALLET_ID not set")
                })?,
                charge_due_days: parse_var("CHARGE_DUE_DAYS", 3)?,
                sync_page_size: parse_var("SYNC_PAGE_SIZE", 100)?,
            },
        };

        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        self.asaas.api_key()?;

        if self.asaas.timeout_secs == 0 {
            return Err(AppError::configuration(
                "ASAAS_TIMEOUT_SECS must be greater than 0",
            ));
        }

        if self.billing.sync_page_size == 0 || self.billing.sync_page_size > 100 {
            return Err(AppError::configuration(
                "SYNC_PAGE_SIZE must be between 1 and 100",
            ));
        }

        if self.billing.charge_due_days < 0 {
            return Err(AppError::configuration(
                "CHARGE_DUE_DAYS cannot be negative",
            ));
        }

        if self.billing.platform_wallet_id.trim().is_empty() {
            return Err(AppError::configuration("PLATFORM_WALLET_ID is empty"));
        }

        Ok(())
    }
}

fn optional_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn parse_var<T: std::str::FromStr>(name: &str, default: T) -> Result<T> {
    match env::var(name) {
        Ok(raw) => raw
            .parse()
            .map_err(|_| AppError::configuration(format!("Invalid {}", name))),
        Err(_) => Ok(default),
    }
}
