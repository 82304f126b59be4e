use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::core::AppError;

/// Gateway environment; selects base URL and API key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GatewayEnvironment {
    Sandbox,
    Production,
}

impl GatewayEnvironment {
    pub fn default_base_url(&self) -> &'static str {
        match self {
            GatewayEnvironment::Sandbox => "https://sandbox.asaas.com/api/v3",
            GatewayEnvironment::Production => "https://api.asaas.com/v3",
        }
    }
}

impl std::fmt::Display for GatewayEnvironment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GatewayEnvironment::Sandbox => write!(f, "sandbox"),
            GatewayEnvironment::Production => write!(f, "production"),
        }
    }
}

impl FromStr for GatewayEnvironment {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sandbox" => Ok(GatewayEnvironment::Sandbox),
            "production" | "prod" => Ok(GatewayEnvironment::Production),
            other => Err(AppError::configuration(format!(
                "Unknown ASAAS_ENVIRONMENT '{}'",
                other
            ))),
        }
    }
}
