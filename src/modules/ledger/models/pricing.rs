use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::modules::splits::CostModel;

/// Infraction severity tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "VARCHAR(16)", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum SeverityTier {
    Leve,
    Media,
    Grave,
    Gravissima,
}

impl std::fmt::Display for SeverityTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SeverityTier::Leve => write!(f, "leve"),
            SeverityTier::Media => write!(f, "media"),
            SeverityTier::Grave => write!(f, "grave"),
            SeverityTier::Gravissima => write!(f, "gravissima"),
        }
    }
}

/// Priced ticket-dispute service
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ServicePricing {
    pub id: String,
    pub name: String,
    pub severity_tier: SeverityTier,
    /// Company whose wallet receives the secondary fee
    pub partner_company_id: Option<String>,
    pub primary_fee: Decimal,
    pub secondary_fee: Decimal,
    pub fixed_fee: Decimal,
    pub suggested_price: Decimal,
    pub active: bool,
}

impl ServicePricing {
    pub fn cost_model(&self) -> CostModel {
        CostModel::new(
            self.primary_fee,
            self.secondary_fee,
            self.fixed_fee,
            self.suggested_price,
        )
    }

    /// Whether a free-text charge description names this service.
    ///
    /// Matches the service name, or the tier name as a whole word.
    pub fn matches_description(&self, description: &str) -> bool {
        let haystack = description.to_lowercase();
        if !self.name.trim().is_empty() && haystack.contains(&self.name.to_lowercase()) {
            return true;
        }

        let tier = self.severity_tier.to_string();
        haystack
            .split(|c: char| !c.is_alphanumeric())
            .any(|word| word == tier)
    }
}
