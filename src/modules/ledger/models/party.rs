use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Debtor owned by a company
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Client {
    pub id: String,
    pub company_id: String,
    pub name: String,
    /// CPF or CNPJ, digits only
    pub tax_id: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub asaas_customer_id: Option<String>,
    /// Created by reconciliation from gateway data alone
    pub placeholder: bool,
    pub created_at: DateTime<Utc>,
}

/// Profile used when a client has to be created
#[derive(Debug, Clone, Default)]
pub struct ClientSeed {
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub asaas_customer_id: Option<String>,
    pub placeholder: bool,
}

impl ClientSeed {
    pub fn placeholder(tax_id: &str, asaas_customer_id: Option<String>) -> Self {
        Self {
            name: format!("Cliente {}", tax_id),
            email: None,
            phone: None,
            asaas_customer_id,
            placeholder: true,
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewClient {
    pub company_id: String,
    pub tax_id: String,
    pub seed: ClientSeed,
}

impl NewClient {
    pub fn into_client(self) -> Client {
        Client {
            id: uuid::Uuid::new_v4().to_string(),
            company_id: self.company_id,
            name: self.seed.name,
            tax_id: self.tax_id,
            email: self.seed.email,
            phone: self.seed.phone,
            asaas_customer_id: self.seed.asaas_customer_id,
            placeholder: self.seed.placeholder,
            created_at: Utc::now(),
        }
    }
}

/// Tenant / dispatcher
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Company {
    pub id: String,
    pub name: String,
    pub tax_id: String,
    /// Wallet receiving splits; may be resolved through the sub-account
    pub wallet_id: Option<String>,
    pub asaas_customer_id: Option<String>,
}

/// Gateway sub-account of a company
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Subaccount {
    pub id: String,
    pub company_id: String,
    pub wallet_id: Option<String>,
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    pub status: String,
}

impl Subaccount {
    pub fn is_active(&self) -> bool {
        !matches!(
            self.status.to_ascii_lowercase().as_str(),
            "rejected" | "disabled" | "inactive"
        )
    }
}

/// Keep only the digits of a CPF/CNPJ
pub fn normalize_tax_id(raw: &str) -> String {
    raw.chars().filter(|c| c.is_ascii_digit()).collect()
}
