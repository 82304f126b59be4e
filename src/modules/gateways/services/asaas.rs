use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::{Client, RequestBuilder};
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

use super::gateway_trait::PaymentGateway;
use crate::config::AsaasConfig;
use crate::core::{AppError, Result};
use crate::modules::gateways::models::{
    ChargePage, ChargeRequest, ChargeSnapshot, CreatedCharge, CustomerProfile, CustomerSnapshot,
    GatewayEnvironment, PixQrCode,
};

/// Asaas REST client
#[derive(Clone)]
pub struct AsaasClient {
    client: Client,
    api_key: String,
    base_url: String,
    environment: GatewayEnvironment,
}

#[derive(Deserialize)]
struct AsaasErrorBody {
    #[serde(default)]
    errors: Vec<AsaasErrorItem>,
}

#[derive(Deserialize)]
struct AsaasErrorItem {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    description: Option<String>,
}

#[derive(Deserialize)]
struct CreatedCustomer {
    id: String,
}

impl AsaasClient {
    /// Build a client for the configured environment
    pub fn new(config: &AsaasConfig) -> Result<Self> {
        Self::with_base_url(
            config.base_url(),
            config.api_key()?.to_string(),
            config.environment,
            config.timeout(),
        )
    }

    /// Build a client against an explicit base URL
    pub fn with_base_url(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        environment: GatewayEnvironment,
        timeout: Duration,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("disputepay/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| AppError::configuration(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            api_key: api_key.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            environment,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder, operation: &str) -> Result<T> {
        let response = request
            .header("access_token", &self.api_key)
            .send()
            .await
            .map_err(|e| transport_error(operation, e))?;

        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|e| transport_error(operation, e))?;

        if !status.is_success() {
            let err = gateway_error(status.as_u16(), &body);
            tracing::warn!(
                operation = operation,
                status = status.as_u16(),
                error = %err,
                "Asaas request failed"
            );
            return Err(err);
        }

        serde_json::from_slice(&body).map_err(|e| {
            AppError::internal(format!("Unexpected Asaas response for {}: {}", operation, e))
        })
    }
}

#[async_trait]
impl PaymentGateway for AsaasClient {
    async fn create_customer(&self, profile: &CustomerProfile) -> Result<String> {
        let created: CreatedCustomer = self
            .send(
                self.client.post(self.url("/customers")).json(profile),
                "create_customer",
            )
            .await?;

        tracing::info!(customer_id = %created.id, "Asaas customer created");
        Ok(created.id)
    }

    async fn fetch_customer(&self, customer_id: &str) -> Result<CustomerSnapshot> {
        self.send(
            self.client
                .get(self.url(&format!("/customers/{}", customer_id))),
            "fetch_customer",
        )
        .await
    }

    async fn create_charge(&self, request: &ChargeRequest) -> Result<CreatedCharge> {
        let created: CreatedCharge = self
            .send(
                self.client.post(self.url("/payments")).json(request),
                "create_charge",
            )
            .await?;

        tracing::info!(
            external_id = %created.id,
            value = %request.value,
            splits = request.split.len(),
            "Asaas charge created"
        );
        Ok(created)
    }

    async fn fetch_qr_code(&self, external_id: &str) -> Result<PixQrCode> {
        self.send(
            self.client
                .get(self.url(&format!("/payments/{}/pixQrCode", external_id))),
            "fetch_qr_code",
        )
        .await
    }

    async fn fetch_charge(&self, external_id: &str) -> Result<ChargeSnapshot> {
        self.send(
            self.client
                .get(self.url(&format!("/payments/{}", external_id))),
            "fetch_charge",
        )
        .await
    }

    async fn list_charges(&self, offset: u32, limit: u32) -> Result<ChargePage> {
        self.send(
            self.client
                .get(self.url("/payments"))
                .query(&[("offset", offset), ("limit", limit)]),
            "list_charges",
        )
        .await
    }

    async fn mark_paid_manually(
        &self,
        external_id: &str,
        payment_date: NaiveDate,
        value: Decimal,
    ) -> Result<()> {
        #[derive(Serialize)]
        #[serde(rename_all = "camelCase")]
        struct ReceiveInCash {
            payment_date: NaiveDate,
            #[serde(with = "rust_decimal::serde::arbitrary_precision")]
            value: Decimal,
            notify_customer: bool,
        }

        let _: serde_json::Value = self
            .send(
                self.client
                    .post(self.url(&format!("/payments/{}/receiveInCash", external_id)))
                    .json(&ReceiveInCash {
                        payment_date,
                        value,
                        notify_customer: false,
                    }),
                "mark_paid_manually",
            )
            .await?;

        Ok(())
    }

    fn environment(&self) -> GatewayEnvironment {
        self.environment
    }

    fn with_api_key(&self, api_key: &str) -> Arc<dyn PaymentGateway> {
        let mut scoped = self.clone();
        scoped.api_key = api_key.to_string();
        Arc::new(scoped)
    }
}

fn transport_error(operation: &str, err: reqwest::Error) -> AppError {
    tracing::warn!(operation = operation, error = %err, "Asaas unreachable");
    AppError::unavailable(format!("{}: {}", operation, err))
}

/// Map a non-2xx response body to `AppError::Gateway`
fn gateway_error(status: u16, body: &[u8]) -> AppError {
    let first = serde_json::from_slice::<AsaasErrorBody>(body)
        .ok()
        .and_then(|b| b.errors.into_iter().next());

    let (code, description) = match first {
        Some(item) => (item.code, item.description),
        None => (None, None),
    };

    let description = description.unwrap_or_else(|| {
        let text = String::from_utf8_lossy(body).trim().to_string();
        if text.is_empty() {
            format!("Asaas returned HTTP {}", status)
        } else {
            text
        }
    });

    AppError::Gateway {
        status,
        code,
        description,
    }
}
