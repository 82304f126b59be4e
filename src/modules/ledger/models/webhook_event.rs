use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Audit row recorded for every inbound gateway notification
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct WebhookEvent {
    pub id: String,
    pub event_type: String,
    pub asaas_payment_id: Option<String>,
    pub payload: serde_json::Value,
    pub payload_sha256: String,
    pub processed: bool,
    pub processed_at: Option<DateTime<Utc>>,
    pub error: Option<String>,
    pub received_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewWebhookEvent {
    pub event_type: String,
    pub asaas_payment_id: Option<String>,
    pub payload: serde_json::Value,
    pub payload_sha256: String,
}

impl NewWebhookEvent {
    pub fn into_event(self) -> WebhookEvent {
        WebhookEvent {
            id: uuid::Uuid::new_v4().to_string(),
            event_type: self.event_type,
            asaas_payment_id: self.asaas_payment_id,
            payload: self.payload,
            payload_sha256: self.payload_sha256,
            processed: false,
            processed_at: None,
            error: None,
            received_at: Utc::now(),
        }
    }
}
