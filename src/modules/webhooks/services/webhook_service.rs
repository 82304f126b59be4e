use chrono::{DateTime, Utc};
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::sync::Arc;

use crate::core::{AppError, Result};
use crate::modules::ledger::models::{NewWebhookEvent, WebhookEvent};
use crate::modules::ledger::{ChargeProjector, LedgerStore, ProjectionResult};
use crate::modules::webhooks::models::AsaasWebhook;

/// What happened to one notification
#[derive(Debug, Clone, Serialize)]
pub struct IngestOutcome {
    pub event_id: String,
    pub event_type: String,
    pub asaas_payment_id: String,
    /// Every applicable ledger update succeeded
    pub processed: bool,
    /// At least one ledger row changed
    pub changed: bool,
    /// Neither ledger knows the charge
    pub unknown_charge: bool,
}

/// Result of an operator re-run of pending events
#[derive(Debug, Clone, Default, Serialize)]
pub struct ReprocessReport {
    pub attempted: usize,
    pub processed: usize,
    pub failed: usize,
}

/// Persists and applies Asaas notifications
pub struct WebhookService {
    store: Arc<dyn LedgerStore>,
    projector: ChargeProjector,
    webhook_token: Option<String>,
}

impl WebhookService {
    pub fn new(store: Arc<dyn LedgerStore>, webhook_token: Option<String>) -> Self {
        Self {
            projector: ChargeProjector::new(store.clone()),
            store,
            webhook_token: webhook_token.filter(|t| !t.is_empty()),
        }
    }

    /// Check the shared secret when one is configured
    pub fn verify_token(&self, presented: Option<&str>) -> Result<()> {
        match &self.webhook_token {
            None => Ok(()),
            Some(expected) if presented == Some(expected.as_str()) => Ok(()),
            Some(_) => Err(AppError::unauthorized("Invalid webhook token")),
        }
    }

    /// Persist one raw notification, then apply it to both ledgers.
    ///
    /// Only payloads that are not a recognizable notification are rejected.
    /// Unknown charges and ledger failures are reported in the outcome, never
    /// as errors, so the gateway does not redeliver what is already stored.
    pub async fn ingest(&self, body: &[u8]) -> Result<IngestOutcome> {
        let raw: serde_json::Value = serde_json::from_slice(body)
            .map_err(|e| AppError::validation(format!("Webhook body is not JSON: {}", e)))?;
        let webhook = AsaasWebhook::from_value(&raw)?;

        let event = self
            .store
            .record_webhook_event(NewWebhookEvent {
                event_type: webhook.event.clone(),
                asaas_payment_id: Some(webhook.payment.id.clone()),
                payload: raw.clone(),
                payload_sha256: payload_digest(body),
            })
            .await?;

        tracing::info!(
            event_id = %event.id,
            gateway_event_id = ?webhook.id,
            event_type = %webhook.event,
            external_id = %webhook.payment.id,
            "Webhook received"
        );

        Ok(self.apply(&event, &webhook, &raw, event.received_at).await)
    }

    /// Re-run unprocessed events in insertion order
    pub async fn reprocess_pending(&self, limit: u32) -> Result<ReprocessReport> {
        let events = self.store.list_unprocessed_webhooks(limit).await?;
        let mut report = ReprocessReport::default();

        for event in events {
            report.attempted += 1;

            let webhook = match AsaasWebhook::from_value(&event.payload) {
                Ok(webhook) => webhook,
                Err(e) => {
                    self.mark_failed(&event.id, &e.to_string()).await;
                    report.failed += 1;
                    continue;
                }
            };

            let outcome = self
                .apply(&event, &webhook, &event.payload, event.received_at)
                .await;
            if outcome.processed {
                report.processed += 1;
            } else {
                report.failed += 1;
            }
        }

        tracing::info!(
            attempted = report.attempted,
            processed = report.processed,
            failed = report.failed,
            "Pending webhooks reprocessed"
        );

        Ok(report)
    }

    async fn apply(
        &self,
        event: &WebhookEvent,
        webhook: &AsaasWebhook,
        raw: &serde_json::Value,
        received_at: DateTime<Utc>,
    ) -> IngestOutcome {
        let update = webhook.to_update(raw, received_at);
        let result = self.projector.project(&update).await;

        let processed = if result.nothing_found() {
            tracing::info!(
                event_id = %event.id,
                external_id = %update.external_id,
                "Webhook for unknown charge, recorded for audit"
            );
            self.mark_processed(&event.id).await
        } else if result.succeeded() {
            self.mark_processed(&event.id).await
        } else {
            let error = result.error().unwrap_or_default();
            self.mark_failed(&event.id, &error).await;
            false
        };

        outcome(event, webhook, &result, processed)
    }

    async fn mark_processed(&self, event_id: &str) -> bool {
        match self.store.mark_webhook_processed(event_id).await {
            Ok(()) => true,
            Err(e) => {
                tracing::error!(event_id = %event_id, error = %e, "Failed to mark webhook processed");
                false
            }
        }
    }

    async fn mark_failed(&self, event_id: &str, error: &str) {
        tracing::warn!(event_id = %event_id, error = %error, "Webhook left unprocessed");
        if let Err(e) = self.store.mark_webhook_failed(event_id, error).await {
            tracing::error!(event_id = %event_id, error = %e, "Failed to record webhook error");
        }
    }
}

fn outcome(
    event: &WebhookEvent,
    webhook: &AsaasWebhook,
    result: &ProjectionResult,
    processed: bool,
) -> IngestOutcome {
    IngestOutcome {
        event_id: event.id.clone(),
        event_type: webhook.event.clone(),
        asaas_payment_id: webhook.payment.id.clone(),
        processed,
        changed: result.changed(),
        unknown_charge: result.nothing_found(),
    }
}

/// Hex SHA-256 of the raw body
pub fn payload_digest(body: &[u8]) -> String {
    hex::encode(Sha256::digest(body))
}
