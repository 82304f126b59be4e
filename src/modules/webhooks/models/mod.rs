pub mod asaas_webhook;

pub use asaas_webhook::{AsaasWebhook, WebhookEventType, WebhookPayment};
