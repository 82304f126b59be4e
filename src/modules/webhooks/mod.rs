pub mod controllers;
pub mod models;
pub mod services;

pub use controllers::configure;
pub use models::{AsaasWebhook, WebhookEventType};
pub use services::{IngestOutcome, ReprocessReport, WebhookService};
