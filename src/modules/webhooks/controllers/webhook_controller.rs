use actix_web::{post, web, HttpRequest, HttpResponse};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

use crate::core::Result;
use crate::middleware::RequestIdValue;
use crate::modules::webhooks::services::WebhookService;

pub const WEBHOOK_TOKEN_HEADER: &str = "asaas-access-token";

const DEFAULT_REPROCESS_LIMIT: u32 = 100;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/webhooks")
            .service(reprocess_pending)
            .service(receive_asaas),
    );
}

/// Asaas notification endpoint
///
/// POST /webhooks/asaas
#[post("/asaas")]
async fn receive_asaas(
    service: web::Data<Arc<WebhookService>>,
    request_id: RequestIdValue,
    req: HttpRequest,
    body: web::Bytes,
) -> Result<HttpResponse> {
    let token = req
        .headers()
        .get(WEBHOOK_TOKEN_HEADER)
        .and_then(|v| v.to_str().ok());
    service.verify_token(token)?;

    let outcome = service.ingest(&body).await?;
    tracing::debug!(
        request_id = %request_id.as_str(),
        event_id = %outcome.event_id,
        processed = outcome.processed,
        "Asaas notification acknowledged"
    );

    Ok(HttpResponse::Ok().json(json!({
        "received": true,
        "processed": outcome.processed,
        "eventId": outcome.event_id,
    })))
}

#[derive(Debug, Deserialize)]
struct ReprocessQuery {
    limit: Option<u32>,
}

/// Re-run unprocessed notifications
///
/// POST /webhooks/asaas/reprocess?limit=N
#[post("/asaas/reprocess")]
async fn reprocess_pending(
    service: web::Data<Arc<WebhookService>>,
    query: web::Query<ReprocessQuery>,
) -> Result<HttpResponse> {
    let limit = query.limit.unwrap_or(DEFAULT_REPROCESS_LIMIT).clamp(1, 1000);
    let report = service.reprocess_pending(limit).await?;

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "report": report,
    })))
}
