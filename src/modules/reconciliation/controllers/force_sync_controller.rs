use actix_web::{post, web, HttpResponse};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::core::Result;
use crate::modules::reconciliation::services::ForceSyncService;

/// Configure force-sync routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    // sync-all must be registered before the `{payment_id}` catch-all
    cfg.service(
        web::scope("/force-sync")
            .service(sync_all)
            .service(sync_payment),
    );
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SyncPaymentQuery {
    company_id: Option<String>,
}

/// Reconcile one charge from the gateway
///
/// POST /force-sync/{payment_id}?companyId=
#[post("/{payment_id}")]
async fn sync_payment(
    service: web::Data<Arc<ForceSyncService>>,
    path: web::Path<String>,
    query: web::Query<SyncPaymentQuery>,
) -> Result<HttpResponse> {
    let company_hint = query.company_id.as_deref().filter(|c| !c.is_empty());
    let result = service.sync_payment(&path.into_inner(), company_hint).await?;

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "result": result,
    })))
}

/// Backfill every gateway charge of a company
///
/// POST /force-sync/sync-all/{company_id}
#[post("/sync-all/{company_id}")]
async fn sync_all(
    service: web::Data<Arc<ForceSyncService>>,
    shutdown: web::Data<CancellationToken>,
    path: web::Path<String>,
) -> Result<HttpResponse> {
    let report = service
        .sync_all(&path.into_inner(), shutdown.child_token())
        .await?;

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "report": report,
    })))
}
