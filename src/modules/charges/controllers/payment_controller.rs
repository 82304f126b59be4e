use actix_web::{get, post, web, HttpResponse};
use serde_json::json;
use std::sync::Arc;

use crate::core::Result;
use crate::modules::charges::models::{CreateServiceOrderRequest, ManualPaymentRequest};
use crate::modules::charges::services::ChargeService;

/// Configure payment routes
///
/// # Arguments
/// * `cfg` - Service configuration
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/payments")
            .service(create_service_order)
            .service(list_company_charges)
            .service(get_charge)
            .service(record_manual_payment),
    );
}

/// Create a PIX charge for a ticket-dispute service
///
/// POST /payments/create-service-order
#[post("/create-service-order")]
async fn create_service_order(
    service: web::Data<Arc<ChargeService>>,
    body: web::Json<CreateServiceOrderRequest>,
) -> Result<HttpResponse> {
    let descriptor = service.create_service_order(body.into_inner()).await?;

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "payment": descriptor,
    })))
}

/// List a company's charges, newest first
///
/// GET /payments/company/{company_id}
#[get("/company/{company_id}")]
async fn list_company_charges(
    service: web::Data<Arc<ChargeService>>,
    path: web::Path<String>,
) -> Result<HttpResponse> {
    let charges = service.list_company_charges(&path.into_inner()).await?;

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "total": charges.len(),
        "payments": charges,
    })))
}

/// Fetch one charge by external or local id
///
/// GET /payments/{id}
#[get("/{id}")]
async fn get_charge(
    service: web::Data<Arc<ChargeService>>,
    path: web::Path<String>,
) -> Result<HttpResponse> {
    let charge = service.get_charge(&path.into_inner()).await?;

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "payment": charge,
    })))
}

/// Record a manual (cash) settlement
///
/// POST /payments/{id}/manual-payment
#[post("/{id}/manual-payment")]
async fn record_manual_payment(
    service: web::Data<Arc<ChargeService>>,
    path: web::Path<String>,
    body: Option<web::Json<ManualPaymentRequest>>,
) -> Result<HttpResponse> {
    let request = body.map(|b| b.into_inner()).unwrap_or_default();
    let charge = service
        .record_manual_payment(&path.into_inner(), request)
        .await?;

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "payment": charge,
    })))
}
