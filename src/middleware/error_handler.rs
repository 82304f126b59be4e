use actix_web::{error::JsonPayloadError, error::QueryPayloadError, web, HttpRequest};

use crate::core::AppError;

/// Body limit for JSON payloads (webhook payloads included)
const JSON_LIMIT: usize = 256 * 1024;

/// JSON extractor config producing the standard error body on bad input
pub fn json_config() -> web::JsonConfig {
    web::JsonConfig::default()
        .limit(JSON_LIMIT)
        .error_handler(json_error_handler)
}

/// Query extractor config producing the standard error body on bad input
pub fn query_config() -> web::QueryConfig {
    web::QueryConfig::default().error_handler(query_error_handler)
}

pub fn json_error_handler(err: JsonPayloadError, req: &HttpRequest) -> actix_web::Error {
    log_error(req, &err.to_string());
    AppError::validation(format!("Invalid JSON body: {}", err)).into()
}

pub fn query_error_handler(err: QueryPayloadError, req: &HttpRequest) -> actix_web::Error {
    log_error(req, &err.to_string());
    AppError::validation(format!("Invalid query string: {}", err)).into()
}

/// Log a rejected request at warn level
pub fn log_error(req: &HttpRequest, message: &str) {
    tracing::warn!(
        method = %req.method(),
        path = %req.path(),
        error = %message,
        "Request rejected"
    );
}
