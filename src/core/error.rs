use actix_web::{error::ResponseError, http::StatusCode, HttpResponse};

/// Application-wide Result type
pub type Result<T> = std::result::Result<T, AppError>;

/// Main application error type
#[derive(thiserror::Error, Debug)]
pub enum AppError {
    /// Bad input, rejected before any external call
    #[error("Validation error: {0}")]
    Validation(String),

    /// Lookup matched nothing
    #[error("Not found: {0}")]
    NotFound(String),

    /// Webhook or operator credential mismatch
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Payment gateway answered with a structured failure
    #[error("Gateway error ({status}): {description}")]
    Gateway {
        status: u16,
        code: Option<String>,
        description: String,
    },

    /// Network failure or timeout talking to the gateway
    #[error("Gateway unavailable: {0}")]
    GatewayUnavailable(String),

    /// Local write failed after the external charge already exists
    #[error("Persistence error for charge {external_id}: {message}")]
    Persistence {
        external_id: String,
        message: String,
    },

    /// Database operation errors
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Internal server errors
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ResponseError for AppError {
    fn error_response(&self) -> HttpResponse {
        let mut body = serde_json::json!({
            "success": false,
            "error": self.public_message(),
            "code": self.code(),
        });

        if let AppError::Persistence { external_id, .. } = self {
            body["asaas_payment_id"] = serde_json::Value::String(external_id.clone());
        }

        HttpResponse::build(self.status_code()).json(body)
    }

    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Gateway { .. } => StatusCode::BAD_GATEWAY,
            AppError::GatewayUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Persistence { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Configuration(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Json(_) => StatusCode::BAD_REQUEST,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

// Helper functions for common error scenarios
impl AppError {
    pub fn validation(msg: impl Into<String>) -> Self {
        AppError::Validation(msg.into())
    }

    pub fn not_found(resource: impl Into<String>) -> Self {
        AppError::NotFound(resource.into())
    }

    pub fn unauthorized(msg: impl Into<String>) -> Self {
        AppError::Unauthorized(msg.into())
    }

    pub fn unavailable(msg: impl Into<String>) -> Self {
        AppError::GatewayUnavailable(msg.into())
    }

    pub fn configuration(msg: impl Into<String>) -> Self {
        AppError::Configuration(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        AppError::Internal(msg.into())
    }

    /// Wrap a store failure that happened after the gateway accepted a charge.
    pub fn persistence(external_id: impl Into<String>, source: &AppError) -> Self {
        AppError::Persistence {
            external_id: external_id.into(),
            message: source.to_string(),
        }
    }

    /// Stable machine-readable code for API clients
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Validation(_) => "VALIDATION_ERROR",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::Unauthorized(_) => "UNAUTHORIZED",
            AppError::Gateway { .. } => "GATEWAY_ERROR",
            AppError::GatewayUnavailable(_) => "GATEWAY_UNAVAILABLE",
            AppError::Persistence { .. } => "PERSISTENCE_ERROR",
            AppError::Database(_) => "DATABASE_ERROR",
            AppError::Configuration(_) => "CONFIGURATION_ERROR",
            AppError::Json(_) => "INVALID_JSON",
            AppError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Whether a read-only gateway call failing with this error may be retried.
    pub fn is_retryable(&self) -> bool {
        match self {
            AppError::GatewayUnavailable(_) => true,
            AppError::Gateway { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }

    fn public_message(&self) -> String {
        match self {
            // The gateway's own wording is what operators act on
            AppError::Gateway { description, .. } => description.clone(),
            AppError::Database(_) => "Database operation failed".to_string(),
            other => other.to_string(),
        }
    }
}
