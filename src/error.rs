use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

/// Unified error type for the glassfeed service.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    // ── Session Errors ──────────────────────────────────────────────────
    #[error("Invalid state parameter")]
    InvalidState,

    // ── Request Errors ──────────────────────────────────────────────────
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("{0} not found")]
    NotFound(String),

    #[error("Invalid source id: {0}")]
    InvalidSourceId(String),

    // ── Remote API Errors ───────────────────────────────────────────────
    #[error("{service} API returned {status}: {message}")]
    Upstream {
        service: &'static str,
        status: u16,
        message: String,
    },

    #[error("{service} API request failed: {message}")]
    Transport {
        service: &'static str,
        message: String,
    },

    #[error("OAuth flow error: {0}")]
    FlowError(String),

    #[error("Token refresh failed: {0}")]
    RefreshFailed(String),

    // ── Internal ────────────────────────────────────────────────────────
    #[error("Crypto error: {0}")]
    CryptoError(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// True when a remote API answered 404.
    pub fn is_not_found(&self) -> bool {
        matches!(self, AppError::Upstream { status: 404, .. })
    }
}

impl From<sqlx::Error> for AppError {
    fn from(e: sqlx::Error) -> Self {
        tracing::error!("Database error: {e}");
        AppError::Database(e.to_string())
    }
}

impl From<anyhow::Error> for AppError {
    fn from(e: anyhow::Error) -> Self {
        AppError::Internal(e.to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = match &self {
            AppError::InvalidState => (StatusCode::BAD_REQUEST, "invalid_state"),
            AppError::BadRequest(_) => (StatusCode::BAD_REQUEST, "bad_request"),
            AppError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
            AppError::InvalidSourceId(_) => (StatusCode::BAD_REQUEST, "invalid_source_id"),
            AppError::Upstream { .. } => (StatusCode::BAD_GATEWAY, "upstream_error"),
            AppError::Transport { .. } => (StatusCode::BAD_GATEWAY, "upstream_unreachable"),
            AppError::FlowError(_) => (StatusCode::BAD_GATEWAY, "flow_error"),
            AppError::RefreshFailed(_) => (StatusCode::BAD_GATEWAY, "refresh_failed"),
            AppError::CryptoError(_) => (StatusCode::INTERNAL_SERVER_ERROR, "crypto_error"),
            AppError::Database(_) => (StatusCode::INTERNAL_SERVER_ERROR, "database_error"),
            AppError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
        };

        let body = json!({
            "error": {
                "code": code,
                "message": self.to_string(),
            }
        });

        (status, axum::Json(body)).into_response()
    }
}

/// Turn a non-2xx response into [`AppError::Upstream`], keeping the body as message.
pub(crate) async fn check_status(
    service: &'static str,
    resp: reqwest::Response,
) -> Result<reqwest::Response, AppError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let message = resp.text().await.unwrap_or_default();
    Err(AppError::Upstream {
        service,
        status: status.as_u16(),
        message,
    })
}

/// Map a reqwest transport error for the given service.
pub(crate) fn transport(service: &'static str) -> impl Fn(reqwest::Error) -> AppError {
    move |e| AppError::Transport {
        service,
        message: e.to_string(),
    }
}
