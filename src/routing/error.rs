//! Request-boundary errors.
//!
//! Every failure in request handling ends up as one of these and is written
//! to the client as a JSON body `{"detail": "..."}`.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;

use crate::load_balancer::SelectionError;

#[derive(Debug, thiserror::Error)]
pub enum ProxyError {
    #[error("No healthy servers available.")]
    NoHealthyUpstream,

    #[error("All retries failed on all servers.")]
    RetriesExhausted { attempts: u32 },

    #[error("Server selection failed: {0}")]
    Selection(#[from] SelectionError),

    #[error("Request body exceeds {limit} bytes.")]
    BodyTooLarge { limit: usize },
}

impl ProxyError {
    pub fn status(&self) -> StatusCode {
        match self {
            ProxyError::NoHealthyUpstream => StatusCode::SERVICE_UNAVAILABLE,
            ProxyError::RetriesExhausted { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            ProxyError::Selection(SelectionError::ClientKeyRequired) => StatusCode::INTERNAL_SERVER_ERROR,
            ProxyError::Selection(_) => StatusCode::SERVICE_UNAVAILABLE,
            ProxyError::BodyTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
        }
    }
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        let body = serde_json::json!({ "detail": self.to_string() });
        (self.status(), Json(body)).into_response()
    }
}
