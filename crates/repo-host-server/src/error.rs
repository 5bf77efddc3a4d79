//! HTTP error mapping.

use axum::extract::rejection::{BytesRejection, JsonRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use repo_host_core::{ErrorKind, GatewayError};
use serde_json::json;

#[derive(Debug)]
pub enum AppError {
    Gateway(GatewayError),
    /// The request could not be decoded into parameters.
    Rejected { status: StatusCode, message: String },
}

impl From<GatewayError> for AppError {
    fn from(e: GatewayError) -> Self {
        Self::Gateway(e)
    }
}

impl From<JsonRejection> for AppError {
    fn from(r: JsonRejection) -> Self {
        Self::Rejected {
            status: StatusCode::BAD_REQUEST,
            message: r.body_text(),
        }
    }
}

impl From<QueryRejection> for AppError {
    fn from(r: QueryRejection) -> Self {
        Self::Rejected {
            status: StatusCode::BAD_REQUEST,
            message: r.body_text(),
        }
    }
}

impl From<BytesRejection> for AppError {
    fn from(r: BytesRejection) -> Self {
        // Keeps 413 for oversized uploads.
        Self::Rejected {
            status: r.status(),
            message: r.body_text(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, kind, message) = match self {
            Self::Gateway(e) => {
                let kind = e.kind();
                let status =
                    StatusCode::from_u16(e.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
                if kind == ErrorKind::Collaborator {
                    tracing::error!(error = %e, "request failed");
                } else {
                    tracing::debug!(error = %e, status = status.as_u16(), "request refused");
                }
                (status, kind, e.to_string())
            }
            Self::Rejected { status, message } => {
                tracing::debug!(%message, status = status.as_u16(), "request rejected");
                (status, ErrorKind::Validation, message)
            }
        };

        (
            status,
            Json(json!({ "error": kind.as_str(), "message": message })),
        )
            .into_response()
    }
}
