//! API response types
//!
//! Transfer outcomes use a flat `{status, invoice_id?, reason?}` body where
//! `status` is `success`, `failed` or `rejection`. Account reads return the
//! account itself on success.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use utoipa::ToSchema;

use crate::account::ValidationError;
use crate::core_types::InvoiceId;
use crate::transfer::TransferError;

/// Reason shown to callers for any 500
pub const INTERNAL_REASON: &str = "internal server error";

/// Reason for a missing account on `GET /account`
pub const NOT_FOUND_REASON: &str = "Not found.";

/// Outcome body for invoices and failures
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct StatusBody {
    /// `success`, `failed` or `rejection`
    #[schema(example = "success")]
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(example = 1)]
    pub invoice_id: Option<InvoiceId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl StatusBody {
    pub fn success(invoice_id: InvoiceId) -> Self {
        Self {
            status: "success".to_string(),
            invoice_id: Some(invoice_id),
            reason: None,
        }
    }

    pub fn failed(reason: impl Into<String>) -> Self {
        Self {
            status: "failed".to_string(),
            invoice_id: None,
            reason: Some(reason.into()),
        }
    }

    pub fn rejection(reason: impl Into<String>) -> Self {
        Self {
            status: "rejection".to_string(),
            invoice_id: None,
            reason: Some(reason.into()),
        }
    }
}

/// Error half of every handler result
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub body: StatusBody,
}

impl ApiError {
    pub fn bad_request(reason: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            body: StatusBody::failed(reason),
        }
    }

    pub fn not_found() -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            body: StatusBody::failed(NOT_FOUND_REASON),
        }
    }

    /// Log the cause, return an opaque 500
    pub fn internal(cause: impl std::fmt::Display) -> Self {
        tracing::error!(error = %cause, "Request failed with internal error");
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            body: StatusBody::failed(INTERNAL_REASON),
        }
    }
}

impl From<ValidationError> for ApiError {
    fn from(e: ValidationError) -> Self {
        Self::bad_request(e.to_string())
    }
}

impl From<sqlx::Error> for ApiError {
    fn from(e: sqlx::Error) -> Self {
        Self::internal(e)
    }
}

impl From<TransferError> for ApiError {
    fn from(e: TransferError) -> Self {
        let status =
            StatusCode::from_u16(e.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let body = if e.is_rejection() {
            StatusBody::rejection(e.public_reason())
        } else {
            StatusBody::failed(e.public_reason())
        };
        Self { status, body }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

/// Handler result: status code plus JSON payload, or an [`ApiError`]
pub type ApiResult<T> = Result<(StatusCode, Json<T>), ApiError>;

/// 200 with payload
pub fn ok<T>(data: T) -> ApiResult<T> {
    Ok((StatusCode::OK, Json(data)))
}

/// 201 with payload
pub fn created<T>(data: T) -> ApiResult<T> {
    Ok((StatusCode::CREATED, Json(data)))
}
