//! HTTP handlers
//!
//! Parameters arrive in the query string for every endpoint, including the
//! POSTs. Each handler validates first and only then touches the database.

use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    Json,
    extract::{Query, State},
    http::StatusCode,
};
use serde::Serialize;
use utoipa::ToSchema;

use super::state::AppState;
use super::types::{ApiError, ApiResult, StatusBody, created, ok};
use crate::account::validation::{parse_account_id, parse_boolean, parse_currency};
use crate::account::{Account, AccountRepository};

/// Missing keys read as empty and fail validation as `Missing`
fn param<'a>(params: &'a HashMap<String, String>, key: &str) -> &'a str {
    params.get(key).map(String::as_str).unwrap_or("")
}

/// Get an account
///
/// GET /account?id=1
#[utoipa::path(
    get,
    path = "/account",
    params(
        ("id" = i64, Query, description = "Account ID")
    ),
    responses(
        (status = 200, description = "Account details", body = Account),
        (status = 400, description = "Invalid id", body = StatusBody),
        (status = 404, description = "Account not found", body = StatusBody),
        (status = 500, description = "Internal error", body = StatusBody)
    ),
    tag = "Account"
)]
pub async fn account_get(
    State(state): State<Arc<AppState>>,
    Query(params): Query<HashMap<String, String>>,
) -> ApiResult<Account> {
    let id = parse_account_id(param(&params, "id"))?;

    match AccountRepository::get_by_id(state.db.pool(), id).await? {
        Some(account) => ok(account),
        None => Err(ApiError::not_found()),
    }
}

/// Create an account with a zero balance
///
/// POST /account?currency=USD&overdraft=true
#[utoipa::path(
    post,
    path = "/account",
    params(
        ("currency" = String, Query, description = "USD, EUR or RUB"),
        ("overdraft" = bool, Query, description = "Allow negative balance")
    ),
    responses(
        (status = 201, description = "Account created", body = Account),
        (status = 400, description = "Invalid arguments", body = StatusBody),
        (status = 500, description = "Internal error", body = StatusBody)
    ),
    tag = "Account"
)]
pub async fn account_post(
    State(state): State<Arc<AppState>>,
    Query(params): Query<HashMap<String, String>>,
) -> ApiResult<Account> {
    let currency = parse_currency(param(&params, "currency"))?;
    let overdraft = parse_boolean(param(&params, "overdraft"))?;

    let account = AccountRepository::create(state.db.pool(), currency, overdraft).await?;
    created(account)
}

/// Transfer funds between two accounts
///
/// POST /invoice?account_id_from=2&account_id_to=1&amount=10.05
///
/// The amount is in the source account's currency; the destination is
/// credited after conversion.
#[utoipa::path(
    post,
    path = "/invoice",
    params(
        ("account_id_from" = i64, Query, description = "Source account ID"),
        ("account_id_to" = i64, Query, description = "Destination account ID"),
        ("amount" = String, Query, description = "Positive amount, at most 2 decimals and 18 integer digits", example = "10.05")
    ),
    responses(
        (status = 201, description = "Transfer committed", body = StatusBody),
        (status = 400, description = "Invalid arguments", body = StatusBody),
        (status = 403, description = "Insufficient balance", body = StatusBody),
        (status = 404, description = "Accounts not found", body = StatusBody),
        (status = 409, description = "Lock conflict, retry", body = StatusBody),
        (status = 500, description = "Internal error", body = StatusBody)
    ),
    tag = "Invoice"
)]
pub async fn invoice_post(
    State(state): State<Arc<AppState>>,
    Query(params): Query<HashMap<String, String>>,
) -> ApiResult<StatusBody> {
    let receipt = state
        .engine
        .transfer(
            param(&params, "account_id_from"),
            param(&params, "account_id_to"),
            param(&params, "amount"),
        )
        .await?;

    created(StatusBody::success(receipt.invoice.id))
}

/// Health check response data
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    #[schema(example = "ok")]
    pub status: String,
    /// Server time, RFC 3339
    pub server_time: chrono::DateTime<chrono::Utc>,
}

/// Health check endpoint
///
/// Pings PostgreSQL. Failure details are logged, never returned.
#[utoipa::path(
    get,
    path = "/api/v1/health",
    responses(
        (status = 200, description = "Service healthy", body = HealthResponse),
        (status = 503, description = "Service unavailable", body = HealthResponse)
    ),
    tag = "System"
)]
pub async fn health_check(
    State(state): State<Arc<AppState>>,
) -> (StatusCode, Json<HealthResponse>) {
    let (code, status) = match state.db.health_check().await {
        Ok(()) => (StatusCode::OK, "ok"),
        Err(e) => {
            tracing::error!(error = %e, "[HEALTH] PostgreSQL ping failed");
            (StatusCode::SERVICE_UNAVAILABLE, "unavailable")
        }
    };

    (
        code,
        Json(HealthResponse {
            status: status.to_string(),
            server_time: chrono::Utc::now(),
        }),
    )
}
