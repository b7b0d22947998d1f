//! OpenAPI / Swagger UI Documentation
//!
//! - Swagger UI: `http://localhost:8080/docs`
//! - OpenAPI JSON: `http://localhost:8080/api-docs/openapi.json`

use utoipa::OpenApi;

use crate::account::{Account, Invoice};
use crate::core_types::Currency;
use crate::gateway::handlers::HealthResponse;
use crate::gateway::types::StatusBody;

/// Main API Documentation struct
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Simple Billing API",
        version = "1.0.0",
        description = "Multi-currency accounts and atomic fund transfers."
    ),
    servers(
        (url = "http://localhost:8080", description = "Development"),
    ),
    paths(
        crate::gateway::handlers::health_check,
        crate::gateway::handlers::account_get,
        crate::gateway::handlers::account_post,
        crate::gateway::handlers::invoice_post,
    ),
    components(
        schemas(HealthResponse, Account, Invoice, Currency, StatusBody)
    ),
    tags(
        (name = "System", description = "Service health"),
        (name = "Account", description = "Account read and creation"),
        (name = "Invoice", description = "Fund transfers")
    )
)]
pub struct ApiDoc;
