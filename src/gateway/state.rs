use std::sync::Arc;

use crate::account::Database;
use crate::transfer::TransferEngine;

/// Shared gateway state
#[derive(Clone)]
pub struct AppState {
    /// PostgreSQL pool for account reads/creates and health checks
    pub db: Arc<Database>,
    /// Transfer engine behind `POST /invoice`
    pub engine: Arc<TransferEngine>,
}

impl AppState {
    pub fn new(db: Arc<Database>, engine: Arc<TransferEngine>) -> Self {
        Self { db, engine }
    }
}
