//! Account management module
//!
//! Account/invoice models, request validation and the read/create repository.

pub mod models;
pub mod repository;
pub mod validation;

// Re-export commonly used types
pub use models::{Account, Invoice, NewInvoice};
pub use repository::{AccountRepository, InvoiceRepository};
pub use validation::{TransferRequest, ValidationError};

// Re-export Database from top-level db module
pub use crate::db::Database;
