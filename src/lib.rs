//! Simple Billing - multi-currency accounts and atomic fund transfers
//!
//! Accounts hold a balance in one of three currencies. An invoice records one
//! committed transfer between two accounts; the transfer engine converts the
//! amount into the destination currency and writes both balances and the
//! invoice in a single transaction.
//!
//! # Modules
//!
//! - [`core_types`] - Account/invoice ids and the [`Currency`] enumeration
//! - [`money`] - Fixed-point [`Money`] (2 decimals, half-up rounding)
//! - [`exchange`] - Validated 3x3 conversion table
//! - [`account`] - Models, input validation, read/create repository
//! - [`transfer`] - Lock-ordered transfer engine and the account store seam
//! - [`db`] - PostgreSQL pool and schema bootstrap
//! - [`gateway`] - axum HTTP layer and OpenAPI document
//! - [`config`] / [`logging`] - YAML configuration and tracing setup

// Core types - must be first!
pub mod core_types;
pub mod money;

pub mod account;
pub mod config;
pub mod db;
pub mod exchange;
pub mod gateway;
pub mod logging;
pub mod transfer;

// Convenient re-exports at crate root
pub use account::{Account, Invoice, TransferRequest, ValidationError};
pub use core_types::{AccountId, Currency, InvoiceId};
pub use exchange::{ExchangeError, ExchangeTable};
pub use money::{Money, MoneyError};
pub use transfer::{TransferEngine, TransferError, TransferReceipt, TransferState};
