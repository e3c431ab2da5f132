//! Approval Desk: two-level approval workflow for real-estate change requests.
//!
//! Requesters submit a change request, Manager Level 1 and then Manager
//! Level 2 approve or reject it, and a read-only viewer can audit everything.

pub mod api;
pub mod cli;
pub mod config;
pub mod errors;
pub mod middleware;
pub mod models;
pub mod store;
pub mod validation;
pub mod workflow;

use store::sqlite::SqliteStore;

/// Shared application state passed to handlers and extractors.
pub struct AppState {
    pub db: SqliteStore,
    pub config: config::Config,
}
