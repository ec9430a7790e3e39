//! Library lending engine
//!
//! Books, members and loans with enforced inventory and loan invariants,
//! exposed through a REST JSON API and a named-tool adapter.

use std::sync::Arc;

pub mod api;
pub mod clock;
pub mod config;
pub mod error;
pub mod models;
pub mod repository;
pub mod services;
pub mod tools;

pub use config::AppConfig;
pub use error::{AppError, AppResult};
pub use services::LendingEngine;

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub engine: Arc<LendingEngine>,
}
