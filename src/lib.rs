//! Rentwise rental marketplace server
//!
//! A REST JSON API over the rental lifecycle of a peer-to-peer marketplace.
//! Listing, rental and return bookkeeping live here; matching, pricing,
//! trust scoring, damage scoring, payouts and engagement are delegated to
//! external agent programs that speak JSON over stdin/stdout.

use std::sync::Arc;

pub mod agents;
pub mod api;
pub mod config;
pub mod error;
pub mod models;
pub mod repository;
pub mod services;

pub use config::AppConfig;
pub use error::{AppError, AppResult};

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub services: Arc<services::Services>,
}
