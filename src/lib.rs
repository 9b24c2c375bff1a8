//! Bookkeep library management
//!
//! Librarians track books, patrons and loans (checkouts and returns) through
//! form-driven pages: filtered, searchable, paginated listings plus validated
//! create and update forms.

use std::sync::Arc;

pub mod api;
pub mod config;
pub mod error;
pub mod models;
pub mod pagination;
pub mod query;
pub mod repository;
pub mod services;
pub mod validation;
pub mod views;

pub use config::AppConfig;
pub use error::{AppError, AppResult};

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub services: Arc<services::Services>,
}

impl AppState {
    /// Build the state over an already opened store
    pub fn new(
        config: AppConfig,
        store: repository::SharedStore,
        clock: Arc<dyn services::Clock>,
    ) -> Self {
        let services = services::Services::new(store, config.library, clock);
        Self {
            config: Arc::new(config),
            services: Arc::new(services),
        }
    }
}
