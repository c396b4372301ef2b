// Library exports for the API server and the family-tree tool
pub mod config;
pub mod db;
pub mod error;
pub mod family;
pub mod ledger;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;

use std::sync::Arc;

use config::Config;
use services::{email::EmailService, storage::MediaStorage};

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub db: sqlx::PgPool,
    pub redis: redis::aio::MultiplexedConnection,
    pub config: Arc<Config>,
    pub storage: MediaStorage,
    pub email: Option<Arc<EmailService>>,
}
