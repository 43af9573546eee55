//! Database layer for Cashdesk.
//!
//! This crate provides:
//! - `SeaORM` entity definitions
//! - Table-level queries in [`repositories`]
//! - [`PgStore`], the Postgres implementation of the ledger store traits
//! - Database migrations

pub mod entities;
pub mod migration;
pub mod repositories;
pub mod store;

pub use store::{PgStore, probe_atomicity};

use cashdesk_shared::config::DatabaseConfig;
use sea_orm::{ConnectOptions, Database, DatabaseConnection, DbErr};

/// Establishes a pooled connection to the database.
///
/// # Errors
///
/// Returns an error if the connection cannot be established.
pub async fn connect(config: &DatabaseConfig) -> Result<DatabaseConnection, DbErr> {
    let mut options = ConnectOptions::new(config.url.clone());
    options
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .sqlx_logging(false);
    Database::connect(options).await
}
