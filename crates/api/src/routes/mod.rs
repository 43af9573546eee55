//! API route definitions.

use axum::Router;

use crate::AppState;

pub mod dashboard;
pub mod health;
pub mod settings;
pub mod summaries;
pub mod transactions;

/// Creates the API router with all routes.
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .merge(health::routes())
        .merge(transactions::routes())
        .merge(settings::routes())
        .merge(dashboard::routes())
        .merge(summaries::routes())
}
