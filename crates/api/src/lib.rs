//! HTTP API layer with Axum routes.
//!
//! This crate provides:
//! - REST routes over the ledger, policy, dashboard, and summary services
//! - Caller identity extractors
//! - JSON error responses
//!
//! Authentication happens upstream. The gateway forwards the caller as
//! `x-party-id` / `x-party-role` headers.

pub mod error;
pub mod extractors;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use chrono_tz::Tz;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use cashdesk_core::audit::AuditQueue;
use cashdesk_core::clock::Clock;
use cashdesk_core::dashboard::DashboardService;
use cashdesk_core::ledger::{LedgerService, LedgerSettings, PolicyService};
use cashdesk_core::store::{LedgerStore, PolicyStore};

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    /// Transaction creation, reversal, and reads.
    pub ledger: Arc<LedgerService>,
    /// Commission policy.
    pub policy: Arc<PolicyService>,
    /// Today rollups.
    pub dashboard: Arc<DashboardService>,
    /// Backing store, for summary reads.
    pub store: Arc<dyn LedgerStore>,
}

impl AppState {
    /// Wires every service onto one store.
    pub fn new(
        store: Arc<dyn LedgerStore>,
        audit: AuditQueue,
        clock: Arc<dyn Clock>,
        settings: LedgerSettings,
        tz: Tz,
    ) -> Self {
        Self {
            ledger: Arc::new(LedgerService::new(
                Arc::clone(&store),
                audit.clone(),
                Arc::clone(&clock),
                settings,
            )),
            policy: Arc::new(PolicyService::new(Arc::clone(&store) as Arc<dyn PolicyStore>, audit, Arc::clone(&clock))),
            dashboard: Arc::new(DashboardService::new(Arc::clone(&store), clock, tz)),
            store,
        }
    }
}

/// Creates the main application router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .nest("/api/v1", routes::api_routes())
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}
