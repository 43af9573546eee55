//! Role-specific "today" dashboard.

use axum::{Json, Router, extract::State, routing::get};

use cashdesk_core::dashboard::{Dashboard, DashboardFilter};

use crate::AppState;
use crate::error::ApiResult;
use crate::extractors::{ApiQuery, Caller};

/// Creates the dashboard routes.
pub fn routes() -> Router<AppState> {
    Router::new().route("/dashboard", get(get_dashboard))
}

/// GET `/dashboard` - Totals since local midnight for the caller's role.
///
/// Admins may narrow by `branchId`, `clientId`, `staffId`; staff by `branchId`.
async fn get_dashboard(
    State(state): State<AppState>,
    Caller(requester): Caller,
    ApiQuery(filter): ApiQuery<DashboardFilter>,
) -> ApiResult<Json<Dashboard>> {
    Ok(Json(state.dashboard.for_requester(requester, filter).await?))
}
