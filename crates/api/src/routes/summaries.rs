//! Daily summary reads (admin only).

use axum::{Json, Router, extract::State, routing::get};
use chrono::NaiveDate;

use cashdesk_core::aggregation::DailySummary;
use cashdesk_core::ledger::{LedgerError, PartyRole};
use cashdesk_core::store::SummaryStore;

use crate::AppState;
use crate::error::ApiResult;
use crate::extractors::{ApiPath, Caller};

/// Creates the daily summary routes.
pub fn routes() -> Router<AppState> {
    Router::new().route("/daily-summaries/{date}", get(list_daily_summaries))
}

/// GET `/daily-summaries/{date}` - Rows the aggregator wrote for a local day.
async fn list_daily_summaries(
    State(state): State<AppState>,
    Caller(requester): Caller,
    ApiPath(date): ApiPath<NaiveDate>,
) -> ApiResult<Json<Vec<DailySummary>>> {
    if requester.role != PartyRole::Admin {
        return Err(LedgerError::Forbidden("admin role required".to_string()).into());
    }
    let rows = state
        .store
        .list_daily_summaries(date)
        .await
        .map_err(LedgerError::from)?;
    Ok(Json(rows))
}
