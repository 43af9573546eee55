//! Commission policy routes (admin only).

use axum::{Json, Router, extract::State, routing::get};

use cashdesk_core::ledger::{PolicyUpdate, RatePolicy};

use crate::AppState;
use crate::error::ApiResult;
use crate::extractors::{ApiJson, Caller, ClientMeta};

/// Creates the settings routes.
pub fn routes() -> Router<AppState> {
    Router::new().route("/settings", get(get_settings).put(update_settings))
}

/// GET `/settings` - Current commission policy.
async fn get_settings(State(state): State<AppState>, Caller(requester): Caller) -> ApiResult<Json<RatePolicy>> {
    Ok(Json(state.policy.get_policy(requester).await?))
}

/// PUT `/settings` - Change one or both rates.
async fn update_settings(
    State(state): State<AppState>,
    Caller(requester): Caller,
    ClientMeta(meta): ClientMeta,
    ApiJson(update): ApiJson<PolicyUpdate>,
) -> ApiResult<Json<RatePolicy>> {
    Ok(Json(state.policy.update_policy(update, requester, meta).await?))
}
