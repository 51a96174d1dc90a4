//! Relay API - `GET /fetch?url=` forwarding for browser clients

use std::collections::HashMap;

use axum::{
    extract::{Query, State},
    response::IntoResponse,
    routing::get,
    Router,
};

use super::AppState;
use crate::relay::preflight;

/// Build the relay router
pub fn router() -> Router<AppState> {
    Router::new().route("/fetch", get(fetch).options(fetch_preflight))
}

/// GET /fetch?url=<target>
async fn fetch(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> impl IntoResponse {
    state.relay.handle(params.get("url").map(String::as_str)).await
}

/// OPTIONS /fetch
async fn fetch_preflight() -> impl IntoResponse {
    preflight()
}
