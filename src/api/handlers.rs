//! JSON endpoints for the dashboard

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use serde_json::json;
use tracing::warn;

use super::AppState;

/// `GET /api/status`: run state, gateway connectivity, balances, and the
/// strategy currently selected per symbol.
pub async fn get_status(State(state): State<AppState>) -> Json<serde_json::Value> {
    let connected = state.client.ping().await;

    let balances = match state.client.get_balances().await {
        Ok(b) => b,
        Err(e) => {
            warn!("Balance query failed: {:#}", e);
            Default::default()
        }
    };

    Json(json!({
        "status": if state.engine.is_running() { "running" } else { "stopped" },
        "binance_api_connected": connected,
        "wallet_balances": balances,
        "current_strategies": state.engine.active_strategies(),
    }))
}

#[derive(Debug, Deserialize)]
pub struct TradesQuery {
    pub limit: Option<u32>,
}

/// `GET /api/trades?limit=N`: most recent trade records, newest first.
pub async fn get_trades(
    State(state): State<AppState>,
    Query(query): Query<TradesQuery>,
) -> Result<Json<serde_json::Value>, StatusCode> {
    let limit = query.limit.unwrap_or(50);

    let trades = state.ledger.recent(limit).map_err(|e| {
        warn!("Trade history query failed: {}", e);
        StatusCode::INTERNAL_SERVER_ERROR
    })?;

    Ok(Json(json!(trades)))
}
