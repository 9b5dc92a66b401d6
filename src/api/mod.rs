//! Dashboard HTTP + WebSocket surface
//!
//! A small axum app: two JSON endpoints for status and trade history, and
//! a WebSocket that streams the engine's log events to every connected
//! dashboard and accepts the runtime commands (`start`, `stop`,
//! `update_trade_amount`).

pub mod handlers;
pub mod websocket;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use axum::{routing::get, Router};
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

use crate::binance::BinanceClient;
use crate::engine::BotEngine;
use crate::events::EventSink;
use crate::ledger::TradeLedger;

/// Shared application state for API handlers
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<BotEngine>,
    pub client: Arc<BinanceClient>,
    pub ledger: TradeLedger,
    pub events: EventSink,
}

pub fn create_router(state: AppState) -> Router {
    // the dashboard is served from elsewhere; let it talk to us
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/status", get(handlers::get_status))
        .route("/api/trades", get(handlers::get_trades))
        .route("/ws", get(websocket::websocket_handler))
        .with_state(state)
        .layer(cors)
}

/// Bind and serve the dashboard API until the process exits.
pub async fn serve(state: AppState, port: u16) -> Result<()> {
    let app = create_router(state);
    let addr = SocketAddr::from(([0, 0, 0, 0], port));

    info!("Dashboard API listening on http://{}", addr);

    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
