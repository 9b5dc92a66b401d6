//! Dashboard WebSocket: event stream out, commands in
//!
//! Each connection gets its own broadcast receiver; a client that stops
//! reading only loses its own backlog. Inbound messages are JSON commands
//! of the shape `{"command": "...", "value": ...}`.

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use futures_util::{sink::SinkExt, stream::StreamExt};
use serde::Deserialize;
use tracing::{debug, info};

use super::AppState;

#[derive(Debug, Deserialize)]
struct Command {
    command: String,
    #[serde(default)]
    value: Option<f64>,
}

pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: AppState) {
    let (mut sender, mut receiver) = socket.split();

    let mut rx = state.events.subscribe();

    // forward broadcast events to this client until it goes away
    let send_task = tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(event) => {
                    let json = match serde_json::to_string(&event) {
                        Ok(json) => json,
                        Err(e) => {
                            debug!("Failed to serialize event: {}", e);
                            continue;
                        }
                    };
                    if sender.send(Message::Text(json)).await.is_err() {
                        break;
                    }
                }
                // this receiver fell behind and lost events; keep going
                Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped)) => {
                    debug!("WebSocket client lagged, dropped {} events", skipped);
                }
                Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
            }
        }
    });

    while let Some(Ok(msg)) = receiver.next().await {
        match msg {
            Message::Text(text) => handle_command(&text, &state),
            Message::Close(_) => break,
            _ => {}
        }
    }

    send_task.abort();
    info!("Dashboard WebSocket connection closed");
}

fn handle_command(text: &str, state: &AppState) {
    let command: Command = match serde_json::from_str(text) {
        Ok(c) => c,
        Err(_) => {
            state.events.error("Malformed dashboard command.");
            return;
        }
    };

    match command.command.as_str() {
        "start" => {
            if state.engine.clone().start() {
                state.events.success("Bot started by user.");
            }
        }
        "stop" => {
            state.engine.stop();
            state.events.warning("Bot stopped by user.");
        }
        "update_trade_amount" => match command.value {
            Some(value) => {
                // validation (and its error event) happens in the engine
                state.engine.set_trade_amount(value);
            }
            None => state
                .events
                .error("update_trade_amount requires a numeric value."),
        },
        other => {
            state
                .events
                .error(format!("Unknown dashboard command: {}", other));
        }
    }
}
