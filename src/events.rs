//! Realtime event fan-out
//!
//! Every log/status event the engine produces is pushed into a bounded
//! broadcast channel; each connected dashboard holds its own receiver.
//! Delivery is best-effort: a receiver that falls behind drops messages,
//! and a send with no receivers is not an error. Every published event is
//! also emitted through `tracing` at the matching level so the process
//! log stays complete without any subscriber.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::{error, info, warn};

/// Buffered events per subscriber before the oldest are dropped
const EVENT_BUFFER: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventLevel {
    Info,
    Success,
    Warning,
    Error,
}

/// Wire shape consumed by the dashboard: `{"type": "...", "msg": "..."}`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEvent {
    #[serde(rename = "type")]
    pub level: EventLevel,
    pub msg: String,
}

/// Publish half of the fan-out. Cheap to clone.
#[derive(Debug, Clone)]
pub struct EventSink {
    tx: broadcast::Sender<LogEvent>,
}

impl EventSink {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(EVENT_BUFFER);
        EventSink { tx }
    }

    /// New receiver for a connecting observer.
    pub fn subscribe(&self) -> broadcast::Receiver<LogEvent> {
        self.tx.subscribe()
    }

    /// Publish an event to all observers, best-effort.
    pub fn publish(&self, level: EventLevel, msg: impl Into<String>) {
        let msg = msg.into();
        match level {
            EventLevel::Info | EventLevel::Success => info!("{}", msg),
            EventLevel::Warning => warn!("{}", msg),
            EventLevel::Error => error!("{}", msg),
        }

        // no receivers is fine; nobody may be watching
        let _ = self.tx.send(LogEvent { level, msg });
    }

    pub fn info(&self, msg: impl Into<String>) {
        self.publish(EventLevel::Info, msg);
    }

    pub fn success(&self, msg: impl Into<String>) {
        self.publish(EventLevel::Success, msg);
    }

    pub fn warning(&self, msg: impl Into<String>) {
        self.publish(EventLevel::Warning, msg);
    }

    pub fn error(&self, msg: impl Into<String>) {
        self.publish(EventLevel::Error, msg);
    }
}

impl Default for EventSink {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_subscribers_receive_published_events() {
        let sink = EventSink::new();
        let mut rx = sink.subscribe();

        sink.success("order filled");

        let event = rx.recv().await.unwrap();
        assert_eq!(event.level, EventLevel::Success);
        assert_eq!(event.msg, "order filled");
    }

    #[test]
    fn test_publish_without_subscribers_is_not_an_error() {
        let sink = EventSink::new();
        sink.error("nobody listening");
    }

    #[test]
    fn test_wire_shape() {
        let event = LogEvent {
            level: EventLevel::Warning,
            msg: "low balance".to_string(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "warning");
        assert_eq!(json["msg"], "low balance");
    }
}
