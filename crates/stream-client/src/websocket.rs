use futures_util::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, Notify};
use tokio_tungstenite::{
    connect_async,
    tungstenite::protocol::{frame::coding::CloseCode, CloseFrame},
    tungstenite::Message,
};

use matching_core::{FeedError, Opportunity};

const RECONNECT_BASE_MS: u64 = 1000;
const RECONNECT_CAP_MS: u64 = 30_000;

/// Inbound message envelope, discriminated by the `type` field.
///
/// Unknown tags are rejected by the decoder and handled explicitly at the
/// boundary rather than falling through.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamMessage {
    ConnectionEstablished {
        #[serde(default)]
        message: Option<String>,
        #[serde(default)]
        timestamp: String,
    },
    NewOpportunity {
        #[serde(default)]
        opportunity: Option<Opportunity>,
        #[serde(default)]
        timestamp: String,
    },
    Heartbeat {
        #[serde(default)]
        timestamp: String,
    },
    Pong {
        #[serde(default)]
        timestamp: String,
    },
}

/// Why a frame was dropped at the decode boundary
#[derive(Debug)]
enum DecodeFailure {
    /// Valid JSON with a tag the protocol does not define
    UnknownType(String),
    /// Not JSON at all, or a known tag with an unusable body
    Malformed(String),
}

fn decode_message(text: &str) -> Result<StreamMessage, DecodeFailure> {
    let value: serde_json::Value = serde_json::from_str(text)
        .map_err(|e| DecodeFailure::Malformed(e.to_string()))?;

    match serde_json::from_value::<StreamMessage>(value.clone()) {
        Ok(message) => Ok(message),
        Err(e) => {
            let tag = value
                .get("type")
                .and_then(|t| t.as_str())
                .unwrap_or("<missing>");
            if matches!(
                value.get("type").and_then(|t| t.as_str()),
                Some("connection_established" | "new_opportunity" | "heartbeat" | "pong")
            ) {
                Err(DecodeFailure::Malformed(e.to_string()))
            } else {
                Err(DecodeFailure::UnknownType(tag.to_string()))
            }
        }
    }
}

/// Events emitted to the caller-supplied sink
#[derive(Debug, Clone)]
pub enum StreamEvent {
    /// Server confirmed the session
    Connected,
    /// A decoded `new_opportunity` payload
    Arrived(Opportunity),
    /// Reconnect attempts exhausted; manual retry required
    ConnectionLost,
}

#[derive(Debug, Clone)]
pub struct StreamConfig {
    /// WebSocket endpoint, e.g. "wss://api.example.com/ws/opportunities"
    pub url: String,
    /// Bearer token appended as a query parameter
    pub token: String,
    pub ping_interval: Duration,
    pub max_reconnect_attempts: u32,
}

impl StreamConfig {
    pub fn new(url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            token: token.into(),
            ping_interval: Duration::from_secs(25),
            max_reconnect_attempts: 5,
        }
    }
}

/// Exponential backoff for the nth consecutive failure, capped at 30s
fn reconnect_delay(attempt: u32) -> Duration {
    let ms = RECONNECT_BASE_MS
        .saturating_mul(2u64.saturating_pow(attempt))
        .min(RECONNECT_CAP_MS);
    Duration::from_millis(ms)
}

/// Live opportunity stream with reconnection.
///
/// One instance per authenticated session. `run()` drives the connection
/// until a caller shutdown, a server-side normal close, or reconnect
/// exhaustion; decoded events go out over the broadcast sink. To rotate the
/// token, shut the session down and connect a new one.
pub struct OpportunityStream {
    config: StreamConfig,
    tx: broadcast::Sender<StreamEvent>,
    shutdown: Arc<Notify>,
}

impl OpportunityStream {
    pub fn new(config: StreamConfig) -> (Self, broadcast::Receiver<StreamEvent>) {
        let (tx, rx) = broadcast::channel(1024);
        let stream = Self {
            config,
            tx,
            shutdown: Arc::new(Notify::new()),
        };
        (stream, rx)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StreamEvent> {
        self.tx.subscribe()
    }

    /// Request a caller-initiated close; never triggers reconnection
    pub fn shutdown(&self) {
        self.shutdown.notify_one();
    }

    pub async fn run(&self) {
        let mut attempt: u32 = 0;
        loop {
            match self.connect_and_stream(&mut attempt).await {
                Ok(()) => {
                    tracing::info!("Opportunity stream closed gracefully");
                    return;
                }
                Err(e) => {
                    if attempt >= self.config.max_reconnect_attempts {
                        tracing::warn!(
                            "Opportunity stream lost after {} reconnect attempts: {}",
                            attempt,
                            e
                        );
                        let _ = self.tx.send(StreamEvent::ConnectionLost);
                        return;
                    }

                    let delay = reconnect_delay(attempt);
                    attempt += 1;
                    tracing::warn!(
                        "Opportunity stream error: {}, reconnecting in {}ms (attempt {})",
                        e,
                        delay.as_millis(),
                        attempt
                    );
                    tokio::select! {
                        _ = tokio::time::sleep(delay) => {}
                        _ = self.shutdown.notified() => {
                            tracing::info!("Opportunity stream shutdown requested");
                            return;
                        }
                    }
                }
            }
        }
    }

    async fn connect_and_stream(&self, attempt: &mut u32) -> Result<(), FeedError> {
        let url = format!("{}?token={}", self.config.url, self.config.token);
        let (ws_stream, _) = connect_async(url.as_str())
            .await
            .map_err(|e| FeedError::Connection(e.to_string()))?;
        let (mut write, mut read) = ws_stream.split();
        tracing::info!("Connected to opportunity stream");
        *attempt = 0;

        let mut keepalive = tokio::time::interval(self.config.ping_interval);
        keepalive.tick().await; // consume the immediate first tick

        loop {
            tokio::select! {
                _ = keepalive.tick() => {
                    let ping = serde_json::json!({"type": "ping"}).to_string();
                    write
                        .send(Message::Text(ping))
                        .await
                        .map_err(|e| FeedError::Stream(e.to_string()))?;
                }
                msg = read.next() => {
                    match msg {
                        Some(Ok(Message::Text(text))) => {
                            self.handle_message(&text);
                        }
                        Some(Ok(Message::Ping(data))) => {
                            let _ = write.send(Message::Pong(data)).await;
                        }
                        Some(Ok(Message::Close(frame))) => {
                            let normal = frame
                                .as_ref()
                                .map(|f| f.code == CloseCode::Normal)
                                .unwrap_or(false);
                            if normal {
                                tracing::info!("Opportunity stream closed by server");
                                return Ok(());
                            }
                            return Err(FeedError::Connection(format!(
                                "abnormal close: {:?}",
                                frame
                            )));
                        }
                        Some(Ok(_)) => {}
                        Some(Err(e)) => {
                            return Err(FeedError::Stream(e.to_string()));
                        }
                        None => {
                            return Err(FeedError::Connection("stream ended".to_string()));
                        }
                    }
                }
                _ = self.shutdown.notified() => {
                    let _ = write
                        .send(Message::Close(Some(CloseFrame {
                            code: CloseCode::Normal,
                            reason: "client shutdown".into(),
                        })))
                        .await;
                    return Ok(());
                }
            }
        }
    }

    /// A single bad frame never tears the connection down
    fn handle_message(&self, text: &str) {
        match decode_message(text) {
            Ok(StreamMessage::ConnectionEstablished { message, .. }) => {
                tracing::info!(
                    "Stream session established: {}",
                    message.as_deref().unwrap_or("")
                );
                let _ = self.tx.send(StreamEvent::Connected);
            }
            Ok(StreamMessage::NewOpportunity { opportunity, .. }) => {
                match opportunity {
                    Some(opp) if !opp.id.is_empty() => {
                        tracing::debug!("New opportunity arrived: {}", opp.id);
                        let _ = self.tx.send(StreamEvent::Arrived(opp));
                    }
                    _ => {
                        tracing::warn!("Discarding new_opportunity without a payload id");
                    }
                }
            }
            Ok(StreamMessage::Heartbeat { .. }) | Ok(StreamMessage::Pong { .. }) => {}
            Err(DecodeFailure::UnknownType(tag)) => {
                tracing::debug!("Ignoring unknown stream message type: {}", tag);
            }
            Err(DecodeFailure::Malformed(e)) => {
                tracing::warn!("Malformed stream message skipped: {}", e);
            }
        }
    }
}

/// Owned handle over a running stream task.
///
/// `connect` spawns the run loop; `close` performs the caller-initiated
/// teardown (normal close code, timers dropped with the task).
pub struct StreamSession {
    stream: Arc<OpportunityStream>,
    task: tokio::task::JoinHandle<()>,
}

impl StreamSession {
    pub fn connect(config: StreamConfig) -> (Self, broadcast::Receiver<StreamEvent>) {
        let (stream, rx) = OpportunityStream::new(config);
        let stream = Arc::new(stream);
        let task = {
            let stream = Arc::clone(&stream);
            tokio::spawn(async move { stream.run().await })
        };
        (Self { stream, task }, rx)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StreamEvent> {
        self.stream.subscribe()
    }

    /// True once the run loop has ended (graceful close or terminal loss)
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    pub async fn close(self) {
        self.stream.shutdown();
        let _ = self.task.await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_doubles_and_caps() {
        assert_eq!(reconnect_delay(0), Duration::from_millis(1000));
        assert_eq!(reconnect_delay(1), Duration::from_millis(2000));
        assert_eq!(reconnect_delay(2), Duration::from_millis(4000));
        assert_eq!(reconnect_delay(3), Duration::from_millis(8000));
        assert_eq!(reconnect_delay(4), Duration::from_millis(16000));
        assert_eq!(reconnect_delay(5), Duration::from_millis(30000));
        assert_eq!(reconnect_delay(20), Duration::from_millis(30000));
    }

    #[test]
    fn decodes_new_opportunity() {
        let text = r#"{"type":"new_opportunity","opportunity":{"id":"o1","name":"Grant"},"timestamp":"2026-01-01T00:00:00Z"}"#;
        match decode_message(text) {
            Ok(StreamMessage::NewOpportunity { opportunity, .. }) => {
                assert_eq!(opportunity.unwrap().id, "o1");
            }
            other => panic!("unexpected decode result: {:?}", other),
        }
    }

    #[test]
    fn decodes_connection_established() {
        let text = r#"{"type":"connection_established","message":"hello","timestamp":"t"}"#;
        assert!(matches!(
            decode_message(text),
            Ok(StreamMessage::ConnectionEstablished { .. })
        ));
    }

    #[test]
    fn new_opportunity_without_payload_still_decodes() {
        // The missing payload is handled (logged and discarded) downstream,
        // not treated as a protocol error.
        let text = r#"{"type":"new_opportunity","timestamp":"t"}"#;
        match decode_message(text) {
            Ok(StreamMessage::NewOpportunity { opportunity, .. }) => {
                assert!(opportunity.is_none());
            }
            other => panic!("unexpected decode result: {:?}", other),
        }
    }

    #[test]
    fn unknown_tag_is_rejected_explicitly() {
        let text = r#"{"type":"server_gossip","timestamp":"t"}"#;
        assert!(matches!(
            decode_message(text),
            Err(DecodeFailure::UnknownType(tag)) if tag == "server_gossip"
        ));
    }

    #[test]
    fn non_json_is_malformed() {
        assert!(matches!(
            decode_message("not json at all"),
            Err(DecodeFailure::Malformed(_))
        ));
    }

    #[tokio::test]
    async fn arrived_events_reach_subscribers() {
        let (stream, mut rx) =
            OpportunityStream::new(StreamConfig::new("wss://example.invalid/ws", "tok"));
        stream.handle_message(
            r#"{"type":"new_opportunity","opportunity":{"id":"o2","name":"Prize"},"timestamp":"t"}"#,
        );
        match rx.recv().await.unwrap() {
            StreamEvent::Arrived(opp) => assert_eq!(opp.id, "o2"),
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[tokio::test]
    async fn malformed_payload_emits_nothing() {
        let (stream, mut rx) =
            OpportunityStream::new(StreamConfig::new("wss://example.invalid/ws", "tok"));
        stream.handle_message(r#"{"type":"new_opportunity","timestamp":"t"}"#);
        stream.handle_message("garbage");
        stream.handle_message(r#"{"type":"mystery"}"#);
        assert!(matches!(
            rx.try_recv(),
            Err(broadcast::error::TryRecvError::Empty)
        ));
    }
}
