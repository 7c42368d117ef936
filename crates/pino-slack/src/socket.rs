//! Socket Mode implementation for Slack
//!
//! Connects to Slack via WebSocket for real-time events and keeps the
//! connection alive, reconnecting with exponential backoff.

use std::time::Duration;

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use tokio_tungstenite::{connect_async, tungstenite::Message as WsMessage};
use tracing::{debug, info, warn};

use crate::api::SlackApiClient;
use crate::error::{Result, SlackError};
use crate::types::{SlackEvent, SocketEnvelope};

const MAX_BACKOFF_SECS: u64 = 60;

/// Callbacks driven by the Socket Mode loop
#[async_trait]
pub trait SocketEventHandler: Send + Sync {
    /// Called on every `hello`, before any event of that session is delivered
    async fn on_connected(&self);

    /// Called for each Events API event, in arrival order
    async fn on_event(&self, event: SlackEvent);
}

/// How a Socket Mode session ended
#[derive(Debug, PartialEq, Eq)]
enum SessionEnd {
    /// Slack asked us to reconnect (`disconnect` envelope)
    Refresh,
    /// The socket closed
    Closed,
}

/// Socket Mode client
pub struct SocketModeClient {
    app_token: String,
    api_client: SlackApiClient,
}

impl SocketModeClient {
    /// Create a new Socket Mode client
    pub fn new(app_token: &str, api_client: SlackApiClient) -> Self {
        Self {
            app_token: app_token.to_string(),
            api_client,
        }
    }

    /// Keep a Socket Mode session open forever.
    ///
    /// Failed or closed sessions are retried after 1s, doubling up to 60s.
    /// The delay resets once Slack greets a new session.
    pub async fn run<H: SocketEventHandler>(&self, handler: &H) {
        let mut backoff_secs = 1u64;

        loop {
            match self.run_session(handler, &mut backoff_secs).await {
                Ok(SessionEnd::Refresh) => {
                    debug!("Reconnecting to Slack Socket Mode on request");
                    continue;
                }
                Ok(SessionEnd::Closed) => {
                    warn!(backoff_secs, "Slack Socket Mode connection closed, reconnecting");
                }
                Err(e) => {
                    warn!(error = %e, backoff_secs, "Slack Socket Mode session failed, backing off");
                }
            }

            tokio::time::sleep(Duration::from_secs(backoff_secs)).await;
            backoff_secs = (backoff_secs * 2).min(MAX_BACKOFF_SECS);
        }
    }

    async fn run_session<H: SocketEventHandler>(
        &self,
        handler: &H,
        backoff_secs: &mut u64,
    ) -> Result<SessionEnd> {
        let ws_url = self.api_client.apps_connections_open(&self.app_token).await?;
        info!(
            "Connecting to Slack Socket Mode: {}",
            ws_url.split('?').next().unwrap_or(&ws_url)
        );

        let (ws_stream, _) = connect_async(ws_url.as_str())
            .await
            .map_err(|e| SlackError::WebSocketError(e.to_string()))?;

        let (mut write, mut read) = ws_stream.split();

        while let Some(message) = read.next().await {
            match message {
                Ok(WsMessage::Text(text)) => {
                    let envelope: SocketEnvelope = match serde_json::from_str(&text) {
                        Ok(envelope) => envelope,
                        Err(e) => {
                            warn!("Ignoring unparsable Socket Mode frame: {}", e);
                            continue;
                        }
                    };

                    // Slack redelivers anything not acknowledged
                    if let Some(ref envelope_id) = envelope.envelope_id {
                        let ack = serde_json::json!({ "envelope_id": envelope_id }).to_string();
                        write
                            .send(WsMessage::Text(ack.into()))
                            .await
                            .map_err(|e| SlackError::WebSocketError(e.to_string()))?;
                    }

                    match envelope.envelope_type.as_deref() {
                        Some("hello") => {
                            info!("Received hello from Slack Socket Mode");
                            *backoff_secs = 1;
                            handler.on_connected().await;
                        }
                        Some("disconnect") => {
                            info!(reason = ?envelope.reason, "Slack requested a reconnect");
                            return Ok(SessionEnd::Refresh);
                        }
                        Some("events_api") => {
                            let Some(event) = envelope.payload.as_ref().and_then(|p| p.get("event"))
                            else {
                                continue;
                            };

                            match serde_json::from_value::<SlackEvent>(event.clone()) {
                                Ok(event) => handler.on_event(event).await,
                                Err(e) => debug!("Skipping unparsable event: {}", e),
                            }
                        }
                        other => {
                            debug!("Ignoring envelope type: {:?}", other);
                        }
                    }
                }
                Ok(WsMessage::Ping(data)) => {
                    write
                        .send(WsMessage::Pong(data))
                        .await
                        .map_err(|e| SlackError::WebSocketError(e.to_string()))?;
                }
                Ok(WsMessage::Close(frame)) => {
                    info!("WebSocket connection closed: {:?}", frame);
                    return Ok(SessionEnd::Closed);
                }
                Ok(_) => {}
                Err(e) => {
                    return Err(SlackError::WebSocketError(e.to_string()));
                }
            }
        }

        Ok(SessionEnd::Closed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;
    use tokio::sync::mpsc;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    struct Recorder {
        tx: mpsc::UnboundedSender<String>,
    }

    #[async_trait]
    impl SocketEventHandler for Recorder {
        async fn on_connected(&self) {
            let _ = self.tx.send("connected".to_string());
        }

        async fn on_event(&self, event: SlackEvent) {
            let _ = self.tx.send(format!("event:{}", event.text.unwrap_or_default()));
        }
    }

    async fn next(rx: &mut mpsc::UnboundedReceiver<String>) -> String {
        tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .expect("timed out waiting for handler")
            .expect("handler channel closed")
    }

    #[tokio::test]
    async fn test_session_acks_events_and_resumes_after_disconnect() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let ws_port = listener.local_addr().unwrap().port();

        let api_server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/apps.connections.open"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "ok": true,
                "url": format!("ws://127.0.0.1:{}/?ticket=t", ws_port)
            })))
            .mount(&api_server)
            .await;

        let (ack_tx, mut ack_rx) = mpsc::unbounded_channel::<String>();

        tokio::spawn(async move {
            // first session: hello, one event, then a disconnect request
            let (stream, _) = listener.accept().await.unwrap();
            let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();
            ws.send(WsMessage::Text(r#"{"type":"hello"}"#.into())).await.unwrap();
            let event = serde_json::json!({
                "type": "events_api",
                "envelope_id": "env-1",
                "payload": { "event": { "type": "message", "user": "U1", "channel": "C1", "text": "hi" } }
            });
            ws.send(WsMessage::Text(event.to_string().into())).await.unwrap();
            if let Some(Ok(WsMessage::Text(ack))) = ws.next().await {
                let _ = ack_tx.send(ack.as_str().to_string());
            }
            ws.send(WsMessage::Text(r#"{"type":"disconnect","reason":"refresh_requested"}"#.into()))
                .await
                .unwrap();

            // second session delivers one more event, then stays open
            let (stream, _) = listener.accept().await.unwrap();
            let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();
            ws.send(WsMessage::Text(r#"{"type":"hello"}"#.into())).await.unwrap();
            let event = serde_json::json!({
                "type": "events_api",
                "envelope_id": "env-2",
                "payload": { "event": { "type": "message", "user": "U1", "channel": "C1", "text": "back" } }
            });
            ws.send(WsMessage::Text(event.to_string().into())).await.unwrap();
            while ws.next().await.is_some() {}
        });

        let api = SlackApiClient::new("xoxb-test")
            .unwrap()
            .with_base_url(api_server.uri());
        let client = SocketModeClient::new("xapp-test", api);
        let (tx, mut rx) = mpsc::unbounded_channel();

        let task = tokio::spawn(async move {
            client.run(&Recorder { tx }).await;
        });

        assert_eq!(next(&mut rx).await, "connected");
        assert_eq!(next(&mut rx).await, "event:hi");

        let ack = tokio::time::timeout(Duration::from_secs(5), ack_rx.recv())
            .await
            .unwrap()
            .unwrap();
        let ack: serde_json::Value = serde_json::from_str(&ack).unwrap();
        assert_eq!(ack["envelope_id"], "env-1");

        // reconnected without waiting for backoff
        assert_eq!(next(&mut rx).await, "connected");
        assert_eq!(next(&mut rx).await, "event:back");

        task.abort();
    }
}
