//! IRC connector
//!
//! Owns the background [`IrcClient`] task and exposes the relay-facing
//! event stream and send operation.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use irc_proto::Message;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

use pino_core::{Config, InboundEvent, IrcChannelName, IrcSender};

use crate::client::{ClientSettings, IrcClient};
use crate::error::{IrcError, Result};
use crate::message::privmsg_lines;

const EVENT_BUFFER: usize = 256;
const OUTBOUND_BUFFER: usize = 256;

/// IRC side of the bridge
pub struct IrcConnector {
    client: Option<IrcClient>,
    connected: Arc<AtomicBool>,
    outbound_tx: mpsc::Sender<Message>,
    outbound_rx: Option<mpsc::Receiver<Message>>,
    events_tx: mpsc::Sender<InboundEvent>,
    events_rx: Option<mpsc::Receiver<InboundEvent>>,
    task: Option<JoinHandle<()>>,
}

impl IrcConnector {
    /// Create a connector from the bridge configuration
    pub fn new(config: &Config) -> Result<Self> {
        Ok(Self::with_settings(ClientSettings::from_config(config)?))
    }

    pub fn with_settings(settings: ClientSettings) -> Self {
        let connected = Arc::new(AtomicBool::new(false));
        let (outbound_tx, outbound_rx) = mpsc::channel(OUTBOUND_BUFFER);
        let (events_tx, events_rx) = mpsc::channel(EVENT_BUFFER);

        Self {
            client: Some(IrcClient::new(settings, connected.clone())),
            connected,
            outbound_tx,
            outbound_rx: Some(outbound_rx),
            events_tx,
            events_rx: Some(events_rx),
            task: None,
        }
    }

    /// Start the connection task. Connection failures are retried in the
    /// background; this only fails when called twice.
    pub fn connect(&mut self) -> Result<()> {
        let (Some(client), Some(mut outbound_rx)) = (self.client.take(), self.outbound_rx.take())
        else {
            return Err(IrcError::Config(
                "IRC connector is already connected".to_string(),
            ));
        };

        let events_tx = self.events_tx.clone();
        self.task = Some(tokio::spawn(async move {
            client.run(&mut outbound_rx, &events_tx).await;
        }));

        Ok(())
    }

    /// Take the stream of inbound IRC messages. Returns `None` after the
    /// first call.
    pub fn events(&mut self) -> Option<mpsc::Receiver<InboundEvent>> {
        self.events_rx.take()
    }

    /// Whether the client is currently registered with the server
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }
}

impl Drop for IrcConnector {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

#[async_trait]
impl IrcSender for IrcConnector {
    async fn send(&self, channel: &IrcChannelName, text: &str) {
        if !self.is_connected() {
            warn!("Not connected to IRC, dropping message for {}", channel);
            return;
        }

        for line in privmsg_lines(channel, text) {
            if let Err(e) = self.outbound_tx.try_send(line) {
                error!("Failed to queue IRC message for {}: {}", channel, e);
                return;
            }
        }
        debug!("Queued IRC message for {}", channel);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use irc_proto::Command;

    fn config() -> Config {
        let mut config = Config::default();
        config.irc.nickname = "pino".to_string();
        config.irc.server = "127.0.0.1:6667".to_string();
        config
    }

    #[test]
    fn test_new_validates_config() {
        assert!(IrcConnector::new(&config()).is_ok());

        let mut bad_port = config();
        bad_port.irc.server = "irc.example.net:notaport".to_string();
        assert!(matches!(
            IrcConnector::new(&bad_port),
            Err(IrcError::InvalidServer(_))
        ));

        let mut no_nick = config();
        no_nick.irc.nickname = "  ".to_string();
        assert!(matches!(
            IrcConnector::new(&no_nick),
            Err(IrcError::Config(_))
        ));
    }

    #[test]
    fn test_send_while_disconnected_is_dropped() {
        let mut connector = IrcConnector::new(&config()).unwrap();

        tokio_test::block_on(connector.send(&"#rust".into(), "<bob> hi"));

        let outbound = connector.outbound_rx.as_mut().unwrap();
        assert!(outbound.try_recv().is_err());
    }

    #[test]
    fn test_send_queues_one_privmsg_per_text_line() {
        let mut connector = IrcConnector::new(&config()).unwrap();
        connector.connected.store(true, Ordering::SeqCst);

        tokio_test::block_on(connector.send(&"#rust".into(), "<bob> one\n<bob> two"));

        let outbound = connector.outbound_rx.as_mut().unwrap();
        assert_eq!(
            outbound.try_recv().unwrap().command,
            Command::PRIVMSG("#rust".into(), "<bob> one".into())
        );
        assert_eq!(
            outbound.try_recv().unwrap().command,
            Command::PRIVMSG("#rust".into(), "<bob> two".into())
        );
        assert!(outbound.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_connect_twice_fails() {
        let mut connector = IrcConnector::new(&config()).unwrap();
        assert!(connector.events().is_some());
        assert!(connector.events().is_none());

        connector.connect().unwrap();
        assert!(matches!(connector.connect(), Err(IrcError::Config(_))));
    }
}
