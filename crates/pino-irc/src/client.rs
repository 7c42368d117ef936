//! IRC connection loop
//!
//! Registers with the server, joins the configured channels, answers
//! pings, forwards channel messages and writes queued outbound lines.
//! A dropped connection is re-established with exponential backoff.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use irc_proto::error::ProtocolError;
use irc_proto::{Command, IrcCodec, Message, Response};
use tokio::sync::mpsc;
use tokio_util::codec::Framed;
use tracing::{debug, info, warn};

use pino_core::{Config, InboundEvent, IrcChannelKey, IrcChannelName};

use crate::error::{IrcError, Result};
use crate::message;
use crate::transport;

const MAX_BACKOFF_SECS: u64 = 60;

/// Connection parameters derived from the bridge configuration
#[derive(Debug, Clone)]
pub struct ClientSettings {
    pub host: String,
    pub port: u16,
    pub tls: bool,
    pub nickname: String,
    pub real_name: String,
    /// Channels joined after every successful registration
    pub joins: Vec<(IrcChannelName, Option<IrcChannelKey>)>,
}

impl ClientSettings {
    pub fn from_config(config: &Config) -> Result<Self> {
        let nickname = config.irc.nickname.trim();
        if nickname.is_empty() {
            return Err(IrcError::Config("IRC nickname must be defined".to_string()));
        }

        let (host, port) = config
            .irc
            .server_address()
            .map_err(|e| IrcError::InvalidServer(e.to_string()))?;

        Ok(Self {
            host,
            port,
            tls: config.irc.is_ssl,
            nickname: nickname.to_string(),
            real_name: config.irc.real_name().trim().to_string(),
            joins: config.irc_join_list(),
        })
    }
}

/// Input that woke the session loop
enum Input {
    Read(Option<std::result::Result<Message, ProtocolError>>),
    Outbound(Message),
}

/// Long-running IRC client
pub struct IrcClient {
    settings: ClientSettings,
    connected: Arc<AtomicBool>,
}

impl IrcClient {
    /// `connected` is raised after registration and lowered when the
    /// connection drops.
    pub fn new(settings: ClientSettings, connected: Arc<AtomicBool>) -> Self {
        Self {
            settings,
            connected,
        }
    }

    /// Stay connected forever, retrying after 1s doubling up to 60s.
    /// The delay resets once the server welcomes us.
    pub async fn run(
        &self,
        outbound: &mut mpsc::Receiver<Message>,
        events: &mpsc::Sender<InboundEvent>,
    ) {
        let mut backoff_secs = 1u64;

        loop {
            if let Err(e) = self.run_session(outbound, events, &mut backoff_secs).await {
                warn!(
                    error = %e,
                    backoff_secs,
                    "IRC connection to {}:{} lost",
                    self.settings.host,
                    self.settings.port
                );
            }
            self.connected.store(false, Ordering::SeqCst);

            tokio::time::sleep(Duration::from_secs(backoff_secs)).await;
            backoff_secs = (backoff_secs * 2).min(MAX_BACKOFF_SECS);
        }
    }

    async fn run_session(
        &self,
        outbound: &mut mpsc::Receiver<Message>,
        events: &mpsc::Sender<InboundEvent>,
        backoff_secs: &mut u64,
    ) -> Result<()> {
        let settings = &self.settings;
        info!(
            "Connecting to IRC server {}:{} (tls: {})",
            settings.host, settings.port, settings.tls
        );

        let stream = transport::connect(&settings.host, settings.port, settings.tls).await?;
        let mut framed = Framed::new(stream, IrcCodec::new("utf-8")?);

        let mut nick = settings.nickname.clone();
        framed.send(Command::NICK(nick.clone()).into()).await?;
        framed
            .send(
                Command::USER(
                    settings.nickname.clone(),
                    "0".to_string(),
                    settings.real_name.clone(),
                )
                .into(),
            )
            .await?;

        let mut registered = false;

        loop {
            let input = tokio::select! {
                read = framed.next() => Input::Read(read),
                Some(outgoing) = outbound.recv(), if registered => Input::Outbound(outgoing),
            };

            let msg = match input {
                Input::Outbound(outgoing) => {
                    framed.send(outgoing).await?;
                    continue;
                }
                Input::Read(None) => return Err(IrcError::Disconnected),
                Input::Read(Some(read)) => read?,
            };

            match &msg.command {
                Command::PING(token, _) => {
                    framed.send(Command::PONG(token.clone(), None).into()).await?;
                }
                Command::Response(Response::RPL_WELCOME, _) => {
                    info!("Registered on IRC as {}", nick);
                    registered = true;
                    *backoff_secs = 1;
                    self.connected.store(true, Ordering::SeqCst);

                    for (channel, key) in &settings.joins {
                        info!("Joining IRC channel {}", channel);
                        framed.send(message::join(channel, key.as_ref())).await?;
                    }
                }
                Command::Response(Response::ERR_NICKNAMEINUSE, _) if !registered => {
                    nick.push('_');
                    warn!("IRC nickname in use, retrying as {}", nick);
                    framed.send(Command::NICK(nick.clone()).into()).await?;
                }
                Command::NICK(new_nick) => {
                    if msg
                        .source_nickname()
                        .is_some_and(|n| n.eq_ignore_ascii_case(&nick))
                    {
                        nick = new_nick.clone();
                    }
                }
                Command::PRIVMSG(..) | Command::NOTICE(..) => {
                    let Some(event) = message::to_event(&msg, &nick) else {
                        continue;
                    };

                    debug!("IRC message in {} from {}", event.channel, event.nick);
                    if events.send(event.into()).await.is_err() {
                        debug!("Relay stopped listening, dropping IRC message");
                    }
                }
                Command::ERROR(reason) => {
                    warn!("IRC server error: {}", reason);
                }
                _ => {}
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pino_core::IrcMessageKind;
    use tokio::net::{TcpListener, TcpStream};

    type Server = Framed<TcpStream, IrcCodec>;

    fn settings(port: u16) -> ClientSettings {
        ClientSettings {
            host: "127.0.0.1".to_string(),
            port,
            tls: false,
            nickname: "pino".to_string(),
            real_name: "Pino Bridge".to_string(),
            joins: vec![
                ("#rust".into(), None),
                ("#secret".into(), Some("hunter2".into())),
            ],
        }
    }

    async fn accept(listener: &TcpListener) -> Server {
        let (socket, _) = tokio::time::timeout(Duration::from_secs(5), listener.accept())
            .await
            .expect("timed out waiting for client to connect")
            .unwrap();
        Framed::new(socket, IrcCodec::new("utf-8").unwrap())
    }

    async fn next_command(server: &mut Server) -> Command {
        tokio::time::timeout(Duration::from_secs(5), server.next())
            .await
            .expect("timed out waiting for client")
            .expect("client closed the connection")
            .unwrap()
            .command
    }

    async fn say(server: &mut Server, raw: &str) {
        server.send(raw.parse::<Message>().unwrap()).await.unwrap();
    }

    async fn next_event(events: &mut mpsc::Receiver<InboundEvent>) -> pino_core::IrcMessageEvent {
        let event = tokio::time::timeout(Duration::from_secs(5), events.recv())
            .await
            .unwrap()
            .unwrap();
        let InboundEvent::Irc(event) = event else {
            panic!("expected an IRC event");
        };
        event
    }

    fn user() -> Command {
        Command::USER("pino".into(), "0".into(), "Pino Bridge".into())
    }

    #[test]
    fn test_settings_from_config() {
        let mut config = Config::default();
        config.irc.nickname = "pino".to_string();
        config.irc.server = "irc.example.net".to_string();
        config.irc.is_ssl = true;

        let settings = ClientSettings::from_config(&config).unwrap();
        assert_eq!(settings.port, 6697);
        assert_eq!(settings.real_name, "pino");

        config.irc.nickname.clear();
        assert!(matches!(
            ClientSettings::from_config(&config),
            Err(IrcError::Config(_))
        ));
    }

    #[tokio::test]
    async fn test_registration_join_and_relay() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        let connected = Arc::new(AtomicBool::new(false));
        let client = IrcClient::new(settings(port), connected.clone());
        let (out_tx, mut out_rx) = mpsc::channel(16);
        let (ev_tx, mut ev_rx) = mpsc::channel(16);
        let task = tokio::spawn(async move {
            client.run(&mut out_rx, &ev_tx).await;
        });

        let mut server = accept(&listener).await;

        assert_eq!(next_command(&mut server).await, Command::NICK("pino".into()));
        assert_eq!(next_command(&mut server).await, user());

        say(&mut server, ":srv 433 * pino :Nickname is already in use").await;
        assert_eq!(next_command(&mut server).await, Command::NICK("pino_".into()));

        say(&mut server, ":srv 001 pino_ :Welcome").await;
        assert_eq!(
            next_command(&mut server).await,
            Command::JOIN("#rust".into(), None, None)
        );
        assert_eq!(
            next_command(&mut server).await,
            Command::JOIN("#secret".into(), Some("hunter2".into()), None)
        );

        say(&mut server, "PING :token").await;
        assert_eq!(
            next_command(&mut server).await,
            Command::PONG("token".into(), None)
        );

        say(&mut server, ":pino_!p@h PRIVMSG #rust :echo").await;
        say(&mut server, ":bob!b@h PRIVMSG #rust :hi").await;

        let event = next_event(&mut ev_rx).await;
        assert_eq!(event.nick, "bob");
        assert_eq!(event.text, "hi");
        assert_eq!(event.kind, IrcMessageKind::Message);
        assert!(connected.load(Ordering::SeqCst));

        out_tx
            .send(Command::PRIVMSG("#rust".into(), "<alice> yo".into()).into())
            .await
            .unwrap();
        assert_eq!(
            next_command(&mut server).await,
            Command::PRIVMSG("#rust".into(), "<alice> yo".into())
        );

        task.abort();
    }

    #[tokio::test]
    async fn test_server_notice_is_relayed() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        let client = IrcClient::new(settings(port), Arc::new(AtomicBool::new(false)));
        let (_out_tx, mut out_rx) = mpsc::channel(16);
        let (ev_tx, mut ev_rx) = mpsc::channel(16);
        let task = tokio::spawn(async move {
            client.run(&mut out_rx, &ev_tx).await;
        });

        let mut server = accept(&listener).await;
        say(&mut server, ":irc.example.net 001 pino :Welcome").await;
        say(&mut server, ":irc.example.net NOTICE #rust :restart in 5 minutes").await;

        let event = next_event(&mut ev_rx).await;
        assert_eq!(event.kind, IrcMessageKind::ServerNotice);
        assert_eq!(event.nick, "irc.example.net");
        assert_eq!(event.text, "restart in 5 minutes");

        task.abort();
    }

    #[tokio::test]
    async fn test_reconnects_and_relays_after_server_closes() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        let connected = Arc::new(AtomicBool::new(false));
        let client = IrcClient::new(settings(port), connected.clone());
        let (out_tx, mut out_rx) = mpsc::channel(16);
        let (ev_tx, mut ev_rx) = mpsc::channel(16);
        let task = tokio::spawn(async move {
            client.run(&mut out_rx, &ev_tx).await;
        });

        {
            let mut server = accept(&listener).await;
            assert_eq!(next_command(&mut server).await, Command::NICK("pino".into()));
            assert_eq!(next_command(&mut server).await, user());
            say(&mut server, ":srv 001 pino :Welcome").await;
            assert_eq!(
                next_command(&mut server).await,
                Command::JOIN("#rust".into(), None, None)
            );
        }

        let mut server = accept(&listener).await;
        assert!(!connected.load(Ordering::SeqCst));

        assert_eq!(next_command(&mut server).await, Command::NICK("pino".into()));
        assert_eq!(next_command(&mut server).await, user());
        say(&mut server, ":srv 001 pino :Welcome back").await;
        assert_eq!(
            next_command(&mut server).await,
            Command::JOIN("#rust".into(), None, None)
        );
        assert_eq!(
            next_command(&mut server).await,
            Command::JOIN("#secret".into(), Some("hunter2".into()), None)
        );
        assert!(connected.load(Ordering::SeqCst));

        say(&mut server, ":bob!b@h PRIVMSG #rust :back again").await;
        let event = next_event(&mut ev_rx).await;
        assert_eq!(event.nick, "bob");
        assert_eq!(event.text, "back again");

        out_tx
            .send(Command::PRIVMSG("#rust".into(), "<alice> welcome back".into()).into())
            .await
            .unwrap();
        assert_eq!(
            next_command(&mut server).await,
            Command::PRIVMSG("#rust".into(), "<alice> welcome back".into())
        );

        task.abort();
    }
}
