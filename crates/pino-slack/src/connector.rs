//! Slack connector
//!
//! Owns the Socket Mode session, keeps the channel registry current and
//! turns Slack messages into [`InboundEvent`]s for the relay.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::sync::{RwLock, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use pino_core::{
    ChannelRegistry, Config, InboundEvent, SlackChannelId, SlackChannelName, SlackMessageEvent,
    SlackSender,
};

use crate::api::SlackApiClient;
use crate::avatar::generate_avatar_url;
use crate::error::{Result, SlackError};
use crate::socket::{SocketEventHandler, SocketModeClient};
use crate::types::{PostMessage, SlackEvent};

const EVENT_BUFFER: usize = 256;

/// State shared between the connector and its socket task
struct SlackState {
    api: SlackApiClient,
    tracked: HashSet<SlackChannelName>,
    registry: RwLock<ChannelRegistry>,
    /// The bot's own user ID, from auth.test
    bot_user_id: RwLock<Option<String>>,
    /// user ID -> display name
    users: DashMap<String, String>,
}

impl SlackState {
    /// Replace the registry with one built from the live channel list
    async fn rebuild_registry(&self) -> Result<usize> {
        let conversations = self
            .api
            .conversations_list()
            .await
            .map_err(|e| SlackError::ChannelList(e.to_string()))?;

        let registry = ChannelRegistry::build_tracked(
            &self.tracked,
            conversations
                .iter()
                .map(|c| (c.id.as_str(), c.name.as_str())),
        );

        for (name, id) in registry.entries() {
            info!("Slack channel {} -> {}", name, id);
        }

        let count = registry.len();
        *self.registry.write().await = registry;
        Ok(count)
    }

    async fn display_name(&self, user_id: &str) -> String {
        if let Some(name) = self.users.get(user_id) {
            return name.clone();
        }

        match self.api.users_info(user_id).await {
            Ok(user) => {
                let name = user.display_name().to_string();
                self.users.insert(user_id.to_string(), name.clone());
                name
            }
            Err(e) => {
                warn!("Failed to look up Slack user {}: {}", user_id, e);
                user_id.to_string()
            }
        }
    }

    async fn channel_id(&self, channel: &SlackChannelName) -> Option<SlackChannelId> {
        self.registry.read().await.id_for(channel).cloned()
    }

    async fn post(&self, message: PostMessage) {
        if let Err(e) = self.api.post_message(&message).await {
            error!("Failed to post to Slack channel {}: {}", message.channel, e);
        }
    }
}

/// Socket callbacks feeding the relay
struct EventRelay {
    state: Arc<SlackState>,
    tx: mpsc::Sender<InboundEvent>,
}

#[async_trait]
impl SocketEventHandler for EventRelay {
    async fn on_connected(&self) {
        match self.state.rebuild_registry().await {
            Ok(count) => debug!("Slack channel registry refreshed ({} channels)", count),
            Err(e) => warn!("Keeping previous Slack channel registry: {}", e),
        }
    }

    async fn on_event(&self, event: SlackEvent) {
        if !event.is_user_message() {
            debug!(
                "Skipping Slack event {} (subtype {:?})",
                event.event_type, event.subtype
            );
            return;
        }

        let (Some(channel_id), Some(user_id)) = (event.channel, event.user) else {
            return;
        };

        if self.state.bot_user_id.read().await.as_deref() == Some(user_id.as_str()) {
            debug!("Skipping Slack message from the bridge's own user");
            return;
        }

        let channel_id = SlackChannelId::from(channel_id);
        let channel = self.state.registry.read().await.name_for(&channel_id).cloned();
        let sender = self.state.display_name(&user_id).await;

        let message = SlackMessageEvent {
            channel_id,
            channel,
            sender,
            text: event.text.unwrap_or_default(),
        };

        if self.tx.send(message.into()).await.is_err() {
            debug!("Relay stopped listening, dropping Slack message");
        }
    }
}

/// Slack side of the bridge
pub struct SlackConnector {
    state: Arc<SlackState>,
    app_token: String,
    events_tx: mpsc::Sender<InboundEvent>,
    events_rx: Option<mpsc::Receiver<InboundEvent>>,
    socket_task: Option<JoinHandle<()>>,
}

impl SlackConnector {
    /// Create a connector from the bridge configuration
    pub fn new(config: &Config) -> Result<Self> {
        if config.slack.token.trim().is_empty() {
            return Err(SlackError::TokenNotConfigured);
        }

        let app_token = config
            .slack
            .app_token
            .clone()
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| {
                SlackError::Config("An app token is required for Socket Mode".to_string())
            })?;

        let api = SlackApiClient::new(&config.slack.token)?;
        Ok(Self::with_api_client(
            api,
            &app_token,
            config.tracked_slack_channels(),
        ))
    }

    /// Create a connector around an existing API client
    pub fn with_api_client(
        api: SlackApiClient,
        app_token: &str,
        tracked: HashSet<SlackChannelName>,
    ) -> Self {
        let (events_tx, events_rx) = mpsc::channel(EVENT_BUFFER);

        Self {
            state: Arc::new(SlackState {
                api,
                tracked,
                registry: RwLock::new(ChannelRegistry::new()),
                bot_user_id: RwLock::new(None),
                users: DashMap::new(),
            }),
            app_token: app_token.to_string(),
            events_tx,
            events_rx: Some(events_rx),
            socket_task: None,
        }
    }

    /// Check the bot token, start the Socket Mode session in the
    /// background, then build the channel registry.
    ///
    /// A rejected token fails before anything is started. Fails with
    /// [`SlackError::ChannelList`] when the channel list cannot be fetched;
    /// the background session is stopped in that case.
    pub async fn connect(&mut self) -> Result<()> {
        if let Some(task) = self.socket_task.take() {
            task.abort();
        }

        let auth = self.state.api.auth_test().await?;
        info!("Slack bot {} ({}) on team {}", auth.user, auth.user_id, auth.team);
        *self.state.bot_user_id.write().await = Some(auth.user_id);

        let client = SocketModeClient::new(&self.app_token, self.state.api.clone());
        let relay = EventRelay {
            state: self.state.clone(),
            tx: self.events_tx.clone(),
        };
        let task = tokio::spawn(async move {
            client.run(&relay).await;
        });

        match self.state.rebuild_registry().await {
            Ok(count) => {
                info!("Slack channel registry built with {} channels", count);
                self.socket_task = Some(task);
                Ok(())
            }
            Err(e) => {
                task.abort();
                Err(e)
            }
        }
    }

    /// Take the stream of inbound Slack messages. Returns `None` after the
    /// first call.
    pub fn events(&mut self) -> Option<mpsc::Receiver<InboundEvent>> {
        self.events_rx.take()
    }
}

impl Drop for SlackConnector {
    fn drop(&mut self) {
        if let Some(task) = self.socket_task.take() {
            task.abort();
        }
    }
}

#[async_trait]
impl SlackSender for SlackConnector {
    async fn send_as_user(&self, channel: &SlackChannelName, display_name: &str, text: &str) {
        let Some(id) = self.state.channel_id(channel).await else {
            debug!("Slack channel {} is not known, dropping message", channel);
            return;
        };

        self.state
            .post(PostMessage {
                channel: id.to_string(),
                text: text.to_string(),
                username: Some(display_name.to_string()),
                icon_url: Some(generate_avatar_url(display_name)),
                as_user: Some(false),
            })
            .await;
    }

    async fn send_as_bot(&self, channel: &SlackChannelName, text: &str) {
        let Some(id) = self.state.channel_id(channel).await else {
            debug!("Slack channel {} is not known, dropping message", channel);
            return;
        };

        self.state
            .post(PostMessage {
                channel: id.to_string(),
                text: text.to_string(),
                ..Default::default()
            })
            .await;
    }
}
