//! Relay engine
//!
//! Routes each inbound event to the opposite protocol through the static
//! channel mapping. Events on channels without a mapping are dropped.

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, info};

use pino_core::{
    ChannelMapping, InboundEvent, IrcMessageEvent, IrcMessageKind, IrcSender, SlackMessageEvent,
    SlackSender, decode_slack_entities,
};

/// Stateless translator between the two connectors
pub struct RelayEngine {
    mapping: Arc<ChannelMapping>,
    slack: Arc<dyn SlackSender>,
    irc: Arc<dyn IrcSender>,
}

impl RelayEngine {
    pub fn new(
        mapping: Arc<ChannelMapping>,
        slack: Arc<dyn SlackSender>,
        irc: Arc<dyn IrcSender>,
    ) -> Self {
        Self { mapping, slack, irc }
    }

    /// Relay a single event
    pub async fn handle(&self, event: InboundEvent) {
        match event {
            InboundEvent::Slack(event) => self.handle_slack(event).await,
            InboundEvent::Irc(event) => self.handle_irc(event).await,
        }
    }

    async fn handle_slack(&self, event: SlackMessageEvent) {
        let Some(slack_channel) = event.channel.as_ref() else {
            debug!("Slack channel {} is not tracked, not relaying", event.channel_id);
            return;
        };
        let Some(irc_channel) = self.mapping.irc_for(slack_channel) else {
            debug!("Slack channel {} has no IRC mapping, not relaying", slack_channel);
            return;
        };

        // IRC has no multi-line messages, so every line carries the sender
        let text = decode_slack_entities(&event.text)
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(|line| format!("<{}> {}", event.sender, line))
            .collect::<Vec<_>>()
            .join("\n");
        if text.is_empty() {
            debug!("Empty message in {}, not relaying", slack_channel);
            return;
        }

        debug!("Relaying {} -> {}", slack_channel, irc_channel);
        self.irc.send(irc_channel, &text).await;
    }

    async fn handle_irc(&self, event: IrcMessageEvent) {
        let Some(slack_channel) = self.mapping.slack_for(&event.channel) else {
            debug!("IRC channel {} has no Slack mapping, not relaying", event.channel);
            return;
        };

        debug!("Relaying {} -> {}", event.channel, slack_channel);
        match event.kind {
            IrcMessageKind::Message => {
                self.slack
                    .send_as_user(slack_channel, &event.nick, &event.text)
                    .await
            }
            IrcMessageKind::Action => {
                if event.text.trim().is_empty() {
                    debug!("Empty action from {}, not relaying", event.nick);
                    return;
                }
                let text = format!("_{}_", event.text);
                self.slack
                    .send_as_user(slack_channel, &event.nick, &text)
                    .await
            }
            IrcMessageKind::ServerNotice => self.slack.send_as_bot(slack_channel, &event.text).await,
        }
    }

    /// Drain both event streams until one of them ends.
    ///
    /// Each stream is processed in order; the two run concurrently.
    pub async fn run(
        &self,
        slack_events: mpsc::Receiver<InboundEvent>,
        irc_events: mpsc::Receiver<InboundEvent>,
    ) {
        tokio::select! {
            _ = self.pump("Slack", slack_events) => {}
            _ = self.pump("IRC", irc_events) => {}
        }
    }

    async fn pump(&self, source: &str, mut events: mpsc::Receiver<InboundEvent>) {
        while let Some(event) = events.recv().await {
            self.handle(event).await;
        }
        info!("{} event stream ended", source);
    }
}
