//! Protocol-neutral inbound events

use crate::channel::{IrcChannelName, SlackChannelId, SlackChannelName};

/// A message posted in a Slack channel
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlackMessageEvent {
    /// Raw channel ID from the event payload
    pub channel_id: SlackChannelId,
    /// Channel name resolved through the registry; `None` when the channel
    /// is not tracked by the bridge
    pub channel: Option<SlackChannelName>,
    /// Display name of the sender
    pub sender: String,
    /// Message text as Slack sent it (still entity-escaped)
    pub text: String,
}

/// Kind of an IRC message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IrcMessageKind {
    /// Plain PRIVMSG
    #[default]
    Message,
    /// CTCP ACTION (`/me`)
    Action,
    /// NOTICE sent by the server or a service rather than a user
    ServerNotice,
}

/// A message posted in an IRC channel
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IrcMessageEvent {
    pub channel: IrcChannelName,
    pub nick: String,
    pub text: String,
    pub kind: IrcMessageKind,
}

/// Event received from either side of the bridge
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundEvent {
    Slack(SlackMessageEvent),
    Irc(IrcMessageEvent),
}

impl From<SlackMessageEvent> for InboundEvent {
    fn from(event: SlackMessageEvent) -> Self {
        Self::Slack(event)
    }
}

impl From<IrcMessageEvent> for InboundEvent {
    fn from(event: IrcMessageEvent) -> Self {
        Self::Irc(event)
    }
}
