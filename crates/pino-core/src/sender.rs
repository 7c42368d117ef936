//! Outbound send operations implemented by the protocol connectors
//!
//! Sends are fire-and-forget: implementations log failures and never return
//! them, so a dropped message cannot stop a relay loop.

use async_trait::async_trait;

use crate::channel::{IrcChannelName, SlackChannelName};

/// Posting side of the Slack connector
#[async_trait]
pub trait SlackSender: Send + Sync {
    /// Post `text` to `channel` impersonating `display_name`
    async fn send_as_user(&self, channel: &SlackChannelName, display_name: &str, text: &str);

    /// Post `text` to `channel` with the bridge's own identity
    async fn send_as_bot(&self, channel: &SlackChannelName, text: &str);
}

/// Posting side of the IRC connector
#[async_trait]
pub trait IrcSender: Send + Sync {
    /// Post raw `text` to `channel`
    async fn send(&self, channel: &IrcChannelName, text: &str);
}
