//! Slack API types

use serde::{Deserialize, Serialize};

/// Slack user info
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlackUser {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub real_name: Option<String>,
    #[serde(default)]
    pub profile: Option<UserProfile>,
}

impl SlackUser {
    /// Name shown for this user: profile display name, then real name, then handle
    pub fn display_name(&self) -> &str {
        fn non_empty(s: &Option<String>) -> Option<&str> {
            s.as_deref().filter(|s| !s.is_empty())
        }

        self.profile
            .as_ref()
            .and_then(|p| non_empty(&p.display_name).or_else(|| non_empty(&p.real_name)))
            .or_else(|| non_empty(&self.real_name))
            .unwrap_or(self.name.as_str())
    }
}

/// User profile details
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub real_name: Option<String>,
}

/// Slack conversation (channel) info
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    pub id: String,
    pub name: String,
}

/// Slack event payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlackEvent {
    #[serde(rename = "type")]
    pub event_type: String,
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default)]
    pub channel: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub bot_id: Option<String>,
    #[serde(default)]
    pub subtype: Option<String>,
}

impl SlackEvent {
    /// Whether this is a message written by a person.
    ///
    /// Bot posts (including the bridge's own impersonated posts) and edit,
    /// join or delete notifications are not.
    pub fn is_user_message(&self) -> bool {
        if self.event_type != "message" || self.bot_id.is_some() {
            return false;
        }

        matches!(
            self.subtype.as_deref(),
            None | Some("thread_broadcast") | Some("me_message") | Some("file_share")
        )
    }
}

/// Socket Mode envelope
#[derive(Debug, Clone, Deserialize)]
pub struct SocketEnvelope {
    #[serde(rename = "type")]
    pub envelope_type: Option<String>,
    #[serde(default)]
    pub envelope_id: Option<String>,
    #[serde(default)]
    pub payload: Option<serde_json::Value>,
    /// Reason given with `disconnect` envelopes
    #[serde(default)]
    pub reason: Option<String>,
}

/// Message to send
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PostMessage {
    pub channel: String,
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub as_user: Option<bool>,
}

/// API response wrapper
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlackResponse<T> {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_metadata: Option<ResponseMetadata>,
    #[serde(flatten)]
    pub data: Option<T>,
}

/// Response metadata (for pagination, etc.)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseMetadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_cursor: Option<String>,
}

/// Auth test response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthTestResponse {
    pub team: String,
    /// Bot user name
    pub user: String,
    pub user_id: String,
}

/// Conversations list response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationsListResponse {
    pub channels: Vec<Conversation>,
}

/// users.info response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UsersInfoResponse {
    pub user: SlackUser,
}

/// apps.connections.open response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionsOpenResponse {
    pub url: String,
}

/// Post message response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostMessageResponse {
    pub ts: String,
    pub channel: String,
}
