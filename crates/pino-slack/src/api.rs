//! Slack Web API client
//!
//! Communicates with Slack Web API

use reqwest::Client;
use serde::de::DeserializeOwned;
use tracing::{debug, info};

use crate::error::{Result, SlackError};
use crate::types::*;

/// Default Slack Web API endpoint
pub const SLACK_API_BASE: &str = "https://slack.com/api";

/// Channel types the bridge can relay
const CONVERSATION_TYPES: &str = "public_channel,private_channel";

/// Slack Web API client
#[derive(Clone)]
pub struct SlackApiClient {
    client: Client,
    bot_token: String,
    base_url: String,
}

impl SlackApiClient {
    /// Create a new Slack API client
    pub fn new(bot_token: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .map_err(SlackError::HttpError)?;

        Ok(Self {
            client,
            bot_token: bot_token.to_string(),
            base_url: SLACK_API_BASE.to_string(),
        })
    }

    /// Point the client at a different API endpoint
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Add authorization header
    fn add_auth(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        request.bearer_auth(&self.bot_token)
    }

    /// Decode a Slack response envelope, failing when `ok` is false
    async fn read_response<T: DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<SlackResponse<T>> {
        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(SlackError::ApiError(format!("{}: {}", status, error_text)));
        }

        let result: SlackResponse<T> = response
            .json()
            .await
            .map_err(|e| SlackError::ParseError(e.to_string()))?;

        if !result.ok {
            return Err(SlackError::ApiError(
                result.error.unwrap_or_else(|| "Unknown error".to_string()),
            ));
        }

        Ok(result)
    }

    fn into_data<T>(result: SlackResponse<T>) -> Result<T> {
        result
            .data
            .ok_or_else(|| SlackError::ParseError("Response body missing expected fields".to_string()))
    }

    /// Test authentication
    pub async fn auth_test(&self) -> Result<AuthTestResponse> {
        let url = format!("{}/auth.test", self.base_url);

        debug!("Testing Slack authentication");

        let response = self.add_auth(self.client.post(&url)).send().await?;
        let auth = Self::into_data(Self::read_response::<AuthTestResponse>(response).await?)?;

        info!("Slack auth test successful for team: {}", auth.team);
        Ok(auth)
    }

    /// Post a message to a channel
    pub async fn post_message(&self, message: &PostMessage) -> Result<PostMessageResponse> {
        let url = format!("{}/chat.postMessage", self.base_url);

        debug!("Posting message to channel: {}", message.channel);

        let response = self
            .add_auth(self.client.post(&url).json(message))
            .send()
            .await?;

        let result = Self::read_response::<PostMessageResponse>(response).await?;
        Self::into_data(result)
    }

    /// Get every channel visible to the bot, following pagination cursors
    pub async fn conversations_list(&self) -> Result<Vec<Conversation>> {
        let url = format!("{}/conversations.list", self.base_url);
        let mut channels = Vec::new();
        let mut cursor: Option<String> = None;

        loop {
            let mut params = vec![
                ("limit", "200"),
                ("exclude_archived", "true"),
                ("types", CONVERSATION_TYPES),
            ];
            if let Some(cursor) = cursor.as_deref() {
                params.push(("cursor", cursor));
            }

            debug!("Getting conversations list (cursor: {:?})", cursor);

            let response = self
                .add_auth(self.client.get(&url).query(&params))
                .send()
                .await?;

            let result = Self::read_response::<ConversationsListResponse>(response).await?;
            let next_cursor = result
                .response_metadata
                .as_ref()
                .and_then(|m| m.next_cursor.clone())
                .filter(|c| !c.is_empty());

            channels.extend(Self::into_data(result)?.channels);

            match next_cursor {
                Some(next) => cursor = Some(next),
                None => break,
            }
        }

        Ok(channels)
    }

    /// Get user info
    pub async fn users_info(&self, user_id: &str) -> Result<SlackUser> {
        let url = format!("{}/users.info", self.base_url);

        debug!("Getting user info for: {}", user_id);

        let response = self
            .add_auth(self.client.get(&url).query(&[("user", user_id)]))
            .send()
            .await?;

        let result = Self::read_response::<UsersInfoResponse>(response).await?;
        Ok(Self::into_data(result)?.user)
    }

    /// Open a Socket Mode connection and return its WebSocket URL.
    ///
    /// Authenticated with the app-level token, not the bot token.
    pub async fn apps_connections_open(&self, app_token: &str) -> Result<String> {
        let url = format!("{}/apps.connections.open", self.base_url);

        let response = self
            .client
            .post(&url)
            .bearer_auth(app_token)
            .send()
            .await?;

        let result = Self::read_response::<ConnectionsOpenResponse>(response).await?;
        Ok(Self::into_data(result)?.url)
    }
}
