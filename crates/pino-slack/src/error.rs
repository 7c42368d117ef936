//! エラー型定義 (pino-slack)

use thiserror::Error;

/// pino-slack のエラー型
#[derive(Error, Debug)]
pub enum SlackError {
    #[error("Slack API error: {0}")]
    ApiError(String),

    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("WebSocket error: {0}")]
    WebSocketError(String),

    #[error("Failed to parse response: {0}")]
    ParseError(String),

    #[error("Token must be defined in Slack config")]
    TokenNotConfigured,

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Could not get Slack channels: {0}")]
    ChannelList(String),
}

/// Result 型エイリアス
pub type Result<T> = std::result::Result<T, SlackError>;

impl From<SlackError> for pino_core::Error {
    fn from(e: SlackError) -> Self {
        match e {
            SlackError::TokenNotConfigured | SlackError::ChannelList(_) => {
                pino_core::Error::ConnectionSetup(e.to_string())
            }
            SlackError::Config(msg) => pino_core::Error::Config(msg),
            other => pino_core::Error::Other(other.to_string()),
        }
    }
}
