//! Error types for pino-relay

use thiserror::Error;

/// Errors that stop the bridge from starting
#[derive(Error, Debug)]
pub enum RelayError {
    #[error("Slack connector error: {0}")]
    Slack(#[from] pino_slack::SlackError),

    #[error("IRC connector error: {0}")]
    Irc(#[from] pino_irc::IrcError),

    #[error(transparent)]
    Core(#[from] pino_core::Error),

    #[error("{0} event stream already taken")]
    EventsTaken(&'static str),
}

/// Result type alias for pino-relay
pub type Result<T> = std::result::Result<T, RelayError>;
