//! エラー型定義 (pino-irc)

use thiserror::Error;

/// pino-irc のエラー型
#[derive(Error, Debug)]
pub enum IrcError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("IRC protocol error: {0}")]
    Protocol(#[from] irc_proto::error::ProtocolError),

    #[error("TLS error: {0}")]
    Tls(String),

    #[error("Invalid IRC server address: {0}")]
    InvalidServer(String),

    #[error("Connection closed by IRC server")]
    Disconnected,

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Result 型エイリアス
pub type Result<T> = std::result::Result<T, IrcError>;

impl From<IrcError> for pino_core::Error {
    fn from(e: IrcError) -> Self {
        match e {
            IrcError::Config(msg) | IrcError::InvalidServer(msg) => pino_core::Error::Config(msg),
            IrcError::Io(e) => pino_core::Error::Io(e),
            other => pino_core::Error::ConnectionSetup(other.to_string()),
        }
    }
}
