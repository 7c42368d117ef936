//! Error types for pino-core

use thiserror::Error;

/// Main error type for pino-core
#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Connection setup error: {0}")]
    ConnectionSetup(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

/// Result type alias for pino-core
pub type Result<T> = std::result::Result<T, Error>;
