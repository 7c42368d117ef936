//! pino-relay: message relay between Slack and IRC
//!
//! 両側のコネクタから受信したイベントをチャンネルマッピングに従って
//! 反対側へ転送します。

pub mod bridge;
pub mod engine;
pub mod error;

pub use bridge::Bridge;
pub use engine::RelayEngine;
pub use error::{RelayError, Result};
