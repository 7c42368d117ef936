//! pino-irc: IRC side of the bridge
//!
//! TCP / TLS で IRC サーバーに接続し、チャンネルに参加して
//! PRIVMSG を送受信します。メッセージの解析と生成は `irc-proto`
//! に任せ、切断時は自動的に再接続します。

pub mod client;
pub mod connector;
pub mod error;
pub mod message;
pub mod transport;

pub use client::{ClientSettings, IrcClient};
pub use connector::IrcConnector;
pub use error::{IrcError, Result};
