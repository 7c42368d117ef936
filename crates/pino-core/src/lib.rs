//! pino-core: Slack <-> IRC bridge core library
//!
//! 設定の読み込み、チャンネル名の型、チャンネルマッピングとレジストリ、
//! 受信イベント、Slack テキストのデコード、送信トレイトを提供します。

pub mod channel;
pub mod config;
pub mod error;
pub mod event;
pub mod registry;
pub mod sender;
pub mod text;

pub use channel::{ChannelMapping, IrcChannelKey, IrcChannelName, SlackChannelId, SlackChannelName};
pub use config::{Config, IrcConfig, SlackConfig};
pub use error::{Error, Result};
pub use event::{InboundEvent, IrcMessageEvent, IrcMessageKind, SlackMessageEvent};
pub use registry::ChannelRegistry;
pub use sender::{IrcSender, SlackSender};
pub use text::decode_slack_entities;
