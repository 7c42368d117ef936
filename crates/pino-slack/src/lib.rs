//! pino-slack: Slack side of the bridge
//!
//! Slack Web API クライアントと Socket Mode 接続を使用して、
//! Slack チャンネルのメッセージを受信し、ユーザー名とアイコンを指定して投稿します。

pub mod api;
pub mod avatar;
pub mod connector;
pub mod error;
pub mod socket;
pub mod types;

pub use api::SlackApiClient;
pub use avatar::generate_avatar_url;
pub use connector::SlackConnector;
pub use error::{Result, SlackError};
