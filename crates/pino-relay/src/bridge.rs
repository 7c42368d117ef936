//! Top-level bridge
//!
//! Owns both connectors and the channel mapping, connects them and drives
//! the relay engine.

use std::sync::Arc;

use tracing::info;

use pino_core::{ChannelMapping, Config};
use pino_irc::IrcConnector;
use pino_slack::SlackConnector;

use crate::engine::RelayEngine;
use crate::error::{RelayError, Result};

/// One Slack workspace bridged to one IRC network
pub struct Bridge {
    mapping: Arc<ChannelMapping>,
    slack: SlackConnector,
    irc: IrcConnector,
}

impl Bridge {
    /// Build both connectors from a validated configuration
    pub fn new(config: &Config) -> Result<Self> {
        config.validate()?;

        Ok(Self {
            mapping: Arc::new(config.channel_mapping.clone()),
            slack: SlackConnector::new(config)?,
            irc: IrcConnector::new(config)?,
        })
    }

    /// Connect both sides and relay until one event stream ends.
    ///
    /// A Slack setup failure (for example an unreadable channel list) is
    /// returned before IRC is touched.
    pub async fn run(self) -> Result<()> {
        let Bridge {
            mapping,
            mut slack,
            mut irc,
        } = self;

        slack.connect().await?;
        info!("Connected to Slack");

        irc.connect()?;

        let slack_events = slack.events().ok_or(RelayError::EventsTaken("Slack"))?;
        let irc_events = irc.events().ok_or(RelayError::EventsTaken("IRC"))?;

        for (slack_channel, irc_channel) in mapping.pairs() {
            info!("Relaying {} <-> {}", slack_channel, irc_channel);
        }

        let engine = RelayEngine::new(mapping, Arc::new(slack), Arc::new(irc));
        engine.run(slack_events, irc_events).await;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> Config {
        let mut config = Config::default();
        config.irc.nickname = "pino".to_string();
        config.irc.server = "127.0.0.1:6667".to_string();
        config.slack.token = "xoxb-test".to_string();
        config.slack.app_token = Some("xapp-test".to_string());
        config.channel_mapping = ChannelMapping::new([("#general", "#irc-general")]).unwrap();
        config
    }

    #[test]
    fn test_new_builds_connectors() {
        assert!(Bridge::new(&config()).is_ok());
    }

    #[test]
    fn test_new_requires_slack_token() {
        let mut config = config();
        config.slack.token.clear();

        assert!(matches!(
            Bridge::new(&config),
            Err(RelayError::Slack(pino_slack::SlackError::TokenNotConfigured))
        ));
    }

    #[test]
    fn test_new_rejects_invalid_config() {
        let mut config = config();
        config.irc.nickname.clear();

        assert!(matches!(Bridge::new(&config), Err(RelayError::Core(_))));
    }
}
