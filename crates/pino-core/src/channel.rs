//! Channel identifiers and the static Slack <-> IRC channel mapping

use std::borrow::Borrow;
use std::collections::{BTreeMap, HashMap};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

macro_rules! string_newtype {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }

            pub fn is_empty(&self) -> bool {
                self.0.is_empty()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }

        impl Borrow<str> for $name {
            fn borrow(&self) -> &str {
                &self.0
            }
        }
    };
}

string_newtype!(
    /// Slack channel name including the leading `#`, e.g. `"#general"`
    SlackChannelName
);

string_newtype!(
    /// Connection-scoped Slack channel ID, e.g. `"C024BE91L"`
    SlackChannelId
);

string_newtype!(
    /// IRC channel name, e.g. `"#rust"`
    IrcChannelName
);

string_newtype!(
    /// Optional IRC channel password used when joining
    IrcChannelKey
);

impl SlackChannelName {
    /// Build a channel name from the Slack API form, which omits the `#`
    pub fn from_api_name(name: &str) -> Self {
        if name.starts_with('#') {
            Self(name.to_string())
        } else {
            Self(format!("#{}", name))
        }
    }
}

impl IrcChannelName {
    /// Case-folded form used for lookups. IRC channel names are case-insensitive.
    pub fn folded(&self) -> String {
        self.0.to_ascii_lowercase()
    }

    /// Whether this looks like a channel target rather than a nickname
    pub fn is_channel(&self) -> bool {
        self.0.starts_with('#') || self.0.starts_with('&')
    }
}

/// Static one-to-one mapping between Slack channels and IRC channels.
///
/// Holds both directions so that either side resolves in O(1). The reverse
/// index is keyed by the case-folded IRC name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    try_from = "BTreeMap<SlackChannelName, IrcChannelName>",
    into = "BTreeMap<SlackChannelName, IrcChannelName>"
)]
pub struct ChannelMapping {
    forward: HashMap<SlackChannelName, IrcChannelName>,
    reverse: HashMap<String, SlackChannelName>,
}

impl ChannelMapping {
    /// Build a mapping from `(slack, irc)` pairs.
    ///
    /// Fails when a Slack channel appears twice or when two Slack channels
    /// target the same IRC channel.
    pub fn new<I, S, C>(pairs: I) -> Result<Self>
    where
        I: IntoIterator<Item = (S, C)>,
        S: Into<SlackChannelName>,
        C: Into<IrcChannelName>,
    {
        let mut mapping = Self::default();

        for (slack, irc) in pairs {
            let slack = slack.into();
            let irc = irc.into();

            if mapping.forward.contains_key(&slack) {
                return Err(Error::Config(format!(
                    "Slack channel {} is mapped more than once",
                    slack
                )));
            }

            if let Some(existing) = mapping.reverse.get(&irc.folded()) {
                return Err(Error::Config(format!(
                    "IRC channel {} is mapped from both {} and {}",
                    irc, existing, slack
                )));
            }

            mapping.reverse.insert(irc.folded(), slack.clone());
            mapping.forward.insert(slack, irc);
        }

        Ok(mapping)
    }

    /// IRC channel a Slack channel relays to
    pub fn irc_for(&self, slack: &SlackChannelName) -> Option<&IrcChannelName> {
        self.forward.get(slack)
    }

    /// Slack channel an IRC channel relays to
    pub fn slack_for(&self, irc: &IrcChannelName) -> Option<&SlackChannelName> {
        self.reverse.get(&irc.folded())
    }

    pub fn contains_slack(&self, slack: &str) -> bool {
        self.forward.contains_key(slack)
    }

    pub fn slack_channels(&self) -> impl Iterator<Item = &SlackChannelName> {
        self.forward.keys()
    }

    pub fn irc_channels(&self) -> impl Iterator<Item = &IrcChannelName> {
        self.forward.values()
    }

    /// Pairs sorted by Slack channel name
    pub fn pairs(&self) -> Vec<(&SlackChannelName, &IrcChannelName)> {
        let mut pairs: Vec<_> = self.forward.iter().collect();
        pairs.sort();
        pairs
    }

    pub fn len(&self) -> usize {
        self.forward.len()
    }

    pub fn is_empty(&self) -> bool {
        self.forward.is_empty()
    }
}

impl TryFrom<BTreeMap<SlackChannelName, IrcChannelName>> for ChannelMapping {
    type Error = Error;

    fn try_from(map: BTreeMap<SlackChannelName, IrcChannelName>) -> Result<Self> {
        Self::new(map)
    }
}

impl From<ChannelMapping> for BTreeMap<SlackChannelName, IrcChannelName> {
    fn from(mapping: ChannelMapping) -> Self {
        mapping.forward.into_iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_api_name_adds_pound() {
        assert_eq!(SlackChannelName::from_api_name("general").as_str(), "#general");
        assert_eq!(SlackChannelName::from_api_name("#general").as_str(), "#general");
    }

    #[test]
    fn test_mapping_lookup_both_directions() {
        let mapping = ChannelMapping::new([("#general", "#irc-general")]).unwrap();

        assert_eq!(
            mapping.irc_for(&"#general".into()),
            Some(&IrcChannelName::from("#irc-general"))
        );
        assert_eq!(
            mapping.slack_for(&"#irc-general".into()),
            Some(&SlackChannelName::from("#general"))
        );
        assert!(mapping.irc_for(&"#random".into()).is_none());
        assert!(mapping.slack_for(&"#elsewhere".into()).is_none());
    }

    #[test]
    fn test_reverse_lookup_ignores_case() {
        let mapping = ChannelMapping::new([("#general", "#Rust")]).unwrap();
        assert_eq!(
            mapping.slack_for(&"#rust".into()),
            Some(&SlackChannelName::from("#general"))
        );
    }

    #[test]
    fn test_duplicate_irc_target_rejected() {
        let result = ChannelMapping::new([("#a", "#irc"), ("#b", "#IRC")]);
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_duplicate_slack_key_rejected() {
        let result = ChannelMapping::new([("#a", "#one"), ("#a", "#two")]);
        assert!(result.is_err());
    }

    #[test]
    fn test_mapping_deserializes_from_toml_table() {
        #[derive(Deserialize)]
        struct Wrapper {
            mapping: ChannelMapping,
        }

        let parsed: Wrapper = toml::from_str(
            r##"
[mapping]
"#general" = "#irc-general"
"#random" = "#irc-random"
"##,
        )
        .unwrap();

        assert_eq!(parsed.mapping.len(), 2);
        let general = SlackChannelName::from("#general");
        let irc_general = IrcChannelName::from("#irc-general");
        assert_eq!(parsed.mapping.pairs()[0], (&general, &irc_general));
    }

    #[test]
    fn test_mapping_deserialize_rejects_shared_target() {
        #[derive(Debug, Deserialize)]
        struct Wrapper {
            #[allow(dead_code)]
            mapping: ChannelMapping,
        }

        let result: std::result::Result<Wrapper, _> = toml::from_str(
            r##"
[mapping]
"#general" = "#irc"
"#random" = "#irc"
"##,
        );
        assert!(result.is_err());
    }
}
