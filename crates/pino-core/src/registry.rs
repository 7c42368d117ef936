//! Runtime index between Slack channel names and connection-scoped IDs

use std::collections::{HashMap, HashSet};

use tracing::debug;

use crate::channel::{ChannelMapping, SlackChannelId, SlackChannelName};

/// Bidirectional Slack channel name <-> ID lookup.
///
/// Rebuilt every time a Slack connection is established. Only channels the
/// bridge is configured for are recorded; everything else is filtered out.
#[derive(Debug, Clone, Default)]
pub struct ChannelRegistry {
    name_to_id: HashMap<SlackChannelName, SlackChannelId>,
    id_to_name: HashMap<SlackChannelId, SlackChannelName>,
}

impl ChannelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the registry from the live channel list, keeping only channels
    /// that appear as keys in `mapping`.
    ///
    /// `channels` yields `(id, name)` pairs as the Slack API returns them,
    /// without the leading `#`.
    pub fn build<'a, I>(mapping: &ChannelMapping, channels: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        Self::build_filtered(channels, |name| mapping.contains_slack(name.as_str()))
    }

    /// Same as [`ChannelRegistry::build`] but filtered by an explicit set of names
    pub fn build_tracked<'a, I>(tracked: &HashSet<SlackChannelName>, channels: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        Self::build_filtered(channels, |name| tracked.contains(name))
    }

    fn build_filtered<'a, I, F>(channels: I, keep: F) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
        F: Fn(&SlackChannelName) -> bool,
    {
        let mut registry = Self::new();

        for (id, name) in channels {
            let name = SlackChannelName::from_api_name(name);
            if !keep(&name) {
                continue;
            }

            let id = SlackChannelId::from(id);
            registry.name_to_id.insert(name.clone(), id.clone());
            registry.id_to_name.insert(id, name);
        }

        debug!("Built Slack channel registry with {} entries", registry.len());
        registry
    }

    pub fn id_for(&self, name: &SlackChannelName) -> Option<&SlackChannelId> {
        self.name_to_id.get(name)
    }

    pub fn name_for(&self, id: &SlackChannelId) -> Option<&SlackChannelName> {
        self.id_to_name.get(id)
    }

    pub fn len(&self) -> usize {
        self.name_to_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.name_to_id.is_empty()
    }

    /// Name -> ID pairs sorted by name, for logging
    pub fn entries(&self) -> Vec<(&SlackChannelName, &SlackChannelId)> {
        let mut entries: Vec<_> = self.name_to_id.iter().collect();
        entries.sort();
        entries
    }
}
