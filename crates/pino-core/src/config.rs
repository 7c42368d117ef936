//! Configuration management
//!
//! 設定は以下の優先順位で読み込まれます:
//! 1. 環境変数 (`SLACK_TOKEN`, `SLACK_APP_TOKEN`, `IRC_SERVER`, `IRC_NICKNAME`)
//! 2. 設定ファイル (`pino.toml` / `pino.yaml`)
//!
//! 設定ファイル内では `${VAR_NAME}` 形式で環境変数を展開できます。
//! キーは snake_case と従来の PascalCase (`IRC`, `Nickname`, `ChannelMapping` など)
//! の両方を受け付けます。

use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::channel::{ChannelMapping, IrcChannelKey, IrcChannelName, SlackChannelName};
use crate::error::{Error, Result};

/// Environment variable naming an explicit config file
pub const CONFIG_PATH_ENV: &str = "PINO_CONFIG";

/// Files tried by [`Config::load`] when `PINO_CONFIG` is not set
pub const DEFAULT_CONFIG_FILES: [&str; 3] = ["pino.toml", "pino.yaml", "pino.yml"];

const DEFAULT_IRC_PORT: u16 = 6667;
const DEFAULT_IRC_SSL_PORT: u16 = 6697;

/// IRC connection configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IrcConfig {
    /// Nickname the bridge uses on IRC
    #[serde(default, alias = "Nickname")]
    pub nickname: String,

    /// Real name sent with USER (defaults to the nickname)
    #[serde(default, alias = "Name")]
    pub name: String,

    /// Server address, `host` or `host:port`
    #[serde(default, alias = "Server")]
    pub server: String,

    /// Connect with TLS
    #[serde(default, alias = "IsSSL")]
    pub is_ssl: bool,

    /// Channels to join, with an optional key each
    #[serde(default, alias = "Channels")]
    pub channels: BTreeMap<IrcChannelName, Option<IrcChannelKey>>,
}

impl IrcConfig {
    /// Split `server` into host and port.
    ///
    /// The port defaults to 6697 with TLS and 6667 without.
    pub fn server_address(&self) -> Result<(String, u16)> {
        let server = self.server.trim();
        if server.is_empty() {
            return Err(Error::Config("IRC server must be defined".to_string()));
        }

        let default_port = if self.is_ssl {
            DEFAULT_IRC_SSL_PORT
        } else {
            DEFAULT_IRC_PORT
        };

        let strip = |host: &str| host.trim_start_matches('[').trim_end_matches(']').to_string();

        match server.rsplit_once(':') {
            Some((host, port)) if !host.contains(':') || host.ends_with(']') => {
                let port = port.parse::<u16>().map_err(|_| {
                    Error::Config(format!("Invalid port in IRC server address {}", server))
                })?;
                Ok((strip(host), port))
            }
            _ => Ok((strip(server), default_port)),
        }
    }

    /// Real name, falling back to the nickname
    pub fn real_name(&self) -> &str {
        if self.name.is_empty() {
            &self.nickname
        } else {
            &self.name
        }
    }
}

/// Slack connection configuration
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct SlackConfig {
    /// Slack user that owns the bridge
    #[serde(default, alias = "Owner")]
    pub owner: String,

    /// Bot token (`xoxb-...`)
    #[serde(default, alias = "Token")]
    pub token: String,

    /// App-level token (`xapp-...`) for Socket Mode
    #[serde(default, alias = "AppToken")]
    pub app_token: Option<String>,

    /// Channels the bridge is present in, with a free-form description
    #[serde(default, alias = "Channels")]
    pub channels: BTreeMap<SlackChannelName, Option<String>>,
}

impl fmt::Debug for SlackConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SlackConfig")
            .field("owner", &self.owner)
            .field("token", &"[REDACTED]")
            .field("app_token", &self.app_token.as_ref().map(|_| "[REDACTED]"))
            .field("channels", &self.channels)
            .finish()
    }
}

/// Main configuration for the bridge
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default, alias = "IRC")]
    pub irc: IrcConfig,

    #[serde(default, alias = "Slack")]
    pub slack: SlackConfig,

    /// Slack channel -> IRC channel
    #[serde(default, alias = "ChannelMapping")]
    pub channel_mapping: ChannelMapping,
}

impl Config {
    /// 設定ファイルから環境変数を展開する
    ///
    /// `${VAR_NAME}` 形式の文字列を環境変数の値に置換します。
    /// 環境変数が存在しない場合は空文字列になります。
    fn expand_env_vars(value: &str) -> String {
        let mut result = String::with_capacity(value.len());
        let mut chars = value.chars().peekable();

        while let Some(c) = chars.next() {
            if c == '$' && chars.peek() == Some(&'{') {
                chars.next(); // '{' を消費

                let mut var_name = String::new();
                for c in chars.by_ref() {
                    if c == '}' {
                        break;
                    }
                    var_name.push(c);
                }

                if let Ok(env_value) = std::env::var(&var_name) {
                    result.push_str(&env_value);
                }
            } else {
                result.push(c);
            }
        }

        result
    }

    /// 設定ファイルを読み込む
    ///
    /// 拡張子で形式を判定します (`.yaml` / `.yml` は YAML、それ以外は TOML)。
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!(
                "Unable to read config file from {}: {}",
                path.display(),
                e
            ))
        })?;

        let is_yaml = matches!(
            path.extension().and_then(|ext| ext.to_str()),
            Some("yaml") | Some("yml")
        );

        let config = if is_yaml {
            Self::from_yaml_str(&content)
        } else {
            Self::from_toml_str(&content)
        };

        config.map_err(|e| match e {
            Error::Config(msg) => Error::Config(format!(
                "{} (config file {})",
                msg,
                path.display()
            )),
            other => other,
        })
    }

    /// TOML 文字列から設定を読み込む
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let expanded = Self::expand_env_vars(content);
        let config: Config = toml::from_str(&expanded)
            .map_err(|e| Error::Config(format!("Unable to parse TOML: {}", e)))?;
        config.finish()
    }

    /// YAML 文字列から設定を読み込む
    pub fn from_yaml_str(content: &str) -> Result<Self> {
        let expanded = Self::expand_env_vars(content);
        let config: Config = serde_yaml::from_str(&expanded)
            .map_err(|e| Error::Config(format!("Unable to parse YAML: {}", e)))?;
        config.finish()
    }

    /// デフォルトパスから設定を読み込む
    ///
    /// 以下の順序で設定ファイルを探します:
    /// 1. 環境変数 `PINO_CONFIG`
    /// 2. `./pino.toml`, `./pino.yaml`, `./pino.yml`
    pub fn load() -> Result<Self> {
        if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
            if !path.is_empty() {
                return Self::from_file(path);
            }
        }

        for candidate in DEFAULT_CONFIG_FILES {
            if Path::new(candidate).exists() {
                return Self::from_file(candidate);
            }
        }

        Err(Error::Config(format!(
            "No configuration file found (set {} or create one of {})",
            CONFIG_PATH_ENV,
            DEFAULT_CONFIG_FILES.join(", ")
        )))
    }

    fn finish(mut self) -> Result<Self> {
        self.apply_env_overrides();
        self.normalize();
        self.validate()?;
        Ok(self)
    }

    /// 環境変数で設定を上書きする
    fn apply_env_overrides(&mut self) {
        let non_empty = |name: &str| std::env::var(name).ok().filter(|v| !v.is_empty());

        if let Some(token) = non_empty("SLACK_TOKEN") {
            self.slack.token = token;
        }
        if let Some(token) = non_empty("SLACK_APP_TOKEN") {
            self.slack.app_token = Some(token);
        }
        if let Some(server) = non_empty("IRC_SERVER") {
            self.irc.server = server;
        }
        if let Some(nickname) = non_empty("IRC_NICKNAME") {
            self.irc.nickname = nickname;
        }
    }

    /// Empty keys and tokens mean "not set"
    fn normalize(&mut self) {
        for key in self.irc.channels.values_mut() {
            if key.as_ref().is_some_and(|k| k.is_empty()) {
                *key = None;
            }
        }

        if self.slack.app_token.as_deref().is_some_and(str::is_empty) {
            self.slack.app_token = None;
        }
    }

    /// Check the invariants the relay relies on
    pub fn validate(&self) -> Result<()> {
        if self.irc.nickname.trim().is_empty() {
            return Err(Error::Config("IRC nickname must be defined".to_string()));
        }
        self.irc.server_address()?;

        for name in self.irc.channels.keys() {
            if !name.is_channel() {
                return Err(Error::Config(format!(
                    "IRC channel {} must start with '#' or '&'",
                    name
                )));
            }
        }

        for name in self.slack.channels.keys() {
            if !name.as_str().starts_with('#') {
                return Err(Error::Config(format!(
                    "Slack channel {} must start with '#'",
                    name
                )));
            }
        }

        for (slack, irc) in self.channel_mapping.pairs() {
            if !slack.as_str().starts_with('#') {
                return Err(Error::Config(format!(
                    "Mapped Slack channel {} must start with '#'",
                    slack
                )));
            }
            if !irc.is_channel() {
                return Err(Error::Config(format!(
                    "Mapped IRC channel {} must start with '#' or '&'",
                    irc
                )));
            }
        }

        debug!(
            "Configuration validated: {} channel mapping(s)",
            self.channel_mapping.len()
        );
        Ok(())
    }

    /// IRC channels to join: the configured channels plus every mapping
    /// target, each once (case-insensitively), with its key if configured.
    pub fn irc_join_list(&self) -> Vec<(IrcChannelName, Option<IrcChannelKey>)> {
        let mut seen = HashSet::new();
        let mut joins = Vec::new();

        for (name, key) in &self.irc.channels {
            if seen.insert(name.folded()) {
                joins.push((name.clone(), key.clone()));
            }
        }

        let mut targets: Vec<_> = self.channel_mapping.irc_channels().collect();
        targets.sort();
        for name in targets {
            if seen.insert(name.folded()) {
                joins.push((name.clone(), None));
            }
        }

        joins
    }

    /// Slack channels the registry keeps: mapping keys plus `slack.channels`
    pub fn tracked_slack_channels(&self) -> HashSet<SlackChannelName> {
        self.channel_mapping
            .slack_channels()
            .chain(self.slack.channels.keys())
            .cloned()
            .collect()
    }
}
