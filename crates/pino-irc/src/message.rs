//! Bridge-side view of IRC messages
//!
//! Wire parsing and serialization come from `irc-proto`; this module only
//! decides which messages are relayed and how outbound text is cut into
//! PRIVMSG commands.

use irc_proto::{Command, Message, Prefix};

use pino_core::{IrcChannelKey, IrcChannelName, IrcMessageEvent, IrcMessageKind};

/// Longest line the server accepts, without the trailing CRLF
pub const MAX_LINE_LEN: usize = 510;

const CTCP_DELIM: char = '\x01';

/// Nick of a `nick!user@host` prefix; `None` for server prefixes
fn sender_nick(message: &Message) -> Option<&str> {
    match message.prefix.as_ref()? {
        Prefix::Nickname(nick, _, _) => Some(nick.as_str()),
        _ => None,
    }
}

/// Convert a channel PRIVMSG or server NOTICE into a relay event.
///
/// Private messages, CTCP requests other than ACTION, user notices and
/// anything sent by `own_nick` yield `None`.
pub fn to_event(message: &Message, own_nick: &str) -> Option<IrcMessageEvent> {
    match &message.command {
        Command::PRIVMSG(target, text) => {
            let channel = IrcChannelName::from(target.as_str());
            if !channel.is_channel() {
                return None;
            }

            let nick = sender_nick(message)?;
            if nick.eq_ignore_ascii_case(own_nick) {
                return None;
            }

            let (kind, text) = match ctcp_action(text) {
                Some(action) => (IrcMessageKind::Action, action),
                None if text.starts_with(CTCP_DELIM) => return None,
                None => (IrcMessageKind::Message, text.as_str()),
            };

            Some(IrcMessageEvent {
                channel,
                nick: nick.to_string(),
                text: text.to_string(),
                kind,
            })
        }
        Command::NOTICE(target, text) => {
            let channel = IrcChannelName::from(target.as_str());
            let Some(Prefix::ServerName(server)) = message.prefix.as_ref() else {
                return None;
            };
            if !channel.is_channel() {
                return None;
            }

            Some(IrcMessageEvent {
                channel,
                nick: server.clone(),
                text: text.clone(),
                kind: IrcMessageKind::ServerNotice,
            })
        }
        _ => None,
    }
}

/// Body of a CTCP ACTION (`\x01ACTION waves\x01` -> `waves`)
pub fn ctcp_action(text: &str) -> Option<&str> {
    let body = text.strip_prefix(CTCP_DELIM)?;
    let body = body.strip_suffix(CTCP_DELIM).unwrap_or(body);

    if body == "ACTION" {
        return Some("");
    }
    body.strip_prefix("ACTION ")
}

/// JOIN for a configured channel; an empty key is not sent
pub fn join(channel: &IrcChannelName, key: Option<&IrcChannelKey>) -> Message {
    let key = key.filter(|k| !k.is_empty()).map(ToString::to_string);
    Command::JOIN(channel.to_string(), key, None).into()
}

/// PRIVMSG commands for `text`: one per non-blank line, each cut to fit
/// [`MAX_LINE_LEN`] on a char boundary.
pub fn privmsg_lines(channel: &IrcChannelName, text: &str) -> Vec<Message> {
    let head_len = "PRIVMSG  :".len() + channel.as_str().len();
    let budget = MAX_LINE_LEN.saturating_sub(head_len);

    text.split(['\r', '\n'])
        .filter(|line| !line.trim().is_empty())
        .map(|line| {
            let line = truncate_to_boundary(line, budget);
            Command::PRIVMSG(channel.to_string(), line.to_string()).into()
        })
        .collect()
}

fn truncate_to_boundary(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }

    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}
