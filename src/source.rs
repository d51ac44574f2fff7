// SPDX-License-Identifier: GPL-3.0-only
// Copyright (C) 2025 Brian Hetro <whee@smaertness.net>

//! Channel dump parsing.
//!
//! A channel dump is a JSON file holding everything needed to export one
//! channel: the guild and channel metadata, lookup tables for mention
//! resolution, and the raw messages in delivery order.
//!
//! # Format Overview
//!
//! - `guild` and `channel` metadata
//! - optional `channels` and `roles` tables mapping ids to names
//! - `messages`, each with raw content and its author, attachments, embeds
//!   and reactions
//!
//! # Example
//!
//! ```
//! use chatjson::source::parse_dump;
//!
//! let json = r#"{
//!     "guild": { "id": "1", "name": "G" },
//!     "channel": { "id": "2", "type": "GuildText", "name": "general" },
//!     "messages": [{
//!         "id": "100",
//!         "timestamp": "2024-01-01T00:00:00+00:00",
//!         "content": "hi",
//!         "author": { "id": "9", "name": "Bob", "discriminator": 7 }
//!     }]
//! }"#;
//!
//! let dump = parse_dump(json).unwrap();
//! assert_eq!(dump.messages.len(), 1);
//! ```

use crate::context::RenderContext;
use crate::model::{Channel, DateRange, Guild, Message};
use serde::Deserialize;
use snafu::prelude::*;
use std::collections::HashMap;

/// Error type for channel dump parsing failures.
#[derive(Debug, Snafu)]
pub enum ParseError {
    /// Failed to parse JSON content.
    #[snafu(display("failed to parse JSON: {source}"))]
    Json {
        /// The underlying JSON parsing error.
        source: serde_json::Error,
    },
}

/// The root structure of a channel dump.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ChannelDump {
    /// The guild the channel belongs to.
    pub guild: Guild,

    /// The channel whose messages were dumped.
    pub channel: Channel,

    /// Channel names by id, used to resolve `<#id>` mentions.
    #[serde(default)]
    pub channels: HashMap<String, String>,

    /// Role names by id, used to resolve `<@&id>` mentions.
    #[serde(default)]
    pub roles: HashMap<String, String>,

    /// Messages in delivery order.
    pub messages: Vec<Message>,
}

impl ChannelDump {
    /// Builds the rendering context for exporting this dump over `date_range`.
    #[must_use]
    pub fn render_context(&self, date_range: DateRange) -> RenderContext {
        RenderContext::new(self.guild.clone(), self.channel.clone(), date_range)
            .with_channel_names(self.channels.clone())
            .with_role_names(self.roles.clone())
    }
}

/// Parses a JSON string into a [`ChannelDump`].
///
/// # Errors
///
/// Returns an error if the JSON is malformed or doesn't match the channel
/// dump schema, including discriminators outside 0-9999.
pub fn parse_dump(json_str: &str) -> Result<ChannelDump, ParseError> {
    serde_json::from_str(json_str).context(JsonSnafu)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ChannelType, MessageType};

    fn dump_json(messages_json: &str) -> String {
        format!(
            r#"{{
                "guild": {{ "id": "1", "name": "G", "iconUrl": "https://example.com/g.png" }},
                "channel": {{ "id": "2", "type": "GuildNews", "name": "news", "topic": "updates" }},
                "channels": {{ "3": "random" }},
                "roles": {{ "4": "mods" }},
                "messages": [{messages_json}]
            }}"#
        )
    }

    fn message_json(id: &str, extra: &str) -> String {
        format!(
            r#"{{
                "id": "{id}",
                "timestamp": "2024-01-01T00:00:00+00:00",
                "content": "hello",
                "author": {{ "id": "9", "name": "Bob", "discriminator": 7 }}
                {extra}
            }}"#
        )
    }

    #[test]
    fn parses_minimal_dump() {
        let json = r#"{
            "guild": { "id": "1", "name": "G" },
            "channel": { "id": "2", "name": "general" },
            "messages": []
        }"#;
        let dump = parse_dump(json).unwrap();

        assert_eq!(dump.guild.name, "G");
        assert!(dump.guild.icon_url.is_none());
        assert_eq!(dump.channel.kind, ChannelType::GuildText);
        assert!(dump.channel.topic.is_none());
        assert!(dump.channels.is_empty());
        assert!(dump.messages.is_empty());
    }

    #[test]
    fn parses_metadata_and_tables() {
        let dump = parse_dump(&dump_json("")).unwrap();

        assert_eq!(dump.guild.icon_url.as_deref(), Some("https://example.com/g.png"));
        assert_eq!(dump.channel.kind, ChannelType::GuildNews);
        assert_eq!(dump.channel.topic.as_deref(), Some("updates"));
        assert_eq!(dump.channels["3"], "random");
        assert_eq!(dump.roles["4"], "mods");
    }

    #[test]
    fn applies_message_defaults() {
        let dump = parse_dump(&dump_json(&message_json("100", ""))).unwrap();
        let message = &dump.messages[0];

        assert_eq!(message.kind, MessageType::Default);
        assert!(message.timestamp_edited.is_none());
        assert!(!message.is_pinned);
        assert!(!message.author.is_bot);
        assert!(message.attachments.is_empty());
        assert!(message.embeds.is_empty());
        assert!(message.reactions.is_empty());
    }

    #[test]
    fn parses_full_message() {
        let extra = r#",
            "type": "ChannelPinnedMessage",
            "timestampEdited": "2024-01-02T00:00:00+00:00",
            "isPinned": true,
            "attachments": [{ "id": "5", "url": "u", "fileName": "f.txt", "fileSizeBytes": 10 }],
            "embeds": [{ "title": "T", "thumbnail": { "url": "t", "width": 1, "height": 2 } }],
            "reactions": [{ "emoji": { "name": "👍" }, "count": 2 }]
        "#;
        let dump = parse_dump(&dump_json(&message_json("100", extra))).unwrap();
        let message = &dump.messages[0];

        assert_eq!(message.kind, MessageType::ChannelPinnedMessage);
        assert!(message.timestamp_edited.is_some());
        assert!(message.is_pinned);
        assert_eq!(message.attachments[0].file_size_bytes, 10);
        assert_eq!(message.embeds[0].title.as_deref(), Some("T"));
        assert_eq!(message.embeds[0].thumbnail.as_ref().unwrap().height, 2);
        assert!(message.embeds[0].footer.is_none());
        assert_eq!(message.reactions[0].count, 2);
        assert!(message.reactions[0].emoji.id.is_none());
    }

    #[test]
    fn preserves_message_order() {
        let messages = [
            message_json("3", ""),
            message_json("1", ""),
            message_json("2", ""),
        ]
        .join(",");
        let dump = parse_dump(&dump_json(&messages)).unwrap();

        let ids: Vec<_> = dump.messages.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, ["3", "1", "2"]);
    }

    #[test]
    fn builds_render_context() {
        let dump = parse_dump(&dump_json("")).unwrap();
        let ctx = dump.render_context(DateRange::default());

        assert_eq!(ctx.guild, dump.guild);
        assert_eq!(ctx.format_markup("<#3> <@&4>", &[]), "#random @mods");
    }

    #[test]
    fn returns_error_for_invalid_json() {
        assert!(parse_dump("not valid json").is_err());
    }

    #[test]
    fn returns_error_for_missing_required_fields() {
        let result = parse_dump(r#"{"guild": {"id": "1", "name": "G"}}"#);
        assert!(result.is_err());
    }

    #[test]
    fn returns_error_for_bad_timestamp() {
        let message = r#"{
            "id": "1",
            "timestamp": "yesterday",
            "author": { "id": "9", "name": "Bob", "discriminator": 7 }
        }"#;
        assert!(parse_dump(&dump_json(message)).is_err());
    }
}
