// SPDX-License-Identifier: GPL-3.0-only
// Copyright (C) 2025 Brian Hetro <whee@smaertness.net>

//! Domain records for an exported channel.
//!
//! These types are read-only inputs to the writers. They deserialize from
//! the channel dump format handled by [`crate::source`], using the same
//! camelCase field names the exported document uses.

use chrono::{DateTime, FixedOffset, SecondsFormat};
use serde::{Deserialize, Deserializer, de::Error as _};
use std::fmt;

/// The guild (server) a channel belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Guild {
    /// Snowflake identifier.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Icon image URL, if the guild has one.
    #[serde(default)]
    pub icon_url: Option<String>,
}

/// The kind of channel being exported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize)]
pub enum ChannelType {
    /// A text channel inside a guild.
    #[default]
    GuildText,
    /// A one-to-one direct message channel.
    DirectText,
    /// A group direct message channel.
    DirectGroupText,
    /// A voice channel's text chat.
    GuildVoice,
    /// A channel category.
    GuildCategory,
    /// An announcement channel.
    GuildNews,
    /// A store page channel.
    GuildStore,
}

impl ChannelType {
    /// Returns the canonical name used in exported documents.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::GuildText => "GuildText",
            Self::DirectText => "DirectText",
            Self::DirectGroupText => "DirectGroupText",
            Self::GuildVoice => "GuildVoice",
            Self::GuildCategory => "GuildCategory",
            Self::GuildNews => "GuildNews",
            Self::GuildStore => "GuildStore",
        }
    }
}

impl fmt::Display for ChannelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The channel being exported.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Channel {
    /// Snowflake identifier.
    pub id: String,
    /// Channel kind.
    #[serde(rename = "type", default)]
    pub kind: ChannelType,
    /// Display name.
    pub name: String,
    /// Channel topic, if one is set.
    #[serde(default)]
    pub topic: Option<String>,
}

/// The requested export window.
///
/// Both bounds are exclusive; a missing bound leaves that side open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DateRange {
    /// Only messages strictly after this instant are exported.
    pub after: Option<DateTime<FixedOffset>>,
    /// Only messages strictly before this instant are exported.
    pub before: Option<DateTime<FixedOffset>>,
}

impl DateRange {
    /// Returns `true` if `timestamp` falls inside the window.
    #[must_use]
    pub fn contains(&self, timestamp: &DateTime<FixedOffset>) -> bool {
        self.after.is_none_or(|after| *timestamp > after)
            && self.before.is_none_or(|before| *timestamp < before)
    }
}

/// The kind of a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize)]
pub enum MessageType {
    /// A regular user message.
    #[default]
    Default,
    /// A user was added to a group conversation.
    RecipientAdd,
    /// A user was removed from a group conversation.
    RecipientRemove,
    /// A call was started.
    Call,
    /// The channel was renamed.
    ChannelNameChange,
    /// The channel icon was changed.
    ChannelIconChange,
    /// A message was pinned.
    ChannelPinnedMessage,
    /// A member joined the guild.
    GuildMemberJoin,
}

impl MessageType {
    /// Returns the canonical name used in exported documents.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Default => "Default",
            Self::RecipientAdd => "RecipientAdd",
            Self::RecipientRemove => "RecipientRemove",
            Self::Call => "Call",
            Self::ChannelNameChange => "ChannelNameChange",
            Self::ChannelIconChange => "ChannelIconChange",
            Self::ChannelPinnedMessage => "ChannelPinnedMessage",
            Self::GuildMemberJoin => "GuildMemberJoin",
        }
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A message author or mentioned user.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// Snowflake identifier.
    pub id: String,
    /// Username.
    pub name: String,
    /// Four-digit discriminator, 0 through 9999.
    #[serde(deserialize_with = "deserialize_discriminator")]
    pub discriminator: u16,
    /// Whether the account is a bot.
    #[serde(default)]
    pub is_bot: bool,
    /// Avatar image URL, if known.
    #[serde(default)]
    pub avatar_url: Option<String>,
}

impl User {
    /// Returns the discriminator as a zero-padded four-digit string.
    #[must_use]
    pub fn discriminator_text(&self) -> String {
        format!("{:04}", self.discriminator)
    }
}

fn deserialize_discriminator<'de, D>(deserializer: D) -> Result<u16, D::Error>
where
    D: Deserializer<'de>,
{
    let value = u16::deserialize(deserializer)?;
    if value > 9999 {
        return Err(D::Error::custom(format!(
            "discriminator {value} is outside 0-9999"
        )));
    }
    Ok(value)
}

/// A file attached to a message.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    /// Snowflake identifier.
    pub id: String,
    /// Download URL.
    pub url: String,
    /// Original file name.
    pub file_name: String,
    /// File size in bytes.
    pub file_size_bytes: u64,
}

/// The author block of an embed.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmbedAuthor {
    /// Author name.
    #[serde(default)]
    pub name: Option<String>,
    /// Link attached to the author name.
    #[serde(default)]
    pub url: Option<String>,
    /// Author icon URL.
    #[serde(default)]
    pub icon_url: Option<String>,
}

/// An embed thumbnail or image.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct EmbedImage {
    /// Image URL.
    pub url: String,
    /// Width in pixels.
    #[serde(default)]
    pub width: u32,
    /// Height in pixels.
    #[serde(default)]
    pub height: u32,
}

/// The footer block of an embed.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmbedFooter {
    /// Footer text.
    pub text: String,
    /// Footer icon URL.
    #[serde(default)]
    pub icon_url: Option<String>,
}

/// A name/value field inside an embed.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmbedField {
    /// Field name.
    pub name: String,
    /// Field value.
    pub value: String,
    /// Whether the field is displayed inline.
    #[serde(default)]
    pub is_inline: bool,
}

/// A rich embed attached to a message.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(default)]
pub struct Embed {
    /// Embed title.
    pub title: Option<String>,
    /// Link attached to the title.
    pub url: Option<String>,
    /// Timestamp shown in the embed footer.
    pub timestamp: Option<DateTime<FixedOffset>>,
    /// Body text.
    pub description: Option<String>,
    /// Author block.
    pub author: Option<EmbedAuthor>,
    /// Small image shown beside the body.
    pub thumbnail: Option<EmbedImage>,
    /// Large image shown below the body.
    pub image: Option<EmbedImage>,
    /// Footer block.
    pub footer: Option<EmbedFooter>,
    /// Name/value fields, in display order.
    pub fields: Vec<EmbedField>,
}

/// A standard or custom emoji.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Emoji {
    /// Snowflake identifier; `None` for standard Unicode emoji.
    #[serde(default)]
    pub id: Option<String>,
    /// Custom emoji name, or the emoji itself for standard emoji.
    pub name: String,
    /// Whether a custom emoji is animated.
    #[serde(default)]
    pub is_animated: bool,
}

impl Emoji {
    /// Returns the URL of an image depicting this emoji.
    ///
    /// Custom emoji resolve to the Discord CDN. Standard emoji resolve to
    /// the Twemoji asset named after their code points.
    #[must_use]
    pub fn image_url(&self) -> String {
        if let Some(id) = &self.id {
            let extension = if self.is_animated { "gif" } else { "png" };
            return format!("https://cdn.discordapp.com/emojis/{id}.{extension}");
        }

        let code_points = self
            .name
            .chars()
            .filter(|&c| c != '\u{fe0f}')
            .map(|c| format!("{:x}", u32::from(c)))
            .collect::<Vec<_>>()
            .join("-");
        format!("https://cdn.jsdelivr.net/gh/twitter/twemoji@latest/assets/72x72/{code_points}.png")
    }
}

/// A reaction on a message.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Reaction {
    /// The emoji reacted with.
    pub emoji: Emoji,
    /// Number of users who reacted.
    pub count: u64,
}

/// A single message in the channel.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    /// Snowflake identifier.
    pub id: String,
    /// Message kind.
    #[serde(rename = "type", default)]
    pub kind: MessageType,
    /// When the message was sent.
    pub timestamp: DateTime<FixedOffset>,
    /// When the message was last edited, if ever.
    #[serde(default)]
    pub timestamp_edited: Option<DateTime<FixedOffset>>,
    /// Whether the message is pinned.
    #[serde(default)]
    pub is_pinned: bool,
    /// Raw content, including Discord mention markup.
    #[serde(default)]
    pub content: String,
    /// Who sent the message.
    pub author: User,
    /// Attached files, in upload order.
    #[serde(default)]
    pub attachments: Vec<Attachment>,
    /// Rich embeds, in display order.
    #[serde(default)]
    pub embeds: Vec<Embed>,
    /// Reactions, in display order.
    #[serde(default)]
    pub reactions: Vec<Reaction>,
    /// Users mentioned in the content.
    #[serde(default)]
    pub mentioned_users: Vec<User>,
}

/// Formats a timestamp the way exported documents carry it.
///
/// RFC 3339 with the original offset preserved; fractional seconds only
/// appear when present.
#[must_use]
pub fn format_timestamp(timestamp: &DateTime<FixedOffset>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::AutoSi, false)
}
