// SPDX-License-Identifier: GPL-3.0-only
// Copyright (C) 2025 Brian Hetro <whee@smaertness.net>

//! Read-only rendering context shared by message writers.
//!
//! A [`RenderContext`] carries the guild, channel and date range being
//! exported, plus the lookup tables needed to turn Discord mention markup
//! into readable text.
//!
//! # Example
//!
//! ```
//! use chatjson::context::RenderContext;
//! use chatjson::model::{Channel, ChannelType, DateRange, Guild};
//!
//! let guild = Guild { id: "1".into(), name: "G".into(), icon_url: None };
//! let channel = Channel {
//!     id: "2".into(),
//!     kind: ChannelType::GuildText,
//!     name: "general".into(),
//!     topic: None,
//! };
//!
//! let ctx = RenderContext::new(guild, channel, DateRange::default())
//!     .with_channel_names([("3".to_owned(), "random".to_owned())]);
//!
//! assert_eq!(ctx.format_markup("see <#3>", &[]), "see #random");
//! ```

use crate::model::{Channel, DateRange, Guild, Message, User};
use std::collections::HashMap;

/// Guild, channel and date-range metadata for one export.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderContext {
    /// The guild the channel belongs to.
    pub guild: Guild,
    /// The channel being exported.
    pub channel: Channel,
    /// The requested export window.
    pub date_range: DateRange,
    channel_names: HashMap<String, String>,
    role_names: HashMap<String, String>,
}

impl RenderContext {
    /// Creates a context with empty channel and role tables.
    #[must_use]
    pub fn new(guild: Guild, channel: Channel, date_range: DateRange) -> Self {
        Self {
            guild,
            channel,
            date_range,
            channel_names: HashMap::new(),
            role_names: HashMap::new(),
        }
    }

    /// Adds channel names used to resolve `<#id>` mentions.
    #[must_use]
    pub fn with_channel_names<I>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        self.channel_names.extend(names);
        self
    }

    /// Adds role names used to resolve `<@&id>` mentions.
    #[must_use]
    pub fn with_role_names<I>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        self.role_names.extend(names);
        self
    }

    /// Renders a message's content as plain text.
    #[must_use]
    pub fn format_content(&self, message: &Message) -> String {
        self.format_markup(&message.content, &message.mentioned_users)
    }

    /// Renders Discord markup as plain text.
    ///
    /// User, channel and role mentions become `@name`, `#name` and `@role`;
    /// custom emoji become `:name:`. Anything that does not parse as markup
    /// is copied through unchanged.
    #[must_use]
    pub fn format_markup(&self, content: &str, mentioned_users: &[User]) -> String {
        let mut result = String::with_capacity(content.len());
        let mut rest = content;

        while let Some(start) = rest.find('<') {
            result.push_str(&rest[..start]);
            let candidate = &rest[start..];

            let resolved = candidate.find('>').and_then(|end| {
                let text = self.resolve_token(&candidate[1..end], mentioned_users)?;
                Some((end, text))
            });

            match resolved {
                Some((end, text)) => {
                    result.push_str(&text);
                    rest = &candidate[end + 1..];
                }
                None => {
                    result.push('<');
                    rest = &candidate[1..];
                }
            }
        }

        result.push_str(rest);
        result
    }

    /// Resolves the inside of a `<...>` token, or `None` if it isn't markup.
    fn resolve_token(&self, token: &str, mentioned_users: &[User]) -> Option<String> {
        if let Some(id) = token.strip_prefix("@&") {
            ensure_snowflake(id)?;
            let name = self.role_names.get(id).map_or("deleted-role", String::as_str);
            return Some(format!("@{name}"));
        }

        if let Some(id) = token.strip_prefix('@') {
            let id = id.strip_prefix('!').unwrap_or(id);
            ensure_snowflake(id)?;
            let name = mentioned_users
                .iter()
                .find(|u| u.id == id)
                .map_or("Unknown", |u| u.name.as_str());
            return Some(format!("@{name}"));
        }

        if let Some(id) = token.strip_prefix('#') {
            ensure_snowflake(id)?;
            let name = self
                .channel_names
                .get(id)
                .map_or("deleted-channel", String::as_str);
            return Some(format!("#{name}"));
        }

        // Custom emoji: `:name:id` or `a:name:id`
        let emoji = token.strip_prefix('a').unwrap_or(token);
        let (name, id) = emoji.strip_prefix(':')?.split_once(':')?;
        ensure_snowflake(id)?;
        if name.is_empty() || !name.chars().all(|c| c.is_alphanumeric() || c == '_') {
            return None;
        }
        Some(format!(":{name}:"))
    }
}

fn ensure_snowflake(id: &str) -> Option<()> {
    (!id.is_empty() && id.bytes().all(|b| b.is_ascii_digit())).then_some(())
}
