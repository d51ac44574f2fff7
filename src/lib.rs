// SPDX-License-Identifier: GPL-3.0-only
// Copyright (C) 2025 Brian Hetro <whee@smaertness.net>

//! Stream chat channel exports into a single JSON document.
//!
//! This crate turns a channel's messages into one JSON document, written
//! incrementally to an async sink so that exports of any size run in
//! bounded memory.
//!
//! # Overview
//!
//! 1. Parse a channel dump into typed records ([`source`], [`model`])
//! 2. Build a [`context::RenderContext`] for the guild, channel and date range
//! 3. Drive a [`writer::MessageWriter`] through preamble, messages and
//!    postamble ([`export`])
//!
//! # Example
//!
//! ```no_run
//! use chatjson::model::DateRange;
//! use chatjson::writer::JsonMessageWriter;
//! use chatjson::{export, source};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let json = std::fs::read_to_string("dump.json")?;
//! let dump = source::parse_dump(&json)?;
//! let ctx = dump.render_context(DateRange::default());
//!
//! let mut file = tokio::fs::File::create("general.json").await?;
//! let mut writer = JsonMessageWriter::new(&mut file, &ctx);
//! let count = export::export_messages(&mut writer, &dump.messages, &ctx.date_range).await?;
//! println!("exported {count} messages");
//! # Ok(())
//! # }
//! ```
//!
//! # Modules
//!
//! - [`model`]: guild, channel and message records
//! - [`source`]: channel dump parsing
//! - [`context`]: rendering context and mention formatting
//! - [`json`]: incremental JSON emission
//! - [`writer`]: the streaming writer protocol and its JSON implementation
//! - [`export`]: running a writer over a whole channel

#![deny(missing_docs)]

pub mod context;
pub mod export;
pub mod json;
pub mod model;
pub mod source;
pub mod writer;
