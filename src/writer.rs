// SPDX-License-Identifier: GPL-3.0-only
// Copyright (C) 2025 Brian Hetro <whee@smaertness.net>

//! Streaming message writers.
//!
//! A writer turns a channel's messages into one output document without
//! holding the whole document in memory. Every writer follows the same
//! protocol, which [`MessageWriter`] captures:
//!
//! 1. [`write_preamble`](MessageWriter::write_preamble) once
//! 2. [`write_message`](MessageWriter::write_message) for each message, in order
//! 3. [`write_postamble`](MessageWriter::write_postamble) once
//! 4. [`dispose`](MessageWriter::dispose)
//!
//! Calls made out of order fail with [`WriterError::Protocol`] and write
//! nothing. Flushing to the sink is the only operation that awaits; all
//! other work happens synchronously in the writer's own buffer.
//!
//! # Example
//!
//! ```
//! use chatjson::context::RenderContext;
//! use chatjson::model::{Channel, ChannelType, DateRange, Guild};
//! use chatjson::writer::{JsonMessageWriter, MessageWriter};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), chatjson::writer::WriterError> {
//! let ctx = RenderContext::new(
//!     Guild { id: "1".into(), name: "G".into(), icon_url: None },
//!     Channel { id: "2".into(), kind: ChannelType::GuildText, name: "general".into(), topic: None },
//!     DateRange::default(),
//! );
//!
//! let mut out = Vec::new();
//! let mut writer = JsonMessageWriter::compact(&mut out, &ctx);
//! writer.write_preamble().await?;
//! writer.write_postamble().await?;
//! writer.dispose().await?;
//! drop(writer);
//!
//! let doc: serde_json::Value = serde_json::from_slice(&out).unwrap();
//! assert_eq!(doc["messageCount"], 0);
//! # Ok(())
//! # }
//! ```

use crate::context::RenderContext;
use crate::json::JsonWriter;
use crate::model::{Attachment, Embed, EmbedImage, Message, Reaction, User, format_timestamp};
use async_trait::async_trait;
use serde_json::ser::{CompactFormatter, Formatter, PrettyFormatter};
use snafu::prelude::*;
use std::fmt;
use std::io;
use std::num::NonZeroU64;
use tokio::io::{AsyncWrite, AsyncWriteExt};

/// Where a writer is in its call sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Constructed; nothing written yet.
    Created,
    /// Preamble written; no messages yet.
    HeaderWritten,
    /// At least one message written.
    Writing,
    /// Postamble written; the document is complete.
    Finalized,
    /// Disposed; the writer can no longer be used.
    Closed,
    /// A previous call failed; the writer must be discarded.
    Faulted,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Created => "created",
            Self::HeaderWritten => "header-written",
            Self::Writing => "writing",
            Self::Finalized => "finalized",
            Self::Closed => "closed",
            Self::Faulted => "faulted",
        })
    }
}

/// A protocol operation, used to report misuse.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    /// [`MessageWriter::write_preamble`].
    Preamble,
    /// [`MessageWriter::write_message`].
    Message,
    /// [`MessageWriter::write_postamble`].
    Postamble,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Preamble => "write preamble",
            Self::Message => "write message",
            Self::Postamble => "write postamble",
        })
    }
}

/// Error type for message writers.
#[derive(Debug, Snafu)]
pub enum WriterError {
    /// An operation was called outside the phase that allows it.
    #[snafu(display("cannot {operation} while the writer is {phase}"))]
    Protocol {
        /// The rejected operation.
        operation: Operation,
        /// The writer's phase when the call was made.
        phase: Phase,
    },

    /// The sink rejected a write or flush.
    #[snafu(display("failed to write to output: {source}"))]
    Io {
        /// The underlying I/O error.
        source: io::Error,
    },

    /// The document structure could not be encoded.
    #[snafu(display("failed to encode JSON: {source}"))]
    Encode {
        /// The underlying encoding error.
        source: io::Error,
    },
}

/// Tunable writer behaviour that never affects the document's content.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriterOptions {
    /// Flush to the sink after every this many messages.
    pub flush_every: NonZeroU64,
}

impl Default for WriterOptions {
    fn default() -> Self {
        Self {
            flush_every: NonZeroU64::new(100).unwrap_or(NonZeroU64::MIN),
        }
    }
}

/// The protocol shared by all output formats.
///
/// Implementations own their own counter and phase. Callers must not
/// interleave calls; `&mut self` on every method enforces that.
#[async_trait]
pub trait MessageWriter: Send {
    /// Writes the document header. Valid once, before any message.
    ///
    /// # Errors
    ///
    /// [`WriterError::Protocol`] outside [`Phase::Created`]; otherwise any
    /// sink failure.
    async fn write_preamble(&mut self) -> Result<(), WriterError>;

    /// Appends one message to the document.
    ///
    /// # Errors
    ///
    /// [`WriterError::Protocol`] before the preamble or after the
    /// postamble; otherwise any sink failure.
    async fn write_message(&mut self, message: &Message) -> Result<(), WriterError>;

    /// Writes the document trailer and flushes. Valid once, after the
    /// preamble.
    ///
    /// # Errors
    ///
    /// [`WriterError::Protocol`] before the preamble or when called twice;
    /// otherwise any sink failure.
    async fn write_postamble(&mut self) -> Result<(), WriterError>;

    /// Flushes anything still buffered and releases the buffer.
    ///
    /// Safe to call more than once. Disposing before the postamble leaves a
    /// truncated document in the sink.
    ///
    /// # Errors
    ///
    /// Returns any sink failure from the final flush.
    async fn dispose(&mut self) -> Result<(), WriterError>;

    /// Number of messages written so far.
    fn message_count(&self) -> u64;

    /// The writer's current phase.
    fn phase(&self) -> Phase;
}

/// Streams a channel export as a single JSON document.
///
/// The document is built in an internal buffer and drained to the sink
/// after the preamble, after every [`WriterOptions::flush_every`] messages,
/// after the postamble, and on dispose.
pub struct JsonMessageWriter<'a, S, F = PrettyFormatter<'static>> {
    sink: S,
    context: &'a RenderContext,
    json: JsonWriter<F>,
    options: WriterOptions,
    message_count: u64,
    phase: Phase,
}

impl<'a, S> JsonMessageWriter<'a, S, PrettyFormatter<'static>> {
    /// Creates a writer producing indented output.
    pub fn new(sink: S, context: &'a RenderContext) -> Self {
        Self::with_formatter(sink, context, PrettyFormatter::new())
    }
}

impl<'a, S> JsonMessageWriter<'a, S, CompactFormatter> {
    /// Creates a writer producing output without whitespace.
    pub fn compact(sink: S, context: &'a RenderContext) -> Self {
        Self::with_formatter(sink, context, CompactFormatter)
    }
}

impl<'a, S, F> JsonMessageWriter<'a, S, F> {
    /// Creates a writer laying out output with `formatter`.
    pub fn with_formatter(sink: S, context: &'a RenderContext, formatter: F) -> Self {
        Self {
            sink,
            context,
            json: JsonWriter::new(formatter),
            options: WriterOptions::default(),
            message_count: 0,
            phase: Phase::Created,
        }
    }

    /// Replaces the writer's options.
    #[must_use]
    pub fn with_options(mut self, options: WriterOptions) -> Self {
        self.options = options;
        self
    }

    /// Returns the sink being written to.
    pub const fn get_ref(&self) -> &S {
        &self.sink
    }

    fn expect_phase(&self, operation: Operation, allowed: &[Phase]) -> Result<(), WriterError> {
        ensure!(
            allowed.contains(&self.phase),
            ProtocolSnafu {
                operation,
                phase: self.phase
            }
        );
        Ok(())
    }

    /// Records the outcome of an operation: advance on success, fault on failure.
    fn settle(&mut self, result: Result<(), WriterError>, next: Phase) -> Result<(), WriterError> {
        self.phase = if result.is_ok() { next } else { Phase::Faulted };
        result
    }
}

impl<S, F> JsonMessageWriter<'_, S, F>
where
    S: AsyncWrite + Unpin + Send,
    F: Formatter + Send,
{
    async fn flush(&mut self) -> Result<(), WriterError> {
        let buffered = self.json.buffered();
        if !buffered.is_empty() {
            self.sink.write_all(buffered).await.context(IoSnafu)?;
            self.json.clear();
        }
        self.sink.flush().await.context(IoSnafu)?;
        tracing::debug!(messages = self.message_count, "flushed export output");
        Ok(())
    }

    fn emit_preamble(&mut self) -> io::Result<()> {
        let ctx = self.context;
        let j = &mut self.json;

        j.start_object()?;

        j.start_object_property("guild")?;
        j.string("id", &ctx.guild.id)?;
        j.string("name", &ctx.guild.name)?;
        j.string_or_null("iconUrl", ctx.guild.icon_url.as_deref())?;
        j.end_object()?;

        j.start_object_property("channel")?;
        j.string("id", &ctx.channel.id)?;
        j.string("type", ctx.channel.kind.as_str())?;
        j.string("name", &ctx.channel.name)?;
        j.string_or_null("topic", ctx.channel.topic.as_deref())?;
        j.end_object()?;

        j.start_object_property("dateRange")?;
        j.string_or_null(
            "after",
            ctx.date_range.after.as_ref().map(format_timestamp).as_deref(),
        )?;
        j.string_or_null(
            "before",
            ctx.date_range.before.as_ref().map(format_timestamp).as_deref(),
        )?;
        j.end_object()?;

        j.start_array_property("messages")
    }

    fn emit_message(&mut self, message: &Message) -> io::Result<()> {
        let content = self.context.format_content(message);
        let j = &mut self.json;

        j.start_object()?;
        j.string("id", &message.id)?;
        j.string("type", message.kind.as_str())?;
        j.string("timestamp", &format_timestamp(&message.timestamp))?;
        j.string_or_null(
            "timestampEdited",
            message.timestamp_edited.as_ref().map(format_timestamp).as_deref(),
        )?;
        j.bool("isPinned", message.is_pinned)?;
        j.string("content", &content)?;

        write_author(j, &message.author)?;

        j.start_array_property("attachments")?;
        for attachment in &message.attachments {
            write_attachment(j, attachment)?;
        }
        j.end_array()?;

        j.start_array_property("embeds")?;
        for embed in &message.embeds {
            write_embed(j, embed)?;
        }
        j.end_array()?;

        j.start_array_property("reactions")?;
        for reaction in &message.reactions {
            write_reaction(j, reaction)?;
        }
        j.end_array()?;

        j.end_object()
    }

    fn emit_postamble(&mut self) -> io::Result<()> {
        self.json.end_array()?;
        self.json.number("messageCount", self.message_count)?;
        self.json.end_object()
    }
}

#[async_trait]
impl<'a, S, F> MessageWriter for JsonMessageWriter<'a, S, F>
where
    S: AsyncWrite + Unpin + Send,
    F: Formatter + Send,
{
    async fn write_preamble(&mut self) -> Result<(), WriterError> {
        self.expect_phase(Operation::Preamble, &[Phase::Created])?;

        let result = match self.emit_preamble().context(EncodeSnafu) {
            Ok(()) => self.flush().await,
            Err(e) => Err(e),
        };
        self.settle(result, Phase::HeaderWritten)
    }

    async fn write_message(&mut self, message: &Message) -> Result<(), WriterError> {
        self.expect_phase(Operation::Message, &[Phase::HeaderWritten, Phase::Writing])?;

        let result = match self.emit_message(message).context(EncodeSnafu) {
            Ok(()) => {
                self.message_count += 1;
                if self.message_count % self.options.flush_every.get() == 0 {
                    self.flush().await
                } else {
                    Ok(())
                }
            }
            Err(e) => Err(e),
        };
        self.settle(result, Phase::Writing)
    }

    async fn write_postamble(&mut self) -> Result<(), WriterError> {
        self.expect_phase(Operation::Postamble, &[Phase::HeaderWritten, Phase::Writing])?;

        let result = match self.emit_postamble().context(EncodeSnafu) {
            Ok(()) => self.flush().await,
            Err(e) => Err(e),
        };
        self.settle(result, Phase::Finalized)
    }

    async fn dispose(&mut self) -> Result<(), WriterError> {
        let previous = std::mem::replace(&mut self.phase, Phase::Closed);

        let result = match previous {
            Phase::Closed => return Ok(()),
            // The sink already failed us once; don't touch it again.
            Phase::Faulted => Ok(()),
            _ if self.json.buffered().is_empty() => Ok(()),
            _ => self.flush().await,
        };

        if matches!(
            previous,
            Phase::HeaderWritten | Phase::Writing | Phase::Faulted
        ) {
            tracing::warn!(
                phase = %previous,
                messages = self.message_count,
                "writer disposed before the postamble; output is incomplete"
            );
        }

        self.json.release();
        result
    }

    fn message_count(&self) -> u64 {
        self.message_count
    }

    fn phase(&self) -> Phase {
        self.phase
    }
}

impl<S, F> Drop for JsonMessageWriter<'_, S, F> {
    fn drop(&mut self) {
        let pending = self.json.buffered().len();
        if self.phase != Phase::Closed && pending > 0 {
            tracing::warn!(bytes = pending, "writer dropped without dispose; buffered output lost");
        }
    }
}

fn write_author<F: Formatter>(j: &mut JsonWriter<F>, author: &User) -> io::Result<()> {
    j.start_object_property("author")?;
    j.string("id", &author.id)?;
    j.string("name", &author.name)?;
    j.string("discriminator", &author.discriminator_text())?;
    j.bool("isBot", author.is_bot)?;
    j.string_or_null("avatarUrl", author.avatar_url.as_deref())?;
    j.end_object()
}

fn write_attachment<F: Formatter>(j: &mut JsonWriter<F>, attachment: &Attachment) -> io::Result<()> {
    j.start_object()?;
    j.string("id", &attachment.id)?;
    j.string("url", &attachment.url)?;
    j.string("fileName", &attachment.file_name)?;
    j.number("fileSizeBytes", attachment.file_size_bytes)?;
    j.end_object()
}

fn write_embed<F: Formatter>(j: &mut JsonWriter<F>, embed: &Embed) -> io::Result<()> {
    j.start_object()?;
    j.string_or_null("title", embed.title.as_deref())?;
    j.string_or_null("url", embed.url.as_deref())?;
    j.string_or_null(
        "timestamp",
        embed.timestamp.as_ref().map(format_timestamp).as_deref(),
    )?;
    j.string_or_null("description", embed.description.as_deref())?;

    // Optional blocks are omitted entirely when absent, never written as null.
    if let Some(author) = &embed.author {
        j.start_object_property("author")?;
        j.string_or_null("name", author.name.as_deref())?;
        j.string_or_null("url", author.url.as_deref())?;
        j.string_or_null("iconUrl", author.icon_url.as_deref())?;
        j.end_object()?;
    }
    if let Some(thumbnail) = &embed.thumbnail {
        write_embed_image(j, "thumbnail", thumbnail)?;
    }
    if let Some(image) = &embed.image {
        write_embed_image(j, "image", image)?;
    }
    if let Some(footer) = &embed.footer {
        j.start_object_property("footer")?;
        j.string("text", &footer.text)?;
        j.string_or_null("iconUrl", footer.icon_url.as_deref())?;
        j.end_object()?;
    }

    j.start_array_property("fields")?;
    for field in &embed.fields {
        j.start_object()?;
        j.string("name", &field.name)?;
        j.string("value", &field.value)?;
        j.bool("isInline", field.is_inline)?;
        j.end_object()?;
    }
    j.end_array()?;

    j.end_object()
}

fn write_embed_image<F: Formatter>(
    j: &mut JsonWriter<F>,
    name: &str,
    image: &EmbedImage,
) -> io::Result<()> {
    j.start_object_property(name)?;
    j.string("url", &image.url)?;
    j.number("width", u64::from(image.width))?;
    j.number("height", u64::from(image.height))?;
    j.end_object()
}

fn write_reaction<F: Formatter>(j: &mut JsonWriter<F>, reaction: &Reaction) -> io::Result<()> {
    j.start_object()?;

    j.start_object_property("emoji")?;
    j.string_or_null("id", reaction.emoji.id.as_deref())?;
    j.string("name", &reaction.emoji.name)?;
    j.bool("isAnimated", reaction.emoji.is_animated)?;
    j.string("imageUrl", &reaction.emoji.image_url())?;
    j.end_object()?;

    j.number("count", reaction.count)?;
    j.end_object()
}
