// SPDX-License-Identifier: GPL-3.0-only
// Copyright (C) 2025 Brian Hetro <whee@smaertness.net>

//! Driving a [`MessageWriter`] through a whole export.

use crate::model::{DateRange, Message};
use crate::writer::{MessageWriter, WriterError};

/// Writes `messages` through `writer` and disposes it.
///
/// Messages outside `range` are skipped; the rest are written in the order
/// given. The writer is disposed whether or not writing succeeds. If both
/// writing and disposal fail, the writing error is returned.
///
/// Returns the number of messages written.
///
/// # Errors
///
/// Returns the first error raised by the writer.
pub async fn export_messages<'m, W, I>(
    writer: &mut W,
    messages: I,
    range: &DateRange,
) -> Result<u64, WriterError>
where
    W: MessageWriter + ?Sized,
    I: IntoIterator<Item = &'m Message>,
{
    let written = write_document(writer, messages, range).await;
    let disposed = writer.dispose().await;

    written?;
    disposed?;
    Ok(writer.message_count())
}

async fn write_document<'m, W, I>(
    writer: &mut W,
    messages: I,
    range: &DateRange,
) -> Result<(), WriterError>
where
    W: MessageWriter + ?Sized,
    I: IntoIterator<Item = &'m Message>,
{
    writer.write_preamble().await?;
    for message in messages {
        if range.contains(&message.timestamp) {
            writer.write_message(message).await?;
        }
    }
    writer.write_postamble().await
}
