// SPDX-License-Identifier: GPL-3.0-only
// Copyright (C) 2025 Brian Hetro <whee@smaertness.net>

//! Integration tests for chatjson parsing and export.

use chatjson::model::DateRange;
use chatjson::writer::{JsonMessageWriter, WriterOptions};
use chatjson::{export, source};
use chrono::DateTime;
use serde_json::{Value, json};
use std::num::NonZeroU64;

const MESSAGE_WITH_EVERYTHING: &str = r#"{
    "id": "100",
    "type": "Default",
    "timestamp": "2024-01-01T00:00:00+00:00",
    "timestampEdited": "2024-01-01T00:05:00+00:00",
    "isPinned": true,
    "content": "release notes",
    "author": {
        "id": "9",
        "name": "Bob",
        "discriminator": "0042",
        "isBot": true,
        "avatarUrl": "https://example.com/bob.png"
    },
    "attachments": [
        { "id": "5", "url": "https://example.com/a.zip", "fileName": "a.zip", "fileSizeBytes": 4096 }
    ],
    "embeds": [
        {
            "title": "Release",
            "url": "https://example.com/release",
            "timestamp": "2024-01-01T00:00:00+00:00",
            "description": "Everything changed",
            "author": { "name": "Ann", "url": "https://example.com/ann", "iconUrl": null },
            "thumbnail": { "url": "https://example.com/t.png", "width": 64, "height": 64 },
            "image": { "url": "https://example.com/i.png", "width": 640, "height": 480 },
            "footer": { "text": "v2", "iconUrl": "https://example.com/f.png" },
            "fields": [
                { "name": "Added", "value": "things", "isInline": false },
                { "name": "Removed", "value": "others", "isInline": true }
            ]
        },
        {
            "title": null,
            "url": null,
            "timestamp": null,
            "description": null,
            "fields": []
        }
    ],
    "reactions": [
        { "emoji": { "id": "77", "name": "party", "isAnimated": true }, "count": 12 }
    ]
}"#;

fn dump_with_messages(messages: &[&str]) -> String {
    format!(
        r#"{{
            "guild": {{ "id": "1", "name": "G", "iconUrl": null }},
            "channel": {{ "id": "2", "type": "GuildText", "name": "general", "topic": null }},
            "channels": {{ "3": "random" }},
            "messages": [{}]
        }}"#,
        messages.join(",")
    )
}

fn simple_message(id: &str, timestamp: &str, content: &str) -> String {
    format!(
        r#"{{
            "id": "{id}",
            "timestamp": "{timestamp}",
            "content": "{content}",
            "author": {{ "id": "9", "name": "Bob", "discriminator": 7 }}
        }}"#
    )
}

async fn export_to_file(dump_json: &str, range: DateRange, options: WriterOptions) -> Value {
    let dump = source::parse_dump(dump_json).unwrap();
    let ctx = dump.render_context(range);

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("general.json");
    let mut file = tokio::fs::File::create(&path).await.unwrap();

    let mut writer = JsonMessageWriter::new(&mut file, &ctx).with_options(options);
    export::export_messages(&mut writer, &dump.messages, &ctx.date_range)
        .await
        .unwrap();
    drop(writer);
    drop(file);

    let text = std::fs::read_to_string(&path).unwrap();
    serde_json::from_str(&text).unwrap()
}

/// Exported messages carry every input field back out unchanged.
#[tokio::test]
async fn round_trips_message_fields() {
    // The dump format takes a numeric discriminator.
    let input = MESSAGE_WITH_EVERYTHING.replace(r#""0042""#, "42");
    let doc = export_to_file(
        &dump_with_messages(&[&input]),
        DateRange::default(),
        WriterOptions::default(),
    )
    .await;

    let mut expected: Value = serde_json::from_str(MESSAGE_WITH_EVERYTHING).unwrap();
    expected["reactions"][0]["emoji"]["imageUrl"] =
        json!("https://cdn.discordapp.com/emojis/77.gif");

    assert_eq!(doc["messages"][0], expected);
    assert_eq!(doc["messageCount"], 1);
}

/// The header reflects the dump metadata and requested date range.
#[tokio::test]
async fn writes_header_from_dump() {
    let range = DateRange {
        after: Some(DateTime::parse_from_rfc3339("2023-12-31T00:00:00+00:00").unwrap()),
        before: None,
    };
    let doc = export_to_file(
        &dump_with_messages(&[]),
        range,
        WriterOptions::default(),
    )
    .await;

    assert_eq!(
        doc,
        json!({
            "guild": { "id": "1", "name": "G", "iconUrl": null },
            "channel": { "id": "2", "type": "GuildText", "name": "general", "topic": null },
            "dateRange": { "after": "2023-12-31T00:00:00+00:00", "before": null },
            "messages": [],
            "messageCount": 0
        })
    );
}

/// Only messages inside the date range are exported, in dump order.
#[tokio::test]
async fn filters_by_date_range() {
    let messages = [
        simple_message("3", "2024-03-01T00:00:00+00:00", "march"),
        simple_message("1", "2024-01-01T00:00:00+00:00", "january"),
        simple_message("2", "2024-02-01T00:00:00+00:00", "february"),
    ];
    let refs: Vec<_> = messages.iter().map(String::as_str).collect();
    let range = DateRange {
        after: Some(DateTime::parse_from_rfc3339("2024-01-15T00:00:00+00:00").unwrap()),
        before: None,
    };

    let doc = export_to_file(&dump_with_messages(&refs), range, WriterOptions::default()).await;

    let ids: Vec<_> = doc["messages"]
        .as_array()
        .unwrap()
        .iter()
        .map(|m| m["id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, ["3", "2"]);
    assert_eq!(doc["messageCount"], 2);
}

/// Mention markup is rendered through the dump's lookup tables.
#[tokio::test]
async fn formats_mentions_in_content() {
    let message = r#"{
        "id": "1",
        "timestamp": "2024-01-01T00:00:00+00:00",
        "content": "<@10> see <#3>",
        "author": { "id": "9", "name": "Bob", "discriminator": 7 },
        "mentionedUsers": [{ "id": "10", "name": "Alice", "discriminator": 1 }]
    }"#;
    let doc = export_to_file(
        &dump_with_messages(&[message]),
        DateRange::default(),
        WriterOptions::default(),
    )
    .await;

    assert_eq!(doc["messages"][0]["content"], "@Alice see #random");
    assert_eq!(doc["messages"][0]["author"]["discriminator"], "0007");
}

/// Large exports produce the same document whatever the flush cadence.
#[tokio::test]
async fn large_export_is_independent_of_flush_cadence() {
    let messages: Vec<_> = (0..1_000)
        .map(|i| simple_message(&i.to_string(), "2024-01-01T00:00:00+00:00", "x"))
        .collect();
    let refs: Vec<_> = messages.iter().map(String::as_str).collect();
    let json = dump_with_messages(&refs);

    let every_message = export_to_file(
        &json,
        DateRange::default(),
        WriterOptions {
            flush_every: NonZeroU64::MIN,
        },
    )
    .await;
    let default_cadence =
        export_to_file(&json, DateRange::default(), WriterOptions::default()).await;

    assert_eq!(every_message["messages"].as_array().unwrap().len(), 1_000);
    assert_eq!(every_message["messageCount"], 1_000);
    assert_eq!(every_message, default_cadence);
}
