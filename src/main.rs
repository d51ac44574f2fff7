// SPDX-License-Identifier: GPL-3.0-only
// Copyright (C) 2025 Brian Hetro <whee@smaertness.net>

//! Command-line interface for chatjson.
//!
//! This binary provides the `chatjson` command for exporting channel dumps
//! as JSON documents.

use chatjson::export;
use chatjson::model::DateRange;
use chatjson::source::{self, ChannelDump};
use chatjson::writer::{JsonMessageWriter, MessageWriter, WriterError, WriterOptions};
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveTime};
use lexopt::prelude::*;
use snafu::{OptionExt, ensure, prelude::*};
use std::num::NonZeroU64;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWrite;
use tracing_subscriber::EnvFilter;
use walkdir::WalkDir;

/// Where to write the exported documents.
#[derive(Clone)]
enum OutputTarget {
    /// Write each document to the specified directory.
    Directory(PathBuf),
    /// Write to stdout.
    Stdout,
}

#[allow(clippy::struct_excessive_bools)]
struct Cli {
    input: Vec<PathBuf>,
    output: OutputTarget,
    date_range: DateRange,
    compact: bool,
    flush_every: NonZeroU64,
    quiet: bool,
    dry_run: bool,
    force: bool,
}

#[derive(Debug, Snafu)]
enum Error {
    #[snafu(display("failed to parse arguments: {source}"))]
    ParseArgs { source: lexopt::Error },

    #[snafu(display("at least one input file or directory is required"))]
    NoInputFiles,

    #[snafu(display("cannot output multiple files to stdout"))]
    MultipleFilesToStdout,

    #[snafu(display("failed to create output directory: {source}"))]
    CreateOutputDir { source: std::io::Error },

    #[snafu(display("failed to read {}: {source}", path.display()))]
    ReadFile {
        path: PathBuf,
        source: std::io::Error,
    },

    #[snafu(display("failed to parse {}: {source}", path.display()))]
    ParseFile {
        path: PathBuf,
        source: source::ParseError,
    },

    #[snafu(display("invalid input filename: no file stem"))]
    InvalidFilename,

    #[snafu(display("failed to create {}: {source}", path.display()))]
    CreateFile {
        path: PathBuf,
        source: std::io::Error,
    },

    #[snafu(display("failed to export {}: {source}", path.display()))]
    Export { path: PathBuf, source: WriterError },
}

fn print_help() {
    println!(
        "\
{name} {version}
Export chat channel dumps as JSON documents

Usage: {name} [OPTIONS] -o <OUTPUT> <INPUT>...

Arguments:
  <INPUT>...  Channel dump files or directories containing them

Options:
  -o, --output <OUTPUT>     Output directory (or - for stdout)
      --after <DATE>        Only export messages after DATE (RFC 3339 or YYYY-MM-DD)
      --before <DATE>       Only export messages before DATE (RFC 3339 or YYYY-MM-DD)
      --compact             Write JSON without indentation
      --flush-every <N>     Flush output every N messages (default: 100)

Other options:
  -q, --quiet               Suppress progress messages
  -n, --dry-run             Show what would be processed without writing
  -f, --force               Overwrite existing output files
  -h, --help                Print help
  -V, --version             Print version

Set CHATJSON_LOG (e.g. CHATJSON_LOG=debug) to control diagnostic logging.",
        name = env!("CARGO_PKG_NAME"),
        version = env!("CARGO_PKG_VERSION"),
    );
}

fn parse_args() -> Result<Cli, lexopt::Error> {
    // Show help if no arguments provided
    if std::env::args().len() == 1 {
        print_help();
        std::process::exit(0);
    }

    let mut input = Vec::new();
    let mut output: Option<OutputTarget> = None;
    let mut date_range = DateRange::default();
    let mut compact = false;
    let mut flush_every = WriterOptions::default().flush_every;
    let mut quiet = false;
    let mut dry_run = false;
    let mut force = false;

    let mut parser = lexopt::Parser::from_env();
    while let Some(arg) = parser.next()? {
        match arg {
            Short('o') | Long("output") => {
                let val: PathBuf = parser.value()?.parse()?;
                output = Some(if val == Path::new("-") {
                    OutputTarget::Stdout
                } else {
                    OutputTarget::Directory(val)
                });
            }
            Long("after") => date_range.after = Some(parse_date(&parser.value()?.string()?)?),
            Long("before") => date_range.before = Some(parse_date(&parser.value()?.string()?)?),
            Long("compact") => compact = true,
            Long("flush-every") => {
                let val: u64 = parser
                    .value()?
                    .parse()
                    .map_err(|_| "flush-every must be a positive number")?;
                flush_every = NonZeroU64::new(val).ok_or("flush-every must be at least 1")?;
            }
            Short('q') | Long("quiet") => quiet = true,
            Short('n') | Long("dry-run") => dry_run = true,
            Short('f') | Long("force") => force = true,
            Short('h') | Long("help") => {
                print_help();
                std::process::exit(0);
            }
            Short('V') | Long("version") => {
                println!("{} {}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));
                std::process::exit(0);
            }
            Value(val) => input.push(val.parse()?),
            _ => return Err(arg.unexpected()),
        }
    }

    Ok(Cli {
        input,
        output: output.ok_or("missing required option: --output")?,
        date_range,
        compact,
        flush_every,
        quiet,
        dry_run,
        force,
    })
}

/// Parses an RFC 3339 timestamp, or a bare date taken as midnight UTC.
fn parse_date(value: &str) -> Result<DateTime<FixedOffset>, lexopt::Error> {
    if let Ok(timestamp) = DateTime::parse_from_rfc3339(value) {
        return Ok(timestamp);
    }

    let date = NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|_| format!("invalid date '{value}' (expected RFC 3339 or YYYY-MM-DD)"))?;
    Ok(date.and_time(NaiveTime::MIN).and_utc().fixed_offset())
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_env("CHATJSON_LOG").unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Error> {
    init_tracing();

    let cli = parse_args().context(ParseArgsSnafu)?;

    ensure!(!cli.input.is_empty(), NoInputFilesSnafu);

    // Collect all input files first
    let files = collect_input_files(&cli.input);

    match &cli.output {
        OutputTarget::Stdout => {
            // Each document has its own root, so only one can go to stdout
            ensure!(files.len() == 1, MultipleFilesToStdoutSnafu);
            process_to_stdout(&files[0], &cli).await?;
        }
        OutputTarget::Directory(dir) => {
            if !cli.dry_run {
                tokio::fs::create_dir_all(dir)
                    .await
                    .context(CreateOutputDirSnafu)?;
            }
            for file in &files {
                process_file(file, dir, &cli).await?;
            }
        }
    }

    Ok(())
}

/// Collects all JSON files from the given inputs (files and directories).
fn collect_input_files(inputs: &[PathBuf]) -> Vec<PathBuf> {
    let mut files = Vec::new();
    for input in inputs {
        if input.is_dir() {
            for entry in WalkDir::new(input)
                .sort_by_file_name()
                .into_iter()
                .filter_map(Result::ok)
                .filter(|e| e.path().extension().is_some_and(|ext| ext == "json"))
            {
                files.push(entry.path().to_path_buf());
            }
        } else {
            files.push(input.clone());
        }
    }
    files
}

/// Reads and parses a channel dump.
async fn load_dump(path: &Path) -> Result<ChannelDump, Error> {
    let json = tokio::fs::read_to_string(path)
        .await
        .context(ReadFileSnafu { path })?;
    source::parse_dump(&json).context(ParseFileSnafu { path })
}

/// Streams one dump's messages into `sink` as a JSON document.
async fn export_dump<S>(sink: S, dump: &ChannelDump, cli: &Cli) -> Result<u64, WriterError>
where
    S: AsyncWrite + Unpin + Send,
{
    let ctx = dump.render_context(cli.date_range);
    let options = WriterOptions {
        flush_every: cli.flush_every,
    };

    let mut writer: Box<dyn MessageWriter + '_> = if cli.compact {
        Box::new(JsonMessageWriter::compact(sink, &ctx).with_options(options))
    } else {
        Box::new(JsonMessageWriter::new(sink, &ctx).with_options(options))
    };

    export::export_messages(writer.as_mut(), &dump.messages, &ctx.date_range).await
}

/// Processes a single file and outputs to stdout.
async fn process_to_stdout(input: &Path, cli: &Cli) -> Result<(), Error> {
    if cli.dry_run {
        eprintln!("Would output {}", input.display());
        return Ok(());
    }

    let dump = load_dump(input).await?;
    let count = export_dump(tokio::io::stdout(), &dump, cli)
        .await
        .context(ExportSnafu { path: input })?;

    if !cli.quiet {
        eprintln!("Exported {count} messages from {}", input.display());
    }
    Ok(())
}

/// Processes a single file and writes to the output directory.
async fn process_file(input: &Path, out_dir: &Path, cli: &Cli) -> Result<(), Error> {
    let out_name = input.file_stem().context(InvalidFilenameSnafu)?;
    let out_path = out_dir.join(format!("{}.json", out_name.to_string_lossy()));

    // Handle dry-run mode
    if cli.dry_run {
        eprintln!("Would write {}", out_path.display());
        return Ok(());
    }

    // Check if output exists and handle overwrite
    if out_path.exists() && !cli.force {
        eprintln!(
            "Skipping {} (already exists, use --force to overwrite)",
            out_path.display()
        );
        return Ok(());
    }

    let dump = load_dump(input).await?;

    let file = tokio::fs::File::create(&out_path)
        .await
        .context(CreateFileSnafu { path: &out_path })?;
    let count = export_dump(file, &dump, cli)
        .await
        .context(ExportSnafu { path: &out_path })?;

    if !cli.quiet {
        eprintln!("Wrote {} ({count} messages)", out_path.display());
    }
    Ok(())
}
