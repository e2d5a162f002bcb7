//! Errors raised by the archival engine.
//!
//! Per-item failures (a single attachment download) are handled where
//! they occur and never reach this type; everything here is fatal to the
//! enclosing backup, read, or restore run and propagates to the caller.

use std::path::PathBuf;

use chanvault_api::{error::SourceError, types::Snowflake};
use snafu::prelude::*;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum VaultError {
    /// The target channel has no message history to archive. Raised
    /// before any file is created.
    #[snafu(display("channel {channel} is not a text channel (kind: {kind})"))]
    NotTextChannel { channel: String, kind: String },

    /// Filesystem error against an archive path.
    #[snafu(display("archive io error at {}: {source}", path.display()))]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// A snapshot file for this run already exists.
    #[snafu(display("snapshot file already exists: {}", path.display()))]
    SnapshotExists { path: PathBuf },

    /// The requested snapshot file does not exist.
    #[snafu(display("no archive found at {}", path.display()))]
    MissingArchive { path: PathBuf },

    /// A point query was made against a snapshot with zero entries.
    #[snafu(display("no messages archived in {}", path.display()))]
    EmptyArchive { path: PathBuf },

    /// A line in a snapshot file failed to parse. Fatal to the read; the
    /// reader does not skip and continue.
    #[snafu(display("malformed entry at {}:{line}: {source}", path.display()))]
    MalformedEntry {
        path: PathBuf,
        line: usize,
        source: serde_path_to_error::Error<serde_json::Error>,
    },

    /// An entry could not be serialized for appending.
    #[snafu(display("failed to serialize entry {id}: {source}"))]
    Serialize {
        id: Snowflake,
        source: serde_json::Error,
    },

    /// An append would break the strictly-decreasing id order of a
    /// snapshot file.
    #[snafu(display("entry {next} appended out of order after {prev}"))]
    OutOfOrder { prev: Snowflake, next: Snowflake },

    /// An attachment body could not be fetched from its source URL.
    /// Handled inside the fetcher; never fatal to a backup run.
    #[snafu(display("download of {url} failed: {source}"))]
    Download { url: String, source: reqwest::Error },

    /// The platform client reported an error.
    #[snafu(display("platform error: {source}"))]
    Platform { source: SourceError },
}

impl From<SourceError> for VaultError {
    fn from(source: SourceError) -> Self {
        Self::Platform { source }
    }
}
