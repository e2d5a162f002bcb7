//! Snapshot file identity and naming.
//!
//! One snapshot file is one backup run for one channel. The name encodes
//! what the file covers, and the writer and index agree on a single
//! scheme:
//!
//! - while a run is in progress the file is
//!   `msgStream-<channel>-<startMillis>.jsonstream.partial`. A crashed
//!   run leaves this name behind; the index ignores it.
//! - a completed run that archived messages is renamed to
//!   `msgStream-<channel>-<newestId>-<oldestBound>.jsonstream`, covering
//!   the id range `(oldestBound, newestId]` — newest inclusive, lower
//!   bound exclusive.
//! - a completed run that saw zero messages keeps its timestamp name
//!   (minus the `.partial` suffix). It is readable but covers no range.
//!
//! Attachment bodies live beside snapshots as
//! `atStream-<attachmentId>-<filename>`.

use std::path::{Path, PathBuf};

use chanvault_api::types::Snowflake;

pub const SNAPSHOT_PREFIX: &str = "msgStream";
pub const ATTACHMENT_PREFIX: &str = "atStream";
pub const SNAPSHOT_EXT: &str = "jsonstream";
pub const PARTIAL_SUFFIX: &str = "partial";

/// The id range a finalized snapshot covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotSpan {
    /// Messages with ids in `(oldest_bound, newest]`. `oldest_bound` is
    /// always either an id archived by an earlier run, an explicit lower
    /// bound the run exhausted, or [`Snowflake::MIN`] for "back to the
    /// start of history" — excluding it from the claim never loses a
    /// message.
    Range {
        newest: Snowflake,
        oldest_bound: Snowflake,
    },
    /// A run that archived nothing; covers no ids.
    Empty { started_at_millis: i64 },
}

/// Identity of one finalized snapshot file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotMeta {
    pub path: PathBuf,
    pub channel_id: Snowflake,
    pub span: SnapshotSpan,
}

impl SnapshotMeta {
    /// Newest archived id, if the snapshot covers anything.
    #[must_use]
    pub fn newest(&self) -> Option<Snowflake> {
        match self.span {
            SnapshotSpan::Range { newest, .. } => Some(newest),
            SnapshotSpan::Empty { .. } => None,
        }
    }

    /// Exclusive lower bound of the covered range.
    #[must_use]
    pub fn oldest_bound(&self) -> Option<Snowflake> {
        match self.span {
            SnapshotSpan::Range { oldest_bound, .. } => Some(oldest_bound),
            SnapshotSpan::Empty { .. } => None,
        }
    }
}

/// Name of the in-progress file for a run started at `started_at_millis`.
#[must_use]
pub fn partial_file_name(channel_id: Snowflake, started_at_millis: i64) -> String {
    format!("{SNAPSHOT_PREFIX}-{channel_id}-{started_at_millis}.{SNAPSHOT_EXT}.{PARTIAL_SUFFIX}")
}

/// Final name for a completed run.
#[must_use]
pub fn snapshot_file_name(channel_id: Snowflake, span: SnapshotSpan) -> String {
    match span {
        SnapshotSpan::Range {
            newest,
            oldest_bound,
        } => format!("{SNAPSHOT_PREFIX}-{channel_id}-{newest}-{oldest_bound}.{SNAPSHOT_EXT}"),
        SnapshotSpan::Empty { started_at_millis } => {
            format!("{SNAPSHOT_PREFIX}-{channel_id}-{started_at_millis}.{SNAPSHOT_EXT}")
        }
    }
}

/// Parse a finalized snapshot file name. Returns `None` for partial
/// files, attachment files, and anything else that does not match the
/// scheme.
#[must_use]
pub fn parse_snapshot_path(path: &Path) -> Option<SnapshotMeta> {
    let file_name = path.file_name()?.to_str()?;
    let stem = file_name.strip_suffix(&format!(".{SNAPSHOT_EXT}"))?;
    let rest = stem.strip_prefix(&format!("{SNAPSHOT_PREFIX}-"))?;
    let fields: Vec<&str> = rest.split('-').collect();
    let (channel, span) = match fields.as_slice() {
        [channel, millis] => (
            channel,
            SnapshotSpan::Empty {
                started_at_millis: millis.parse().ok()?,
            },
        ),
        [channel, newest, oldest] => {
            let newest: Snowflake = newest.parse().ok()?;
            let oldest_bound: Snowflake = oldest.parse().ok()?;
            if newest < oldest_bound {
                return None;
            }
            (
                channel,
                SnapshotSpan::Range {
                    newest,
                    oldest_bound,
                },
            )
        }
        _ => return None,
    };
    Some(SnapshotMeta {
        path: path.to_path_buf(),
        channel_id: channel.parse().ok()?,
        span,
    })
}

/// Deterministic file name for an attachment body. The pair
/// (attachment id, filename) identifies the content across every snapshot
/// that references it.
#[must_use]
pub fn attachment_file_name(attachment_id: Snowflake, filename: &str) -> String {
    format!(
        "{ATTACHMENT_PREFIX}-{attachment_id}-{}",
        sanitize_filename(filename)
    )
}

/// Keep attachment names inside the archive directory: path separators
/// and parent references collapse to underscores.
fn sanitize_filename(filename: &str) -> String {
    let cleaned: String = filename
        .chars()
        .map(|ch| match ch {
            '/' | '\\' | '\0' => '_',
            other => other,
        })
        .collect();
    if cleaned.is_empty() || cleaned.chars().all(|ch| ch == '.') {
        "unnamed".to_string()
    } else {
        cleaned
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn range_name_round_trips() {
        let span = SnapshotSpan::Range {
            newest: Snowflake(100),
            oldest_bound: Snowflake(50),
        };
        let name = snapshot_file_name(Snowflake(7), span);
        assert_eq!(name, "msgStream-7-100-50.jsonstream");

        let meta = parse_snapshot_path(Path::new(&name)).unwrap();
        assert_eq!(meta.channel_id, Snowflake(7));
        assert_eq!(meta.span, span);
        assert_eq!(meta.newest(), Some(Snowflake(100)));
        assert_eq!(meta.oldest_bound(), Some(Snowflake(50)));
    }

    #[test]
    fn empty_name_round_trips() {
        let span = SnapshotSpan::Empty {
            started_at_millis: 1_700_000_000_123,
        };
        let name = snapshot_file_name(Snowflake(7), span);
        assert_eq!(name, "msgStream-7-1700000000123.jsonstream");
        let meta = parse_snapshot_path(Path::new(&name)).unwrap();
        assert_eq!(meta.span, span);
        assert_eq!(meta.newest(), None);
    }

    #[test]
    fn partial_and_foreign_names_are_rejected() {
        assert!(parse_snapshot_path(Path::new(&partial_file_name(Snowflake(7), 1234))).is_none());
        assert!(parse_snapshot_path(Path::new("atStream-1-cat.png")).is_none());
        assert!(parse_snapshot_path(Path::new("msgStream-7.jsonstream")).is_none());
        assert!(parse_snapshot_path(Path::new("msgStream-7-a-b.jsonstream")).is_none());
        // inverted range
        assert!(parse_snapshot_path(Path::new("msgStream-7-10-100.jsonstream")).is_none());
    }

    #[test]
    fn attachment_names_are_sanitized() {
        assert_eq!(
            attachment_file_name(Snowflake(9), "cat.png"),
            "atStream-9-cat.png"
        );
        assert_eq!(
            attachment_file_name(Snowflake(9), "../../etc/passwd"),
            "atStream-9-.._.._etc_passwd"
        );
        assert_eq!(attachment_file_name(Snowflake(9), ".."), "atStream-9-unnamed");
    }
}
