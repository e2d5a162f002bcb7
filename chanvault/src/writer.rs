//! Append-only snapshot writer.
//!
//! The writer owns one in-progress snapshot file. Each appended entry is
//! one JSON line, flushed immediately, so the file stays readable up to
//! the last complete line even if the process dies mid-run. A run that
//! finishes cleanly renames the file to encode the covered id range; a
//! crashed run leaves the `.partial` file behind for the index to ignore.

use std::{
    fs,
    io::Write as _,
    path::{Path, PathBuf},
};

use chanvault_api::types::Snowflake;
use chrono::{DateTime, Utc};
use snafu::ResultExt;

use crate::{
    Result,
    entry::MessageEntry,
    error::{IoSnafu, OutOfOrderSnafu, SerializeSnafu, SnapshotExistsSnafu},
    snapshot::{SnapshotMeta, SnapshotSpan, partial_file_name, snapshot_file_name},
};

pub struct ArchiveWriter {
    file: fs::File,
    dir: PathBuf,
    partial_path: PathBuf,
    channel_id: Snowflake,
    started_at_millis: i64,
    newest: Option<Snowflake>,
    oldest: Option<Snowflake>,
    entries: u64,
}

impl ArchiveWriter {
    /// Open a new snapshot file for one backup run. Fails if a run with
    /// the same channel and start time already left a file behind.
    pub fn create(dir: &Path, channel_id: Snowflake, started_at: DateTime<Utc>) -> Result<Self> {
        fs::create_dir_all(dir).context(IoSnafu {
            path: dir.to_path_buf(),
        })?;
        let started_at_millis = started_at.timestamp_millis();
        let partial_path = dir.join(partial_file_name(channel_id, started_at_millis));
        if partial_path.exists() {
            return SnapshotExistsSnafu { path: partial_path }.fail();
        }
        let file = fs::OpenOptions::new()
            .create_new(true)
            .append(true)
            .open(&partial_path)
            .context(IoSnafu {
                path: partial_path.clone(),
            })?;
        tracing::info!(path = %partial_path.display(), "opened snapshot file");
        Ok(Self {
            file,
            dir: dir.to_path_buf(),
            partial_path,
            channel_id,
            started_at_millis,
            newest: None,
            oldest: None,
            entries: 0,
        })
    }

    /// Path of the in-progress file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.partial_path
    }

    #[must_use]
    pub fn entries(&self) -> u64 {
        self.entries
    }

    /// Newest id appended so far (the first entry of the file).
    #[must_use]
    pub fn newest(&self) -> Option<Snowflake> {
        self.newest
    }

    /// Oldest id appended so far (the last entry of the file).
    #[must_use]
    pub fn oldest(&self) -> Option<Snowflake> {
        self.oldest
    }

    /// Append one entry as a single JSON line.
    ///
    /// Lines are separated by one `\n` with no trailing newline after the
    /// last line and no wrapper array. Appends must arrive in strictly
    /// decreasing id order, matching backward pagination; anything else
    /// is rejected before touching the file.
    pub fn append(&mut self, entry: &MessageEntry) -> Result<()> {
        if let Some(oldest) = self.oldest
            && entry.id >= oldest
        {
            return OutOfOrderSnafu {
                prev: oldest,
                next: entry.id,
            }
            .fail();
        }
        let line = serde_json::to_string(entry).context(SerializeSnafu { id: entry.id })?;
        let mut record = Vec::with_capacity(line.len() + 1);
        if self.entries > 0 {
            record.push(b'\n');
        }
        record.extend_from_slice(line.as_bytes());
        self.file.write_all(&record).context(IoSnafu {
            path: self.partial_path.clone(),
        })?;
        // one line is the most we accept losing on a crash
        self.file.flush().context(IoSnafu {
            path: self.partial_path.clone(),
        })?;
        self.newest.get_or_insert(entry.id);
        self.oldest = Some(entry.id);
        self.entries += 1;
        Ok(())
    }

    /// Close the run and rename the file to its final name.
    ///
    /// `exhausted_down_to` is the lower bound the run read to completion:
    /// the `after` boundary it was given, or [`Snowflake::MIN`] when it
    /// walked to the start of history. A run stopped early (by a message
    /// cap) passes `None` and the span falls back to the oldest id
    /// actually archived — claiming less than was fetched is safe, the
    /// next gap-filling run simply re-reads one boundary message.
    pub fn finish(self, exhausted_down_to: Option<Snowflake>) -> Result<SnapshotMeta> {
        let Self {
            file,
            dir,
            partial_path,
            channel_id,
            started_at_millis,
            newest,
            oldest,
            entries,
        } = self;
        file.sync_all().context(IoSnafu {
            path: partial_path.clone(),
        })?;
        drop(file);

        let span = match (newest, oldest) {
            (Some(newest), Some(oldest)) => SnapshotSpan::Range {
                newest,
                oldest_bound: exhausted_down_to.unwrap_or(oldest),
            },
            _ => SnapshotSpan::Empty { started_at_millis },
        };
        let final_path = dir.join(snapshot_file_name(channel_id, span));
        fs::rename(&partial_path, &final_path).context(IoSnafu {
            path: final_path.clone(),
        })?;
        tracing::info!(
            path = %final_path.display(),
            entries,
            "finalized snapshot"
        );
        Ok(SnapshotMeta {
            path: final_path,
            channel_id,
            span,
        })
    }
}

#[cfg(test)]
mod tests {
    use chanvault_api::types::Snowflake;
    use chrono::Utc;

    use super::*;
    use crate::entry::UserEntry;

    fn entry(id: u64) -> MessageEntry {
        MessageEntry {
            id: Snowflake(id),
            author: UserEntry {
                id: Snowflake(1),
                username: "author".to_string(),
                display_avatar_url: "https://cdn.example.test/1.png".to_string(),
                avatar_url: None,
            },
            content: format!("message {id}"),
            created_at: Utc::now(),
            attachments: Vec::new(),
            reactions: Vec::new(),
            embeds: Vec::new(),
        }
    }

    #[test]
    fn appends_lines_without_trailing_newline() {
        let dir = tempfile::tempdir().unwrap();
        let mut writer = ArchiveWriter::create(dir.path(), Snowflake(5), Utc::now()).unwrap();
        writer.append(&entry(30)).unwrap();
        writer.append(&entry(20)).unwrap();

        // readable mid-run, flushed line by line
        let text = fs::read_to_string(writer.path()).unwrap();
        assert_eq!(text.lines().count(), 2);
        assert!(!text.ends_with('\n'));

        let meta = writer.finish(Some(Snowflake::MIN)).unwrap();
        assert_eq!(
            meta.span,
            SnapshotSpan::Range {
                newest: Snowflake(30),
                oldest_bound: Snowflake::MIN,
            }
        );
        assert!(meta.path.ends_with("msgStream-5-30-0.jsonstream"));
        assert!(meta.path.is_file());
    }

    #[test]
    fn capped_run_claims_only_what_it_archived() {
        let dir = tempfile::tempdir().unwrap();
        let mut writer = ArchiveWriter::create(dir.path(), Snowflake(5), Utc::now()).unwrap();
        writer.append(&entry(30)).unwrap();
        writer.append(&entry(20)).unwrap();
        let meta = writer.finish(None).unwrap();
        assert_eq!(meta.oldest_bound(), Some(Snowflake(20)));
    }

    #[test]
    fn rejects_out_of_order_appends() {
        let dir = tempfile::tempdir().unwrap();
        let mut writer = ArchiveWriter::create(dir.path(), Snowflake(5), Utc::now()).unwrap();
        writer.append(&entry(20)).unwrap();
        let err = writer.append(&entry(20)).unwrap_err();
        assert!(matches!(err, crate::error::VaultError::OutOfOrder { .. }));
        let err = writer.append(&entry(25)).unwrap_err();
        assert!(matches!(err, crate::error::VaultError::OutOfOrder { .. }));
    }

    #[test]
    fn empty_run_finalizes_with_timestamp_name() {
        let dir = tempfile::tempdir().unwrap();
        let started = Utc::now();
        let writer = ArchiveWriter::create(dir.path(), Snowflake(5), started).unwrap();
        let meta = writer.finish(Some(Snowflake::MIN)).unwrap();
        assert_eq!(
            meta.span,
            SnapshotSpan::Empty {
                started_at_millis: started.timestamp_millis(),
            }
        );
        assert!(meta.path.is_file());
        assert_eq!(fs::read_to_string(&meta.path).unwrap(), "");
    }
}
