//! Archive index and gap computation.
//!
//! Scans a directory for a channel's finalized snapshots, orders their
//! covered ranges newest first, and computes the id ranges still missing
//! so a backup can resume where previous runs left off.

use std::path::{Path, PathBuf};

use chanvault_api::types::Snowflake;
use snafu::ResultExt;

use crate::{
    Result,
    error::IoSnafu,
    snapshot::{SnapshotMeta, SnapshotSpan, parse_snapshot_path},
};

/// An id range known to be missing from the archive, expressed as fetch
/// boundaries: messages with ids strictly between `after` and `before`.
/// An open `before` means "everything newer"; both open means "all
/// history".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Gap {
    pub after: Option<Snowflake>,
    pub before: Option<Snowflake>,
}

impl Gap {
    /// The fully open range: nothing archived yet, back up everything.
    #[must_use]
    pub fn all_history() -> Self {
        Self {
            after: None,
            before: None,
        }
    }
}

impl std::fmt::Display for Gap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match (self.after, self.before) {
            (None, None) => write!(f, "(all history)"),
            (Some(after), None) => write!(f, "(newer than {after})"),
            (None, Some(before)) => write!(f, "(older than {before})"),
            (Some(after), Some(before)) => write!(f, "({after}..{before} exclusive)"),
        }
    }
}

/// The set of finalized snapshots for one channel in one directory.
#[derive(Debug)]
pub struct ArchiveIndex {
    channel_id: Snowflake,
    dir: PathBuf,
    /// Range-covering snapshots, sorted descending by newest id.
    ranged: Vec<SnapshotMeta>,
    /// Empty-run snapshots; readable but covering nothing.
    empty: Vec<SnapshotMeta>,
}

impl ArchiveIndex {
    /// List and parse the channel's snapshot files under `dir`. Partial
    /// files and files of other channels are ignored.
    pub fn scan(dir: &Path, channel_id: Snowflake) -> Result<Self> {
        let mut ranged = Vec::new();
        let mut empty = Vec::new();
        if dir.is_dir() {
            for dir_entry in std::fs::read_dir(dir).context(IoSnafu {
                path: dir.to_path_buf(),
            })? {
                let dir_entry = dir_entry.context(IoSnafu {
                    path: dir.to_path_buf(),
                })?;
                let Some(meta) = parse_snapshot_path(&dir_entry.path()) else {
                    continue;
                };
                if meta.channel_id != channel_id {
                    continue;
                }
                match meta.span {
                    SnapshotSpan::Range { .. } => ranged.push(meta),
                    SnapshotSpan::Empty { .. } => empty.push(meta),
                }
            }
        }
        ranged.sort_by(|a, b| b.newest().cmp(&a.newest()));
        empty.sort_by(|a, b| b.path.cmp(&a.path));
        Ok(Self {
            channel_id,
            dir: dir.to_path_buf(),
            ranged,
            empty,
        })
    }

    #[must_use]
    pub fn channel_id(&self) -> Snowflake {
        self.channel_id
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Range-covering snapshots, newest first.
    #[must_use]
    pub fn snapshots(&self) -> &[SnapshotMeta] {
        &self.ranged
    }

    /// Snapshots from runs that archived nothing.
    #[must_use]
    pub fn empty_snapshots(&self) -> &[SnapshotMeta] {
        &self.empty
    }

    /// Compute the ranges still missing, most recent gap first.
    ///
    /// The walk keeps the running lower bound of coverage: the first
    /// (most recent) snapshot is preceded by the gap "everything newer
    /// than its newest id"; between consecutive snapshots a gap exists
    /// only when the older file's newest id falls short of the newer
    /// file's lower bound. Contiguous or overlapping windows produce no
    /// gap. With no snapshots at all, the single result is the fully
    /// open range.
    ///
    /// The range older than everything archived is *not* included; see
    /// [`oldest_covered`](Self::oldest_covered) for callers that want to
    /// extend further back.
    #[must_use]
    pub fn missing_ranges(&self) -> Vec<Gap> {
        if self.ranged.is_empty() {
            return vec![Gap::all_history()];
        }
        let mut gaps = Vec::new();
        let mut last_oldest: Option<Snowflake> = None;
        for meta in &self.ranged {
            let SnapshotSpan::Range {
                newest,
                oldest_bound,
            } = meta.span
            else {
                continue;
            };
            match last_oldest {
                None => gaps.push(Gap {
                    after: Some(newest),
                    before: None,
                }),
                Some(bound) if newest < bound => gaps.push(Gap {
                    after: Some(newest),
                    before: Some(bound),
                }),
                // contiguous or overlapping with what we walked already
                Some(_) => {}
            }
            last_oldest = Some(last_oldest.map_or(oldest_bound, |bound| bound.min(oldest_bound)));
        }
        gaps
    }

    /// The lower bound of overall coverage: everything older than this is
    /// unarchived (unless the bound is already [`Snowflake::MIN`]).
    #[must_use]
    pub fn oldest_covered(&self) -> Option<Snowflake> {
        self.ranged.iter().filter_map(SnapshotMeta::oldest_bound).min()
    }
}

#[cfg(test)]
mod tests {
    use chanvault_api::types::Snowflake;

    use super::*;
    use crate::snapshot::snapshot_file_name;

    fn touch_snapshot(dir: &Path, channel: u64, newest: u64, oldest_bound: u64) {
        let name = snapshot_file_name(
            Snowflake(channel),
            SnapshotSpan::Range {
                newest: Snowflake(newest),
                oldest_bound: Snowflake(oldest_bound),
            },
        );
        std::fs::write(dir.join(name), "").unwrap();
    }

    #[test]
    fn no_snapshots_means_all_history() {
        let dir = tempfile::tempdir().unwrap();
        let index = ArchiveIndex::scan(dir.path(), Snowflake(7)).unwrap();
        assert_eq!(index.missing_ranges(), vec![Gap::all_history()]);
        assert_eq!(index.oldest_covered(), None);
    }

    #[test]
    fn single_snapshot_leaves_only_the_newer_gap() {
        let dir = tempfile::tempdir().unwrap();
        touch_snapshot(dir.path(), 7, 100, 50);
        let index = ArchiveIndex::scan(dir.path(), Snowflake(7)).unwrap();
        assert_eq!(
            index.missing_ranges(),
            vec![Gap {
                after: Some(Snowflake(100)),
                before: None,
            }]
        );
        assert_eq!(index.oldest_covered(), Some(Snowflake(50)));
    }

    #[test]
    fn contiguous_snapshots_produce_no_extra_gap() {
        let dir = tempfile::tempdir().unwrap();
        touch_snapshot(dir.path(), 7, 100, 50);
        touch_snapshot(dir.path(), 7, 50, 10);
        let index = ArchiveIndex::scan(dir.path(), Snowflake(7)).unwrap();
        // coverage reaches back to 10 with no hole between the windows
        assert_eq!(
            index.missing_ranges(),
            vec![Gap {
                after: Some(Snowflake(100)),
                before: None,
            }]
        );
        assert_eq!(index.oldest_covered(), Some(Snowflake(10)));
    }

    #[test]
    fn hole_between_snapshots_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        touch_snapshot(dir.path(), 7, 100, 50);
        touch_snapshot(dir.path(), 7, 40, 10);
        let index = ArchiveIndex::scan(dir.path(), Snowflake(7)).unwrap();
        assert_eq!(
            index.missing_ranges(),
            vec![
                Gap {
                    after: Some(Snowflake(100)),
                    before: None,
                },
                Gap {
                    after: Some(Snowflake(40)),
                    before: Some(Snowflake(50)),
                },
            ]
        );
    }

    #[test]
    fn overlapping_snapshots_do_not_confuse_the_walk() {
        let dir = tempfile::tempdir().unwrap();
        touch_snapshot(dir.path(), 7, 100, 50);
        touch_snapshot(dir.path(), 7, 80, 10);
        let index = ArchiveIndex::scan(dir.path(), Snowflake(7)).unwrap();
        assert_eq!(
            index.missing_ranges(),
            vec![Gap {
                after: Some(Snowflake(100)),
                before: None,
            }]
        );
        assert_eq!(index.oldest_covered(), Some(Snowflake(10)));
    }

    #[test]
    fn ignores_partial_files_and_other_channels() {
        let dir = tempfile::tempdir().unwrap();
        touch_snapshot(dir.path(), 8, 100, 50);
        std::fs::write(
            dir.path()
                .join(crate::snapshot::partial_file_name(Snowflake(7), 1234)),
            "",
        )
        .unwrap();
        std::fs::write(dir.path().join("atStream-1-cat.png"), "").unwrap();
        let index = ArchiveIndex::scan(dir.path(), Snowflake(7)).unwrap();
        assert!(index.snapshots().is_empty());
        assert_eq!(index.missing_ranges(), vec![Gap::all_history()]);
    }
}
