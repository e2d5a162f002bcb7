//! Backup orchestration.
//!
//! Drives one sequential flow per run: cursor fetches a page, each
//! message is normalized (downloading attachment bodies as a side
//! effect), the entry is appended and flushed, and the next page is
//! fetched only after the current one is fully archived. Ordering is
//! deterministic given deterministic platform responses; nothing in a
//! run executes in parallel. There is no mid-run cancellation — a run
//! completes, or dies leaving a `.partial` file that a later run's gap
//! computation simply ignores.

use std::path::PathBuf;

use chanvault_api::{
    cursor::MessageCursor,
    source::MessageSource,
    types::Snowflake,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::mpsc::UnboundedSender;

use crate::{
    Result,
    config::VaultConfig,
    error::NotTextChannelSnafu,
    fetch::AttachmentFetcher,
    index::{ArchiveIndex, Gap},
    normalize::EntryNormalizer,
    snapshot::SnapshotMeta,
    writer::ArchiveWriter,
};

/// Progress of a backup run, for consumption by a command-dispatch or
/// display layer. Consumers should match exhaustively.
#[derive(Debug, Clone)]
pub enum BackupEvent {
    Started {
        path: PathBuf,
        channel_id: Snowflake,
        started_at: DateTime<Utc>,
    },
    Progress {
        path: PathBuf,
        channel_id: Snowflake,
        processed: u64,
    },
    Finished {
        path: PathBuf,
        channel_id: Snowflake,
        started_at: DateTime<Utc>,
        newest: Option<Snowflake>,
        oldest: Option<Snowflake>,
        stats: BackupStats,
    },
}

/// Counters kept across one run, reported on Finished.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BackupStats {
    pub messages: u64,
    pub attachments: AttachmentStats,
    pub reactions: ReactionStats,
    pub embeds: u64,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct AttachmentStats {
    pub seen: u64,
    pub downloaded: u64,
    pub already_present: u64,
    pub failed: u64,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ReactionStats {
    pub seen: u64,
    /// Reactions whose user list may be truncated (single-page limit).
    pub partial: u64,
}

pub struct BackupRunner<'a, S: MessageSource> {
    source: &'a S,
    fetcher: AttachmentFetcher,
    config: &'a VaultConfig,
}

impl<'a, S: MessageSource> BackupRunner<'a, S> {
    #[must_use]
    pub fn new(source: &'a S, config: &'a VaultConfig) -> Self {
        Self {
            source,
            fetcher: AttachmentFetcher::new(&config.archive_dir),
            config,
        }
    }

    /// Archive one id range into one new snapshot file.
    ///
    /// `max_messages` caps how many messages are processed; the cap is
    /// enforced here, not in the cursor — once reached, no further page
    /// is fetched. Events are best-effort: a dropped receiver never
    /// fails the run.
    pub async fn run(
        &self,
        gap: Gap,
        max_messages: Option<u64>,
        events: &UnboundedSender<BackupEvent>,
    ) -> Result<SnapshotMeta> {
        let channel = self.source.channel();
        if !channel.kind.is_text() {
            return NotTextChannelSnafu {
                channel: channel.id.to_string(),
                kind: channel.kind.to_string(),
            }
            .fail();
        }

        let started_at = Utc::now();
        let mut writer = ArchiveWriter::create(&self.config.archive_dir, channel.id, started_at)?;
        let path = writer.path().to_path_buf();
        let _ = events.send(BackupEvent::Started {
            path: path.clone(),
            channel_id: channel.id,
            started_at,
        });
        tracing::info!(
            channel = %channel.id,
            ?gap,
            path = %path.display(),
            "starting backup run"
        );

        let normalizer = EntryNormalizer::new(self.source, &self.fetcher);
        let mut cursor = MessageCursor::new(self.source, gap.after, gap.before);
        let mut stats = BackupStats::default();
        while max_messages.is_none_or(|cap| stats.messages < cap) {
            let Some(raw) = cursor.next().await? else {
                break;
            };
            let entry = normalizer.normalize(&raw, &mut stats).await?;
            writer.append(&entry)?;
            stats.messages += 1;
            if stats.messages % self.config.progress_every == 0 {
                let _ = events.send(BackupEvent::Progress {
                    path: path.clone(),
                    channel_id: channel.id,
                    processed: stats.messages,
                });
            }
        }

        // A run that read its window to completion proved coverage down
        // to its lower boundary; a capped run claims only what it wrote.
        let exhausted_down_to = cursor
            .is_exhausted()
            .then(|| gap.after.unwrap_or(Snowflake::MIN));
        let newest = writer.newest();
        let oldest = writer.oldest();
        let meta = writer.finish(exhausted_down_to)?;
        tracing::info!(
            path = %meta.path.display(),
            stats = %serde_json::to_string(&stats).unwrap_or_default(),
            "backup run finished"
        );
        let _ = events.send(BackupEvent::Finished {
            path: meta.path.clone(),
            channel_id: channel.id,
            started_at,
            newest,
            oldest,
            stats,
        });
        Ok(meta)
    }

    /// Gap-driven continuation: compute the channel's missing ranges and
    /// run one backup per gap, most recent gap first. Ranges older than
    /// everything archived are not enqueued automatically.
    pub async fn run_missing(
        &self,
        events: &UnboundedSender<BackupEvent>,
    ) -> Result<Vec<SnapshotMeta>> {
        let index = ArchiveIndex::scan(&self.config.archive_dir, self.source.channel().id)?;
        let gaps = index.missing_ranges();
        tracing::info!(channel = %index.channel_id(), gaps = gaps.len(), "filling missing ranges");
        let mut snapshots = Vec::with_capacity(gaps.len());
        for gap in gaps {
            snapshots.push(self.run(gap, None, events).await?);
        }
        Ok(snapshots)
    }
}
