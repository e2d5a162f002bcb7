//! Snapshot replay into a destination channel.
//!
//! Entries are sent strictly sequentially in file order, with a fixed
//! pacing delay between consecutive sends to stay under platform rate
//! limits. A failed send is fatal to the run and is not retried; the
//! caller re-runs the restore from scratch if it wants another attempt.

use std::time::Duration;

use chanvault_api::{
    source::{ChannelSink, OutboundAttachment, OutboundMessage},
    types::{RawEmbed, RawEmbedAuthor, RawEmbedFooter, RawEmbedMedia, RawEmbedProvider},
};
use serde::Serialize;

use crate::{
    Result,
    config::VaultConfig,
    entry::{EmbedEntry, EmbedMediaEntry, MessageEntry},
    reader::ArchiveReader,
};

/// Counters for one replay run.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct RestoreStats {
    pub sent: u64,
}

pub struct RestorePlayer<'a, S: ChannelSink> {
    sink: &'a S,
    delay: Duration,
}

impl<'a, S: ChannelSink> RestorePlayer<'a, S> {
    #[must_use]
    pub fn new(sink: &'a S, config: &VaultConfig) -> Self {
        Self {
            sink,
            delay: config.send_delay,
        }
    }

    /// Replay every entry of the snapshot into the sink. Bare entries are
    /// sent as content alone; entries carrying attachments or embeds go
    /// out with the reconstructed references. The pacing delay sits
    /// between sends, not before the first or after the last.
    pub async fn replay(&self, reader: &ArchiveReader) -> Result<RestoreStats> {
        tracing::info!(
            path = %reader.path().display(),
            channel = %self.sink.channel().id,
            "starting restore"
        );
        let mut stats = RestoreStats::default();
        for entry in reader.entries()? {
            let entry = entry?;
            if stats.sent > 0 {
                tokio::time::sleep(self.delay).await;
            }
            let message = outbound_message(&entry);
            self.sink.send(&message).await?;
            stats.sent += 1;
            tracing::debug!(id = %entry.id, "restored message");
        }
        tracing::info!(sent = stats.sent, "restore finished");
        Ok(stats)
    }
}

/// Rebuild the sendable form of an archived entry.
fn outbound_message(entry: &MessageEntry) -> OutboundMessage {
    OutboundMessage {
        content: entry.content.clone(),
        attachments: entry
            .attachments
            .iter()
            .map(|attachment| OutboundAttachment {
                url: attachment.url.clone(),
                filename: attachment.filename.clone(),
                spoiler: attachment.spoiler,
            })
            .collect(),
        embeds: entry.embeds.iter().map(raw_embed).collect(),
    }
}

fn raw_embed(entry: &EmbedEntry) -> RawEmbed {
    RawEmbed {
        title: entry.title.clone(),
        description: entry.description.clone(),
        url: entry.url.clone(),
        timestamp: entry.timestamp,
        image: entry.image.as_ref().map(raw_embed_media),
        thumbnail: entry.thumbnail.as_ref().map(raw_embed_media),
        video: entry.video.as_ref().map(raw_embed_media),
        footer: entry.footer.as_ref().map(|footer| RawEmbedFooter {
            text: footer.text.clone(),
            icon_url: footer.icon_url.clone(),
            proxy_icon_url: footer.proxy_icon_url.clone(),
        }),
        provider: entry.provider.as_ref().map(|provider| RawEmbedProvider {
            name: provider.name.clone(),
            url: provider.url.clone(),
        }),
        author: entry.author.as_ref().map(|author| RawEmbedAuthor {
            name: author.name.clone(),
            url: author.url.clone(),
            icon_url: author.icon_url.clone(),
            proxy_icon_url: author.proxy_icon_url.clone(),
        }),
    }
}

fn raw_embed_media(entry: &EmbedMediaEntry) -> RawEmbedMedia {
    RawEmbedMedia {
        url: entry.url.clone(),
        proxy_url: entry.proxy_url.clone(),
        width: entry.width,
        height: entry.height,
    }
}
