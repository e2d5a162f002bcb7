//! Raw message normalization.
//!
//! Converts one fetched [`RawMessage`] into one flat [`MessageEntry`]:
//! nested user/reaction/embed structures are rebuilt field-by-field as
//! plain value structs, and each attachment is handed to the
//! [`AttachmentFetcher`] so its body lands on disk. The input is never
//! mutated. Platform failures propagate; attachment download failures do
//! not (they are absorbed by the fetcher and counted in the stats).

use chanvault_api::{
    source::MessageSource,
    types::{RawAttachment, RawEmbed, RawEmbedMedia, RawMessage, RawUser},
};

use crate::{
    Result,
    backup::BackupStats,
    entry::{
        AttachmentEntry, EmbedAuthorEntry, EmbedEntry, EmbedFooterEntry, EmbedMediaEntry,
        EmbedProviderEntry, MessageEntry, ReactionEntry, UserEntry,
    },
    fetch::{AttachmentFetcher, FetchOutcome},
};

pub struct EntryNormalizer<'a, S: MessageSource> {
    source: &'a S,
    fetcher: &'a AttachmentFetcher,
}

impl<'a, S: MessageSource> EntryNormalizer<'a, S> {
    pub fn new(source: &'a S, fetcher: &'a AttachmentFetcher) -> Self {
        Self { source, fetcher }
    }

    /// Flatten one raw message into an archive entry, fetching attachment
    /// bodies and materializing reacting users along the way.
    pub async fn normalize(&self, raw: &RawMessage, stats: &mut BackupStats) -> Result<MessageEntry> {
        let mut attachments = Vec::with_capacity(raw.attachments.len());
        for raw_attachment in &raw.attachments {
            let attachment = attachment_entry(raw_attachment);
            stats.attachments.seen += 1;
            match self.fetcher.ensure_local(&attachment).await {
                FetchOutcome::Downloaded => stats.attachments.downloaded += 1,
                FetchOutcome::AlreadyPresent => stats.attachments.already_present += 1,
                FetchOutcome::Failed => stats.attachments.failed += 1,
            }
            attachments.push(attachment);
        }

        let mut reactions = Vec::with_capacity(raw.reactions.len());
        for raw_reaction in &raw.reactions {
            // Single page only: the platform's boundary cursor does not
            // reliably advance past page one for reaction users, so
            // instead of guessing at deeper pages the entry records that
            // the list may be truncated.
            let users = self
                .source
                .fetch_reaction_users(raw.id, &raw_reaction.emoji, None)
                .await?;
            let partial = usize::try_from(raw_reaction.count).unwrap_or(usize::MAX) > users.len();
            stats.reactions.seen += 1;
            if partial {
                stats.reactions.partial += 1;
            }
            reactions.push(ReactionEntry {
                emoji: raw_reaction.emoji.clone(),
                users: users.iter().map(user_entry).collect(),
                partial,
            });
        }

        stats.embeds += raw.embeds.len() as u64;
        Ok(MessageEntry {
            id: raw.id,
            author: user_entry(&raw.author),
            content: raw.content.clone(),
            created_at: raw.created_at,
            attachments,
            reactions,
            embeds: raw.embeds.iter().map(embed_entry).collect(),
        })
    }
}

fn user_entry(raw: &RawUser) -> UserEntry {
    UserEntry {
        id: raw.id,
        username: raw.username.clone(),
        display_avatar_url: raw.display_avatar_url.clone(),
        avatar_url: raw.avatar_url.clone(),
    }
}

fn attachment_entry(raw: &RawAttachment) -> AttachmentEntry {
    AttachmentEntry {
        id: raw.id,
        filename: raw.filename.clone(),
        url: raw.url.clone(),
        spoiler: raw.spoiler,
        size: raw.size,
        width: raw.width,
        height: raw.height,
    }
}

fn embed_entry(raw: &RawEmbed) -> EmbedEntry {
    EmbedEntry {
        title: raw.title.clone(),
        description: raw.description.clone(),
        url: raw.url.clone(),
        timestamp: raw.timestamp,
        image: raw.image.as_ref().map(embed_media),
        thumbnail: raw.thumbnail.as_ref().map(embed_media),
        video: raw.video.as_ref().map(embed_media),
        footer: raw.footer.as_ref().map(|footer| EmbedFooterEntry {
            text: footer.text.clone(),
            icon_url: footer.icon_url.clone(),
            proxy_icon_url: footer.proxy_icon_url.clone(),
        }),
        provider: raw.provider.as_ref().map(|provider| EmbedProviderEntry {
            name: provider.name.clone(),
            url: provider.url.clone(),
        }),
        author: raw.author.as_ref().map(|author| EmbedAuthorEntry {
            name: author.name.clone(),
            url: author.url.clone(),
            icon_url: author.icon_url.clone(),
            proxy_icon_url: author.proxy_icon_url.clone(),
        }),
    }
}

fn embed_media(raw: &RawEmbedMedia) -> EmbedMediaEntry {
    EmbedMediaEntry {
        url: raw.url.clone(),
        proxy_url: raw.proxy_url.clone(),
        width: raw.width,
        height: raw.height,
    }
}

#[cfg(test)]
mod tests {
    use chanvault_api::{
        mock::{MockChannel, mock_user},
        types::{RawEmbedFooter, RawReaction, Snowflake},
    };
    use chrono::Utc;

    use super::*;

    fn rich_raw_message() -> RawMessage {
        RawMessage {
            id: Snowflake(40),
            author: mock_user(3, "author"),
            content: "look at this".to_string(),
            created_at: Utc::now(),
            attachments: vec![RawAttachment {
                id: Snowflake(900),
                filename: "cat.png".to_string(),
                url: "http://127.0.0.1:1/cat.png".to_string(),
                spoiler: true,
                size: Some(2048),
                width: Some(64),
                height: Some(64),
            }],
            reactions: vec![RawReaction {
                emoji: "🔥".to_string(),
                count: 2,
            }],
            embeds: vec![RawEmbed {
                title: Some("a link".to_string()),
                url: Some("https://example.test/page".to_string()),
                image: Some(RawEmbedMedia {
                    url: "https://example.test/img.png".to_string(),
                    proxy_url: None,
                    width: Some(800),
                    height: Some(600),
                }),
                footer: Some(RawEmbedFooter {
                    text: "footer".to_string(),
                    icon_url: None,
                    proxy_icon_url: None,
                }),
                ..RawEmbed::default()
            }],
        }
    }

    #[test_log::test(tokio::test)]
    async fn flattens_users_reactions_and_embeds() {
        let channel = MockChannel::builder(1)
            .reaction_users(40, "🔥", [mock_user(4, "fan"), mock_user(5, "stan")])
            .build();
        let dir = tempfile::tempdir().unwrap();
        let fetcher = AttachmentFetcher::new(dir.path());
        // drop the attachment body in place so no download is attempted
        let raw = rich_raw_message();
        std::fs::write(fetcher.local_path(&attachment_entry(&raw.attachments[0])), b"x").unwrap();

        let normalizer = EntryNormalizer::new(&channel, &fetcher);
        let mut stats = BackupStats::default();
        let entry = normalizer.normalize(&raw, &mut stats).await.unwrap();

        assert_eq!(entry.id, Snowflake(40));
        assert_eq!(entry.author.username, "author");
        assert_eq!(entry.attachments.len(), 1);
        assert!(entry.attachments[0].spoiler);
        assert_eq!(entry.reactions.len(), 1);
        assert_eq!(
            entry.reactions[0]
                .users
                .iter()
                .map(|user| user.username.as_str())
                .collect::<Vec<_>>(),
            vec!["fan", "stan"]
        );
        assert!(!entry.reactions[0].partial);
        assert_eq!(entry.embeds[0].title.as_deref(), Some("a link"));
        assert_eq!(entry.embeds[0].image.as_ref().unwrap().width, Some(800));
        assert_eq!(stats.attachments.already_present, 1);
        assert_eq!(stats.reactions.seen, 1);
        assert_eq!(stats.embeds, 1);
    }

    #[test_log::test(tokio::test)]
    async fn truncated_reaction_users_set_the_partial_flag() {
        // count says 2, but only one user is enumerable
        let channel = MockChannel::builder(1)
            .reaction_users(40, "🔥", [mock_user(4, "fan")])
            .build();
        let dir = tempfile::tempdir().unwrap();
        let fetcher = AttachmentFetcher::new(dir.path());
        let mut raw = rich_raw_message();
        raw.attachments.clear();

        let normalizer = EntryNormalizer::new(&channel, &fetcher);
        let mut stats = BackupStats::default();
        let entry = normalizer.normalize(&raw, &mut stats).await.unwrap();
        assert!(entry.reactions[0].partial);
        assert_eq!(stats.reactions.partial, 1);
    }
}
