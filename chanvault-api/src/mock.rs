//! In-memory platform doubles for tests.
//!
//! [`MockChannel`] serves a fixed message history through the
//! [`MessageSource`] trait with deterministic paging, and counts page
//! fetches so tests can assert how many round trips a walk performed.
//! [`RecordingSink`] captures everything sent to it during a restore.

use std::{
    collections::HashMap,
    sync::{
        Mutex,
        atomic::{AtomicUsize, Ordering},
    },
};

use chrono::{TimeZone, Utc};

use crate::{
    Result,
    source::{ChannelSink, MessageSource, OutboundMessage},
    types::{ChannelInfo, ChannelKind, RawMessage, RawUser, Snowflake},
};

/// A fabricated user for fixtures.
#[must_use]
pub fn mock_user(id: u64, username: &str) -> RawUser {
    RawUser {
        id: Snowflake(id),
        username: username.to_string(),
        display_avatar_url: format!("https://cdn.example.test/avatars/{id}.png"),
        avatar_url: None,
    }
}

/// A minimal text message for fixtures. Creation time is derived from the
/// id so that snowflake order and time order agree.
#[must_use]
pub fn mock_message(id: u64, content: &str) -> RawMessage {
    RawMessage {
        id: Snowflake(id),
        author: mock_user(1000 + (id % 7), "poster"),
        content: content.to_string(),
        created_at: Utc.timestamp_opt(1_500_000_000 + i64::try_from(id).unwrap_or(0), 0).unwrap(),
        attachments: Vec::new(),
        reactions: Vec::new(),
        embeds: Vec::new(),
    }
}

pub struct MockChannelBuilder {
    info: ChannelInfo,
    page_size: usize,
    messages: Vec<RawMessage>,
    reaction_users: HashMap<(Snowflake, String), Vec<RawUser>>,
}

impl MockChannelBuilder {
    /// Set the page size returned by `fetch_page` (default 100).
    pub fn page_size(mut self, size: usize) -> Self {
        self.page_size = size;
        self
    }

    /// Override the channel kind (default text).
    pub fn kind(mut self, kind: ChannelKind) -> Self {
        self.info.kind = kind;
        self
    }

    /// Add fully specified messages.
    pub fn messages(mut self, messages: impl IntoIterator<Item = RawMessage>) -> Self {
        self.messages.extend(messages);
        self
    }

    /// Add bare text messages with the given ids.
    pub fn plain_messages(mut self, ids: impl IntoIterator<Item = u64>) -> Self {
        self.messages
            .extend(ids.into_iter().map(|id| mock_message(id, &format!("message {id}"))));
        self
    }

    /// Register the reacting users returned for one (message, emoji) pair.
    pub fn reaction_users(
        mut self,
        message_id: u64,
        emoji: &str,
        users: impl IntoIterator<Item = RawUser>,
    ) -> Self {
        self.reaction_users
            .insert((Snowflake(message_id), emoji.to_string()), users.into_iter().collect());
        self
    }

    pub fn build(mut self) -> MockChannel {
        // history is served newest first
        self.messages.sort_by(|a, b| b.id.cmp(&a.id));
        MockChannel {
            info: self.info,
            page_size: self.page_size,
            messages: self.messages,
            reaction_users: self.reaction_users,
            page_fetches: AtomicUsize::new(0),
        }
    }
}

/// Deterministic in-memory [`MessageSource`].
pub struct MockChannel {
    info: ChannelInfo,
    page_size: usize,
    messages: Vec<RawMessage>,
    reaction_users: HashMap<(Snowflake, String), Vec<RawUser>>,
    page_fetches: AtomicUsize,
}

impl MockChannel {
    pub fn builder(channel_id: u64) -> MockChannelBuilder {
        MockChannelBuilder {
            info: ChannelInfo {
                id: Snowflake(channel_id),
                name: format!("mock-{channel_id}"),
                kind: ChannelKind::Text,
            },
            page_size: 100,
            messages: Vec::new(),
            reaction_users: HashMap::new(),
        }
    }

    /// Number of message page fetches served so far.
    pub fn page_fetches(&self) -> usize {
        self.page_fetches.load(Ordering::SeqCst)
    }
}

impl MessageSource for MockChannel {
    fn channel(&self) -> &ChannelInfo {
        &self.info
    }

    async fn fetch_page(
        &self,
        before: Option<Snowflake>,
        after: Option<Snowflake>,
    ) -> Result<Vec<RawMessage>> {
        self.page_fetches.fetch_add(1, Ordering::SeqCst);
        let page: Vec<RawMessage> = self
            .messages
            .iter()
            .filter(|message| before.is_none_or(|bound| message.id < bound))
            .filter(|message| after.is_none_or(|bound| message.id > bound))
            .take(self.page_size)
            .cloned()
            .collect();
        Ok(page)
    }

    async fn fetch_reaction_users(
        &self,
        message_id: Snowflake,
        emoji: &str,
        before: Option<Snowflake>,
    ) -> Result<Vec<RawUser>> {
        let users = self
            .reaction_users
            .get(&(message_id, emoji.to_string()))
            .cloned()
            .unwrap_or_default();
        Ok(users
            .into_iter()
            .filter(|user| before.is_none_or(|bound| user.id < bound))
            .take(self.page_size)
            .collect())
    }
}

/// A [`ChannelSink`] that records every message it receives.
pub struct RecordingSink {
    info: ChannelInfo,
    sent: Mutex<Vec<OutboundMessage>>,
    fail_after: Option<usize>,
}

impl RecordingSink {
    #[must_use]
    pub fn new(channel_id: u64) -> Self {
        Self {
            info: ChannelInfo {
                id: Snowflake(channel_id),
                name: format!("sink-{channel_id}"),
                kind: ChannelKind::Text,
            },
            sent: Mutex::new(Vec::new()),
            fail_after: None,
        }
    }

    /// Make every send after the first `n` fail, for fatal-send tests.
    #[must_use]
    pub fn failing_after(mut self, n: usize) -> Self {
        self.fail_after = Some(n);
        self
    }

    pub fn sent(&self) -> Vec<OutboundMessage> {
        self.sent.lock().expect("sink lock").clone()
    }
}

impl ChannelSink for RecordingSink {
    fn channel(&self) -> &ChannelInfo {
        &self.info
    }

    async fn send(&self, message: &OutboundMessage) -> Result<()> {
        let mut sent = self.sent.lock().expect("sink lock");
        if let Some(limit) = self.fail_after
            && sent.len() >= limit
        {
            return Err(crate::error::SourceError::Send {
                channel: self.info.id.to_string(),
                message: "mock sink refused the message".to_string(),
            });
        }
        sent.push(message.clone());
        Ok(())
    }
}
