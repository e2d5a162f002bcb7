//! Interfaces the archival engine consumes from a platform client.
//!
//! The engine never talks to a chat platform directly. A concrete client
//! implements [`MessageSource`] for the channel being archived and
//! [`ChannelSink`] for the channel being restored into; the engine drives
//! both strictly sequentially, one request at a time.

use crate::{
    Result,
    types::{ChannelInfo, RawEmbed, RawMessage, RawUser, Snowflake},
};

/// A channel's paginated message history.
///
/// `fetch_page` returns one platform-sized page of messages, newest first,
/// restricted to ids strictly between `after` and `before` (both bounds
/// exclusive, either open). An empty page means the requested window is
/// exhausted.
pub trait MessageSource {
    /// Metadata for the channel this source reads from.
    fn channel(&self) -> &ChannelInfo;

    /// Fetch one page of messages within `(after, before)`, newest first.
    fn fetch_page(
        &self,
        before: Option<Snowflake>,
        after: Option<Snowflake>,
    ) -> impl Future<Output = Result<Vec<RawMessage>>>;

    /// Fetch one page of users who applied `emoji` to `message_id`,
    /// paginating backward from `before`.
    ///
    /// Callers should treat a full page as possibly incomplete: the
    /// platform's boundary cursor does not reliably advance past the first
    /// page for this resource, so the engine never requests deeper pages.
    fn fetch_reaction_users(
        &self,
        message_id: Snowflake,
        emoji: &str,
        before: Option<Snowflake>,
    ) -> impl Future<Output = Result<Vec<RawUser>>>;
}

/// A message to be re-sent into a destination channel during restore.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OutboundMessage {
    pub content: String,
    pub attachments: Vec<OutboundAttachment>,
    pub embeds: Vec<RawEmbed>,
}

impl OutboundMessage {
    /// True when the message carries nothing beyond its text content.
    #[must_use]
    pub fn is_bare(&self) -> bool {
        self.attachments.is_empty() && self.embeds.is_empty()
    }
}

/// An attachment reference for an outbound message. The platform
/// re-uploads from the URL; the archive's local copy is not consulted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundAttachment {
    pub url: String,
    pub filename: String,
    pub spoiler: bool,
}

/// A destination channel that accepts new messages.
pub trait ChannelSink {
    /// Metadata for the channel this sink writes into.
    fn channel(&self) -> &ChannelInfo;

    /// Send one message. Failures are not retried by the engine.
    fn send(&self, message: &OutboundMessage) -> impl Future<Output = Result<()>>;
}
