//! Backward pagination cursor over a channel's message history.
//!
//! [`MessageCursor`] produces messages lazily, newest first, one platform
//! page at a time. The boundary state lives in the cursor itself rather
//! than on the call stack, so arbitrarily long histories walk in constant
//! stack space.

use std::collections::VecDeque;

use crate::{
    Result,
    source::MessageSource,
    types::{RawMessage, Snowflake},
};

/// Lazily walks a channel's history from `before` backward toward `after`
/// (or to the start of history when `after` is open).
///
/// Each call to [`next`](Self::next) yields one message; when the buffered
/// page is exhausted the cursor awaits exactly one page fetch with the
/// current boundary and advances the boundary to the last id yielded.
/// The cursor terminates when a fetch returns an empty page. It imposes no
/// count limit of its own; callers that want at most N messages stop
/// calling `next` after N.
pub struct MessageCursor<'a, S: MessageSource> {
    source: &'a S,
    after: Option<Snowflake>,
    before: Option<Snowflake>,
    buffer: VecDeque<RawMessage>,
    exhausted: bool,
}

impl<'a, S: MessageSource> MessageCursor<'a, S> {
    pub fn new(source: &'a S, after: Option<Snowflake>, before: Option<Snowflake>) -> Self {
        Self {
            source,
            after,
            before,
            buffer: VecDeque::new(),
            exhausted: false,
        }
    }

    /// Yield the next message, fetching a page when the buffer runs dry.
    ///
    /// Returns `Ok(None)` once the window `(after, before)` is exhausted.
    /// No two page fetches for one cursor run concurrently; every fetch is
    /// a suspension point.
    pub async fn next(&mut self) -> Result<Option<RawMessage>> {
        if self.buffer.is_empty() && !self.exhausted {
            let page = self.source.fetch_page(self.before, self.after).await?;
            match page.last().map(|message| message.id) {
                Some(last_id) => {
                    tracing::debug!(
                        page_len = page.len(),
                        boundary = %last_id,
                        "fetched message page"
                    );
                    self.before = Some(last_id);
                    self.buffer.extend(page);
                }
                None => self.exhausted = true,
            }
        }
        Ok(self.buffer.pop_front())
    }

    /// True once the cursor has seen an empty page and will yield nothing
    /// further. The underlying window was read to completion.
    #[must_use]
    pub fn is_exhausted(&self) -> bool {
        self.exhausted && self.buffer.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockChannel;

    fn collect_ids(messages: &[RawMessage]) -> Vec<u64> {
        messages.iter().map(|message| message.id.get()).collect()
    }

    async fn drain<S: MessageSource>(cursor: &mut MessageCursor<'_, S>) -> Vec<RawMessage> {
        let mut out = Vec::new();
        while let Some(message) = cursor.next().await.unwrap() {
            out.push(message);
        }
        out
    }

    #[test_log::test(tokio::test)]
    async fn walks_backward_across_pages() {
        let channel = MockChannel::builder(1)
            .page_size(2)
            .plain_messages([50, 40, 30, 20, 10])
            .build();
        let mut cursor = MessageCursor::new(&channel, None, None);
        let messages = drain(&mut cursor).await;
        assert_eq!(collect_ids(&messages), vec![50, 40, 30, 20, 10]);
        assert!(cursor.is_exhausted());
        // 3 full-or-partial pages plus the empty terminator
        assert_eq!(channel.page_fetches(), 4);
    }

    #[test_log::test(tokio::test)]
    async fn respects_both_boundaries() {
        let channel = MockChannel::builder(1)
            .page_size(10)
            .plain_messages([50, 40, 30, 20, 10])
            .build();
        let mut cursor = MessageCursor::new(&channel, Some(Snowflake(10)), Some(Snowflake(50)));
        let messages = drain(&mut cursor).await;
        assert_eq!(collect_ids(&messages), vec![40, 30, 20]);
    }

    #[test_log::test(tokio::test)]
    async fn empty_channel_terminates_after_one_fetch() {
        let channel = MockChannel::builder(1).build();
        let mut cursor = MessageCursor::new(&channel, None, None);
        assert!(cursor.next().await.unwrap().is_none());
        assert!(cursor.is_exhausted());
        assert_eq!(channel.page_fetches(), 1);
    }

    #[test_log::test(tokio::test)]
    async fn capped_consumer_skips_further_fetches() {
        let channel = MockChannel::builder(1)
            .page_size(2)
            .plain_messages([50, 40, 30, 20, 10])
            .build();
        let mut cursor = MessageCursor::new(&channel, None, None);
        // consumer-enforced cap of 2: stop calling next() after two items
        let mut taken = Vec::new();
        for _ in 0..2 {
            taken.push(cursor.next().await.unwrap().unwrap());
        }
        assert_eq!(collect_ids(&taken), vec![50, 40]);
        assert_eq!(channel.page_fetches(), 1);
    }
}
