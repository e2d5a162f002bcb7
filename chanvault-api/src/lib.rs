/*
 * chanvault-api - chat platform interface for the chanvault archive engine
 *
 * SPDX-License-Identifier: Apache-2.0
 */
//! # chanvault platform interface
//!
//! Types and traits a chat-platform client presents to the chanvault
//! archival engine:
//!
//! - [`types::Snowflake`] — time-ordered message/user/channel ids
//! - raw message structures ([`types::RawMessage`] and friends)
//! - [`source::MessageSource`] — paginated history and reaction-user fetch
//! - [`source::ChannelSink`] — destination channel for restore
//! - [`cursor::MessageCursor`] — lazy backward pagination over a source
//!
//! The engine in the `chanvault` crate is generic over these traits, so
//! any platform client (or the in-memory [`mock`] used in tests) can
//! drive a backup or restore.
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_const_for_fn)]
#![allow(clippy::must_use_candidate)]
#![warn(clippy::default_trait_access)]
#![warn(clippy::doc_markdown)]
#![warn(clippy::explicit_iter_loop)]
#![warn(clippy::implicit_clone)]
#![warn(clippy::match_same_arms)]
#![warn(clippy::redundant_clone)]
#![warn(clippy::redundant_closure)]
#![warn(clippy::uninlined_format_args)]
#![warn(clippy::unnecessary_wraps)]
#![warn(clippy::unused_async)]

pub mod cursor;
pub mod error;
#[doc(hidden)]
pub mod mock;
pub mod source;
pub mod types;

/// Result type alias using [`error::SourceError`] as the default error.
pub type Result<T, E = crate::error::SourceError> = std::result::Result<T, E>;

/// Prelude module - import the common surface with `use chanvault_api::prelude::*;`
pub mod prelude {
    pub use crate::error::SourceError;
    pub use crate::{
        cursor::MessageCursor,
        source::{ChannelSink, MessageSource, OutboundAttachment, OutboundMessage},
        types::{
            ChannelInfo, ChannelKind, RawAttachment, RawEmbed, RawEmbedAuthor, RawEmbedFooter,
            RawEmbedMedia, RawEmbedProvider, RawMessage, RawReaction, RawUser, Snowflake,
        },
    };
}
