/*
 * chanvault - chat channel backup and restore archive engine
 *
 * SPDX-License-Identifier: Apache-2.0
 */
//! # chanvault archive engine
//!
//! Exports a chat channel's message history into an append-only,
//! resumable local archive and replays archives back into a channel.
//!
//! - [`backup::BackupRunner`] — drives one archival run per id range
//! - [`index::ArchiveIndex`] — finds the ranges still missing on disk
//! - [`writer::ArchiveWriter`] / [`reader::ArchiveReader`] — the
//!   line-per-entry snapshot format
//! - [`normalize::EntryNormalizer`] — flattens raw platform messages
//! - [`fetch::AttachmentFetcher`] — deduplicated media download
//! - [`restore::RestorePlayer`] — paced replay into a destination
//!
//! The engine is generic over the traits in `chanvault-api`; it never
//! talks to a platform directly.
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

pub mod backup;
pub mod config;
pub mod entry;
pub mod error;
pub mod fetch;
pub mod index;
pub mod normalize;
pub mod reader;
pub mod restore;
pub mod snapshot;
pub mod writer;

/// Result type alias using [`error::VaultError`] as the default error.
pub type Result<T, E = crate::error::VaultError> = std::result::Result<T, E>;
