//! Streaming snapshot reader.
//!
//! Reads one JSON entry per line, lazily. A malformed line is fatal: the
//! iterator reports the parse error with its line number and yields
//! nothing further — skipping a corrupt record and continuing would
//! silently reorder a restore around the hole.

use std::{
    fs,
    io::{BufRead, BufReader},
    path::{Path, PathBuf},
};

use snafu::ResultExt;

use crate::{
    Result,
    entry::MessageEntry,
    error::{EmptyArchiveSnafu, IoSnafu, MissingArchiveSnafu, VaultError},
};

/// A snapshot file opened for reading. Cheap to construct; each call to
/// [`entries`](Self::entries) re-opens the file from the top, so a
/// sequence is restartable but not resumable mid-stream.
#[derive(Debug, Clone)]
pub struct ArchiveReader {
    path: PathBuf,
}

impl ArchiveReader {
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if !path.is_file() {
            return MissingArchiveSnafu { path }.fail();
        }
        Ok(Self { path })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Lazily iterate the archived entries in file order (newest message
    /// first).
    pub fn entries(&self) -> Result<Entries> {
        let file = fs::File::open(&self.path).context(IoSnafu {
            path: self.path.clone(),
        })?;
        Ok(Entries {
            path: self.path.clone(),
            lines: BufReader::new(file).lines(),
            line: 0,
            fused: false,
        })
    }

    /// The first line's entry: the newest archived message.
    pub fn first_entry(&self) -> Result<MessageEntry> {
        self.entries()?
            .next()
            .unwrap_or_else(|| EmptyArchiveSnafu {
                path: self.path.clone(),
            }
            .fail())
    }

    /// The final line's entry: the oldest archived message. Scans the
    /// whole file.
    pub fn last_entry(&self) -> Result<MessageEntry> {
        let mut last = None;
        for entry in self.entries()? {
            last = Some(entry?);
        }
        last.ok_or_else(|| {
            EmptyArchiveSnafu {
                path: self.path.clone(),
            }
            .build()
        })
    }
}

/// Lazy line-by-line entry iterator. Fuses after the first error.
pub struct Entries {
    path: PathBuf,
    lines: std::io::Lines<BufReader<fs::File>>,
    line: usize,
    fused: bool,
}

impl Entries {
    fn parse_line(&self, text: &str) -> Result<MessageEntry> {
        let mut deserializer = serde_json::Deserializer::from_str(text);
        serde_path_to_error::deserialize(&mut deserializer).map_err(|source| {
            VaultError::MalformedEntry {
                path: self.path.clone(),
                line: self.line,
                source,
            }
        })
    }
}

impl Iterator for Entries {
    type Item = Result<MessageEntry>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.fused {
            return None;
        }
        let text = match self.lines.next()? {
            Ok(text) => text,
            Err(source) => {
                self.fused = true;
                return Some(Err(VaultError::Io {
                    path: self.path.clone(),
                    source,
                }));
            }
        };
        self.line += 1;
        let parsed = self.parse_line(&text);
        if parsed.is_err() {
            self.fused = true;
        }
        Some(parsed)
    }
}
