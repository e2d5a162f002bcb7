//! Engine configuration.
//!
//! One explicit value constructed at startup and passed by parameter into
//! each component. There is no ambient global; tests build their own.

use std::{path::PathBuf, time::Duration};

/// Default pause between restore sends, chosen to stay under platform
/// rate limits.
pub const DEFAULT_SEND_DELAY: Duration = Duration::from_millis(500);

#[derive(Debug, Clone)]
pub struct VaultConfig {
    /// Directory holding snapshot files and attachment bodies.
    pub archive_dir: PathBuf,
    /// Pause between consecutive restore sends.
    pub send_delay: Duration,
    /// Emit a Progress event every N processed messages.
    pub progress_every: u64,
}

impl VaultConfig {
    #[must_use]
    pub fn new(archive_dir: impl Into<PathBuf>) -> Self {
        Self {
            archive_dir: archive_dir.into(),
            send_delay: DEFAULT_SEND_DELAY,
            progress_every: 1,
        }
    }

    #[must_use]
    pub fn send_delay(mut self, delay: Duration) -> Self {
        self.send_delay = delay;
        self
    }

    #[must_use]
    pub fn progress_every(mut self, messages: u64) -> Self {
        self.progress_every = messages.max(1);
        self
    }
}

impl Default for VaultConfig {
    fn default() -> Self {
        Self::new("archive")
    }
}
