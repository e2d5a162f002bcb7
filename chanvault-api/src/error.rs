//! Errors reported by platform sources and sinks.
//!
use snafu::prelude::*;

/// Errors a platform client implementation can surface to the engine.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum SourceError {
    /// The platform rejected or failed a request.
    #[snafu(display("platform api error ({code}): {message}"))]
    Api { code: u16, message: String },

    /// Expected item was not found on the platform.
    #[snafu(display("{kind} {key} not found"))]
    NotFound { kind: String, key: String },

    /// A request parameter failed validation before being sent.
    #[snafu(display("validation error: {message}"))]
    Validation { message: String },

    /// A send to a destination channel was refused.
    #[snafu(display("send to channel {channel} failed: {message}"))]
    Send { channel: String, message: String },

    /// Some other error occurred.
    #[snafu(display("{message}"))]
    Other { message: String },
}
