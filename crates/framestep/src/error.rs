//! Error types for framestep.
//!
//! Nothing in this crate lets an error escape an input entry point. Operations
//! that can fail return [`Result`], and the [`Session`](crate::Session)
//! turns every failure into a diagnostic: a `tracing` event plus an emission on
//! [`Session::diagnostics`](crate::Session::diagnostics).

use std::time::Duration;

/// Result type alias for framestep operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors reported by the host when a media element rejects a request.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum MediaError {
    /// The element has no media loaded or is not ready for the request.
    #[error("media element is not ready: {0}")]
    NotReady(String),

    /// The element refused the request (e.g. autoplay policy on `play`).
    #[error("media element rejected the request: {0}")]
    Rejected(String),
}

/// Errors from the settings store collaborator.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SettingsError {
    /// The store could not persist a value.
    #[error("failed to persist setting '{key}': {message}")]
    Write { key: String, message: String },
}

impl SettingsError {
    /// Create a write error.
    pub fn write(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Write {
            key: key.into(),
            message: message.into(),
        }
    }
}

/// Errors from the presentation bridge.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PresentationError {
    /// The surface could not be positioned because the target has no geometry.
    #[error("element bounds are unavailable")]
    BoundsUnavailable,

    /// The surface could not be shown.
    #[error("failed to show control surface: {0}")]
    Show(String),
}

/// Errors that can occur while handling input or running an action.
///
/// This is also the payload of the diagnostic channel, so it is `Clone`.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Error {
    /// An action needed an active media element and none could be found.
    #[error("no active media element to {operation}")]
    NoActiveTarget { operation: &'static str },

    /// A required optional capability is absent.
    #[error("{capability} is not supported by this host")]
    Unsupported { capability: &'static str },

    /// The media element rejected a seek, play or similar request.
    #[error("unable to {operation}: {source}")]
    Media {
        operation: &'static str,
        #[source]
        source: MediaError,
    },

    /// Frame-rate detection observed no decoded frames or no elapsed time.
    #[error("unable to detect frame rate: {frames} frames decoded in {elapsed:?}")]
    InsufficientSamples { frames: i64, elapsed: Duration },

    /// A settings write failed. In-memory state keeps the new value.
    #[error(transparent)]
    Settings(#[from] SettingsError),

    /// The presentation bridge failed.
    #[error(transparent)]
    Presentation(#[from] PresentationError),
}

impl Error {
    /// Create a no-target error.
    pub fn no_target(operation: &'static str) -> Self {
        Self::NoActiveTarget { operation }
    }

    /// Create an unsupported-capability error.
    pub fn unsupported(capability: &'static str) -> Self {
        Self::Unsupported { capability }
    }

    /// Create a media error.
    pub fn media(operation: &'static str, source: MediaError) -> Self {
        Self::Media { operation, source }
    }
}
