//! Error types for vcrcache

use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;

/// Result type for vcrcache operations
pub type Result<T> = std::result::Result<T, VcrError>;

/// Boxed error produced by a [`Transport`](crate::network::Transport)
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Errors that can occur while replaying or recording traffic
///
/// Every variant is cheap to clone so a failed population can be handed to
/// every caller that waited on it.
#[derive(Debug, Clone, Error)]
pub enum VcrError {
    /// Cache miss while network calls are denied
    #[error("No cached response for {method} {uri} and network calls are denied")]
    NoCacheEntry {
        /// Request method
        method: String,
        /// Request URI
        uri: String,
    },

    /// Cache file is malformed
    #[error("Bad cache file{}: {message}", .path.as_ref().map(|p| format!(" {}", p.display())).unwrap_or_default())]
    BadCacheFile {
        /// File being read, if known
        path: Option<PathBuf>,
        /// What was wrong with it
        message: String,
    },

    /// Environment or caller contract violation
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Failure reported by the transport, passed through as-is
    #[error("Transport error: {0}")]
    Transport(Arc<dyn std::error::Error + Send + Sync>),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(Arc<io::Error>),

    /// Generic error with context
    #[error("{0}")]
    Other(String),
}

impl VcrError {
    /// Build a `BadCacheFile` error without a path
    pub fn bad_cache_file(message: impl Into<String>) -> Self {
        Self::BadCacheFile {
            path: None,
            message: message.into(),
        }
    }

    /// Attach the file path to a `BadCacheFile` error, leaving others untouched
    #[must_use]
    pub fn with_path(self, file: &std::path::Path) -> Self {
        match self {
            Self::BadCacheFile { path: None, message } => Self::BadCacheFile {
                path: Some(file.to_path_buf()),
                message,
            },
            other => other,
        }
    }

    /// Whether this is a cache miss with network calls denied
    pub fn is_no_cache_entry(&self) -> bool {
        matches!(self, Self::NoCacheEntry { .. })
    }

    /// Whether this is a malformed cache file
    pub fn is_bad_cache_file(&self) -> bool {
        matches!(self, Self::BadCacheFile { .. })
    }

    /// Whether this is a configuration error
    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::Configuration(_))
    }

    /// Whether this came from the transport
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_))
    }
}

impl From<io::Error> for VcrError {
    fn from(err: io::Error) -> Self {
        Self::Io(Arc::new(err))
    }
}

impl From<BoxError> for VcrError {
    fn from(err: BoxError) -> Self {
        Self::Transport(Arc::from(err))
    }
}
