//! Error types for the crawl/index/search pipeline.
//!
//! - `AppError`: domain-specific errors for application operations
//! - `CommandError`: serializable wrapper used at the request-surface boundary
//! - `Result<T>`: type alias for `Result<T, AppError>`

use serde::Serialize;
use std::fmt;
use thiserror::Error;

// ============================================================================
// DOMAIN ERROR TYPE
// ============================================================================

/// Domain-specific errors for application operations.
#[derive(Debug, Error)]
pub enum AppError {
    /// Caller-facing input error: empty query, url not configured, already/not running.
    #[error("{0}")]
    Input(String),

    /// Fetching a page failed (network or protocol error). Abandons the path, not the site.
    #[error("fetch failed for {url}: {message}")]
    Fetch { url: String, message: String },

    /// A store operation exhausted its retry budget against a transient SQLite error.
    #[error("store error: {0}")]
    Store(String),

    /// A site's crawl terminated for a reason other than cancellation or completion.
    #[error("site indexing failed: {0}")]
    FatalSite(String),

    /// Query had no search terms after tokenization and morphological filtering.
    #[error("empty query")]
    InvalidQuery,

    /// Generic error with context, for errors that don't fit another category.
    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl AppError {
    /// Construct a caller-facing input error.
    pub fn input(msg: impl Into<String>) -> Self {
        Self::Input(msg.into())
    }

    /// Construct a fetch error for a specific URL.
    pub fn fetch(url: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Fetch {
            url: url.into(),
            message: msg.into(),
        }
    }

    /// Construct a store error.
    pub fn store(msg: impl Into<String>) -> Self {
        Self::Store(msg.into())
    }
}

/// Result type alias using AppError.
pub type Result<T> = std::result::Result<T, AppError>;

// ============================================================================
// COMMAND ERROR (request-surface boundary)
// ============================================================================

/// Wrapper for errors returned from request-surface operations.
/// Serializable so it can be embedded directly in a JSON failure payload.
#[derive(Debug)]
pub struct CommandError(pub anyhow::Error);

impl std::error::Error for CommandError {}

impl fmt::Display for CommandError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Serialize for CommandError {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&format!("{:#}", self.0))
    }
}

impl From<anyhow::Error> for CommandError {
    fn from(error: anyhow::Error) -> Self {
        Self(error)
    }
}

impl From<AppError> for CommandError {
    fn from(error: AppError) -> Self {
        Self(error.into())
    }
}
