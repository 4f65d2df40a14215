//! Typed errors for the capture library.
//!
//! Uses `thiserror` for library errors (not `anyhow`) to provide
//! strongly-typed, composable error handling.

use thiserror::Error;

/// Errors raised by a single extraction pass.
///
/// These are the only two failures the engine surfaces; every heuristic
/// fallback inside the pass is absorbed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExtractionError {
    /// Identity could not be resolved from the URL, the page, or a custom resolver
    #[error("no conversation id")]
    NoConversationId,

    /// Discovery and content extraction produced no usable message
    #[error("no messages")]
    NoMessages,
}

/// Errors from a key/value persistence backend.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Underlying I/O failed
    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Stored payload is not valid JSON
    #[error("storage JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A lock guarding in-memory state was poisoned
    #[error("storage lock poisoned")]
    Poisoned,
}

/// Errors from the history backend.
#[derive(Debug, Error)]
pub enum BackendError {
    /// Request or response failed
    #[error("backend request failed: {0}")]
    Request(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// Backend answered but the payload was unusable
    #[error("invalid backend response: {reason}")]
    InvalidResponse { reason: String },
}

/// Errors from the sync orchestration layer.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Local persistence failed; nothing was pushed
    #[error("storage error: {0}")]
    Store(#[from] StoreError),

    /// Backend push failed
    #[error("backend error: {0}")]
    Backend(#[from] BackendError),

    /// Extraction failed before anything was persisted
    #[error("extraction failed: {0}")]
    Extraction(#[from] ExtractionError),

    /// No provider descriptor matches the page URL
    #[error("no provider matches {url}")]
    NoProvider { url: String },
}

/// Errors from writing content into a page input.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FillError {
    /// No visible, enabled control matched any locator
    #[error("no input control found")]
    NoInput,

    /// Handle does not refer to an element of this page
    #[error("stale input handle")]
    StaleHandle,
}

/// Errors decoding a transported provider descriptor.
#[derive(Debug, Error)]
pub enum DescriptorError {
    /// Descriptor JSON did not match the transport format
    #[error("malformed descriptor: {0}")]
    Malformed(#[from] serde_json::Error),

    /// Descriptor has no id
    #[error("descriptor is missing an id")]
    MissingId,
}

/// Result type alias for extraction passes.
pub type Result<T> = std::result::Result<T, ExtractionError>;

/// Result type alias for storage operations.
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Result type alias for backend operations.
pub type BackendResult<T> = std::result::Result<T, BackendError>;

/// Result type alias for sync operations.
pub type SyncResult<T> = std::result::Result<T, SyncError>;
