use thiserror::Error;

/// Errors raised by the settings persistence layer.
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    /// The backing store could not be reached
    #[error("Settings store unavailable: {0}")]
    Unavailable(String),

    /// A stored value could not be decoded
    #[error("Invalid value for setting {key}: {message}")]
    InvalidValue { key: String, message: String },

    /// A write was rejected by the backing store
    #[error("Failed to write setting {key}: {message}")]
    WriteFailed { key: String, message: String },
}

/// Errors raised while composing a share document.
///
/// These never leave the composer: every variant is logged and the original
/// markup is served instead.
#[derive(Debug, Error)]
pub enum ComposeError {
    /// The template markup did not produce a usable document tree
    #[error("Failed to parse share document: {0}")]
    Parse(String),

    /// A payload could not be serialized to JSON
    #[error("Failed to serialize {payload} payload: {source}")]
    Payload {
        payload: &'static str,
        #[source]
        source: serde_json::Error,
    },

    /// The mutated tree could not be written back to markup
    #[error("Failed to serialize share document: {0}")]
    Serialize(String),
}

/// Errors surfaced by the HTTP layer.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Settings persistence failed (never downgraded to "not initialized")
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Reading a static document from disk failed
    #[error("Failed to read document {path}: {message}")]
    Document { path: String, message: String },

    /// The requested document does not exist in any candidate root
    #[error("Document not found: {0}")]
    NotFound(String),
}
