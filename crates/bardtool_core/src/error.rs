use thiserror::Error;

/// Failure taxonomy for document edits and collaborator calls.
///
/// Only `MalformedDocument` is fatal for a run; the other variants are
/// reported per item and the batch continues.
#[derive(Debug, Error)]
pub enum MigrationError {
    #[error("malformed document: {0}")]
    MalformedDocument(String),

    #[error("text not found: {0}")]
    SpanNotFound(String),

    #[error("span no longer matches document: {0}")]
    StaleSpan(String),

    #[error("network failure for {url}: {reason}")]
    NetworkFailure { url: String, reason: String },

    #[error("storage failure for {path}: {reason}")]
    StorageFailure { path: String, reason: String },

    #[error("invalid redirect table: {0}")]
    InvalidRedirectTable(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl MigrationError {
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::MalformedDocument(message.into())
    }

    pub fn network(url: &str, reason: impl ToString) -> Self {
        Self::NetworkFailure {
            url: url.to_string(),
            reason: reason.to_string(),
        }
    }

    pub fn storage(path: &str, reason: impl ToString) -> Self {
        Self::StorageFailure {
            path: path.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Whether the failure should abort the whole run rather than skip one item.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::MalformedDocument(_) | Self::Io(_))
    }
}
