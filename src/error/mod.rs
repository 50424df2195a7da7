//! Error types for `jirel`.
//!
//! # Design
//!
//! - Uses `thiserror` for derive-based error types
//! - Translation and diff errors are raised before any request is formed
//! - Transport errors pass through unreinterpreted (retry policy belongs
//!   to the caller, not this crate)

use thiserror::Error;

use crate::model::IssueKey;
use crate::transport::TransportError;

/// Primary error type for `jirel` operations.
#[derive(Error, Debug)]
pub enum JirelError {
    // === Query translation errors ===
    /// The predicate uses an operator/field/type combination JQL cannot
    /// express.
    #[error("Unsupported query: {reason}")]
    UnsupportedQuery { reason: String },

    /// A custom-field display name has no resolvable field identifier.
    #[error("Unknown custom field: '{name}'")]
    UnknownField { name: String },

    // === Entity errors ===
    /// Issue with the specified key was not found on the server.
    #[error("Issue not found: {key}")]
    IssueNotFound { key: String },

    /// The operation requires a server-assigned key, but the issue has
    /// never been saved.
    #[error("Issue has not been saved; no server key assigned")]
    NotSaved,

    /// The issue key's project prefix disagrees with the issue's project.
    #[error("Issue key '{key}' does not belong to project '{project}'")]
    KeyMismatch { key: IssueKey, project: String },

    /// An update was rejected because the server-side entity changed
    /// underneath the local snapshot.
    #[error("Stale entity: {key} changed on the server since it was loaded")]
    StaleEntity { key: String },

    /// A malformed issue key string.
    #[error("Invalid issue key format: '{key}'")]
    InvalidKey { key: String },

    // === Remote / wire errors ===
    /// The service returned a non-success status this crate does not map
    /// to a more specific variant.
    #[error("Remote error (status {status}): {message}")]
    Remote { status: u16, message: String },

    /// Transport-level failure, surfaced verbatim.
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // === Local errors ===
    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The operation was cancelled via its cancellation token.
    #[error("Operation cancelled")]
    Cancelled,
}

impl JirelError {
    /// Create an `UnsupportedQuery` error.
    #[must_use]
    pub fn unsupported(reason: impl Into<String>) -> Self {
        Self::UnsupportedQuery {
            reason: reason.into(),
        }
    }

    /// Create an `UnknownField` error.
    #[must_use]
    pub fn unknown_field(name: impl Into<String>) -> Self {
        Self::UnknownField { name: name.into() }
    }

    /// True when the error means "the entity does not exist", as opposed
    /// to a genuine failure.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::IssueNotFound { .. })
    }

    /// True when the operation stopped because its token was cancelled.
    #[must_use]
    pub const fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    /// True when the error was raised locally, before any request was sent.
    #[must_use]
    pub const fn is_local(&self) -> bool {
        matches!(
            self,
            Self::UnsupportedQuery { .. }
                | Self::UnknownField { .. }
                | Self::NotSaved
                | Self::KeyMismatch { .. }
                | Self::InvalidKey { .. }
                | Self::Config(_)
        )
    }
}

/// Result type using `JirelError`.
pub type Result<T> = std::result::Result<T, JirelError>;
