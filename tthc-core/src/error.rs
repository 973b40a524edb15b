//! ABOUTME: Error types and handling for the retrieval core
//! ABOUTME: Provides RetrievalError enum and Result type alias

use thiserror::Error;

/// Comprehensive error enum surfaced to callers of the retrieval core.
///
/// Variants map 1:1 onto the error kinds the pipeline is specified to
/// produce: a chunk or procedure missing from the store, a partially
/// degraded result, a result with no surviving retrieval channel, a
/// deadline exceeded, or a caller-initiated cancellation. Everything else
/// collapses to `Internal` and is logged with the session and request id
/// at the call site.
#[derive(Debug, Error)]
pub enum RetrievalError {
    /// No chunk or procedure with the given id exists in the store.
    #[error("not found: {message}")]
    NotFound {
        /// Human-readable detail (chunk id, procedure id, ...).
        message: String,
    },

    /// Some retrieval channels failed but at least one produced results.
    #[error("degraded result for session {session_id}: {message}")]
    Degraded {
        /// Session the request belongs to.
        session_id: String,
        /// Which channel(s) failed and why.
        message: String,
    },

    /// Both the dense and lexical retrieval channels failed.
    #[error("no retrieval channels available for session {session_id}")]
    NoChannels {
        /// Session the request belongs to.
        session_id: String,
    },

    /// The overall request deadline was exceeded.
    #[error("request timed out after {elapsed_ms}ms (session {session_id}, request {request_id})")]
    Timeout {
        /// Session the request belongs to.
        session_id: String,
        /// Request id assigned at entry to `retrieve`.
        request_id: String,
        /// How long the request had run before the deadline fired.
        elapsed_ms: u64,
    },

    /// The caller cancelled the request before it completed.
    #[error("request cancelled (session {session_id}, request {request_id})")]
    Cancelled {
        /// Session the request belongs to.
        session_id: String,
        /// Request id assigned at entry to `retrieve`.
        request_id: String,
    },

    /// Any other failure, with enough context to diagnose without a second lookup.
    #[error("internal error (session {session_id}, request {request_id}): {message}")]
    Internal {
        /// Session the request belongs to.
        session_id: String,
        /// Request id assigned at entry to `retrieve`.
        request_id: String,
        /// Underlying detail.
        message: String,
    },
}

impl RetrievalError {
    /// Wrap an arbitrary collaborator failure as `Internal`, attaching request context.
    #[must_use]
    pub fn internal(session_id: impl Into<String>, request_id: impl Into<String>, err: impl std::fmt::Display) -> Self {
        Self::Internal {
            session_id: session_id.into(),
            request_id: request_id.into(),
            message: err.to_string(),
        }
    }
}

/// Convenience Result type alias for the retrieval core.
pub type Result<T> = std::result::Result<T, RetrievalError>;
