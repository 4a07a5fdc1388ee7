//! Shared error types for the services crate.

use thiserror::Error;

use quiz_core::model::{QuizId, SessionId, SessionStatus};
use storage::repository::StorageError;

use crate::quiz_client::QuizClientError;

/// Errors emitted by `SessionEngine`.
///
/// A closed taxonomy: every failure an engine operation can raise is one of
/// these kinds, so callers dispatch on the kind rather than on message text.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SessionEngineError {
    /// The referenced quiz does not exist in the catalog.
    #[error("quiz {quiz_id} not found")]
    QuizNotFound { quiz_id: QuizId },

    /// The catalog is unreachable or erroring; distinct from "not found".
    #[error("quiz catalog unavailable")]
    UpstreamUnavailable(#[from] QuizClientError),

    /// The referenced session does not exist.
    #[error("session {session_id} not found")]
    SessionNotFound { session_id: SessionId },

    /// The operation requires `in_progress` but the session is terminal.
    #[error("session {session_id} is not in progress (status: {status})")]
    SessionNotActive {
        session_id: SessionId,
        status: SessionStatus,
    },

    /// The question index falls outside `[0, total_questions)`.
    #[error("invalid question index {index}: quiz has {total} questions")]
    InvalidQuestionIndex { index: u32, total: usize },

    /// The question index already has a recorded answer.
    #[error("question {index} already answered")]
    DuplicateAnswer { index: u32 },

    /// The conditional completion update did not apply: another completion
    /// already landed.
    #[error("completion of session {session_id} did not apply")]
    CompletionConflict { session_id: SessionId },

    /// The session store failed for infrastructure reasons.
    #[error("session store unavailable")]
    StoreUnavailable(#[from] StorageError),
}

impl SessionEngineError {
    /// Total mapping from error kind to the HTTP status a transport wrapper
    /// should answer with.
    #[must_use]
    pub fn http_status(&self) -> u16 {
        match self {
            SessionEngineError::QuizNotFound { .. }
            | SessionEngineError::SessionNotFound { .. } => 404,
            SessionEngineError::SessionNotActive { .. }
            | SessionEngineError::InvalidQuestionIndex { .. }
            | SessionEngineError::DuplicateAnswer { .. } => 400,
            SessionEngineError::CompletionConflict { .. } => 409,
            SessionEngineError::UpstreamUnavailable(_) => 502,
            SessionEngineError::StoreUnavailable(_) => 503,
        }
    }
}
