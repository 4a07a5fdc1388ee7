use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use thiserror::Error;
use uuid::Uuid;

use quiz_core::model::{
    Answer, BookId, QuizId, QuizSession, SessionDraft, SessionId, SessionStateError,
    SessionStatus, UserId,
};

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("conflict")]
    Conflict,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

impl From<SessionStateError> for StorageError {
    fn from(err: SessionStateError) -> Self {
        StorageError::Serialization(err.to_string())
    }
}

/// Persisted shape for a session.
///
/// This mirrors the domain `QuizSession` so repositories can mutate and
/// serialize rows without leaking storage concerns into the domain layer;
/// invariants are re-checked on the way back out via `into_session`.
#[derive(Debug, Clone)]
pub struct SessionRecord {
    pub id: SessionId,
    pub user_id: UserId,
    pub quiz_id: QuizId,
    pub book_id: BookId,
    pub answers: Vec<Answer>,
    pub score: Option<f64>,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub status: SessionStatus,
}

impl SessionRecord {
    /// Fresh record for a draft the store is about to assign an id to.
    #[must_use]
    pub fn new_in_progress(id: SessionId, draft: &SessionDraft) -> Self {
        Self {
            id,
            user_id: draft.user_id.clone(),
            quiz_id: draft.quiz_id.clone(),
            book_id: draft.book_id.clone(),
            answers: Vec::new(),
            score: None,
            started_at: draft.started_at,
            completed_at: None,
            status: SessionStatus::InProgress,
        }
    }

    /// Convert the record back into a domain `QuizSession`.
    ///
    /// # Errors
    ///
    /// Returns `SessionStateError` if the persisted fields violate the
    /// session lifecycle invariants.
    pub fn into_session(self) -> Result<QuizSession, SessionStateError> {
        QuizSession::from_persisted(
            self.id,
            self.user_id,
            self.quiz_id,
            self.book_id,
            self.answers,
            self.score,
            self.started_at,
            self.completed_at,
            self.status,
        )
    }
}

/// Repository contract for quiz sessions.
///
/// This is the engine's only synchronization point: session state lives here,
/// and `complete_session` is the one conditional update whose `applied` flag
/// arbitrates concurrent completions.
#[async_trait]
pub trait SessionRepository: Send + Sync {
    /// Persist a fresh session and return its store-assigned identifier.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the session cannot be stored.
    async fn create_session(&self, draft: &SessionDraft) -> Result<SessionId, StorageError>;

    /// Fetch a session by id. `None` when no such session exists.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on storage failures or invariant-violating rows.
    async fn get_session(&self, id: &SessionId) -> Result<Option<QuizSession>, StorageError>;

    /// Append one answer to the session's collection.
    ///
    /// Returns `false` when the session does not exist. The append itself is
    /// unconditional: duplicate-index screening happens in the engine and two
    /// racing submissions to the same index may both land (see the engine's
    /// concurrency notes).
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on storage failures.
    async fn append_answer(&self, id: &SessionId, answer: &Answer) -> Result<bool, StorageError>;

    /// Atomically mark a session completed, guarded by its current status.
    ///
    /// Returns `false` when the session does not exist or is no longer
    /// `in_progress`; exactly one of two racing completions can observe
    /// `true`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on storage failures.
    async fn complete_session(
        &self,
        id: &SessionId,
        score: f64,
        completed_at: DateTime<Utc>,
    ) -> Result<bool, StorageError>;

    /// List a user's sessions, most recently started first.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on storage failures.
    async fn list_user_sessions(
        &self,
        user_id: &UserId,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<QuizSession>, StorageError>;
}

/// Simple in-memory repository implementation for testing and prototyping.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    sessions: Arc<Mutex<HashMap<SessionId, SessionRecord>>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self {
            sessions: Arc::new(Mutex::new(HashMap::new())),
        }
    }
}

#[async_trait]
impl SessionRepository for InMemoryRepository {
    async fn create_session(&self, draft: &SessionDraft) -> Result<SessionId, StorageError> {
        let id = SessionId::new(Uuid::new_v4().to_string());
        let mut guard = self
            .sessions
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.insert(id.clone(), SessionRecord::new_in_progress(id.clone(), draft));
        Ok(id)
    }

    async fn get_session(&self, id: &SessionId) -> Result<Option<QuizSession>, StorageError> {
        let guard = self
            .sessions
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard
            .get(id)
            .cloned()
            .map(|record| record.into_session().map_err(StorageError::from))
            .transpose()
    }

    async fn append_answer(&self, id: &SessionId, answer: &Answer) -> Result<bool, StorageError> {
        let mut guard = self
            .sessions
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        match guard.get_mut(id) {
            Some(record) => {
                record.answers.push(answer.clone());
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn complete_session(
        &self,
        id: &SessionId,
        score: f64,
        completed_at: DateTime<Utc>,
    ) -> Result<bool, StorageError> {
        let mut guard = self
            .sessions
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        match guard.get_mut(id) {
            Some(record) if record.status == SessionStatus::InProgress => {
                record.status = SessionStatus::Completed;
                record.score = Some(score);
                record.completed_at = Some(completed_at);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn list_user_sessions(
        &self,
        user_id: &UserId,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<QuizSession>, StorageError> {
        let guard = self
            .sessions
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        let mut records: Vec<SessionRecord> = guard
            .values()
            .filter(|record| &record.user_id == user_id)
            .cloned()
            .collect();
        records.sort_by(|a, b| b.started_at.cmp(&a.started_at));

        records
            .into_iter()
            .skip(offset as usize)
            .take(limit as usize)
            .map(|record| record.into_session().map_err(StorageError::from))
            .collect()
    }
}

/// Aggregates the session repository behind a trait object for easy backend
/// swapping.
#[derive(Clone)]
pub struct Storage {
    pub sessions: Arc<dyn SessionRepository>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        let repo = InMemoryRepository::new();
        let sessions: Arc<dyn SessionRepository> = Arc::new(repo);
        Self { sessions }
    }
}
