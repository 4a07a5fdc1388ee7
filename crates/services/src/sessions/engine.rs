use std::sync::Arc;

use tracing::{info, warn};

use quiz_core::Clock;
use quiz_core::model::{
    Answer, BookId, Quiz, QuizId, QuizListPage, QuizSession, SessionDraft, SessionId,
    SessionStatus, UserId, score_percentage,
};
use storage::repository::SessionRepository;

use crate::error::SessionEngineError;
use crate::quiz_client::QuizProvider;
use super::view::{
    CompletedSession, SessionStatusView, StartedSession, SubmittedAnswer, UserSessionItem,
};

//
// ─── ENGINE ────────────────────────────────────────────────────────────────────
//

/// State-machine and scoring core for quiz sessions.
///
/// Sits between the quiz catalog and the session store; holds no session
/// state of its own. Collaborators are injected so tests can substitute
/// doubles, and every operation is safe to run concurrently with operations
/// on other sessions; the store is the sole synchronization point.
#[derive(Clone)]
pub struct SessionEngine {
    clock: Clock,
    quizzes: Arc<dyn QuizProvider>,
    sessions: Arc<dyn SessionRepository>,
}

impl SessionEngine {
    #[must_use]
    pub fn new(
        clock: Clock,
        quizzes: Arc<dyn QuizProvider>,
        sessions: Arc<dyn SessionRepository>,
    ) -> Self {
        Self {
            clock,
            quizzes,
            sessions,
        }
    }

    /// Start a new session for `user_id` against `quiz_id`.
    ///
    /// The quiz must resolve before anything is persisted; an unknown quiz
    /// creates no session record.
    ///
    /// # Errors
    ///
    /// Returns `QuizNotFound`/`UpstreamUnavailable` when the quiz cannot be
    /// resolved, or `StoreUnavailable` when persistence fails.
    pub async fn start_session(
        &self,
        user_id: UserId,
        quiz_id: QuizId,
    ) -> Result<StartedSession, SessionEngineError> {
        let quiz = self.resolve_quiz(&quiz_id).await?;

        let started_at = self.clock.now();
        let draft = SessionDraft::new(
            user_id.clone(),
            quiz_id.clone(),
            quiz.book_id.clone(),
            started_at,
        );
        let session_id = self.sessions.create_session(&draft).await?;

        info!(%session_id, %user_id, %quiz_id, "started quiz session");

        Ok(StartedSession {
            session_id,
            quiz_id,
            total_questions: quiz.total_questions(),
            status: SessionStatus::InProgress,
            started_at,
        })
    }

    /// Record one answer against an in-progress session.
    ///
    /// Preconditions are checked in order: session exists, session is active,
    /// quiz resolves, index is in range, index is unanswered. Each question
    /// may be answered exactly once per session; resubmission is rejected,
    /// never overwritten. The returned score is recomputed from the store's
    /// post-append state, not estimated.
    ///
    /// # Errors
    ///
    /// Returns the precondition failures above as their named kinds, or
    /// `StoreUnavailable` when persistence fails.
    pub async fn submit_answer(
        &self,
        session_id: &SessionId,
        question_index: u32,
        user_answer: &str,
    ) -> Result<SubmittedAnswer, SessionEngineError> {
        let session = self.require_session(session_id).await?;
        self.require_active(&session)?;

        let quiz = self.resolve_quiz(session.quiz_id()).await?;
        let total_questions = quiz.total_questions();

        let Some(question) = quiz.question(question_index as usize) else {
            return Err(SessionEngineError::InvalidQuestionIndex {
                index: question_index,
                total: total_questions,
            });
        };

        if session.has_answer(question_index) {
            return Err(SessionEngineError::DuplicateAnswer {
                index: question_index,
            });
        }

        let is_correct = question.accepts(user_answer);
        let answer = Answer::new(question_index, user_answer, is_correct, self.clock.now());

        let applied = self.sessions.append_answer(session_id, &answer).await?;
        if !applied {
            // The session vanished between the fetch and the append.
            return Err(SessionEngineError::SessionNotFound {
                session_id: session_id.clone(),
            });
        }

        let updated = self.require_session(session_id).await?;
        let current_score = score_percentage(updated.answers());

        info!(
            %session_id,
            question_index,
            is_correct,
            "answer submitted"
        );

        Ok(SubmittedAnswer {
            is_correct,
            correct_answer: question.correct_answer.as_text(),
            explanation: question.explanation.clone(),
            current_score,
            questions_answered: updated.answered_count(),
            total_questions,
        })
    }

    /// Report a session's current state. Read-only.
    ///
    /// Stays available through catalog outages: an unresolvable quiz degrades
    /// `total_questions` to 0 instead of failing the call. The score is the
    /// persisted value once completed, otherwise derived fresh from the
    /// current answer set.
    ///
    /// # Errors
    ///
    /// Returns `SessionNotFound` for an unknown session or `StoreUnavailable`
    /// when the store fails.
    pub async fn session_status(
        &self,
        session_id: &SessionId,
    ) -> Result<SessionStatusView, SessionEngineError> {
        let session = self.require_session(session_id).await?;
        let total_questions = self.resolve_total_degraded(session.quiz_id()).await;
        Ok(SessionStatusView::from_session(&session, total_questions))
    }

    /// Complete an in-progress session: derive the final score from the full
    /// current answer set and apply one conditional update.
    ///
    /// If the update does not apply (another completion already landed), the
    /// call fails with `CompletionConflict` rather than silently succeeding.
    /// Question totals degrade to 0 when the catalog is unreachable, same as
    /// status reporting.
    ///
    /// # Errors
    ///
    /// Returns `SessionNotFound`, `SessionNotActive`, `CompletionConflict`,
    /// or `StoreUnavailable`.
    pub async fn complete_session(
        &self,
        session_id: &SessionId,
    ) -> Result<CompletedSession, SessionEngineError> {
        let session = self.require_session(session_id).await?;
        self.require_active(&session)?;

        let final_score = score_percentage(session.answers());
        let completed_at = self.clock.now();

        let applied = self
            .sessions
            .complete_session(session_id, final_score, completed_at)
            .await?;
        if !applied {
            return Err(SessionEngineError::CompletionConflict {
                session_id: session_id.clone(),
            });
        }

        let total_questions = self.resolve_total_degraded(session.quiz_id()).await;

        info!(%session_id, final_score, "completed quiz session");

        Ok(CompletedSession {
            session_id: session_id.clone(),
            final_score,
            questions_answered: session.answered_count(),
            total_questions,
            completed_at,
            status: SessionStatus::Completed,
        })
    }

    /// List a user's sessions, most recently started first. No catalog calls.
    ///
    /// # Errors
    ///
    /// Returns `StoreUnavailable` when the store fails.
    pub async fn user_sessions(
        &self,
        user_id: &UserId,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<UserSessionItem>, SessionEngineError> {
        let sessions = self
            .sessions
            .list_user_sessions(user_id, limit, offset)
            .await?;
        Ok(sessions.iter().map(UserSessionItem::from_session).collect())
    }

    /// Fetch one quiz from the catalog.
    ///
    /// # Errors
    ///
    /// Returns `QuizNotFound` or `UpstreamUnavailable`.
    pub async fn quiz_details(&self, quiz_id: &QuizId) -> Result<Quiz, SessionEngineError> {
        self.resolve_quiz(quiz_id).await
    }

    /// List quizzes available for a book, straight from the catalog.
    ///
    /// # Errors
    ///
    /// Returns `UpstreamUnavailable` when the catalog cannot be reached.
    pub async fn available_quizzes(
        &self,
        book_id: &BookId,
        limit: u32,
        offset: u32,
    ) -> Result<QuizListPage, SessionEngineError> {
        let page = self
            .quizzes
            .list_quizzes(Some(book_id), limit, offset)
            .await?;
        Ok(page)
    }

    async fn resolve_quiz(&self, quiz_id: &QuizId) -> Result<Quiz, SessionEngineError> {
        self.quizzes
            .fetch_quiz(quiz_id)
            .await?
            .ok_or_else(|| SessionEngineError::QuizNotFound {
                quiz_id: quiz_id.clone(),
            })
    }

    async fn require_session(
        &self,
        session_id: &SessionId,
    ) -> Result<QuizSession, SessionEngineError> {
        self.sessions
            .get_session(session_id)
            .await?
            .ok_or_else(|| SessionEngineError::SessionNotFound {
                session_id: session_id.clone(),
            })
    }

    fn require_active(&self, session: &QuizSession) -> Result<(), SessionEngineError> {
        if session.status().is_active() {
            Ok(())
        } else {
            Err(SessionEngineError::SessionNotActive {
                session_id: session.id().clone(),
                status: session.status(),
            })
        }
    }

    /// Question total for read-only reporting. Never applied to paths that
    /// validate an index or compute a persisted score.
    async fn resolve_total_degraded(&self, quiz_id: &QuizId) -> usize {
        match self.quizzes.fetch_quiz(quiz_id).await {
            Ok(Some(quiz)) => quiz.total_questions(),
            Ok(None) => {
                warn!(%quiz_id, "quiz missing from catalog; reporting zero questions");
                0
            }
            Err(err) => {
                warn!(%quiz_id, error = %err, "quiz catalog unreachable; reporting zero questions");
                0
            }
        }
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
