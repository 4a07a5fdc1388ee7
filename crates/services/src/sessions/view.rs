use chrono::{DateTime, Utc};
use serde::Serialize;

use quiz_core::model::{BookId, QuizId, QuizSession, SessionId, SessionStatus};

/// View returned by session start.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StartedSession {
    pub session_id: SessionId,
    pub quiz_id: QuizId,
    pub total_questions: usize,
    pub status: SessionStatus,
    pub started_at: DateTime<Utc>,
}

/// View returned by answer submission: the verdict plus the score recomputed
/// over the post-append answer set.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubmittedAnswer {
    pub is_correct: bool,
    pub correct_answer: String,
    pub explanation: String,
    pub current_score: f64,
    pub questions_answered: usize,
    pub total_questions: usize,
}

/// Point-in-time view of a session.
///
/// `total_questions` degrades to 0 when the catalog cannot resolve the quiz;
/// status reporting stays available through catalog outages.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionStatusView {
    pub session_id: SessionId,
    pub quiz_id: QuizId,
    pub book_id: BookId,
    pub status: SessionStatus,
    pub score: f64,
    pub questions_answered: usize,
    pub total_questions: usize,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl SessionStatusView {
    #[must_use]
    pub fn from_session(session: &QuizSession, total_questions: usize) -> Self {
        Self {
            session_id: session.id().clone(),
            quiz_id: session.quiz_id().clone(),
            book_id: session.book_id().clone(),
            status: session.status(),
            score: session.effective_score(),
            questions_answered: session.answered_count(),
            total_questions,
            started_at: session.started_at(),
            completed_at: session.completed_at(),
        }
    }
}

/// View returned by session completion.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompletedSession {
    pub session_id: SessionId,
    pub final_score: f64,
    pub questions_answered: usize,
    pub total_questions: usize,
    pub completed_at: DateTime<Utc>,
    pub status: SessionStatus,
}

/// List item for a user's session history. No catalog lookups are made for
/// listings, so question totals are not part of this view.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserSessionItem {
    pub session_id: SessionId,
    pub quiz_id: QuizId,
    pub book_id: BookId,
    pub status: SessionStatus,
    pub score: f64,
    pub questions_answered: usize,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl UserSessionItem {
    #[must_use]
    pub fn from_session(session: &QuizSession) -> Self {
        Self {
            session_id: session.id().clone(),
            quiz_id: session.quiz_id().clone(),
            book_id: session.book_id().clone(),
            status: session.status(),
            score: session.effective_score(),
            questions_answered: session.answered_count(),
            started_at: session.started_at(),
            completed_at: session.completed_at(),
        }
    }
}
