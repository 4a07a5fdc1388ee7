use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use thiserror::Error;

use crate::model::ids::{BookId, QuizId, SessionId, UserId};

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SessionStateError {
    #[error("completed_at is before started_at")]
    InvalidTimeRange,

    #[error("session is in progress but carries a score")]
    ScoreBeforeCompletion,

    #[error("completed session is missing a score")]
    MissingScore,

    #[error("completed session is missing a completion time")]
    MissingCompletionTime,

    #[error("score {0} is outside [0, 100]")]
    ScoreOutOfRange(u32),

    #[error("question index {index} has more than one answer")]
    DuplicateAnswerIndex { index: u32 },
}

//
// ─── STATUS ────────────────────────────────────────────────────────────────────
//

/// Lifecycle state of a quiz session.
///
/// `InProgress` is the only initial state. `Completed` is reached via explicit
/// completion. `Abandoned` is a terminal state reserved for external cleanup;
/// no engine operation produces it, but every status check treats it as
/// terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    InProgress,
    Completed,
    Abandoned,
}

impl SessionStatus {
    /// Storage/wire representation of the status.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::InProgress => "in_progress",
            SessionStatus::Completed => "completed",
            SessionStatus::Abandoned => "abandoned",
        }
    }

    /// Returns true when the session can still accept answers.
    #[must_use]
    pub fn is_active(&self) -> bool {
        matches!(self, SessionStatus::InProgress)
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

//
// ─── ANSWER ────────────────────────────────────────────────────────────────────
//

/// One scored response to one question index within a session.
///
/// Created once at submission time and immutable thereafter; there is no edit
/// or retraction path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Answer {
    pub question_index: u32,
    pub user_answer: String,
    pub is_correct: bool,
    pub answered_at: DateTime<Utc>,
}

impl Answer {
    #[must_use]
    pub fn new(
        question_index: u32,
        user_answer: impl Into<String>,
        is_correct: bool,
        answered_at: DateTime<Utc>,
    ) -> Self {
        Self {
            question_index,
            user_answer: user_answer.into(),
            is_correct,
            answered_at,
        }
    }
}

//
// ─── SCORE ─────────────────────────────────────────────────────────────────────
//

/// Percentage of answers marked correct, in `[0, 100]`.
///
/// Returns exactly `0.0` for an empty collection. This is the single scoring
/// implementation shared by answer submission, status reporting, and
/// completion, so the three observation points can never disagree for the
/// same answer set.
#[must_use]
pub fn score_percentage(answers: &[Answer]) -> f64 {
    if answers.is_empty() {
        return 0.0;
    }

    let correct = answers.iter().filter(|a| a.is_correct).count();
    #[allow(clippy::cast_precision_loss)]
    let ratio = correct as f64 / answers.len() as f64;
    ratio * 100.0
}

//
// ─── SESSION ───────────────────────────────────────────────────────────────────
//

/// Inputs for a session that has not been assigned an identifier yet.
///
/// The store assigns the identifier at create time; status is always
/// `InProgress` for a fresh session and the answer collection starts empty.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionDraft {
    pub user_id: UserId,
    pub quiz_id: QuizId,
    pub book_id: BookId,
    pub started_at: DateTime<Utc>,
}

impl SessionDraft {
    #[must_use]
    pub fn new(
        user_id: UserId,
        quiz_id: QuizId,
        book_id: BookId,
        started_at: DateTime<Utc>,
    ) -> Self {
        Self {
            user_id,
            quiz_id,
            book_id,
            started_at,
        }
    }
}

/// One user's attempt at one quiz.
///
/// The answer collection is append-only with at most one entry per question
/// index. `score` and `completed_at` are unset while `InProgress` and both set
/// once `Completed`, never changing again.
#[derive(Debug, Clone, PartialEq)]
pub struct QuizSession {
    id: SessionId,
    user_id: UserId,
    quiz_id: QuizId,
    book_id: BookId,
    answers: Vec<Answer>,
    score: Option<f64>,
    started_at: DateTime<Utc>,
    completed_at: Option<DateTime<Utc>>,
    status: SessionStatus,
}

impl QuizSession {
    /// Rehydrate a session from persisted storage, checking its invariants.
    ///
    /// # Errors
    ///
    /// Returns `SessionStateError` when the persisted fields contradict the
    /// lifecycle rules: a score on an in-progress session, a completed session
    /// missing score or completion time, a completion time before the start
    /// time, a score outside `[0, 100]`, or two answers at one index.
    #[allow(clippy::too_many_arguments)]
    pub fn from_persisted(
        id: SessionId,
        user_id: UserId,
        quiz_id: QuizId,
        book_id: BookId,
        answers: Vec<Answer>,
        score: Option<f64>,
        started_at: DateTime<Utc>,
        completed_at: Option<DateTime<Utc>>,
        status: SessionStatus,
    ) -> Result<Self, SessionStateError> {
        if let Some(completed) = completed_at {
            if completed < started_at {
                return Err(SessionStateError::InvalidTimeRange);
            }
        }

        match status {
            SessionStatus::InProgress => {
                if score.is_some() {
                    return Err(SessionStateError::ScoreBeforeCompletion);
                }
            }
            SessionStatus::Completed => {
                if score.is_none() {
                    return Err(SessionStateError::MissingScore);
                }
                if completed_at.is_none() {
                    return Err(SessionStateError::MissingCompletionTime);
                }
            }
            SessionStatus::Abandoned => {}
        }

        if let Some(score) = score {
            if !(0.0..=100.0).contains(&score) {
                #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
                return Err(SessionStateError::ScoreOutOfRange(score.abs() as u32));
            }
        }

        let mut seen = HashSet::new();
        for answer in &answers {
            if !seen.insert(answer.question_index) {
                return Err(SessionStateError::DuplicateAnswerIndex {
                    index: answer.question_index,
                });
            }
        }

        Ok(Self {
            id,
            user_id,
            quiz_id,
            book_id,
            answers,
            score,
            started_at,
            completed_at,
            status,
        })
    }

    #[must_use]
    pub fn id(&self) -> &SessionId {
        &self.id
    }

    #[must_use]
    pub fn user_id(&self) -> &UserId {
        &self.user_id
    }

    #[must_use]
    pub fn quiz_id(&self) -> &QuizId {
        &self.quiz_id
    }

    #[must_use]
    pub fn book_id(&self) -> &BookId {
        &self.book_id
    }

    #[must_use]
    pub fn answers(&self) -> &[Answer] {
        &self.answers
    }

    /// Persisted final score. `None` for any session still in progress.
    #[must_use]
    pub fn score(&self) -> Option<f64> {
        self.score
    }

    #[must_use]
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    #[must_use]
    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }

    #[must_use]
    pub fn status(&self) -> SessionStatus {
        self.status
    }

    /// Number of questions answered so far.
    #[must_use]
    pub fn answered_count(&self) -> usize {
        self.answers.len()
    }

    /// Returns true when the given question index already has an answer.
    #[must_use]
    pub fn has_answer(&self, question_index: u32) -> bool {
        self.answers
            .iter()
            .any(|a| a.question_index == question_index)
    }

    /// Score to report for this session: the persisted value once completed,
    /// otherwise freshly derived from the current answer set. While in
    /// progress the persisted score is `None` by invariant, so a stale value
    /// can never leak through here.
    #[must_use]
    pub fn effective_score(&self) -> f64 {
        match self.score {
            Some(score) => score,
            None => score_percentage(&self.answers),
        }
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::fixed_now;
    use chrono::Duration;

    fn answer(index: u32, is_correct: bool) -> Answer {
        Answer::new(index, format!("answer {index}"), is_correct, fixed_now())
    }

    fn in_progress_session(answers: Vec<Answer>) -> QuizSession {
        QuizSession::from_persisted(
            SessionId::new("s1"),
            UserId::new("u1"),
            QuizId::new("q1"),
            BookId::new("b1"),
            answers,
            None,
            fixed_now(),
            None,
            SessionStatus::InProgress,
        )
        .unwrap()
    }

    #[test]
    fn score_of_empty_answer_set_is_zero() {
        assert_eq!(score_percentage(&[]), 0.0);
    }

    #[test]
    fn score_is_percentage_of_correct_answers() {
        let answers = vec![answer(0, true), answer(1, false), answer(2, true)];
        let score = score_percentage(&answers);
        assert!((score - 200.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn score_stays_within_bounds() {
        let all_wrong = vec![answer(0, false), answer(1, false)];
        let all_right = vec![answer(0, true), answer(1, true)];
        assert_eq!(score_percentage(&all_wrong), 0.0);
        assert_eq!(score_percentage(&all_right), 100.0);
    }

    #[test]
    fn score_recomputation_is_stable() {
        let answers = vec![answer(0, true), answer(3, false)];
        assert_eq!(score_percentage(&answers), score_percentage(&answers));
    }

    #[test]
    fn in_progress_session_rejects_score() {
        let err = QuizSession::from_persisted(
            SessionId::new("s1"),
            UserId::new("u1"),
            QuizId::new("q1"),
            BookId::new("b1"),
            Vec::new(),
            Some(50.0),
            fixed_now(),
            None,
            SessionStatus::InProgress,
        )
        .unwrap_err();
        assert_eq!(err, SessionStateError::ScoreBeforeCompletion);
    }

    #[test]
    fn completed_session_requires_score_and_timestamp() {
        let err = QuizSession::from_persisted(
            SessionId::new("s1"),
            UserId::new("u1"),
            QuizId::new("q1"),
            BookId::new("b1"),
            Vec::new(),
            None,
            fixed_now(),
            Some(fixed_now()),
            SessionStatus::Completed,
        )
        .unwrap_err();
        assert_eq!(err, SessionStateError::MissingScore);

        let err = QuizSession::from_persisted(
            SessionId::new("s1"),
            UserId::new("u1"),
            QuizId::new("q1"),
            BookId::new("b1"),
            Vec::new(),
            Some(100.0),
            fixed_now(),
            None,
            SessionStatus::Completed,
        )
        .unwrap_err();
        assert_eq!(err, SessionStateError::MissingCompletionTime);
    }

    #[test]
    fn completion_cannot_precede_start() {
        let err = QuizSession::from_persisted(
            SessionId::new("s1"),
            UserId::new("u1"),
            QuizId::new("q1"),
            BookId::new("b1"),
            Vec::new(),
            Some(0.0),
            fixed_now(),
            Some(fixed_now() - Duration::minutes(1)),
            SessionStatus::Completed,
        )
        .unwrap_err();
        assert_eq!(err, SessionStateError::InvalidTimeRange);
    }

    #[test]
    fn duplicate_answer_index_is_rejected() {
        let err = QuizSession::from_persisted(
            SessionId::new("s1"),
            UserId::new("u1"),
            QuizId::new("q1"),
            BookId::new("b1"),
            vec![answer(2, true), answer(2, false)],
            None,
            fixed_now(),
            None,
            SessionStatus::InProgress,
        )
        .unwrap_err();
        assert_eq!(err, SessionStateError::DuplicateAnswerIndex { index: 2 });
    }

    #[test]
    fn effective_score_derives_while_in_progress() {
        let session = in_progress_session(vec![answer(0, true)]);
        assert_eq!(session.effective_score(), 100.0);

        let empty = in_progress_session(Vec::new());
        assert_eq!(empty.effective_score(), 0.0);
    }

    #[test]
    fn effective_score_uses_persisted_value_once_completed() {
        let session = QuizSession::from_persisted(
            SessionId::new("s1"),
            UserId::new("u1"),
            QuizId::new("q1"),
            BookId::new("b1"),
            vec![answer(0, false)],
            Some(75.0),
            fixed_now(),
            Some(fixed_now()),
            SessionStatus::Completed,
        )
        .unwrap();
        assert_eq!(session.effective_score(), 75.0);
    }

    #[test]
    fn has_answer_checks_index_occupancy() {
        let session = in_progress_session(vec![answer(1, true), answer(4, false)]);
        assert!(session.has_answer(1));
        assert!(session.has_answer(4));
        assert!(!session.has_answer(0));
        assert_eq!(session.answered_count(), 2);
    }

    #[test]
    fn abandoned_status_is_terminal() {
        let session = QuizSession::from_persisted(
            SessionId::new("s1"),
            UserId::new("u1"),
            QuizId::new("q1"),
            BookId::new("b1"),
            Vec::new(),
            None,
            fixed_now(),
            None,
            SessionStatus::Abandoned,
        )
        .unwrap();
        assert!(!session.status().is_active());
    }
}
