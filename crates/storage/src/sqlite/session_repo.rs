use chrono::{DateTime, Utc};
use uuid::Uuid;

use quiz_core::model::{Answer, QuizSession, SessionDraft, SessionId, UserId};

use super::{
    SqliteRepository,
    mapping::{map_answer_row, map_session_row},
};
use crate::repository::{SessionRepository, StorageError};

fn conn<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Connection(e.to_string())
}

impl SqliteRepository {
    /// Loads a session's answers in insertion order.
    async fn answers_for(&self, id: &SessionId) -> Result<Vec<Answer>, StorageError> {
        let rows = sqlx::query(
            r"
                SELECT question_index, user_answer, is_correct, answered_at
                FROM answers
                WHERE session_id = ?1
                ORDER BY id ASC
            ",
        )
        .bind(id.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        let mut answers = Vec::with_capacity(rows.len());
        for row in rows {
            answers.push(map_answer_row(&row)?);
        }
        Ok(answers)
    }
}

#[async_trait::async_trait]
impl SessionRepository for SqliteRepository {
    async fn create_session(&self, draft: &SessionDraft) -> Result<SessionId, StorageError> {
        let id = SessionId::new(Uuid::new_v4().to_string());

        sqlx::query(
            r"
                INSERT INTO sessions (
                    id, user_id, quiz_id, book_id, status, score, started_at, completed_at
                )
                VALUES (?1, ?2, ?3, ?4, 'in_progress', NULL, ?5, NULL)
            ",
        )
        .bind(id.as_str())
        .bind(draft.user_id.as_str())
        .bind(draft.quiz_id.as_str())
        .bind(draft.book_id.as_str())
        .bind(draft.started_at)
        .execute(&self.pool)
        .await
        .map_err(conn)?;

        Ok(id)
    }

    async fn get_session(&self, id: &SessionId) -> Result<Option<QuizSession>, StorageError> {
        let row = sqlx::query(
            r"
                SELECT id, user_id, quiz_id, book_id, status, score, started_at, completed_at
                FROM sessions
                WHERE id = ?1
            ",
        )
        .bind(id.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(conn)?;

        let Some(row) = row else {
            return Ok(None);
        };

        let mut record = map_session_row(&row)?;
        record.answers = self.answers_for(id).await?;
        Ok(Some(record.into_session()?))
    }

    async fn append_answer(&self, id: &SessionId, answer: &Answer) -> Result<bool, StorageError> {
        // Guarded insert so a vanished session yields applied = false instead
        // of a foreign key error.
        let res = sqlx::query(
            r"
                INSERT INTO answers (session_id, question_index, user_answer, is_correct, answered_at)
                SELECT ?1, ?2, ?3, ?4, ?5
                WHERE EXISTS (SELECT 1 FROM sessions WHERE id = ?1)
            ",
        )
        .bind(id.as_str())
        .bind(i64::from(answer.question_index))
        .bind(answer.user_answer.as_str())
        .bind(i64::from(answer.is_correct))
        .bind(answer.answered_at)
        .execute(&self.pool)
        .await
        .map_err(conn)?;

        Ok(res.rows_affected() > 0)
    }

    async fn complete_session(
        &self,
        id: &SessionId,
        score: f64,
        completed_at: DateTime<Utc>,
    ) -> Result<bool, StorageError> {
        let res = sqlx::query(
            r"
                UPDATE sessions
                SET status = 'completed', score = ?2, completed_at = ?3
                WHERE id = ?1 AND status = 'in_progress'
            ",
        )
        .bind(id.as_str())
        .bind(score)
        .bind(completed_at)
        .execute(&self.pool)
        .await
        .map_err(conn)?;

        Ok(res.rows_affected() > 0)
    }

    async fn list_user_sessions(
        &self,
        user_id: &UserId,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<QuizSession>, StorageError> {
        let rows = sqlx::query(
            r"
                SELECT id, user_id, quiz_id, book_id, status, score, started_at, completed_at
                FROM sessions
                WHERE user_id = ?1
                ORDER BY started_at DESC, id DESC
                LIMIT ?2 OFFSET ?3
            ",
        )
        .bind(user_id.as_str())
        .bind(i64::from(limit))
        .bind(i64::from(offset))
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        let mut sessions = Vec::with_capacity(rows.len());
        for row in rows {
            let mut record = map_session_row(&row)?;
            record.answers = self.answers_for(&record.id).await?;
            sessions.push(record.into_session()?);
        }
        Ok(sessions)
    }
}
