use sqlx::Row;

use quiz_core::model::{Answer, BookId, QuizId, SessionId, SessionStatus, UserId};

use crate::repository::{SessionRecord, StorageError};

fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

pub(crate) fn parse_session_status(s: &str) -> Result<SessionStatus, StorageError> {
    match s {
        "in_progress" => Ok(SessionStatus::InProgress),
        "completed" => Ok(SessionStatus::Completed),
        "abandoned" => Ok(SessionStatus::Abandoned),
        _ => Err(StorageError::Serialization(format!("invalid status: {s}"))),
    }
}

pub(crate) fn question_index_from_i64(v: i64) -> Result<u32, StorageError> {
    u32::try_from(v).map_err(|_| StorageError::Serialization(format!("invalid question_index: {v}")))
}

/// Maps a `sessions` row without its answers; the caller attaches those from
/// the `answers` table.
pub(crate) fn map_session_row(row: &sqlx::sqlite::SqliteRow) -> Result<SessionRecord, StorageError> {
    let status_str: String = row.try_get("status").map_err(ser)?;

    Ok(SessionRecord {
        id: SessionId::new(row.try_get::<String, _>("id").map_err(ser)?),
        user_id: UserId::new(row.try_get::<String, _>("user_id").map_err(ser)?),
        quiz_id: QuizId::new(row.try_get::<String, _>("quiz_id").map_err(ser)?),
        book_id: BookId::new(row.try_get::<String, _>("book_id").map_err(ser)?),
        answers: Vec::new(),
        score: row.try_get("score").map_err(ser)?,
        started_at: row.try_get("started_at").map_err(ser)?,
        completed_at: row.try_get("completed_at").map_err(ser)?,
        status: parse_session_status(status_str.as_str())?,
    })
}

pub(crate) fn map_answer_row(row: &sqlx::sqlite::SqliteRow) -> Result<Answer, StorageError> {
    let question_index =
        question_index_from_i64(row.try_get::<i64, _>("question_index").map_err(ser)?)?;
    let is_correct = row.try_get::<i64, _>("is_correct").map_err(ser)? != 0;

    Ok(Answer {
        question_index,
        user_answer: row.try_get("user_answer").map_err(ser)?,
        is_correct,
        answered_at: row.try_get("answered_at").map_err(ser)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_every_status() {
        assert_eq!(
            parse_session_status("in_progress").unwrap(),
            SessionStatus::InProgress
        );
        assert_eq!(
            parse_session_status("completed").unwrap(),
            SessionStatus::Completed
        );
        assert_eq!(
            parse_session_status("abandoned").unwrap(),
            SessionStatus::Abandoned
        );
        assert!(parse_session_status("paused").is_err());
    }

    #[test]
    fn rejects_negative_question_index() {
        assert!(question_index_from_i64(-1).is_err());
        assert_eq!(question_index_from_i64(3).unwrap(), 3);
    }
}
