use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::ids::{BookId, QuizId};

//
// ─── QUESTION TYPES ────────────────────────────────────────────────────────────
//

/// Shape of a quiz question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionType {
    MultipleChoice,
    Boolean,
    Open,
}

/// Difficulty tag assigned by the quiz generator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DifficultyLevel {
    Easy,
    Medium,
    Hard,
}

/// Canonical correct answer, stored upstream as either text or a boolean.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CorrectAnswer {
    Boolean(bool),
    Text(String),
}

impl CorrectAnswer {
    /// Renders the canonical answer as text.
    ///
    /// Booleans become `"true"`/`"false"` so they compare under the same
    /// normalization as free-text answers.
    #[must_use]
    pub fn as_text(&self) -> String {
        match self {
            CorrectAnswer::Boolean(b) => b.to_string(),
            CorrectAnswer::Text(s) => s.clone(),
        }
    }
}

/// Normalizes an answer for comparison: surrounding whitespace is trimmed and
/// the text is lowercased. Applied uniformly to both the submitted answer and
/// the canonical one, regardless of question type.
#[must_use]
pub fn normalize_answer(answer: &str) -> String {
    answer.trim().to_lowercase()
}

//
// ─── QUESTION ──────────────────────────────────────────────────────────────────
//

/// One question within a quiz, addressed by its position in `Quiz::questions`.
///
/// Field names follow the quiz generator's wire format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    pub question: String,
    #[serde(rename = "type")]
    pub question_type: QuestionType,
    pub correct_answer: CorrectAnswer,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<String>>,
    pub explanation: String,
    pub difficulty: DifficultyLevel,
    pub topic: String,
    pub concepts_tested: Vec<String>,
}

impl Question {
    /// Returns true when the submitted answer matches the canonical one after
    /// normalization. Exact string equality, no numeric tolerance or synonym
    /// matching.
    #[must_use]
    pub fn accepts(&self, user_answer: &str) -> bool {
        normalize_answer(user_answer) == normalize_answer(&self.correct_answer.as_text())
    }
}

//
// ─── QUIZ ──────────────────────────────────────────────────────────────────────
//

/// A quiz as served by the external catalog. Read-only to the engine.
///
/// Question order is stable for the lifetime of the quiz; indices are the
/// sole addressing mechanism used by sessions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quiz {
    #[serde(alias = "_id")]
    pub id: QuizId,
    pub book_id: BookId,
    pub questions: Vec<Question>,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ai_model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
}

impl Quiz {
    /// Total number of questions in this quiz.
    #[must_use]
    pub fn total_questions(&self) -> usize {
        self.questions.len()
    }

    /// Returns the question at the given index, if any.
    #[must_use]
    pub fn question(&self, index: usize) -> Option<&Question> {
        self.questions.get(index)
    }
}

/// Catalog listing entry: quiz metadata without its questions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuizListItem {
    #[serde(alias = "_id")]
    pub id: QuizId,
    pub book_id: BookId,
    pub questions_count: usize,
    pub created_at: DateTime<Utc>,
}

/// One page of a catalog listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuizListPage {
    pub quizzes: Vec<QuizListItem>,
    pub total: usize,
    pub limit: u32,
    pub offset: u32,
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::fixed_now;

    fn open_question(correct: &str) -> Question {
        Question {
            question: "What is the capital of Italy?".into(),
            question_type: QuestionType::Open,
            correct_answer: CorrectAnswer::Text(correct.into()),
            options: None,
            explanation: "Rome has been the capital since 1871.".into(),
            difficulty: DifficultyLevel::Easy,
            topic: "Geography".into(),
            concepts_tested: vec!["capitals".into()],
        }
    }

    #[test]
    fn accepts_is_case_insensitive_and_trims() {
        let q = open_question("Rome");
        assert!(q.accepts("rome"));
        assert!(q.accepts("  ROME "));
        assert!(!q.accepts("Milan"));
    }

    #[test]
    fn boolean_answers_compare_as_text() {
        let q = Question {
            question: "Rome is the capital of Italy.".into(),
            question_type: QuestionType::Boolean,
            correct_answer: CorrectAnswer::Boolean(true),
            options: None,
            explanation: "It is.".into(),
            difficulty: DifficultyLevel::Easy,
            topic: "Geography".into(),
            concepts_tested: vec![],
        };
        assert!(q.accepts("true"));
        assert!(q.accepts(" TRUE "));
        assert!(!q.accepts("false"));
        assert_eq!(q.correct_answer.as_text(), "true");
    }

    #[test]
    fn quiz_addresses_questions_by_index() {
        let quiz = Quiz {
            id: QuizId::new("q1"),
            book_id: BookId::new("b1"),
            questions: vec![open_question("Rome"), open_question("Paris")],
            created_at: fixed_now(),
            ai_model: None,
            metadata: None,
        };
        assert_eq!(quiz.total_questions(), 2);
        assert!(quiz.question(1).is_some());
        assert!(quiz.question(2).is_none());
    }

    #[test]
    fn quiz_deserializes_catalog_payload() {
        let payload = serde_json::json!({
            "_id": "quiz-7",
            "book_id": "book-3",
            "questions": [{
                "question": "Water boils at 100C at sea level.",
                "type": "boolean",
                "correct_answer": true,
                "explanation": "At standard pressure.",
                "difficulty": "easy",
                "topic": "Physics",
                "concepts_tested": ["phase transitions"]
            }],
            "created_at": "2024-01-15T10:00:00Z",
            "metadata": {"source": "generator"}
        });

        let quiz: Quiz = serde_json::from_value(payload).unwrap();
        assert_eq!(quiz.id, QuizId::new("quiz-7"));
        assert_eq!(quiz.total_questions(), 1);
        assert_eq!(
            quiz.questions[0].correct_answer,
            CorrectAnswer::Boolean(true)
        );
    }
}
