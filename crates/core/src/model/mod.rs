mod ids;
mod quiz;
mod session;

pub use ids::{BookId, QuizId, SessionId, UserId};

pub use quiz::{
    CorrectAnswer, DifficultyLevel, Question, QuestionType, Quiz, QuizListItem, QuizListPage,
    normalize_answer,
};
pub use session::{
    Answer, QuizSession, SessionDraft, SessionStateError, SessionStatus, score_percentage,
};
