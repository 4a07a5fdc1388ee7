#![forbid(unsafe_code)]

pub mod error;
pub mod quiz_client;
pub mod sessions;

pub use quiz_core::Clock;

pub use error::SessionEngineError;
pub use quiz_client::{HttpQuizProvider, QuizClientError, QuizProvider, QuizProviderConfig};
pub use sessions::{
    CompletedSession, SessionEngine, SessionStatusView, StartedSession, SubmittedAnswer,
    UserSessionItem,
};
