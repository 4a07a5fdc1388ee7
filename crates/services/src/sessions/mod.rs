mod engine;
mod view;

// Public API of the session subsystem.
pub use crate::error::SessionEngineError;
pub use engine::SessionEngine;
pub use view::{
    CompletedSession, SessionStatusView, StartedSession, SubmittedAnswer, UserSessionItem,
};
