#![forbid(unsafe_code)]

pub mod client;
pub mod error;
pub mod navigation;
pub mod session;

pub use quiz_core::Clock;

pub use client::{HttpQuizService, QuizApiConfig, QuizService};
pub use error::{QuizServiceError, SessionError};
pub use navigation::{NavigationHost, NullNavigationHost};
pub use session::{
    AttemptSession, AttemptSessionService, SessionRunner, SessionState, results_route,
};
