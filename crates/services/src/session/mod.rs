mod machine;
mod runner;
mod service;

pub use machine::{AttemptSession, SessionState};
pub use runner::{AUTOSAVE_INTERVAL, COUNTDOWN_TICK, SessionRunner};
pub use service::{AttemptSessionService, results_route};
