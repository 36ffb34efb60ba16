mod answers;
mod ids;
mod question;
mod quiz;
mod snapshot;

pub use answers::AnswerSheet;
pub use ids::{AttemptId, ParseIdError, QuestionId, QuizId};
pub use question::{Question, QuestionError};
pub use quiz::{Quiz, QuizError};
pub use snapshot::SessionSnapshot;
