mod ids;
mod status;
mod summary;

pub use ids::{ParseIdError, QuestionId, TestId};
pub use status::{AnswerStatus, QuestionState};
pub use summary::AttemptSummary;
pub use test::{Question, QuestionError, TestDefinition, TestDefinitionError};
