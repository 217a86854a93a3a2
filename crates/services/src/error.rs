//! Shared error types for the services crate.

use thiserror::Error;

use exam_core::model::{QuestionError, QuestionId, TestDefinitionError, TestId};

/// Errors raised while loading a test definition. Fatal to session start;
/// the workflow performs no automatic retry.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum LoadError {
    #[error("test {0} was not found")]
    NotFound(TestId),

    #[error("content service returned status {0}")]
    HttpStatus(reqwest::StatusCode),

    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error("malformed test content: {0}")]
    Content(#[from] TestDefinitionError),

    #[error("malformed question: {0}")]
    Question(#[from] QuestionError),
}

/// Errors raised while submitting an attempt. Recoverable: the session stays
/// in the submitting state with its answers intact, so a retry resends the
/// identical payload.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SubmitError {
    #[error("submission rejected with status {status}: {message}")]
    Rejected {
        status: reqwest::StatusCode,
        message: String,
    },

    #[error(transparent)]
    Http(#[from] reqwest::Error),
}

/// Errors raised by the attempt state machine itself.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum AttemptError {
    #[error("unknown question id: {0}")]
    UnknownQuestion(QuestionId),

    #[error("option {option:?} does not belong to question {question}")]
    InvalidOption {
        question: QuestionId,
        option: String,
    },

    #[error("question index {index} out of range for {len} questions")]
    OutOfRange { index: usize, len: usize },

    #[error("attempt is no longer active")]
    NotActive,

    #[error("attempt is not awaiting submission")]
    NotSubmitting,

    #[error("attempt state lock poisoned")]
    Poisoned,
}

/// Umbrella error for the attempt workflow.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AttemptServiceError {
    #[error(transparent)]
    Load(#[from] LoadError),

    #[error(transparent)]
    Submit(#[from] SubmitError),

    #[error(transparent)]
    Attempt(#[from] AttemptError),
}
