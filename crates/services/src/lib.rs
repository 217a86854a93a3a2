#![forbid(unsafe_code)]

pub mod api;
pub mod error;
pub mod sessions;

pub use exam_core::Clock;
pub use sessions as attempt;

pub use api::{
    AttemptSubmission, AttemptSubmissionService, ExamApiClient, ExamApiConfig, ExamContentService,
    SubmissionReceipt,
};
pub use error::{AttemptError, AttemptServiceError, LoadError, SubmitError};

pub use sessions::{
    AttemptLoopService, AttemptPhase, AttemptSession, Countdown, Expired, SharedAttempt,
    TickOutcome,
};
