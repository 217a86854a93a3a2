mod config;
mod contract;
mod http;

pub use config::{ApiConfigError, ExamApiConfig};
pub use contract::{
    AttemptSubmission, AttemptSubmissionService, ExamContentService, SubmissionReceipt,
};
pub use http::ExamApiClient;
