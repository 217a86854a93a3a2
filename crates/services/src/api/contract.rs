use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use exam_core::model::{QuestionId, TestDefinition, TestId};

use crate::error::{LoadError, SubmitError};

/// Payload posted to the submission endpoint. Scoring happens server-side;
/// unanswered questions are simply absent from the map.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AttemptSubmission {
    #[serde(rename = "testId")]
    pub test_id: TestId,
    pub answers: BTreeMap<QuestionId, String>,
}

/// Acknowledgement returned by the submission endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SubmissionReceipt {
    pub success: bool,
    #[serde(default)]
    pub message: String,
}

/// Read side of the exam content API.
#[async_trait]
pub trait ExamContentService: Send + Sync {
    /// Fetch a test's metadata and ordered question list.
    ///
    /// # Errors
    ///
    /// Returns `LoadError` when the test is missing, the service is
    /// unreachable, or the content is malformed.
    async fn fetch_test(&self, id: &TestId) -> Result<TestDefinition, LoadError>;
}

/// Write side: accepts one completed answer map per attempt.
#[async_trait]
pub trait AttemptSubmissionService: Send + Sync {
    /// Submit a completed answer map for server-side scoring.
    ///
    /// # Errors
    ///
    /// Returns `SubmitError` when the request fails or the server rejects
    /// the attempt.
    async fn submit_attempt(
        &self,
        submission: &AttemptSubmission,
    ) -> Result<SubmissionReceipt, SubmitError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn submission_serializes_with_wire_field_names() {
        let mut answers = BTreeMap::new();
        answers.insert(QuestionId::new("q1"), "A".to_string());

        let submission = AttemptSubmission {
            test_id: TestId::new("t1"),
            answers,
        };

        let json = serde_json::to_value(&submission).unwrap();
        assert_eq!(json["testId"], "t1");
        assert_eq!(json["answers"]["q1"], "A");
    }

    #[test]
    fn receipt_message_defaults_to_empty() {
        let receipt: SubmissionReceipt = serde_json::from_str("{\"success\":true}").unwrap();
        assert!(receipt.success);
        assert_eq!(receipt.message, "");
    }
}
