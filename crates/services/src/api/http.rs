use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tracing::{debug, info};

use exam_core::model::{Question, QuestionId, TestDefinition, TestId};

use crate::api::config::ExamApiConfig;
use crate::api::contract::{
    AttemptSubmission, AttemptSubmissionService, ExamContentService, SubmissionReceipt,
};
use crate::error::{LoadError, SubmitError};

/// HTTP client for the Eduprayas REST backend.
///
/// Implements both API traits against the backend's wire format and attaches
/// the configured bearer credential to every request.
#[derive(Clone)]
pub struct ExamApiClient {
    client: Client,
    config: ExamApiConfig,
}

impl ExamApiClient {
    #[must_use]
    pub fn new(config: ExamApiConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    #[must_use]
    pub fn config(&self) -> &ExamApiConfig {
        &self.config
    }
}

#[async_trait]
impl ExamContentService for ExamApiClient {
    async fn fetch_test(&self, id: &TestId) -> Result<TestDefinition, LoadError> {
        let url = self.config.endpoint(&format!("tests/{id}"));
        debug!(test_id = %id, %url, "fetching test definition");

        let response = self
            .client
            .get(url)
            .bearer_auth(self.config.bearer_token())
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(LoadError::NotFound(id.clone()));
        }
        if !status.is_success() {
            return Err(LoadError::HttpStatus(status));
        }

        let dto: TestDto = response.json().await?;
        let test = dto.into_definition()?;
        info!(
            test_id = %test.id(),
            questions = test.question_count(),
            duration_minutes = test.duration_minutes(),
            "test definition loaded"
        );
        Ok(test)
    }
}

#[async_trait]
impl AttemptSubmissionService for ExamApiClient {
    async fn submit_attempt(
        &self,
        submission: &AttemptSubmission,
    ) -> Result<SubmissionReceipt, SubmitError> {
        let url = self.config.endpoint("attempts/submit");
        debug!(
            test_id = %submission.test_id,
            answers = submission.answers.len(),
            "posting attempt submission"
        );

        let response = self
            .client
            .post(url)
            .bearer_auth(self.config.bearer_token())
            .json(submission)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = rejection_message(response).await;
            return Err(SubmitError::Rejected { status, message });
        }

        let receipt: SubmissionReceipt = response.json().await?;
        if !receipt.success {
            return Err(SubmitError::Rejected {
                status,
                message: receipt.message,
            });
        }
        Ok(receipt)
    }
}

/// Best-effort extraction of a human-readable message from an error body.
async fn rejection_message(response: reqwest::Response) -> String {
    let Ok(body) = response.text().await else {
        return String::new();
    };
    match serde_json::from_str::<ErrorBody>(&body) {
        Ok(parsed) if !parsed.message.is_empty() => parsed.message,
        _ => body,
    }
}

//
// ─── WIRE FORMAT ──────────────────────────────────────────────────────────────
//

#[derive(Debug, Deserialize)]
struct TestDto {
    #[serde(rename = "_id")]
    id: String,
    #[serde(default)]
    title: String,
    duration: u32,
    #[serde(default)]
    questions: Vec<QuestionDto>,
}

#[derive(Debug, Deserialize)]
struct QuestionDto {
    #[serde(rename = "_id")]
    id: String,
    question: String,
    #[serde(default)]
    options: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
}

impl TestDto {
    fn into_definition(self) -> Result<TestDefinition, LoadError> {
        let mut questions = Vec::with_capacity(self.questions.len());
        for dto in self.questions {
            questions.push(Question::new(
                QuestionId::new(dto.id),
                dto.question,
                dto.options,
            )?);
        }
        Ok(TestDefinition::new(
            TestId::new(self.id),
            self.title,
            self.duration,
            questions,
        )?)
    }
}
