use std::sync::{Arc, Mutex};

use tracing::{info, warn};

use exam_core::Clock;
use exam_core::model::TestId;

use crate::api::{AttemptSubmissionService, ExamContentService, SubmissionReceipt};
use crate::error::{AttemptError, AttemptServiceError};
use super::service::{AttemptPhase, AttemptSession};

/// Shared handle to a live attempt.
///
/// Countdown ticks and user actions both lock the same session, so every
/// event applies atomically and no partial write is ever visible between
/// them.
pub type SharedAttempt = Arc<Mutex<AttemptSession>>;

/// Orchestrates attempt start and submission against the exam API.
#[derive(Clone)]
pub struct AttemptLoopService {
    clock: Clock,
    content: Arc<dyn ExamContentService>,
    submissions: Arc<dyn AttemptSubmissionService>,
}

impl AttemptLoopService {
    #[must_use]
    pub fn new(
        clock: Clock,
        content: Arc<dyn ExamContentService>,
        submissions: Arc<dyn AttemptSubmissionService>,
    ) -> Self {
        Self {
            clock,
            content,
            submissions,
        }
    }

    #[must_use]
    pub fn clock(&self) -> Clock {
        self.clock
    }

    /// Loads the test and opens a fresh session over it.
    ///
    /// Load failures are fatal to session start and are not retried here.
    ///
    /// # Errors
    ///
    /// Returns `AttemptServiceError::Load` when the content service is
    /// unreachable or returns malformed content.
    pub async fn start_attempt(
        &self,
        test_id: &TestId,
    ) -> Result<AttemptSession, AttemptServiceError> {
        let test = self.content.fetch_test(test_id).await?;
        info!(
            test_id = %test.id(),
            questions = test.question_count(),
            duration_minutes = test.duration_minutes(),
            "attempt session opened"
        );
        Ok(AttemptSession::new(test, self.clock.now()))
    }

    /// Like [`Self::start_attempt`], wrapped for sharing with a countdown.
    ///
    /// # Errors
    ///
    /// Returns `AttemptServiceError::Load` on fetch or validation failure.
    pub async fn start_attempt_shared(
        &self,
        test_id: &TestId,
    ) -> Result<SharedAttempt, AttemptServiceError> {
        let session = self.start_attempt(test_id).await?;
        Ok(Arc::new(Mutex::new(session)))
    }

    /// Sends the current answers to the submission service.
    ///
    /// Manual confirmation and timer expiry both funnel through here: the
    /// `Active → Submitting` transition is claimed at most once, and the
    /// losing trigger proceeds as a retry of the same payload. The session
    /// lock is held only to capture the payload and to record the outcome,
    /// never across the network round-trip.
    ///
    /// On failure the session stays in `Submitting` with its answers intact;
    /// the caller decides when to retry.
    ///
    /// # Errors
    ///
    /// Returns `AttemptServiceError::Attempt` when the attempt has already
    /// terminated and `AttemptServiceError::Submit` when the round-trip
    /// fails or the server rejects the attempt.
    pub async fn submit(
        &self,
        session: &SharedAttempt,
    ) -> Result<SubmissionReceipt, AttemptServiceError> {
        let payload = {
            let mut guard = session.lock().map_err(|_| AttemptError::Poisoned)?;
            if guard.phase() == AttemptPhase::Terminated {
                return Err(AttemptError::NotActive.into());
            }
            guard.begin_submit();
            guard.submission()
        };

        match self.submissions.submit_attempt(&payload).await {
            Ok(receipt) => {
                let completed_at = self.clock.now();
                let mut guard = session.lock().map_err(|_| AttemptError::Poisoned)?;
                guard.complete(completed_at)?;
                info!(
                    test_id = %payload.test_id,
                    answers = payload.answers.len(),
                    "attempt submitted"
                );
                Ok(receipt)
            }
            Err(err) => {
                warn!(
                    test_id = %payload.test_id,
                    error = %err,
                    "submission failed; answers preserved for retry"
                );
                Err(err.into())
            }
        }
    }
}
