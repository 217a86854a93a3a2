use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashMap};
use std::fmt;

use exam_core::model::{
    AnswerStatus, AttemptSummary, Question, QuestionId, QuestionState, TestDefinition, TestId,
};

use crate::api::AttemptSubmission;
use crate::error::AttemptError;

//
// ─── PHASE & TICK OUTCOME ─────────────────────────────────────────────────────
//

/// Lifecycle of one attempt once the test has been loaded.
///
/// `Active` accepts answers, navigation and ticks. `Submitting` is entered at
/// most once, by manual confirmation or by the countdown reaching zero, and
/// only acknowledged success moves the attempt to `Terminated`. A failed
/// submission leaves the attempt in `Submitting` so a retry can resend the
/// same payload.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AttemptPhase {
    Active,
    Submitting,
    Terminated,
}

/// Result of one countdown tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TickOutcome {
    /// Still counting down.
    Running { remaining_secs: u32 },
    /// This tick crossed zero and claimed the transition into `Submitting`.
    Expired,
    /// The attempt already left `Active`; nothing to do.
    Stopped,
}

//
// ─── ATTEMPT SESSION ──────────────────────────────────────────────────────────
//

/// In-memory state of one timed pass through a test's questions.
///
/// All mutation goes through the methods below; each call applies atomically,
/// so a countdown tick and a user action can never leave a torn state between
/// them. Answers and per-question flags are tracked independently: flagging a
/// question for review never discards its answer, and clearing an answer
/// never discards the review flag.
pub struct AttemptSession {
    test: TestDefinition,
    answers: BTreeMap<QuestionId, String>,
    states: HashMap<QuestionId, QuestionState>,
    current: usize,
    remaining_secs: u32,
    phase: AttemptPhase,
    confirm_pending: bool,
    started_at: DateTime<Utc>,
    completed_at: Option<DateTime<Utc>>,
}

impl AttemptSession {
    /// Creates a fresh session over a loaded test: every question not
    /// visited, index at the first question, the full duration on the clock.
    ///
    /// `started_at` should come from the services layer clock to keep time
    /// deterministic.
    #[must_use]
    pub fn new(test: TestDefinition, started_at: DateTime<Utc>) -> Self {
        let states = test
            .questions()
            .iter()
            .map(|q| (q.id().clone(), QuestionState::default()))
            .collect();
        let remaining_secs = test.duration_seconds();

        Self {
            test,
            answers: BTreeMap::new(),
            states,
            current: 0,
            remaining_secs,
            phase: AttemptPhase::Active,
            confirm_pending: false,
            started_at,
            completed_at: None,
        }
    }

    // ─── Accessors ────────────────────────────────────────────────────────

    #[must_use]
    pub fn test(&self) -> &TestDefinition {
        &self.test
    }

    #[must_use]
    pub fn test_id(&self) -> &TestId {
        self.test.id()
    }

    #[must_use]
    pub fn phase(&self) -> AttemptPhase {
        self.phase
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.phase == AttemptPhase::Active
    }

    #[must_use]
    pub fn is_terminated(&self) -> bool {
        self.phase == AttemptPhase::Terminated
    }

    #[must_use]
    pub fn current_index(&self) -> usize {
        self.current
    }

    /// The question currently on screen. The index is always in range, so
    /// this never fails.
    ///
    /// # Panics
    ///
    /// Panics only if the internal index invariant is broken.
    #[must_use]
    pub fn current_question(&self) -> &Question {
        self.test
            .question_at(self.current)
            .expect("current index stays within the question list")
    }

    #[must_use]
    pub fn remaining_secs(&self) -> u32 {
        self.remaining_secs
    }

    #[must_use]
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    #[must_use]
    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }

    #[must_use]
    pub fn confirm_pending(&self) -> bool {
        self.confirm_pending
    }

    /// The selected option for a question, if any.
    #[must_use]
    pub fn answer(&self, id: &QuestionId) -> Option<&str> {
        self.answers.get(id).map(String::as_str)
    }

    #[must_use]
    pub fn answered_count(&self) -> usize {
        self.answers.len()
    }

    /// Palette label for a question, or `None` for an id outside this test.
    #[must_use]
    pub fn status(&self, id: &QuestionId) -> Option<AnswerStatus> {
        let state = self.states.get(id)?;
        Some(AnswerStatus::derive(*state, self.answers.contains_key(id)))
    }

    /// Recomputes the four summary counts from the per-question labels.
    #[must_use]
    pub fn summary(&self) -> AttemptSummary {
        AttemptSummary::from_labels(self.test.questions().iter().map(|q| {
            let state = self.states.get(q.id()).copied().unwrap_or_default();
            AnswerStatus::derive(state, self.answers.contains_key(q.id()))
        }))
    }

    // ─── Answering ────────────────────────────────────────────────────────

    /// Records `option` as the answer for a question, overwriting any prior
    /// selection.
    ///
    /// # Errors
    ///
    /// Returns `AttemptError::NotActive` once the attempt left `Active`,
    /// `AttemptError::UnknownQuestion` for an id outside this test, and
    /// `AttemptError::InvalidOption` when the option is not one of the
    /// question's declared options.
    pub fn select_option(&mut self, id: &QuestionId, option: &str) -> Result<(), AttemptError> {
        self.ensure_active()?;
        let question = self
            .test
            .question(id)
            .ok_or_else(|| AttemptError::UnknownQuestion(id.clone()))?;
        if !question.has_option(option) {
            return Err(AttemptError::InvalidOption {
                question: id.clone(),
                option: option.to_string(),
            });
        }

        self.answers.insert(id.clone(), option.to_string());
        self.state_mut(id)?.mark_visited();
        Ok(())
    }

    /// Flags a question for review without touching its answer.
    ///
    /// # Errors
    ///
    /// Returns `AttemptError::NotActive` or `AttemptError::UnknownQuestion`.
    pub fn mark_for_review(&mut self, id: &QuestionId) -> Result<(), AttemptError> {
        self.ensure_active()?;
        self.state_mut(id)?.flag_for_review();
        Ok(())
    }

    /// Removes the answer for a question. The question stays visited, so its
    /// label becomes `NotAnswered` rather than reverting to `NotVisited`;
    /// an existing review flag is preserved.
    ///
    /// # Errors
    ///
    /// Returns `AttemptError::NotActive` or `AttemptError::UnknownQuestion`.
    pub fn clear_answer(&mut self, id: &QuestionId) -> Result<(), AttemptError> {
        self.ensure_active()?;
        if self.test.question(id).is_none() {
            return Err(AttemptError::UnknownQuestion(id.clone()));
        }
        self.answers.remove(id);
        self.state_mut(id)?.mark_visited();
        Ok(())
    }

    // ─── Navigation ───────────────────────────────────────────────────────

    /// Advances to the next question. The question being left becomes
    /// visited first; on the last question the index stays put but the
    /// visit still counts.
    ///
    /// # Errors
    ///
    /// Returns `AttemptError::NotActive` once the attempt left `Active`.
    pub fn go_next(&mut self) -> Result<(), AttemptError> {
        self.ensure_active()?;
        self.leave_current()?;
        if self.current + 1 < self.test.question_count() {
            self.current += 1;
        }
        Ok(())
    }

    /// Moves back one question, applying the same leave-transition.
    ///
    /// # Errors
    ///
    /// Returns `AttemptError::NotActive` once the attempt left `Active`.
    pub fn go_previous(&mut self) -> Result<(), AttemptError> {
        self.ensure_active()?;
        self.leave_current()?;
        self.current = self.current.saturating_sub(1);
        Ok(())
    }

    /// Jumps straight to `index` (palette click), applying the
    /// leave-transition to the question being left.
    ///
    /// # Errors
    ///
    /// Returns `AttemptError::NotActive` or `AttemptError::OutOfRange`.
    pub fn jump_to(&mut self, index: usize) -> Result<(), AttemptError> {
        self.ensure_active()?;
        let len = self.test.question_count();
        if index >= len {
            return Err(AttemptError::OutOfRange { index, len });
        }
        self.leave_current()?;
        self.current = index;
        Ok(())
    }

    // ─── Countdown ────────────────────────────────────────────────────────

    /// Consumes one second of remaining time. The tick that reaches zero
    /// claims the transition into `Submitting`; every later tick reports
    /// `Stopped` so expiry can never fire twice.
    pub fn tick(&mut self) -> TickOutcome {
        if self.phase != AttemptPhase::Active {
            return TickOutcome::Stopped;
        }

        self.remaining_secs = self.remaining_secs.saturating_sub(1);
        if self.remaining_secs == 0 {
            self.phase = AttemptPhase::Submitting;
            self.confirm_pending = false;
            return TickOutcome::Expired;
        }
        TickOutcome::Running {
            remaining_secs: self.remaining_secs,
        }
    }

    // ─── Submission ───────────────────────────────────────────────────────

    /// Opens the submit confirmation step. No other state changes.
    ///
    /// # Errors
    ///
    /// Returns `AttemptError::NotActive` once the attempt left `Active`.
    pub fn request_submit(&mut self) -> Result<(), AttemptError> {
        self.ensure_active()?;
        self.confirm_pending = true;
        Ok(())
    }

    /// Closes the submit confirmation step. No other state changes.
    ///
    /// # Errors
    ///
    /// Returns `AttemptError::NotActive` once the attempt left `Active`.
    pub fn cancel_submit(&mut self) -> Result<(), AttemptError> {
        self.ensure_active()?;
        self.confirm_pending = false;
        Ok(())
    }

    /// Claims the `Active → Submitting` transition. Manual confirmation and
    /// timer expiry both funnel through here; whichever arrives first wins
    /// and the other call is a no-op.
    ///
    /// Returns true when this call performed the transition.
    pub fn begin_submit(&mut self) -> bool {
        if self.phase != AttemptPhase::Active {
            return false;
        }
        self.phase = AttemptPhase::Submitting;
        self.confirm_pending = false;
        true
    }

    /// Builds the submission payload from the current answer map.
    #[must_use]
    pub fn submission(&self) -> AttemptSubmission {
        AttemptSubmission {
            test_id: self.test.id().clone(),
            answers: self.answers.clone(),
        }
    }

    /// Acknowledges a successful submission and terminates the attempt.
    ///
    /// # Errors
    ///
    /// Returns `AttemptError::NotSubmitting` unless the attempt is in
    /// `Submitting`.
    pub fn complete(&mut self, at: DateTime<Utc>) -> Result<(), AttemptError> {
        if self.phase != AttemptPhase::Submitting {
            return Err(AttemptError::NotSubmitting);
        }
        self.phase = AttemptPhase::Terminated;
        self.completed_at = Some(at);
        Ok(())
    }

    // ─── Internals ────────────────────────────────────────────────────────

    fn ensure_active(&self) -> Result<(), AttemptError> {
        if self.phase == AttemptPhase::Active {
            Ok(())
        } else {
            Err(AttemptError::NotActive)
        }
    }

    fn state_mut(&mut self, id: &QuestionId) -> Result<&mut QuestionState, AttemptError> {
        self.states
            .get_mut(id)
            .ok_or_else(|| AttemptError::UnknownQuestion(id.clone()))
    }

    /// A question is "visited" the moment navigation leaves it, not when it
    /// is shown. The transition must happen before the index moves so the
    /// palette can tell not-visited and not-answered apart.
    fn leave_current(&mut self) -> Result<(), AttemptError> {
        let id = self.current_question().id().clone();
        self.state_mut(&id)?.mark_visited();
        Ok(())
    }
}

impl fmt::Debug for AttemptSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AttemptSession")
            .field("test_id", self.test.id())
            .field("questions", &self.test.question_count())
            .field("answers", &self.answers.len())
            .field("current", &self.current)
            .field("remaining_secs", &self.remaining_secs)
            .field("phase", &self.phase)
            .field("started_at", &self.started_at)
            .field("completed_at", &self.completed_at)
            .finish_non_exhaustive()
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use exam_core::time::fixed_now;

    fn build_question(id: &str) -> Question {
        Question::new(
            QuestionId::new(id),
            format!("Prompt {id}"),
            vec!["A".to_string(), "B".to_string()],
        )
        .unwrap()
    }

    fn build_test(duration_minutes: u32, question_ids: &[&str]) -> TestDefinition {
        TestDefinition::new(
            TestId::new("t1"),
            "Mock Test",
            duration_minutes,
            question_ids.iter().map(|id| build_question(id)).collect(),
        )
        .unwrap()
    }

    fn build_session() -> AttemptSession {
        AttemptSession::new(build_test(1, &["q1", "q2"]), fixed_now())
    }

    fn qid(id: &str) -> QuestionId {
        QuestionId::new(id)
    }

    #[test]
    fn fresh_session_starts_at_first_question_with_full_clock() {
        let session = build_session();

        assert_eq!(session.phase(), AttemptPhase::Active);
        assert_eq!(session.current_index(), 0);
        assert_eq!(session.remaining_secs(), 60);
        assert_eq!(session.status(&qid("q1")), Some(AnswerStatus::NotVisited));
        assert_eq!(session.status(&qid("q2")), Some(AnswerStatus::NotVisited));
        assert_eq!(session.started_at(), fixed_now());
    }

    #[test]
    fn selecting_an_option_records_answer_and_status() {
        let mut session = build_session();

        session.select_option(&qid("q1"), "A").unwrap();

        assert_eq!(session.answer(&qid("q1")), Some("A"));
        assert_eq!(session.status(&qid("q1")), Some(AnswerStatus::Answered));
        assert_eq!(session.status(&qid("q2")), Some(AnswerStatus::NotVisited));
    }

    #[test]
    fn selecting_overwrites_idempotently() {
        let mut session = build_session();

        session.select_option(&qid("q1"), "A").unwrap();
        session.select_option(&qid("q1"), "B").unwrap();
        session.select_option(&qid("q1"), "B").unwrap();

        assert_eq!(session.answer(&qid("q1")), Some("B"));
        assert_eq!(session.answered_count(), 1);
    }

    #[test]
    fn selecting_an_undeclared_option_is_rejected() {
        let mut session = build_session();

        let err = session.select_option(&qid("q1"), "Z").unwrap_err();
        assert!(matches!(err, AttemptError::InvalidOption { .. }));
        assert_eq!(session.answer(&qid("q1")), None);
        assert_eq!(session.status(&qid("q1")), Some(AnswerStatus::NotVisited));
    }

    #[test]
    fn unknown_question_ids_are_rejected() {
        let mut session = build_session();

        assert!(matches!(
            session.select_option(&qid("nope"), "A").unwrap_err(),
            AttemptError::UnknownQuestion(_)
        ));
        assert!(matches!(
            session.mark_for_review(&qid("nope")).unwrap_err(),
            AttemptError::UnknownQuestion(_)
        ));
        assert!(matches!(
            session.clear_answer(&qid("nope")).unwrap_err(),
            AttemptError::UnknownQuestion(_)
        ));
    }

    #[test]
    fn clear_then_select_round_trips() {
        let mut session = build_session();

        session.select_option(&qid("q1"), "A").unwrap();
        session.clear_answer(&qid("q1")).unwrap();
        assert_eq!(session.status(&qid("q1")), Some(AnswerStatus::NotAnswered));
        assert_eq!(session.answer(&qid("q1")), None);

        session.select_option(&qid("q1"), "A").unwrap();
        assert_eq!(session.status(&qid("q1")), Some(AnswerStatus::Answered));
        assert_eq!(session.answer(&qid("q1")), Some("A"));
    }

    #[test]
    fn clearing_never_reverts_to_not_visited() {
        let mut session = build_session();

        session.clear_answer(&qid("q1")).unwrap();
        assert_eq!(session.status(&qid("q1")), Some(AnswerStatus::NotAnswered));
    }

    #[test]
    fn review_flag_survives_answering_and_clearing() {
        let mut session = build_session();

        session.mark_for_review(&qid("q1")).unwrap();
        session.select_option(&qid("q1"), "A").unwrap();
        assert_eq!(
            session.status(&qid("q1")),
            Some(AnswerStatus::MarkedForReview)
        );
        assert_eq!(session.answer(&qid("q1")), Some("A"));

        session.clear_answer(&qid("q1")).unwrap();
        assert_eq!(
            session.status(&qid("q1")),
            Some(AnswerStatus::MarkedForReview)
        );
        assert_eq!(session.answer(&qid("q1")), None);
    }

    #[test]
    fn marking_for_review_keeps_the_answer() {
        let mut session = build_session();

        session.select_option(&qid("q1"), "B").unwrap();
        session.mark_for_review(&qid("q1")).unwrap();

        assert_eq!(
            session.status(&qid("q1")),
            Some(AnswerStatus::MarkedForReview)
        );
        assert_eq!(session.answer(&qid("q1")), Some("B"));
    }

    #[test]
    fn first_go_next_marks_only_the_question_being_left() {
        let mut session = build_session();

        session.go_next().unwrap();

        assert_eq!(session.current_index(), 1);
        assert_eq!(session.status(&qid("q1")), Some(AnswerStatus::NotAnswered));
        assert_eq!(session.status(&qid("q2")), Some(AnswerStatus::NotVisited));
    }

    #[test]
    fn go_next_on_last_question_keeps_index_but_counts_the_visit() {
        let mut session = build_session();

        session.go_next().unwrap();
        session.go_next().unwrap();

        assert_eq!(session.current_index(), 1);
        assert_eq!(session.status(&qid("q2")), Some(AnswerStatus::NotAnswered));
    }

    #[test]
    fn go_previous_clamps_at_the_first_question() {
        let mut session = build_session();

        session.go_previous().unwrap();
        assert_eq!(session.current_index(), 0);

        session.go_next().unwrap();
        session.go_previous().unwrap();
        assert_eq!(session.current_index(), 0);
        assert_eq!(session.status(&qid("q2")), Some(AnswerStatus::NotAnswered));
    }

    #[test]
    fn answered_status_is_not_downgraded_when_left() {
        let mut session = build_session();

        session.select_option(&qid("q1"), "A").unwrap();
        session.go_next().unwrap();

        assert_eq!(session.status(&qid("q1")), Some(AnswerStatus::Answered));
    }

    #[test]
    fn jump_to_validates_bounds_and_applies_leave_transition() {
        let mut session = build_session();

        let err = session.jump_to(2).unwrap_err();
        assert!(matches!(err, AttemptError::OutOfRange { index: 2, len: 2 }));
        assert_eq!(session.status(&qid("q1")), Some(AnswerStatus::NotVisited));

        session.jump_to(1).unwrap();
        assert_eq!(session.current_index(), 1);
        assert_eq!(session.status(&qid("q1")), Some(AnswerStatus::NotAnswered));
    }

    #[test]
    fn summary_counts_sum_to_total_under_any_sequence() {
        let mut session = AttemptSession::new(build_test(1, &["q1", "q2", "q3", "q4"]), fixed_now());

        let checkpoints: [fn(&mut AttemptSession); 7] = [
            |s: &mut AttemptSession| s.select_option(&qid("q1"), "A").unwrap(),
            |s: &mut AttemptSession| s.mark_for_review(&qid("q2")).unwrap(),
            |s: &mut AttemptSession| s.clear_answer(&qid("q1")).unwrap(),
            |s: &mut AttemptSession| s.select_option(&qid("q3"), "B").unwrap(),
            |s: &mut AttemptSession| s.mark_for_review(&qid("q3")).unwrap(),
            |s: &mut AttemptSession| s.clear_answer(&qid("q3")).unwrap(),
            |s: &mut AttemptSession| s.select_option(&qid("q1"), "B").unwrap(),
        ];

        for step in checkpoints {
            step(&mut session);
            let summary = session.summary();
            assert_eq!(summary.total, 4);
            assert_eq!(summary.counted(), 4);
        }
    }

    #[test]
    fn ticks_drive_exactly_one_expiry() {
        let mut session = build_session();

        for _ in 0..59 {
            assert!(matches!(session.tick(), TickOutcome::Running { .. }));
        }
        assert_eq!(session.tick(), TickOutcome::Expired);
        assert_eq!(session.phase(), AttemptPhase::Submitting);
        assert_eq!(session.remaining_secs(), 0);

        // Repeated zero-crossings never re-trigger submission.
        assert_eq!(session.tick(), TickOutcome::Stopped);
        assert_eq!(session.tick(), TickOutcome::Stopped);
        assert_eq!(session.phase(), AttemptPhase::Submitting);
    }

    #[test]
    fn request_and_cancel_submit_only_toggle_the_confirmation() {
        let mut session = build_session();
        session.select_option(&qid("q1"), "A").unwrap();

        session.request_submit().unwrap();
        assert!(session.confirm_pending());
        assert_eq!(session.phase(), AttemptPhase::Active);
        assert_eq!(session.answer(&qid("q1")), Some("A"));

        session.cancel_submit().unwrap();
        assert!(!session.confirm_pending());
        assert_eq!(session.phase(), AttemptPhase::Active);
    }

    #[test]
    fn begin_submit_claims_the_transition_once() {
        let mut session = build_session();

        assert!(session.begin_submit());
        assert_eq!(session.phase(), AttemptPhase::Submitting);

        // The losing trigger is a no-op.
        assert!(!session.begin_submit());
        assert_eq!(session.phase(), AttemptPhase::Submitting);
    }

    #[test]
    fn mutations_are_rejected_after_leaving_active() {
        let mut session = build_session();
        session.select_option(&qid("q1"), "A").unwrap();
        session.begin_submit();

        assert!(matches!(
            session.select_option(&qid("q1"), "B").unwrap_err(),
            AttemptError::NotActive
        ));
        assert!(matches!(
            session.go_next().unwrap_err(),
            AttemptError::NotActive
        ));
        assert!(matches!(
            session.mark_for_review(&qid("q2")).unwrap_err(),
            AttemptError::NotActive
        ));

        // The payload is still the one captured while active.
        assert_eq!(session.answer(&qid("q1")), Some("A"));
    }

    #[test]
    fn submission_payload_excludes_unanswered_questions() {
        let mut session = build_session();
        session.select_option(&qid("q1"), "A").unwrap();
        session.mark_for_review(&qid("q2")).unwrap();

        let payload = session.submission();
        assert_eq!(payload.test_id, TestId::new("t1"));
        assert_eq!(payload.answers.len(), 1);
        assert_eq!(payload.answers.get(&qid("q1")).map(String::as_str), Some("A"));
        assert!(!payload.answers.contains_key(&qid("q2")));
    }

    #[test]
    fn complete_requires_submitting_phase() {
        let mut session = build_session();

        let err = session.complete(fixed_now()).unwrap_err();
        assert!(matches!(err, AttemptError::NotSubmitting));

        session.begin_submit();
        session.complete(fixed_now()).unwrap();
        assert!(session.is_terminated());
        assert_eq!(session.completed_at(), Some(fixed_now()));

        let err = session.complete(fixed_now()).unwrap_err();
        assert!(matches!(err, AttemptError::NotSubmitting));
    }

    #[test]
    fn failed_submission_preserves_answers_for_retry() {
        let mut session = build_session();
        session.select_option(&qid("q1"), "A").unwrap();
        session.begin_submit();

        let first = session.submission();
        // A failed network round-trip leaves the session in `Submitting`;
        // the retry builds an identical payload.
        let second = session.submission();
        assert_eq!(first, second);
        assert_eq!(session.phase(), AttemptPhase::Submitting);
    }
}
