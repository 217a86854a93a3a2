use std::fmt;

//
// ─── QUESTION STATE ───────────────────────────────────────────────────────────
//

/// Orthogonal per-question facts tracked during an attempt.
///
/// Whether a question has an answer is carried by the session's answer map,
/// never duplicated here, so flagging a question for review can never discard
/// its answer and clearing an answer can never discard the review flag.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QuestionState {
    visited: bool,
    flagged_for_review: bool,
}

impl QuestionState {
    #[must_use]
    pub fn visited(&self) -> bool {
        self.visited
    }

    #[must_use]
    pub fn flagged_for_review(&self) -> bool {
        self.flagged_for_review
    }

    /// Marks the question visited. Visiting is one-way: a question never
    /// returns to the not-visited state.
    pub fn mark_visited(&mut self) {
        self.visited = true;
    }

    /// Sets the review flag; also counts as a visit.
    pub fn flag_for_review(&mut self) {
        self.flagged_for_review = true;
        self.visited = true;
    }
}

//
// ─── ANSWER STATUS ────────────────────────────────────────────────────────────
//

/// Display label for one question in the palette, derived from the orthogonal
/// facts plus answer presence. The review flag takes precedence over
/// `Answered`, matching the attempt screen's color coding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AnswerStatus {
    NotVisited,
    NotAnswered,
    Answered,
    MarkedForReview,
}

impl AnswerStatus {
    /// Derives the palette label for a question.
    #[must_use]
    pub fn derive(state: QuestionState, has_answer: bool) -> Self {
        if state.flagged_for_review() {
            return Self::MarkedForReview;
        }
        if has_answer {
            return Self::Answered;
        }
        if state.visited() {
            Self::NotAnswered
        } else {
            Self::NotVisited
        }
    }

    /// Wire/legend label used by the attempt screen.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            AnswerStatus::NotVisited => "not-visited",
            AnswerStatus::NotAnswered => "not-answered",
            AnswerStatus::Answered => "answered",
            AnswerStatus::MarkedForReview => "review",
        }
    }
}

impl fmt::Display for AnswerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
