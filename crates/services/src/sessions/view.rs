use exam_core::model::{AnswerStatus, QuestionId};

use super::service::AttemptSession;

/// One palette cell: a question's position, its color-coding label and
/// whether it is the question currently on screen.
///
/// This is intentionally **not** a UI view-model:
/// - no colors, no pre-formatted strings
/// - the UI maps labels to its own legend
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaletteEntry {
    pub question_id: QuestionId,
    pub status: AnswerStatus,
    pub is_current: bool,
}

/// Builds the ordered palette for the whole question list.
#[must_use]
pub fn palette(session: &AttemptSession) -> Vec<PaletteEntry> {
    session
        .test()
        .questions()
        .iter()
        .enumerate()
        .map(|(index, question)| PaletteEntry {
            question_id: question.id().clone(),
            status: session
                .status(question.id())
                .unwrap_or(AnswerStatus::NotVisited),
            is_current: index == session.current_index(),
        })
        .collect()
}

/// Formats remaining whole seconds as `m:ss`, matching the attempt screen's
/// countdown clock.
#[must_use]
pub fn format_remaining(secs: u32) -> String {
    format!("{}:{:02}", secs / 60, secs % 60)
}
