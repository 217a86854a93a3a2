use crate::model::status::AnswerStatus;

/// Aggregate counts over the per-question palette labels, recomputed on
/// demand before the submit confirmation.
///
/// The four counts always sum to `total` because every question carries
/// exactly one label.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AttemptSummary {
    pub total: usize,
    pub answered: usize,
    pub not_answered: usize,
    pub marked_for_review: usize,
    pub not_visited: usize,
}

impl AttemptSummary {
    /// Folds a sequence of per-question labels into counts.
    #[must_use]
    pub fn from_labels(labels: impl IntoIterator<Item = AnswerStatus>) -> Self {
        let mut summary = Self::default();
        for label in labels {
            summary.total += 1;
            match label {
                AnswerStatus::Answered => summary.answered += 1,
                AnswerStatus::NotAnswered => summary.not_answered += 1,
                AnswerStatus::MarkedForReview => summary.marked_for_review += 1,
                AnswerStatus::NotVisited => summary.not_visited += 1,
            }
        }
        summary
    }

    /// Sum of the four per-label counts; equals `total` by construction.
    #[must_use]
    pub fn counted(&self) -> usize {
        self.answered + self.not_answered + self.marked_for_review + self.not_visited
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_each_label_once() {
        let summary = AttemptSummary::from_labels([
            AnswerStatus::Answered,
            AnswerStatus::Answered,
            AnswerStatus::MarkedForReview,
            AnswerStatus::NotAnswered,
            AnswerStatus::NotVisited,
        ]);

        assert_eq!(summary.total, 5);
        assert_eq!(summary.answered, 2);
        assert_eq!(summary.marked_for_review, 1);
        assert_eq!(summary.not_answered, 1);
        assert_eq!(summary.not_visited, 1);
        assert_eq!(summary.counted(), summary.total);
    }

    #[test]
    fn empty_input_yields_zero_counts() {
        let summary = AttemptSummary::from_labels([]);
        assert_eq!(summary.total, 0);
        assert_eq!(summary.counted(), 0);
    }
}
