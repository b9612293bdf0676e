//! End-of-session scoring for statement quizzes, plus a logging front for both drills.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::json;
use shared_logging::LogLevel;

use crate::{
    inference::{score_inference_with, InferenceQuestion, InferenceScore, Passage},
    question::{Question, Verdict},
    span::{SpanComparator, TextSpan},
    telemetry::{log_quietly, ComprehensionTelemetry},
};

/// Review record for one statement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionBreakdownItem {
    /// Statement as shown.
    pub statement: String,
    /// Whether the user's answer matched.
    pub correct_answer: bool,
    /// Expected verdict.
    pub correct_answer_raw: Verdict,
    /// Verdict used for scoring; `cant_tell` when unanswered.
    pub user_answer: Verdict,
    /// Whether the user picked anything.
    pub answered: bool,
    /// Display label of the expected verdict.
    pub correct_answer_label: String,
    /// Source sentence.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub passage_snippet: Option<String>,
}

/// Outcome of a statement quiz.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuizScore {
    /// Exact matches.
    pub correct: usize,
    /// Questions asked.
    pub total: usize,
    /// `correct / total`, zero for an empty quiz.
    pub accuracy: f64,
    /// Per-question review records keyed by position.
    pub breakdown: BTreeMap<usize, QuestionBreakdownItem>,
}

/// Scores `answers` (keyed by question position) against the quiz.
///
/// A question with no answer is scored as if the user chose `cant_tell`.
#[allow(clippy::cast_precision_loss)]
#[must_use]
pub fn score_quiz(questions: &[Question], answers: &BTreeMap<usize, Verdict>) -> QuizScore {
    let breakdown: BTreeMap<usize, QuestionBreakdownItem> = questions
        .iter()
        .enumerate()
        .map(|(idx, question)| {
            let given = answers.get(&idx).copied();
            let user_answer = given.unwrap_or(Verdict::CantTell);
            let item = QuestionBreakdownItem {
                statement: question.displayed_sentence.clone(),
                correct_answer: user_answer == question.correct_answer,
                correct_answer_raw: question.correct_answer,
                user_answer,
                answered: given.is_some(),
                correct_answer_label: question.correct_answer.label().to_owned(),
                passage_snippet: Some(question.passage_snippet.clone()),
            };
            (idx, item)
        })
        .collect();
    let correct = breakdown.values().filter(|item| item.correct_answer).count();
    let total = questions.len();
    let accuracy = if total == 0 {
        0.0
    } else {
        correct as f64 / total as f64
    };
    QuizScore {
        correct,
        total,
        accuracy,
        breakdown,
    }
}

/// Scores both drill kinds and logs each outcome.
#[derive(Debug, Clone, Default)]
pub struct DrillScorer {
    comparator: SpanComparator,
    telemetry: Option<ComprehensionTelemetry>,
}

impl DrillScorer {
    /// Scorer grading spans with `comparator`.
    #[must_use]
    pub const fn new(comparator: SpanComparator) -> Self {
        Self {
            comparator,
            telemetry: None,
        }
    }

    /// Attaches telemetry.
    #[must_use]
    pub fn with_telemetry(mut self, telemetry: ComprehensionTelemetry) -> Self {
        self.telemetry = Some(telemetry);
        self
    }

    /// Span comparator in use.
    #[must_use]
    pub const fn comparator(&self) -> &SpanComparator {
        &self.comparator
    }

    /// [`score_quiz`], logged as `comprehension.quiz.scored`.
    #[must_use]
    pub fn score_quiz(&self, questions: &[Question], answers: &BTreeMap<usize, Verdict>) -> QuizScore {
        let score = score_quiz(questions, answers);
        log_quietly(
            self.telemetry.as_ref(),
            LogLevel::Info,
            "comprehension.quiz.scored",
            json!({
                "correct": score.correct,
                "total": score.total,
                "unanswered": score.breakdown.values().filter(|item| !item.answered).count(),
            }),
        );
        score
    }

    /// Inference scoring, logged as `comprehension.inference.scored`.
    #[must_use]
    pub fn score_inference(
        &self,
        passage: &Passage,
        questions: &[InferenceQuestion],
        selections: &BTreeMap<usize, TextSpan>,
    ) -> InferenceScore {
        let score = score_inference_with(&self.comparator, passage, questions, selections);
        log_quietly(
            self.telemetry.as_ref(),
            LogLevel::Info,
            "comprehension.inference.scored",
            json!({
                "passage_id": passage.id,
                "correct": score.correct,
                "partial": score.partial,
                "total": score.total,
            }),
        );
        score
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use shared_logging::MemoryLogSink;

    use super::*;
    use crate::distortion::DistortionKind;

    fn quiz() -> Vec<Question> {
        vec![
            Question::truthful(
                "Rain is frequent in winter.".into(),
                "Rain is common in winter.".into(),
            ),
            Question::falsified(
                "The sky is always blue in summer.".into(),
                "The sky is often blue in summer.".into(),
                DistortionKind::QualifierToAbsolute,
            ),
            Question::undecidable(
                "Research into argue that has been carried out within the last five years.".into(),
                "Scientists argue that climate is changing rapidly.".into(),
            ),
        ]
    }

    #[test]
    fn exact_matches_count() {
        let answers = BTreeMap::from([
            (0, Verdict::True),
            (1, Verdict::True),
            (2, Verdict::CantTell),
        ]);
        let score = score_quiz(&quiz(), &answers);
        assert_eq!(score.correct, 2);
        assert_eq!(score.total, 3);
        assert!((score.accuracy - 2.0 / 3.0).abs() < f64::EPSILON);
        assert!(!score.breakdown[&1].correct_answer);
        assert_eq!(score.breakdown[&1].correct_answer_label, "False");
        assert_eq!(
            score.breakdown[&1].passage_snippet.as_deref(),
            Some("The sky is often blue in summer.")
        );
    }

    #[test]
    fn unanswered_scores_as_cant_tell() {
        let answers = BTreeMap::from([(0, Verdict::True)]);
        let score = score_quiz(&quiz(), &answers);
        // question 2 is a can't-tell statement, so skipping it still scores
        assert_eq!(score.correct, 2);
        let skipped = &score.breakdown[&2];
        assert!(skipped.correct_answer);
        assert!(!skipped.answered);
        assert_eq!(skipped.user_answer, Verdict::CantTell);
        assert!(!score.breakdown[&1].answered);
        assert!(!score.breakdown[&1].correct_answer);
    }

    #[test]
    fn empty_quiz_has_zero_accuracy() {
        let score = score_quiz(&[], &BTreeMap::new());
        assert_eq!(score.total, 0);
        assert!(score.accuracy.abs() < f64::EPSILON);
        assert!(score.breakdown.is_empty());
    }

    #[test]
    fn breakdown_serializes_raw_and_label() {
        let score = score_quiz(&quiz(), &BTreeMap::new());
        let json = serde_json::to_value(&score.breakdown[&2]).unwrap();
        assert_eq!(json["correct_answer_raw"], "cant_tell");
        assert_eq!(json["correct_answer_label"], "Can't Tell");
        assert_eq!(json["answered"], false);
        assert_eq!(json["correct_answer"], true);
    }

    #[test]
    fn scorer_logs_quiz_outcome() {
        let sink = Arc::new(MemoryLogSink::new());
        let telemetry = ComprehensionTelemetry::builder("comprehension")
            .sink(sink.clone())
            .build()
            .unwrap();
        let scorer = DrillScorer::default().with_telemetry(telemetry);
        let score = scorer.score_quiz(&quiz(), &BTreeMap::from([(0, Verdict::True)]));
        assert_eq!(score.correct, 2);
        let records = sink.records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].message, "comprehension.quiz.scored");
        assert_eq!(records[0].metadata["unanswered"], 2);
    }
}
