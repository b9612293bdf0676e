//! Inference drill data: passages, span-keyed questions and their scoring.
//!
//! Questions are authored against exact substrings of a passage and resolved
//! to UTF-16 spans when a drill starts. A question whose answer text no longer
//! occurs in the passage is dropped rather than shown with a broken key.

use std::{collections::BTreeMap, fmt, fs, path::Path};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::json;
use shared_logging::LogLevel;

use crate::{
    error::ComprehensionError,
    span::{get_span_text, SpanComparator, SpanVerdict, TextSpan},
    telemetry::{log_quietly, ComprehensionTelemetry},
    text::{find_utf16, utf16_len},
};

/// A block of prose used by the drills.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Passage {
    /// Catalog key.
    pub id: String,
    /// Display title.
    pub title: String,
    /// Plain prose, possibly multi-line.
    pub text: String,
}

impl Passage {
    /// Text length in UTF-16 units.
    #[must_use]
    pub fn text_len(&self) -> usize {
        utf16_len(&self.text)
    }
}

/// Passages keyed by id, in file order.
#[derive(Debug, Clone, Default)]
pub struct PassageCatalog {
    passages: IndexMap<String, Passage>,
}

impl PassageCatalog {
    /// Builds a catalog; a later passage with a repeated id replaces the earlier one.
    #[must_use]
    pub fn from_passages(passages: impl IntoIterator<Item = Passage>) -> Self {
        Self {
            passages: passages
                .into_iter()
                .map(|passage| (passage.id.clone(), passage))
                .collect(),
        }
    }

    /// Reads a JSON array of passages.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ComprehensionError> {
        let raw = fs::read_to_string(path)?;
        let passages: Vec<Passage> = serde_json::from_str(&raw)?;
        Ok(Self::from_passages(passages))
    }

    /// Passage with this id.
    #[must_use]
    pub fn find(&self, id: &str) -> Option<&Passage> {
        self.passages.get(id)
    }

    /// All passages in catalog order.
    pub fn iter(&self) -> impl Iterator<Item = &Passage> {
        self.passages.values()
    }

    /// Number of passages.
    #[must_use]
    pub fn len(&self) -> usize {
        self.passages.len()
    }

    /// True when the catalog holds nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.passages.is_empty()
    }
}

/// Authored difficulty tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    /// Answer stated almost verbatim.
    Easy,
    /// Answer needs one step of inference.
    Medium,
    /// Answer needs combining several sentences.
    Hard,
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Easy => "easy",
            Self::Medium => "medium",
            Self::Hard => "hard",
        })
    }
}

/// A span-selection question resolved against its passage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InferenceQuestion {
    /// Question id.
    pub id: String,
    /// Passage the spans index into.
    pub passage_id: String,
    /// Prompt shown to the user.
    pub question_text: String,
    /// Canonical answers.
    pub correct_spans: Vec<TextSpan>,
    /// Equally valid answers.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub alternate_spans: Vec<TextSpan>,
    /// Shown after answering.
    pub explanation: String,
    /// Optional difficulty tag.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub difficulty: Option<Difficulty>,
}

impl InferenceQuestion {
    /// Checks every span against a text of `text_len` units.
    pub fn validate(&self, text_len: usize) -> Result<(), ComprehensionError> {
        for span in self.correct_spans.iter().chain(&self.alternate_spans) {
            TextSpan::checked(span.start, span.end, text_len)?;
        }
        Ok(())
    }

    fn alternates(&self) -> Option<&[TextSpan]> {
        (!self.alternate_spans.is_empty()).then_some(self.alternate_spans.as_slice())
    }
}

/// Authored form of an inference question, answers given as passage substrings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InferenceQuestionSource {
    /// Question id.
    pub id: String,
    /// Passage the answer is quoted from.
    pub passage_id: String,
    /// Prompt shown to the user.
    pub question_text: String,
    /// Exact passage substring forming the answer.
    pub answer_text: String,
    /// Further acceptable substrings.
    #[serde(default)]
    pub alternate_texts: Vec<String>,
    /// Shown after answering.
    pub explanation: String,
    /// Optional difficulty tag.
    #[serde(default)]
    pub difficulty: Option<Difficulty>,
}

impl InferenceQuestionSource {
    /// Locates the answer in `passage`; `None` when the text is missing.
    ///
    /// Missing alternates are skipped individually.
    #[must_use]
    pub fn resolve(&self, passage: &Passage) -> Option<InferenceQuestion> {
        let locate = |needle: &str| {
            find_utf16(&passage.text, needle)
                .map(|start| TextSpan::new(start, start + utf16_len(needle)))
        };
        let answer = locate(&self.answer_text)?;
        Some(InferenceQuestion {
            id: self.id.clone(),
            passage_id: passage.id.clone(),
            question_text: self.question_text.clone(),
            correct_spans: vec![answer],
            alternate_spans: self
                .alternate_texts
                .iter()
                .filter_map(|alt| locate(alt))
                .collect(),
            explanation: self.explanation.clone(),
            difficulty: self.difficulty,
        })
    }
}

/// Authored inference questions grouped by passage id.
#[derive(Debug, Clone, Default)]
pub struct InferenceCatalog {
    by_passage: IndexMap<String, Vec<InferenceQuestionSource>>,
    telemetry: Option<ComprehensionTelemetry>,
}

impl InferenceCatalog {
    /// Groups sources by passage, keeping authored order.
    #[must_use]
    pub fn from_sources(sources: impl IntoIterator<Item = InferenceQuestionSource>) -> Self {
        let mut by_passage: IndexMap<String, Vec<InferenceQuestionSource>> = IndexMap::new();
        for source in sources {
            by_passage
                .entry(source.passage_id.clone())
                .or_default()
                .push(source);
        }
        Self {
            by_passage,
            telemetry: None,
        }
    }

    /// Reads a JSON array of question sources.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ComprehensionError> {
        let raw = fs::read_to_string(path)?;
        let sources: Vec<InferenceQuestionSource> = serde_json::from_str(&raw)?;
        Ok(Self::from_sources(sources))
    }

    /// Attaches telemetry for dropped-question warnings.
    #[must_use]
    pub fn with_telemetry(mut self, telemetry: ComprehensionTelemetry) -> Self {
        self.telemetry = Some(telemetry);
        self
    }

    /// Passage ids with at least one question.
    pub fn passage_ids(&self) -> impl Iterator<Item = &str> {
        self.by_passage.keys().map(String::as_str)
    }

    /// Authored questions across all passages.
    #[must_use]
    pub fn len(&self) -> usize {
        self.by_passage.values().map(Vec::len).sum()
    }

    /// True when nothing is authored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_passage.is_empty()
    }

    /// Questions for `passage` with answers resolved to spans.
    ///
    /// A question whose answer is missing, or whose spans fall outside the
    /// passage, is dropped with a warning.
    #[must_use]
    pub fn resolve(&self, passage: &Passage) -> Vec<InferenceQuestion> {
        let Some(sources) = self.by_passage.get(&passage.id) else {
            return Vec::new();
        };
        let text_len = passage.text_len();
        sources
            .iter()
            .filter_map(|source| {
                let checked = source
                    .resolve(passage)
                    .ok_or_else(|| "answer text not found".to_owned())
                    .and_then(|question| match question.validate(text_len) {
                        Ok(()) => Ok(question),
                        Err(err) => Err(err.to_string()),
                    });
                match checked {
                    Ok(question) => Some(question),
                    Err(reason) => {
                        log_quietly(
                            self.telemetry.as_ref(),
                            LogLevel::Warn,
                            "comprehension.inference.dropped",
                            json!({
                                "passage_id": passage.id,
                                "question_id": source.id,
                                "reason": reason,
                            }),
                        );
                        None
                    }
                }
            })
            .collect()
    }
}

/// Outcome of one inference question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InferenceResult {
    /// Selection graded correct.
    Correct,
    /// Selection graded incorrect.
    Incorrect,
    /// Selection graded partial.
    Partial,
    /// Nothing selected.
    Skipped,
}

impl From<SpanVerdict> for InferenceResult {
    fn from(verdict: SpanVerdict) -> Self {
        match verdict {
            SpanVerdict::Correct => Self::Correct,
            SpanVerdict::Partial => Self::Partial,
            SpanVerdict::Incorrect => Self::Incorrect,
        }
    }
}

/// Review record for one inference question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InferenceBreakdownItem {
    /// Question id.
    pub question_id: String,
    /// What the user selected.
    pub user_span: Option<TextSpan>,
    /// Text of the selection.
    pub user_text: Option<String>,
    /// First canonical answer.
    pub correct_span: Option<TextSpan>,
    /// Text of the first canonical answer.
    pub correct_text: Option<String>,
    /// Grade.
    pub result: InferenceResult,
}

/// Outcome of an inference session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InferenceScore {
    /// Questions graded correct.
    pub correct: usize,
    /// Questions graded partial; these do not count towards `correct`.
    pub partial: usize,
    /// Questions asked.
    pub total: usize,
    /// Per-question records keyed by position.
    pub breakdown: BTreeMap<usize, InferenceBreakdownItem>,
}

/// Grades `selections` (keyed by question position) with default thresholds.
#[must_use]
pub fn score_inference(
    passage: &Passage,
    questions: &[InferenceQuestion],
    selections: &BTreeMap<usize, TextSpan>,
) -> InferenceScore {
    score_inference_with(&SpanComparator::default(), passage, questions, selections)
}

/// Grades `selections` with a specific comparator.
#[must_use]
pub fn score_inference_with(
    comparator: &SpanComparator,
    passage: &Passage,
    questions: &[InferenceQuestion],
    selections: &BTreeMap<usize, TextSpan>,
) -> InferenceScore {
    let text_len = passage.text_len();
    let breakdown: BTreeMap<usize, InferenceBreakdownItem> = questions
        .iter()
        .enumerate()
        .map(|(idx, question)| {
            let user_span = selections.get(&idx).copied();
            let result = user_span.map_or(InferenceResult::Skipped, |span| {
                comparator
                    .compare_in(
                        text_len,
                        Some(&span),
                        &question.correct_spans,
                        question.alternates(),
                    )
                    .into()
            });
            let correct_span = question.correct_spans.first().copied();
            let item = InferenceBreakdownItem {
                question_id: question.id.clone(),
                user_text: user_span.map(|span| get_span_text(&passage.text, &span)),
                user_span,
                correct_text: correct_span.map(|span| get_span_text(&passage.text, &span)),
                correct_span,
                result,
            };
            (idx, item)
        })
        .collect();
    let count = |wanted: InferenceResult| {
        breakdown
            .values()
            .filter(|item| item.result == wanted)
            .count()
    };
    InferenceScore {
        correct: count(InferenceResult::Correct),
        partial: count(InferenceResult::Partial),
        total: questions.len(),
        breakdown,
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use shared_logging::MemoryLogSink;
    use tempfile::tempdir;

    use super::*;

    const TEXT: &str = "The council delayed the vote. Critics said the delay favoured developers. \
                        Residents remain divided.";

    fn passage() -> Passage {
        Passage {
            id: "council".into(),
            title: "The Vote".into(),
            text: TEXT.into(),
        }
    }

    fn source(id: &str, answer: &str, alternates: &[&str]) -> InferenceQuestionSource {
        InferenceQuestionSource {
            id: id.into(),
            passage_id: "council".into(),
            question_text: "Who benefited from the delay?".into(),
            answer_text: answer.into(),
            alternate_texts: alternates.iter().map(|alt| (*alt).to_owned()).collect(),
            explanation: "Critics link the delay to developers.".into(),
            difficulty: Some(Difficulty::Medium),
        }
    }

    #[test]
    fn answers_resolve_to_utf16_spans() {
        let question = source(
            "q1",
            "the delay favoured developers",
            &["Residents remain divided", "not in the passage"],
        )
        .resolve(&passage())
        .unwrap();
        assert_eq!(question.correct_spans, vec![TextSpan::new(43, 72)]);
        assert_eq!(question.alternate_spans, vec![TextSpan::new(74, 98)]);
        assert!(question.validate(passage().text_len()).is_ok());
        assert!(question.validate(50).is_err());
    }

    #[test]
    fn offsets_count_surrogate_pairs() {
        let passage = Passage {
            id: "cafe".into(),
            title: "Caf\u{e9}".into(),
            text: "Caf\u{e9} owners \u{1f600} said the delay favoured developers.".into(),
        };
        let question = source("q1", "the delay", &[]).resolve(&passage).unwrap();
        assert_eq!(question.correct_spans, vec![TextSpan::new(20, 29)]);
        assert_eq!(get_span_text(&passage.text, &question.correct_spans[0]), "the delay");
    }

    #[test]
    fn stale_questions_are_dropped_with_warning() {
        let sink = Arc::new(MemoryLogSink::new());
        let telemetry = ComprehensionTelemetry::builder("comprehension")
            .sink(sink.clone())
            .build()
            .unwrap();
        let catalog = InferenceCatalog::from_sources([
            source("q1", "the delay favoured developers", &[]),
            source("q2", "the mayor resigned", &[]),
        ])
        .with_telemetry(telemetry);
        let questions = catalog.resolve(&passage());
        assert_eq!(questions.len(), 1);
        assert_eq!(questions[0].id, "q1");
        let records = sink.records();
        assert_eq!(records[0].message, "comprehension.inference.dropped");
        assert_eq!(records[0].metadata["question_id"], "q2");
        assert_eq!(records[0].metadata["reason"], "answer text not found");
    }

    #[test]
    fn malformed_answer_spans_fail_validation_and_never_grade() {
        let question = InferenceQuestion {
            id: "q9".into(),
            passage_id: "council".into(),
            question_text: "Who benefited?".into(),
            correct_spans: vec![TextSpan::new(72, 43)],
            alternate_spans: vec![TextSpan::new(74, 98)],
            explanation: "Hand-entered spans.".into(),
            difficulty: None,
        };
        assert!(matches!(
            question.validate(passage().text_len()),
            Err(ComprehensionError::InvalidSpan { start: 72, end: 43, .. })
        ));
        let selections = BTreeMap::from([(0, TextSpan::new(0, 5))]);
        let score = score_inference(&passage(), &[question.clone()], &selections);
        assert_eq!(score.breakdown[&0].result, InferenceResult::Incorrect);
        // the sound alternate still grades
        let selections = BTreeMap::from([(0, TextSpan::new(74, 98))]);
        let score = score_inference(&passage(), &[question], &selections);
        assert_eq!(score.breakdown[&0].result, InferenceResult::Correct);
    }

    #[test]
    fn unknown_passage_has_no_questions() {
        let catalog = InferenceCatalog::from_sources([source("q1", "the vote", &[])]);
        let other = Passage {
            id: "other".into(),
            ..passage()
        };
        assert!(catalog.resolve(&other).is_empty());
        assert_eq!(catalog.len(), 1);
        assert_eq!(catalog.passage_ids().collect::<Vec<_>>(), vec!["council"]);
    }

    #[test]
    fn scores_each_result_kind() {
        let catalog = InferenceCatalog::from_sources([
            source("q1", "the delay favoured developers", &["Residents remain divided"]),
            source("q2", "The council delayed the vote", &[]),
            source("q3", "Critics said", &[]),
            source("q4", "Residents remain divided", &[]),
        ]);
        let questions = catalog.resolve(&passage());
        let selections = BTreeMap::from([
            (0, TextSpan::new(74, 98)),
            (1, TextSpan::new(0, 17)),
            (2, TextSpan::new(60, 70)),
        ]);
        let score = score_inference(&passage(), &questions, &selections);
        assert_eq!(score.total, 4);
        assert_eq!(score.correct, 1);
        assert_eq!(score.partial, 1);
        assert_eq!(score.breakdown[&0].result, InferenceResult::Correct);
        assert_eq!(score.breakdown[&1].result, InferenceResult::Partial);
        assert_eq!(score.breakdown[&2].result, InferenceResult::Incorrect);
        assert_eq!(score.breakdown[&3].result, InferenceResult::Skipped);
        assert_eq!(
            score.breakdown[&0].correct_text.as_deref(),
            Some("the delay favoured developers")
        );
        assert_eq!(
            score.breakdown[&0].user_text.as_deref(),
            Some("Residents remain divided")
        );
        assert!(score.breakdown[&3].user_text.is_none());
    }

    #[test]
    fn out_of_range_selection_is_incorrect() {
        let questions = InferenceCatalog::from_sources([source("q1", "Residents remain divided", &[])])
            .resolve(&passage());
        let selections = BTreeMap::from([(0, TextSpan::new(74, 400))]);
        let score = score_inference(&passage(), &questions, &selections);
        assert_eq!(score.breakdown[&0].result, InferenceResult::Incorrect);
    }

    #[test]
    fn catalogs_load_from_json() {
        let dir = tempdir().unwrap();
        let passages_path = dir.path().join("passages.json");
        let questions_path = dir.path().join("inference.json");
        fs::write(&passages_path, serde_json::to_string(&vec![passage()]).unwrap()).unwrap();
        fs::write(
            &questions_path,
            r#"[{"id":"q1","passage_id":"council","question_text":"Why?",
                "answer_text":"the vote","explanation":"Stated.","difficulty":"easy"}]"#,
        )
        .unwrap();
        let passages = PassageCatalog::load(&passages_path).unwrap();
        let catalog = InferenceCatalog::load(&questions_path).unwrap();
        let passage = passages.find("council").unwrap();
        let questions = catalog.resolve(passage);
        assert_eq!(questions[0].correct_spans, vec![TextSpan::new(20, 28)]);
        assert_eq!(questions[0].difficulty, Some(Difficulty::Easy));
        assert!(passages.find("missing").is_none());
        assert!(matches!(
            PassageCatalog::load(dir.path().join("absent.json")),
            Err(ComprehensionError::Io(_))
        ));
    }
}
