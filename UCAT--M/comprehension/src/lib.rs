#![deny(
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    missing_docs,
    rust_2018_idioms
)]

//! UCAT verbal-reasoning drill engine: statement synthesis, session scoring
//! and inference span grading.

/// Setup and data-loading errors.
pub mod error;

/// TOML tuning for quizzes and span grading.
pub mod config;

/// Injectable randomness.
pub mod random;

/// Sentence splitting, word rules and UTF-16 helpers.
pub mod text;

/// Synonym substitution for TRUE statements.
pub mod paraphrase;

/// Distortion strategies for FALSE statements.
pub mod distortion;

/// Templated CAN'T TELL statements.
pub mod cant_tell;

/// Question and verdict types.
pub mod question;

/// Quiz orchestration over a sentence pool.
pub mod builder;

/// Quiz scoring and the logging scorer.
pub mod scoring;

/// Span comparison.
pub mod span;

/// Inference passages, questions and scoring.
pub mod inference;

/// Session records for persistence.
pub mod session;

/// Structured logging and event publishing.
#[path = "../telemetry.rs"]
pub mod telemetry;

pub use builder::{verdict_counts, QuestionPlan, QuestionSynthesizer};
pub use cant_tell::{extract_topic, CantTellBuilder, CantTellDraft};
pub use config::{ComprehensionConfig, QuizConfig, SpanThresholds};
pub use distortion::{Distortion, DistortionEngine, DistortionKind};
pub use error::ComprehensionError;
pub use inference::{
    score_inference, score_inference_with, Difficulty, InferenceBreakdownItem, InferenceCatalog,
    InferenceQuestion, InferenceQuestionSource, InferenceResult, InferenceScore, Passage,
    PassageCatalog,
};
pub use paraphrase::{Paraphrase, Paraphraser};
pub use question::{Question, Verdict};
pub use random::{RandomSource, SeededRandom, SequenceRandom};
pub use scoring::{score_quiz, DrillScorer, QuestionBreakdownItem, QuizScore};
pub use session::{DrillKind, SessionMetadata, SessionRecord, SESSION_SCORED_EVENT};
pub use span::{compare_selection, get_span_text, SpanComparator, SpanVerdict, TextSpan};
pub use telemetry::{ComprehensionTelemetry, ComprehensionTelemetryBuilder};
pub use text::split_sentences;
