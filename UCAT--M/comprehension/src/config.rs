use std::{fs, path::Path};

use serde::{Deserialize, Serialize};

use crate::error::ComprehensionError;

/// Top-level engine configuration, usually read from `drill.toml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ComprehensionConfig {
    /// Statement quiz tuning.
    #[serde(default)]
    pub quiz: QuizConfig,
    /// Span grading thresholds.
    #[serde(default)]
    pub spans: SpanThresholds,
}

impl ComprehensionConfig {
    /// Loads and validates configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ComprehensionError> {
        let raw = fs::read_to_string(path.as_ref())?;
        Self::from_toml(&raw)
    }

    /// Parses and validates configuration from TOML text.
    pub fn from_toml(raw: &str) -> Result<Self, ComprehensionError> {
        let config: Self = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Rejects out-of-range ratios and inverted thresholds.
    pub fn validate(&self) -> Result<(), ComprehensionError> {
        let ratios = [
            ("quiz.false_ratio", self.quiz.false_ratio),
            ("quiz.cant_tell_ratio", self.quiz.cant_tell_ratio),
            ("spans.correct_threshold", self.spans.correct_threshold),
            ("spans.partial_threshold", self.spans.partial_threshold),
        ];
        for (name, value) in ratios {
            if !(0.0..=1.0).contains(&value) {
                return Err(ComprehensionError::InvalidConfig(format!(
                    "{name} must be within [0, 1], got {value}"
                )));
            }
        }
        if self.quiz.false_ratio + self.quiz.cant_tell_ratio > 1.0 {
            return Err(ComprehensionError::InvalidConfig(
                "quiz.false_ratio + quiz.cant_tell_ratio exceeds 1".into(),
            ));
        }
        if self.spans.partial_threshold > self.spans.correct_threshold {
            return Err(ComprehensionError::InvalidConfig(
                "spans.partial_threshold is above spans.correct_threshold".into(),
            ));
        }
        if self.quiz.min_questions == 0 {
            return Err(ComprehensionError::InvalidConfig(
                "quiz.min_questions must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

/// Knobs for the true/false/can't-tell statement quiz.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuizConfig {
    /// Sentences shorter than this (in UTF-16 units) are not used.
    #[serde(default = "default_min_sentence_chars")]
    pub min_sentence_chars: usize,
    /// Lower bound on the resolved question count.
    #[serde(default = "default_min_questions")]
    pub min_questions: usize,
    /// Share of FALSE statements.
    #[serde(default = "default_false_ratio")]
    pub false_ratio: f64,
    /// Share of CAN'T TELL statements before capping.
    #[serde(default = "default_cant_tell_ratio")]
    pub cant_tell_ratio: f64,
    /// Hard cap on CAN'T TELL statements per quiz.
    #[serde(default = "default_max_cant_tell")]
    pub max_cant_tell: usize,
    /// Maximum synonym swaps per paraphrased sentence.
    #[serde(default = "default_max_paraphrase_substitutions")]
    pub max_paraphrase_substitutions: usize,
}

impl Default for QuizConfig {
    fn default() -> Self {
        Self {
            min_sentence_chars: default_min_sentence_chars(),
            min_questions: default_min_questions(),
            false_ratio: default_false_ratio(),
            cant_tell_ratio: default_cant_tell_ratio(),
            max_cant_tell: default_max_cant_tell(),
            max_paraphrase_substitutions: default_max_paraphrase_substitutions(),
        }
    }
}

/// Overlap ratios separating correct, partial and incorrect selections.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpanThresholds {
    /// Minimum overlap ratio graded `correct`.
    #[serde(default = "default_correct_threshold")]
    pub correct_threshold: f64,
    /// Minimum overlap ratio graded `partial`.
    #[serde(default = "default_partial_threshold")]
    pub partial_threshold: f64,
}

impl Default for SpanThresholds {
    fn default() -> Self {
        Self {
            correct_threshold: default_correct_threshold(),
            partial_threshold: default_partial_threshold(),
        }
    }
}

const fn default_min_sentence_chars() -> usize {
    20
}

const fn default_min_questions() -> usize {
    3
}

const fn default_false_ratio() -> f64 {
    0.4
}

const fn default_cant_tell_ratio() -> f64 {
    0.2
}

const fn default_max_cant_tell() -> usize {
    1
}

const fn default_max_paraphrase_substitutions() -> usize {
    2
}

const fn default_correct_threshold() -> f64 {
    0.70
}

const fn default_partial_threshold() -> f64 {
    0.50
}
