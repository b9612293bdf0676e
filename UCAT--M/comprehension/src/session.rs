//! Scored-session records handed to the persistence layer as events.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use shared_event_bus::DrillEvent;
use uuid::Uuid;

use crate::{error::ComprehensionError, inference::InferenceScore, scoring::QuizScore};

/// Event type carried by published session records.
pub const SESSION_SCORED_EVENT: &str = "drill.session.scored";

/// Which drill produced a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DrillKind {
    /// True/false/can't-tell statements.
    Comprehension,
    /// Span selection.
    Inference,
}

/// Pass-through details supplied by the caller.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionMetadata {
    /// Time spent, when the caller measured it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_secs: Option<u64>,
    /// Difficulty label chosen by the caller.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub difficulty: Option<String>,
}

/// `{correct, total, breakdown}` plus metadata, as stored per attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionRecord {
    /// Unique record id.
    pub id: String,
    /// Drill kind.
    pub drill: DrillKind,
    /// Passage the session ran on.
    pub passage_id: String,
    /// Fully correct answers.
    pub correct: usize,
    /// Questions asked.
    pub total: usize,
    /// Serialized per-question breakdown.
    pub breakdown: Value,
    /// Caller-supplied details.
    #[serde(default)]
    pub metadata: SessionMetadata,
    /// When the record was made.
    pub recorded_at: DateTime<Utc>,
}

impl SessionRecord {
    fn new(
        drill: DrillKind,
        passage_id: &str,
        correct: usize,
        total: usize,
        breakdown: Value,
        metadata: SessionMetadata,
    ) -> Self {
        Self {
            id: format!("session-{}", Uuid::new_v4()),
            drill,
            passage_id: passage_id.to_owned(),
            correct,
            total,
            breakdown,
            metadata,
            recorded_at: Utc::now(),
        }
    }

    /// Record for a scored statement quiz.
    pub fn from_quiz(
        passage_id: &str,
        score: &QuizScore,
        metadata: SessionMetadata,
    ) -> Result<Self, ComprehensionError> {
        Ok(Self::new(
            DrillKind::Comprehension,
            passage_id,
            score.correct,
            score.total,
            serde_json::to_value(&score.breakdown)?,
            metadata,
        ))
    }

    /// Record for a scored inference session.
    pub fn from_inference(
        passage_id: &str,
        score: &InferenceScore,
        metadata: SessionMetadata,
    ) -> Result<Self, ComprehensionError> {
        Ok(Self::new(
            DrillKind::Inference,
            passage_id,
            score.correct,
            score.total,
            serde_json::to_value(&score.breakdown)?,
            metadata,
        ))
    }

    /// Wraps the record as a `drill.session.scored` event from `source`.
    pub fn to_event(&self, source: &str) -> Result<DrillEvent, ComprehensionError> {
        Ok(DrillEvent::new(
            source,
            SESSION_SCORED_EVENT,
            serde_json::to_value(self)?,
        ))
    }
}
