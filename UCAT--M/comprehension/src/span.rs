//! Proportional-overlap grading of text selections.
//!
//! Offsets are UTF-16 code units, the convention browser selections report.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{config::SpanThresholds, error::ComprehensionError, text::slice_utf16};

/// Half-open `[start, end)` range into a passage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TextSpan {
    /// Inclusive start offset.
    pub start: usize,
    /// Exclusive end offset.
    pub end: usize,
}

impl TextSpan {
    /// Creates a span without validation.
    #[must_use]
    pub const fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// Creates a span, rejecting anything outside `0 <= start < end <= len`.
    pub fn checked(start: usize, end: usize, len: usize) -> Result<Self, ComprehensionError> {
        let span = Self::new(start, end);
        if span.fits(len) {
            Ok(span)
        } else {
            Err(ComprehensionError::InvalidSpan { start, end, len })
        }
    }

    /// `start < end`.
    #[must_use]
    pub const fn is_valid(&self) -> bool {
        self.start < self.end
    }

    /// Valid and ends within a text of `len` units.
    #[must_use]
    pub const fn fits(&self, len: usize) -> bool {
        self.is_valid() && self.end <= len
    }

    /// Width in units; zero for inverted spans.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    /// True when the span covers nothing.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Share of `correct` covered by `self`, in `[0, 1]`.
    ///
    /// A zero-width `correct` span counts as fully covered; an inverted one
    /// covers nothing.
    #[allow(clippy::cast_precision_loss)]
    #[must_use]
    pub fn overlap_ratio(&self, correct: &Self) -> f64 {
        if correct.start > correct.end {
            return 0.0;
        }
        let width = correct.len();
        if width == 0 {
            return 1.0;
        }
        let shared = self
            .end
            .min(correct.end)
            .saturating_sub(self.start.max(correct.start));
        shared as f64 / width as f64
    }

    /// `self` fully covers `other`.
    #[must_use]
    pub const fn contains(&self, other: &Self) -> bool {
        self.start <= other.start && self.end >= other.end
    }
}

impl fmt::Display for TextSpan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.start, self.end)
    }
}

/// Grade for one selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpanVerdict {
    /// Too little overlap with every answer.
    Incorrect,
    /// Overlaps an answer by at least the partial threshold.
    Partial,
    /// Overlaps an answer by at least the correct threshold, or contains one.
    Correct,
}

impl SpanVerdict {
    /// Wire value.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Incorrect => "incorrect",
            Self::Partial => "partial",
            Self::Correct => "correct",
        }
    }
}

impl fmt::Display for SpanVerdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Grades selections against answer spans.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SpanComparator {
    thresholds: SpanThresholds,
}

impl SpanComparator {
    /// Comparator with custom thresholds.
    #[must_use]
    pub const fn new(thresholds: SpanThresholds) -> Self {
        Self { thresholds }
    }

    /// Active thresholds.
    #[must_use]
    pub const fn thresholds(&self) -> SpanThresholds {
        self.thresholds
    }

    /// Grades `user` against the correct spans plus any alternates.
    ///
    /// Every candidate is checked for a full match before any is checked for
    /// a partial one, so a weak overlap with one answer never hides a strong
    /// overlap with another. Inverted answer spans never match.
    #[must_use]
    pub fn compare(
        &self,
        user: Option<&TextSpan>,
        correct: &[TextSpan],
        alternates: Option<&[TextSpan]>,
    ) -> SpanVerdict {
        let Some(user) = user.filter(|span| span.is_valid()) else {
            return SpanVerdict::Incorrect;
        };
        let candidates = || {
            correct
                .iter()
                .chain(alternates.unwrap_or_default())
                .filter(|candidate| candidate.start <= candidate.end)
        };

        if candidates().any(|candidate| {
            user.overlap_ratio(candidate) >= self.thresholds.correct_threshold
                || user.contains(candidate)
        }) {
            return SpanVerdict::Correct;
        }
        if candidates()
            .any(|candidate| user.overlap_ratio(candidate) >= self.thresholds.partial_threshold)
        {
            return SpanVerdict::Partial;
        }
        SpanVerdict::Incorrect
    }

    /// Like [`SpanComparator::compare`], but a selection running past the end
    /// of a `text_len`-unit passage is incorrect.
    #[must_use]
    pub fn compare_in(
        &self,
        text_len: usize,
        user: Option<&TextSpan>,
        correct: &[TextSpan],
        alternates: Option<&[TextSpan]>,
    ) -> SpanVerdict {
        match user {
            Some(span) if span.fits(text_len) => self.compare(Some(span), correct, alternates),
            _ => SpanVerdict::Incorrect,
        }
    }
}

/// [`SpanComparator::compare`] with the default 0.70 / 0.50 thresholds.
#[must_use]
pub fn compare_selection(
    user: Option<&TextSpan>,
    correct: &[TextSpan],
    alternates: Option<&[TextSpan]>,
) -> SpanVerdict {
    SpanComparator::default().compare(user, correct, alternates)
}

/// Text covered by `span`, with `String.prototype.slice` clamping.
#[must_use]
pub fn get_span_text(text: &str, span: &TextSpan) -> String {
    slice_utf16(text, span.start, span.end)
}
