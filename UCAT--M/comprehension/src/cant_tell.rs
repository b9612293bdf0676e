use serde::{Deserialize, Serialize};

use crate::{
    random::{pick, RandomSource},
    text::normalize_word,
};

/// Claims the passage can never settle: authorial intent, public opinion,
/// provenance, future validity, research recency and motives.
const TEMPLATES: [&str; 6] = [
    "The author's main purpose in writing the passage was to criticise {topic}.",
    "Most members of the public hold a favourable view of {topic}.",
    "The information about {topic} was first published in an academic journal.",
    "The claims made about {topic} will remain valid for at least the next decade.",
    "Research into {topic} has been carried out within the last five years.",
    "Those who disagree about {topic} are motivated mainly by financial interests.",
];

const MIN_SENTENCES: usize = 3;
const MIN_TOPIC_WORDS: usize = 2;
const MAX_TOPIC_WORDS: usize = 4;

/// A synthetic statement whose truth the passage does not determine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CantTellDraft {
    /// Statement shown to the candidate.
    pub displayed_sentence: String,
    /// Sentence the topic was lifted from.
    pub passage_snippet: String,
}

/// Builds CAN'T TELL statements from a sentence pool.
#[derive(Debug, Clone, Copy, Default)]
pub struct CantTellBuilder;

impl CantTellBuilder {
    /// Creates a builder.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Picks a sentence, lifts a short topic from it and drops it into a template.
    ///
    /// Returns `None` with fewer than three sentences or when the topic would
    /// be a single word.
    pub fn build(&self, sentences: &[String], rng: &mut dyn RandomSource) -> Option<CantTellDraft> {
        if sentences.len() < MIN_SENTENCES {
            return None;
        }
        let sentence = pick(sentences, rng)?;
        let topic = extract_topic(sentence)?;
        let template = pick(&TEMPLATES, rng)?;
        Some(CantTellDraft {
            displayed_sentence: template.replace("{topic}", &topic),
            passage_snippet: sentence.clone(),
        })
    }
}

/// Two to four words starting a fifth of the way into the sentence,
/// lower-cased with punctuation removed.
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss
)]
#[must_use]
pub fn extract_topic(sentence: &str) -> Option<String> {
    let words: Vec<&str> = sentence.split_whitespace().collect();
    let len = words.len();
    let start = (len as f64 * 0.2).floor() as usize;
    let until = (len as f64 * 0.4).floor() as usize;
    let end = until
        .max(start + MIN_TOPIC_WORDS)
        .min(start + MAX_TOPIC_WORDS)
        .min(len);
    if start >= end {
        return None;
    }
    let topic: Vec<String> = words[start..end]
        .iter()
        .map(|word| normalize_word(word))
        .filter(|word| !word.is_empty())
        .collect();
    (topic.len() >= MIN_TOPIC_WORDS).then(|| topic.join(" "))
}
