use serde::{Deserialize, Serialize};

use crate::{
    error::ComprehensionError,
    random::{choose_index, shuffle, RandomSource},
    text::WordRule,
};

/// Word swaps that keep a sentence's meaning.
const SYNONYMS: &[(&str, &[&str])] = &[
    ("important", &["significant", "crucial", "key"]),
    ("significant", &["considerable", "notable", "substantial"]),
    ("shows", &["demonstrates", "indicates", "reveals"]),
    ("however", &["nevertheless", "nonetheless"]),
    ("large", &["big", "substantial", "sizeable"]),
    ("small", &["little", "modest"]),
    ("many", &["numerous", "a large number of"]),
    ("often", &["frequently", "regularly"]),
    ("because", &["since", "as"]),
    ("also", &["additionally", "likewise"]),
    ("rapidly", &["quickly", "swiftly"]),
    ("quickly", &["rapidly", "swiftly"]),
    ("difficult", &["challenging", "hard"]),
    ("people", &["individuals"]),
    ("found", &["discovered", "identified"]),
    ("believe", &["think", "consider"]),
    ("suggests", &["indicates", "implies"]),
    ("major", &["principal", "key"]),
    ("common", &["widespread", "frequent"]),
    ("example", &["instance"]),
    ("approximately", &["roughly", "about"]),
    ("began", &["started", "commenced"]),
    ("help", &["assist", "aid"]),
];

/// Reworded restatement of a passage sentence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Paraphrase {
    /// Reworded sentence (identical to the source when nothing matched).
    pub text: String,
    /// Number of synonym swaps applied.
    pub substitutions: usize,
}

/// Produces TRUE statements by swapping a few words for synonyms.
#[derive(Debug, Clone)]
pub struct Paraphraser {
    rules: Vec<WordRule>,
    max_substitutions: usize,
}

impl Paraphraser {
    /// Compiles the synonym table.
    pub fn new(max_substitutions: usize) -> Result<Self, ComprehensionError> {
        let rules = SYNONYMS
            .iter()
            .map(|(word, alternatives)| WordRule::new(word, alternatives))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            rules,
            max_substitutions,
        })
    }

    /// Number of synonym rules.
    #[must_use]
    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }

    /// Rewords `sentence` with at most `max_substitutions` swaps, visiting the
    /// table in a random order.
    ///
    /// A rule only fires on words present in the source sentence, so a swap
    /// is never undone by a later rule.
    pub fn paraphrase(&self, sentence: &str, rng: &mut dyn RandomSource) -> Paraphrase {
        let mut order: Vec<usize> = (0..self.rules.len()).collect();
        shuffle(&mut order, rng);

        let mut text = sentence.to_owned();
        let mut substitutions = 0;
        for idx in order {
            if substitutions >= self.max_substitutions {
                break;
            }
            let rule = &self.rules[idx];
            if !rule.matches(sentence) {
                continue;
            }
            let choice = choose_index(rule.replacements().len(), rng).unwrap_or(0);
            if let Some(next) = rule.replace_first(&text, choice) {
                text = next;
                substitutions += 1;
            }
        }
        Paraphrase {
            text,
            substitutions,
        }
    }
}
