//! Rule-based distortions that turn a passage sentence into a plausible false statement.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{
    error::ComprehensionError,
    random::{shuffle, RandomSource},
    text::WordRule,
};

/// The five distortion strategies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DistortionKind {
    /// Hedge word becomes an absolute (`often` -> `always`).
    QualifierToAbsolute,
    /// Existing negation removed, or `not` inserted after an auxiliary.
    NegationFlip,
    /// Contributing factor becomes the sole cause.
    CausalExaggeration,
    /// Bounded scope becomes universal (`in some` -> `in all`).
    ScopeBroadening,
    /// Hedged claim becomes proven fact.
    CertaintyInjection,
}

impl DistortionKind {
    /// Every strategy, in declaration order.
    pub const ALL: [Self; 5] = [
        Self::QualifierToAbsolute,
        Self::NegationFlip,
        Self::CausalExaggeration,
        Self::ScopeBroadening,
        Self::CertaintyInjection,
    ];

    /// Stable label used in logs and CLI arguments.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::QualifierToAbsolute => "qualifier_to_absolute",
            Self::NegationFlip => "negation_flip",
            Self::CausalExaggeration => "causal_exaggeration",
            Self::ScopeBroadening => "scope_broadening",
            Self::CertaintyInjection => "certainty_injection",
        }
    }

    /// Parses a label produced by [`DistortionKind::label`].
    #[must_use]
    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.label() == label.trim().to_ascii_lowercase())
    }
}

impl fmt::Display for DistortionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Outcome of one distortion attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Distortion {
    /// Distorted sentence, or the original when nothing applied.
    pub text: String,
    /// Whether any strategy fired.
    pub applied: bool,
    /// Strategy that fired.
    pub kind: Option<DistortionKind>,
}

const QUALIFIERS: &[(&str, &str)] = &[
    ("some", "all"),
    ("many", "all"),
    ("often", "always"),
    ("frequently", "always"),
    ("sometimes", "always"),
    ("usually", "always"),
    ("could", "will"),
    ("might", "will"),
    ("may", "will"),
    ("can", "will"),
];

const NEGATIONS: &[(&str, &str)] = &[
    ("no longer", "still"),
    ("never", "always"),
    ("cannot", "can"),
    ("can't", "can"),
    ("won't", "will"),
    ("isn't", "is"),
    ("aren't", "are"),
    ("wasn't", "was"),
    ("weren't", "were"),
    ("doesn't", "does"),
    ("don't", "do"),
    ("didn't", "did"),
    (r"not\s+", ""),
];

const AUXILIARIES: &str =
    "is|are|was|were|has|have|had|will|would|can|could|should|does|do|did|must";

const CAUSAL: &[(&str, &str)] = &[
    ("contributed to", "was the sole cause of"),
    ("contributes to", "is the sole cause of"),
    ("played a role in", "single-handedly caused"),
    ("plays a role in", "single-handedly causes"),
    ("helped to", "single-handedly managed to"),
    ("influenced", "completely determined"),
    ("influences", "completely determines"),
    ("partly", "entirely"),
    ("partially", "entirely"),
    ("largely", "entirely"),
    ("mostly", "entirely"),
    ("one of the", "the only"),
    ("a major", "the only"),
    ("an important", "the only"),
];

const SCOPE: &[(&str, &str)] = &[
    ("in some", "in all"),
    ("a certain", "every"),
    ("certain", "all"),
    ("most", "all"),
    ("several", "all"),
    ("a few", "all"),
    ("specific", "universal"),
    ("particular", "universal"),
    ("occasionally", "invariably"),
    ("rarely", "commonly"),
];

const CERTAINTY: &[(&str, &str)] = &[
    ("it is widely believed that", "it has been proven that"),
    ("it is widely believed", "it is a proven fact"),
    (
        "(scientists|researchers|experts|historians|critics) (?:argue|suggest|believe|claim)",
        "$1 have proven",
    ),
    ("research suggests", "research proves"),
    ("studies suggest", "studies prove"),
    ("evidence suggests", "evidence proves"),
    ("is thought to", "is known to"),
    ("are thought to", "are known to"),
    ("appears to be", "is definitely"),
    ("appear to be", "are definitely"),
    ("seems to be", "is definitely"),
    ("may have", "must have"),
    ("might have", "must have"),
    ("might be", "is certainly"),
    ("is likely to", "is certain to"),
    ("possibly", "certainly"),
    ("perhaps", "undoubtedly"),
];

/// Ordered rule list for one strategy; the first matching rule wins.
#[derive(Debug, Clone)]
struct RuleSet {
    rules: Vec<WordRule>,
}

impl RuleSet {
    fn compile(table: &[(&str, &'static str)]) -> Result<Self, ComprehensionError> {
        let rules = table
            .iter()
            .map(|(pattern, replacement)| WordRule::new(pattern, &[*replacement]))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { rules })
    }

    fn apply(&self, sentence: &str) -> Option<String> {
        self.rules
            .iter()
            .find_map(|rule| rule.replace_first(sentence, 0))
    }
}

/// Applies the five distortion strategies.
#[derive(Debug, Clone)]
pub struct DistortionEngine {
    qualifiers: RuleSet,
    negations: RuleSet,
    auxiliary: WordRule,
    causal: RuleSet,
    scope: RuleSet,
    certainty: RuleSet,
}

impl DistortionEngine {
    /// Compiles every rule table.
    pub fn new() -> Result<Self, ComprehensionError> {
        Ok(Self {
            qualifiers: RuleSet::compile(QUALIFIERS)?,
            negations: RuleSet::compile(NEGATIONS)?,
            auxiliary: WordRule::new(&format!("({AUXILIARIES})"), &["$1 not"])?,
            causal: RuleSet::compile(CAUSAL)?,
            scope: RuleSet::compile(SCOPE)?,
            certainty: RuleSet::compile(CERTAINTY)?,
        })
    }

    /// Tries every strategy in a freshly shuffled order and keeps the first hit.
    pub fn apply(&self, sentence: &str, rng: &mut dyn RandomSource) -> Distortion {
        let mut order = DistortionKind::ALL;
        shuffle(&mut order, rng);
        order
            .into_iter()
            .find_map(|kind| {
                self.apply_kind(kind, sentence).map(|text| Distortion {
                    text,
                    applied: true,
                    kind: Some(kind),
                })
            })
            .unwrap_or_else(|| Distortion {
                text: sentence.to_owned(),
                applied: false,
                kind: None,
            })
    }

    /// Runs one strategy; `None` when its patterns do not occur.
    #[must_use]
    pub fn apply_kind(&self, kind: DistortionKind, sentence: &str) -> Option<String> {
        let distorted = match kind {
            DistortionKind::QualifierToAbsolute => self.qualifiers.apply(sentence),
            DistortionKind::NegationFlip => self.flip_negation(sentence),
            DistortionKind::CausalExaggeration => self.causal.apply(sentence),
            DistortionKind::ScopeBroadening => self.scope.apply(sentence),
            DistortionKind::CertaintyInjection => self.certainty.apply(sentence),
        }?;
        (distorted != sentence).then_some(distorted)
    }

    fn flip_negation(&self, sentence: &str) -> Option<String> {
        self.negations
            .apply(sentence)
            .or_else(|| self.auxiliary.replace_first(sentence, 0))
    }
}
