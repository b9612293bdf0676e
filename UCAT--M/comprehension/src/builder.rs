//! Statement quiz assembly: quota planning plus a consumable sentence pool.

use serde::{Deserialize, Serialize};
use serde_json::json;
use shared_logging::LogLevel;

use crate::{
    cant_tell::CantTellBuilder,
    config::QuizConfig,
    distortion::{DistortionEngine, DistortionKind},
    error::ComprehensionError,
    paraphrase::Paraphraser,
    question::{Question, Verdict},
    random::{shuffle, RandomSource},
    telemetry::{log_quietly, ComprehensionTelemetry},
    text::split_sentences,
};

/// How many statements of each kind a quiz should contain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionPlan {
    /// Resolved question count.
    pub target: usize,
    /// FALSE statements wanted.
    pub false_quota: usize,
    /// TRUE statements wanted.
    pub true_quota: usize,
    /// CAN'T TELL statements wanted.
    pub cant_tell_quota: usize,
}

impl QuestionPlan {
    /// Resolves quotas for a passage with `sentence_count` usable sentences.
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_precision_loss
    )]
    #[must_use]
    pub fn resolve(config: &QuizConfig, sentence_count: usize, requested: usize) -> Self {
        let target = requested.min(sentence_count).max(config.min_questions);
        let share = |ratio: f64| (target as f64 * ratio).round() as usize;
        let false_quota = share(config.false_ratio).max(1);
        let cant_tell_quota = share(config.cant_tell_ratio).min(config.max_cant_tell);
        let true_quota = target
            .saturating_sub(false_quota + cant_tell_quota)
            .max(1);
        Self {
            target,
            false_quota,
            true_quota,
            cant_tell_quota,
        }
    }
}

/// Passage sentences plus a used flag per sentence.
///
/// A sentence taken for a TRUE or FALSE statement is never handed out again.
#[derive(Debug, Clone)]
pub(crate) struct SentencePool {
    sentences: Vec<String>,
    used: Vec<bool>,
}

impl SentencePool {
    pub(crate) fn new(sentences: Vec<String>) -> Self {
        let used = vec![false; sentences.len()];
        Self { sentences, used }
    }

    pub(crate) fn len(&self) -> usize {
        self.sentences.len()
    }

    pub(crate) fn all(&self) -> &[String] {
        &self.sentences
    }

    /// The sentence at `idx` if it is still free.
    pub(crate) fn available(&self, idx: usize) -> Option<&str> {
        match self.used.get(idx) {
            Some(false) => self.sentences.get(idx).map(String::as_str),
            _ => None,
        }
    }

    /// Marks `idx` used and returns its sentence; `None` if already taken.
    pub(crate) fn take(&mut self, idx: usize) -> Option<String> {
        let slot = self.used.get_mut(idx)?;
        if *slot {
            return None;
        }
        *slot = true;
        self.sentences.get(idx).cloned()
    }
}

/// Builds true/false/can't-tell statement quizzes from passage text.
#[derive(Debug, Clone)]
pub struct QuestionSynthesizer {
    config: QuizConfig,
    paraphraser: Paraphraser,
    distortions: DistortionEngine,
    cant_tell: CantTellBuilder,
    telemetry: Option<ComprehensionTelemetry>,
}

impl QuestionSynthesizer {
    /// Compiles every rule table for the given tuning.
    pub fn new(config: QuizConfig) -> Result<Self, ComprehensionError> {
        Ok(Self {
            paraphraser: Paraphraser::new(config.max_paraphrase_substitutions)?,
            distortions: DistortionEngine::new()?,
            cant_tell: CantTellBuilder::new(),
            telemetry: None,
            config,
        })
    }

    /// Attaches telemetry.
    #[must_use]
    pub fn with_telemetry(mut self, telemetry: ComprehensionTelemetry) -> Self {
        self.telemetry = Some(telemetry);
        self
    }

    /// Active tuning.
    #[must_use]
    pub const fn config(&self) -> &QuizConfig {
        &self.config
    }

    /// The distortion engine, for callers that want single distortions.
    #[must_use]
    pub const fn distortions(&self) -> &DistortionEngine {
        &self.distortions
    }

    /// The paraphraser used for TRUE statements.
    #[must_use]
    pub const fn paraphraser(&self) -> &Paraphraser {
        &self.paraphraser
    }

    /// Usable sentences of `text` under the configured minimum length.
    #[must_use]
    pub fn split_sentences(&self, text: &str) -> Vec<String> {
        split_sentences(text, self.config.min_sentence_chars)
    }

    /// Builds up to `count` statements (never fewer than the configured
    /// minimum when the passage allows it), shuffled so kinds interleave.
    ///
    /// FALSE slots that no sentence can fill are handed to TRUE statements.
    /// An empty result means the passage has no usable sentences.
    pub fn build_questions(
        &self,
        passage_text: &str,
        count: usize,
        rng: &mut dyn RandomSource,
    ) -> Vec<Question> {
        let sentences = self.split_sentences(passage_text);
        if sentences.is_empty() {
            log_quietly(
                self.telemetry.as_ref(),
                LogLevel::Warn,
                "comprehension.questions.no_sentences",
                json!({ "chars": passage_text.chars().count() }),
            );
            return Vec::new();
        }

        let plan = QuestionPlan::resolve(&self.config, sentences.len(), count);
        let mut pool = SentencePool::new(sentences);
        let mut order: Vec<usize> = (0..pool.len()).collect();
        shuffle(&mut order, rng);

        let mut questions = Vec::with_capacity(plan.target);
        let mut falses = self.fill_false(&mut pool, &order, plan.false_quota, &mut questions, rng);
        if falses < plan.false_quota {
            log_quietly(
                self.telemetry.as_ref(),
                LogLevel::Debug,
                "comprehension.distortion.exhausted",
                json!({ "wanted": plan.false_quota, "built": falses }),
            );
            falses += self.fill_forced_negation(
                &mut pool,
                &order,
                plan.false_quota - falses,
                &mut questions,
            );
        }
        let true_quota = plan.true_quota + (plan.false_quota - falses);
        let trues = self.fill_true(&mut pool, &order, true_quota, &mut questions, rng);

        let mut cant_tells = 0;
        for _ in 0..plan.cant_tell_quota {
            // draws from every sentence, used or not
            if let Some(draft) = self.cant_tell.build(pool.all(), rng) {
                questions.push(Question::undecidable(
                    draft.displayed_sentence,
                    draft.passage_snippet,
                ));
                cant_tells += 1;
            }
        }

        shuffle(&mut questions, rng);
        log_quietly(
            self.telemetry.as_ref(),
            LogLevel::Info,
            "comprehension.questions.built",
            json!({
                "sentences": pool.len(),
                "target": plan.target,
                "false": falses,
                "true": trues,
                "cant_tell": cant_tells,
            }),
        );
        questions
    }

    fn fill_false(
        &self,
        pool: &mut SentencePool,
        order: &[usize],
        quota: usize,
        questions: &mut Vec<Question>,
        rng: &mut dyn RandomSource,
    ) -> usize {
        let mut built = 0;
        for &idx in order {
            if built >= quota {
                break;
            }
            let Some(sentence) = pool.available(idx) else {
                continue;
            };
            let distortion = self.distortions.apply(sentence, rng);
            if let (true, Some(kind)) = (distortion.applied, distortion.kind) {
                if let Some(source) = pool.take(idx) {
                    questions.push(Question::falsified(distortion.text, source, kind));
                    built += 1;
                }
            }
        }
        built
    }

    fn fill_forced_negation(
        &self,
        pool: &mut SentencePool,
        order: &[usize],
        quota: usize,
        questions: &mut Vec<Question>,
    ) -> usize {
        let mut built = 0;
        for &idx in order {
            if built >= quota {
                break;
            }
            let Some(sentence) = pool.available(idx) else {
                continue;
            };
            let Some(text) = self
                .distortions
                .apply_kind(DistortionKind::NegationFlip, sentence)
            else {
                continue;
            };
            if let Some(source) = pool.take(idx) {
                questions.push(Question::falsified(text, source, DistortionKind::NegationFlip));
                built += 1;
            }
        }
        built
    }

    fn fill_true(
        &self,
        pool: &mut SentencePool,
        order: &[usize],
        quota: usize,
        questions: &mut Vec<Question>,
        rng: &mut dyn RandomSource,
    ) -> usize {
        let mut built = 0;
        for &idx in order {
            if built >= quota {
                break;
            }
            let Some(source) = pool.take(idx) else {
                continue;
            };
            let paraphrase = self.paraphraser.paraphrase(&source, rng);
            questions.push(Question::truthful(paraphrase.text, source));
            built += 1;
        }
        built
    }
}

/// Counts statements per verdict, in `True, False, CantTell` order.
#[must_use]
pub fn verdict_counts(questions: &[Question]) -> [usize; 3] {
    let mut counts = [0; 3];
    for question in questions {
        let slot = match question.correct_answer {
            Verdict::True => 0,
            Verdict::False => 1,
            Verdict::CantTell => 2,
        };
        counts[slot] += 1;
    }
    counts
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::sync::Arc;

    use shared_logging::MemoryLogSink;

    use super::*;
    use crate::random::{SeededRandom, SequenceRandom};

    const SAMPLE: &str = "The sky is often blue in summer. Rain is common in winter. \
                          Scientists argue that climate is changing rapidly.";

    const LONG: &str = "Some historians claim the canal was finished in 1820. \
        The project employed many labourers from nearby villages. \
        Flooding often delayed construction during the spring. \
        The engineers could not agree on the route at first. \
        Research suggests that cholera outbreaks slowed progress. \
        Trade along the canal grew rapidly after it opened. \
        Several warehouses were built along the northern bank. \
        The toll system partly funded later repairs. \
        Barges were usually pulled by horses along the towpath. \
        Railways eventually reduced the canal's importance.";

    fn synthesizer() -> QuestionSynthesizer {
        QuestionSynthesizer::new(QuizConfig::default()).unwrap()
    }

    #[test]
    fn plan_follows_ratios() {
        let config = QuizConfig::default();
        let plan = QuestionPlan::resolve(&config, 3, 3);
        assert_eq!(
            plan,
            QuestionPlan {
                target: 3,
                false_quota: 1,
                true_quota: 1,
                cant_tell_quota: 1
            }
        );
        let plan = QuestionPlan::resolve(&config, 12, 10);
        assert_eq!((plan.false_quota, plan.cant_tell_quota, plan.true_quota), (4, 1, 5));
        // never below the minimum, never above the sentence count otherwise
        assert_eq!(QuestionPlan::resolve(&config, 2, 10).target, 3);
        assert_eq!(QuestionPlan::resolve(&config, 6, 10).target, 6);
        assert_eq!(QuestionPlan::resolve(&config, 6, 1).target, 3);
    }

    #[test]
    fn sample_passage_yields_one_of_each() {
        let synth = synthesizer();
        for seed in 0..25 {
            let questions = synth.build_questions(SAMPLE, 3, &mut SeededRandom::seeded(seed));
            assert_eq!(questions.len(), 3, "seed {seed}");
            assert_eq!(verdict_counts(&questions), [1, 1, 1], "seed {seed}");
            for question in &questions {
                if question.correct_answer == Verdict::False {
                    assert_ne!(question.displayed_sentence, question.passage_snippet);
                    assert!(question.distortion.is_some());
                }
            }
        }
    }

    #[test]
    fn qualifier_distortion_on_sample_with_fixed_draws() {
        let synth = synthesizer();
        let questions = synth.build_questions(SAMPLE, 3, &mut SequenceRandom::constant(0.99));
        let falsified = questions
            .iter()
            .find(|q| q.correct_answer == Verdict::False)
            .unwrap();
        assert_eq!(falsified.passage_snippet, "The sky is often blue in summer.");
        assert_eq!(falsified.displayed_sentence, "The sky is always blue in summer.");
        assert_eq!(falsified.distortion, Some(DistortionKind::QualifierToAbsolute));
        let truthful = questions
            .iter()
            .find(|q| q.correct_answer == Verdict::True)
            .unwrap();
        assert_eq!(truthful.passage_snippet, "Rain is common in winter.");
    }

    #[test]
    fn unsplittable_passages_give_nothing() {
        let synth = synthesizer();
        let mut rng = SequenceRandom::constant(0.5);
        assert!(synth.build_questions("", 5, &mut rng).is_empty());
        assert!(synth.build_questions("Too short. Also short.", 5, &mut rng).is_empty());
    }

    #[test]
    fn respects_bounds_and_single_cant_tell() {
        let synth = synthesizer();
        for seed in 0..25 {
            let questions = synth.build_questions(LONG, 8, &mut SeededRandom::seeded(seed));
            assert!((3..=8).contains(&questions.len()), "seed {seed}");
            assert!(verdict_counts(&questions)[2] <= 1);
        }
    }

    #[test]
    fn sources_are_not_reused_across_true_and_false() {
        let synth = synthesizer();
        for seed in 0..25 {
            let questions = synth.build_questions(LONG, 10, &mut SeededRandom::seeded(seed));
            let mut seen = HashSet::new();
            for question in questions
                .iter()
                .filter(|q| q.correct_answer != Verdict::CantTell)
            {
                assert!(seen.insert(question.passage_snippet.clone()), "seed {seed}");
            }
        }
    }

    #[test]
    fn forced_negation_fills_false_quota() {
        let synth = synthesizer();
        let mut pool = SentencePool::new(vec![
            "The museum is closed on public holidays.".into(),
            "Visitors enjoy the sculpture garden.".into(),
        ]);
        let mut questions = Vec::new();
        let built = synth.fill_forced_negation(&mut pool, &[1, 0], 2, &mut questions);
        assert_eq!(built, 1);
        assert_eq!(
            questions[0].displayed_sentence,
            "The museum is not closed on public holidays."
        );
        assert!(pool.available(0).is_none());
        assert!(pool.available(1).is_some());
    }

    #[test]
    fn undistortable_passage_refills_with_true_statements() {
        let plain = "Birds fly south each autumn across the valley. \
                     The river floods its banks every spring. \
                     Farmers plant barley near the old mill. \
                     Children walk to school along the river path.";
        let synth = synthesizer();
        for seed in 0..5 {
            let questions = synth.build_questions(plain, 4, &mut SeededRandom::seeded(seed));
            assert_eq!(questions.len(), 4, "seed {seed}");
            assert_eq!(verdict_counts(&questions), [3, 0, 1], "seed {seed}");
        }
    }

    #[test]
    fn pool_hands_out_each_sentence_once() {
        let mut pool = SentencePool::new(vec!["a sentence long enough".into()]);
        assert!(pool.take(0).is_some());
        assert!(pool.take(0).is_none());
        assert!(pool.take(5).is_none());
        assert_eq!(pool.all().len(), 1);
    }

    #[test]
    fn logs_build_summary() {
        let sink = Arc::new(MemoryLogSink::new());
        let telemetry = ComprehensionTelemetry::builder("comprehension")
            .sink(sink.clone())
            .build()
            .unwrap();
        let synth = synthesizer().with_telemetry(telemetry);
        synth.build_questions(SAMPLE, 3, &mut SeededRandom::seeded(1));
        let records = sink.records();
        let built = records
            .iter()
            .find(|r| r.message == "comprehension.questions.built")
            .unwrap();
        assert_eq!(built.metadata["target"], 3);
    }
}
