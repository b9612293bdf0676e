use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand};
use serde_json::json;
use shared_event_bus::FileEventPublisher;
use shared_logging::LogLevel;
use ucat_comprehension::{
    get_span_text, ComprehensionConfig, ComprehensionTelemetry, DistortionKind, DrillScorer,
    InferenceCatalog, Passage, PassageCatalog, QuestionSynthesizer, SeededRandom,
    SessionMetadata, SessionRecord, SpanComparator, TextSpan, Verdict,
};

const EVENT_SOURCE: &str = "drill";

#[derive(Parser, Debug)]
#[command(name = "drill", version, about = "UCAT verbal-reasoning drill tools")]
struct Cli {
    /// TOML tuning file; built-in defaults when absent.
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// JSON-lines log file.
    #[arg(long, global = true)]
    log: Option<PathBuf>,
    /// Minimum level written to `--log`.
    #[arg(long, global = true, default_value = "info")]
    log_level: String,
    /// Appends scored sessions here as events.
    #[arg(long, global = true)]
    event_log: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Builds a true/false/can't-tell quiz for a passage and optionally scores it.
    Quiz(QuizArgs),
    /// Distorts one sentence.
    Distort {
        #[arg(long)]
        sentence: String,
        /// Strategy label, e.g. `negation_flip`; random order when omitted.
        #[arg(long)]
        kind: Option<String>,
        #[arg(long)]
        seed: Option<u64>,
    },
    /// Grades one selection against answer spans.
    Compare(CompareArgs),
    /// Resolves a passage's inference questions and optionally scores selections.
    Inference(InferenceArgs),
}

#[derive(Parser, Debug)]
struct QuizArgs {
    #[arg(long)]
    passages: PathBuf,
    #[arg(long)]
    passage_id: String,
    #[arg(long, default_value_t = 5)]
    count: usize,
    #[arg(long)]
    seed: Option<u64>,
    /// Comma-separated answers by position; leave a slot empty to skip it.
    #[arg(long)]
    answers: Option<String>,
    #[arg(long)]
    duration_secs: Option<u64>,
}

#[derive(Parser, Debug)]
struct CompareArgs {
    #[arg(long)]
    passages: PathBuf,
    #[arg(long)]
    passage_id: String,
    #[arg(long)]
    start: usize,
    #[arg(long)]
    end: usize,
    /// Answer spans as `start:end[,start:end]`.
    #[arg(long)]
    correct: String,
    #[arg(long)]
    alternate: Option<String>,
}

#[derive(Parser, Debug)]
struct InferenceArgs {
    #[arg(long)]
    passages: PathBuf,
    #[arg(long)]
    catalog: PathBuf,
    #[arg(long)]
    passage_id: String,
    /// Selections as `position=start:end[,position=start:end]`.
    #[arg(long)]
    selections: Option<String>,
    #[arg(long)]
    duration_secs: Option<u64>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => ComprehensionConfig::load(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => ComprehensionConfig::default(),
    };
    let telemetry = build_telemetry(&cli)?;
    match cli.command {
        Commands::Quiz(args) => handle_quiz(&config, &telemetry, args),
        Commands::Distort {
            sentence,
            kind,
            seed,
        } => handle_distort(&config, &sentence, kind.as_deref(), seed),
        Commands::Compare(args) => handle_compare(&config, &args),
        Commands::Inference(args) => handle_inference(&config, &telemetry, args),
    }
}

fn build_telemetry(cli: &Cli) -> Result<ComprehensionTelemetry> {
    let level: LogLevel = cli.log_level.parse()?;
    let mut builder = ComprehensionTelemetry::builder(EVENT_SOURCE).min_level(level);
    if let Some(path) = &cli.log {
        builder = builder.log_path(path);
    }
    if let Some(path) = &cli.event_log {
        let publisher = FileEventPublisher::new(path)
            .with_context(|| format!("opening event log {}", path.display()))?;
        builder = builder.event_publisher(Arc::new(publisher));
    }
    builder.build()
}

fn seeded(seed: Option<u64>) -> SeededRandom {
    seed.map_or_else(SeededRandom::from_entropy, SeededRandom::seeded)
}

fn load_passage(path: &Path, id: &str) -> Result<Passage> {
    let catalog = PassageCatalog::load(path)
        .with_context(|| format!("loading passages {}", path.display()))?;
    catalog
        .find(id)
        .cloned()
        .ok_or_else(|| anyhow!("passage {id} not found in {}", path.display()))
}

fn handle_quiz(
    config: &ComprehensionConfig,
    telemetry: &ComprehensionTelemetry,
    args: QuizArgs,
) -> Result<()> {
    let passage = load_passage(&args.passages, &args.passage_id)?;
    let synthesizer =
        QuestionSynthesizer::new(config.quiz.clone())?.with_telemetry(telemetry.clone());
    let questions = synthesizer.build_questions(&passage.text, args.count, &mut seeded(args.seed));
    if questions.is_empty() {
        println!("no questions available for passage {}", passage.id);
        return Ok(());
    }

    let Some(raw) = args.answers else {
        println!("{}", serde_json::to_string_pretty(&questions)?);
        return Ok(());
    };
    let answers = parse_answers(&raw)?;
    let scorer = DrillScorer::new(SpanComparator::new(config.spans))
        .with_telemetry(telemetry.clone());
    let score = scorer.score_quiz(&questions, &answers);
    let record = SessionRecord::from_quiz(
        &passage.id,
        &score,
        SessionMetadata {
            duration_secs: args.duration_secs,
            difficulty: None,
        },
    )?;
    telemetry.publish(record.to_event(EVENT_SOURCE)?)?;
    println!(
        "{}",
        serde_json::to_string_pretty(&json!({
            "questions": questions,
            "score": score,
            "session_id": record.id,
        }))?
    );
    Ok(())
}

fn handle_distort(
    config: &ComprehensionConfig,
    sentence: &str,
    kind: Option<&str>,
    seed: Option<u64>,
) -> Result<()> {
    let synthesizer = QuestionSynthesizer::new(config.quiz.clone())?;
    let engine = synthesizer.distortions();
    let output = match kind {
        Some(label) => {
            let kind = DistortionKind::from_label(label)
                .ok_or_else(|| anyhow!("unknown distortion kind `{label}`"))?;
            let text = engine.apply_kind(kind, sentence);
            json!({
                "applied": text.is_some(),
                "kind": text.as_ref().map(|_| kind),
                "text": text.unwrap_or_else(|| sentence.to_owned()),
            })
        }
        None => serde_json::to_value(engine.apply(sentence, &mut seeded(seed)))?,
    };
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

fn handle_compare(config: &ComprehensionConfig, args: &CompareArgs) -> Result<()> {
    let passage = load_passage(&args.passages, &args.passage_id)?;
    let correct = parse_spans(&args.correct)?;
    let alternates = args.alternate.as_deref().map(parse_spans).transpose()?;
    check_answer_spans(&correct, passage.text_len())?;
    if let Some(alternates) = &alternates {
        check_answer_spans(alternates, passage.text_len())?;
    }
    let user = TextSpan::new(args.start, args.end);
    let verdict = SpanComparator::new(config.spans).compare_in(
        passage.text_len(),
        Some(&user),
        &correct,
        alternates.as_deref(),
    );
    let output = json!({
        "verdict": verdict,
        "selected": get_span_text(&passage.text, &user),
        "answers": correct
            .iter()
            .map(|span| get_span_text(&passage.text, span))
            .collect::<Vec<_>>(),
    });
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

fn handle_inference(
    config: &ComprehensionConfig,
    telemetry: &ComprehensionTelemetry,
    args: InferenceArgs,
) -> Result<()> {
    let passage = load_passage(&args.passages, &args.passage_id)?;
    let catalog = InferenceCatalog::load(&args.catalog)
        .with_context(|| format!("loading inference catalog {}", args.catalog.display()))?
        .with_telemetry(telemetry.clone());
    let questions = catalog.resolve(&passage);
    if questions.is_empty() {
        println!("no inference questions available for passage {}", passage.id);
        return Ok(());
    }

    let Some(raw) = args.selections else {
        println!("{}", serde_json::to_string_pretty(&questions)?);
        return Ok(());
    };
    let selections = parse_selections(&raw)?;
    let scorer = DrillScorer::new(SpanComparator::new(config.spans))
        .with_telemetry(telemetry.clone());
    let score = scorer.score_inference(&passage, &questions, &selections);
    let difficulty = questions
        .iter()
        .find_map(|question| question.difficulty)
        .map(|difficulty| difficulty.to_string());
    let record = SessionRecord::from_inference(
        &passage.id,
        &score,
        SessionMetadata {
            duration_secs: args.duration_secs,
            difficulty,
        },
    )?;
    telemetry.publish(record.to_event(EVENT_SOURCE)?)?;
    println!(
        "{}",
        serde_json::to_string_pretty(&json!({
            "questions": questions,
            "score": score,
            "session_id": record.id,
        }))?
    );
    Ok(())
}

fn parse_span(raw: &str) -> Result<TextSpan> {
    let (start, end) = raw
        .trim()
        .split_once(':')
        .ok_or_else(|| anyhow!("span `{raw}` is not start:end"))?;
    let start = start.parse().with_context(|| format!("span start in `{raw}`"))?;
    let end = end.parse().with_context(|| format!("span end in `{raw}`"))?;
    Ok(TextSpan::new(start, end))
}

fn check_answer_spans(spans: &[TextSpan], text_len: usize) -> Result<()> {
    for span in spans {
        TextSpan::checked(span.start, span.end, text_len)
            .with_context(|| format!("answer span {span}"))?;
    }
    Ok(())
}

fn parse_spans(raw: &str) -> Result<Vec<TextSpan>> {
    raw.split(',')
        .filter(|part| !part.trim().is_empty())
        .map(parse_span)
        .collect()
}

fn parse_answers(raw: &str) -> Result<BTreeMap<usize, Verdict>> {
    let mut answers = BTreeMap::new();
    for (idx, part) in raw.split(',').enumerate() {
        if part.trim().is_empty() {
            continue;
        }
        let verdict = part.parse::<Verdict>().map_err(|err| anyhow!(err))?;
        answers.insert(idx, verdict);
    }
    Ok(answers)
}

fn parse_selections(raw: &str) -> Result<BTreeMap<usize, TextSpan>> {
    let mut selections = BTreeMap::new();
    for part in raw.split(',').filter(|part| !part.trim().is_empty()) {
        let Some((idx, span)) = part.split_once('=') else {
            bail!("selection `{part}` is not position=start:end");
        };
        let idx: usize = idx
            .trim()
            .parse()
            .with_context(|| format!("selection position in `{part}`"))?;
        selections.insert(idx, parse_span(span)?);
    }
    Ok(selections)
}
