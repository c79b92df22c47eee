use anyhow::{bail, Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use studyquiz::clients::{ClientType, FlexibleClient};
use studyquiz::extract::{ensure_extractable, PlainTextExtractor, TextExtractor};
use studyquiz::interceptors::FileInterceptor;
use studyquiz::{FailurePolicy, QuizConfig, QuizPipeline};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "Generate a multiple choice quiz from study material", long_about = None)]
#[command(after_help = "ENVIRONMENT VARIABLES:
    ANTHROPIC_API_KEY     API key for the Claude client
    OPENAI_API_KEY        API key for the OpenAI client
    QUIZ_CLIENT           claude | openai | mock [default: auto-detect]
    QUIZ_MODEL            Model identifier override
    QUIZ_MAX_CHARS        Chunk size bound in characters [default: 6000]
    QUIZ_TIMEOUT_SECS     Per-call timeout [default: 120]
    QUIZ_FAILURE_POLICY   fail-fast | best-effort [default: fail-fast]
    RUST_LOG              Log filter [default: info]

EXAMPLES:
    quizgen notes.txt                          # 5 medium questions
    quizgen notes.txt -n 10 -d hard            # 10 hard questions
    quizgen slides.pdf --client openai         # needs the `pdf` feature
    quizgen notes.txt --best-effort -o quiz.json")]
struct Args {
    /// Study material: a UTF-8 text file, or a PDF with the `pdf` feature
    input: PathBuf,

    /// Number of questions to generate
    #[arg(short = 'n', long, default_value_t = 5)]
    questions: usize,

    /// Difficulty label passed to the model
    #[arg(short, long, default_value = "medium")]
    difficulty: String,

    /// Generation client: claude, openai, mock [default: auto-detect]
    #[arg(short, long)]
    client: Option<String>,

    /// Model identifier override
    #[arg(short, long)]
    model: Option<String>,

    /// Chunk size bound in characters
    #[arg(long)]
    max_chars: Option<usize>,

    /// Keep going when a chunk fails and return what was gathered
    #[arg(long)]
    best_effort: bool,

    /// Write prompt/response transcripts to this directory
    #[arg(long)]
    transcripts: Option<PathBuf>,

    /// Write the quiz JSON here instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,
}

fn extractor_for(path: &std::path::Path) -> Result<Box<dyn TextExtractor>> {
    let is_pdf = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"));
    if !is_pdf {
        return Ok(Box::new(PlainTextExtractor));
    }
    #[cfg(feature = "pdf")]
    return Ok(Box::new(studyquiz::extract::PdfExtractor));
    #[cfg(not(feature = "pdf"))]
    bail!("PDF input requires building with the `pdf` feature");
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let mut config = QuizConfig::from_env()?;
    if let Some(client) = args.client {
        config.client = Some(client);
    }
    if let Some(model) = args.model {
        config.model = Some(model);
    }
    if let Some(max_chars) = args.max_chars {
        if max_chars == 0 {
            bail!("--max-chars must be positive");
        }
        config.max_chars = max_chars;
    }
    if args.best_effort {
        config.failure_policy = FailurePolicy::BestEffort;
    }
    if args.transcripts.is_some() {
        config.transcript_dir = args.transcripts;
    }

    let client_type = ClientType::resolve(config.client.as_deref()).map_err(anyhow::Error::msg)?;
    if client_type == ClientType::Mock {
        warn!("No API key found or mock selected: the quiz will be empty");
    }
    let client = FlexibleClient::for_type(&client_type, config.model.as_deref());

    let bytes = std::fs::read(&args.input)
        .with_context(|| format!("Failed to read {}", args.input.display()))?;
    let extracted = extractor_for(&args.input)?.extract(&bytes)?;
    let text = ensure_extractable(&extracted, config.min_text_chars)?;

    let mut pipeline = QuizPipeline::new(client, config.clone());
    if let Some(dir) = &config.transcript_dir {
        pipeline = pipeline.with_interceptor(Arc::new(FileInterceptor::new(dir.clone())));
    }

    let report = pipeline.generate_detailed(text, args.questions, &args.difficulty).await?;
    for failed in report.failures() {
        if let Some(err) = &failed.error {
            warn!(chunk = failed.index, error = %err, "Chunk skipped");
        }
    }
    info!(
        questions = report.quiz.len(),
        requested = args.questions,
        chunks = report.chunks.len(),
        "Quiz ready"
    );

    let json = serde_json::to_string_pretty(&report.quiz)?;
    match args.output {
        Some(path) => std::fs::write(&path, json + "\n")
            .with_context(|| format!("Failed to write {}", path.display()))?,
        None => println!("{json}"),
    }

    Ok(())
}
