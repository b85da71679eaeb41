//! Command-line front end
//!
//! Run with: cargo run -p inquiry-rag --features cli -- <command>

use anyhow::Context;
use clap::{Parser, Subcommand};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::time::Duration;
use uuid::Uuid;

use inquiry_rag::types::{Difficulty, QuestionType};
use inquiry_rag::{
    ChatRequest, ExplanationRequest, QuizRequest, RagConfig, RagEngine, SummaryLength,
    SummaryRequest,
};

#[derive(Parser)]
#[command(name = "inquiry-rag")]
#[command(about = "Ask questions, generate quizzes, and summarize documents")]
#[command(version)]
struct Cli {
    /// TOML configuration file
    #[arg(long, short, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Store a plain-text document and build its indices
    Ingest {
        /// Text file to ingest
        path: PathBuf,
        /// Title; defaults to the file name
        #[arg(long)]
        title: Option<String>,
    },
    /// Rebuild a stored document's chunks and indices
    Reprocess {
        document_id: Uuid,
    },
    /// List stored documents
    List,
    /// Ask a question
    Ask {
        question: String,
        /// Restrict retrieval to one document
        #[arg(long)]
        document: Option<Uuid>,
        /// Continue a stored conversation
        #[arg(long)]
        conversation: Option<Uuid>,
    },
    /// Generate and store a quiz
    Quiz {
        /// Free-form request, e.g. "3 easy questions about tuples"
        #[arg(required_unless_present = "conversation")]
        request: Option<String>,
        /// Take the request from the conversation's last user message
        #[arg(long, conflicts_with = "request")]
        conversation: Option<Uuid>,
        #[arg(long)]
        document: Option<Uuid>,
        #[arg(long)]
        count: Option<u32>,
        /// Comma-separated type codes (MC, MCM, TF, FB, SA)
        #[arg(long, value_delimiter = ',')]
        types: Vec<String>,
        /// easy, medium, or hard
        #[arg(long)]
        difficulty: Option<String>,
    },
    /// Summarize a document
    Summarize {
        document_id: Uuid,
        /// short, medium, or long
        #[arg(long)]
        length: Option<String>,
        /// Include a structured outline
        #[arg(long)]
        outline: bool,
    },
    /// Explain why a quiz answer is wrong
    Explain {
        question: String,
        /// The answer given
        #[arg(long)]
        wrong: String,
        /// The expected answer
        #[arg(long)]
        correct: String,
        #[arg(long)]
        document: Option<Uuid>,
    },
}

fn spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "inquiry_rag=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => RagConfig::from_toml_file(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => RagConfig::default(),
    };
    let engine = RagEngine::open(config)?;

    match cli.command {
        Commands::Ingest { path, title } => {
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("reading {}", path.display()))?;
            let title = title.unwrap_or_else(|| {
                path.file_stem()
                    .map(|s| s.to_string_lossy().into_owned())
                    .unwrap_or_else(|| "Untitled".to_string())
            });

            let pb = spinner(&format!("Ingesting {}", title));
            let (document, report) = engine.ingest(&title, &content).await?;
            pb.finish_and_clear();

            println!("{} {}", style("Ingested").green().bold(), document.id);
            println!(
                "  {} chunks, {} vectors, {} triples ({}ms)",
                report.chunks, report.vectors, report.triples, report.processing_time_ms
            );
        }
        Commands::Reprocess { document_id } => {
            let pb = spinner("Reprocessing");
            let report = engine.process(document_id, true).await?;
            pb.finish_and_clear();
            println!(
                "{} {}: {} chunks, {} triples",
                style("Reprocessed").green().bold(),
                document_id,
                report.chunks,
                report.triples
            );
        }
        Commands::List => {
            for doc in engine.store().list_documents()? {
                let status = if doc.processed {
                    style("processed").green()
                } else {
                    style("pending").yellow()
                };
                println!("{}  {}  {}", doc.id, status, doc.title);
            }
        }
        Commands::Ask {
            question,
            document,
            conversation,
        } => {
            let pb = spinner("Thinking");
            let response = match conversation {
                Some(id) => engine.chat_in_conversation(id, &question, document).await,
                None => {
                    let mut request = ChatRequest::new(question);
                    request.document_id = document;
                    engine.chat(request).await
                }
            };
            pb.finish_and_clear();

            if let Some(error) = &response.error {
                anyhow::bail!("{}", error);
            }
            if let Some(rewritten) = &response.rewritten_query {
                println!("{} {}", style("Interpreted as:").dim(), rewritten);
            }
            println!("{}", response.answer);
            for (i, source) in response.sources.iter().enumerate() {
                let preview: String = source.text.chars().take(80).collect();
                println!(
                    "  {} [{}] {:.3} {}",
                    style(format!("[{}]", i + 1)).cyan(),
                    source
                        .sources
                        .iter()
                        .map(|s| s.as_str())
                        .collect::<Vec<_>>()
                        .join("+"),
                    source.score,
                    preview
                );
            }
        }
        Commands::Quiz {
            request,
            conversation,
            document,
            count,
            types,
            difficulty,
        } => {
            let mut quiz_request = QuizRequest::new(request.unwrap_or_default());
            quiz_request.document_id = document;
            quiz_request.question_count = count;
            if !types.is_empty() {
                let parsed = types
                    .iter()
                    .map(|t| {
                        QuestionType::from_code(t)
                            .with_context(|| format!("unknown question type '{}'", t))
                    })
                    .collect::<anyhow::Result<Vec<_>>>()?;
                quiz_request.question_types = Some(parsed);
            }
            if let Some(raw) = difficulty {
                quiz_request.difficulty = Some(
                    Difficulty::parse(&raw)
                        .with_context(|| format!("unknown difficulty '{}'", raw))?,
                );
            }

            let pb = spinner("Generating quiz");
            let response = match conversation {
                Some(id) => {
                    let history = engine.store().get_turns(id)?;
                    engine
                        .generate_quiz_from_conversation(&history, quiz_request)
                        .await
                }
                None => engine.generate_quiz(quiz_request).await,
            };
            pb.finish_and_clear();

            if let Some(error) = &response.error {
                anyhow::bail!("{}", error);
            }
            let quiz = response.quiz.context("quiz missing from response")?;
            println!("{} ({})", style(&quiz.title).bold(), quiz.id);
            for question in &quiz.questions {
                println!(
                    "\n{}. [{}] {}",
                    question.order, question.question_type, question.content
                );
                for option in &question.options {
                    println!("   {}. {}", option.id, option.text);
                }
                println!(
                    "   {} {}",
                    style("Answer:").dim(),
                    question.correct_answer.values().join(", ")
                );
            }
        }
        Commands::Summarize {
            document_id,
            length,
            outline,
        } => {
            let mut request = SummaryRequest::for_document(document_id);
            if outline {
                request = request.with_outline(true);
            }
            if let Some(raw) = length {
                request = request.with_length(
                    SummaryLength::parse(&raw)
                        .with_context(|| format!("unknown summary length '{}'", raw))?,
                );
            }

            let pb = spinner("Summarizing");
            let response = engine.summarize(request).await;
            pb.finish_and_clear();

            if let Some(error) = &response.error {
                anyhow::bail!("{}", error);
            }
            if !response.outline.is_empty() {
                println!("{}", style("Outline").bold());
                for entry in &response.outline {
                    println!("  - {}", entry);
                }
                println!();
            }
            println!("{}", response.summary);
        }
        Commands::Explain {
            question,
            wrong,
            correct,
            document,
        } => {
            let mut request = ExplanationRequest::new(question, wrong, correct);
            request.document_id = document;

            let pb = spinner("Explaining");
            let response = engine.generate_explanation(request).await;
            pb.finish_and_clear();

            if let Some(error) = &response.error {
                anyhow::bail!("{}", error);
            }
            println!("{}", response.explanation);
        }
    }

    Ok(())
}
