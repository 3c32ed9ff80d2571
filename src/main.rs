use std::io::{BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use docchat::{
    AnthropicClient, ChatSession, CompletionService, DocumentDecoder, ExtractionResult,
    LopdfDecoder, MockCompletion, SessionConfig,
};

#[derive(Parser)]
#[command(name = "docchat")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Use a scripted completion service instead of the Anthropic API.
    #[arg(long, global = true)]
    mock: bool,

    /// Override the model identifier (default: ANTHROPIC_MODEL or built-in).
    #[arg(long, global = true)]
    model: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract the text of a PDF and print it.
    Extract { path: PathBuf },

    /// Ask one question, optionally grounded in a PDF.
    Ask {
        question: String,

        #[arg(short, long)]
        file: Option<PathBuf>,
    },

    /// Interactive chat, optionally grounded in a PDF.
    Chat {
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let mut config = SessionConfig::from_env();
    if let Some(model) = cli.model.clone() {
        config.model = model;
    }

    let decoder: Arc<dyn DocumentDecoder> = Arc::new(LopdfDecoder::new());
    let completion: Arc<dyn CompletionService> = if cli.mock {
        info!("Using mock completion service");
        Arc::new(MockCompletion::replying("[mock reply]"))
    } else {
        Arc::new(AnthropicClient::from_env())
    };

    let session = Arc::new(ChatSession::new(decoder, completion, config));

    // Ctrl-C cancels whichever pipeline is in flight instead of killing the
    // process outright.
    {
        let session = session.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                session.abort_parse();
                session.cancel_ask();
            }
        });
    }

    match cli.command {
        Commands::Extract { path } => {
            let result = parse_with_progress(&session, &path).await?;
            println!("{}", result.full_text());
        }

        Commands::Ask { question, file } => {
            ensure_can_submit(&session)?;
            if let Some(path) = file {
                parse_with_progress(&session, &path).await?;
            }
            let answer = session.send(&question).await?;
            println!("{answer}");
        }

        Commands::Chat { file } => {
            ensure_can_submit(&session)?;
            if let Some(path) = file {
                let result = parse_with_progress(&session, &path).await?;
                println!(
                    "Attached document: {} pages, {} chars",
                    result.page_count(),
                    result.char_count()
                );
            }
            run_chat_loop(&session).await?;
        }
    }

    Ok(())
}

fn ensure_can_submit(session: &ChatSession) -> Result<()> {
    if !session.can_submit() {
        anyhow::bail!("No API key configured. Set ANTHROPIC_API_KEY or pass --mock.");
    }
    Ok(())
}

/// Run extraction while rendering its progress from the session state, the
/// way a UI layer would.
async fn parse_with_progress(
    session: &Arc<ChatSession>,
    path: &PathBuf,
) -> Result<ExtractionResult> {
    let bytes = tokio::fs::read(path).await?;
    info!("Parsing {:?} ({} bytes)", path, bytes.len());

    let progress_bar = ProgressBar::new(0);
    progress_bar.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} pages")
            .expect("Invalid progress bar template")
            .progress_chars("#>-"),
    );

    let task = {
        let session = session.clone();
        tokio::spawn(async move { session.select_document(&bytes).await })
    };

    while !task.is_finished() {
        if let Some(progress) = session.progress() {
            progress_bar.set_length(progress.total as u64);
            progress_bar.set_position(progress.current as u64);
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    progress_bar.finish_and_clear();

    let result = task
        .await
        .map_err(|e| anyhow::anyhow!("extraction task panicked: {e}"))??;
    info!(
        "Parsed {} pages ({} chars)",
        result.page_count(),
        result.char_count()
    );
    Ok(result)
}

async fn run_chat_loop(session: &Arc<ChatSession>) -> Result<()> {
    let stdin = std::io::stdin();
    let mut lines = stdin.lock().lines();

    loop {
        print!("you> ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next() else {
            break;
        };
        let text = line?;
        let trimmed = text.trim();
        if trimmed.is_empty() {
            continue;
        }
        if trimmed == "exit" || trimmed == "quit" {
            break;
        }

        match session.send(trimmed).await {
            Ok(answer) => println!("assistant> {answer}"),
            Err(e) if e.is_cancelled() => println!("(cancelled)"),
            Err(e) => eprintln!("error: {e}"),
        }
    }

    Ok(())
}
