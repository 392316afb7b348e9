// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! PdfScope: PDF text and image analysis
//!
//! Command-line front end over the analysis session: per-page extraction,
//! image descriptions, question answering and an interactive shell.

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, info, warn};

use pdfscope::config::AppConfig;
use pdfscope::llm::{ChatClient, ProviderStatus};
use pdfscope::loader::{export_png, DocumentLoader};
use pdfscope::model::{AnswerRequest, AnswerStrategy, Document, Page};
use pdfscope::report::{self, OutputFormat};
use pdfscope::session::{Operation, Services, Session, SessionEvent};
use pdfscope::{PdfScopeError, Result};

/// PdfScope CLI - PDF text and image analysis
#[derive(Parser, Debug)]
#[command(name = "pdfscope")]
#[command(author = "Jonathan D. A. Jewell <hyperpolymath>")]
#[command(version)]
#[command(about = "Analyze PDF text and images with hosted LLMs and a rule-based fallback", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Path to configuration file (JSON format)
    #[arg(short, long, default_value = "config.json", global = true)]
    config: PathBuf,

    /// Enable verbose logging (debug level)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Enable trace logging (most verbose)
    #[arg(long, global = true)]
    trace: bool,

    /// Output format for results
    #[arg(long, global = true, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,

    /// Suppress non-essential output (quiet mode)
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Extract entities, keyword categories and events from every page
    Analyze {
        /// PDF file to analyze
        pdf: PathBuf,

        /// Use the rule-based analyzer only
        #[arg(long)]
        heuristic: bool,

        /// Show only this page (1-based)
        #[arg(short, long)]
        page: Option<u32>,
    },

    /// Extract embedded images and describe them with a vision model
    Images {
        /// PDF file to read
        pdf: PathBuf,

        /// Vision model (defaults to the first configured one)
        #[arg(short, long)]
        model: Option<String>,

        /// List images without calling the vision model
        #[arg(long)]
        extract_only: bool,

        /// Write every image as PNG into this directory
        #[arg(long)]
        save: Option<PathBuf>,
    },

    /// Ask a question about a PDF
    Ask {
        /// PDF file to read
        pdf: PathBuf,

        /// The question
        question: String,

        /// hosted (alias smart) or heuristic (alias fast)
        #[arg(short, long)]
        strategy: Option<AnswerStrategy>,

        /// Describe images first and include them in the hosted prompt
        #[arg(long)]
        with_images: bool,
    },

    /// Interactive session over one PDF
    Shell {
        /// PDF file to open
        pdf: PathBuf,
    },

    /// Show hosted provider status
    Status,

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigCommands,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigCommands {
    /// Show current configuration
    Show,

    /// Generate default configuration file
    Generate {
        /// Output file path
        #[arg(short, long, default_value = "config.json")]
        output: PathBuf,
    },

    /// Validate configuration file
    Validate,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.trace {
        "trace"
    } else if cli.verbose {
        "debug"
    } else if cli.quiet {
        "warn"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    if !cli.quiet {
        info!("PdfScope v{}", env!("CARGO_PKG_VERSION"));
    }

    // Load configuration
    let config = AppConfig::load(&cli.config)?;

    match cli.command {
        Commands::Analyze { pdf, heuristic, page } => {
            run_analyze(config, pdf, heuristic, page, cli.format).await
        }
        Commands::Images { pdf, model, extract_only, save } => {
            run_images(config, pdf, model, extract_only, save, cli.format).await
        }
        Commands::Ask { pdf, question, strategy, with_images } => {
            run_ask(config, pdf, question, strategy, with_images, cli.format).await
        }
        Commands::Shell { pdf } => run_shell(config, pdf).await,
        Commands::Status => run_status(config).await,
        Commands::Config { action } => run_config_command(config, action, &cli.config),
    }
}

/// Parse the PDF off the async runtime
async fn load_document(pdf: PathBuf, with_images: bool) -> Result<Document> {
    tokio::task::spawn_blocking(move || {
        let loader = if with_images {
            DocumentLoader::new()
        } else {
            DocumentLoader::new().text_only()
        };
        loader.load(&pdf)
    })
    .await
    .map_err(|_| PdfScopeError::WorkerGone)?
}

/// Log progress events; everything else is left to the caller
fn log_progress(event: &SessionEvent) {
    if let SessionEvent::Progress { operation, done, total, label } = event {
        debug!("{} progress {}/{}", operation, done, total);
        info!("{}: {}", operation, label);
    }
}

/// Run per-page analysis and print the result
async fn run_analyze(
    config: AppConfig,
    pdf: PathBuf,
    heuristic: bool,
    page: Option<u32>,
    format: OutputFormat,
) -> Result<()> {
    let document = load_document(pdf, false).await?;

    if let Some(n) = page {
        if document.page(n).is_none() {
            return Err(PdfScopeError::Pdf(format!(
                "Page {} out of range (document has {} pages)",
                n,
                document.pages.len()
            )));
        }
    }

    let services = if heuristic {
        Services::heuristic(&config)
    } else {
        Services::from_config(&config)?
    };

    let mut session = Session::new(document, services, &config);
    session.start_analysis()?;
    session.run_until_idle(log_progress).await;

    let doc = session.document();
    let pages: Vec<&Page> = match page {
        Some(n) => doc.page(n).into_iter().collect(),
        None => doc.pages.iter().collect(),
    };

    println!("{}", report::render_pages(doc, &pages, format)?);
    if format == OutputFormat::Text {
        println!("\n{}", report::analysis_summary(doc));
    }

    Ok(())
}

/// Extract images, optionally save them, and describe them
async fn run_images(
    config: AppConfig,
    pdf: PathBuf,
    model: Option<String>,
    extract_only: bool,
    save: Option<PathBuf>,
    format: OutputFormat,
) -> Result<()> {
    let document = load_document(pdf, true).await?;

    if let Some(dir) = &save {
        let written = export_png(&document.images, dir)?;
        info!("Saved {} images to {:?}", written.len(), dir);
    }

    let session = if extract_only || document.images.is_empty() {
        Session::new(document, Services::heuristic(&config), &config)
    } else {
        let mut session = Session::new(document, Services::from_config(&config)?, &config);
        if let Some(model) = model {
            if !config.models.vision.contains(&model) {
                warn!("Vision model '{}' is not in the configured list", model);
            }
            session.set_vision_model(model);
        }
        session.start_image_analysis()?;
        session.run_until_idle(|event| {
            log_progress(event);
            if let SessionEvent::ImageAnalyzed { index, description } = event {
                debug!("Image {} described ({} chars)", index + 1, description.len());
            }
        })
        .await;
        session
    };

    println!(
        "{}",
        report::render_images(session.document(), session.vision_model(), format)?
    );
    Ok(())
}

/// Answer one question, analyzing pages (and optionally images) first
async fn run_ask(
    config: AppConfig,
    pdf: PathBuf,
    question: String,
    strategy: Option<AnswerStrategy>,
    with_images: bool,
    format: OutputFormat,
) -> Result<()> {
    let strategy = strategy.unwrap_or(config.answer.strategy);
    let document = load_document(pdf, with_images).await?;

    let services = match strategy {
        AnswerStrategy::Heuristic => Services::heuristic(&config),
        AnswerStrategy::Hosted => Services::from_config(&config)?,
    };
    let mut session = Session::new(document, services, &config);

    session.start_analysis()?;
    if with_images && !session.document().images.is_empty() {
        match session.start_image_analysis() {
            Ok(()) => {}
            Err(PdfScopeError::MissingApiKey(provider)) => {
                warn!("{} API key not configured, answering without image descriptions", provider);
            }
            Err(e) => return Err(e),
        }
    }
    session.run_until_idle(log_progress).await;

    let mut request = AnswerRequest::new(question.as_str(), strategy);
    request.include_images = with_images;
    session.ask_with(request)?;

    let mut answer = String::new();
    session
        .run_until_idle(|event| {
            if let SessionEvent::Answered { answer: text, .. } = event {
                answer = text.clone();
            }
        })
        .await;

    println!("{}", report::render_answer(&question, strategy, &answer, format)?);
    Ok(())
}

/// A line typed into the interactive shell
#[derive(Debug, Clone, PartialEq)]
enum ShellCommand {
    Help,
    Analyze,
    Images,
    Model(String),
    Page(u32),
    Image(usize),
    Ask(String),
    Mode(AnswerStrategy),
    Status,
    Quit,
}

fn parse_shell_command(line: &str) -> std::result::Result<ShellCommand, String> {
    let line = line.trim();
    let (verb, rest) = match line.split_once(char::is_whitespace) {
        Some((verb, rest)) => (verb, rest.trim()),
        None => (line, ""),
    };

    match verb.to_lowercase().as_str() {
        "help" | "?" => Ok(ShellCommand::Help),
        "analyze" => Ok(ShellCommand::Analyze),
        "images" => Ok(ShellCommand::Images),
        "model" if !rest.is_empty() => Ok(ShellCommand::Model(rest.to_string())),
        "model" => Err("usage: model NAME".to_string()),
        "page" => one_based(rest, "page").map(ShellCommand::Page),
        "image" => one_based(rest, "image").map(ShellCommand::Image),
        "ask" if !rest.is_empty() => Ok(ShellCommand::Ask(rest.to_string())),
        "ask" => Err("Enter a question!".to_string()),
        "mode" => rest.parse().map(ShellCommand::Mode),
        "status" => Ok(ShellCommand::Status),
        "quit" | "exit" => Ok(ShellCommand::Quit),
        other => Err(format!("unknown command '{}', try 'help'", other)),
    }
}

fn one_based<T>(arg: &str, what: &str) -> std::result::Result<T, String>
where
    T: std::str::FromStr + PartialEq + From<u8>,
{
    arg.parse::<T>()
        .ok()
        .filter(|n| *n != T::from(0))
        .ok_or_else(|| format!("usage: {} N (N starts at 1)", what))
}

const SHELL_HELP: &str = "\
Commands:
  analyze            analyze every page
  images             describe every image
  model NAME         select the vision model
  page N             show the analysis of page N
  image N            show the description of image N
  ask QUESTION       answer a question
  mode hosted|heuristic
  status             show running operations
  quit";

/// Interactive loop multiplexing stdin and session events
async fn run_shell(config: AppConfig, pdf: PathBuf) -> Result<()> {
    let document = load_document(pdf.clone(), true).await?;
    let services = Services::from_config(&config)?;
    let mut session = Session::new(document, services, &config);

    println!(
        "Opened {:?}: {} pages, {} images. Type 'help' for commands.",
        pdf,
        session.document().pages.len(),
        session.document().images.len()
    );

    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                if line.trim().is_empty() {
                    continue;
                }
                match parse_shell_command(&line) {
                    Ok(ShellCommand::Quit) => break,
                    Ok(command) => handle_shell_command(&mut session, &config, command),
                    Err(message) => println!("{}", message),
                }
            }
            Some(event) = session.next_event(), if !session.is_idle() => {
                print_shell_event(&session, &event);
            }
        }
    }

    if !session.is_idle() {
        info!("Exiting with operations still running");
    }
    Ok(())
}

fn handle_shell_command(session: &mut Session, config: &AppConfig, command: ShellCommand) {
    let started = match command {
        ShellCommand::Help => {
            println!("{}", SHELL_HELP);
            Ok(())
        }
        ShellCommand::Analyze => session.start_analysis(),
        ShellCommand::Images if session.document().images.is_empty() => {
            println!("No images found in document.");
            Ok(())
        }
        ShellCommand::Images => session.start_image_analysis(),
        ShellCommand::Model(model) => {
            if !config.models.vision.contains(&model) {
                println!("Note: '{}' is not in the configured model list", model);
            }
            session.set_vision_model(model);
            Ok(())
        }
        ShellCommand::Page(n) => {
            let doc = session.document();
            match doc.page(n) {
                Some(page) => println!("{}", report::page_view(page, doc.pages.len())),
                None => println!("No page {} (document has {} pages)", n, doc.pages.len()),
            }
            Ok(())
        }
        ShellCommand::Image(n) => {
            let doc = session.document();
            match doc.images.get(n - 1) {
                Some(image) => println!(
                    "{}",
                    report::image_view(image, n, doc.images.len(), session.vision_model())
                ),
                None => println!("No image {} (document has {} images)", n, doc.images.len()),
            }
            Ok(())
        }
        ShellCommand::Ask(question) => {
            if !session.document().is_analyzed() {
                println!("Note: pages are not analyzed yet; run 'analyze' for better answers");
            }
            session.ask(question)
        }
        ShellCommand::Mode(strategy) => {
            session.set_strategy(strategy);
            println!("Answer mode: {}", strategy);
            Ok(())
        }
        ShellCommand::Status => {
            for operation in [Operation::TextAnalysis, Operation::ImageAnalysis, Operation::Question] {
                let state = if session.is_busy(operation) { "running" } else { "idle" };
                println!("{}: {}", operation, state);
            }
            println!("Answer mode: {}", session.strategy());
            println!("Vision model: {}", session.vision_model());
            Ok(())
        }
        ShellCommand::Quit => Ok(()),
    };

    if let Err(e) = started {
        println!("{}", e);
    }
}

fn print_shell_event(session: &Session, event: &SessionEvent) {
    match event {
        SessionEvent::Progress { .. } => log_progress(event),
        SessionEvent::PageAnalyzed { page, .. } => debug!("Page {} analyzed", page),
        SessionEvent::AnalysisFinished { .. } => {
            println!("{}", report::analysis_summary(session.document()));
        }
        SessionEvent::ImageAnalyzed { index, .. } => {
            println!("Image {}/{} analyzed", index + 1, session.document().images.len());
        }
        SessionEvent::VisionFinished { described, total } => {
            println!("Image analysis complete: {} of {} described", described, total);
        }
        SessionEvent::Answered { answer, .. } => println!("{}", answer),
        SessionEvent::Failed { operation, reason } => println!("{} failed: {}", operation, reason),
    }
}

/// Probe each hosted provider
async fn run_status(config: AppConfig) -> Result<()> {
    println!("PdfScope v{} Status", env!("CARGO_PKG_VERSION"));
    println!("======================");

    let groq = ChatClient::groq(&config)?;
    let groq_status = groq.probe(&config.models.analysis).await;
    println!("Groq ({}): {}", groq.base_url(), groq_status);

    let openrouter = ChatClient::openrouter(&config)?;
    let vision_status = match config.models.default_vision() {
        Some(model) => openrouter.probe(model).await,
        None => ProviderStatus::Failed("no vision model configured".to_string()),
    };
    println!("OpenRouter ({}): {}", openrouter.base_url(), vision_status);

    println!("\nConfiguration:");
    println!("  Analysis model: {}", config.models.analysis);
    println!("  Answer models: {}", config.models.answer.join(", "));
    println!("  Vision models: {}", config.models.vision.join(", "));
    println!("  Answer strategy: {}", config.answer.strategy);

    Ok(())
}

/// Run config commands
fn run_config_command(config: AppConfig, action: ConfigCommands, config_path: &Path) -> Result<()> {
    match action {
        ConfigCommands::Show => {
            let json = serde_json::to_string_pretty(&config)?;
            println!("{}", json);
        }
        ConfigCommands::Generate { output } => {
            AppConfig::default().save(&output)?;
            println!("Generated config at {:?}", output);
        }
        ConfigCommands::Validate => {
            config.validate()?;
            println!("Configuration at {:?} is valid", config_path);
            println!("  Groq key: {}", configured(config.providers.groq.is_configured()));
            println!("  OpenRouter key: {}", configured(config.providers.openrouter.is_configured()));
            println!("  Default vision model: {}", config.models.default_vision().unwrap_or("-"));
        }
    }

    Ok(())
}

fn configured(set: bool) -> &'static str {
    if set {
        "set"
    } else {
        "not set"
    }
}
