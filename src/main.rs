//! pdf-chat CLI
//!
//! Commands:
//!   serve - Start the web UI (default)
//!   ask - Ask questions about a PDF from the terminal
//!   extract - Print the text extracted from a PDF
//!   info - Show model, binding and config info
//!   init - Write a default config file

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use pdf_chat::server::{run_server, AppState};
use pdf_chat::{ChatSession, ClientFactory, Config, GeminiClientFactory, ModelBinding, PromptContract};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "pdf-chat")]
#[command(about = "Chat with a PDF through Gemini")]
#[command(version)]
struct Cli {
    /// Reasoning contract file (overrides the config)
    #[arg(short, long, global = true)]
    contract: Option<PathBuf>,

    /// Gemini model (overrides the config)
    #[arg(short, long, global = true)]
    model: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the web UI
    Serve {
        /// Port to listen on
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Ask one or more questions about a PDF
    Ask {
        /// PDF to load
        #[arg(long)]
        pdf: PathBuf,

        /// Gemini API key
        #[arg(long)]
        key: String,

        /// Print the raw model replies after the answers
        #[arg(long)]
        raw: bool,

        /// Questions, asked in order within one session
        #[arg(required = true)]
        questions: Vec<String>,
    },

    /// Print the text extracted from a PDF
    Extract {
        /// PDF to read
        path: PathBuf,
    },

    /// Show model, binding and config info
    Info,

    /// Write a default config file
    Init {
        /// Overwrite an existing config
        #[arg(long)]
        force: bool,
    },
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("pdf_chat=info,tower_http=info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn load_contract(config: &Config) -> Result<Arc<PromptContract>> {
    let contract = PromptContract::load(&config.contract_path)
        .context("The reasoning contract is required to start")?;
    Ok(Arc::new(contract))
}

fn client_factory(config: &Config) -> GeminiClientFactory {
    GeminiClientFactory::new(ModelBinding::probe(), config.model.clone(), config.api_base.clone())
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let mut config = Config::load_or_default()?;
    if let Some(path) = cli.contract {
        config.contract_path = path;
    }
    if let Some(model) = cli.model {
        config.model = model;
    }

    match cli.command.unwrap_or(Commands::Serve { port: None }) {
        Commands::Serve { port } => {
            if let Some(port) = port {
                config.port = port;
            }
            let contract = load_contract(&config)?;
            let factory = Arc::new(client_factory(&config));
            if factory.binding() == ModelBinding::Unavailable {
                tracing::warn!("No Gemini binding compiled in; answers will explain how to enable one");
            }

            println!("Starting server on http://localhost:{}...", config.port);
            let state = AppState::with_idle_timeout(contract, factory, config.session_idle_timeout());
            run_server(&config, state).await?;
        }

        Commands::Ask { pdf, key, raw, questions } => {
            let contract = load_contract(&config)?;
            let factory = client_factory(&config);
            let bytes = std::fs::read(&pdf).with_context(|| format!("Failed to read {}", pdf.display()))?;

            let mut session = ChatSession::new(contract);
            let status = session.setup(Some(bytes), &key, &factory).await;
            println!("{}\n", status.dimmed());

            let mut last = None;
            for question in &questions {
                let outcome = session.ask(question).await;
                if let Some(turn) = outcome.history.last() {
                    println!("{} {}", "Q:".cyan().bold(), turn.question);
                    println!("{} {}\n", "A:".green().bold(), turn.answer);
                }
                last = Some(outcome);
            }

            if raw {
                let stream = last.map(|o| o.raw_stream).unwrap_or_default();
                println!("{}", "Raw replies".bold());
                println!("{}", if stream.is_empty() { session.fallback_log_view() } else { stream });
            }
        }

        Commands::Extract { path } => {
            println!("{}", pdf_chat::pdf::extract_file(&path));
        }

        Commands::Info => {
            let factory = client_factory(&config);
            println!("pdf-chat - Chat with a PDF through Gemini\n");
            println!("Model:       {}", factory.model_id());
            println!("Binding:     {}", factory.binding().name());
            println!(
                "PDF support: {}",
                if pdf_chat::pdf::pdf_supported() { "yes".green() } else { "no".red() }
            );
            println!("Contract:    {}", config.contract_path.display());
            match Config::path() {
                Ok(path) if path.exists() => println!("Config:      {}", path.display()),
                Ok(path) => println!("Config:      {} (not created, using defaults)", path.display()),
                Err(e) => println!("Config:      unavailable ({})", e),
            }
        }

        Commands::Init { force } => {
            let path = Config::path()?;
            if Config::exists() && !force {
                println!("Config already exists at {}. Use --force to overwrite.", path.display());
            } else {
                Config::default().save()?;
                println!("{} Wrote default config to {}", "✓".green(), path.display());
            }
        }
    }

    Ok(())
}
