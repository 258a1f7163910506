use std::fs::{self, File};
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use talkbuddy_core::{
    AnalysisOutcome, ChatBackend, CommandSynthesizer, Config, HttpBackend, LocalStorage,
    NoSpeechRecognizer, NoSpeechSynthesizer, SessionStore, SpeechSynthesizer, Tutor,
};

mod app;
mod handler;
mod tui;
mod ui;

use app::App;

#[derive(Parser)]
#[command(name = "talkbuddy")]
#[command(version, about = "Practice conversational English with an AI tutor")]
struct Cli {
    /// Tutor backend base URL (overrides the config file)
    #[arg(long, global = true)]
    backend_url: Option<String>,

    /// Start with spoken replies turned off
    #[arg(long, global = true)]
    no_voice: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Open the interactive chat (default)
    Chat,
    /// Print the analysis of the current conversation
    Analyze,
    /// Show or reset the stored session id
    Session {
        /// Forget the session id so the next message starts a new conversation
        #[arg(long)]
        reset: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let command = cli.command.unwrap_or(Commands::Chat);
    let interactive = matches!(command, Commands::Chat);

    // The terminal belongs to the TUI, so interactive logs go to a file
    init_logging(interactive);

    let config = Config::load().unwrap_or_else(|e| {
        tracing::warn!("Failed to load config, using defaults: {}", e);
        Config::new()
    });

    match command {
        Commands::Chat => {
            let tutor = build_tutor(&cli.backend_url, cli.no_voice, &config)?;
            run_tui(tutor).await
        }
        Commands::Analyze => {
            let tutor = build_tutor(&cli.backend_url, true, &config)?;
            print_analysis(&tutor).await;
            Ok(())
        }
        Commands::Session { reset } => {
            let sessions = SessionStore::new(LocalStorage::open_default()?);
            if reset {
                sessions.reset()?;
                println!("Session reset. Your next message starts a new conversation.");
            } else {
                match sessions.session_id()? {
                    Some(id) => println!("{}", id),
                    None => println!("No session yet."),
                }
            }
            Ok(())
        }
    }
}

fn init_logging(interactive: bool) {
    if interactive {
        let Some(dir) = dirs::data_local_dir().map(|d| d.join("talkbuddy")) else {
            return;
        };
        if fs::create_dir_all(&dir).is_err() {
            return;
        }
        let Ok(file) = File::create(dir.join("talkbuddy.log")) else {
            return;
        };
        tracing_subscriber::fmt()
            .with_env_filter(
                EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
            )
            .with_writer(Mutex::new(file))
            .with_ansi(false)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(
                EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
            )
            .with_writer(std::io::stderr)
            .init();
    }
}

fn build_tutor(backend_url: &Option<String>, no_voice: bool, config: &Config) -> Result<Tutor> {
    let url = backend_url.as_deref().unwrap_or(&config.backend_url);
    let backend: Arc<dyn ChatBackend> = match config.request_timeout() {
        Some(timeout) => Arc::new(HttpBackend::with_timeout(url, timeout)?),
        None => Arc::new(HttpBackend::new(url)),
    };

    let synthesizer: Arc<dyn SpeechSynthesizer> = match &config.speech_command {
        Some(program) => Arc::new(CommandSynthesizer::new(program)),
        None => match CommandSynthesizer::detect() {
            Some(synth) => Arc::new(synth),
            None => Arc::new(NoSpeechSynthesizer),
        },
    };

    let storage = LocalStorage::open_default().context("Could not open local storage")?;
    let tutor = Tutor::new(backend, SessionStore::new(storage), synthesizer)
        .with_timing(config.reply_timing());

    if no_voice || !config.voice_enabled {
        tutor.toggle_voice(false);
    }

    tracing::info!("Using tutor backend at {}", url);
    Ok(tutor)
}

async fn run_tui(tutor: Tutor) -> Result<()> {
    tui::install_panic_hook();
    let mut terminal = tui::init()?;

    let mut events = tui::EventHandler::new(tutor.store().subscribe());
    let mut app = App::new(tutor, Box::new(NoSpeechRecognizer));
    app.start();

    let result = async {
        while !app.should_quit {
            terminal.draw(|frame| ui::render(&mut app, frame))?;

            if let Some(event) = events.next().await {
                handler::handle_event(&mut app, event).await?;
            }
        }
        Ok::<(), anyhow::Error>(())
    }
    .await;

    tui::restore()?;
    result
}

async fn print_analysis(tutor: &Tutor) {
    match tutor.analyze().await {
        AnalysisOutcome::Loaded(report) => {
            let sections = [
                ("Mistakes", &report.mistakes),
                ("Suggestions", &report.suggestions),
                ("Vocabulary Tips", &report.vocab_tips),
            ];
            for (title, entries) in sections {
                println!("{}", title);
                if entries.is_empty() {
                    println!("  (none)");
                }
                for entry in entries {
                    println!("  - {}", entry);
                }
                println!();
            }
        }
        AnalysisOutcome::Failed => {
            eprintln!("{}", AnalysisOutcome::FAILURE_NOTICE);
        }
    }
}
