use anyhow::{Context, Result};
use clap::Parser;
use interview_core::Command;
use interview_core::question_bank::QuestionBank;
use interview_core::runtime::{PresentationEvent, SpeechRuntime};
use interview_core::session::InterviewSession;
use interview_core::speech::{
    CannedTranscriber, GatewaySpeech, GatewayTranscriber, PlaceholderSpeech, SpeechOutput, Transcriber,
};
use interview_core::viseme::VisemeConfig;
use interview_service::bank_loader;
use interview_service::config::{COMMAND_CHANNEL_SIZE, Config, PRESENTATION_CHANNEL_SIZE};
use interview_service::console::{self, Console};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::BufReader;
use tracing_subscriber::fmt::time::ChronoLocal;

#[derive(Parser)]
#[command(version, about = "Runs a mock job interview on the terminal")]
struct Cli {
    /// Job profile to interview for; a " - " suffix is ignored
    #[arg(long, default_value = "Software Engineer - Full Stack")]
    profile: String,

    /// Interview language code (en, hi, es, fr, de)
    #[arg(long, default_value = "en")]
    language: String,

    /// Directory of <profile>.json question files; overrides INTERVIEW_BANK_DIR
    #[arg(long)]
    bank_dir: Option<PathBuf>,

    /// Ignore the speech gateway and use placeholder speech and canned transcripts
    #[arg(long)]
    offline: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // --- 1. Load Configuration ---
    let config = Config::from_env().context("Failed to load application configuration")?;

    // --- 2. Initialize Logging ---
    tracing_subscriber::fmt()
        .with_max_level(config.log_level)
        .with_timer(ChronoLocal::rfc_3339())
        .with_writer(std::io::stderr)
        .init();

    tracing::info!("Configuration loaded successfully. Starting interview service...");

    // --- 3. Parse Command-Line Arguments ---
    let args = Cli::parse();

    // --- 4. Load Question Bank ---
    let bank = match args.bank_dir.as_ref().or(config.bank_dir.as_ref()) {
        Some(dir) => bank_loader::load_bank(dir, QuestionBank::builtin())
            .with_context(|| format!("Failed to load question bank from {}", dir.display()))?,
        None => QuestionBank::builtin(),
    };
    tracing::info!("Question bank ready with {} profiles.", bank.profiles().count());

    // --- 5. Initialize Speech Collaborators ---
    let seed = config.session.seed.unwrap_or_default();
    let (speech, transcriber): (Arc<dyn SpeechOutput>, Arc<dyn Transcriber>) =
        match config.gateway_url.as_deref() {
            Some(url) if !args.offline => {
                tracing::info!("Using speech gateway at {}", url);
                (
                    Arc::new(GatewaySpeech::new(url, config.voice_id.clone(), VisemeConfig::default(), seed)),
                    Arc::new(GatewayTranscriber::new(url)),
                )
            }
            _ => {
                tracing::info!("Running offline with placeholder speech and canned transcripts");
                (
                    Arc::new(PlaceholderSpeech::new(VisemeConfig::default(), seed)),
                    Arc::new(CannedTranscriber::new()),
                )
            }
        };

    // --- 6. Application Setup ---
    // The session only emits commands; the runtime task performs the speech side effects.
    let (command_tx, command_rx) = tokio::sync::mpsc::channel::<Command>(COMMAND_CHANNEL_SIZE);
    let (events_tx, events_rx) = tokio::sync::mpsc::channel::<PresentationEvent>(PRESENTATION_CHANNEL_SIZE);

    let runtime = SpeechRuntime::new(speech, events_tx.clone(), config.speech_timeout);
    let runtime_handle = tokio::spawn(runtime.run(command_rx));
    let presenter_handle = tokio::spawn(console::present(events_rx));

    let mut session = InterviewSession::new(config.session.clone(), command_tx);
    session
        .select_language(&args.language)
        .context("Invalid --language")?;
    session.select_profile(&args.profile).context("Invalid --profile")?;

    let mut console = Console::new(session, bank, transcriber, config.transcribe_timeout)
        .with_presentation(events_tx);
    let stdin = BufReader::new(tokio::io::stdin());
    let mut stdout = tokio::io::stdout();

    tokio::select! {
        result = console.run(stdin, &mut stdout) => result?,
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Received Ctrl-C, shutting down...");
        }
    }

    // Dropping the console closes the command channel, which stops the runtime and presenter in turn.
    drop(console);
    if let Err(e) = runtime_handle.await {
        tracing::error!("Speech runtime task failed: {:?}", e);
    }
    if let Err(e) = presenter_handle.await {
        tracing::error!("Presenter task failed: {:?}", e);
    }
    tracing::info!("Shutting down...");
    Ok(())
}
