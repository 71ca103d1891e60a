use anyhow::Result;
use clap::{Parser, Subcommand};
use riffloop::{
    art::ArtLoader,
    audio::{AudioOutput, AudioPlayer, NullOutput, RodioOutput},
    config::{self, Config},
    generation::{GenerationSnapshot, GenerationState, Generator, Session},
    history::HistoryStorage,
    prediction::ReplicateClient,
    server::{self, handlers::AppState},
};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(author, version, about = "Turn a text prompt into a looping track")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Generate one track and loop it until interrupted
    Play { prompt: String },
    /// Read prompts from stdin; each line replaces the current track
    Interactive,
    /// Accept prompts over HTTP
    Serve,
    /// Show recent generations
    History {
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },
}

/// Validates that a log level string is valid
fn validate_log_level(level: &str) -> Result<()> {
    level
        .parse::<tracing_subscriber::filter::LevelFilter>()
        .map_err(|_| {
            anyhow::anyhow!(
                "Invalid log level: '{}'. Valid levels: error, warn, info, debug, trace",
                level
            )
        })?;
    Ok(())
}

fn init_tracing(config: &Config) -> Result<()> {
    // Environment variable overrides config
    let log_level = std::env::var("RUST_LOG").unwrap_or_else(|_| config.logs.level.clone());
    validate_log_level(&log_level)?;

    let filter = match tracing_subscriber::EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => tracing_subscriber::EnvFilter::try_new(&log_level)?,
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .json()
        .init();

    info!("Log level: {}", log_level);
    Ok(())
}

fn open_output(config: &Config) -> Box<dyn AudioOutput> {
    match RodioOutput::open(config.audio.volume) {
        Ok(output) => Box::new(output),
        Err(e) => {
            warn!("{}; continuing without playback", e);
            Box::new(NullOutput)
        }
    }
}

fn build_generator(config: &Config, history: Arc<HistoryStorage>) -> Generator {
    let client = Arc::new(ReplicateClient::new(
        config.replicate.clone(),
        config.generation.clone(),
    ));
    let player = Arc::new(
        AudioPlayer::new(open_output(config))
            .with_download_timeout(config.audio.download_timeout()),
    );

    Generator::new(client, player, config.polling.clone()).with_history(history)
}

/// Validates the API settings, kicks off the album art fetch and builds the
/// generator. Only the commands that generate music need this.
fn start(config: &Config, history: Arc<HistoryStorage>) -> Result<Generator> {
    config::validate(config)?;

    // Decorative only; runs alongside everything else and never blocks it.
    let art_loader = ArtLoader::new(config.art.clone());
    tokio::spawn(async move {
        art_loader.load().await;
    });

    Ok(build_generator(config, history))
}

fn report(snapshot: &GenerationSnapshot) {
    match snapshot.state {
        GenerationState::Done => println!(
            "Looping {}",
            snapshot.context.output_url.as_deref().unwrap_or_default()
        ),
        _ => println!(
            "Generation failed: {}",
            snapshot
                .context
                .last_error
                .as_deref()
                .unwrap_or("unknown error")
        ),
    }
}

async fn play(generator: Generator, prompt: String) -> Result<()> {
    let snapshot = generator.run(&prompt).await;
    report(&snapshot);

    if snapshot.state != GenerationState::Done {
        anyhow::bail!("generation {} did not complete", snapshot.context.id);
    }

    println!("Press Ctrl-C to stop");
    tokio::signal::ctrl_c().await?;
    generator.player().stop()?;
    Ok(())
}

async fn interactive(generator: Generator) -> Result<()> {
    let session = Arc::new(Session::new(Arc::new(generator)));
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    println!("Enter a prompt (Ctrl-D to quit)");

    loop {
        let line = tokio::select! {
            line = lines.next_line() => line?,
            _ = tokio::signal::ctrl_c() => None,
        };
        let Some(prompt) = line else {
            break;
        };

        let id = session.submit(prompt).await;
        println!("Generating ({id})...");

        let waiter = Arc::clone(&session);
        tokio::spawn(async move {
            // None when a newer prompt replaced this one
            if let Some(snapshot) = waiter.wait().await {
                if snapshot.context.id == id {
                    report(&snapshot);
                }
            }
        });
    }

    session.generator().player().stop()?;
    Ok(())
}

async fn print_history(history: &HistoryStorage, limit: usize) -> Result<()> {
    let records = history.recent(limit).await?;
    if records.is_empty() {
        println!("No generations yet");
        return Ok(());
    }

    for record in records {
        let detail = record
            .output_url
            .as_deref()
            .or(record.error.as_deref())
            .unwrap_or("-");
        println!(
            "{}  {:<7} {:?}  {}",
            record.created_at.format("%Y-%m-%d %H:%M:%S"),
            record.status,
            record.prompt,
            detail
        );
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load configuration first (before logging setup)
    let config = match config::load().await {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = init_tracing(&config) {
        eprintln!("{}", e);
        std::process::exit(1);
    }

    let history = Arc::new(HistoryStorage::new(&config.history.database_path).await?);

    match cli.command.unwrap_or(Command::Interactive) {
        Command::History { limit } => print_history(&history, limit).await,
        Command::Play { prompt } => play(start(&config, history)?, prompt).await,
        Command::Interactive => interactive(start(&config, history)?).await,
        Command::Serve => {
            let generator = start(&config, Arc::clone(&history))?;
            let state = AppState {
                session: Arc::new(Session::new(Arc::new(generator))),
                history,
            };
            server::run(&config.server, state).await?;
            Ok(())
        }
    }
}
