use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use practice_capture::{
    create_router, AppState, CaptureMode, CaptureSession, Collaborators, Config,
    FileDeviceSource, HttpBlobTransport, HttpRemoteStore, OwnerRecord, UploadBinding,
};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "practice-capture", about = "Record, upload and replay practice answers")]
struct Cli {
    /// Config file (extension optional)
    #[arg(long, default_value = "config/practice-capture")]
    config: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the session control API
    Serve,

    /// Record one answer from a WAV file and upload it
    Record {
        /// WAV file replayed as the microphone
        #[arg(long)]
        input: PathBuf,

        /// How long to record
        #[arg(long, default_value_t = 5)]
        seconds: u64,

        /// Question the answer belongs to
        #[arg(long, default_value = "")]
        context: String,

        /// Attach to this STAR story
        #[arg(long, conflicts_with = "question")]
        star_story: Option<String>,

        /// Attach to this practice question
        #[arg(long)]
        question: Option<String>,

        /// Keep the recording local
        #[arg(long)]
        no_upload: bool,
    },
}

fn backend_collaborators(cfg: &Config, input: PathBuf) -> Result<Collaborators> {
    let store = HttpRemoteStore::new(
        cfg.backend.base_url.clone(),
        Duration::from_secs(cfg.backend.request_timeout_secs),
        cfg.backend.token.clone(),
    )?;
    let transport = HttpBlobTransport::new(Duration::from_secs(cfg.backend.transfer_timeout_secs))?;

    Ok(Collaborators {
        devices: Arc::new(FileDeviceSource::new(input)),
        store: Arc::new(store),
        transport: Arc::new(transport),
        preview: None,
    })
}

async fn serve(cfg: Config) -> Result<()> {
    let input = cfg
        .capture
        .input
        .clone()
        .context("capture.input must name a WAV file to serve from")?;
    let collaborators = backend_collaborators(&cfg, input)?;

    let state = AppState::new(collaborators, cfg.capture.clone());
    let app = create_router(state);

    let addr = format!("{}:{}", cfg.service.http.bind, cfg.service.http.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    info!("{} listening on {}", cfg.service.name, addr);
    axum::serve(listener, app).await?;

    Ok(())
}

async fn record(
    cfg: Config,
    input: PathBuf,
    seconds: u64,
    binding: UploadBinding,
    upload: bool,
) -> Result<()> {
    let collaborators = backend_collaborators(&cfg, input)?;
    let session_config = cfg.capture.session_config(Some(CaptureMode::Audio), binding);
    let mut session = CaptureSession::new(session_config, collaborators);

    session.preview().await?;
    session.start_recording().await?;

    for _ in 0..seconds {
        tokio::time::sleep(Duration::from_secs(1)).await;
        info!(
            "Recording {}s, level {}",
            session.elapsed_seconds(),
            session.audio_level()
        );
    }

    session.stop_recording().await?;

    let snapshot = session.snapshot();
    if let Some(recording) = &snapshot.recording {
        info!(
            "Recorded {} bytes of {} ({:.1}s)",
            recording.size_bytes, recording.mime, recording.duration_seconds
        );
    }

    if upload {
        let reference = session.upload().await?;
        info!("Saved recording: {}", reference.storage_key);
    }

    session.shutdown().await;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let cfg = Config::load(&cli.config)?;

    info!("Loaded config: {}", cfg.service.name);

    match cli.command {
        Command::Serve => serve(cfg).await,
        Command::Record {
            input,
            seconds,
            context,
            star_story,
            question,
            no_upload,
        } => {
            let owner = star_story
                .map(OwnerRecord::StarStory)
                .or(question.map(OwnerRecord::PracticeQuestion));
            record(cfg, input, seconds, UploadBinding { context, owner }, !no_upload).await
        }
    }
}
