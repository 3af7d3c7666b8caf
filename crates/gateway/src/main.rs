use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use tutor_domain::config::Config;
use tutor_gateway::router;
use tutor_gateway::state::AppState;
use tutor_providers::{AnthropicLlmProvider, HttpTtsProvider, LatexClient, WsSttProvider};
use tutor_sessions::SessionRegistry;

#[derive(Parser)]
#[command(name = "tutor-orchestrator", version, about = "Voice tutor session orchestrator")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(clap::Subcommand)]
enum Command {
    /// Start the orchestrator server (default if no subcommand given).
    Serve,
    /// Print the build version and exit.
    Version,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        None | Some(Command::Serve) => {
            init_tracing();
            let config = Arc::new(Config::from_env());
            run_server(config).await
        }
        Some(Command::Version) => {
            println!("tutor-orchestrator {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,tutor_gateway=debug")),
        )
        .json()
        .init();
}

async fn run_server(config: Arc<Config>) -> anyhow::Result<()> {
    tracing::info!("tutor-orchestrator starting");

    let anthropic_key = std::env::var("ANTHROPIC_API_KEY")
        .context("ANTHROPIC_API_KEY must be set to reach the language-model provider")?;
    let elevenlabs_key = std::env::var("ELEVENLABS_API_KEY")
        .context("ELEVENLABS_API_KEY must be set to reach the text-to-speech provider")?;
    let stt_endpoint =
        std::env::var("STT_ENDPOINT").context("STT_ENDPOINT must be set to reach the speech-to-text provider")?;
    let tts_base_url =
        std::env::var("TTS_BASE_URL").unwrap_or_else(|_| "https://api.elevenlabs.io".to_string());

    let llm = Arc::new(AnthropicLlmProvider::new(anthropic_key)?);
    let tts = Arc::new(HttpTtsProvider::new(tts_base_url, elevenlabs_key)?);
    let stt = Arc::new(WsSttProvider::new(stt_endpoint));
    let latex = Arc::new(LatexClient::new(config.latex.render_url.clone())?);

    let state = AppState {
        config: config.clone(),
        sessions: Arc::new(SessionRegistry::new()),
        llm,
        stt,
        tts,
        latex,
    };

    let app = router::build(state);
    let addr = format!("{}:{}", config.server.host, config.server.port);
    tracing::info!(%addr, "listening");

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    axum::serve(listener, app)
        .await
        .context("server loop exited with an error")?;

    Ok(())
}
