use anyhow::Context;
use speech_gateway::config::Config;
use speech_gateway::routes::{self, AppState};
use speech_gateway::vendor::ElevenLabsClient;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::fmt::time::ChronoLocal;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env().context("Failed to load gateway configuration")?;

    tracing_subscriber::fmt()
        .with_max_level(config.log_level)
        .with_timer(ChronoLocal::rfc_3339())
        .init();

    if config.default_voice_id.is_none() {
        tracing::warn!("ELEVENLABS_VOICE_ID is not set; TTS requests must name a voice");
    }

    let vendor = ElevenLabsClient::new(
        config.api_key.clone(),
        config.base_url.clone(),
        config.tts_model.clone(),
    );
    let app = routes::router(AppState {
        vendor: Arc::new(vendor),
        default_voice_id: config.default_voice_id.clone(),
        upstream_timeout: config.upstream_timeout,
    });

    info!("Starting speech gateway, listening on {}", config.bind_address);
    let listener = tokio::net::TcpListener::bind(config.bind_address)
        .await
        .with_context(|| format!("Failed to bind {}", config.bind_address))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Received Ctrl-C, shutting down...");
        })
        .await?;

    Ok(())
}
