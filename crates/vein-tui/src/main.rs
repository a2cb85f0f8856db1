mod action;
mod app;
mod app_state;
mod component;
mod components;
mod core;
mod focus;
mod mpv;
mod theme;
mod widgets;

use std::sync::Arc;

use tokio::sync::{broadcast, mpsc};

use vein_proto::concept::{ConceptGateway, GeminiGenerator};
use vein_proto::config::Config;
use vein_proto::controller::PlayerController;
use vein_proto::state::{load_catalog, StateManager};

/// What the PlayerCore broadcasts to the TUI.
#[derive(Debug, Clone)]
pub enum BroadcastMessage {
    /// The PlayerState has changed; receivers should fetch from StateManager.
    StateUpdated,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let data_dir = vein_proto::platform::data_dir();
    std::fs::create_dir_all(&data_dir)?;

    let log_path = vein_proto::platform::log_file();
    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)?;

    // Allow RUST_LOG override; keep HTTP client internals quiet by default.
    let log_filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "debug,hyper_util=warn,reqwest=warn,hyper=warn".to_string());
    tracing_subscriber::fmt()
        .with_writer(log_file)
        .with_env_filter(log_filter.as_str())
        .with_ansi(false)
        .init();

    // Print log path to stderr so the operator can tail it immediately.
    eprintln!("vein log: {}", log_path.display());

    tracing::info!("vein starting…");

    // ── Load config ──────────────────────────────────────────────────────────
    let config = Config::load().unwrap_or_else(|e| {
        tracing::warn!("config: {:#}; using defaults", e);
        Config::default()
    });

    let catalog = Arc::new(load_catalog(&config.catalog));
    let state_manager = Arc::new(StateManager::new(
        config.player.state_file.clone(),
        config.player.default_volume,
    ));

    // ── Broadcast channel (PlayerCore → TUI) ────────────────────────────────
    let (broadcast_tx, broadcast_rx) = broadcast::channel::<BroadcastMessage>(1024);

    // ── CoreEvent channel (TUI/mpv → PlayerCore) ────────────────────────────
    let (event_tx, event_rx) = mpsc::channel::<core::CoreEvent>(1024);

    // ── Build PlayerCore ─────────────────────────────────────────────────────
    let backend = mpv::MpvBackend::spawn(event_tx.clone());
    let controller = PlayerController::new(catalog.clone(), backend, config.player.on_track_end);
    let player_core =
        core::PlayerCore::new(controller, state_manager.clone(), broadcast_tx.clone()).await;

    // ── Concept generator ────────────────────────────────────────────────────
    let generator = GeminiGenerator::from_config(&config.concept);
    if !generator.has_api_key() {
        tracing::info!(
            "no concept API key ({} unset); concepts will stay hidden",
            config.concept.api_key_env
        );
    }
    let concepts = ConceptGateway::new(generator);

    // ── Spawn PlayerCore event loop ──────────────────────────────────────────
    let core_handle = tokio::spawn(async move {
        if let Err(e) = player_core.run(event_rx).await {
            tracing::error!("PlayerCore exited with error: {}", e);
        }
    });

    // ── Run TUI ──────────────────────────────────────────────────────────────
    let app = app::App::new(catalog, concepts, event_tx.clone(), state_manager);
    let result = app.run(broadcast_rx).await;

    // Stop the core; dropping its controller shuts mpv down.
    let _ = event_tx.send(core::CoreEvent::Shutdown).await;
    let _ = core_handle.await;

    result
}
