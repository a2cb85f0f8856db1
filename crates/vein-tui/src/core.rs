/// PlayerCore: single-owner event loop for the now-playing controller.
///
/// Runs embedded in the TUI process.  The TUI sends `CoreEvent::Command`,
/// the mpv backend worker sends `CoreEvent::Backend` and `CoreEvent::Health`.
/// PlayerCore owns the `PlayerController` exclusively; no other task touches
/// it.  After each event that changes something visible it publishes a
/// fresh snapshot to the `StateManager` and broadcasts
/// `BroadcastMessage::StateUpdated`.
use std::sync::Arc;

use tokio::sync::{broadcast, mpsc};
use tracing::{debug, info, warn};

use vein_proto::controller::PlayerController;
use vein_proto::protocol::{Command, MpvHealth};
use vein_proto::state::StateManager;
use vein_proto::transport::{Backend, BackendEvent};

use crate::BroadcastMessage;

/// All inputs into the PlayerCore loop.
#[derive(Debug)]
pub enum CoreEvent {
    Command(Command),
    Backend(BackendEvent),
    Health(MpvHealth),
    Shutdown,
}

pub struct PlayerCore<B> {
    controller: PlayerController<B>,
    state_manager: Arc<StateManager>,
    broadcast_tx: broadcast::Sender<BroadcastMessage>,
}

impl<B: Backend> PlayerCore<B> {
    /// Applies the persisted volume to the controller before anything plays.
    pub async fn new(
        mut controller: PlayerController<B>,
        state_manager: Arc<StateManager>,
        broadcast_tx: broadcast::Sender<BroadcastMessage>,
    ) -> Self {
        let initial_volume = state_manager.get_state().await.volume;
        controller.set_volume(initial_volume);
        Self {
            controller,
            state_manager,
            broadcast_tx,
        }
    }

    pub fn state_manager(&self) -> Arc<StateManager> {
        Arc::clone(&self.state_manager)
    }

    #[cfg(test)]
    pub fn controller(&self) -> &PlayerController<B> {
        &self.controller
    }

    /// Run until `Shutdown` or until every sender is gone.  Dropping the
    /// controller on return drops the backend, which stops mpv.
    pub async fn run(mut self, mut event_rx: mpsc::Receiver<CoreEvent>) -> anyhow::Result<()> {
        info!("PlayerCore: starting event loop");
        self.publish().await;

        while let Some(evt) = event_rx.recv().await {
            if !self.handle(evt).await {
                info!("PlayerCore: shutdown requested");
                return Ok(());
            }
        }
        info!("PlayerCore: event channel closed, shutting down");
        Ok(())
    }

    /// Apply one event.  Returns `false` when the loop should stop.
    pub async fn handle(&mut self, evt: CoreEvent) -> bool {
        match evt {
            CoreEvent::Shutdown => return false,
            CoreEvent::Command(cmd) => {
                info!("PlayerCore: command {:?}", cmd);
                if self.apply_command(cmd) {
                    self.publish().await;
                }
            }
            CoreEvent::Backend(event) => {
                debug!("PlayerCore: backend {:?}", event);
                if self.controller.on_backend_event(event) {
                    self.publish().await;
                }
            }
            CoreEvent::Health(health) => {
                self.state_manager.set_mpv_health(health).await;
                let _ = self.broadcast_tx.send(BroadcastMessage::StateUpdated);
            }
        }
        true
    }

    fn apply_command(&mut self, cmd: Command) -> bool {
        match cmd {
            Command::SelectTrack { track_id } => self.controller.select_track(&track_id),
            Command::Next => self.controller.next(),
            Command::Prev => self.controller.previous(),
            Command::TogglePause => self.controller.toggle_pause(),
            Command::Stop => self.controller.stop(),
            Command::Volume { value } => {
                let before = self.controller.volume();
                self.controller.set_volume(value);
                self.controller.volume() != before
            }
            Command::SeekRelative { seconds } => {
                // Position comes back as a progress event.
                self.controller.seek_relative(seconds);
                false
            }
        }
    }

    async fn publish(&self) {
        if let Err(e) = self.state_manager.publish(self.controller.snapshot()).await {
            warn!("PlayerCore: failed to persist state: {}", e);
        }
        let _ = self.broadcast_tx.send(BroadcastMessage::StateUpdated);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vein_proto::catalog::Catalog;
    use vein_proto::controller::TrackEndPolicy;
    use vein_proto::protocol::PlaybackStatus;
    use vein_proto::transport::{BackendCall, RecordingBackend};

    async fn core(
        dir: &tempfile::TempDir,
    ) -> (
        PlayerCore<RecordingBackend>,
        broadcast::Receiver<BroadcastMessage>,
    ) {
        let (tx, rx) = broadcast::channel(64);
        let manager = Arc::new(StateManager::new(dir.path().join("state.json"), 0.3));
        let controller = PlayerController::new(
            Arc::new(Catalog::builtin()),
            RecordingBackend::default(),
            TrackEndPolicy::Next,
        );
        (PlayerCore::new(controller, manager, tx).await, rx)
    }

    fn select(id: &str) -> CoreEvent {
        CoreEvent::Command(Command::SelectTrack {
            track_id: id.to_string(),
        })
    }

    #[tokio::test]
    async fn persisted_volume_reaches_the_backend_first() {
        let dir = tempfile::tempdir().unwrap();
        let (core, _rx) = core(&dir).await;
        assert_eq!(
            core.controller().transport().backend().calls,
            vec![BackendCall::SetVolume(0.3)]
        );
    }

    #[tokio::test]
    async fn command_publishes_snapshot_and_notifies() {
        let dir = tempfile::tempdir().unwrap();
        let (mut core, mut rx) = core(&dir).await;
        let manager = core.state_manager();
        let rev_before = manager.get_state().await.rev;

        assert!(core.handle(select("t1")).await);

        let state = manager.get_state().await;
        assert!(state.rev > rev_before);
        assert!(state.is_playing_track("t1"));
        assert_eq!(state.playback_status, PlaybackStatus::Loading);
        assert!(matches!(rx.try_recv(), Ok(BroadcastMessage::StateUpdated)));
    }

    #[tokio::test]
    async fn ignored_command_publishes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let (mut core, mut rx) = core(&dir).await;
        let rev_before = core.state_manager().get_state().await.rev;

        core.handle(CoreEvent::Command(Command::Next)).await;
        core.handle(select("ghost")).await;

        assert_eq!(core.state_manager().get_state().await.rev, rev_before);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn health_is_published_alongside_player_state() {
        let dir = tempfile::tempdir().unwrap();
        let (mut core, _rx) = core(&dir).await;
        core.handle(CoreEvent::Health(MpvHealth::Dead)).await;
        core.handle(select("v1")).await;

        let state = core.state_manager().get_state().await;
        assert_eq!(state.mpv_health, MpvHealth::Dead);
        assert!(state.is_current("v1"));
    }

    #[tokio::test]
    async fn shutdown_stops_the_loop() {
        let dir = tempfile::tempdir().unwrap();
        let (mut core, _rx) = core(&dir).await;
        assert!(!core.handle(CoreEvent::Shutdown).await);
    }
}
