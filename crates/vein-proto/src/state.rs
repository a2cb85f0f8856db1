use crate::catalog::{load_catalog_from_toml, Catalog};
use crate::config::CatalogConfig;
use crate::protocol::{MpvHealth, PlayerState};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{info, warn};

/// The only thing that survives a restart.  Selection, play state and
/// generated concepts are deliberately session-only.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PersistentState {
    pub volume: f32,
}

impl Default for PersistentState {
    fn default() -> Self {
        Self { volume: 0.5 }
    }
}

/// Holds the latest published [`PlayerState`].  The core writes, the TUI reads.
pub struct StateManager {
    state: Arc<RwLock<PlayerState>>,
    state_file: PathBuf,
}

impl StateManager {
    /// `default_volume` applies only when there is no state file yet.
    pub fn new(state_file: PathBuf, default_volume: f32) -> Self {
        let volume = Self::load_persistent(&state_file)
            .map(|p| p.volume)
            .unwrap_or(default_volume)
            .clamp(0.0, 1.0);

        let state = PlayerState {
            rev: 1,
            volume,
            ..Default::default()
        };

        Self {
            state: Arc::new(RwLock::new(state)),
            state_file,
        }
    }

    pub async fn get_state(&self) -> PlayerState {
        self.state.read().await.clone()
    }

    /// Replace the published state with a fresh controller snapshot.
    ///
    /// Bumps `rev` and keeps the health field, which the controller does not
    /// own.  Persists when the volume changed.
    pub async fn publish(&self, mut snapshot: PlayerState) -> anyhow::Result<()> {
        let volume_changed = {
            let mut state = self.state.write().await;
            snapshot.rev = state.rev + 1;
            snapshot.mpv_health = state.mpv_health.clone();
            let changed = snapshot.volume != state.volume;
            *state = snapshot;
            changed
        };
        if volume_changed {
            self.save().await?;
        }
        Ok(())
    }

    pub async fn set_mpv_health(&self, health: MpvHealth) {
        let mut state = self.state.write().await;
        if state.mpv_health != health {
            state.mpv_health = health;
            state.rev += 1;
        }
    }

    async fn save(&self) -> anyhow::Result<()> {
        let persistent = PersistentState {
            volume: self.state.read().await.volume,
        };

        if let Some(parent) = self.state_file.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let json = serde_json::to_string_pretty(&persistent)?;
        tokio::fs::write(&self.state_file, json).await?;
        Ok(())
    }

    fn load_persistent(state_file: &Path) -> Option<PersistentState> {
        let content = std::fs::read_to_string(state_file).ok()?;
        serde_json::from_str(&content).ok()
    }
}

/// Load the catalog override if present, otherwise the built-in one.  A
/// broken override is logged and ignored rather than aborting startup.
pub fn load_catalog(config: &CatalogConfig) -> Catalog {
    let path = &config.catalog_toml;
    if !path.exists() {
        return Catalog::builtin();
    }
    match load_catalog_from_toml(path) {
        Ok(catalog) => {
            info!(
                "catalog: loaded {} projects, {} versatility tracks from {}",
                catalog.projects.len(),
                catalog.versatility.len(),
                path.display()
            );
            catalog
        }
        Err(e) => {
            warn!("catalog: {} unusable ({}), using built-in", path.display(), e);
            Catalog::builtin()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn volume_survives_restart() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("state.json");

        let manager = StateManager::new(file.clone(), 0.5);
        let mut snap = manager.get_state().await;
        snap.volume = 0.8;
        manager.publish(snap).await.unwrap();

        let reloaded = StateManager::new(file, 0.5);
        assert_eq!(reloaded.get_state().await.volume, 0.8);
    }

    #[tokio::test]
    async fn publish_bumps_rev_and_keeps_health() {
        let dir = tempfile::tempdir().unwrap();
        let manager = StateManager::new(dir.path().join("state.json"), 0.5);
        manager.set_mpv_health(MpvHealth::Running).await;
        let before = manager.get_state().await.rev;

        manager
            .publish(PlayerState {
                volume: 0.5,
                ..Default::default()
            })
            .await
            .unwrap();

        let after = manager.get_state().await;
        assert_eq!(after.rev, before + 1);
        assert_eq!(after.mpv_health, MpvHealth::Running);
        // Volume unchanged, nothing written.
        assert!(!dir.path().join("state.json").exists());
    }

    #[test]
    fn broken_catalog_override_falls_back_to_builtin() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("catalog.toml");
        std::fs::write(&path, "this is not [valid toml").unwrap();
        let catalog = load_catalog(&CatalogConfig { catalog_toml: path });
        assert_eq!(catalog, Catalog::builtin());
    }
}
