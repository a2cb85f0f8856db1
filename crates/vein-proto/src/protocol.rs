use serde::{Deserialize, Serialize};

use crate::catalog::Track;

/// Intents sent from the TUI to the player core.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "cmd")]
pub enum Command {
    /// Tap-to-toggle / tap-elsewhere-to-switch.
    SelectTrack { track_id: String },
    Next,
    Prev,
    TogglePause,
    Stop,
    Volume { value: f32 },
    SeekRelative { seconds: f64 },
}

/// Detailed playback status derived by the controller.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum PlaybackStatus {
    #[default]
    Idle, // nothing selected / explicitly stopped
    Loading, // source handed to the transport, not started yet
    Playing,
    Paused,
    Error, // source missing or failed to load
}

impl PlaybackStatus {
    /// Glyph used by the player bar and track rows.
    pub fn glyph(self) -> &'static str {
        match self {
            PlaybackStatus::Idle => "■",
            PlaybackStatus::Loading => "◌",
            PlaybackStatus::Playing => "▶",
            PlaybackStatus::Paused => "⏸",
            PlaybackStatus::Error => "✗",
        }
    }
}

/// Health of the mpv process as observed by the backend worker.
///
/// Transitions:
///   Absent -> Starting -> Running -> Dead -> Starting ...
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub enum MpvHealth {
    /// mpv has not been needed yet.
    #[default]
    Absent,
    Starting,
    Running,
    /// Process exited, socket closed, or mpv could not be started.
    Dead,
}

impl MpvHealth {
    /// Short label for badges (≤5 chars).
    pub fn badge_label(&self) -> Option<&str> {
        match self {
            MpvHealth::Absent | MpvHealth::Running => None,
            MpvHealth::Starting => Some("INIT"),
            MpvHealth::Dead => Some("DEAD"),
        }
    }
}

/// Snapshot of the player published after every state change.  `rev` is a
/// monotonically increasing counter so the TUI can skip redundant redraws.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct PlayerState {
    #[serde(default)]
    pub rev: u64,
    pub current_track: Option<Track>,
    /// Always false when `current_track` is `None`.
    pub is_playing: bool,
    pub playback_status: PlaybackStatus,
    pub volume: f32,
    pub time_pos_secs: Option<f64>,
    pub duration_secs: Option<f64>,
    #[serde(default)]
    pub mpv_health: MpvHealth,
    /// Most recent transport failure for the current track.
    #[serde(default)]
    pub last_error: Option<String>,
}

impl PlayerState {
    pub fn is_current(&self, track_id: &str) -> bool {
        self.current_track
            .as_ref()
            .map_or(false, |t| t.id == track_id)
    }

    /// Whether `track_id` is current and actively playing.
    pub fn is_playing_track(&self, track_id: &str) -> bool {
        self.is_playing && self.is_current(track_id)
    }

    pub fn progress(&self) -> f64 {
        match (self.time_pos_secs, self.duration_secs) {
            (Some(pos), Some(dur)) if dur > 0.0 => (pos / dur).clamp(0.0, 1.0),
            _ => 0.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Catalog;

    #[test]
    fn playing_flag_is_scoped_to_current_track() {
        let track = Catalog::builtin().versatility[0].clone();
        let state = PlayerState {
            current_track: Some(track),
            is_playing: true,
            ..Default::default()
        };
        assert!(state.is_playing_track("v1"));
        assert!(!state.is_playing_track("v2"));
        assert!(!PlayerState::default().is_current("v1"));
    }

    #[test]
    fn progress_needs_a_positive_duration() {
        let mut state = PlayerState {
            time_pos_secs: Some(30.0),
            duration_secs: Some(0.0),
            ..Default::default()
        };
        assert_eq!(state.progress(), 0.0);
        state.duration_secs = Some(120.0);
        assert!((state.progress() - 0.25).abs() < f64::EPSILON);
    }

    #[test]
    fn command_serialises_with_tag() {
        let json = serde_json::to_string(&Command::SelectTrack {
            track_id: "t1".into(),
        })
        .unwrap();
        assert_eq!(json, r#"{"cmd":"SelectTrack","track_id":"t1"}"#);
    }
}
