//! Now-playing controller: the single source of truth for what is selected
//! and whether it is playing.
//!
//! [`NowPlaying`] is the bare selection state.  [`PlayerController`] wraps it
//! together with the catalog and the [`Transport`], so that every selection
//! change is mirrored onto the one audio source and every transport event is
//! folded back into the selection state.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::catalog::{Catalog, Step, Track};
use crate::protocol::{PlaybackStatus, PlayerState};
use crate::transport::{Backend, BackendEvent, Transport, TransportEvent, TransportState};

/// What to do when the current source plays to the end.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum TrackEndPolicy {
    /// Advance like `next()`, wrapping at the end of the navigation order.
    #[default]
    Next,
    /// Keep the track selected, paused.
    Stop,
}

/// Current selection and play flag.  Starts empty.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NowPlaying {
    current: Option<Track>,
    playing: bool,
}

/// Outcome of [`NowPlaying::select`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selection {
    /// The track was already current; the flag flipped to the given value.
    Toggled(bool),
    /// A different track became current and is playing.
    Switched,
}

impl NowPlaying {
    pub fn current(&self) -> Option<&Track> {
        self.current.as_ref()
    }

    /// The flag is meaningless without a current track and reads false then.
    pub fn is_playing(&self) -> bool {
        self.current.is_some() && self.playing
    }

    pub fn is_current(&self, track_id: &str) -> bool {
        self.current.as_ref().map_or(false, |t| t.id == track_id)
    }

    pub fn select(&mut self, track: &Track) -> Selection {
        if self.is_current(&track.id) {
            self.playing = !self.playing;
            Selection::Toggled(self.playing)
        } else {
            self.current = Some(track.clone());
            self.playing = true;
            Selection::Switched
        }
    }

    fn switch_to(&mut self, track: Track) {
        self.current = Some(track);
        self.playing = true;
    }

    fn set_playing(&mut self, playing: bool) {
        self.playing = playing && self.current.is_some();
    }

    fn clear(&mut self) {
        self.current = None;
        self.playing = false;
    }
}

pub struct PlayerController<B> {
    catalog: Arc<Catalog>,
    now: NowPlaying,
    transport: Transport<B>,
    on_track_end: TrackEndPolicy,
    volume: f32,
    time_pos_secs: Option<f64>,
    duration_secs: Option<f64>,
    last_error: Option<String>,
}

impl<B: Backend> PlayerController<B> {
    pub fn new(catalog: Arc<Catalog>, backend: B, on_track_end: TrackEndPolicy) -> Self {
        Self {
            catalog,
            now: NowPlaying::default(),
            transport: Transport::new(backend),
            on_track_end,
            volume: 0.5,
            time_pos_secs: None,
            duration_secs: None,
            last_error: None,
        }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn now_playing(&self) -> &NowPlaying {
        &self.now
    }

    pub fn transport(&self) -> &Transport<B> {
        &self.transport
    }

    pub fn volume(&self) -> f32 {
        self.volume
    }

    /// Tap-to-toggle, tap-elsewhere-to-switch.  Unknown ids are ignored.
    /// Returns `true` when state changed.
    pub fn select_track(&mut self, track_id: &str) -> bool {
        let Some(track) = self.catalog.track(track_id).cloned() else {
            warn!("controller: select of unknown track '{}'", track_id);
            return false;
        };

        // Re-selecting a track whose source is gone (failed, finished, never
        // loaded) is an explicit retry rather than a flag flip.
        if self.now.is_current(&track.id) && !self.transport.has_source() {
            info!("controller: reloading '{}'", track.title);
            self.now.switch_to(track);
            self.start_current();
            return true;
        }

        match self.now.select(&track) {
            Selection::Toggled(playing) => {
                debug!("controller: toggle '{}' playing={}", track.title, playing);
                self.transport.set_playing(playing);
            }
            Selection::Switched => {
                info!("controller: switch to '{}'", track.title);
                self.start_current();
            }
        }
        true
    }

    pub fn next(&mut self) -> bool {
        self.advance(Step::Forward)
    }

    pub fn previous(&mut self) -> bool {
        self.advance(Step::Backward)
    }

    /// Flip play/pause of the current track.  No-op when nothing is selected.
    pub fn toggle_pause(&mut self) -> bool {
        match self.now.current().map(|t| t.id.clone()) {
            Some(id) => self.select_track(&id),
            None => false,
        }
    }

    pub fn stop(&mut self) -> bool {
        if self.now.current().is_none() {
            return false;
        }
        info!("controller: stop");
        self.transport.release();
        self.now.clear();
        self.reset_timeline();
        self.last_error = None;
        true
    }

    pub fn set_volume(&mut self, volume: f32) {
        self.volume = volume.clamp(0.0, 1.0);
        self.transport.set_volume(self.volume);
    }

    pub fn seek_relative(&mut self, seconds: f64) {
        self.transport.seek_relative(seconds);
    }

    /// Fold a backend event into the selection state.  Returns `true` when
    /// something visible changed.
    pub fn on_backend_event(&mut self, event: BackendEvent) -> bool {
        let Some(event) = self.transport.accept(event) else {
            return false;
        };
        match event {
            TransportEvent::Started => {
                self.last_error = None;
                true
            }
            TransportEvent::Progress {
                time_pos_secs,
                duration_secs,
            } => {
                let changed =
                    time_pos_secs != self.time_pos_secs || duration_secs != self.duration_secs;
                self.time_pos_secs = time_pos_secs;
                self.duration_secs = duration_secs;
                changed
            }
            TransportEvent::Ended => {
                info!("controller: track ended, policy={:?}", self.on_track_end);
                match self.on_track_end {
                    TrackEndPolicy::Next => {
                        if !self.next() {
                            self.now.set_playing(false);
                        }
                    }
                    TrackEndPolicy::Stop => {
                        self.now.set_playing(false);
                        self.reset_timeline();
                    }
                }
                true
            }
            TransportEvent::Failed(reason) => {
                self.now.set_playing(false);
                self.last_error = Some(reason);
                true
            }
        }
    }

    pub fn status(&self) -> PlaybackStatus {
        if self.now.current().is_none() {
            return PlaybackStatus::Idle;
        }
        match self.transport.state() {
            TransportState::Failed(_) => PlaybackStatus::Error,
            TransportState::Empty if self.last_error.is_some() => PlaybackStatus::Error,
            TransportState::Empty => PlaybackStatus::Idle,
            _ if !self.now.is_playing() => PlaybackStatus::Paused,
            TransportState::Loading(_) => PlaybackStatus::Loading,
            TransportState::Ready(_) => PlaybackStatus::Playing,
            TransportState::Finished(_) => PlaybackStatus::Paused,
        }
    }

    /// Build the published snapshot.  `rev` and `mpv_health` are owned by the
    /// caller.
    pub fn snapshot(&self) -> PlayerState {
        PlayerState {
            rev: 0,
            current_track: self.now.current().cloned(),
            is_playing: self.now.is_playing(),
            playback_status: self.status(),
            volume: self.volume,
            time_pos_secs: self.time_pos_secs,
            duration_secs: self.duration_secs,
            mpv_health: Default::default(),
            last_error: self.last_error.clone(),
        }
    }

    fn advance(&mut self, step: Step) -> bool {
        let Some(current_id) = self.now.current().map(|t| t.id.clone()) else {
            return false;
        };
        let Some(target) = self.catalog.step_from(&current_id, step).cloned() else {
            debug!(
                "controller: '{}' is not in the navigation order, ignoring {:?}",
                current_id, step
            );
            return false;
        };
        info!("controller: {:?} → '{}'", step, target.title);
        self.now.switch_to(target);
        self.start_current();
        true
    }

    /// Hand the current track's source to the transport.
    fn start_current(&mut self) {
        self.reset_timeline();
        self.last_error = None;
        let Some(track) = self.now.current() else {
            return;
        };
        match self.transport.load(track.source()) {
            Ok(ticket) => {
                debug!("controller: '{}' loading as {}", track.title, ticket);
                self.transport.set_playing(self.now.is_playing());
            }
            Err(e) => {
                warn!("controller: cannot load '{}': {}", track.title, e);
                self.last_error = Some(e.to_string());
                self.now.set_playing(false);
            }
        }
    }

    fn reset_timeline(&mut self) {
        self.time_pos_secs = None;
        self.duration_secs = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::{BackendCall, LoadTicket, RecordingBackend};

    fn controller(policy: TrackEndPolicy) -> PlayerController<RecordingBackend> {
        PlayerController::new(Arc::new(Catalog::builtin()), RecordingBackend::default(), policy)
    }

    fn current_ticket(c: &PlayerController<RecordingBackend>) -> LoadTicket {
        c.transport().backend().last_load().unwrap().0
    }

    fn current_id(c: &PlayerController<RecordingBackend>) -> Option<&str> {
        c.now_playing().current().map(|t| t.id.as_str())
    }

    #[test]
    fn select_twice_toggles_playing() {
        let mut c = controller(TrackEndPolicy::Next);
        c.select_track("t1");
        assert!(c.now_playing().is_playing());
        c.select_track("t1");
        assert!(!c.now_playing().is_playing());
        assert_eq!(current_id(&c), Some("t1"));
        assert_eq!(
            c.transport().backend().calls.last(),
            Some(&BackendCall::SetPaused(true))
        );
        assert_eq!(c.status(), PlaybackStatus::Paused);
    }

    #[test]
    fn selecting_another_track_switches_and_plays() {
        let mut c = controller(TrackEndPolicy::Next);
        c.select_track("t1");
        c.select_track("t1");
        c.select_track("v2");
        assert_eq!(current_id(&c), Some("v2"));
        assert!(c.now_playing().is_playing());
        assert!(c
            .transport()
            .backend()
            .calls
            .contains(&BackendCall::Release));
    }

    #[test]
    fn next_and_previous_are_no_ops_without_selection() {
        let mut c = controller(TrackEndPolicy::Next);
        assert!(!c.next());
        assert!(!c.previous());
        assert!(c.transport().backend().calls.is_empty());
        assert_eq!(c.status(), PlaybackStatus::Idle);
    }

    #[test]
    fn unknown_track_is_ignored() {
        let mut c = controller(TrackEndPolicy::Next);
        assert!(!c.select_track("ghost"));
        assert!(c.now_playing().current().is_none());
    }

    #[test]
    fn navigation_wraps_and_autoplays() {
        let mut c = controller(TrackEndPolicy::Next);
        c.select_track("v3");
        c.select_track("v3"); // paused
        assert!(c.next());
        assert_eq!(current_id(&c), Some("t1"));
        assert!(c.now_playing().is_playing());
        assert!(c.previous());
        assert_eq!(current_id(&c), Some("v3"));
    }

    #[test]
    fn started_event_moves_to_playing() {
        let mut c = controller(TrackEndPolicy::Next);
        c.select_track("t2");
        assert_eq!(c.status(), PlaybackStatus::Loading);
        let ticket = current_ticket(&c);
        assert!(c.on_backend_event(BackendEvent::Started(ticket)));
        assert_eq!(c.status(), PlaybackStatus::Playing);
    }

    #[test]
    fn ended_with_next_policy_advances() {
        let mut c = controller(TrackEndPolicy::Next);
        c.select_track("t3");
        let ticket = current_ticket(&c);
        c.on_backend_event(BackendEvent::Started(ticket));
        c.on_backend_event(BackendEvent::Ended(ticket));
        assert_eq!(current_id(&c), Some("v1"));
        assert!(c.now_playing().is_playing());
        assert_ne!(current_ticket(&c), ticket);
    }

    #[test]
    fn ended_with_stop_policy_pauses_and_reselect_reloads() {
        let mut c = controller(TrackEndPolicy::Stop);
        c.select_track("t3");
        let ticket = current_ticket(&c);
        c.on_backend_event(BackendEvent::Ended(ticket));
        assert_eq!(current_id(&c), Some("t3"));
        assert!(!c.now_playing().is_playing());
        assert_eq!(c.status(), PlaybackStatus::Paused);

        c.select_track("t3");
        assert!(c.now_playing().is_playing());
        assert_ne!(current_ticket(&c), ticket);
    }

    #[test]
    fn stale_ended_event_does_not_advance() {
        let mut c = controller(TrackEndPolicy::Next);
        c.select_track("t1");
        let old = current_ticket(&c);
        c.select_track("t2");
        assert!(!c.on_backend_event(BackendEvent::Ended(old)));
        assert_eq!(current_id(&c), Some("t2"));
    }

    #[test]
    fn failed_load_clears_playing_and_reports_error() {
        let mut c = controller(TrackEndPolicy::Next);
        c.select_track("v1");
        let ticket = current_ticket(&c);
        c.on_backend_event(BackendEvent::Failed {
            ticket,
            reason: "unreachable".into(),
        });
        assert!(!c.now_playing().is_playing());
        assert_eq!(c.status(), PlaybackStatus::Error);
        let snap = c.snapshot();
        assert_eq!(snap.last_error.as_deref(), Some("unreachable"));
        assert!(!snap.is_playing);

        // Toggling a failed track retries instead of flipping the flag.
        c.toggle_pause();
        assert!(c.now_playing().is_playing());
        assert_eq!(c.status(), PlaybackStatus::Loading);
    }

    #[test]
    fn late_start_keeps_the_failure_reason() {
        let mut c = controller(TrackEndPolicy::Next);
        c.select_track("t2");
        let ticket = current_ticket(&c);
        c.on_backend_event(BackendEvent::Failed {
            ticket,
            reason: "t2 broken".into(),
        });
        assert!(!c.on_backend_event(BackendEvent::Started(ticket)));
        let snap = c.snapshot();
        assert_eq!(snap.playback_status, PlaybackStatus::Error);
        assert_eq!(snap.last_error.as_deref(), Some("t2 broken"));
        assert!(!snap.is_playing);
    }

    #[test]
    fn stop_clears_selection() {
        let mut c = controller(TrackEndPolicy::Next);
        c.select_track("v2");
        assert!(c.stop());
        assert!(c.now_playing().current().is_none());
        assert!(!c.snapshot().is_playing);
        assert!(!c.stop());
    }

    #[test]
    fn volume_is_clamped_and_forwarded() {
        let mut c = controller(TrackEndPolicy::Next);
        c.set_volume(1.7);
        assert_eq!(c.volume(), 1.0);
        assert_eq!(
            c.transport().backend().calls.last(),
            Some(&BackendCall::SetVolume(1.0))
        );
    }
}
