//! Transport adapter: owns the single playable source.
//!
//! The adapter sits between the now-playing controller and an audio
//! [`Backend`].  Backends are fire-and-forget: `load` returns immediately and
//! the outcome arrives later as a [`BackendEvent`] tagged with the
//! [`LoadTicket`] it belongs to.  Every `load` mints a new ticket, so events
//! from a superseded load are recognised and dropped in [`Transport::accept`].

use tracing::{debug, warn};

/// Identifies one `load` call.  Tickets are never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LoadTicket(pub u64);

impl std::fmt::Display for LoadTicket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// The audio-output capability behind the adapter (mpv in production).
pub trait Backend: Send {
    /// Start sourcing `url`.  Outcome is reported asynchronously.
    fn load(&mut self, ticket: LoadTicket, url: &str);
    fn set_paused(&mut self, paused: bool);
    /// Drop whatever is loaded.
    fn release(&mut self);
    fn set_volume(&mut self, _volume: f32) {}
    fn seek_relative(&mut self, _seconds: f64) {}
}

/// What a backend reports back.
#[derive(Debug, Clone, PartialEq)]
pub enum BackendEvent {
    Started(LoadTicket),
    Progress {
        ticket: LoadTicket,
        time_pos_secs: Option<f64>,
        duration_secs: Option<f64>,
    },
    Ended(LoadTicket),
    Failed { ticket: LoadTicket, reason: String },
}

impl BackendEvent {
    pub fn ticket(&self) -> LoadTicket {
        match self {
            BackendEvent::Started(t) | BackendEvent::Ended(t) => *t,
            BackendEvent::Progress { ticket, .. } | BackendEvent::Failed { ticket, .. } => *ticket,
        }
    }
}

/// A backend event that survived stale-ticket filtering.
#[derive(Debug, Clone, PartialEq)]
pub enum TransportEvent {
    Started,
    Progress {
        time_pos_secs: Option<f64>,
        duration_secs: Option<f64>,
    },
    Ended,
    Failed(String),
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum TransportError {
    #[error("track has no audio source")]
    MissingSource,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportState {
    Empty,
    Loading(LoadTicket),
    Ready(LoadTicket),
    /// The current load failed; nothing is playable until the next `load`.
    Failed(LoadTicket),
    /// The current source played to the end.
    Finished(LoadTicket),
}

pub struct Transport<B> {
    backend: B,
    next_ticket: u64,
    state: TransportState,
}

impl<B: Backend> Transport<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            next_ticket: 1,
            state: TransportState::Empty,
        }
    }

    pub fn state(&self) -> TransportState {
        self.state
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// True when a source is loading or loaded and can take play/pause.
    pub fn has_source(&self) -> bool {
        matches!(
            self.state,
            TransportState::Loading(_) | TransportState::Ready(_)
        )
    }

    fn current_ticket(&self) -> Option<LoadTicket> {
        match self.state {
            TransportState::Empty => None,
            TransportState::Loading(t)
            | TransportState::Ready(t)
            | TransportState::Failed(t)
            | TransportState::Finished(t) => Some(t),
        }
    }

    /// Release the previous source, then begin loading `source`.
    pub fn load(&mut self, source: Option<&str>) -> Result<LoadTicket, TransportError> {
        self.release();
        let url = source
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or(TransportError::MissingSource)?;

        let ticket = LoadTicket(self.next_ticket);
        self.next_ticket += 1;
        debug!("transport: load {} url={}", ticket, url);
        self.backend.load(ticket, url);
        self.state = TransportState::Loading(ticket);
        Ok(ticket)
    }

    /// Start or pause the loaded source.  No-op on an empty or failed transport.
    pub fn set_playing(&mut self, playing: bool) {
        if !self.has_source() {
            debug!("transport: set_playing({}) ignored, no source", playing);
            return;
        }
        self.backend.set_paused(!playing);
    }

    pub fn release(&mut self) {
        if self.state != TransportState::Empty {
            self.backend.release();
            self.state = TransportState::Empty;
        }
    }

    pub fn set_volume(&mut self, volume: f32) {
        self.backend.set_volume(volume.clamp(0.0, 1.0));
    }

    pub fn seek_relative(&mut self, seconds: f64) {
        if self.has_source() {
            self.backend.seek_relative(seconds);
        }
    }

    /// Apply a backend event.  Events for any ticket other than the current
    /// one are stale and return `None`, as are starts and progress of a load
    /// that already failed or finished.
    pub fn accept(&mut self, event: BackendEvent) -> Option<TransportEvent> {
        let ticket = event.ticket();
        if self.current_ticket() != Some(ticket) {
            debug!("transport: dropping stale event for {}: {:?}", ticket, event);
            return None;
        }
        match event {
            BackendEvent::Started(_) | BackendEvent::Progress { .. } if !self.has_source() => {
                debug!("transport: {} is over, dropping {:?}", ticket, event);
                None
            }
            BackendEvent::Started(_) => {
                self.state = TransportState::Ready(ticket);
                Some(TransportEvent::Started)
            }
            BackendEvent::Progress {
                time_pos_secs,
                duration_secs,
                ..
            } => Some(TransportEvent::Progress {
                time_pos_secs,
                duration_secs,
            }),
            BackendEvent::Ended(_) => {
                self.state = TransportState::Finished(ticket);
                Some(TransportEvent::Ended)
            }
            BackendEvent::Failed { reason, .. } => {
                warn!("transport: load {} failed: {}", ticket, reason);
                self.state = TransportState::Failed(ticket);
                Some(TransportEvent::Failed(reason))
            }
        }
    }
}

/// A backend that records calls instead of playing audio.  Used by tests and
/// by headless runs where no audio output is wanted.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct RecordingBackend {
    pub calls: Vec<BackendCall>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum BackendCall {
    Load(LoadTicket, String),
    SetPaused(bool),
    Release,
    SetVolume(f32),
    SeekRelative(f64),
}

impl RecordingBackend {
    pub fn last_load(&self) -> Option<(LoadTicket, &str)> {
        self.calls.iter().rev().find_map(|c| match c {
            BackendCall::Load(t, url) => Some((*t, url.as_str())),
            _ => None,
        })
    }
}

impl Backend for RecordingBackend {
    fn load(&mut self, ticket: LoadTicket, url: &str) {
        self.calls.push(BackendCall::Load(ticket, url.to_string()));
    }

    fn set_paused(&mut self, paused: bool) {
        self.calls.push(BackendCall::SetPaused(paused));
    }

    fn release(&mut self) {
        self.calls.push(BackendCall::Release);
    }

    fn set_volume(&mut self, volume: f32) {
        self.calls.push(BackendCall::SetVolume(volume));
    }

    fn seek_relative(&mut self, seconds: f64) {
        self.calls.push(BackendCall::SeekRelative(seconds));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn transport() -> Transport<RecordingBackend> {
        Transport::new(RecordingBackend::default())
    }

    #[test]
    fn load_releases_previous_source_first() {
        let mut t = transport();
        let first = t.load(Some("a.mp3")).unwrap();
        let second = t.load(Some("b.mp3")).unwrap();
        assert_ne!(first, second);
        assert_eq!(
            t.backend().calls,
            vec![
                BackendCall::Load(first, "a.mp3".into()),
                BackendCall::Release,
                BackendCall::Load(second, "b.mp3".into()),
            ]
        );
        assert_eq!(t.state(), TransportState::Loading(second));
    }

    #[test]
    fn missing_source_leaves_transport_empty() {
        let mut t = transport();
        t.load(Some("a.mp3")).unwrap();
        assert_eq!(t.load(Some("  ")), Err(TransportError::MissingSource));
        assert_eq!(t.load(None), Err(TransportError::MissingSource));
        assert_eq!(t.state(), TransportState::Empty);
    }

    #[test]
    fn set_playing_on_empty_transport_is_a_no_op() {
        let mut t = transport();
        t.set_playing(true);
        assert!(t.backend().calls.is_empty());
    }

    #[test]
    fn stale_events_are_discarded() {
        let mut t = transport();
        let old = t.load(Some("a.mp3")).unwrap();
        let new = t.load(Some("b.mp3")).unwrap();

        assert_eq!(t.accept(BackendEvent::Started(old)), None);
        assert_eq!(t.accept(BackendEvent::Ended(old)), None);
        assert_eq!(t.state(), TransportState::Loading(new));

        assert_eq!(
            t.accept(BackendEvent::Started(new)),
            Some(TransportEvent::Started)
        );
        assert_eq!(t.state(), TransportState::Ready(new));
    }

    #[test]
    fn failure_blocks_play_until_next_load() {
        let mut t = transport();
        let ticket = t.load(Some("a.mp3")).unwrap();
        let ev = t.accept(BackendEvent::Failed {
            ticket,
            reason: "404".into(),
        });
        assert_eq!(ev, Some(TransportEvent::Failed("404".into())));
        let calls_before = t.backend().calls.len();
        t.set_playing(true);
        assert_eq!(t.backend().calls.len(), calls_before);
        assert!(!t.has_source());
    }

    #[test]
    fn late_start_after_failure_is_dropped() {
        let mut t = transport();
        let ticket = t.load(Some("a.mp3")).unwrap();
        t.accept(BackendEvent::Failed {
            ticket,
            reason: "404".into(),
        });
        assert_eq!(t.accept(BackendEvent::Started(ticket)), None);
        assert_eq!(
            t.accept(BackendEvent::Progress {
                ticket,
                time_pos_secs: Some(1.0),
                duration_secs: None,
            }),
            None
        );
        assert_eq!(t.state(), TransportState::Failed(ticket));
    }

    #[test]
    fn start_after_end_does_not_revive_the_source() {
        let mut t = transport();
        let ticket = t.load(Some("a.mp3")).unwrap();
        t.accept(BackendEvent::Started(ticket));
        assert_eq!(t.accept(BackendEvent::Ended(ticket)), Some(TransportEvent::Ended));
        assert_eq!(t.accept(BackendEvent::Started(ticket)), None);
        assert_eq!(t.state(), TransportState::Finished(ticket));
    }
}
