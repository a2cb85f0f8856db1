//! mpv IPC driver and the `Backend` that plays catalog tracks through it.
//!
//! ```text
//!   MpvBackend (sync, called by the controller)
//!         │  BackendCommand via unbounded mpsc
//!         ▼
//!   backend_worker   ← owns MpvDriver + MpvHandle, spawns mpv lazily
//!         │
//!         ├── writer_task   ← MpvRequest → socket
//!         └── reader_task   ← JSON lines from socket
//!                                ├── response (request_id) → oneshot
//!                                └── event / property-change → worker
//!
//!   worker ─ CoreEvent::Backend(BackendEvent) / CoreEvent::Health ─▶ PlayerCore
//! ```
//!
//! Events are tagged with the `LoadTicket` of the load they belong to.  The
//! `loadfile` reply names the playlist entry mpv created for a ticket, and
//! `start-file`/`end-file` carry that entry id, so a file from a superseded
//! load never picks up the newest ticket no matter how its events interleave
//! with later commands.

use serde_json::{json, Value};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::{mpsc, oneshot, Mutex};
use tracing::{debug, info, warn};

use vein_proto::protocol::MpvHealth;
use vein_proto::transport::{Backend, BackendEvent, LoadTicket};

use crate::core::CoreEvent;

#[cfg(unix)]
use tokio::net::UnixStream;

#[cfg(windows)]
use tokio::net::windows::named_pipe::ClientOptions;

static NEXT_REQ_ID: AtomicU64 = AtomicU64::new(1);

pub const OBS_TIME_POS: u64 = 1;
pub const OBS_DURATION: u64 = 2;

type PendingMap = Arc<Mutex<HashMap<u64, oneshot::Sender<anyhow::Result<Value>>>>>;

struct PendingRequest {
    req_id: u64,
    payload: String, // serialised JSON line, '\n' included
    reply: oneshot::Sender<anyhow::Result<Value>>,
}

/// An unsolicited mpv message (no request_id).
#[derive(Debug, Clone)]
pub struct MpvEvent {
    pub raw: Value,
}

impl MpvEvent {
    pub fn as_property_change(&self) -> Option<(u64, &Value)> {
        if self.raw.get("event")?.as_str()? == "property-change" {
            let id = self.raw.get("id")?.as_u64()?;
            let data = self.raw.get("data").unwrap_or(&Value::Null);
            Some((id, data))
        } else {
            None
        }
    }

    pub fn event_name(&self) -> Option<&str> {
        self.raw.get("event")?.as_str()
    }
}

// ── event classification ──────────────────────────────────────────────────────

/// Why mpv stopped playing a file.
#[derive(Debug, Clone, PartialEq)]
pub enum EndReason {
    Eof,
    Error(String),
    /// Replaced, stopped, or quit.  Never reported upward.
    Other,
}

/// The part of an mpv event the backend cares about.
#[derive(Debug, Clone, PartialEq)]
pub enum MpvSignal {
    StartFile(Option<u64>),
    FileLoaded,
    EndFile { entry: Option<u64>, reason: EndReason },
    TimePos(Option<f64>),
    Duration(Option<f64>),
}

pub fn classify(event: &MpvEvent) -> Option<MpvSignal> {
    if let Some((id, data)) = event.as_property_change() {
        let value = if data.is_null() { None } else { data.as_f64() };
        return match id {
            OBS_TIME_POS => Some(MpvSignal::TimePos(value)),
            OBS_DURATION => Some(MpvSignal::Duration(value)),
            _ => None,
        };
    }
    let entry = event.raw.get("playlist_entry_id").and_then(Value::as_u64);
    match event.event_name()? {
        "start-file" => Some(MpvSignal::StartFile(entry)),
        "file-loaded" => Some(MpvSignal::FileLoaded),
        "end-file" => {
            let reason = event.raw.get("reason").and_then(Value::as_str);
            let reason = match reason {
                Some("eof") => EndReason::Eof,
                Some("error") => EndReason::Error(
                    event
                        .raw
                        .get("file_error")
                        .and_then(Value::as_str)
                        .unwrap_or("playback error")
                        .to_string(),
                ),
                _ => EndReason::Other,
            };
            Some(MpvSignal::EndFile { entry, reason })
        }
        _ => None,
    }
}

/// Turns mpv signals into ticket-tagged backend events.
///
/// Only the newest load can become active.  Its playlist entry id is known
/// once `loadfile` answers; mpv builds that predate entry ids leave it unset
/// and the next `start-file` is taken on trust.
#[derive(Debug, Default)]
pub struct EventTagger {
    /// The newest load and the playlist entry mpv created for it.
    wanted: Option<(LoadTicket, Option<u64>)>,
    /// The file mpv is currently playing, when it belongs to `wanted`.
    active: Option<(LoadTicket, Option<u64>)>,
    time_pos: Option<f64>,
    duration: Option<f64>,
    last_whole_sec: Option<u64>,
}

impl EventTagger {
    pub fn loading(&mut self, ticket: LoadTicket) {
        self.wanted = Some((ticket, None));
        self.active = None;
    }

    /// Record the entry id from the `loadfile` reply.
    pub fn bind(&mut self, ticket: LoadTicket, entry: u64) {
        match &mut self.wanted {
            Some((wanted, slot)) if *wanted == ticket => *slot = Some(entry),
            _ => debug!("mpv tagger: entry {} for superseded {}", entry, ticket),
        }
    }

    pub fn released(&mut self) {
        self.wanted = None;
        self.active = None;
    }

    /// The ticket a failure outside mpv's event stream should be charged to.
    pub fn pending(&self) -> Option<LoadTicket> {
        self.wanted.map(|(ticket, _)| ticket)
    }

    pub fn tag(&mut self, signal: MpvSignal) -> Option<BackendEvent> {
        match signal {
            MpvSignal::StartFile(entry) => {
                self.active = match self.wanted {
                    Some((ticket, Some(want))) if entry == Some(want) => Some((ticket, entry)),
                    Some((ticket, None)) => Some((ticket, entry)),
                    _ => {
                        debug!("mpv tagger: ignoring start of stale entry {:?}", entry);
                        None
                    }
                };
                self.time_pos = None;
                self.duration = None;
                self.last_whole_sec = None;
                None
            }
            MpvSignal::FileLoaded => self.active.map(|(ticket, _)| BackendEvent::Started(ticket)),
            MpvSignal::EndFile { entry, reason } => {
                let (ticket, active_entry) = self.active?;
                if entry.is_some() && active_entry.is_some() && entry != active_entry {
                    return None;
                }
                match reason {
                    EndReason::Eof => {
                        self.active = None;
                        Some(BackendEvent::Ended(ticket))
                    }
                    EndReason::Error(reason) => {
                        self.active = None;
                        Some(BackendEvent::Failed { ticket, reason })
                    }
                    EndReason::Other => None,
                }
            }
            MpvSignal::TimePos(pos) => {
                self.time_pos = pos;
                // One progress event per whole second is plenty for a bar.
                let whole = pos.map(|p| p.max(0.0) as u64);
                if whole == self.last_whole_sec {
                    return None;
                }
                self.last_whole_sec = whole;
                self.progress()
            }
            MpvSignal::Duration(dur) => {
                if dur == self.duration {
                    return None;
                }
                self.duration = dur;
                self.progress()
            }
        }
    }

    fn progress(&self) -> Option<BackendEvent> {
        Some(BackendEvent::Progress {
            ticket: self.active?.0,
            time_pos_secs: self.time_pos,
            duration_secs: self.duration,
        })
    }
}

// ── public handle ─────────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct MpvHandle {
    tx: mpsc::Sender<PendingRequest>,
    /// Set by the reader task once the socket is gone.
    closed: Arc<AtomicBool>,
}

impl MpvHandle {
    pub fn is_connected(&self) -> bool {
        !self.closed.load(Ordering::Relaxed)
    }

    pub async fn send(&self, command: Value) -> anyhow::Result<Value> {
        let req_id = NEXT_REQ_ID.fetch_add(1, Ordering::Relaxed);
        let msg = json!({ "command": command, "request_id": req_id });
        let mut raw = serde_json::to_string(&msg)?;
        raw.push('\n');

        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(PendingRequest {
                req_id,
                payload: raw,
                reply: reply_tx,
            })
            .await
            .map_err(|_| anyhow::anyhow!("mpv writer task gone"))?;

        tokio::time::timeout(tokio::time::Duration::from_secs(5), reply_rx)
            .await
            .map_err(|_| anyhow::anyhow!("mpv IPC timeout for req={}", req_id))?
            .map_err(|_| anyhow::anyhow!("mpv reply channel dropped req={}", req_id))?
    }

    /// Returns the playlist entry id mpv assigned, when it reports one.
    pub async fn load(&self, url: &str) -> anyhow::Result<Option<u64>> {
        let reply = self.send(json!(["loadfile", url, "replace"])).await?;
        Ok(reply
            .get("data")
            .and_then(|d| d.get("playlist_entry_id"))
            .and_then(Value::as_u64))
    }

    pub async fn stop(&self) -> anyhow::Result<()> {
        self.send(json!(["stop"])).await?;
        Ok(())
    }

    pub async fn set_pause(&self, paused: bool) -> anyhow::Result<()> {
        self.send(json!(["set_property", "pause", paused])).await?;
        Ok(())
    }

    pub async fn set_volume(&self, vol: f32) -> anyhow::Result<()> {
        let vol_pct = (vol * 100.0).clamp(0.0, 100.0);
        self.send(json!(["set_property", "volume", vol_pct])).await?;
        Ok(())
    }

    pub async fn seek_relative(&self, secs: f64) -> anyhow::Result<()> {
        self.send(json!(["seek", secs, "relative"])).await?;
        Ok(())
    }

    /// Must be re-issued after every fresh connection.
    pub async fn observe_properties(&self) {
        for (id, name) in [(OBS_TIME_POS, "time-pos"), (OBS_DURATION, "duration")] {
            match self.send(json!(["observe_property", id, name])).await {
                Ok(_) => debug!("mpv: observe_property id={} name={}", id, name),
                Err(e) => warn!("mpv: observe_property {} failed: {}", name, e),
            }
        }
    }
}

// ── driver ────────────────────────────────────────────────────────────────────

/// Owns the mpv child process.
pub struct MpvDriver {
    pub socket_name: String,
    process: Option<tokio::process::Child>,
    pub last_volume: f32,
    /// Overrides the `find_mpv_binary` lookup.
    binary: Option<PathBuf>,
}

impl MpvDriver {
    pub fn new() -> Self {
        Self {
            socket_name: vein_proto::platform::mpv_socket_name(),
            process: None,
            last_volume: 0.5,
            binary: None,
        }
    }

    pub fn with_binary(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: Some(binary.into()),
            ..Self::new()
        }
    }

    pub fn process_alive(&mut self) -> bool {
        let Some(child) = self.process.as_mut() else {
            return false;
        };
        match child.try_wait() {
            Ok(None) => true,
            Ok(Some(status)) => {
                warn!("mpv process exited: {}", status);
                false
            }
            Err(e) => {
                warn!("mpv process_alive check failed: {}", e);
                false
            }
        }
    }

    pub async fn kill(&mut self) {
        if let Some(mut p) = self.process.take() {
            let _ = p.kill().await;
        }
    }

    fn command(&self) -> anyhow::Result<tokio::process::Command> {
        let mpv_binary = self
            .binary
            .clone()
            .or_else(vein_proto::platform::find_mpv_binary)
            .ok_or_else(|| anyhow::anyhow!("mpv binary not found"))?;
        let vol_arg = format!(
            "--volume={}",
            (self.last_volume * 100.0).clamp(0.0, 100.0).round() as i64
        );

        let data_dir = vein_proto::platform::data_dir();
        std::fs::create_dir_all(&data_dir)?;
        let stderr_path = data_dir.join("mpv-stderr.log");
        let stderr_file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&stderr_path)?;

        let mut cmd = tokio::process::Command::new(mpv_binary);
        cmd.arg("--no-video")
            .arg("--idle=yes")
            .arg("--no-terminal")
            .arg(vein_proto::platform::mpv_socket_arg())
            .arg(vol_arg)
            .stdin(std::process::Stdio::null())
            .stdout(std::process::Stdio::null())
            .stderr(stderr_file)
            .kill_on_drop(true);
        Ok(cmd)
    }

    /// Try to connect to the already-running mpv socket without spawning.
    #[cfg(unix)]
    pub async fn try_reconnect(&mut self, event_tx: mpsc::Sender<MpvEvent>) -> Option<MpvHandle> {
        let socket_path = std::path::PathBuf::from(&self.socket_name);
        if !self.process_alive() || !socket_path.exists() {
            return None;
        }
        match UnixStream::connect(&socket_path).await {
            Ok(stream) => {
                info!("mpv: reconnected to existing IPC socket");
                Some(start_io_tasks(stream, event_tx))
            }
            Err(e) => {
                warn!("mpv: failed to reconnect: {}", e);
                None
            }
        }
    }

    #[cfg(windows)]
    pub async fn try_reconnect(&mut self, event_tx: mpsc::Sender<MpvEvent>) -> Option<MpvHandle> {
        if !self.process_alive() {
            return None;
        }
        let pipe_path = format!(r"\\.\pipe\{}", self.socket_name);
        match ClientOptions::new().open(&pipe_path) {
            Ok(client) => {
                info!("mpv: reconnected to named pipe");
                Some(start_io_tasks(client, event_tx))
            }
            Err(e) => {
                warn!("mpv: failed to reconnect to named pipe: {}", e);
                None
            }
        }
    }

    #[cfg(unix)]
    pub async fn spawn_and_connect(
        &mut self,
        event_tx: mpsc::Sender<MpvEvent>,
    ) -> anyhow::Result<MpvHandle> {
        self.kill().await;

        let socket_path = std::path::PathBuf::from(&self.socket_name);
        let _ = tokio::fs::remove_file(&socket_path).await;

        info!("mpv: spawning new process");
        let child = self.command()?.spawn()?;
        info!("mpv: spawned process with pid {:?}", child.id());
        self.process = Some(child);

        for _ in 0..50 {
            tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;
            if socket_path.exists() {
                break;
            }
        }
        if !socket_path.exists() {
            anyhow::bail!("mpv IPC socket did not appear");
        }

        let stream = UnixStream::connect(&socket_path).await?;
        info!("mpv: connected to IPC socket");
        Ok(start_io_tasks(stream, event_tx))
    }

    #[cfg(windows)]
    pub async fn spawn_and_connect(
        &mut self,
        event_tx: mpsc::Sender<MpvEvent>,
    ) -> anyhow::Result<MpvHandle> {
        self.kill().await;

        info!("mpv: spawning new process");
        let child = self.command()?.spawn()?;
        self.process = Some(child);

        let pipe_path = format!(r"\\.\pipe\{}", self.socket_name);
        for _ in 0..50 {
            tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;
            if let Ok(client) = ClientOptions::new().open(&pipe_path) {
                info!("mpv: connected to named pipe");
                return Ok(start_io_tasks(client, event_tx));
            }
        }
        anyhow::bail!("mpv named pipe did not appear")
    }
}

fn start_io_tasks<S>(stream: S, event_tx: mpsc::Sender<MpvEvent>) -> MpvHandle
where
    S: tokio::io::AsyncRead + tokio::io::AsyncWrite + Send + 'static,
{
    let (read_half, write_half) = tokio::io::split(stream);
    let pending: PendingMap = Arc::new(Mutex::new(HashMap::new()));
    let (cmd_tx, cmd_rx) = mpsc::channel::<PendingRequest>(64);
    let closed = Arc::new(AtomicBool::new(false));

    tokio::spawn(writer_task(write_half, cmd_rx, pending.clone()));
    let reader_closed = closed.clone();
    tokio::spawn(async move {
        reader_task(BufReader::new(read_half), pending, event_tx).await;
        reader_closed.store(true, Ordering::Relaxed);
    });

    MpvHandle { tx: cmd_tx, closed }
}

async fn fail_all(pending: &PendingMap, reason: &str) {
    let mut map = pending.lock().await;
    for (_, tx) in map.drain() {
        let _ = tx.send(Err(anyhow::anyhow!("{}", reason)));
    }
}

async fn reader_task<R>(mut reader: BufReader<R>, pending: PendingMap, event_tx: mpsc::Sender<MpvEvent>)
where
    R: tokio::io::AsyncRead + Unpin,
{
    let mut line = String::new();
    loop {
        line.clear();
        match reader.read_line(&mut line).await {
            Ok(0) => {
                debug!("mpv reader: connection closed");
                fail_all(&pending, "mpv IPC connection closed").await;
                break;
            }
            Ok(_) => {
                let trimmed = line.trim();
                if trimmed.is_empty() {
                    continue;
                }
                let val: Value = match serde_json::from_str(trimmed) {
                    Ok(v) => v,
                    Err(e) => {
                        debug!("mpv reader: invalid json '{}': {}", trimmed, e);
                        continue;
                    }
                };

                if let Some(req_id) = val.get("request_id").and_then(Value::as_u64) {
                    let mut map = pending.lock().await;
                    if let Some(tx) = map.remove(&req_id) {
                        let result = if val["error"].as_str() == Some("success") {
                            Ok(val)
                        } else {
                            let err = val["error"].as_str().unwrap_or("unknown error").to_string();
                            debug!("mpv reader: response req={} err={}", req_id, err);
                            Err(anyhow::anyhow!("mpv error: {}", err))
                        };
                        let _ = tx.send(result);
                    }
                } else if event_tx.send(MpvEvent { raw: val }).await.is_err() {
                    break;
                }
            }
            Err(e) => {
                warn!("mpv reader: read error: {}", e);
                fail_all(&pending, "mpv IPC read error").await;
                break;
            }
        }
    }
}

async fn writer_task<W>(mut writer: W, mut rx: mpsc::Receiver<PendingRequest>, pending: PendingMap)
where
    W: tokio::io::AsyncWrite + Unpin,
{
    while let Some(req) = rx.recv().await {
        // Register before writing so the reader can always match the reply.
        pending.lock().await.insert(req.req_id, req.reply);
        debug!("mpv writer: send req={} payload={}", req.req_id, req.payload.trim());
        if let Err(e) = writer.write_all(req.payload.as_bytes()).await {
            warn!("mpv writer: write error: {}", e);
            if let Some(tx) = pending.lock().await.remove(&req.req_id) {
                let _ = tx.send(Err(anyhow::anyhow!("mpv write error: {}", e)));
            }
            break;
        }
    }
    debug!("mpv writer: task exiting");
}

// ── Backend ───────────────────────────────────────────────────────────────────

#[derive(Debug)]
enum BackendCommand {
    Load(LoadTicket, String),
    SetPaused(bool),
    Release,
    SetVolume(f32),
    SeekRelative(f64),
}

/// The production [`Backend`]: forwards every call to [`backend_worker`].
/// Dropping it closes the channel, which quits mpv.
pub struct MpvBackend {
    tx: mpsc::UnboundedSender<BackendCommand>,
}

impl MpvBackend {
    /// Spawn the worker.  mpv itself is started on the first load.
    pub fn spawn(core_tx: mpsc::Sender<CoreEvent>) -> Self {
        Self::spawn_with_driver(core_tx, MpvDriver::new())
    }

    pub fn spawn_with_driver(core_tx: mpsc::Sender<CoreEvent>, driver: MpvDriver) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        tokio::spawn(backend_worker(rx, core_tx, driver));
        Self { tx }
    }

    fn send(&self, cmd: BackendCommand) {
        if self.tx.send(cmd).is_err() {
            warn!("mpv backend: worker gone, command dropped");
        }
    }
}

impl Backend for MpvBackend {
    fn load(&mut self, ticket: LoadTicket, url: &str) {
        self.send(BackendCommand::Load(ticket, url.to_string()));
    }

    fn set_paused(&mut self, paused: bool) {
        self.send(BackendCommand::SetPaused(paused));
    }

    fn release(&mut self) {
        self.send(BackendCommand::Release);
    }

    fn set_volume(&mut self, volume: f32) {
        self.send(BackendCommand::SetVolume(volume));
    }

    fn seek_relative(&mut self, seconds: f64) {
        self.send(BackendCommand::SeekRelative(seconds));
    }
}

struct Worker {
    driver: MpvDriver,
    handle: Option<MpvHandle>,
    tagger: EventTagger,
    health: MpvHealth,
    core_tx: mpsc::Sender<CoreEvent>,
    mpv_event_tx: mpsc::Sender<MpvEvent>,
}

async fn backend_worker(
    mut rx: mpsc::UnboundedReceiver<BackendCommand>,
    core_tx: mpsc::Sender<CoreEvent>,
    driver: MpvDriver,
) {
    let (mpv_event_tx, mut mpv_event_rx) = mpsc::channel::<MpvEvent>(256);
    let mut worker = Worker {
        driver,
        handle: None,
        tagger: EventTagger::default(),
        health: MpvHealth::Absent,
        core_tx,
        mpv_event_tx,
    };

    let mut heartbeat = tokio::time::interval(tokio::time::Duration::from_secs(5));
    heartbeat.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            cmd = rx.recv() => match cmd {
                None => break,
                Some(cmd) => worker.handle_command(cmd).await,
            },
            Some(evt) = mpv_event_rx.recv() => {
                if let Some(signal) = classify(&evt) {
                    if let Some(event) = worker.tagger.tag(signal) {
                        worker.emit(event).await;
                    }
                }
            }
            _ = heartbeat.tick() => worker.check_alive().await,
        }
    }

    info!("mpv backend: shutting down");
    if let Some(h) = worker.handle.take() {
        let _ = h.send(json!(["quit"])).await;
    }
    worker.driver.kill().await;
    let _ = tokio::fs::remove_file(&worker.driver.socket_name).await;
}

impl Worker {
    async fn handle_command(&mut self, cmd: BackendCommand) {
        debug!("mpv backend: {:?}", cmd);
        match cmd {
            BackendCommand::Load(ticket, url) => {
                self.tagger.loading(ticket);
                let result = match self.ensure_handle().await {
                    Some(h) => h.load(&url).await,
                    None => Err(anyhow::anyhow!("mpv is not available")),
                };
                match result {
                    Ok(Some(entry)) => self.tagger.bind(ticket, entry),
                    Ok(None) => {}
                    Err(e) => {
                        warn!("mpv backend: load {} failed: {}", ticket, e);
                        self.tagger.released();
                        self.emit(BackendEvent::Failed {
                            ticket,
                            reason: e.to_string(),
                        })
                        .await;
                    }
                }
            }
            BackendCommand::Release => {
                self.tagger.released();
                if let Some(h) = &self.handle {
                    if let Err(e) = h.stop().await {
                        debug!("mpv backend: stop failed: {}", e);
                    }
                }
            }
            BackendCommand::SetPaused(paused) => {
                if let Some(h) = &self.handle {
                    if let Err(e) = h.set_pause(paused).await {
                        warn!("mpv backend: set_pause failed: {}", e);
                    }
                }
            }
            BackendCommand::SetVolume(volume) => {
                self.driver.last_volume = volume;
                if let Some(h) = &self.handle {
                    if let Err(e) = h.set_volume(volume).await {
                        warn!("mpv backend: set_volume failed: {}", e);
                    }
                }
            }
            BackendCommand::SeekRelative(secs) => {
                if let Some(h) = &self.handle {
                    if let Err(e) = h.seek_relative(secs).await {
                        debug!("mpv backend: seek failed: {}", e);
                    }
                }
            }
        }
    }

    async fn ensure_handle(&mut self) -> Option<MpvHandle> {
        if self.handle.is_some() && !self.driver.process_alive() {
            warn!("mpv backend: process died, dropping handle");
            self.handle = None;
            self.set_health(MpvHealth::Dead).await;
        }
        if self.handle.as_ref().is_some_and(|h| !h.is_connected()) {
            warn!("mpv backend: IPC connection lost");
            self.handle = None;
        }

        if self.handle.is_none() {
            if let Some(h) = self.driver.try_reconnect(self.mpv_event_tx.clone()).await {
                h.observe_properties().await;
                self.handle = Some(h);
                self.set_health(MpvHealth::Running).await;
                return self.handle.clone();
            }
            self.set_health(MpvHealth::Starting).await;
            match self.driver.spawn_and_connect(self.mpv_event_tx.clone()).await {
                Ok(h) => {
                    h.observe_properties().await;
                    self.handle = Some(h);
                    self.set_health(MpvHealth::Running).await;
                }
                Err(e) => {
                    warn!("mpv backend: failed to start mpv: {}", e);
                    self.set_health(MpvHealth::Dead).await;
                    return None;
                }
            }
        }
        self.handle.clone()
    }

    async fn check_alive(&mut self) {
        if self.handle.is_some() && !self.driver.process_alive() {
            warn!("mpv backend: heartbeat found mpv dead");
            self.handle = None;
            self.set_health(MpvHealth::Dead).await;
            if let Some(ticket) = self.tagger.pending() {
                self.tagger.released();
                self.emit(BackendEvent::Failed {
                    ticket,
                    reason: "mpv exited".to_string(),
                })
                .await;
            }
        }
    }

    async fn set_health(&mut self, health: MpvHealth) {
        if self.health != health {
            info!("mpv backend: health {:?} → {:?}", self.health, health);
            self.health = health.clone();
            let _ = self.core_tx.send(CoreEvent::Health(health)).await;
        }
    }

    async fn emit(&self, event: BackendEvent) {
        let _ = self.core_tx.send(CoreEvent::Backend(event)).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ev(raw: Value) -> MpvEvent {
        MpvEvent { raw }
    }

    #[test]
    fn classifies_end_file_reasons() {
        assert_eq!(
            classify(&ev(json!({"event": "end-file", "reason": "eof"}))),
            Some(MpvSignal::EndFile { entry: None, reason: EndReason::Eof })
        );
        assert_eq!(
            classify(&ev(json!({"event": "end-file", "reason": "error", "file_error": "loading failed"}))),
            Some(MpvSignal::EndFile { entry: None, reason: EndReason::Error("loading failed".into()) })
        );
        assert_eq!(
            classify(&ev(json!({"event": "end-file", "reason": "stop"}))),
            Some(MpvSignal::EndFile { entry: None, reason: EndReason::Other })
        );
        assert_eq!(classify(&ev(json!({"event": "idle"}))), None);
    }

    #[test]
    fn classifies_observed_properties() {
        assert_eq!(
            classify(&ev(json!({"event": "property-change", "id": OBS_TIME_POS, "data": 12.5}))),
            Some(MpvSignal::TimePos(Some(12.5)))
        );
        assert_eq!(
            classify(&ev(json!({"event": "property-change", "id": OBS_DURATION, "data": null}))),
            Some(MpvSignal::Duration(None))
        );
    }

    #[test]
    fn classifies_playlist_entry_ids() {
        assert_eq!(
            classify(&ev(json!({"event": "start-file", "playlist_entry_id": 4}))),
            Some(MpvSignal::StartFile(Some(4)))
        );
        assert_eq!(
            classify(&ev(json!({"event": "end-file", "reason": "eof", "playlist_entry_id": 4}))),
            Some(MpvSignal::EndFile {
                entry: Some(4),
                reason: EndReason::Eof
            })
        );
    }

    fn end(entry: u64, reason: EndReason) -> MpvSignal {
        MpvSignal::EndFile {
            entry: Some(entry),
            reason,
        }
    }

    #[test]
    fn replaced_file_end_is_not_charged_to_new_load() {
        let mut tagger = EventTagger::default();
        let first = LoadTicket(1);
        let second = LoadTicket(2);

        tagger.loading(first);
        tagger.bind(first, 1);
        tagger.tag(MpvSignal::StartFile(Some(1)));
        assert_eq!(tagger.tag(MpvSignal::FileLoaded), Some(BackendEvent::Started(first)));

        // loadfile replace: mpv ends the old file before starting the new one.
        tagger.loading(second);
        tagger.bind(second, 2);
        assert_eq!(tagger.tag(end(1, EndReason::Other)), None);
        tagger.tag(MpvSignal::StartFile(Some(2)));
        assert_eq!(tagger.tag(MpvSignal::FileLoaded), Some(BackendEvent::Started(second)));
        assert_eq!(
            tagger.tag(end(2, EndReason::Eof)),
            Some(BackendEvent::Ended(second))
        );
    }

    #[test]
    fn queued_events_of_a_skipped_load_stay_with_it() {
        let mut tagger = EventTagger::default();
        let skipped = LoadTicket(1);
        let next = LoadTicket(2);

        // Both commands are handled before mpv's events for the first file.
        tagger.loading(skipped);
        tagger.bind(skipped, 1);
        tagger.released();
        tagger.loading(next);
        tagger.bind(next, 2);

        assert_eq!(tagger.tag(MpvSignal::StartFile(Some(1))), None);
        assert_eq!(tagger.tag(MpvSignal::FileLoaded), None);
        assert_eq!(tagger.tag(MpvSignal::TimePos(Some(0.2))), None);
        assert_eq!(tagger.tag(end(1, EndReason::Error("t1 broken".into()))), None);

        tagger.tag(MpvSignal::StartFile(Some(2)));
        assert_eq!(tagger.tag(MpvSignal::FileLoaded), Some(BackendEvent::Started(next)));
    }

    #[test]
    fn bind_for_superseded_ticket_is_ignored() {
        let mut tagger = EventTagger::default();
        tagger.loading(LoadTicket(1));
        tagger.loading(LoadTicket(2));
        tagger.bind(LoadTicket(1), 1);
        tagger.bind(LoadTicket(2), 2);
        assert_eq!(tagger.tag(MpvSignal::StartFile(Some(1))), None);
        assert_eq!(tagger.tag(MpvSignal::FileLoaded), None);
    }

    #[test]
    fn mpv_without_entry_ids_falls_back_to_order() {
        let mut tagger = EventTagger::default();
        tagger.loading(LoadTicket(5));
        tagger.tag(MpvSignal::StartFile(None));
        assert_eq!(
            tagger.tag(MpvSignal::EndFile {
                entry: None,
                reason: EndReason::Error("loading failed".into())
            }),
            Some(BackendEvent::Failed {
                ticket: LoadTicket(5),
                reason: "loading failed".into()
            })
        );
    }

    #[test]
    fn progress_is_throttled_to_whole_seconds() {
        let mut tagger = EventTagger::default();
        tagger.loading(LoadTicket(7));
        tagger.tag(MpvSignal::StartFile(None));

        assert!(tagger.tag(MpvSignal::TimePos(Some(0.1))).is_some());
        assert!(tagger.tag(MpvSignal::TimePos(Some(0.6))).is_none());
        assert_eq!(
            tagger.tag(MpvSignal::Duration(Some(180.0))),
            Some(BackendEvent::Progress {
                ticket: LoadTicket(7),
                time_pos_secs: Some(0.6),
                duration_secs: Some(180.0),
            })
        );
        assert!(tagger.tag(MpvSignal::TimePos(Some(1.0))).is_some());
    }

    #[test]
    fn nothing_is_tagged_after_release() {
        let mut tagger = EventTagger::default();
        tagger.loading(LoadTicket(3));
        tagger.tag(MpvSignal::StartFile(None));
        tagger.released();
        assert_eq!(tagger.tag(MpvSignal::EndFile { entry: None, reason: EndReason::Eof }), None);
        assert_eq!(tagger.pending(), None);
    }

    async fn next_event(rx: &mut mpsc::Receiver<CoreEvent>) -> String {
        let event = tokio::time::timeout(tokio::time::Duration::from_secs(5), rx.recv())
            .await
            .expect("worker went quiet")
            .expect("worker channel closed");
        format!("{:?}", event)
    }

    #[tokio::test]
    async fn reconnect_needs_a_live_process() {
        let mut driver = MpvDriver::with_binary("/nonexistent/vein/mpv");
        let (event_tx, _event_rx) = mpsc::channel(4);
        assert!(driver.try_reconnect(event_tx).await.is_none());
    }

    #[tokio::test]
    async fn load_without_mpv_fails_the_ticket() {
        let (core_tx, mut core_rx) = mpsc::channel(16);
        let mut backend =
            MpvBackend::spawn_with_driver(core_tx, MpvDriver::with_binary("/nonexistent/vein/mpv"));

        backend.load(LoadTicket(9), "https://example.com/a.mp3");
        assert_eq!(next_event(&mut core_rx).await, "Health(Starting)");
        assert_eq!(next_event(&mut core_rx).await, "Health(Dead)");
        assert_eq!(
            next_event(&mut core_rx).await,
            format!(
                "{:?}",
                CoreEvent::Backend(BackendEvent::Failed {
                    ticket: LoadTicket(9),
                    reason: "mpv is not available".into(),
                })
            )
        );

        // A later load tries to start mpv again.
        backend.load(LoadTicket(10), "https://example.com/b.mp3");
        assert_eq!(next_event(&mut core_rx).await, "Health(Starting)");
        assert_eq!(next_event(&mut core_rx).await, "Health(Dead)");
        assert!(next_event(&mut core_rx).await.contains("LoadTicket(10)"));
    }
}
