//! App: component-based event loop.
//!
//! Architecture:
//! - `App` owns all components and `AppState` (shared read-only data for components).
//! - A `tokio::mpsc` channel carries `AppMessage` events in from background tasks.
//! - The event loop draws when something changed, then awaits the next message.
//! - Components return `Vec<Action>`; App dispatches each Action.
//! - Player commands flow out to the `PlayerCore` through `cmd_tx`.

use std::io;
use std::sync::Arc;
use std::time::Duration;

use ratatui::crossterm::{
    event::{
        self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind,
        KeyModifiers, MouseEvent, MouseEventKind,
    },
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    Terminal,
};
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, info, warn};

use vein_proto::catalog::Catalog;
use vein_proto::concept::ConceptOutcome;
use vein_proto::protocol::{Command, MpvHealth, PlayerState};
use vein_proto::state::StateManager;

use crate::core::CoreEvent;
use crate::BroadcastMessage;

use crate::{
    action::{Action, ComponentId, Section},
    app_state::{AppState, Concepts},
    component::Component,
    components::{
        archive_panel::ArchivePanel,
        contact_panel::ContactPanel,
        header::{self, Header},
        help_overlay::HelpOverlay,
        menu_overlay::MenuOverlay,
        player_bar::{self, PlayerBar},
        project_detail::ProjectDetail,
        project_list::ProjectList,
        versatility_list::VersatilityList,
    },
    focus::FocusRing,
    widgets::{status_bar, toast::ToastManager},
};

const VOLUME_STEP: f32 = 0.05;
const SEEK_STEP_SECS: f64 = 10.0;

// ── Internal event bus ────────────────────────────────────────────────────────

enum AppMessage {
    Event(Event),
    StateUpdated(PlayerState),
    ConceptResolved {
        project_id: String,
        title: String,
        outcome: ConceptOutcome,
    },
}

/// Screen areas of the last frame, for mouse hit-testing.
#[derive(Debug, Clone, Default)]
struct PaneAreas {
    project_list: Rect,
    project_detail: Rect,
    versatility: Rect,
    archive: Rect,
    contact: Rect,
    player_bar: Rect,
    menu: Rect,
}

pub struct App {
    state: AppState,
    state_manager: Arc<StateManager>,
    cmd_tx: mpsc::Sender<CoreEvent>,
    /// Loopback into our own message loop, set once `run` starts.
    msg_tx: Option<mpsc::Sender<AppMessage>>,

    header: Header,
    project_list: ProjectList,
    project_detail: ProjectDetail,
    versatility: VersatilityList,
    archive: ArchivePanel,
    contact: ContactPanel,
    player_bar: PlayerBar,
    menu: MenuOverlay,
    help: HelpOverlay,

    focus: FocusRing,
    toast: ToastManager,
    pane_areas: PaneAreas,
    show_keys_bar: bool,
    /// Concept requests spawned and not yet resolved; the detail pane
    /// animates while this is non-zero.
    concepts_pending: usize,
    should_quit: bool,
}

impl App {
    pub fn new(
        catalog: Arc<Catalog>,
        concepts: Concepts,
        cmd_tx: mpsc::Sender<CoreEvent>,
        state_manager: Arc<StateManager>,
    ) -> Self {
        let project_list = ProjectList::new(&catalog);
        let versatility = VersatilityList::new(catalog.versatility.len());
        let archive = ArchivePanel::new(catalog.playlists.len());
        let contact = ContactPanel::new(catalog.socials.len());
        let state = AppState::new(catalog, concepts);
        let focus = FocusRing::new(state.section.panes());
        Self {
            state,
            state_manager,
            cmd_tx,
            msg_tx: None,
            header: Header::new(),
            project_list,
            project_detail: ProjectDetail::new(),
            versatility,
            archive,
            contact,
            player_bar: PlayerBar::new(),
            menu: MenuOverlay::new(),
            help: HelpOverlay::new(),
            focus,
            toast: ToastManager::new(),
            pane_areas: PaneAreas::default(),
            show_keys_bar: true,
            concepts_pending: 0,
            should_quit: false,
        }
    }

    pub async fn run(mut self, mut broadcast_rx: broadcast::Receiver<BroadcastMessage>) -> anyhow::Result<()> {
        debug!("run(): enabling raw mode");
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend)?;
        debug!("run(): terminal created, size={:?}", terminal.size());

        let (tx, mut rx) = mpsc::channel::<AppMessage>(1024);
        self.msg_tx = Some(tx.clone());

        if !self.state.concepts.generator().has_api_key() {
            self.toast.info("no concept API key; concepts stay hidden");
        }

        // ── Background task: keyboard/mouse events ────────────────────────────
        let event_tx = tx.clone();
        tokio::task::spawn_blocking(move || loop {
            match event::read() {
                Ok(ev) => {
                    if event_tx.blocking_send(AppMessage::Event(ev)).is_err() {
                        break;
                    }
                }
                Err(_) => break,
            }
        });

        // ── Background task: broadcast receiver (PlayerCore → AppMessage) ────
        let bc_tx = tx.clone();
        let bc_state_manager = self.state_manager.clone();
        tokio::spawn(async move {
            loop {
                match broadcast_rx.recv().await {
                    Ok(BroadcastMessage::StateUpdated) => {
                        let state = bc_state_manager.get_state().await;
                        if bc_tx.send(AppMessage::StateUpdated(state)).await.is_err() {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        // Snapshots are whole; the next one catches us up.
                        warn!("broadcast receiver lagged by {} messages", n);
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        });
        drop(tx);

        // Toast expiry
        let mut toast_tick = tokio::time::interval(Duration::from_millis(100));
        toast_tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        // Header glitch + component maintenance
        let mut ui_tick = tokio::time::interval(Duration::from_millis(100));
        ui_tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        // ── Main loop ─────────────────────────────────────────────────────────
        let mut needs_redraw = true;
        loop {
            if needs_redraw {
                terminal.draw(|f| self.draw(f))?;
            }
            needs_redraw = false;

            if self.should_quit {
                break;
            }

            tokio::select! {
                Some(msg) = rx.recv() => {
                    const MAX_DRAIN: usize = 64;
                    self.handle_message(msg).await;
                    // Coalesce bursts (mouse drags, progress updates) into one frame.
                    let mut drained = 0;
                    while drained < MAX_DRAIN {
                        match rx.try_recv() {
                            Ok(msg) => {
                                self.handle_message(msg).await;
                                drained += 1;
                            }
                            Err(_) => break,
                        }
                    }
                    needs_redraw = true;
                }

                _ = toast_tick.tick() => {
                    if !self.toast.is_empty() {
                        self.toast.tick();
                        needs_redraw = true;
                    }
                }

                _ = ui_tick.tick() => {
                    needs_redraw = self.tick_components().await || self.concepts_pending > 0;
                }
            }
        }

        // ── Teardown ──────────────────────────────────────────────────────────
        disable_raw_mode()?;
        execute!(
            terminal.backend_mut(),
            LeaveAlternateScreen,
            DisableMouseCapture
        )?;
        terminal.show_cursor()?;

        Ok(())
    }

    async fn handle_message(&mut self, msg: AppMessage) {
        match msg {
            AppMessage::Event(ev) => match ev {
                Event::Key(key) => {
                    if key.kind == KeyEventKind::Release {
                        return;
                    }
                    for a in self.handle_key(key) {
                        self.dispatch(a).await;
                    }
                }
                Event::Mouse(mouse) => {
                    for a in self.handle_mouse(mouse) {
                        self.dispatch(a).await;
                    }
                }
                _ => {}
            },
            AppMessage::StateUpdated(player) => self.on_state_updated(player),
            AppMessage::ConceptResolved {
                project_id,
                title,
                outcome,
            } => {
                self.concepts_pending = self.concepts_pending.saturating_sub(1);
                match outcome {
                    ConceptOutcome::Generated(_) => {
                        info!("concept ready for {}", project_id);
                        self.toast.success(format!("concept decoded: {}", title));
                    }
                    ConceptOutcome::Failed(e) => {
                        self.toast.warning(format!("concept unavailable: {}", e));
                    }
                    ConceptOutcome::Cached(_) | ConceptOutcome::InFlight => {}
                }
            }
        }
    }

    fn on_state_updated(&mut self, new_state: PlayerState) {
        let old = &self.state.player;
        if new_state.rev == old.rev && new_state.mpv_health == old.mpv_health {
            return;
        }
        if new_state.last_error.is_some() && new_state.last_error != old.last_error {
            if let Some(err) = &new_state.last_error {
                self.toast.error(err.clone());
            }
        }
        if new_state.mpv_health == MpvHealth::Dead && old.mpv_health != MpvHealth::Dead {
            self.toast.warning("mpv stopped responding");
        }
        self.state.player = new_state;
    }

    async fn tick_components(&mut self) -> bool {
        let mut changed = self.header.tick();
        let actions: Vec<Action> = {
            let s = &self.state;
            let mut out = Vec::new();
            out.extend(self.project_list.tick(s));
            out.extend(self.project_detail.tick(s));
            out.extend(self.versatility.tick(s));
            out.extend(self.archive.tick(s));
            out.extend(self.contact.tick(s));
            out
        };
        for a in actions {
            self.dispatch(a).await;
            changed = true;
        }
        changed
    }

    // ── Key handling ──────────────────────────────────────────────────────────

    fn handle_key(&mut self, key: KeyEvent) -> Vec<Action> {
        if key.code == KeyCode::Char('c') && key.modifiers == KeyModifiers::CONTROL {
            return vec![Action::Quit];
        }

        // Overlays capture all keys when visible
        if self.menu.visible {
            return self.menu.handle_key(key, &self.state);
        }
        if self.help.visible {
            let actions = self.help.handle_key(key, &self.state);
            if !actions.is_empty() {
                return actions;
            }
            // Any other key closes the overlay
            return vec![Action::ToggleHelp];
        }

        match key.code {
            KeyCode::Char('q') if key.modifiers == KeyModifiers::NONE => return vec![Action::Quit],
            KeyCode::Char('?') => return vec![Action::ToggleHelp],
            KeyCode::Char('m') => return vec![Action::ToggleMenu],
            KeyCode::Char('K') => return vec![Action::ToggleKeys],
            KeyCode::Tab => return vec![Action::FocusNext],
            KeyCode::BackTab => return vec![Action::FocusPrev],
            KeyCode::Char(c) => {
                if let Some(section) = Section::from_number_key(c) {
                    return vec![Action::GoToSection(section)];
                }
            }
            _ => {}
        }

        // Global playback keys
        match key.code {
            KeyCode::Char(' ') => return vec![Action::TogglePause],
            KeyCode::Char('n') => return vec![Action::Next],
            KeyCode::Char('p') => return vec![Action::Prev],
            KeyCode::Char('x') => return vec![Action::Stop],
            KeyCode::Right | KeyCode::Char('+') | KeyCode::Char('=') => {
                let new_vol = (self.state.player.volume + VOLUME_STEP).min(1.0);
                return vec![Action::Volume(new_vol)];
            }
            KeyCode::Left | KeyCode::Char('-') => {
                let new_vol = (self.state.player.volume - VOLUME_STEP).max(0.0);
                return vec![Action::Volume(new_vol)];
            }
            KeyCode::Char(',') => return vec![Action::SeekRelative(-SEEK_STEP_SECS)],
            KeyCode::Char('.') => return vec![Action::SeekRelative(SEEK_STEP_SECS)],
            _ => {}
        }

        // Dispatch to the focused component
        let s = &self.state;
        match self.focus.current() {
            Some(ComponentId::ProjectList) => self.project_list.handle_key(key, s),
            Some(ComponentId::ProjectDetail) => self.project_detail.handle_key(key, s),
            Some(ComponentId::VersatilityList) => self.versatility.handle_key(key, s),
            Some(ComponentId::ArchivePanel) => self.archive.handle_key(key, s),
            Some(ComponentId::ContactPanel) => self.contact.handle_key(key, s),
            _ => vec![],
        }
    }

    // ── Mouse handling ────────────────────────────────────────────────────────

    fn handle_mouse(&mut self, event: MouseEvent) -> Vec<Action> {
        let is_click = matches!(
            event.kind,
            MouseEventKind::Down(_) | MouseEventKind::ScrollUp | MouseEventKind::ScrollDown
        );
        if !is_click {
            return vec![];
        }

        let col = event.column;
        let row = event.row;

        fn hit(r: Rect, col: u16, row: u16) -> bool {
            r.width > 0
                && r.height > 0
                && col >= r.x
                && col < r.x + r.width
                && row >= r.y
                && row < r.y + r.height
        }

        let areas = self.pane_areas.clone();
        let s = &self.state;

        // Focus follows the click.
        macro_rules! click_pane {
            ($id:expr, $component:expr, $area:expr) => {{
                let mut actions = $component.handle_mouse(event, $area, s);
                if !self.focus.is_focused($id) {
                    actions.insert(0, Action::FocusPane($id));
                }
                return actions;
            }};
        }

        if self.menu.visible {
            if hit(areas.menu, col, row) {
                return self.menu.handle_mouse(event, areas.menu, s);
            }
            return vec![];
        }
        if self.help.visible {
            return vec![];
        }

        if hit(areas.player_bar, col, row) {
            return self.player_bar.handle_mouse(event, areas.player_bar, s);
        }
        match s.section {
            Section::Projects => {
                if hit(areas.project_list, col, row) {
                    click_pane!(ComponentId::ProjectList, self.project_list, areas.project_list);
                }
                if hit(areas.project_detail, col, row) {
                    click_pane!(ComponentId::ProjectDetail, self.project_detail, areas.project_detail);
                }
            }
            Section::Versatility => {
                if hit(areas.versatility, col, row) {
                    click_pane!(ComponentId::VersatilityList, self.versatility, areas.versatility);
                }
            }
            Section::Archive => {
                if hit(areas.archive, col, row) {
                    click_pane!(ComponentId::ArchivePanel, self.archive, areas.archive);
                }
            }
            Section::Connect => {
                if hit(areas.contact, col, row) {
                    click_pane!(ComponentId::ContactPanel, self.contact, areas.contact);
                }
            }
        }

        vec![]
    }

    // ── Action dispatcher ─────────────────────────────────────────────────────

    async fn dispatch(&mut self, action: Action) {
        // Broadcast to all components first so overlays and lists can react.
        let secondary: Vec<Action> = {
            let s = &self.state;
            let mut out = Vec::new();
            out.extend(self.project_list.on_action(&action, s));
            out.extend(self.project_detail.on_action(&action, s));
            out.extend(self.versatility.on_action(&action, s));
            out.extend(self.archive.on_action(&action, s));
            out.extend(self.contact.on_action(&action, s));
            out.extend(self.menu.on_action(&action, s));
            out.extend(self.help.on_action(&action, s));
            out
        };

        self.apply_action(action).await;

        // Secondary actions are applied once, not re-broadcast.
        for a in secondary {
            self.apply_action(a).await;
        }
    }

    async fn apply_action(&mut self, action: Action) {
        debug!("apply_action: {:?}", action);
        match action {
            // ── Playback ──────────────────────────────────────────────────────
            Action::SelectTrack(track_id) => self.send_cmd(Command::SelectTrack { track_id }).await,
            Action::TogglePause => self.send_cmd(Command::TogglePause).await,
            Action::Next => self.send_cmd(Command::Next).await,
            Action::Prev => self.send_cmd(Command::Prev).await,
            Action::Stop => self.send_cmd(Command::Stop).await,
            Action::Volume(value) => self.send_cmd(Command::Volume { value }).await,
            Action::SeekRelative(seconds) => {
                self.send_cmd(Command::SeekRelative { seconds }).await
            }

            // ── Navigation ────────────────────────────────────────────────────
            Action::FocusNext => {
                self.focus.next();
            }
            Action::FocusPrev => {
                self.focus.prev();
            }
            Action::FocusPane(id) => self.focus.set(id),
            Action::GoToSection(section) => {
                if self.state.section != section {
                    self.state.section = section;
                    self.focus.set_items(section.panes());
                }
            }
            Action::ShowProject(id) => self.state.selected_project = Some(id),

            // ── Concept ───────────────────────────────────────────────────────
            Action::RequestConcept(project_id) => self.spawn_concept_request(project_id),

            // ── UI toggles ────────────────────────────────────────────────────
            // Overlay visibility lives in the overlays (see on_action).
            Action::ToggleMenu | Action::ToggleHelp => {}
            Action::ToggleKeys => self.show_keys_bar = !self.show_keys_bar,
            Action::CopyToClipboard(text) => {
                match arboard::Clipboard::new().and_then(|mut cb| cb.set_text(text.clone())) {
                    Ok(()) => {
                        let display = if text.chars().count() > 40 {
                            format!("{}…", text.chars().take(40).collect::<String>())
                        } else {
                            text.clone()
                        };
                        self.toast.success(format!("copied: {}", display));
                    }
                    Err(e) => {
                        warn!("clipboard error: {}", e);
                        self.toast.error(format!("clipboard error: {}", e));
                    }
                }
            }

            // ── System ────────────────────────────────────────────────────────
            Action::Quit => self.should_quit = true,
        }
    }

    fn spawn_concept_request(&mut self, project_id: String) {
        let Some(project) = self.state.catalog.project(&project_id) else {
            warn!("concept requested for unknown project {}", project_id);
            return;
        };
        if self.state.concepts.concept(&project_id).is_some()
            || self.state.concepts.is_in_flight(&project_id)
        {
            return;
        }
        let Some(tx) = self.msg_tx.clone() else {
            return;
        };
        let gateway = self.state.concepts.clone();
        let title = project.title.clone();
        let mood = project.mood.clone();
        self.concepts_pending += 1;
        tokio::spawn(async move {
            let outcome = gateway.request_concept(&project_id, &title, &mood).await;
            let _ = tx
                .send(AppMessage::ConceptResolved {
                    project_id,
                    title,
                    outcome,
                })
                .await;
        });
    }

    async fn send_cmd(&self, cmd: Command) {
        if self.cmd_tx.send(CoreEvent::Command(cmd)).await.is_err() {
            warn!("player core is gone; command dropped");
        }
    }

    // ── Drawing ───────────────────────────────────────────────────────────────

    fn draw(&mut self, frame: &mut ratatui::Frame) {
        use crate::theme::C_BG;
        use ratatui::widgets::Block;
        let area = frame.area();

        frame.render_widget(
            Block::default().style(ratatui::style::Style::default().bg(C_BG)),
            area,
        );

        // ── Outer layout: header | body | (player bar) | (keys bar) ──────────
        let player_h = if player_bar::visible(&self.state.player) {
            player_bar::HEIGHT
        } else {
            0
        };
        let keys_h = if self.show_keys_bar { 1u16 } else { 0 };

        let outer = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(header::HEIGHT),
                Constraint::Min(0),
                Constraint::Length(player_h),
                Constraint::Length(keys_h),
            ])
            .split(area);

        self.header.draw(frame, outer[0], &self.state);
        self.draw_body(frame, outer[1]);

        self.pane_areas.player_bar = outer[2];
        self.player_bar.draw(frame, outer[2], false, &self.state);

        if self.show_keys_bar {
            status_bar::draw_keys_bar(frame, outer[3], self.state.section);
        }

        // ── Overlays (on top of everything) ──────────────────────────────────
        if self.menu.visible {
            self.pane_areas.menu = self.menu.popup_area(area);
            self.menu.draw(frame, area, true, &self.state);
        } else {
            self.pane_areas.menu = Rect::default();
        }
        self.help.draw(frame, area, false, &self.state);

        // ── Toast notifications (topmost layer) ──────────────────────────────
        self.toast.draw(frame, area);
    }

    fn draw_body(&mut self, frame: &mut ratatui::Frame, area: Rect) {
        self.pane_areas = PaneAreas {
            player_bar: self.pane_areas.player_bar,
            menu: self.pane_areas.menu,
            ..PaneAreas::default()
        };
        let s = &self.state;
        match s.section {
            Section::Projects => {
                let cols = Layout::default()
                    .direction(Direction::Horizontal)
                    .constraints([Constraint::Percentage(40), Constraint::Percentage(60)])
                    .split(area);
                let list_focused = self.focus.is_focused(ComponentId::ProjectList);
                let detail_focused = self.focus.is_focused(ComponentId::ProjectDetail);
                self.project_list.draw(frame, cols[0], list_focused, s);
                self.project_detail.draw(frame, cols[1], detail_focused, s);
                self.pane_areas.project_list = cols[0];
                self.pane_areas.project_detail = cols[1];
            }
            Section::Versatility => {
                let focused = self.focus.is_focused(ComponentId::VersatilityList);
                self.versatility.draw(frame, area, focused, s);
                self.pane_areas.versatility = area;
            }
            Section::Archive => {
                let focused = self.focus.is_focused(ComponentId::ArchivePanel);
                self.archive.draw(frame, area, focused, s);
                self.pane_areas.archive = area;
            }
            Section::Connect => {
                let focused = self.focus.is_focused(ComponentId::ContactPanel);
                self.contact.draw(frame, area, focused, s);
                self.pane_areas.contact = area;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app_state::test_support::key;
    use vein_proto::concept::{ConceptGateway, GeminiGenerator};
    use vein_proto::config::ConceptConfig;

    fn app() -> (App, mpsc::Receiver<CoreEvent>) {
        let (cmd_tx, cmd_rx) = mpsc::channel(16);
        let dir = tempfile::tempdir().unwrap();
        let state_manager = Arc::new(StateManager::new(dir.path().join("state.json"), 0.5));
        let config = ConceptConfig {
            api_key: None,
            api_key_env: "VEIN_TEST_NO_SUCH_KEY".into(),
            ..ConceptConfig::default()
        };
        let app = App::new(
            Arc::new(Catalog::builtin()),
            ConceptGateway::new(GeminiGenerator::from_config(&config)),
            cmd_tx,
            state_manager,
        );
        (app, cmd_rx)
    }

    async fn press(app: &mut App, code: KeyCode) {
        for a in app.handle_key(key(code)) {
            app.dispatch(a).await;
        }
    }

    #[tokio::test]
    async fn enter_on_track_sends_select_command() {
        let (mut app, mut rx) = app();
        press(&mut app, KeyCode::Down).await;
        press(&mut app, KeyCode::Enter).await;
        match rx.try_recv() {
            Ok(CoreEvent::Command(Command::SelectTrack { track_id })) => assert_eq!(track_id, "t1"),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[tokio::test]
    async fn number_keys_switch_sections_and_focus() {
        let (mut app, _rx) = app();
        press(&mut app, KeyCode::Char('2')).await;
        assert_eq!(app.state.section, Section::Versatility);
        assert_eq!(app.focus.current(), Some(ComponentId::VersatilityList));
        press(&mut app, KeyCode::Enter).await;
        press(&mut app, KeyCode::Char('1')).await;
        assert_eq!(app.focus.current(), Some(ComponentId::ProjectList));
    }

    #[tokio::test]
    async fn menu_captures_keys_until_closed() {
        let (mut app, mut rx) = app();
        press(&mut app, KeyCode::Char('m')).await;
        assert!(app.menu.visible);
        // Space is swallowed by the menu rather than toggling playback.
        press(&mut app, KeyCode::Char(' ')).await;
        assert!(rx.try_recv().is_err());
        press(&mut app, KeyCode::Char('3')).await;
        assert!(!app.menu.visible);
        assert_eq!(app.state.section, Section::Archive);
    }

    #[tokio::test]
    async fn volume_keys_step_and_clamp() {
        let (mut app, mut rx) = app();
        app.state.player.volume = 0.98;
        press(&mut app, KeyCode::Right).await;
        match rx.try_recv() {
            Ok(CoreEvent::Command(Command::Volume { value })) => assert_eq!(value, 1.0),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[tokio::test]
    async fn state_updates_toast_new_errors_once() {
        let (mut app, _rx) = app();
        let failed = PlayerState {
            rev: 3,
            last_error: Some("no audio source".into()),
            ..Default::default()
        };
        app.on_state_updated(failed.clone());
        assert_eq!(app.toast.len(), 1);
        app.on_state_updated(PlayerState { rev: 4, ..failed });
        assert_eq!(app.toast.len(), 1);
    }

    #[tokio::test]
    async fn concept_without_key_warns() {
        let (mut app, _rx) = app();
        let (tx, mut msg_rx) = mpsc::channel(4);
        app.msg_tx = Some(tx);
        press(&mut app, KeyCode::Char('c')).await;
        let msg = msg_rx.recv().await.expect("concept message");
        app.handle_message(msg).await;
        assert_eq!(app.concepts_pending, 0);
        assert_eq!(app.toast.len(), 1);
        assert!(app.state.concepts.concept("p1").is_none());
    }
}
