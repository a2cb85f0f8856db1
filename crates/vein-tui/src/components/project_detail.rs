//! ProjectDetail: right pane of the PROJECTS section.
//!
//! Year, mood, description, roles, visuals, the generated concept and the
//! project's tracks.

use ratatui::crossterm::event::{KeyCode, KeyEvent, KeyEventKind, MouseButton, MouseEvent, MouseEventKind};
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Paragraph, Wrap},
    Frame,
};

use vein_proto::catalog::Project;
use vein_proto::concept::{ConceptGateway, TextGenerator};

use crate::{
    action::{Action, ComponentId},
    app_state::AppState,
    component::Component,
    theme::{
        status_color, style_heading, style_row, C_ACCENT, C_LOADING, C_MUTED, C_PRIMARY,
        C_SECONDARY, C_TEAL,
    },
    widgets::{
        pane_chrome::{pane_chrome, Badge},
        scrollable_list::{Click, ScrollableList},
    },
};

pub const AWAITING_TEXT: &str =
    ">> Awaiting neural link connection to reveal hidden meaning...";
pub const DECODING_TEXT: &str = "DECODING...";

/// What the concept panel shows for one project.
#[derive(Debug, Clone, PartialEq)]
pub enum ConceptView {
    Revealed(String),
    Decoding,
    Awaiting,
}

impl ConceptView {
    /// A cached text wins over an outstanding request.
    pub fn from_parts(cached: Option<String>, in_flight: bool) -> Self {
        match cached {
            Some(text) => ConceptView::Revealed(text),
            None if in_flight => ConceptView::Decoding,
            None => ConceptView::Awaiting,
        }
    }

    pub fn of<G: TextGenerator>(gateway: &ConceptGateway<G>, project_id: &str) -> Self {
        Self::from_parts(
            gateway.concept(project_id),
            gateway.is_in_flight(project_id),
        )
    }

    pub fn text(&self) -> &str {
        match self {
            ConceptView::Revealed(text) => text,
            ConceptView::Decoding => DECODING_TEXT,
            ConceptView::Awaiting => AWAITING_TEXT,
        }
    }
}

pub struct ProjectDetail {
    project_id: Option<String>,
    /// Track ids of the shown project.
    tracks: ScrollableList<String>,
}

impl ProjectDetail {
    pub fn new() -> Self {
        Self {
            project_id: None,
            tracks: ScrollableList::new(Vec::new()),
        }
    }

    /// Follow the project chosen in `AppState`, resetting the cursor when it
    /// changes.
    fn sync(&mut self, state: &AppState) {
        let Some(project) = state.project() else {
            self.project_id = None;
            self.tracks.set_items(Vec::new());
            return;
        };
        if self.project_id.as_deref() != Some(project.id.as_str()) {
            self.project_id = Some(project.id.clone());
            self.tracks = ScrollableList::new(project.tracks.iter().map(|t| t.id.clone()).collect());
        }
    }

    fn select_selected(&self) -> Vec<Action> {
        self.tracks
            .selected_item()
            .map(|id| vec![Action::SelectTrack(id.clone())])
            .unwrap_or_default()
    }

    fn info_lines(project: &Project, concept: &ConceptView) -> Vec<Line<'static>> {
        let mut lines = vec![
            Line::from(vec![
                Span::styled(project.year.clone(), Style::default().fg(C_TEAL)),
                Span::styled("  ·  ", Style::default().fg(C_MUTED)),
                Span::styled(project.mood.clone(), Style::default().fg(C_SECONDARY)),
            ]),
            Line::from(""),
            Line::from(Span::styled(
                project.description.clone(),
                Style::default().fg(C_PRIMARY),
            )),
            Line::from(""),
            Line::from(vec![
                Span::styled("ROLES    ", style_heading()),
                Span::styled(project.roles.join(" · "), Style::default().fg(C_SECONDARY)),
            ]),
            Line::from(vec![
                Span::styled("VISUALS  ", style_heading()),
                Span::styled(
                    format!("{} frames", project.visuals.len()),
                    Style::default().fg(C_SECONDARY),
                ),
            ]),
            Line::from(""),
            Line::from(vec![
                Span::styled("CONCEPT  ", style_heading()),
                Span::styled("[c] generate", Style::default().fg(C_MUTED)),
            ]),
        ];
        let concept_style = match concept {
            ConceptView::Revealed(_) => Style::default().fg(C_ACCENT).add_modifier(Modifier::ITALIC),
            ConceptView::Decoding => Style::default().fg(C_LOADING).add_modifier(Modifier::BOLD),
            ConceptView::Awaiting => Style::default().fg(C_MUTED),
        };
        lines.push(Line::from(Span::styled(concept.text().to_string(), concept_style)));
        lines
    }
}

impl Component for ProjectDetail {
    fn id(&self) -> ComponentId {
        ComponentId::ProjectDetail
    }

    fn handle_key(&mut self, key: KeyEvent, state: &AppState) -> Vec<Action> {
        if key.kind == KeyEventKind::Release {
            return vec![];
        }
        self.sync(state);
        if self.tracks.handle_nav_key(key.code) {
            return vec![];
        }
        match key.code {
            KeyCode::Enter => self.select_selected(),
            KeyCode::Char('c') => self
                .project_id
                .clone()
                .map(|id| vec![Action::RequestConcept(id)])
                .unwrap_or_default(),
            _ => vec![],
        }
    }

    fn handle_mouse(&mut self, event: MouseEvent, area: Rect, state: &AppState) -> Vec<Action> {
        self.sync(state);
        // Track rows sit at the bottom of the pane, above the border.
        let tracks_top = (area.y + area.height)
            .saturating_sub(1)
            .saturating_sub(self.tracks.len() as u16);
        match event.kind {
            MouseEventKind::ScrollUp => self.tracks.select_up(1),
            MouseEventKind::ScrollDown => self.tracks.select_down(1),
            MouseEventKind::Down(MouseButton::Left) if event.row >= tracks_top => {
                if self.tracks.click((event.row - tracks_top) as usize) == Click::Double {
                    return self.select_selected();
                }
            }
            _ => {}
        }
        vec![]
    }

    fn on_action(&mut self, action: &Action, state: &AppState) -> Vec<Action> {
        if let Action::ShowProject(_) = action {
            self.sync(state);
        }
        vec![]
    }

    fn draw(&mut self, frame: &mut Frame, area: Rect, focused: bool, state: &AppState) {
        self.sync(state);
        let Some(project) = state.project() else {
            let block = pane_chrome("PROJECT", None, focused, None);
            frame.render_widget(block, area);
            return;
        };

        let playing_here = state
            .player
            .current_track
            .as_ref()
            .map_or(false, |t| project.tracks.iter().any(|pt| pt.id == t.id));
        let badge = playing_here.then(|| Badge {
            text: state.player.playback_status.glyph(),
            color: status_color(state.player.playback_status),
        });
        let block = pane_chrome(&project.title, None, focused, badge);
        let inner = block.inner(area);
        frame.render_widget(block, area);

        let track_h = (self.tracks.len() as u16 + 1).min(inner.height / 2);
        let parts = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(0), Constraint::Length(track_h)])
            .split(inner);

        let concept = ConceptView::of(&state.concepts, &project.id);
        frame.render_widget(
            Paragraph::new(Self::info_lines(project, &concept)).wrap(Wrap { trim: false }),
            parts[0],
        );

        let list_h = parts[1].height.saturating_sub(1) as usize;
        self.tracks.ensure_visible(list_h);
        let mut lines = vec![Line::from(Span::styled("TRACKS", style_heading()))];
        for (i, id) in self.tracks.visible_items(list_h) {
            let Some(track) = project.tracks.iter().find(|t| &t.id == id) else {
                continue;
            };
            let base = style_row(i == self.tracks.selected, focused);
            let (glyph, glyph_style) = if state.player.is_current(id) {
                let status = state.player.playback_status;
                (status.glyph(), base.fg(status_color(status)))
            } else {
                ("·", base.fg(C_MUTED))
            };
            lines.push(Line::from(vec![
                Span::styled(format!(" {} ", glyph), glyph_style),
                Span::styled(track.title.clone(), base),
                Span::styled(format!("  {}", track.artist), base.fg(C_SECONDARY)),
                Span::styled(format!("  {}", track.duration), base.fg(C_MUTED)),
            ]));
        }
        frame.render_widget(Paragraph::new(lines), parts[1]);
    }
}
