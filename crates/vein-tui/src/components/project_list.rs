//! ProjectList: left pane of the PROJECTS section.
//!
//! Each project is a header row followed by its tracks.  The cursor drives
//! the detail pane; Enter on a track taps it.

use ratatui::crossterm::event::{KeyCode, KeyEvent, KeyEventKind, MouseButton, MouseEvent, MouseEventKind};
use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};

use vein_proto::catalog::Catalog;

use crate::{
    action::{Action, ComponentId, Section},
    app_state::AppState,
    component::Component,
    theme::{status_color, style_row, C_MUTED, C_SECONDARY, C_TEAL},
    widgets::{
        pane_chrome::pane_chrome,
        scrollable_list::{Click, ScrollableList},
    },
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Row {
    Project(usize),
    Track(usize, usize),
}

impl Row {
    fn project(self) -> usize {
        match self {
            Row::Project(p) | Row::Track(p, _) => p,
        }
    }
}

fn rows(catalog: &Catalog) -> Vec<Row> {
    catalog
        .projects
        .iter()
        .enumerate()
        .flat_map(|(p, project)| {
            std::iter::once(Row::Project(p)).chain((0..project.tracks.len()).map(move |t| Row::Track(p, t)))
        })
        .collect()
}

pub struct ProjectList {
    list: ScrollableList<Row>,
}

impl ProjectList {
    pub fn new(catalog: &Catalog) -> Self {
        Self {
            list: ScrollableList::new(rows(catalog)),
        }
    }

    fn project_id<'a>(&self, state: &'a AppState) -> Option<&'a str> {
        let row = self.list.selected_item()?;
        state.catalog.projects.get(row.project()).map(|p| p.id.as_str())
    }

    fn follow(&self, state: &AppState) -> Vec<Action> {
        match self.project_id(state) {
            Some(id) if state.selected_project.as_deref() != Some(id) => {
                vec![Action::ShowProject(id.to_string())]
            }
            _ => vec![],
        }
    }

    fn activate(&self, state: &AppState) -> Vec<Action> {
        match self.list.selected_item() {
            Some(Row::Track(p, t)) => state
                .catalog
                .projects
                .get(*p)
                .and_then(|project| project.tracks.get(*t))
                .map(|track| vec![Action::SelectTrack(track.id.clone())])
                .unwrap_or_default(),
            Some(Row::Project(p)) => match state.catalog.projects.get(*p) {
                Some(project) => vec![
                    Action::ShowProject(project.id.clone()),
                    Action::FocusPane(ComponentId::ProjectDetail),
                ],
                None => vec![],
            },
            None => vec![],
        }
    }

    fn row_line(&self, row: Row, selected: bool, focused: bool, state: &AppState) -> Line<'static> {
        let base = style_row(selected, focused);
        match row {
            Row::Project(p) => {
                let Some(project) = state.catalog.projects.get(p) else {
                    return Line::from("");
                };
                Line::from(vec![
                    Span::styled(format!(" {:02} ", p + 1), base.fg(C_MUTED)),
                    Span::styled(project.title.clone(), base.add_modifier(Modifier::BOLD)),
                    Span::styled(format!("  {}", project.year), base.fg(C_TEAL)),
                ])
            }
            Row::Track(p, t) => {
                let Some(track) = state.catalog.projects.get(p).and_then(|pr| pr.tracks.get(t))
                else {
                    return Line::from("");
                };
                let (glyph, glyph_style) = if state.player.is_current(&track.id) {
                    let status = state.player.playback_status;
                    (status.glyph(), base.fg(status_color(status)))
                } else {
                    ("·", base.fg(C_MUTED))
                };
                Line::from(vec![
                    Span::styled("    ", base),
                    Span::styled(format!("{} ", glyph), glyph_style),
                    Span::styled(track.title.clone(), base),
                    Span::styled(format!("  {}", track.duration), base.fg(C_SECONDARY)),
                ])
            }
        }
    }
}

impl Component for ProjectList {
    fn id(&self) -> ComponentId {
        ComponentId::ProjectList
    }

    fn handle_key(&mut self, key: KeyEvent, state: &AppState) -> Vec<Action> {
        if key.kind == KeyEventKind::Release {
            return vec![];
        }
        if self.list.handle_nav_key(key.code) {
            return self.follow(state);
        }
        match key.code {
            KeyCode::Enter => self.activate(state),
            KeyCode::Char('c') => self
                .project_id(state)
                .map(|id| vec![Action::RequestConcept(id.to_string())])
                .unwrap_or_default(),
            _ => vec![],
        }
    }

    fn handle_mouse(&mut self, event: MouseEvent, area: Rect, state: &AppState) -> Vec<Action> {
        let rel_row = event.row.saturating_sub(area.y + 1) as usize;
        match event.kind {
            MouseEventKind::ScrollUp => {
                self.list.select_up(1);
                self.follow(state)
            }
            MouseEventKind::ScrollDown => {
                self.list.select_down(1);
                self.follow(state)
            }
            MouseEventKind::Down(MouseButton::Left) => match self.list.click(rel_row) {
                Click::Double => self.activate(state),
                Click::Single => self.follow(state),
                Click::Miss => vec![],
            },
            _ => vec![],
        }
    }

    fn on_action(&mut self, action: &Action, state: &AppState) -> Vec<Action> {
        // The menu jumps here with the cursor on whatever project is shown.
        if let Action::GoToSection(Section::Projects) = action {
            if let Some(pos) = state
                .selected_project
                .as_deref()
                .and_then(|id| state.catalog.projects.iter().position(|p| p.id == id))
            {
                self.list.select_where(|r| *r == Row::Project(pos));
            }
        }
        vec![]
    }

    fn draw(&mut self, frame: &mut Frame, area: Rect, focused: bool, state: &AppState) {
        let block = pane_chrome(Section::Projects.label(), Some('1'), focused, None);
        let inner = block.inner(area);
        frame.render_widget(block, area);

        let height = inner.height as usize;
        self.list.ensure_visible(height);
        let lines: Vec<Line> = self
            .list
            .visible_items(height)
            .map(|(i, row)| self.row_line(*row, i == self.list.selected, focused, state))
            .collect();

        if lines.is_empty() {
            frame.render_widget(
                Paragraph::new(Span::styled(" no projects", Style::default().fg(C_MUTED))),
                inner,
            );
            return;
        }
        frame.render_widget(Paragraph::new(lines), inner);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app_state::test_support::{key, state};

    #[test]
    fn rows_interleave_projects_and_tracks() {
        let rows = rows(&Catalog::builtin());
        assert_eq!(
            rows,
            vec![
                Row::Project(0),
                Row::Track(0, 0),
                Row::Track(0, 1),
                Row::Project(1),
                Row::Track(1, 0),
            ]
        );
    }

    #[test]
    fn enter_on_track_taps_it() {
        let state = state();
        let mut list = ProjectList::new(&state.catalog);
        list.handle_key(key(KeyCode::Down), &state);
        assert_eq!(
            list.handle_key(key(KeyCode::Enter), &state),
            vec![Action::SelectTrack("t1".into())]
        );
    }

    #[test]
    fn cursor_drives_detail_pane() {
        let mut state = state();
        state.selected_project = Some("p1".into());
        let mut list = ProjectList::new(&state.catalog);
        assert!(list.handle_key(key(KeyCode::Char('j')), &state).is_empty());
        list.handle_key(key(KeyCode::Char('j')), &state);
        assert_eq!(
            list.handle_key(key(KeyCode::Char('j')), &state),
            vec![Action::ShowProject("p2".into())]
        );
        assert_eq!(
            list.handle_key(key(KeyCode::Char('c')), &state),
            vec![Action::RequestConcept("p2".into())]
        );
    }
}
