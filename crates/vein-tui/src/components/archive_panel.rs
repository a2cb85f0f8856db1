//! ArchivePanel: AURAL ARCHIVE playlists.
//!
//! The playlists are embedded players on the web; a terminal can only show
//! where they live, so the embed URL is copyable.

use ratatui::crossterm::event::{KeyCode, KeyEvent, KeyEventKind, MouseButton, MouseEvent, MouseEventKind};
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Paragraph, Wrap},
    Frame,
};

use crate::{
    action::{Action, ComponentId, Section},
    app_state::AppState,
    component::Component,
    theme::{style_heading, style_row, C_MUTED, C_SECONDARY, C_TEAL},
    widgets::{
        pane_chrome::pane_chrome,
        scrollable_list::{Click, ScrollableList},
    },
};

pub const SUBTITLE: &str = "The sounds that shape the vision.";

/// The credit line printed under each playlist.
pub fn source_line(description: &str) -> String {
    format!("SOURCE: APPLE MUSIC API // {}", description)
}

pub struct ArchivePanel {
    list: ScrollableList<usize>,
}

impl ArchivePanel {
    pub fn new(len: usize) -> Self {
        Self {
            list: ScrollableList::new((0..len).collect()),
        }
    }

    fn copy_selected(&self, state: &AppState) -> Vec<Action> {
        self.list
            .selected_item()
            .and_then(|&i| state.catalog.playlists.get(i))
            .map(|p| vec![Action::CopyToClipboard(p.embed_url.clone())])
            .unwrap_or_default()
    }
}

impl Component for ArchivePanel {
    fn id(&self) -> ComponentId {
        ComponentId::ArchivePanel
    }

    fn handle_key(&mut self, key: KeyEvent, state: &AppState) -> Vec<Action> {
        if key.kind == KeyEventKind::Release || self.list.handle_nav_key(key.code) {
            return vec![];
        }
        match key.code {
            KeyCode::Enter | KeyCode::Char('y') => self.copy_selected(state),
            _ => vec![],
        }
    }

    fn handle_mouse(&mut self, event: MouseEvent, area: Rect, state: &AppState) -> Vec<Action> {
        if event.row < area.y + 2 {
            return vec![];
        }
        let rel_row = (event.row - area.y - 2) as usize;
        match event.kind {
            MouseEventKind::ScrollUp => self.list.select_up(1),
            MouseEventKind::ScrollDown => self.list.select_down(1),
            MouseEventKind::Down(MouseButton::Left) => {
                if self.list.click(rel_row) == Click::Double {
                    return self.copy_selected(state);
                }
            }
            _ => {}
        }
        vec![]
    }

    fn draw(&mut self, frame: &mut Frame, area: Rect, focused: bool, state: &AppState) {
        let block = pane_chrome(Section::Archive.label(), Some('3'), focused, None);
        let inner = block.inner(area);
        frame.render_widget(block, area);

        let parts = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(1), Constraint::Min(1), Constraint::Length(5)])
            .split(inner);

        frame.render_widget(
            Paragraph::new(Span::styled(
                format!(" {}", SUBTITLE.to_uppercase()),
                Style::default().fg(C_SECONDARY).add_modifier(Modifier::ITALIC),
            )),
            parts[0],
        );

        let height = parts[1].height as usize;
        self.list.ensure_visible(height);
        let lines: Vec<Line> = self
            .list
            .visible_items(height)
            .filter_map(|(row, &i)| {
                let playlist = state.catalog.playlists.get(i)?;
                let base = style_row(row == self.list.selected, focused);
                Some(Line::from(vec![
                    Span::styled(" ♫ ", base.fg(C_TEAL)),
                    Span::styled(playlist.title.clone(), base.add_modifier(Modifier::BOLD)),
                    Span::styled(format!("  {}", playlist.description), base.fg(C_SECONDARY)),
                ]))
            })
            .collect();
        frame.render_widget(Paragraph::new(lines), parts[1]);

        let detail = match self.list.selected_item().and_then(|&i| state.catalog.playlists.get(i)) {
            Some(playlist) => vec![
                Line::from(Span::styled("EMBED", style_heading())),
                Line::from(Span::styled(
                    playlist.embed_url.clone(),
                    Style::default().fg(C_SECONDARY),
                )),
                Line::from(Span::styled(
                    source_line(&playlist.description),
                    Style::default().fg(C_MUTED),
                )),
                Line::from(Span::styled(
                    "Enter / y copies the link",
                    Style::default().fg(C_MUTED),
                )),
            ],
            None => vec![Line::from(Span::styled(
                " no playlists",
                Style::default().fg(C_MUTED),
            ))],
        };
        frame.render_widget(Paragraph::new(detail).wrap(Wrap { trim: true }), parts[2]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app_state::test_support::{key, state};

    #[test]
    fn enter_copies_embed_url() {
        let state = state();
        let mut panel = ArchivePanel::new(state.catalog.playlists.len());
        panel.handle_key(key(KeyCode::Char('j')), &state);
        let expected = state.catalog.playlists[1].embed_url.clone();
        assert_eq!(
            panel.handle_key(key(KeyCode::Char('y')), &state),
            vec![Action::CopyToClipboard(expected)]
        );
    }

    #[test]
    fn source_line_credits_the_playlist() {
        let state = state();
        assert_eq!(
            source_line(&state.catalog.playlists[1].description),
            "SOURCE: APPLE MUSIC API // For the empty highways."
        );
    }
}
