//! VersatilityList: the flat genre-tagged track list.

use ratatui::crossterm::event::{KeyCode, KeyEvent, KeyEventKind, MouseButton, MouseEvent, MouseEventKind};
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};
use unicode_width::UnicodeWidthStr;

use crate::{
    action::{Action, ComponentId, Section},
    app_state::AppState,
    component::Component,
    theme::{status_color, style_row, C_MUTED, C_SECONDARY, C_TAG},
    widgets::{
        pane_chrome::pane_chrome,
        scrollable_list::{Click, ScrollableList},
    },
};

pub const SUBTITLE: &str = "Exploring the sonic spectrum. No boundaries, only frequencies.";
const ROW_LABEL: &str = "Production / Experiment";

pub struct VersatilityList {
    /// Indices into `catalog.versatility`.
    list: ScrollableList<usize>,
}

impl VersatilityList {
    pub fn new(len: usize) -> Self {
        Self {
            list: ScrollableList::new((0..len).collect()),
        }
    }

    fn activate(&self, state: &AppState) -> Vec<Action> {
        self.list
            .selected_item()
            .and_then(|&i| state.catalog.versatility.get(i))
            .map(|t| vec![Action::SelectTrack(t.id.clone())])
            .unwrap_or_default()
    }
}

impl Component for VersatilityList {
    fn id(&self) -> ComponentId {
        ComponentId::VersatilityList
    }

    fn handle_key(&mut self, key: KeyEvent, state: &AppState) -> Vec<Action> {
        if key.kind == KeyEventKind::Release || self.list.handle_nav_key(key.code) {
            return vec![];
        }
        match key.code {
            KeyCode::Enter => self.activate(state),
            _ => vec![],
        }
    }

    fn handle_mouse(&mut self, event: MouseEvent, area: Rect, state: &AppState) -> Vec<Action> {
        // Border and subtitle rows sit above the list.
        if event.row < area.y + 2 {
            return vec![];
        }
        let rel_row = (event.row - area.y - 2) as usize;
        match event.kind {
            MouseEventKind::ScrollUp => self.list.select_up(1),
            MouseEventKind::ScrollDown => self.list.select_down(1),
            MouseEventKind::Down(MouseButton::Left) => {
                if self.list.click(rel_row) == Click::Double {
                    return self.activate(state);
                }
            }
            _ => {}
        }
        vec![]
    }

    fn draw(&mut self, frame: &mut Frame, area: Rect, focused: bool, state: &AppState) {
        let block = pane_chrome(Section::Versatility.label(), Some('2'), focused, None);
        let inner = block.inner(area);
        frame.render_widget(block, area);

        let parts = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(1), Constraint::Min(0)])
            .split(inner);
        frame.render_widget(
            Paragraph::new(Span::styled(
                format!(" {}", SUBTITLE.to_uppercase()),
                Style::default().fg(C_SECONDARY).add_modifier(Modifier::ITALIC),
            )),
            parts[0],
        );
        let inner = parts[1];

        let height = inner.height as usize;
        self.list.ensure_visible(height);
        let title_w = state
            .catalog
            .versatility
            .iter()
            .map(|t| t.title.width())
            .max()
            .unwrap_or(0);

        let lines: Vec<Line> = self
            .list
            .visible_items(height)
            .filter_map(|(row, &i)| {
                let track = state.catalog.versatility.get(i)?;
                let base = style_row(row == self.list.selected, focused);
                let (glyph, glyph_style) = if state.player.is_current(&track.id) {
                    let status = state.player.playback_status;
                    (status.glyph(), base.fg(status_color(status)))
                } else {
                    ("·", base.fg(C_MUTED))
                };
                let pad = title_w.saturating_sub(track.title.width());
                Some(Line::from(vec![
                    Span::styled(format!(" {} ", glyph), glyph_style),
                    Span::styled(format!("{}{}", track.title, " ".repeat(pad)), base),
                    Span::styled(format!("  [{}]", track.genre), base.fg(C_TAG)),
                    Span::styled(format!("  {}", track.artist), base.fg(C_SECONDARY)),
                    Span::styled(format!("  {}", track.duration), base.fg(C_MUTED)),
                    Span::styled(format!("  {}", ROW_LABEL.to_uppercase()), base.fg(C_MUTED)),
                ]))
            })
            .collect();

        if lines.is_empty() {
            frame.render_widget(
                Paragraph::new(Span::styled(" no tracks", Style::default().fg(C_MUTED))),
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
    fn enter_taps_highlighted_track() {
        let state = state();
        let mut list = VersatilityList::new(state.catalog.versatility.len());
        list.handle_key(key(KeyCode::End), &state);
        assert_eq!(
            list.handle_key(key(KeyCode::Enter), &state),
            vec![Action::SelectTrack("v3".into())]
        );
    }

    fn left_click(row: u16) -> MouseEvent {
        MouseEvent {
            kind: MouseEventKind::Down(MouseButton::Left),
            column: 4,
            row,
            modifiers: ratatui::crossterm::event::KeyModifiers::NONE,
        }
    }

    #[test]
    fn double_click_below_subtitle_plays_first_track() {
        let state = state();
        let mut list = VersatilityList::new(state.catalog.versatility.len());
        let area = Rect::new(0, 5, 60, 10);
        // The subtitle row is not a track.
        assert!(list.handle_mouse(left_click(6), area, &state).is_empty());
        assert!(list.handle_mouse(left_click(6), area, &state).is_empty());

        assert!(list.handle_mouse(left_click(7), area, &state).is_empty());
        assert_eq!(
            list.handle_mouse(left_click(7), area, &state),
            vec![Action::SelectTrack("v1".into())]
        );
    }

    #[test]
    fn empty_list_does_nothing() {
        let state = state();
        let mut list = VersatilityList::new(0);
        assert!(list.handle_key(key(KeyCode::Enter), &state).is_empty());
    }
}
