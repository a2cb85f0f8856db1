//! ContactPanel: CONNECT socials and the copyright footer.

use chrono::Datelike;
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
    theme::{style_row, C_MUTED, C_SECONDARY, C_TEAL},
    widgets::{
        pane_chrome::pane_chrome,
        scrollable_list::{Click, ScrollableList},
    },
};

pub fn footer_text(year: i32) -> String {
    format!("VEIN © {} // ALL RIGHTS RESERVED", year)
}

const CREDIT: &str = "DESIGNED BY AI // CURATED BY HUMAN";

pub struct ContactPanel {
    list: ScrollableList<usize>,
}

impl ContactPanel {
    pub fn new(len: usize) -> Self {
        Self {
            list: ScrollableList::new((0..len).collect()),
        }
    }

    fn copy_selected(&self, state: &AppState) -> Vec<Action> {
        self.list
            .selected_item()
            .and_then(|&i| state.catalog.socials.get(i))
            .map(|s| vec![Action::CopyToClipboard(s.url.clone())])
            .unwrap_or_default()
    }
}

impl Component for ContactPanel {
    fn id(&self) -> ComponentId {
        ComponentId::ContactPanel
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
        let rel_row = event.row.saturating_sub(area.y + 1) as usize;
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
        let block = pane_chrome(Section::Connect.label(), Some('4'), focused, None);
        let inner = block.inner(area);
        frame.render_widget(block, area);

        let parts = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(0), Constraint::Length(2)])
            .split(inner);

        let platform_w = state
            .catalog
            .socials
            .iter()
            .map(|s| s.platform.width())
            .max()
            .unwrap_or(0);

        let height = parts[0].height as usize;
        self.list.ensure_visible(height);
        let lines: Vec<Line> = self
            .list
            .visible_items(height)
            .filter_map(|(row, &i)| {
                let social = state.catalog.socials.get(i)?;
                let base = style_row(row == self.list.selected, focused);
                let pad = platform_w.saturating_sub(social.platform.width());
                Some(Line::from(vec![
                    Span::styled(
                        format!(" {}{}  ", social.platform, " ".repeat(pad)),
                        base.fg(C_TEAL).add_modifier(Modifier::BOLD),
                    ),
                    Span::styled(social.label.clone(), base),
                    Span::styled(format!("  {}", social.url), base.fg(C_MUTED)),
                ]))
            })
            .collect();
        frame.render_widget(Paragraph::new(lines), parts[0]);

        frame.render_widget(
            Paragraph::new(vec![
                Line::from(Span::styled(
                    footer_text(chrono::Local::now().year()),
                    Style::default().fg(C_SECONDARY),
                )),
                Line::from(Span::styled(CREDIT, Style::default().fg(C_MUTED))),
            ])
            .centered(),
            parts[1],
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app_state::test_support::{key, state};

    #[test]
    fn footer_carries_the_year() {
        assert_eq!(footer_text(2026), "VEIN © 2026 // ALL RIGHTS RESERVED");
    }

    #[test]
    fn enter_copies_social_url() {
        let state = state();
        let mut panel = ContactPanel::new(state.catalog.socials.len());
        panel.handle_key(key(KeyCode::Down), &state);
        panel.handle_key(key(KeyCode::Down), &state);
        assert_eq!(
            panel.handle_key(key(KeyCode::Enter), &state),
            vec![Action::CopyToClipboard("mailto:contact@vein.art".into())]
        );
    }
}
