//! MenuOverlay: centered section menu opened with `m`.

use ratatui::crossterm::event::{KeyCode, KeyEvent, KeyEventKind, MouseButton, MouseEvent, MouseEventKind};
use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph},
    Frame,
};

use crate::{
    action::{Action, ComponentId, Section},
    app_state::AppState,
    component::Component,
    components::help_overlay::centered_rect,
    theme::{style_row, C_MUTED, C_NUMBER_HINT, C_OVERLAY_BG, C_PANEL_BORDER_FOCUSED},
    widgets::scrollable_list::{Click, ScrollableList},
};

pub struct MenuOverlay {
    pub visible: bool,
    list: ScrollableList<Section>,
}

impl MenuOverlay {
    pub fn new() -> Self {
        Self {
            visible: false,
            list: ScrollableList::new(Section::ALL.to_vec()),
        }
    }

    pub fn popup_area(&self, area: Rect) -> Rect {
        centered_rect(40, 14, area)
    }

    fn go(section: Section) -> Vec<Action> {
        vec![Action::GoToSection(section), Action::ToggleMenu]
    }
}

impl Component for MenuOverlay {
    fn id(&self) -> ComponentId {
        ComponentId::MenuOverlay
    }

    fn handle_key(&mut self, key: KeyEvent, _state: &AppState) -> Vec<Action> {
        if key.kind == KeyEventKind::Release || !self.visible {
            return vec![];
        }
        if self.list.handle_nav_key(key.code) {
            return vec![];
        }
        match key.code {
            KeyCode::Enter => self.list.selected_item().copied().map(Self::go).unwrap_or_default(),
            KeyCode::Char(c) => match Section::from_number_key(c) {
                Some(section) => Self::go(section),
                None if matches!(c, 'm' | 'q') => vec![Action::ToggleMenu],
                None => vec![],
            },
            KeyCode::Esc => vec![Action::ToggleMenu],
            _ => vec![],
        }
    }

    fn handle_mouse(&mut self, event: MouseEvent, area: Rect, _state: &AppState) -> Vec<Action> {
        if !self.visible {
            return vec![];
        }
        // Border plus two blank rows sit above the first entry; entries are
        // double-spaced.
        let first = area.y + 3;
        if event.row < first {
            return vec![];
        }
        let rel_row = (event.row - first) as usize / 2;
        if let MouseEventKind::Down(MouseButton::Left) = event.kind {
            if self.list.click(rel_row) != Click::Miss {
                return self.list.selected_item().copied().map(Self::go).unwrap_or_default();
            }
        }
        vec![]
    }

    fn on_action(&mut self, action: &Action, state: &AppState) -> Vec<Action> {
        if let Action::ToggleMenu = action {
            self.visible = !self.visible;
            if self.visible {
                let current = state.section;
                self.list.select_where(|s| *s == current);
            }
        }
        vec![]
    }

    fn draw(&mut self, frame: &mut Frame, area: Rect, _focused: bool, state: &AppState) {
        if !self.visible {
            return;
        }
        let popup = self.popup_area(area);

        let mut lines = vec![Line::from(""), Line::from("")];
        for (i, section) in self.list.visible_items(Section::ALL.len()) {
            let selected = i == self.list.selected;
            let mut title = style_row(selected, true).add_modifier(Modifier::BOLD);
            if *section == state.section {
                title = title.add_modifier(Modifier::UNDERLINED);
            }
            lines.push(Line::from(vec![
                Span::styled(
                    format!("   {}  ", section.number_key()),
                    Style::default().fg(C_NUMBER_HINT),
                ),
                Span::styled(format!(" {} ", section.label()), title),
            ]));
            lines.push(Line::from(""));
        }
        lines.push(Line::from(Span::styled(
            "   enter / 1-4 go   esc close",
            Style::default().fg(C_MUTED),
        )));

        frame.render_widget(Clear, popup);
        frame.render_widget(
            Paragraph::new(lines).block(
                Block::default()
                    .borders(Borders::ALL)
                    .border_style(Style::default().fg(C_PANEL_BORDER_FOCUSED))
                    .title(" MENU ")
                    .style(Style::default().bg(C_OVERLAY_BG)),
            ),
            popup,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app_state::test_support::{key, state};

    #[test]
    fn opening_highlights_current_section() {
        let mut state = state();
        state.section = Section::Archive;
        let mut menu = MenuOverlay::new();
        menu.on_action(&Action::ToggleMenu, &state);
        assert!(menu.visible);
        assert_eq!(
            menu.handle_key(key(KeyCode::Enter), &state),
            vec![Action::GoToSection(Section::Archive), Action::ToggleMenu]
        );
    }

    #[test]
    fn number_keys_jump_directly() {
        let state = state();
        let mut menu = MenuOverlay::new();
        menu.on_action(&Action::ToggleMenu, &state);
        assert_eq!(
            menu.handle_key(key(KeyCode::Char('4')), &state),
            vec![Action::GoToSection(Section::Connect), Action::ToggleMenu]
        );
        assert_eq!(menu.handle_key(key(KeyCode::Esc), &state), vec![Action::ToggleMenu]);
    }
}
