//! PlayerBar: persistent now-playing strip above the keys bar.
//!
//! Hidden while nothing is selected.  Clicking it toggles pause.

use ratatui::crossterm::event::{KeyEvent, MouseButton, MouseEvent, MouseEventKind};
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

use vein_proto::protocol::{PlaybackStatus, PlayerState};

use crate::{
    action::{Action, ComponentId},
    app_state::AppState,
    component::Component,
    theme::{
        status_color, style_unfocused_border, C_BADGE_ERR, C_BADGE_PENDING, C_ERROR, C_MUTED,
        C_PRIMARY, C_SECONDARY, C_TEAL,
    },
    widgets::progress_bar::draw_progress,
};

pub const HEIGHT: u16 = 3;

/// Whether the bar takes up any rows.
pub fn visible(player: &PlayerState) -> bool {
    player.current_track.is_some()
}

pub struct PlayerBar;

impl PlayerBar {
    pub fn new() -> Self {
        Self
    }

    fn info_line(state: &AppState) -> Line<'static> {
        let player = &state.player;
        let Some(track) = player.current_track.as_ref() else {
            return Line::from("");
        };
        let status = player.playback_status;
        let mut spans = vec![
            Span::styled(
                format!(" {} ", status.glyph()),
                Style::default().fg(status_color(status)).add_modifier(Modifier::BOLD),
            ),
            Span::styled(
                track.title.clone(),
                Style::default().fg(C_PRIMARY).add_modifier(Modifier::BOLD),
            ),
            Span::styled(format!("  {}", track.artist), Style::default().fg(C_SECONDARY)),
        ];
        if let Some(project) = state.catalog.project_of(&track.id) {
            spans.push(Span::styled(
                format!("  ·  {}", project.title),
                Style::default().fg(C_TEAL),
            ));
        }
        if status == PlaybackStatus::Error {
            let reason = player.last_error.as_deref().unwrap_or("playback failed");
            spans.push(Span::styled(format!("  {}", reason), Style::default().fg(C_ERROR)));
        }
        spans.push(Span::styled(
            format!("  vol {}%", (player.volume * 100.0).round() as i32),
            Style::default().fg(C_MUTED),
        ));
        Line::from(spans)
    }
}

impl Component for PlayerBar {
    fn id(&self) -> ComponentId {
        ComponentId::PlayerBar
    }

    fn handle_key(&mut self, _key: KeyEvent, _state: &AppState) -> Vec<Action> {
        vec![]
    }

    fn handle_mouse(&mut self, event: MouseEvent, _area: Rect, state: &AppState) -> Vec<Action> {
        match event.kind {
            MouseEventKind::Down(MouseButton::Left) if visible(&state.player) => {
                vec![Action::TogglePause]
            }
            _ => vec![],
        }
    }

    fn draw(&mut self, frame: &mut Frame, area: Rect, _focused: bool, state: &AppState) {
        if !visible(&state.player) || area.height == 0 {
            return;
        }
        let mut block = Block::default()
            .borders(Borders::TOP)
            .border_style(style_unfocused_border());
        if let Some(label) = state.player.mpv_health.badge_label() {
            let color = if label == "DEAD" { C_BADGE_ERR } else { C_BADGE_PENDING };
            block = block.title_top(
                Line::from(Span::styled(
                    format!(" mpv {} ", label),
                    Style::default().fg(color).add_modifier(Modifier::BOLD),
                ))
                .right_aligned(),
            );
        }
        let inner = block.inner(area);
        frame.render_widget(block, area);

        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(1), Constraint::Length(1)])
            .split(inner);
        frame.render_widget(Paragraph::new(Self::info_line(state)), rows[0]);
        draw_progress(
            frame,
            rows[1],
            state.player.progress(),
            state.player.time_pos_secs,
            state.player.duration_secs,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app_state::test_support::state;

    fn text(line: &Line) -> String {
        line.spans.iter().map(|s| s.content.as_ref()).collect()
    }

    #[test]
    fn hidden_without_a_track() {
        let state = state();
        assert!(!visible(&state.player));
        assert_eq!(text(&PlayerBar::info_line(&state)), "");
    }

    #[test]
    fn shows_project_and_error_reason() {
        let mut state = state();
        state.player.current_track = state.catalog.track("t1").cloned();
        state.player.playback_status = PlaybackStatus::Error;
        state.player.last_error = Some("no audio source".into());
        state.player.volume = 0.5;
        let line = text(&PlayerBar::info_line(&state));
        assert!(line.contains("Steel Lung"));
        assert!(line.contains("CHROME HEARTS"));
        assert!(line.contains("no audio source"));
        assert!(line.contains("vol 50%"));
    }
}
