//! Keybindings bar: bottom line with the active section and its keys.

use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};

use crate::action::Section;
use crate::theme::{C_ACCENT, C_MUTED};

const PLAYBACK_KEYS: &str = "Space pause  n/p next/prev  x stop  ←→ vol  ,/. seek";
const GLOBAL_KEYS: &str = "1-4 sections  m menu  Tab panes  K keys  ? help  q quit";

fn section_keys(section: Section) -> &'static str {
    match section {
        Section::Projects => "↑↓/jk select  Enter play/open  c concept",
        Section::Versatility => "↑↓/jk select  Enter play",
        Section::Archive | Section::Connect => "↑↓/jk select  Enter/y copy url",
    }
}

pub fn draw_keys_bar(frame: &mut Frame, area: Rect, section: Section) {
    let line = Line::from(vec![
        Span::styled(
            format!(" {} ", section.label()),
            Style::default().fg(C_ACCENT).add_modifier(Modifier::BOLD),
        ),
        Span::styled(
            format!(
                " {}  {}  {}",
                section_keys(section),
                PLAYBACK_KEYS,
                GLOBAL_KEYS
            ),
            Style::default().fg(C_MUTED),
        ),
    ]);
    frame.render_widget(Paragraph::new(line), area);
}
