//! Header: glitching VEIN wordmark, tagline, section tabs and mpv badge.
//!
//! Not focusable; draws into a 4-row area.
//!
//!   rows 0-2  block-letter wordmark | section tabs / health badge
//!   row  3    tagline

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};

use crate::action::Section;
use crate::app_state::AppState;
use crate::theme::{
    C_ACCENT, C_BADGE_ERR, C_BADGE_PENDING, C_MUTED, C_NUMBER_HINT, C_PRIMARY, C_SECONDARY,
    C_TEAL,
};
use vein_proto::protocol::MpvHealth;

pub const HEIGHT: u16 = 4;

const WORDMARK: [&str; 3] = [
    "█ █ █▀▀ ▀█▀ █▀█",
    "█ █ █▀▀  █  █ █",
    " ▀  ▀▀▀ ▀▀▀ ▀ ▀",
];

const TAGLINE: &str = "SONIC & VISUAL ARCHITECT";

const GLITCH_CHARS: [char; 9] = ['▓', '▒', '░', '#', '/', '\\', '_', '%', '?'];

/// Chance per tick that a glitch burst starts.
const GLITCH_CHANCE: f64 = 0.03;

/// Replace each visible character with a noise glyph with probability
/// `intensity`.  Blanks stay blank so the silhouette survives.
pub fn glitch_lines<R: Rng>(lines: &[&str], rng: &mut R, intensity: f64) -> Vec<String> {
    let p = intensity.clamp(0.0, 1.0);
    lines
        .iter()
        .map(|line| {
            line.chars()
                .map(|c| {
                    if c != ' ' && rng.gen_bool(p) {
                        *GLITCH_CHARS.choose(&mut *rng).unwrap_or(&c)
                    } else {
                        c
                    }
                })
                .collect()
        })
        .collect()
}

pub struct Header {
    rng: StdRng,
    /// The distorted wordmark while a burst is running.
    glitched: Option<Vec<String>>,
    burst_ticks: u8,
}

impl Header {
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_entropy(),
            glitched: None,
            burst_ticks: 0,
        }
    }

    /// Advance the glitch animation.  Returns true when the wordmark changed.
    pub fn tick(&mut self) -> bool {
        if self.burst_ticks > 0 {
            self.burst_ticks -= 1;
            if self.burst_ticks == 0 {
                self.glitched = None;
            } else {
                self.glitched = Some(glitch_lines(&WORDMARK, &mut self.rng, 0.25));
            }
            return true;
        }
        if self.rng.gen_bool(GLITCH_CHANCE) {
            self.burst_ticks = self.rng.gen_range(2..=4);
            self.glitched = Some(glitch_lines(&WORDMARK, &mut self.rng, 0.25));
            return true;
        }
        false
    }

    pub fn draw(&self, frame: &mut Frame, area: Rect, state: &AppState) {
        if area.height == 0 {
            return;
        }
        let cols = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Length(27), Constraint::Min(0)])
            .split(area);

        let mark_style = Style::default().fg(C_PRIMARY).add_modifier(Modifier::BOLD);
        let glitch_style = Style::default().fg(C_ACCENT).add_modifier(Modifier::BOLD);
        let mut left: Vec<Line> = match &self.glitched {
            Some(lines) => lines
                .iter()
                .map(|l| Line::from(Span::styled(format!(" {}", l), glitch_style)))
                .collect(),
            None => WORDMARK
                .iter()
                .map(|l| Line::from(Span::styled(format!(" {}", l), mark_style)))
                .collect(),
        };
        left.push(Line::from(Span::styled(
            format!(" {}", TAGLINE),
            Style::default().fg(C_TEAL),
        )));
        frame.render_widget(Paragraph::new(left), cols[0]);

        let right = vec![
            badge_line(&state.player.mpv_health),
            Line::from(""),
            tabs_line(state.section),
        ];
        frame.render_widget(Paragraph::new(right).right_aligned(), cols[1]);
    }
}

fn tabs_line(active: Section) -> Line<'static> {
    let mut spans = Vec::new();
    for section in Section::ALL {
        spans.push(Span::styled(
            format!("[{}] ", section.number_key()),
            Style::default().fg(C_NUMBER_HINT),
        ));
        let style = if section == active {
            Style::default().fg(C_ACCENT).add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(C_SECONDARY)
        };
        spans.push(Span::styled(section.label(), style));
        spans.push(Span::raw("  "));
    }
    Line::from(spans)
}

fn badge_line(health: &MpvHealth) -> Line<'static> {
    match health.badge_label() {
        Some(label) => {
            let color = match health {
                MpvHealth::Dead => C_BADGE_ERR,
                _ => C_BADGE_PENDING,
            };
            Line::from(vec![
                Span::styled("mpv ", Style::default().fg(C_MUTED)),
                Span::styled(
                    format!("{} ", label),
                    Style::default().fg(color).add_modifier(Modifier::BOLD),
                ),
            ])
        }
        None => Line::from(""),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_intensity_leaves_wordmark_intact() {
        let mut rng = StdRng::seed_from_u64(7);
        let out = glitch_lines(&WORDMARK, &mut rng, 0.0);
        assert_eq!(out, WORDMARK.map(String::from).to_vec());
    }

    #[test]
    fn full_intensity_keeps_blanks_and_width() {
        let mut rng = StdRng::seed_from_u64(7);
        let out = glitch_lines(&WORDMARK, &mut rng, 1.0);
        for (orig, glitched) in WORDMARK.iter().zip(&out) {
            assert_eq!(orig.chars().count(), glitched.chars().count());
            for (a, b) in orig.chars().zip(glitched.chars()) {
                if a == ' ' {
                    assert_eq!(b, ' ');
                } else {
                    assert!(GLITCH_CHARS.contains(&b));
                }
            }
        }
    }

    #[test]
    fn burst_ends_and_restores_wordmark() {
        let mut header = Header::new();
        header.burst_ticks = 2;
        header.glitched = Some(Vec::new());
        assert!(header.tick());
        assert!(header.glitched.is_some());
        assert!(header.tick());
        assert!(header.glitched.is_none());
    }
}
