//! Color palette and style constants for the VEIN TUI.
//!
//! Near-black surfaces with deep indigo and teal accents.

use ratatui::style::{Color, Modifier, Style};

// ── Color palette ─────────────────────────────────────────────────────────────

pub const C_BG: Color = Color::Rgb(10, 10, 12);
pub const C_OVERLAY_BG: Color = Color::Rgb(16, 16, 24);
pub const C_ACCENT: Color = Color::Rgb(129, 140, 248); // indigo-400
pub const C_TEAL: Color = Color::Rgb(45, 212, 191);
pub const C_PLAYING: Color = Color::Rgb(45, 212, 191);
pub const C_LOADING: Color = Color::Rgb(250, 204, 21);
pub const C_ERROR: Color = Color::Rgb(248, 113, 113);
pub const C_MUTED: Color = Color::Rgb(82, 82, 91);
pub const C_SECONDARY: Color = Color::Rgb(161, 161, 170);
pub const C_PRIMARY: Color = Color::Rgb(228, 228, 231);
pub const C_SELECTION_BG: Color = Color::Rgb(24, 24, 40);
pub const C_PANEL_BORDER: Color = Color::Rgb(39, 39, 42);
pub const C_PANEL_BORDER_FOCUSED: Color = Color::Rgb(99, 102, 241); // indigo-500
pub const C_NUMBER_HINT: Color = Color::Rgb(90, 90, 115);
pub const C_TAG: Color = Color::Rgb(94, 234, 212);
pub const C_TOAST_INFO: Color = Color::Rgb(129, 140, 248);
pub const C_TOAST_SUCCESS: Color = Color::Rgb(45, 212, 191);
pub const C_TOAST_WARNING: Color = Color::Rgb(250, 204, 21);
pub const C_TOAST_ERROR: Color = Color::Rgb(248, 113, 113);
pub const C_BADGE_PENDING: Color = Color::Rgb(250, 204, 21);
pub const C_BADGE_ERR: Color = Color::Rgb(248, 113, 113);

// ── Predefined styles ─────────────────────────────────────────────────────────

pub fn style_default() -> Style {
    Style::default().fg(C_PRIMARY)
}

pub fn style_selected() -> Style {
    Style::default().bg(C_SELECTION_BG).fg(C_PRIMARY)
}

pub fn style_selected_focused() -> Style {
    Style::default()
        .bg(C_SELECTION_BG)
        .fg(C_PRIMARY)
        .add_modifier(Modifier::BOLD)
}

pub fn style_focused_border() -> Style {
    Style::default().fg(C_PANEL_BORDER_FOCUSED)
}

pub fn style_unfocused_border() -> Style {
    Style::default().fg(C_PANEL_BORDER)
}

pub fn style_heading() -> Style {
    Style::default().fg(C_MUTED).add_modifier(Modifier::BOLD)
}

/// Row style for a list entry given selection and pane focus.
pub fn style_row(selected: bool, focused: bool) -> Style {
    match (selected, focused) {
        (true, true) => style_selected_focused(),
        (true, false) => style_selected(),
        _ => style_default(),
    }
}

/// Color for a playback status glyph.
pub fn status_color(status: vein_proto::protocol::PlaybackStatus) -> Color {
    use vein_proto::protocol::PlaybackStatus;
    match status {
        PlaybackStatus::Playing => C_PLAYING,
        PlaybackStatus::Loading => C_LOADING,
        PlaybackStatus::Error => C_ERROR,
        PlaybackStatus::Paused => C_SECONDARY,
        PlaybackStatus::Idle => C_MUTED,
    }
}
