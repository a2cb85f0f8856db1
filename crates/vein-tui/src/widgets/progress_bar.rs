//! Smooth Unicode progress bar widget.

use ratatui::{
    layout::Rect,
    style::Style,
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};

use crate::theme::{C_MUTED, C_PLAYING, C_SECONDARY};

const BLOCKS: [char; 9] = [' ', '▏', '▎', '▍', '▌', '▋', '▊', '▉', '█'];

/// Render a progress bar with elapsed/total labels either side.
/// `progress` is 0.0..=1.0.
pub fn draw_progress(
    frame: &mut Frame,
    area: Rect,
    progress: f64,
    time_pos: Option<f64>,
    duration: Option<f64>,
) {
    if area.width < 4 || area.height == 0 {
        return;
    }

    let left_label = time_pos.map(fmt_time).unwrap_or_default();
    let right_label = duration.map(fmt_time).unwrap_or_default();
    let label_w = (left_label.len() + right_label.len() + 2) as u16;
    let bar_w = area.width.saturating_sub(label_w).max(4) as usize;

    let mut spans = Vec::new();
    if !left_label.is_empty() {
        spans.push(Span::styled(
            format!("{} ", left_label),
            Style::default().fg(C_SECONDARY),
        ));
    }
    spans.push(Span::styled(
        bar_cells(progress, bar_w),
        Style::default().fg(C_PLAYING),
    ));
    if !right_label.is_empty() {
        spans.push(Span::styled(
            format!(" {}", right_label),
            Style::default().fg(C_MUTED),
        ));
    }

    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

/// `width` cells of bar, filled in eighths.
fn bar_cells(progress: f64, width: usize) -> String {
    let eighths = (progress.clamp(0.0, 1.0) * width as f64 * 8.0) as usize;
    let full = eighths / 8;
    let mut bar = String::with_capacity(width * 3);
    bar.extend(std::iter::repeat('█').take(full.min(width)));
    if full < width {
        bar.push(BLOCKS[eighths % 8]);
        bar.extend(std::iter::repeat(' ').take(width - full - 1));
    }
    bar
}

pub fn fmt_time(secs: f64) -> String {
    if secs < 0.0 {
        return "0:00".to_string();
    }
    let s = secs as u64;
    let h = s / 3600;
    let m = (s % 3600) / 60;
    let s = s % 60;
    if h > 0 {
        format!("{}:{:02}:{:02}", h, m, s)
    } else {
        format!("{}:{:02}", m, s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_minutes_and_hours() {
        assert_eq!(fmt_time(-3.0), "0:00");
        assert_eq!(fmt_time(192.4), "3:12");
        assert_eq!(fmt_time(3725.0), "1:02:05");
    }

    #[test]
    fn bar_is_always_full_width() {
        for p in [0.0, 0.33, 0.5, 1.0, 2.0] {
            assert_eq!(bar_cells(p, 10).chars().count(), 10);
        }
        assert_eq!(bar_cells(1.0, 4), "████");
        assert_eq!(bar_cells(0.5, 4), "██  ");
    }
}
