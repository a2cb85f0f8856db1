//! Selection + scroll window over a list of rows.

use std::time::{Duration, Instant};

use ratatui::crossterm::event::KeyCode;

const DOUBLE_CLICK: Duration = Duration::from_millis(400);
const PAGE: usize = 10;

/// What a left click on a row amounted to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Click {
    /// Below the last row.
    Miss,
    Single,
    /// Second click on the same row within the double-click window.
    Double,
}

pub struct ScrollableList<T> {
    pub items: Vec<T>,
    pub selected: usize,
    pub scroll_offset: usize,
    last_click: Option<(usize, Instant)>,
}

impl<T> ScrollableList<T> {
    pub fn new(items: Vec<T>) -> Self {
        Self {
            items,
            selected: 0,
            scroll_offset: 0,
            last_click: None,
        }
    }

    /// Replace the rows, keeping the selection in range.
    pub fn set_items(&mut self, items: Vec<T>) {
        self.items = items;
        if self.selected >= self.items.len() {
            self.selected = self.items.len().saturating_sub(1);
        }
    }

    pub fn select_up(&mut self, n: usize) {
        self.selected = self.selected.saturating_sub(n);
    }

    pub fn select_down(&mut self, n: usize) {
        self.selected = (self.selected + n).min(self.items.len().saturating_sub(1));
    }

    pub fn select_first(&mut self) {
        self.selected = 0;
        self.scroll_offset = 0;
    }

    pub fn select_last(&mut self) {
        self.selected = self.items.len().saturating_sub(1);
    }

    /// Select the first row matching `pred`.  Returns whether one matched.
    pub fn select_where(&mut self, pred: impl Fn(&T) -> bool) -> bool {
        match self.items.iter().position(pred) {
            Some(pos) => {
                self.selected = pos;
                true
            }
            None => false,
        }
    }

    pub fn selected_item(&self) -> Option<&T> {
        self.items.get(self.selected)
    }

    /// `(index, item)` pairs visible in `height` rows.  Call
    /// `ensure_visible` first.
    pub fn visible_items(&self, height: usize) -> impl Iterator<Item = (usize, &T)> {
        self.items
            .iter()
            .enumerate()
            .skip(self.scroll_offset)
            .take(height)
    }

    pub fn ensure_visible(&mut self, height: usize) {
        if height == 0 {
            return;
        }
        if self.selected < self.scroll_offset {
            self.scroll_offset = self.selected;
        } else if self.selected >= self.scroll_offset + height {
            self.scroll_offset = self.selected + 1 - height;
        }
    }

    /// Select the row clicked at `row` within the rendered area.
    /// Returns true if that row exists.
    pub fn handle_click(&mut self, row: usize) -> bool {
        let target = self.scroll_offset + row;
        if target < self.items.len() {
            self.selected = target;
            return true;
        }
        false
    }

    /// Left click at `row` within the rendered rows.
    pub fn click(&mut self, row: usize) -> Click {
        if !self.handle_click(row) {
            self.last_click = None;
            return Click::Miss;
        }
        let now = Instant::now();
        let double = self
            .last_click
            .map_or(false, |(r, t)| r == self.selected && now.duration_since(t) < DOUBLE_CLICK);
        if double {
            self.last_click = None;
            Click::Double
        } else {
            self.last_click = Some((self.selected, now));
            Click::Single
        }
    }

    /// Apply the shared list movement keys.  Returns true when `code` was one.
    pub fn handle_nav_key(&mut self, code: KeyCode) -> bool {
        match code {
            KeyCode::Up | KeyCode::Char('k') => self.select_up(1),
            KeyCode::Down | KeyCode::Char('j') => self.select_down(1),
            KeyCode::PageUp => self.select_up(PAGE),
            KeyCode::PageDown => self.select_down(PAGE),
            KeyCode::Home | KeyCode::Char('g') => self.select_first(),
            KeyCode::End | KeyCode::Char('G') => self.select_last(),
            _ => return false,
        }
        true
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
