//! FocusRing: keyboard focus cycling between the panes of a section.

use crate::action::ComponentId;

pub struct FocusRing {
    items: Vec<ComponentId>,
    current: usize,
}

impl FocusRing {
    pub fn new(items: Vec<ComponentId>) -> Self {
        Self { items, current: 0 }
    }

    pub fn current(&self) -> Option<ComponentId> {
        self.items.get(self.current).copied()
    }

    pub fn next(&mut self) -> Option<ComponentId> {
        if self.items.is_empty() {
            return None;
        }
        self.current = (self.current + 1) % self.items.len();
        self.current()
    }

    pub fn prev(&mut self) -> Option<ComponentId> {
        if self.items.is_empty() {
            return None;
        }
        self.current = (self.current + self.items.len() - 1) % self.items.len();
        self.current()
    }

    /// No-op when `id` is not part of the ring.
    pub fn set(&mut self, id: ComponentId) {
        if let Some(pos) = self.items.iter().position(|&x| x == id) {
            self.current = pos;
        }
    }

    pub fn is_focused(&self, id: ComponentId) -> bool {
        self.current() == Some(id)
    }

    /// Replace the ring contents on a section switch.  Focus lands on the
    /// first pane of the new section.
    pub fn set_items(&mut self, items: Vec<ComponentId>) {
        self.items = items;
        self.current = 0;
    }
}

impl Default for FocusRing {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cycles_both_ways() {
        let mut ring = FocusRing::new(vec![ComponentId::ProjectList, ComponentId::ProjectDetail]);
        assert_eq!(ring.next(), Some(ComponentId::ProjectDetail));
        assert_eq!(ring.next(), Some(ComponentId::ProjectList));
        assert_eq!(ring.prev(), Some(ComponentId::ProjectDetail));
    }

    #[test]
    fn set_ignores_foreign_panes() {
        let mut ring = FocusRing::new(vec![ComponentId::VersatilityList]);
        ring.set(ComponentId::ContactPanel);
        assert!(ring.is_focused(ComponentId::VersatilityList));
        assert_eq!(FocusRing::default().next(), None);
    }
}
