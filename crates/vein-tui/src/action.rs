//! Action enum: all user-initiated intents and internal events.

/// Unique identifier for a focusable component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComponentId {
    ProjectList,
    ProjectDetail,
    VersatilityList,
    ArchivePanel,
    ContactPanel,
    PlayerBar,
    MenuOverlay,
    HelpOverlay,
}

/// The four portfolio sections.  Exactly one fills the body at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Section {
    #[default]
    Projects,
    Versatility,
    Archive,
    Connect,
}

impl Section {
    pub const ALL: [Section; 4] = [
        Section::Projects,
        Section::Versatility,
        Section::Archive,
        Section::Connect,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Section::Projects => "PROJECTS",
            Section::Versatility => "VERSATILITY",
            Section::Archive => "AURAL ARCHIVE",
            Section::Connect => "CONNECT",
        }
    }

    pub fn number_key(self) -> char {
        match self {
            Section::Projects => '1',
            Section::Versatility => '2',
            Section::Archive => '3',
            Section::Connect => '4',
        }
    }

    pub fn from_number_key(c: char) -> Option<Section> {
        Section::ALL.into_iter().find(|s| s.number_key() == c)
    }

    /// Focusable panes shown while this section is active.
    pub fn panes(self) -> Vec<ComponentId> {
        match self {
            Section::Projects => vec![ComponentId::ProjectList, ComponentId::ProjectDetail],
            Section::Versatility => vec![ComponentId::VersatilityList],
            Section::Archive => vec![ComponentId::ArchivePanel],
            Section::Connect => vec![ComponentId::ContactPanel],
        }
    }
}

/// All actions that can flow through the system.
/// Components produce Actions; the App dispatches them.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    // ── Playback ─────────────────────────────────────────────────────────────
    /// Tap a track: toggle if current, switch otherwise.
    SelectTrack(String),
    TogglePause,
    Next,
    Prev,
    Stop,
    Volume(f32),
    SeekRelative(f64),

    // ── Navigation ───────────────────────────────────────────────────────────
    FocusNext,
    FocusPrev,
    FocusPane(ComponentId),
    GoToSection(Section),
    /// Show this project in the detail pane.
    ShowProject(String),

    // ── Concept ──────────────────────────────────────────────────────────────
    RequestConcept(String), // project id

    // ── UI toggles ───────────────────────────────────────────────────────────
    ToggleMenu,
    ToggleHelp,
    ToggleKeys,
    CopyToClipboard(String),

    // ── System ───────────────────────────────────────────────────────────────
    Quit,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn number_keys_map_back_to_sections() {
        for section in Section::ALL {
            assert_eq!(Section::from_number_key(section.number_key()), Some(section));
        }
        assert_eq!(Section::from_number_key('9'), None);
    }
}
