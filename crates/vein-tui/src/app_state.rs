//! AppState: shared read-only data passed to all components during render/event.
//!
//! Components read this for player state and catalog data, but never mutate
//! it.  The App event-loop is the only thing that writes to AppState.

use std::sync::Arc;

use vein_proto::catalog::{Catalog, Project};
use vein_proto::concept::{ConceptGateway, GeminiGenerator};
use vein_proto::protocol::PlayerState;

use crate::action::Section;

/// Concept gateway as wired in the binary.
pub type Concepts = ConceptGateway<GeminiGenerator>;

pub struct AppState {
    /// Latest snapshot published by the player core.
    pub player: PlayerState,
    pub catalog: Arc<Catalog>,
    pub concepts: Concepts,
    pub section: Section,
    /// Project shown in the detail pane.  Falls back to the first project.
    pub selected_project: Option<String>,
}

impl AppState {
    pub fn new(catalog: Arc<Catalog>, concepts: Concepts) -> Self {
        Self {
            player: PlayerState::default(),
            catalog,
            concepts,
            section: Section::default(),
            selected_project: None,
        }
    }

    pub fn project(&self) -> Option<&Project> {
        self.selected_project
            .as_deref()
            .and_then(|id| self.catalog.project(id))
            .or_else(|| self.catalog.projects.first())
    }
}
