//! Catalog: the read-only table of projects, tracks, playlists and socials.
//!
//! The catalog is compiled in (`Catalog::builtin`) and can be replaced at
//! startup by a `catalog.toml` file.  Nothing mutates it at runtime, so the
//! navigation order used by next/previous is recomputed on demand as a pure
//! view over it.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

/// Placeholder audio used by the built-in catalog.
const MOCK_AUDIO: &str = "https://www.soundhelix.com/examples/mp3/SoundHelix-Song-1.mp3";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Track {
    pub id: String,
    pub title: String,
    pub artist: String,
    /// Display string, e.g. "3:12".
    pub duration: String,
    #[serde(default)]
    pub genre: String,
    #[serde(default)]
    pub cover_url: String,
    #[serde(default)]
    pub audio_url: Option<String>,
}

impl Track {
    /// The audio source, if the track has a non-blank one.
    pub fn source(&self) -> Option<&str> {
        self.audio_url
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Project {
    pub id: String,
    pub title: String,
    pub year: String,
    #[serde(default)]
    pub mood: String,
    #[serde(default)]
    pub description: String,
    /// Contributor roles ("Production", "Mixing", …).
    #[serde(default)]
    pub roles: Vec<String>,
    /// Image references (at least one in a well-formed catalog).
    #[serde(default)]
    pub visuals: Vec<String>,
    /// Listening order.
    #[serde(default, rename = "track")]
    pub tracks: Vec<Track>,
}

/// An externally embedded playlist.  We only know where it lives.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PlaylistReference {
    pub id: String,
    pub title: String,
    pub embed_url: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SocialLink {
    pub platform: String,
    pub url: String,
    pub label: String,
}

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("failed to read catalog file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse catalog TOML: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("duplicate track id '{0}'")]
    DuplicateTrack(String),
    #[error("project '{0}' has no visuals")]
    MissingVisuals(String),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Catalog {
    #[serde(default, rename = "project")]
    pub projects: Vec<Project>,
    /// The flat "versatility" list, independent of any project.
    #[serde(default, rename = "track")]
    pub versatility: Vec<Track>,
    #[serde(default, rename = "playlist")]
    pub playlists: Vec<PlaylistReference>,
    #[serde(default, rename = "social")]
    pub socials: Vec<SocialLink>,
}

/// Direction for a navigation step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Forward,
    Backward,
}

impl Catalog {
    /// Every playable track in navigation order: all project tracks (project
    /// order, then track order), followed by the versatility list.
    pub fn navigation_order(&self) -> Vec<&Track> {
        self.projects
            .iter()
            .flat_map(|p| p.tracks.iter())
            .chain(self.versatility.iter())
            .collect()
    }

    /// Look a track up by id anywhere in the catalog.
    pub fn track(&self, id: &str) -> Option<&Track> {
        self.navigation_order().into_iter().find(|t| t.id == id)
    }

    pub fn project(&self, id: &str) -> Option<&Project> {
        self.projects.iter().find(|p| p.id == id)
    }

    /// The project that owns `track_id`, if any.
    pub fn project_of(&self, track_id: &str) -> Option<&Project> {
        self.projects
            .iter()
            .find(|p| p.tracks.iter().any(|t| t.id == track_id))
    }

    /// One step from `current_id` through the navigation order, wrapping at
    /// both ends.  `None` when the order is empty or `current_id` is not in it.
    pub fn step_from(&self, current_id: &str, step: Step) -> Option<&Track> {
        step_in(&self.navigation_order(), current_id, step)
    }

    /// Reject catalogs that would make navigation ambiguous.
    pub fn validate(&self) -> Result<(), CatalogError> {
        let mut seen = HashSet::new();
        for track in self.navigation_order() {
            if !seen.insert(track.id.as_str()) {
                return Err(CatalogError::DuplicateTrack(track.id.clone()));
            }
        }
        if let Some(p) = self.projects.iter().find(|p| p.visuals.is_empty()) {
            return Err(CatalogError::MissingVisuals(p.id.clone()));
        }
        Ok(())
    }

    /// The compiled-in VEIN catalog.
    pub fn builtin() -> Self {
        Self {
            projects: vec![
                Project {
                    id: "p1".into(),
                    title: "CHROME HEARTS".into(),
                    year: "2023".into(),
                    mood: "Cold, Metallic, Industrial".into(),
                    description: "An exploration of metallic textures in sound. The visual identity reflects the cold, unyielding nature of the modern digital landscape.".into(),
                    roles: vec!["Production".into(), "Mixing".into(), "Visual Direction".into()],
                    visuals: vec![
                        "https://picsum.photos/800/800?grayscale".into(),
                        "https://picsum.photos/800/801?grayscale".into(),
                    ],
                    tracks: vec![
                        builtin_track("t1", "Steel Lung", "3:12", "Industrial", 1),
                        builtin_track("t2", "Liquid Metal", "2:45", "Glitch", 2),
                    ],
                },
                Project {
                    id: "p2".into(),
                    title: "NEON DREAM".into(),
                    year: "2024".into(),
                    mood: "Ethereal, Hazy, Dreamcore".into(),
                    description: "A dive into the subconscious. Heavily layered pads and distorted vocals create a sense of nostalgia for a memory that never existed.".into(),
                    roles: vec!["Composition".into(), "Mastering".into()],
                    visuals: vec![
                        "https://picsum.photos/800/600?blur=2".into(),
                        "https://picsum.photos/800/601?blur=2".into(),
                    ],
                    tracks: vec![builtin_track("t3", "Sleep Paralysis", "4:20", "Ambient", 3)],
                },
            ],
            versatility: vec![
                builtin_track("v1", "Cyber Jazz Experiment", "2:10", "Jazz Fusion", 4),
                builtin_track("v2", "Hard Techno Draft", "5:00", "Techno", 5),
                builtin_track("v3", "Acoustic Riffs", "1:45", "Indie", 6),
            ],
            playlists: vec![
                PlaylistReference {
                    id: "pl1".into(),
                    title: "Inspiration: 001".into(),
                    embed_url: "https://embed.music.apple.com/us/playlist/pl.u-pMylDqaTYvK?theme=dark".into(),
                    description: "Textures that define the current era.".into(),
                },
                PlaylistReference {
                    id: "pl2".into(),
                    title: "Night Drive".into(),
                    embed_url: "https://embed.music.apple.com/us/playlist/pl.u-GgA5eRlfo65?theme=dark".into(),
                    description: "For the empty highways.".into(),
                },
            ],
            socials: vec![
                social("Instagram", "#", "@vein.visuals"),
                social("Twitter", "#", "@vein_sound"),
                social("Email", "mailto:contact@vein.art", "contact@vein.art"),
                social("SoundCloud", "#", "soundcloud.com/vein"),
            ],
        }
    }
}

/// Pure navigation step over an explicit order.
pub fn step_in<'a>(order: &[&'a Track], current_id: &str, step: Step) -> Option<&'a Track> {
    if order.is_empty() {
        return None;
    }
    let idx = order.iter().position(|t| t.id == current_id)?;
    let len = order.len();
    let target = match step {
        Step::Forward => (idx + 1) % len,
        Step::Backward => (idx + len - 1) % len,
    };
    order.get(target).copied()
}

fn builtin_track(id: &str, title: &str, duration: &str, genre: &str, cover: u32) -> Track {
    Track {
        id: id.into(),
        title: title.into(),
        artist: "VEIN".into(),
        duration: duration.into(),
        genre: genre.into(),
        cover_url: format!("https://picsum.photos/200/200?random={}", cover),
        audio_url: Some(MOCK_AUDIO.into()),
    }
}

fn social(platform: &str, url: &str, label: &str) -> SocialLink {
    SocialLink {
        platform: platform.into(),
        url: url.into(),
        label: label.into(),
    }
}

// ── TOML loader ───────────────────────────────────────────────────────────────

pub fn parse_catalog_from_toml_str(content: &str) -> Result<Catalog, CatalogError> {
    let catalog: Catalog = toml::from_str(content)?;
    catalog.validate()?;
    Ok(catalog)
}

pub fn load_catalog_from_toml(path: &Path) -> Result<Catalog, CatalogError> {
    let content = std::fs::read_to_string(path)?;
    parse_catalog_from_toml_str(&content)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(order: &[&Track]) -> Vec<String> {
        order.iter().map(|t| t.id.clone()).collect()
    }

    #[test]
    fn builtin_navigation_order_is_projects_then_versatility() {
        let catalog = Catalog::builtin();
        assert_eq!(
            ids(&catalog.navigation_order()),
            vec!["t1", "t2", "t3", "v1", "v2", "v3"]
        );
        catalog.validate().unwrap();
    }

    #[test]
    fn step_wraps_at_both_ends() {
        let catalog = Catalog::builtin();
        assert_eq!(catalog.step_from("v3", Step::Forward).unwrap().id, "t1");
        assert_eq!(catalog.step_from("t1", Step::Backward).unwrap().id, "v3");
        assert_eq!(catalog.step_from("t2", Step::Forward).unwrap().id, "t3");
    }

    #[test]
    fn next_then_previous_returns_to_start() {
        let catalog = Catalog::builtin();
        for track in catalog.navigation_order() {
            let next = catalog.step_from(&track.id, Step::Forward).unwrap();
            let back = catalog.step_from(&next.id, Step::Backward).unwrap();
            assert_eq!(back.id, track.id);
        }
    }

    #[test]
    fn unknown_track_and_empty_order_step_nowhere() {
        let catalog = Catalog::builtin();
        assert!(catalog.step_from("nope", Step::Forward).is_none());
        assert!(Catalog::default().step_from("t1", Step::Backward).is_none());
    }

    #[test]
    fn single_track_order_steps_to_itself() {
        let catalog = Catalog {
            versatility: vec![builtin_track("solo", "Solo", "1:00", "Drone", 9)],
            ..Catalog::default()
        };
        assert_eq!(catalog.step_from("solo", Step::Forward).unwrap().id, "solo");
        assert_eq!(catalog.step_from("solo", Step::Backward).unwrap().id, "solo");
    }

    #[test]
    fn blank_audio_url_has_no_source() {
        let mut track = builtin_track("x", "X", "0:10", "", 1);
        track.audio_url = Some("   ".into());
        assert!(track.source().is_none());
        track.audio_url = None;
        assert!(track.source().is_none());
    }

    #[test]
    fn project_of_finds_owner() {
        let catalog = Catalog::builtin();
        assert_eq!(catalog.project_of("t3").unwrap().id, "p2");
        assert!(catalog.project_of("v1").is_none());
    }

    #[test]
    fn parses_toml_catalog() {
        let toml = r#"
            [[project]]
            id = "p9"
            title = "RUST BELT"
            year = "2025"
            mood = "Oxidised"
            roles = ["Production"]
            visuals = ["https://example.com/a.jpg"]

            [[project.track]]
            id = "r1"
            title = "Borrow"
            artist = "VEIN"
            duration = "3:00"
            audio_url = "https://example.com/r1.mp3"

            [[track]]
            id = "f1"
            title = "Flat"
            artist = "VEIN"
            duration = "1:00"

            [[playlist]]
            id = "pl"
            title = "List"
            embed_url = "https://example.com/embed"

            [[social]]
            platform = "Email"
            url = "mailto:x@y.z"
            label = "x@y.z"
        "#;
        let catalog = parse_catalog_from_toml_str(toml).unwrap();
        assert_eq!(ids(&catalog.navigation_order()), vec!["r1", "f1"]);
        assert_eq!(catalog.projects[0].tracks[0].source(), Some("https://example.com/r1.mp3"));
        assert!(catalog.versatility[0].audio_url.is_none());
        assert_eq!(catalog.playlists.len(), 1);
        assert_eq!(catalog.socials[0].label, "x@y.z");
    }

    #[test]
    fn rejects_duplicate_track_ids() {
        let toml = r#"
            [[track]]
            id = "dup"
            title = "A"
            artist = "VEIN"
            duration = "1:00"

            [[track]]
            id = "dup"
            title = "B"
            artist = "VEIN"
            duration = "1:00"
        "#;
        assert!(matches!(
            parse_catalog_from_toml_str(toml),
            Err(CatalogError::DuplicateTrack(id)) if id == "dup"
        ));
    }
}
