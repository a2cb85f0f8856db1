//! Concept-text gateway.
//!
//! Asks a text generator for a short "manifesto" per project, at most one
//! request per project at a time, and remembers the answer for the rest of
//! the session.

use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::ConceptConfig;

#[derive(Debug, thiserror::Error)]
pub enum ConceptError {
    #[error("no API key configured (set {0})")]
    MissingApiKey(String),
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("generator returned status {0}")]
    Status(reqwest::StatusCode),
    #[error("generator returned no text")]
    EmptyResponse,
}

/// Generated text per project plus the set of projects with a request out.
#[derive(Debug, Default)]
pub struct ConceptCache {
    entries: HashMap<String, String>,
    in_flight: HashSet<String>,
}

impl ConceptCache {
    /// Claim `project_id` for generation.  False when it is already cached
    /// or already claimed.
    pub fn begin(&mut self, project_id: &str) -> bool {
        if self.entries.contains_key(project_id) || self.in_flight.contains(project_id) {
            return false;
        }
        self.in_flight.insert(project_id.to_string());
        true
    }

    /// Release the claim; store the text when there is one.
    pub fn complete(&mut self, project_id: &str, text: Option<String>) {
        self.in_flight.remove(project_id);
        if let Some(text) = text {
            self.entries.insert(project_id.to_string(), text);
        }
    }

    pub fn get(&self, project_id: &str) -> Option<&str> {
        self.entries.get(project_id).map(String::as_str)
    }

    pub fn is_in_flight(&self, project_id: &str) -> bool {
        self.in_flight.contains(project_id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConceptRequest {
    pub title: String,
    pub mood: String,
}

impl ConceptRequest {
    pub fn prompt(&self) -> String {
        format!(
            "Write a cryptic, poetic two-sentence artist statement for an \
             experimental music and visual project titled \"{}\" with the mood \
             \"{}\". Dark, cyberpunk, avant-garde tone. Under 40 words, no hashtags.",
            self.title, self.mood
        )
    }
}

/// The outbound text service.
pub trait TextGenerator: Send + Sync {
    fn generate(
        &self,
        request: &ConceptRequest,
    ) -> impl Future<Output = Result<String, ConceptError>> + Send;
}

// ── Gemini ────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct GenerateRequest {
    contents: Vec<Content>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

impl GenerateResponse {
    fn into_text(self) -> Option<String> {
        let text: String = self
            .candidates
            .into_iter()
            .next()?
            .content?
            .parts
            .into_iter()
            .map(|p| p.text)
            .collect();
        let text = text.trim();
        (!text.is_empty()).then(|| text.to_string())
    }
}

/// `generateContent` over HTTPS.
pub struct GeminiGenerator {
    client: reqwest::Client,
    endpoint: String,
    model: String,
    api_key: Option<String>,
    api_key_env: String,
}

impl GeminiGenerator {
    pub fn from_config(config: &ConceptConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            api_key: config.resolve_api_key(),
            api_key_env: config.api_key_env.clone(),
        }
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }
}

impl TextGenerator for GeminiGenerator {
    async fn generate(&self, request: &ConceptRequest) -> Result<String, ConceptError> {
        let key = self
            .api_key
            .as_deref()
            .ok_or_else(|| ConceptError::MissingApiKey(self.api_key_env.clone()))?;

        let url = format!("{}/models/{}:generateContent", self.endpoint, self.model);
        let body = GenerateRequest {
            contents: vec![Content {
                parts: vec![Part {
                    text: request.prompt(),
                }],
            }],
        };

        debug!("concept: POST {}", url);
        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", key)
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(ConceptError::Status(response.status()));
        }

        let data: GenerateResponse = response.json().await?;
        data.into_text().ok_or(ConceptError::EmptyResponse)
    }
}

// ── Gateway ───────────────────────────────────────────────────────────────────

#[derive(Debug)]
pub enum ConceptOutcome {
    /// Already generated earlier; no request made.
    Cached(String),
    /// Another request for the same project is outstanding; suppressed.
    InFlight,
    Generated(String),
    /// The request failed.  Nothing was cached, so a later call retries.
    Failed(ConceptError),
}

/// Single-flight front for a [`TextGenerator`].  Cheap to clone; clones share
/// the cache.
pub struct ConceptGateway<G> {
    generator: Arc<G>,
    cache: Arc<Mutex<ConceptCache>>,
}

impl<G> Clone for ConceptGateway<G> {
    fn clone(&self) -> Self {
        Self {
            generator: Arc::clone(&self.generator),
            cache: Arc::clone(&self.cache),
        }
    }
}

impl<G: TextGenerator> ConceptGateway<G> {
    pub fn new(generator: G) -> Self {
        Self {
            generator: Arc::new(generator),
            cache: Arc::new(Mutex::new(ConceptCache::default())),
        }
    }

    pub fn generator(&self) -> &G {
        &self.generator
    }

    pub async fn request_concept(
        &self,
        project_id: &str,
        title: &str,
        mood: &str,
    ) -> ConceptOutcome {
        {
            let mut cache = self.cache();
            if let Some(text) = cache.get(project_id) {
                return ConceptOutcome::Cached(text.to_string());
            }
            if !cache.begin(project_id) {
                debug!("concept: '{}' already in flight", project_id);
                return ConceptOutcome::InFlight;
            }
        }

        info!("concept: generating for '{}'", project_id);
        let request = ConceptRequest {
            title: title.to_string(),
            mood: mood.to_string(),
        };
        let result = self.generator.generate(&request).await;

        let mut cache = self.cache();
        match result {
            Ok(text) => {
                cache.complete(project_id, Some(text.clone()));
                ConceptOutcome::Generated(text)
            }
            Err(e) => {
                warn!("concept: '{}' failed: {}", project_id, e);
                cache.complete(project_id, None);
                ConceptOutcome::Failed(e)
            }
        }
    }

    pub fn concept(&self, project_id: &str) -> Option<String> {
        self.cache().get(project_id).map(str::to_string)
    }

    pub fn is_in_flight(&self, project_id: &str) -> bool {
        self.cache().is_in_flight(project_id)
    }

    fn cache(&self) -> MutexGuard<'_, ConceptCache> {
        // The cache holds plain data, so a poisoned lock is still usable.
        self.cache.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::Notify;

    /// Generator that counts calls and answers from a script.
    #[derive(Default)]
    struct Scripted {
        calls: AtomicUsize,
        fail_first: bool,
        gate: Option<Arc<Notify>>,
    }

    impl TextGenerator for Scripted {
        async fn generate(&self, request: &ConceptRequest) -> Result<String, ConceptError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(gate) = &self.gate {
                gate.notified().await;
            }
            if self.fail_first && n == 0 {
                return Err(ConceptError::EmptyResponse);
            }
            Ok(format!("{} / {}", request.title, request.mood))
        }
    }

    #[test]
    fn cache_claims_once() {
        let mut cache = ConceptCache::default();
        assert!(cache.begin("p1"));
        assert!(!cache.begin("p1"));
        assert!(cache.is_in_flight("p1"));
        cache.complete("p1", Some("text".into()));
        assert!(!cache.is_in_flight("p1"));
        assert!(!cache.begin("p1"));
        assert_eq!(cache.get("p1"), Some("text"));
    }

    #[test]
    fn empty_gemini_response_yields_no_text() {
        let resp: GenerateResponse = serde_json::from_str(r#"{"candidates":[]}"#).unwrap();
        assert_eq!(resp.into_text(), None);

        let resp: GenerateResponse = serde_json::from_str(
            r#"{"candidates":[{"content":{"parts":[{"text":"  Chrome bleeds. "}]}}]}"#,
        )
        .unwrap();
        assert_eq!(resp.into_text().as_deref(), Some("Chrome bleeds."));
    }

    #[tokio::test]
    async fn concurrent_requests_issue_one_call() {
        let gate = Arc::new(Notify::new());
        let gateway = ConceptGateway::new(Scripted {
            gate: Some(Arc::clone(&gate)),
            ..Default::default()
        });

        let first = gateway.request_concept("p1", "CHROME HEARTS", "Industrial");
        let second = async {
            while !gateway.is_in_flight("p1") {
                tokio::task::yield_now().await;
            }
            let outcome = gateway
                .request_concept("p1", "CHROME HEARTS", "Industrial")
                .await;
            gate.notify_one();
            outcome
        };
        let (first, second) = tokio::join!(first, second);

        assert!(matches!(first, ConceptOutcome::Generated(_)));
        assert!(matches!(second, ConceptOutcome::InFlight));
        assert_eq!(gateway.generator().calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn cached_concept_is_not_regenerated() {
        let gateway = ConceptGateway::new(Scripted::default());
        gateway.request_concept("p2", "NEON DREAM", "Ethereal").await;
        let again = gateway.request_concept("p2", "NEON DREAM", "Ethereal").await;

        assert!(matches!(again, ConceptOutcome::Cached(ref t) if t == "NEON DREAM / Ethereal"));
        assert_eq!(gateway.generator().calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn failure_clears_in_flight_and_allows_retry() {
        let gateway = ConceptGateway::new(Scripted {
            fail_first: true,
            ..Default::default()
        });

        let first = gateway.request_concept("p1", "CHROME HEARTS", "Industrial").await;
        assert!(matches!(first, ConceptOutcome::Failed(_)));
        assert!(!gateway.is_in_flight("p1"));
        assert_eq!(gateway.concept("p1"), None);

        let retry = gateway.request_concept("p1", "CHROME HEARTS", "Industrial").await;
        assert!(matches!(retry, ConceptOutcome::Generated(_)));
        assert_eq!(gateway.generator().calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn missing_api_key_is_an_ordinary_failure() {
        let config = ConceptConfig {
            api_key: None,
            api_key_env: "VEIN_TEST_NO_SUCH_KEY".into(),
            ..ConceptConfig::default()
        };
        let gateway = ConceptGateway::new(GeminiGenerator::from_config(&config));
        assert!(!gateway.generator().has_api_key());

        let outcome = gateway.request_concept("p1", "CHROME HEARTS", "Industrial").await;
        assert!(matches!(
            outcome,
            ConceptOutcome::Failed(ConceptError::MissingApiKey(_))
        ));
        assert!(!gateway.is_in_flight("p1"));
    }
}
