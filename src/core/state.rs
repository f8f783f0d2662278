use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use crate::core::config::ScoutConfig;
use crate::features::antibot::ChallengeDetector;
use crate::pipeline::suspend::SuspendGate;

/// Shared context for one full run.
///
/// All mutable cross-worker state lives here behind locks: the run-scoped
/// seen-URL set and the processed-email set are touched from concurrent fetch
/// workers and must never be shared unsynchronized.
#[derive(Clone)]
pub struct PipelineState {
    pub http_client: reqwest::Client,
    pub config: Arc<ScoutConfig>,
    pub challenge_detector: Arc<ChallengeDetector>,
    pub suspend: SuspendGate,
    seen_urls: Arc<Mutex<HashSet<String>>>,
    processed_emails: Arc<Mutex<HashSet<String>>>,
}

impl std::fmt::Debug for PipelineState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipelineState")
            .field("seen_urls", &self.seen_urls.lock().unwrap().len())
            .field(
                "processed_emails",
                &self.processed_emails.lock().unwrap().len(),
            )
            .field("paused", &self.suspend.is_paused())
            .finish()
    }
}

impl PipelineState {
    pub fn new(http_client: reqwest::Client, config: ScoutConfig) -> Self {
        let challenge_detector = Arc::new(ChallengeDetector::new(&config.resolve_challenge_phrases()));
        Self {
            http_client,
            config: Arc::new(config),
            challenge_detector,
            suspend: SuspendGate::new(),
            seen_urls: Arc::new(Mutex::new(HashSet::new())),
            processed_emails: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    /// Record a normalized URL. Returns `true` the first time it is seen.
    pub fn mark_url_seen(&self, normalized: &str) -> bool {
        self.seen_urls.lock().unwrap().insert(normalized.to_string())
    }

    pub fn url_seen(&self, normalized: &str) -> bool {
        self.seen_urls.lock().unwrap().contains(normalized)
    }

    /// Record an accepted email. Returns how many of the given set are new.
    pub fn count_new_emails<'a>(&self, emails: impl IntoIterator<Item = &'a String>) -> usize {
        let mut guard = self.processed_emails.lock().unwrap();
        emails
            .into_iter()
            .filter(|e| guard.insert((*e).clone()))
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_state() -> PipelineState {
        PipelineState::new(reqwest::Client::new(), ScoutConfig::default())
    }

    #[test]
    fn url_seen_set_deduplicates() {
        let state = test_state();
        assert!(state.mark_url_seen("a.edu/clubs"));
        assert!(!state.mark_url_seen("a.edu/clubs"));
        assert!(state.url_seen("a.edu/clubs"));
        assert!(!state.url_seen("b.edu/clubs"));
    }

    #[test]
    fn email_counter_only_counts_new() {
        let state = test_state();
        let first: Vec<String> = vec!["x@a.edu".into(), "y@a.edu".into()];
        let second: Vec<String> = vec!["y@a.edu".into(), "z@a.edu".into()];
        assert_eq!(state.count_new_emails(first.iter()), 2);
        assert_eq!(state.count_new_emails(second.iter()), 1);
    }

    #[test]
    fn state_clones_share_the_seen_set() {
        let state = test_state();
        let clone = state.clone();
        assert!(state.mark_url_seen("a.edu/clubs"));
        assert!(!clone.mark_url_seen("a.edu/clubs"));
    }
}
