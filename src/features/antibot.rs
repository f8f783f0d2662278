use aho_corasick::AhoCorasick;
use reqwest::StatusCode;
use tracing::info;

pub const USER_AGENTS: &[&str] = &[
    // Chrome Desktop (Windows, macOS, Linux)
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/130.0.0.0 Safari/537.36",

    // Firefox Desktop
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:121.0) Gecko/20100101 Firefox/121.0",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 14.2; rv:122.0) Gecko/20100101 Firefox/122.0",

    // Safari Desktop
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.1 Safari/605.1.15",
];

/// Get a random user agent string for stealth
pub fn get_random_user_agent() -> &'static str {
    use rand::prelude::*;
    let mut rng = rand::rng();
    let index = rng.random_range(0..USER_AGENTS.len());
    USER_AGENTS[index]
}

/// Additional stealth headers to avoid bot detection
pub fn get_stealth_headers() -> Vec<(String, String)> {
    vec![
        (
            "Accept".to_string(),
            "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8"
                .to_string(),
        ),
        ("Accept-Language".to_string(), "en-US,en;q=0.9".to_string()),
        ("DNT".to_string(), "1".to_string()),
        ("Connection".to_string(), "keep-alive".to_string()),
        ("Upgrade-Insecure-Requests".to_string(), "1".to_string()),
        ("Sec-Fetch-Dest".to_string(), "document".to_string()),
        ("Sec-Fetch-Mode".to_string(), "navigate".to_string()),
        ("Sec-Fetch-Site".to_string(), "none".to_string()),
    ]
}

/// Request delay configuration for polite scraping
#[derive(Debug, Clone, Copy)]
pub struct RequestDelay {
    /// Minimum delay in milliseconds between requests
    pub min_ms: u64,
    /// Maximum delay in milliseconds between requests
    pub max_ms: u64,
}

impl RequestDelay {
    pub fn new(min_ms: u64, max_ms: u64) -> Self {
        Self { min_ms, max_ms }
    }

    /// Get random delay within configured range with jitter
    pub fn random_delay(&self) -> u64 {
        use rand::prelude::*;
        let mut rng = rand::rng();
        let base_delay = rng.random_range(self.min_ms..=self.max_ms);

        // ±20% jitter to avoid pattern detection
        let jitter_range = (base_delay as f64 * 0.2) as i64;
        let jitter = if jitter_range > 0 {
            rng.random_range(-jitter_range..=jitter_range)
        } else {
            0
        };

        (base_delay as i64 + jitter).max(self.min_ms as i64) as u64
    }

    pub async fn sleep(&self) {
        let delay = self.random_delay();
        if delay > 0 {
            info!("Applying request delay: {}ms", delay);
            tokio::time::sleep(tokio::time::Duration::from_millis(delay)).await;
        }
    }
}

/// Detects anti-bot challenge pages in search responses.
///
/// Phrase scanning is case-insensitive Aho-Corasick over the whole body, so
/// one pass covers the full configured phrase set. HTTP status codes that
/// search providers use for rate limiting are treated as challenges too.
pub struct ChallengeDetector {
    matcher: AhoCorasick,
    phrases: Vec<String>,
}

impl ChallengeDetector {
    pub fn new(phrases: &[String]) -> Self {
        let matcher = AhoCorasick::builder()
            .ascii_case_insensitive(true)
            .build(phrases)
            .expect("valid challenge phrase patterns");
        Self {
            matcher,
            phrases: phrases.to_vec(),
        }
    }

    /// Returns the matched phrase when the body looks like a challenge page.
    pub fn detect(&self, body: &str) -> Option<String> {
        self.matcher
            .find(body)
            .map(|m| self.phrases[m.pattern().as_usize()].clone())
    }

    /// Status-level block signals, independent of body content.
    pub fn blocked_status(status: StatusCode) -> Option<&'static str> {
        match status {
            StatusCode::TOO_MANY_REQUESTS => Some("http_429"),
            StatusCode::FORBIDDEN => Some("http_403"),
            StatusCode::SERVICE_UNAVAILABLE => Some("http_503"),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::ScoutConfig;

    fn detector() -> ChallengeDetector {
        ChallengeDetector::new(&ScoutConfig::default().resolve_challenge_phrases())
    }

    #[test]
    fn test_user_agents() {
        assert!(USER_AGENTS[0].contains("Mozilla"));
    }

    #[test]
    fn detects_challenge_phrases_case_insensitively() {
        let d = detector();
        let body = "<html>Our systems have detected UNUSUAL TRAFFIC from your network</html>";
        assert!(d.detect(body).is_some());
    }

    #[test]
    fn detects_recaptcha_marker() {
        let d = detector();
        assert_eq!(
            d.detect("<div class=\"g-recaptcha\"></div>").as_deref(),
            Some("recaptcha")
        );
    }

    #[test]
    fn clean_page_is_not_a_challenge() {
        let d = detector();
        let body = "<html><title>Investment Club</title><p>Contact us</p></html>";
        assert!(d.detect(body).is_none());
    }

    #[test]
    fn blocked_statuses() {
        assert_eq!(
            ChallengeDetector::blocked_status(StatusCode::TOO_MANY_REQUESTS),
            Some("http_429")
        );
        assert_eq!(ChallengeDetector::blocked_status(StatusCode::OK), None);
    }

    #[test]
    fn delay_stays_at_or_above_minimum() {
        let delay = RequestDelay::new(50, 100);
        for _ in 0..32 {
            assert!(delay.random_delay() >= 50);
        }
    }
}
