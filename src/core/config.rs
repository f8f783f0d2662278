// ---------------------------------------------------------------------------
// ScoutConfig — file-based config loader (campus-scout.json) with env-var fallback
// ---------------------------------------------------------------------------

/// Top-level config loaded from `campus-scout.json`.
///
/// Every field is optional in the file; each `resolve_*` accessor applies the
/// env-var fallback and the built-in default. The keyword and denylist tables
/// ship with working defaults so a missing config file is a valid config file.
#[derive(serde::Deserialize, Default, Clone, Debug)]
pub struct ScoutConfig {
    /// Input CSV with `University` and `Abbreviation` columns.
    pub input_path: Option<String>,
    /// Output CSV — one row per (organization, club, url, email).
    pub output_path: Option<String>,
    /// JSON checkpoint written after each organization completes.
    pub checkpoint_path: Option<String>,
    /// Skip this many input rows (resume support for interrupted runs).
    pub start_row: Option<usize>,
    /// Query templates. `{abbr}` is replaced with the organization abbreviation.
    pub query_templates: Option<Vec<String>>,
    /// Generic platforms never treated as organization pages.
    pub excluded_domains: Option<Vec<String>>,
    /// Email domains (and misparsed asset extensions) rejected outright.
    pub denied_email_domains: Option<Vec<String>>,
    /// Administrative / no-reply address patterns rejected by the relevance filter.
    pub denied_email_patterns: Option<Vec<String>>,
    /// Title terms that mark a page as an admissions page, not a club page.
    pub admission_terms: Option<Vec<String>>,
    /// Phrases that identify an anti-bot challenge in a search response.
    pub challenge_phrases: Option<Vec<String>>,
    /// Candidate URL cap per query. Default: 8.
    pub results_per_query: Option<usize>,
    /// Result count requested from the search page. Default: 20.
    pub serp_result_count: Option<usize>,
    /// Concurrent page fetch workers per query batch. Default: 3.
    pub fetch_workers: Option<usize>,
    /// Per-request timeout for page fetches, seconds. Default: 15.
    pub page_timeout_secs: Option<u64>,
    /// TCP connect timeout, seconds. Default: 10.
    pub connect_timeout_secs: Option<u64>,
    /// Randomized delay between queries, milliseconds.
    pub query_delay_min_ms: Option<u64>,
    pub query_delay_max_ms: Option<u64>,
}

pub const ENV_CONFIG_PATH: &str = "CAMPUS_SCOUT_CONFIG";

impl ScoutConfig {
    /// Input path: JSON field → `CAMPUS_SCOUT_INPUT` env var → `universities.csv`.
    pub fn resolve_input_path(&self) -> String {
        self.string_or(&self.input_path, "CAMPUS_SCOUT_INPUT", "universities.csv")
    }

    /// Output path: JSON field → `CAMPUS_SCOUT_OUTPUT` env var → `clubs_output.csv`.
    pub fn resolve_output_path(&self) -> String {
        self.string_or(&self.output_path, "CAMPUS_SCOUT_OUTPUT", "clubs_output.csv")
    }

    /// Checkpoint path: JSON field → `CAMPUS_SCOUT_CHECKPOINT` env var → `checkpoint.json`.
    pub fn resolve_checkpoint_path(&self) -> String {
        self.string_or(
            &self.checkpoint_path,
            "CAMPUS_SCOUT_CHECKPOINT",
            "checkpoint.json",
        )
    }

    /// Rows to skip at the top of the input: JSON field → `CAMPUS_SCOUT_START_ROW` → 0.
    pub fn resolve_start_row(&self) -> usize {
        if let Some(n) = self.start_row {
            return n;
        }
        std::env::var("CAMPUS_SCOUT_START_ROW")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(0)
    }

    pub fn resolve_query_templates(&self) -> Vec<String> {
        self.list_or(&self.query_templates, default_query_templates)
    }

    pub fn resolve_excluded_domains(&self) -> Vec<String> {
        self.list_or(&self.excluded_domains, default_excluded_domains)
    }

    pub fn resolve_denied_email_domains(&self) -> Vec<String> {
        self.list_or(&self.denied_email_domains, default_denied_email_domains)
    }

    pub fn resolve_denied_email_patterns(&self) -> Vec<String> {
        self.list_or(&self.denied_email_patterns, default_denied_email_patterns)
    }

    pub fn resolve_admission_terms(&self) -> Vec<String> {
        self.list_or(&self.admission_terms, default_admission_terms)
    }

    pub fn resolve_challenge_phrases(&self) -> Vec<String> {
        self.list_or(&self.challenge_phrases, default_challenge_phrases)
    }

    /// Candidate URL cap per query. Bounds downstream fetch work.
    pub fn resolve_results_per_query(&self) -> usize {
        self.results_per_query.unwrap_or(8)
    }

    pub fn resolve_serp_result_count(&self) -> usize {
        self.serp_result_count.unwrap_or(20)
    }

    pub fn resolve_fetch_workers(&self) -> usize {
        self.fetch_workers.unwrap_or(3).max(1)
    }

    pub fn resolve_page_timeout_secs(&self) -> u64 {
        self.page_timeout_secs.unwrap_or(15)
    }

    pub fn resolve_connect_timeout_secs(&self) -> u64 {
        self.connect_timeout_secs.unwrap_or(10)
    }

    /// Inter-query delay range, normalized so min <= max.
    pub fn resolve_query_delay_ms(&self) -> (u64, u64) {
        let min = self.query_delay_min_ms.unwrap_or(4_000);
        let max = self.query_delay_max_ms.unwrap_or(6_000);
        if min > max {
            (max, min)
        } else {
            (min, max)
        }
    }

    fn string_or(&self, field: &Option<String>, env_key: &str, default: &str) -> String {
        if let Some(v) = field {
            if !v.trim().is_empty() {
                return v.clone();
            }
        }
        std::env::var(env_key)
            .ok()
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| default.to_string())
    }

    fn list_or(&self, field: &Option<Vec<String>>, default: fn() -> Vec<String>) -> Vec<String> {
        match field {
            Some(v) if !v.is_empty() => v.clone(),
            _ => default(),
        }
    }
}

/// Load `campus-scout.json` from standard locations.
///
/// Search order (first found wins):
/// 1. `CAMPUS_SCOUT_CONFIG` env var path
/// 2. `./campus-scout.json` (process cwd)
/// 3. `../campus-scout.json` (one level up)
///
/// Missing file → `ScoutConfig::default()` (silent, all env-var fallbacks apply).
/// Parse error → log a warning, return `ScoutConfig::default()`.
pub fn load_scout_config() -> ScoutConfig {
    let candidates: Vec<std::path::PathBuf> = {
        let mut v = vec![
            std::path::PathBuf::from("campus-scout.json"),
            std::path::PathBuf::from("../campus-scout.json"),
        ];
        if let Ok(env_path) = std::env::var(ENV_CONFIG_PATH) {
            v.insert(0, std::path::PathBuf::from(env_path));
        }
        v
    };

    for path in &candidates {
        match std::fs::read_to_string(path) {
            Ok(contents) => match serde_json::from_str::<ScoutConfig>(&contents) {
                Ok(cfg) => {
                    tracing::info!("campus-scout.json loaded from {}", path.display());
                    return cfg;
                }
                Err(e) => {
                    tracing::warn!(
                        "campus-scout.json parse error at {}: {} — using defaults",
                        path.display(),
                        e
                    );
                    return ScoutConfig::default();
                }
            },
            Err(_) => continue, // file not found at this path — try next
        }
    }

    ScoutConfig::default()
}

// ---------------------------------------------------------------------------
// Default tables
// ---------------------------------------------------------------------------

fn default_query_templates() -> Vec<String> {
    [
        "{abbr} investment club",
        "{abbr} trading club",
        "{abbr} finance club",
        "{abbr} traders",
        "{abbr} value investing",
        "{abbr} undergrad trading",
        "{abbr} alternative investment",
        "{abbr} sales and trading",
        "traders at {abbr}",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_excluded_domains() -> Vec<String> {
    [
        "google.com",
        "facebook.com",
        "twitter.com",
        "instagram.com",
        "linkedin.com",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_denied_email_domains() -> Vec<String> {
    [
        "wixpress.com",
        "sentry.io",
        "mailchimp.com",
        "sendgrid.net",
        "amazonses.com",
        ".png",
        ".jpg",
        ".jpeg",
        ".gif",
        ".webp",
        ".svg",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_denied_email_patterns() -> Vec<String> {
    [
        "example.com",
        "test.com",
        "domain.com",
        "support@",
        "noreply@",
        "admin@",
        "webmaster@",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_admission_terms() -> Vec<String> {
    ["admission", "admissions", "apply", "application"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_challenge_phrases() -> Vec<String> {
    [
        "our systems have detected unusual traffic",
        "unusual traffic from your computer network",
        "solve this puzzle",
        "please try again later",
        "type the text",
        "id=\"captcha\"",
        "recaptcha",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_on_empty_config() {
        let cfg = ScoutConfig::default();
        assert_eq!(cfg.resolve_results_per_query(), 8);
        assert_eq!(cfg.resolve_fetch_workers(), 3);
        assert_eq!(cfg.resolve_query_delay_ms(), (4_000, 6_000));
        assert!(cfg
            .resolve_query_templates()
            .iter()
            .all(|t| t.contains("{abbr}")));
        assert!(cfg
            .resolve_excluded_domains()
            .contains(&"google.com".to_string()));
    }

    #[test]
    fn delay_range_is_normalized() {
        let cfg = ScoutConfig {
            query_delay_min_ms: Some(9_000),
            query_delay_max_ms: Some(2_000),
            ..Default::default()
        };
        assert_eq!(cfg.resolve_query_delay_ms(), (2_000, 9_000));
    }

    #[test]
    fn file_values_win_over_defaults() {
        let cfg: ScoutConfig = serde_json::from_str(
            r#"{"results_per_query": 4, "query_templates": ["{abbr} chess club"]}"#,
        )
        .unwrap();
        assert_eq!(cfg.resolve_results_per_query(), 4);
        assert_eq!(cfg.resolve_query_templates(), vec!["{abbr} chess club"]);
    }

    #[test]
    fn zero_workers_clamps_to_one() {
        let cfg = ScoutConfig {
            fetch_workers: Some(0),
            ..Default::default()
        };
        assert_eq!(cfg.resolve_fetch_workers(), 1);
    }
}
