//! Search result collection: one SERP request per query, challenge detection,
//! run-scoped URL dedup, relevance filtering, and a hard cap per query.

use percent_encoding::{utf8_percent_encode, NON_ALPHANUMERIC};
use scraper::{Html, Selector};
use thiserror::Error;
use tracing::{debug, info};

use crate::core::PipelineState;
use crate::extract::relevance::is_organization_related;
use crate::features::antibot::{self, ChallengeDetector};

#[derive(Debug, Error)]
pub enum SearchError {
    /// Anti-bot challenge — the pipeline must suspend until externally resumed.
    #[error("blocked: {reason}")]
    Blocked { reason: String },
    #[error("transient: {0}")]
    Transient(String),
    #[error("fatal: {0}")]
    Fatal(String),
}

/// Build the query list for one organization from the configured templates.
pub fn build_queries(abbreviation: &str, templates: &[String]) -> Vec<String> {
    templates
        .iter()
        .map(|t| t.replace("{abbr}", abbreviation))
        .collect()
}

fn search_url(query: &str, result_count: usize) -> Result<reqwest::Url, SearchError> {
    let encoded = utf8_percent_encode(query, NON_ALPHANUMERIC).to_string();
    // filter=0 asks for more diverse results.
    reqwest::Url::parse(&format!(
        "https://www.google.com/search?q={}&num={}&filter=0",
        encoded, result_count
    ))
    .map_err(|e| SearchError::Fatal(e.to_string()))
}

/// Normalize a URL to its scheme-stripped comparison form: host + path with
/// the trailing slash trimmed. Two spellings of the same page compare equal.
pub fn normalize_url(raw: &str) -> String {
    match url::Url::parse(raw) {
        Ok(u) => {
            let host = u.host_str().unwrap_or_default();
            format!("{}{}", host, u.path()).trim_end_matches('/').to_string()
        }
        Err(_) => raw
            .trim_start_matches("https://")
            .trim_start_matches("http://")
            .trim_end_matches('/')
            .to_string(),
    }
}

/// Unwrap result-page redirect hrefs to the destination URL.
fn normalize_result_href(href: &str) -> Option<String> {
    if href.is_empty() {
        return None;
    }

    if href.starts_with("/url?") {
        if let Ok(url) = reqwest::Url::parse(&format!("https://www.google.com{}", href)) {
            for (k, v) in url.query_pairs() {
                if k == "q" && !v.is_empty() {
                    return Some(v.to_string());
                }
            }
        }
        return None;
    }

    if href.starts_with("http://") || href.starts_with("https://") {
        return Some(href.to_string());
    }

    None
}

/// Pull candidate hrefs out of a result page, in document order.
///
/// Result markup changes often; we try the known container patterns and fall
/// back to bare in-search anchors. A malformed anchor is skipped, never fatal.
pub fn parse_result_hrefs(html: &str) -> Vec<String> {
    let doc = Html::parse_document(html);
    let link_sel = Selector::parse("a[href]").expect("valid anchor selector");

    let container_selectors = ["div#search div.MjjYud", "div.g", "div#search"];

    let mut out = Vec::new();
    for css in container_selectors {
        let Ok(container_sel) = Selector::parse(css) else {
            continue;
        };

        for container in doc.select(&container_sel) {
            for a in container.select(&link_sel) {
                let href = a.value().attr("href").unwrap_or("");
                if let Some(url) = normalize_result_href(href) {
                    if !out.contains(&url) {
                        out.push(url);
                    }
                }
            }
        }

        if !out.is_empty() {
            break;
        }
    }

    out
}

/// Run one query and return its capped, deduplicated, relevant URL list.
///
/// Partial results are acceptable on any mid-scan failure; only a blocked
/// response or a failed request aborts the query itself.
pub async fn collect_candidate_urls(
    state: &PipelineState,
    query: &str,
    organization: &str,
    abbreviation: &str,
) -> Result<Vec<String>, SearchError> {
    let cap = state.config.resolve_results_per_query();
    let excluded = state.config.resolve_excluded_domains();

    info!("Search request for: {}", query);
    let url = search_url(query, state.config.resolve_serp_result_count())?;

    let mut req = state
        .http_client
        .get(url)
        .header("User-Agent", antibot::get_random_user_agent());
    for (k, v) in antibot::get_stealth_headers() {
        req = req.header(k, v);
    }

    let response = req
        .send()
        .await
        .map_err(|e| SearchError::Transient(e.to_string()))?;

    let status = response.status();
    if let Some(reason) = ChallengeDetector::blocked_status(status) {
        return Err(SearchError::Blocked {
            reason: reason.to_string(),
        });
    }

    let body = response
        .text()
        .await
        .map_err(|e| SearchError::Transient(e.to_string()))?;

    if let Some(phrase) = state.challenge_detector.detect(&body) {
        return Err(SearchError::Blocked { reason: phrase });
    }

    let mut results = Vec::new();
    for href in parse_result_hrefs(&body) {
        if results.len() >= cap {
            break;
        }

        let normalized = normalize_url(&href);
        if state.url_seen(&normalized) {
            continue;
        }

        if !is_organization_related(&href, organization, abbreviation, &excluded) {
            continue;
        }

        state.mark_url_seen(&normalized);
        debug!("Found new result: {}", href);
        results.push(href);
    }

    Ok(results)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::ScoutConfig;

    #[test]
    fn queries_substitute_the_abbreviation() {
        let templates = ScoutConfig::default().resolve_query_templates();
        let queries = build_queries("SU", &templates);
        assert_eq!(queries.len(), templates.len());
        assert!(queries.contains(&"SU investment club".to_string()));
        assert!(queries.contains(&"traders at SU".to_string()));
        assert!(queries.iter().all(|q| !q.contains("{abbr}")));
    }

    #[test]
    fn normalize_url_strips_scheme_and_trailing_slash() {
        assert_eq!(normalize_url("https://clubs.stateu.edu/investing/"), "clubs.stateu.edu/investing");
        assert_eq!(normalize_url("http://clubs.stateu.edu/investing"), "clubs.stateu.edu/investing");
    }

    #[test]
    fn normalize_url_drops_query_strings() {
        assert_eq!(
            normalize_url("https://stateu.edu/clubs?page=2"),
            "stateu.edu/clubs"
        );
    }

    #[test]
    fn redirect_hrefs_unwrap_to_destination() {
        assert_eq!(
            normalize_result_href("/url?q=https://stateu.edu/clubs&sa=U"),
            Some("https://stateu.edu/clubs".to_string())
        );
        assert_eq!(normalize_result_href("/search?q=next+page"), None);
        assert_eq!(normalize_result_href(""), None);
    }

    #[test]
    fn parses_result_containers() {
        let html = r#"
            <html><body><div id="search">
              <div class="MjjYud"><a href="https://clubs.stateu.edu/investing"><h3>Investment Club</h3></a></div>
              <div class="MjjYud"><a href="/url?q=https://su-traders.org/&sa=U"><h3>SU Traders</h3></a></div>
              <div class="MjjYud"><a href="/search?q=more">More</a></div>
            </div></body></html>
        "#;
        let hrefs = parse_result_hrefs(html);
        assert_eq!(
            hrefs,
            vec![
                "https://clubs.stateu.edu/investing".to_string(),
                "https://su-traders.org/".to_string(),
            ]
        );
    }

    #[test]
    fn falls_back_to_legacy_result_markup() {
        let html = r#"
            <div class="g"><a href="https://stateu.edu/finance-club">Finance Club</a></div>
        "#;
        assert_eq!(
            parse_result_hrefs(html),
            vec!["https://stateu.edu/finance-club".to_string()]
        );
    }

    #[test]
    fn empty_page_yields_no_results() {
        assert!(parse_result_hrefs("<html><body></body></html>").is_empty());
    }
}
