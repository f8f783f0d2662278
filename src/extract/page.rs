use std::collections::BTreeSet;

use scraper::{Html, Selector};
use thiserror::Error;
use tracing::debug;

use crate::core::types::ClubRecord;
use crate::core::PipelineState;
use crate::extract::email::{clean_email, find_raw_emails};
use crate::extract::relevance::is_club_email;
use crate::features::antibot;

/// Failure kinds for one candidate page. The orchestrator decides per kind;
/// every kind means "skip this page", never "abort the batch".
#[derive(Debug, Error)]
pub enum FetchError {
    /// Timeout, connection failure, or any other transport-level error.
    #[error("transient: {0}")]
    Transient(String),
    /// The page title marks an admissions page, not a club page.
    #[error("not a club page: {title}")]
    NotClubPage { title: String },
}

impl From<reqwest::Error> for FetchError {
    fn from(e: reqwest::Error) -> Self {
        FetchError::Transient(e.to_string())
    }
}

/// Fetch one candidate page and extract a club-name guess plus validated emails.
///
/// On any fetch failure the whole page is skipped — no partial record. An
/// empty email set is still a successful extraction; records without emails
/// are filtered out upstream.
pub async fn extract_club_page(
    state: &PipelineState,
    url: &str,
    organization: &str,
    abbreviation: &str,
) -> Result<ClubRecord, FetchError> {
    let response = state
        .http_client
        .get(url)
        .header("User-Agent", antibot::get_random_user_agent())
        .send()
        .await?;
    let body = response.text().await?;

    let club_name = page_title(&body).unwrap_or_else(|| "Unknown Club".to_string());

    let admission_terms = state.config.resolve_admission_terms();
    let name_l = club_name.to_lowercase();
    if admission_terms.iter().any(|t| name_l.contains(t.as_str())) {
        return Err(FetchError::NotClubPage { title: club_name });
    }

    let emails = collect_page_emails(&body, organization, state);
    debug!(url, club = %club_name, emails = emails.len(), "page extracted");

    Ok(ClubRecord::new(
        organization,
        abbreviation,
        club_name,
        url,
        emails,
    ))
}

/// Club-name guess: the trimmed `<title>` text, if the page has one.
fn page_title(body: &str) -> Option<String> {
    let doc = Html::parse_document(body);
    let sel = Selector::parse("title").ok()?;
    let title = doc
        .select(&sel)
        .next()?
        .text()
        .collect::<Vec<_>>()
        .join(" ");
    let trimmed = title.split_whitespace().collect::<Vec<_>>().join(" ");
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed)
    }
}

/// Scan the full body, then validate and relevance-filter every match.
/// Individual rejections drop single emails, never the record.
fn collect_page_emails(body: &str, organization: &str, state: &PipelineState) -> BTreeSet<String> {
    let denied_domains = state.config.resolve_denied_email_domains();
    let denied_patterns = state.config.resolve_denied_email_patterns();

    find_raw_emails(body)
        .iter()
        .filter_map(|raw| clean_email(raw, &denied_domains))
        .filter(|email| is_club_email(email, organization, &denied_patterns))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::ScoutConfig;

    fn test_state() -> PipelineState {
        PipelineState::new(reqwest::Client::new(), ScoutConfig::default())
    }

    #[test]
    fn title_is_extracted_and_whitespace_collapsed() {
        let body = "<html><head><title>  Investment \n Club  </title></head></html>";
        assert_eq!(page_title(body), Some("Investment Club".to_string()));
    }

    #[test]
    fn missing_title_yields_none() {
        assert_eq!(page_title("<html><body>No title here</body></html>"), None);
    }

    #[test]
    fn page_emails_are_validated_and_filtered() {
        let state = test_state();
        let body = r#"
            <html><body>
              Contact: Jane.Doe [at] StateU.edu
              Abuse: abuse@wixpress.com
              Robot: noreply@clubmail.org
            </body></html>
        "#;
        let emails = collect_page_emails(body, "State University", &state);
        assert_eq!(emails.len(), 1);
        assert!(emails.contains("jane.doe@stateu.edu"));
    }
}
