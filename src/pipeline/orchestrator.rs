use std::path::PathBuf;
use std::time::Instant;

use anyhow::Result;
use futures::stream::{self, StreamExt};
use tracing::{debug, error, info, warn};

use crate::core::types::{ClubRecord, MergedRecord, OrganizationRow, RunSummary};
use crate::core::PipelineState;
use crate::extract::page::{extract_club_page, FetchError};
use crate::features::antibot::RequestDelay;
use crate::merge::{merge_global, merge_local};
use crate::search::{build_queries, collect_candidate_urls, SearchError};
use crate::tabular;

/// Fetch-and-extract one query's URL batch over a bounded worker pool.
///
/// Each page is an independent unit of work; a failure is logged and isolated,
/// never cancelling its siblings. Only records that carry at least one email
/// survive the batch.
pub async fn process_query_batch(
    state: &PipelineState,
    urls: Vec<String>,
    organization: &str,
    abbreviation: &str,
) -> Vec<ClubRecord> {
    let workers = state.config.resolve_fetch_workers();

    stream::iter(urls)
        .map(|url| {
            let state = state.clone();
            let organization = organization.to_string();
            let abbreviation = abbreviation.to_string();
            async move {
                match extract_club_page(&state, &url, &organization, &abbreviation).await {
                    Ok(rec) if !rec.emails.is_empty() => Some(rec),
                    Ok(rec) => {
                        debug!("No emails on {} ({})", url, rec.club_name);
                        None
                    }
                    Err(FetchError::NotClubPage { title }) => {
                        debug!("Skipping admissions page {} ({})", url, title);
                        None
                    }
                    Err(FetchError::Transient(e)) => {
                        warn!("Failed to fetch {}: {}", url, e);
                        None
                    }
                }
            }
        })
        .buffer_unordered(workers)
        .filter_map(|rec| async { rec })
        .collect()
        .await
}

/// Run every query for one organization and locally merge the results.
///
/// A blocked query pauses the whole pipeline until the suspend gate is
/// resumed externally, then the same query is retried — one pause per
/// challenge, not a retry loop. Transient search failures skip the query.
pub async fn process_organization(
    state: &PipelineState,
    row: &OrganizationRow,
) -> Result<Vec<MergedRecord>> {
    let queries = build_queries(&row.abbreviation, &state.config.resolve_query_templates());
    let (delay_min, delay_max) = state.config.resolve_query_delay_ms();
    let query_delay = RequestDelay::new(delay_min, delay_max);

    let mut local_results: Vec<ClubRecord> = Vec::new();

    for query in &queries {
        let urls = loop {
            state.suspend.wait_until_active().await;

            match collect_candidate_urls(state, query, &row.university, &row.abbreviation).await {
                Ok(urls) => break urls,
                Err(SearchError::Blocked { reason }) => {
                    state.suspend.pause(reason);
                    // Next iteration parks on the gate, then retries this query.
                }
                Err(SearchError::Transient(e)) => {
                    warn!("Search failed for '{}': {}", query, e);
                    break Vec::new();
                }
                Err(e @ SearchError::Fatal(_)) => return Err(e.into()),
            }
        };

        if !urls.is_empty() {
            let records =
                process_query_batch(state, urls, &row.university, &row.abbreviation).await;
            local_results.extend(records);
        }

        query_delay.sleep().await;
    }

    Ok(merge_local(local_results))
}

/// Drive the full run: organizations sequentially (one shared search
/// session), pages concurrently within each query batch.
///
/// An organization-level failure is logged and isolated — the run always
/// terminates by handing back whatever accumulated. Accumulated records are
/// checkpointed after every organization.
pub async fn run(state: &PipelineState, rows: &[OrganizationRow]) -> (Vec<MergedRecord>, RunSummary) {
    let started = Instant::now();
    let checkpoint_path = PathBuf::from(state.config.resolve_checkpoint_path());
    let org_delay = RequestDelay::new(1_000, 2_500);

    let mut summary = RunSummary::default();
    let mut accumulated: Vec<MergedRecord> = Vec::new();

    let total = rows.len();
    for (index, row) in rows.iter().enumerate() {
        info!(
            "[{}/{}] Processing {} ({})",
            index + 1,
            total,
            row.university,
            row.abbreviation
        );

        match process_organization(state, row).await {
            Ok(local) => {
                summary.organizations_processed += 1;
                summary.clubs_found += local.len();
                for rec in &local {
                    let new_emails = state.count_new_emails(rec.emails.iter());
                    info!(
                        "Found club: {} ({} new email(s))",
                        rec.club_name, new_emails
                    );
                    summary.emails_found += new_emails;
                }
                accumulated.extend(local);
            }
            Err(e) => {
                summary.organizations_failed += 1;
                error!("Error processing {}: {}", row.university, e);
            }
        }

        if let Err(e) = tabular::write_checkpoint(&checkpoint_path, &accumulated, index + 1) {
            warn!("Checkpoint write failed: {}", e);
        }

        if index + 1 < total {
            org_delay.sleep().await;
        }
    }

    let merged = merge_global(accumulated);
    summary.total_duration_ms = started.elapsed().as_millis() as u64;

    info!(
        "Run complete: {} unique clubs, {} emails, {} organization(s) failed",
        merged.len(),
        summary.emails_found,
        summary.organizations_failed
    );

    (merged, summary)
}
