use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// One input row: the real-world organization a search round runs for.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct OrganizationRow {
    pub university: String,
    pub abbreviation: String,
}

/// One successfully processed candidate page.
///
/// Produced by the page extractor, owned by the orchestrator until merged.
/// `emails` may be empty — such records are dropped before accumulation.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct ClubRecord {
    pub organization: String,
    pub abbreviation: String,
    pub club_name: String,
    pub url: String,
    pub emails: BTreeSet<String>,
}

impl ClubRecord {
    pub fn new(
        organization: impl Into<String>,
        abbreviation: impl Into<String>,
        club_name: impl Into<String>,
        url: impl Into<String>,
        emails: BTreeSet<String>,
    ) -> Self {
        Self {
            organization: organization.into(),
            abbreviation: abbreviation.into(),
            club_name: club_name.into(),
            url: url.into(),
            emails,
        }
    }
}

/// Canonical deduplicated record after merging.
///
/// `emails` is the union of every merged input's emails. `club_name` is the
/// longest name seen for the merge key. `primary_url` is the first URL
/// encountered; the rest land in `extra_urls`. At global scope a record may
/// represent several organizations whose identities were concatenated.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct MergedRecord {
    pub organization: String,
    pub abbreviation: String,
    pub club_name: String,
    pub primary_url: String,
    #[serde(default)]
    pub extra_urls: Vec<String>,
    pub emails: BTreeSet<String>,
}

impl MergedRecord {
    /// Legacy display form: extra URLs annotated inside the name string.
    ///
    /// The trailing `))` is carried over verbatim from the historical output
    /// format — downstream consumers match on it.
    pub fn display_name(&self) -> String {
        if self.extra_urls.is_empty() {
            self.club_name.clone()
        } else {
            format!(
                "{} (Additional URLs: {}))",
                self.club_name,
                self.extra_urls.join(", ")
            )
        }
    }
}

/// Counters reported at the end of a run.
#[derive(Debug, Serialize, Deserialize, Default, Clone)]
pub struct RunSummary {
    pub organizations_processed: usize,
    pub organizations_failed: usize,
    pub clubs_found: usize,
    pub emails_found: usize,
    pub total_duration_ms: u64,
}

/// Periodic on-disk snapshot so a crash loses at most the in-flight organization.
#[derive(Debug, Serialize, Deserialize)]
pub struct Checkpoint {
    pub written_at: chrono::DateTime<chrono::Utc>,
    pub completed_organizations: usize,
    pub records: Vec<MergedRecord>,
}
