//! Two-level hierarchical deduplication: records merged within one
//! organization's results first, then globally across all organizations.
//! One algorithm, two scopes — only identity handling differs.

use std::collections::HashMap;

use crate::core::types::{ClubRecord, MergedRecord};

/// Normalized names shorter than this get the URL's domain appended to the
/// key, so generic short names ("Club") on different sites never merge.
const SHORT_KEY_THRESHOLD: usize = 10;

/// Dedup key: lowercased club name with parenthesized qualifiers and
/// non-alphanumerics stripped, domain-extended when too short to be
/// distinctive.
///
/// Parenthesized segments ("(Collegiate)", chapter qualifiers, the legacy
/// extra-URL annotation) are decoration on the same entity, so they must not
/// split the key.
pub fn normalize_key(club_name: &str, url: &str) -> String {
    let norm: String = strip_parenthesized(club_name)
        .to_lowercase()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .collect();
    if norm.len() < SHORT_KEY_THRESHOLD {
        format!("{}_{}", norm, domain_of(url))
    } else {
        norm
    }
}

fn strip_parenthesized(name: &str) -> String {
    let mut depth = 0usize;
    name.chars()
        .filter(|&c| match c {
            '(' => {
                depth += 1;
                false
            }
            ')' => {
                depth = depth.saturating_sub(1);
                false
            }
            _ => depth == 0,
        })
        .collect()
}

fn domain_of(url: &str) -> String {
    url::Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_string))
        .unwrap_or_default()
}

/// Merge records discovered across all queries for one organization.
pub fn merge_local(records: Vec<ClubRecord>) -> Vec<MergedRecord> {
    let mut acc = Accumulator::new(false);
    for rec in records {
        let key = normalize_key(&rec.club_name, &rec.url);
        acc.absorb(
            key,
            rec.organization,
            rec.abbreviation,
            rec.club_name,
            rec.emails,
            vec![rec.url],
        );
    }
    acc.finalize()
}

/// Merge the per-organization outputs across the whole run.
///
/// When one entity key spans organizations, both identities are concatenated
/// rather than one being dropped. Output is sorted by organization name.
pub fn merge_global(records: Vec<MergedRecord>) -> Vec<MergedRecord> {
    let mut acc = Accumulator::new(true);
    for rec in records {
        let key = normalize_key(&rec.club_name, &rec.primary_url);
        let mut urls = vec![rec.primary_url];
        urls.extend(rec.extra_urls);
        acc.absorb(
            key,
            rec.organization,
            rec.abbreviation,
            rec.club_name,
            rec.emails,
            urls,
        );
    }
    let mut out = acc.finalize();
    out.sort_by(|a, b| a.organization.cmp(&b.organization));
    out
}

struct MergeSlot {
    organization: String,
    abbreviation: String,
    club_name: String,
    emails: std::collections::BTreeSet<String>,
    urls: Vec<String>,
}

/// Insertion-ordered key → slot accumulator. Insertion order is preserved so
/// merge output is deterministic regardless of map internals.
struct Accumulator {
    combine_identities: bool,
    order: Vec<String>,
    slots: HashMap<String, MergeSlot>,
}

impl Accumulator {
    fn new(combine_identities: bool) -> Self {
        Self {
            combine_identities,
            order: Vec::new(),
            slots: HashMap::new(),
        }
    }

    fn absorb(
        &mut self,
        key: String,
        organization: String,
        abbreviation: String,
        club_name: String,
        emails: std::collections::BTreeSet<String>,
        urls: Vec<String>,
    ) {
        match self.slots.get_mut(&key) {
            Some(slot) => {
                // Longer name wins, independent of insertion order.
                if club_name.len() > slot.club_name.len() {
                    slot.club_name = club_name;
                }
                slot.emails.extend(emails);
                slot.urls.extend(urls);

                if self.combine_identities && slot.organization != organization {
                    slot.organization = format!("{} & {}", slot.organization, organization);
                    slot.abbreviation = format!("{}/{}", slot.abbreviation, abbreviation);
                }
            }
            None => {
                self.order.push(key.clone());
                self.slots.insert(
                    key,
                    MergeSlot {
                        organization,
                        abbreviation,
                        club_name,
                        emails,
                        urls,
                    },
                );
            }
        }
    }

    fn finalize(mut self) -> Vec<MergedRecord> {
        self.order
            .drain(..)
            .map(|key| {
                let slot = self.slots.remove(&key).expect("ordered key has a slot");
                let mut urls = slot.urls.into_iter();
                let primary_url = urls.next().unwrap_or_default();
                MergedRecord {
                    organization: slot.organization,
                    abbreviation: slot.abbreviation,
                    club_name: slot.club_name,
                    primary_url,
                    extra_urls: urls.collect(),
                    emails: slot.emails,
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    fn emails(items: &[&str]) -> BTreeSet<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn record(name: &str, url: &str, mail: &[&str]) -> ClubRecord {
        ClubRecord::new("StateU", "SU", name, url, emails(mail))
    }

    #[test]
    fn key_strips_case_and_punctuation() {
        assert_eq!(
            normalize_key("Investment Club!", "http://a.edu"),
            "investmentclub"
        );
        assert_eq!(
            normalize_key("investment-club", "http://b.edu"),
            "investmentclub"
        );
    }

    #[test]
    fn parenthesized_qualifiers_do_not_split_keys() {
        assert_eq!(
            normalize_key("Investment Club (Collegiate)", "http://a.edu"),
            normalize_key("Investment Club", "http://b.edu")
        );
        assert_eq!(
            normalize_key(
                "Investment Club (Additional URLs: http://b.edu))",
                "http://a.edu"
            ),
            "investmentclub"
        );
    }

    #[test]
    fn short_keys_are_domain_extended() {
        assert_eq!(normalize_key("Club", "http://a.edu/x"), "club_a.edu");
        assert_eq!(normalize_key("Club", "http://b.edu/x"), "club_b.edu");
    }

    #[test]
    fn long_identical_keys_merge_across_urls() {
        let merged = merge_local(vec![
            record("Investment Club", "http://a.edu", &["x@a.edu"]),
            record("Investment Club", "http://b.edu", &["y@a.edu"]),
        ]);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].primary_url, "http://a.edu");
        assert_eq!(merged[0].extra_urls, vec!["http://b.edu"]);
        assert_eq!(merged[0].emails, emails(&["x@a.edu", "y@a.edu"]));
    }

    #[test]
    fn short_names_on_different_domains_stay_apart() {
        let merged = merge_local(vec![
            record("Club", "http://a.edu/one", &["x@a.edu"]),
            record("Club", "http://b.edu/two", &["y@b.edu"]),
        ]);
        assert_eq!(merged.len(), 2);
    }

    #[test]
    fn longer_name_wins_regardless_of_order() {
        let forward = merge_local(vec![
            record("Investment Club", "http://a.edu", &[]),
            record("Investment Club (Collegiate)", "http://b.edu", &[]),
        ]);
        let backward = merge_local(vec![
            record("Investment Club (Collegiate)", "http://b.edu", &[]),
            record("Investment Club", "http://a.edu", &[]),
        ]);
        assert_eq!(forward[0].club_name, "Investment Club (Collegiate)");
        assert_eq!(backward[0].club_name, "Investment Club (Collegiate)");
    }

    #[test]
    fn merge_scenario_unions_emails_and_annotates() {
        let merged = merge_local(vec![
            record("Investment Club", "http://a.edu", &["x@a.edu"]),
            record("Investment Club (Collegiate)", "http://b.edu", &["y@a.edu"]),
        ]);
        assert_eq!(merged.len(), 1);
        let rec = &merged[0];
        assert_eq!(rec.club_name, "Investment Club (Collegiate)");
        assert_eq!(rec.primary_url, "http://a.edu");
        assert_eq!(rec.emails, emails(&["x@a.edu", "y@a.edu"]));
        assert_eq!(
            rec.display_name(),
            "Investment Club (Collegiate) (Additional URLs: http://b.edu))"
        );
    }

    #[test]
    fn merged_emails_are_a_superset_of_every_input() {
        let inputs = vec![
            record("Quant Finance Society", "http://a.edu", &["a@a.edu", "b@a.edu"]),
            record("Quant Finance Society", "http://b.edu", &["c@b.edu"]),
            record("Traders Guild", "http://c.edu", &["d@c.edu"]),
        ];
        let merged = merge_local(inputs.clone());
        for input in &inputs {
            let holder = merged
                .iter()
                .find(|m| m.emails.is_superset(&input.emails))
                .unwrap_or_else(|| panic!("no merged record covers {}", input.club_name));
            assert!(input.emails.iter().all(|e| holder.emails.contains(e)));
        }
    }

    #[test]
    fn global_merge_is_idempotent() {
        let once = merge_global(vec![
            MergedRecord {
                organization: "StateU".into(),
                abbreviation: "SU".into(),
                club_name: "Investment Club".into(),
                primary_url: "http://a.edu".into(),
                extra_urls: vec!["http://b.edu".into()],
                emails: emails(&["x@a.edu"]),
            },
            MergedRecord {
                organization: "TechU".into(),
                abbreviation: "TU".into(),
                club_name: "Robotics Society".into(),
                primary_url: "http://t.edu".into(),
                extra_urls: vec![],
                emails: emails(&["r@t.edu"]),
            },
        ]);
        let twice = merge_global(once.clone());
        assert_eq!(once, twice);
    }

    #[test]
    fn global_merge_concatenates_differing_identities() {
        let merged = merge_global(vec![
            MergedRecord {
                organization: "StateU".into(),
                abbreviation: "SU".into(),
                club_name: "Collegiate Traders Network".into(),
                primary_url: "http://ctn.org/a".into(),
                extra_urls: vec![],
                emails: emails(&["a@ctn.org"]),
            },
            MergedRecord {
                organization: "TechU".into(),
                abbreviation: "TU".into(),
                club_name: "Collegiate Traders Network".into(),
                primary_url: "http://ctn.org/b".into(),
                extra_urls: vec![],
                emails: emails(&["b@ctn.org"]),
            },
        ]);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].organization, "StateU & TechU");
        assert_eq!(merged[0].abbreviation, "SU/TU");
        assert_eq!(merged[0].emails, emails(&["a@ctn.org", "b@ctn.org"]));
    }

    #[test]
    fn global_output_is_sorted_by_organization() {
        let merged = merge_global(vec![
            MergedRecord {
                organization: "Zeta College".into(),
                abbreviation: "ZC".into(),
                club_name: "Zeta Investment Group".into(),
                primary_url: "http://z.edu".into(),
                extra_urls: vec![],
                emails: BTreeSet::new(),
            },
            MergedRecord {
                organization: "Alpha College".into(),
                abbreviation: "AC".into(),
                club_name: "Alpha Investment Group".into(),
                primary_url: "http://a.edu".into(),
                extra_urls: vec![],
                emails: BTreeSet::new(),
            },
        ]);
        assert_eq!(merged[0].organization, "Alpha College");
        assert_eq!(merged[1].organization, "Zeta College");
    }
}
