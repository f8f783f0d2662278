//! Heuristic predicates deciding whether a URL or email plausibly belongs to
//! an organization. Both are permissive by default: appearing on a page that
//! already passed URL filtering is itself a relevance signal.

/// Check if a URL is likely related to the organization.
///
/// Matches `.edu`, the full name with spaces removed, the name's first
/// segment (before `--` or `,`), or the abbreviation — unless the URL sits on
/// a generic platform from the denylist.
pub fn is_organization_related(
    url: &str,
    organization: &str,
    abbreviation: &str,
    excluded_domains: &[String],
) -> bool {
    let url_l = url.to_lowercase();
    if excluded_domains.iter().any(|d| url_l.contains(d.as_str())) {
        return false;
    }

    let org_l = organization.to_lowercase();
    let needles = [
        ".edu".to_string(),
        org_l.replace(' ', ""),
        org_l.split("--").next().unwrap_or(&org_l).to_string(),
        org_l.split(',').next().unwrap_or(&org_l).to_string(),
        abbreviation.to_lowercase(),
    ];

    needles
        .iter()
        .any(|n| !n.is_empty() && url_l.contains(n.as_str()))
}

/// Check if an email is likely a club contact rather than an administrative
/// or placeholder address.
pub fn is_club_email(email: &str, organization: &str, denied_patterns: &[String]) -> bool {
    let email_l = email.to_lowercase();

    // .edu addresses are accepted automatically.
    if email_l.contains(".edu") {
        return true;
    }

    if email_l.contains(&organization.to_lowercase().replace(' ', "")) {
        return true;
    }

    if denied_patterns.iter().any(|p| email_l.contains(p.as_str())) {
        return false;
    }

    // Default permissive: the page already passed relevance filtering.
    true
}
