use std::collections::BTreeSet;
use std::sync::OnceLock;

use regex::Regex;

/// Matches email-shaped text, including the `[at]` obfuscation some club
/// pages use in place of `@`.
pub fn email_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"[a-zA-Z0-9_.+-]+(?:@|\s*\[at\]\s*)[a-zA-Z0-9-]+\.[a-zA-Z0-9-.]+")
            .expect("valid email pattern")
    })
}

fn at_obfuscation() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s*\[at\]\s*").expect("valid [at] pattern"))
}

fn digit_after_at() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"@.*\d").expect("valid digit pattern"))
}

fn strict_email() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^[a-zA-Z0-9_.+-]+@[a-zA-Z0-9-]+\.[a-zA-Z0-9-.]+$")
            .expect("valid strict email pattern")
    })
}

fn hex_local_part() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[a-f0-9]{32}@").expect("valid hex pattern"))
}

/// Scan a page body for every email-shaped match.
pub fn find_raw_emails(body: &str) -> BTreeSet<String> {
    email_pattern()
        .find_iter(body)
        .map(|m| m.as_str().to_string())
        .collect()
}

/// Validate and canonicalize one raw email match.
///
/// Rejections, in order: digits after `@` (ID-suffixed auto-generated
/// addresses), strict syntax mismatch, denylisted domain (mail infrastructure
/// and asset extensions misread as domains), and a 32-char hex local part
/// (hashed tracking addresses). `None` means rejected — this function never
/// fails any other way.
///
/// Accepted addresses come back fully lowercased, which keeps the run-scoped
/// email dedup set canonical.
pub fn clean_email(raw: &str, denied_domains: &[String]) -> Option<String> {
    let stripped = raw.trim().trim_end_matches(['.', ',', ';', ':', '!', '?']);
    let email = at_obfuscation().replace_all(stripped, "@").to_string();

    if digit_after_at().is_match(&email) {
        return None;
    }
    if !strict_email().is_match(&email) {
        return None;
    }

    let lowered = email.to_lowercase();
    if denied_domains.iter().any(|d| lowered.contains(d.as_str())) {
        return None;
    }
    if hex_local_part().is_match(&lowered) {
        return None;
    }

    Some(lowered)
}
