//! Domain normalization
//!
//! Canonicalizes raw domain strings so that equality comparison is stable
//! across schemes, casing, trailing dots, and stray path separators.

/// Normalize a raw domain string to its canonical form.
///
/// Strips a leading `scheme://` prefix, cuts at the first path separator,
/// lowercases, and trims surrounding whitespace plus trailing dots. Returns
/// `None` when nothing remains. Idempotent:
/// `normalize_domain(&normalize_domain(x)?) == normalize_domain(x)`.
pub fn normalize_domain(raw: &str) -> Option<String> {
    let mut rest = raw.trim();

    // Strip `scheme://` when the prefix is a plausible scheme token
    if let Some(idx) = rest.find("://") {
        let scheme = &rest[..idx];
        if !scheme.is_empty()
            && scheme
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
        {
            rest = &rest[idx + 3..];
        }
    }

    // Anything after a path separator is not part of the host
    let mut host = rest.split('/').next().unwrap_or(rest);

    // Remove a trailing port, Host-header style
    if let Some((name, port)) = host.rsplit_once(':') {
        if !port.is_empty() && port.chars().all(|c| c.is_ascii_digit()) {
            host = name;
        }
    }

    let lowered = host.to_lowercase();
    let trimmed = lowered.trim().trim_end_matches('.').trim_end();

    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}
