//! Target resolution: raw CLI arguments → crawl targets.
//!
//! A raw argument resolves to an absolute URL, the literal `random`
//! token, or a national-news category key (`american`, `french`, ...).
//! Pure functions, no state.

use crate::error::{Error, Result};
use url::Url;

/// What a raw argument resolved to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    /// A normalized absolute URL.
    Url(String),
    /// Draw one domain at random from the generated catalog.
    Random,
    /// Crawl every domain scraped for this country key (lowercased).
    National(String),
}

/// Resolve a raw argument into a [`Target`].
///
/// URLs win over keys: anything with a scheme or a dot in it is treated
/// as a URL attempt and fails with `InvalidTarget` if it does not parse.
pub fn resolve(raw: &str) -> Result<Target> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(Error::InvalidTarget(raw.to_string()));
    }
    if raw.eq_ignore_ascii_case("random") {
        return Ok(Target::Random);
    }
    if looks_like_url(raw) {
        return normalize_url(raw)
            .map(Target::Url)
            .ok_or_else(|| Error::InvalidTarget(raw.to_string()));
    }
    if raw.chars().all(|c| c.is_ascii_alphabetic() || c == '-') {
        return Ok(Target::National(raw.to_ascii_lowercase()));
    }
    Err(Error::InvalidTarget(raw.to_string()))
}

/// Whether the argument is an attempt at a URL rather than a key.
fn looks_like_url(raw: &str) -> bool {
    raw.contains("://") || raw.contains('.')
}

/// Normalize a raw string into a canonical absolute URL.
///
/// Scheme defaults to `https`, the host is lowercased, and any fragment
/// is dropped. Returns `None` for anything without a dotted host or with
/// a non-http scheme.
pub fn normalize_url(raw: &str) -> Option<String> {
    let raw = raw.trim();
    let candidate = if raw.contains("://") {
        raw.to_string()
    } else {
        format!("https://{raw}")
    };

    let mut url = Url::parse(&candidate).ok()?;
    if url.scheme() != "http" && url.scheme() != "https" {
        return None;
    }
    let host = url.host_str()?;
    if !host.contains('.') {
        return None;
    }
    url.set_fragment(None);
    Some(url.to_string())
}

/// The registered host of a normalized URL, used to key output files and
/// scope same-domain crawls.
pub fn domain_of(url: &str) -> Option<String> {
    Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(|h| h.to_string()))
}
