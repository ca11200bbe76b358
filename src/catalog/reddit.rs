//! Generator for the `reddit` catalog: news domains from the r/politics
//! domain whitelist.
//!
//! Fast (a page fetch and a scan, seconds at most), so `generate reddit`
//! blocks the calling connection and returns the final count directly.

use regex::Regex;
use tracing::info;

use crate::catalog::store::CatalogStore;
use crate::catalog::{DomainCatalog, GenerationReport};
use crate::error::{Error, Result};

/// Name of the catalog this generator produces.
pub const REDDIT_CATALOG: &str = "reddit";

/// Default source: the whitelist wiki page, served as JSON wrapping a
/// markdown body.
pub const DEFAULT_SOURCE: &str = "https://www.reddit.com/r/politics/wiki/whitelist.json";

pub struct RedditGenerator {
    client: reqwest::Client,
    source: String,
}

impl RedditGenerator {
    pub fn new(client: reqwest::Client, source: impl Into<String>) -> Self {
        Self {
            client,
            source: source.into(),
        }
    }

    /// Scrape the whitelist and install it as the `reddit` catalog.
    ///
    /// A run that yields no domains fails with `ScrapeFailed` and leaves
    /// any previously installed catalog untouched.
    pub async fn generate(&self, store: &CatalogStore) -> Result<GenerationReport> {
        let body = self
            .client
            .get(&self.source)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| scrape_failed(e.to_string()))?
            .text()
            .await
            .map_err(|e| scrape_failed(e.to_string()))?;

        let domains = extract_domains(&whitelist_text(&body));
        if domains.is_empty() {
            return Err(scrape_failed("no domains found in whitelist".to_string()));
        }

        let count = domains.len();
        store.install(DomainCatalog::new(REDDIT_CATALOG, domains))?;
        info!("generated {REDDIT_CATALOG} catalog with {count} domains");
        Ok(GenerationReport {
            count,
            catalog_name: REDDIT_CATALOG.to_string(),
            filepath: Some(store.path_for(REDDIT_CATALOG)),
        })
    }
}

fn scrape_failed(reason: String) -> Error {
    Error::ScrapeFailed {
        src: REDDIT_CATALOG.to_string(),
        reason,
    }
}

/// The wiki endpoint wraps the markdown in a JSON envelope; fall back to
/// the raw body when the source serves plain text.
fn whitelist_text(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| {
            v.pointer("/data/content_md")
                .and_then(|c| c.as_str())
                .map(str::to_string)
        })
        .unwrap_or_else(|| body.to_string())
}

/// Pull domain-shaped tokens out of free text, first occurrence wins.
/// Reddit's own hosts are not news domains and are skipped.
pub(crate) fn extract_domains(text: &str) -> Vec<String> {
    let re = Regex::new(r"\b(?:[a-z0-9][a-z0-9-]*\.)+[a-z]{2,}\b").expect("domain regex is valid");
    let mut domains = Vec::new();
    for m in re.find_iter(&text.to_ascii_lowercase()) {
        let domain = m.as_str().to_string();
        if domain == "reddit.com"
            || domain.ends_with(".reddit.com")
            || domain == "redd.it"
            || domain.ends_with(".redditstatic.com")
        {
            continue;
        }
        if !domains.contains(&domain) {
            domains.push(domain);
        }
    }
    domains
}
