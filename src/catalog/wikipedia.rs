//! Generator for the national news catalogs: Wikipedia's
//! "News websites by country" category tree.
//!
//! Slow (one page fetch per country, minutes over the real site), so the
//! daemon runs it as a background task and the `generate` command polls
//! its status. Each country subcategory becomes its own catalog keyed by
//! the country adjective (`american`, `french`, ...); the union is
//! installed as `wikipedia-countries`, all in one atomic batch.

use tracing::{info, warn};

use crate::catalog::reddit::extract_domains;
use crate::catalog::store::CatalogStore;
use crate::catalog::{DomainCatalog, GenerationReport};
use crate::error::{Error, Result};

/// Name of the combined catalog this generator produces.
pub const WIKIPEDIA_CATALOG: &str = "wikipedia-countries";

/// Default source: the category index page.
pub const DEFAULT_SOURCE: &str =
    "https://en.wikipedia.org/wiki/Category:News_websites_by_country";

pub struct WikipediaGenerator {
    client: reqwest::Client,
    source: String,
}

/// One country subcategory discovered on the index page.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Subcategory {
    country: String,
    href: String,
}

impl WikipediaGenerator {
    pub fn new(client: reqwest::Client, source: impl Into<String>) -> Self {
        Self {
            client,
            source: source.into(),
        }
    }

    /// Walk the category tree and install one catalog per country plus
    /// the combined `wikipedia-countries` catalog, atomically.
    pub async fn generate(&self, store: &CatalogStore) -> Result<GenerationReport> {
        let index_html = self.fetch(&self.source).await?;
        let subcategories = parse_subcategories(index_html).await;
        if subcategories.is_empty() {
            return Err(scrape_failed("no country subcategories found".to_string()));
        }

        let base = url::Url::parse(&self.source)
            .map_err(|e| scrape_failed(format!("bad source url: {e}")))?;

        let mut batch = Vec::new();
        let mut combined: Vec<String> = Vec::new();
        for sub in subcategories {
            let page_url = match base.join(&sub.href) {
                Ok(u) => u.to_string(),
                Err(e) => {
                    warn!("skipping {}: unresolvable href: {e}", sub.country);
                    continue;
                }
            };
            let domains = match self.fetch(&page_url).await {
                Ok(html) => parse_member_domains(html).await,
                Err(e) => {
                    // One unreachable country page does not sink the run.
                    warn!("skipping {}: {e}", sub.country);
                    continue;
                }
            };
            if domains.is_empty() {
                continue;
            }
            for domain in &domains {
                if !combined.contains(domain) {
                    combined.push(domain.clone());
                }
            }
            batch.push(DomainCatalog::new(sub.country, domains));
        }

        if combined.is_empty() {
            return Err(scrape_failed(
                "no domains found in any country subcategory".to_string(),
            ));
        }

        let count = combined.len();
        let countries = batch.len();
        batch.push(DomainCatalog::new(WIKIPEDIA_CATALOG, combined));
        store.install_all(batch)?;
        info!("generated {WIKIPEDIA_CATALOG}: {count} domains across {countries} countries");
        Ok(GenerationReport {
            count,
            catalog_name: WIKIPEDIA_CATALOG.to_string(),
            filepath: Some(store.path_for(WIKIPEDIA_CATALOG)),
        })
    }

    async fn fetch(&self, url: &str) -> Result<String> {
        Ok(self
            .client
            .get(url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| scrape_failed(e.to_string()))?
            .text()
            .await
            .map_err(|e| scrape_failed(e.to_string()))?)
    }
}

fn scrape_failed(reason: String) -> Error {
    Error::ScrapeFailed {
        src: WIKIPEDIA_CATALOG.to_string(),
        reason,
    }
}

/// Category pages list country subcategories like "American news
/// websites"; the leading adjective becomes the catalog key.
async fn parse_subcategories(html: String) -> Vec<Subcategory> {
    tokio::task::spawn_blocking(move || parse_subcategories_sync(&html))
        .await
        .unwrap_or_default()
}

fn parse_subcategories_sync(html: &str) -> Vec<Subcategory> {
    use scraper::{Html, Selector};

    let Ok(selector) = Selector::parse("#mw-subcategories a[href]") else {
        return Vec::new();
    };
    let document = Html::parse_document(html);
    let mut subcategories = Vec::new();
    for el in document.select(&selector) {
        let Some(href) = el.value().attr("href") else {
            continue;
        };
        let title: String = el.text().collect();
        let Some(country) = country_key(&title) else {
            continue;
        };
        let sub = Subcategory {
            country,
            href: href.to_string(),
        };
        if !subcategories.contains(&sub) {
            subcategories.push(sub);
        }
    }
    subcategories
}

/// "American news websites" → "american"; multi-word countries become
/// hyphenated keys ("New Zealand news websites" → "new-zealand").
fn country_key(title: &str) -> Option<String> {
    let title = title.trim();
    let stripped = title
        .strip_suffix("news websites")
        .or_else(|| title.strip_suffix("News websites"))?
        .trim();
    if stripped.is_empty() {
        return None;
    }
    Some(stripped.to_ascii_lowercase().split_whitespace().collect::<Vec<_>>().join("-"))
}

/// A country page's member list names the sites; keep the entries that
/// carry a domain-shaped name.
async fn parse_member_domains(html: String) -> Vec<String> {
    tokio::task::spawn_blocking(move || parse_member_domains_sync(&html))
        .await
        .unwrap_or_default()
}

fn parse_member_domains_sync(html: &str) -> Vec<String> {
    use scraper::{Html, Selector};

    let Ok(selector) = Selector::parse("#mw-pages li a") else {
        return Vec::new();
    };
    let document = Html::parse_document(html);
    let mut domains = Vec::new();
    for el in document.select(&selector) {
        let text: String = el.text().collect();
        for domain in extract_domains(&text) {
            if !domains.contains(&domain) {
                domains.push(domain);
            }
        }
    }
    domains
}
