//! Production fetcher: a same-domain breadth-first link walker.
//!
//! Fetches pages with `reqwest`, extracts in-domain links with `scraper`,
//! and appends every crawled URL to the job's output file. Between page
//! fetches it checkpoints the control channel, so pause parks it in
//! place (visited set intact) and stop cancels it promptly.

use async_trait::async_trait;
use std::collections::{HashSet, VecDeque};
use std::path::PathBuf;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::config::FetcherConfig;
use crate::fetcher::limiter::FetchLimiter;
use crate::fetcher::{FetchEvent, Fetcher, JobControls};
use crate::target;

pub struct HttpFetcher {
    client: reqwest::Client,
    config: FetcherConfig,
    output_dir: PathBuf,
}

impl HttpFetcher {
    pub fn new(config: FetcherConfig, output_dir: PathBuf) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.request_timeout_ms))
            .user_agent(concat!("turbocrawl/", env!("CARGO_PKG_VERSION")))
            .build()
            .unwrap_or_default();
        Self {
            client,
            config,
            output_dir,
        }
    }

    async fn fetch_page(&self, url: &str) -> crate::Result<String> {
        let resp = self.client.get(url).send().await?.error_for_status()?;
        Ok(resp.text().await?)
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn crawl(
        &self,
        target: String,
        mut controls: JobControls,
        events: mpsc::Sender<FetchEvent>,
    ) {
        let Some(domain) = target::domain_of(&target) else {
            let _ = events
                .send(FetchEvent::Failed {
                    message: format!("target has no host: {target}"),
                })
                .await;
            return;
        };

        let output_path = self.output_dir.join(format!("{domain}.txt"));
        if let Err(e) = tokio::fs::create_dir_all(&self.output_dir).await {
            let _ = events
                .send(FetchEvent::Failed {
                    message: format!("cannot create output dir: {e}"),
                })
                .await;
            return;
        }
        let mut output = match tokio::fs::File::create(&output_path).await {
            Ok(f) => f,
            Err(e) => {
                let _ = events
                    .send(FetchEvent::Failed {
                        message: format!("cannot open {}: {e}", output_path.display()),
                    })
                    .await;
                return;
            }
        };
        let _ = events
            .send(FetchEvent::Started {
                output_path: output_path.clone(),
            })
            .await;

        let limiter = FetchLimiter::from_config(&self.config);
        let mut queue = VecDeque::from([target.clone()]);
        let mut visited: HashSet<String> = HashSet::new();
        let mut pages = 0usize;
        let mut last_error: Option<String> = None;

        while pages < self.config.max_pages {
            if !controls.checkpoint().await {
                debug!("crawl of {target} stopped after {pages} pages");
                break;
            }
            let Some(url) = queue.pop_front() else {
                break;
            };
            if !visited.insert(url.clone()) {
                continue;
            }

            let _permit = limiter.acquire().await;
            match self.fetch_page(&url).await {
                Ok(html) => {
                    pages += 1;
                    if let Err(e) = output.write_all(format!("{url}\n").as_bytes()).await {
                        warn!("cannot append to {}: {e}", output_path.display());
                    }
                    for link in extract_links(html, &url, &domain).await {
                        if !visited.contains(&link) {
                            queue.push_back(link);
                        }
                    }
                }
                Err(e) => {
                    warn!("fetch of {url} failed: {e}");
                    last_error = Some(e.to_string());
                }
            }
        }

        let _ = output.flush().await;
        if pages == 0 {
            let _ = events
                .send(FetchEvent::Failed {
                    message: last_error.unwrap_or_else(|| "no pages fetched".to_string()),
                })
                .await;
        } else {
            let _ = events.send(FetchEvent::Finished { pages }).await;
        }
    }
}

/// Extract same-domain links from a page. Parsing runs on a blocking
/// thread because `scraper`'s DOM is not `Send`.
async fn extract_links(html: String, base: &str, domain: &str) -> Vec<String> {
    let base = base.to_string();
    let domain = domain.to_string();
    tokio::task::spawn_blocking(move || extract_links_sync(&html, &base, &domain))
        .await
        .unwrap_or_default()
}

fn extract_links_sync(html: &str, base: &str, domain: &str) -> Vec<String> {
    use scraper::{Html, Selector};

    let Ok(base_url) = url::Url::parse(base) else {
        return Vec::new();
    };
    let Ok(selector) = Selector::parse("a[href]") else {
        return Vec::new();
    };

    let document = Html::parse_document(html);
    let mut links = Vec::new();
    for el in document.select(&selector) {
        let Some(href) = el.value().attr("href") else {
            continue;
        };
        let Ok(mut resolved) = base_url.join(href) else {
            continue;
        };
        if resolved.scheme() != "http" && resolved.scheme() != "https" {
            continue;
        }
        if resolved.host_str() != Some(domain) {
            continue;
        }
        resolved.set_fragment(None);
        let link = resolved.to_string();
        if !links.contains(&link) {
            links.push(link);
        }
    }
    links
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_links_same_domain_only() {
        let html = r#"
        <html><body>
            <a href="/politics">Politics</a>
            <a href="https://example.com/world#live">World</a>
            <a href="https://other.com/page">Elsewhere</a>
            <a href="mailto:tips@example.com">Tips</a>
            <a href="/politics">Duplicate</a>
        </body></html>
        "#;

        let links = extract_links_sync(html, "https://example.com/", "example.com");
        assert_eq!(
            links,
            vec![
                "https://example.com/politics".to_string(),
                "https://example.com/world".to_string(),
            ]
        );
    }

    #[test]
    fn test_extract_links_relative_resolution() {
        let html = r#"<a href="story/one">One</a>"#;
        let links = extract_links_sync(html, "https://example.com/news/", "example.com");
        assert_eq!(links, vec!["https://example.com/news/story/one".to_string()]);
    }
}
