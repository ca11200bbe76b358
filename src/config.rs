//! Daemon configuration from environment variables.

use std::path::PathBuf;

/// Default port the daemon listens on.
pub const DEFAULT_PORT: u16 = 8088;

/// Default host. Setting `TCRAWL_HOST=0.0.0.0` makes the daemon visible
/// to the network instead of just the local machine.
pub const DEFAULT_HOST: &str = "localhost";

/// Runtime configuration for the daemon and its clients.
#[derive(Debug, Clone)]
pub struct Config {
    /// Host the daemon binds to (clients dial the same value).
    pub host: String,
    /// Port the daemon binds to.
    pub port: u16,
    /// Root of the daemon's on-disk state (`~/.turbocrawl` by default).
    pub data_dir: PathBuf,
    /// Fetcher politeness and sizing.
    pub fetcher: FetcherConfig,
    /// Where the catalog generators scrape from.
    pub sources: CatalogSources,
}

/// Source pages for the catalog generators. Overridable so tests (and
/// mirrors) can point the daemon elsewhere.
#[derive(Debug, Clone)]
pub struct CatalogSources {
    /// `TCRAWL_REDDIT_SOURCE`
    pub reddit_whitelist: String,
    /// `TCRAWL_WIKIPEDIA_SOURCE`
    pub wikipedia_category: String,
}

impl Default for CatalogSources {
    fn default() -> Self {
        Self {
            reddit_whitelist: crate::catalog::reddit::DEFAULT_SOURCE.to_string(),
            wikipedia_category: crate::catalog::wikipedia::DEFAULT_SOURCE.to_string(),
        }
    }
}

/// Knobs for the HTTP fetcher.
#[derive(Debug, Clone)]
pub struct FetcherConfig {
    /// Maximum concurrent page requests per job.
    pub max_concurrent: usize,
    /// Minimum delay between requests, in milliseconds.
    pub min_delay_ms: u64,
    /// Hard page cap per crawl job.
    pub max_pages: usize,
    /// Per-request timeout, in milliseconds.
    pub request_timeout_ms: u64,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            max_concurrent: 2,
            min_delay_ms: 250,
            max_pages: 500,
            request_timeout_ms: 15_000,
        }
    }
}

impl Config {
    /// Build a config from `TCRAWL_HOST`, `TCRAWL_PORT`, and `TCRAWL_HOME`,
    /// falling back to defaults for anything unset or unparseable.
    pub fn from_env() -> Self {
        let host = std::env::var("TCRAWL_HOST").unwrap_or_else(|_| DEFAULT_HOST.to_string());
        let port = std::env::var("TCRAWL_PORT")
            .ok()
            .and_then(|p| p.trim().parse().ok())
            .unwrap_or(DEFAULT_PORT);
        let data_dir = std::env::var("TCRAWL_HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| default_data_dir());

        let mut sources = CatalogSources::default();
        if let Ok(url) = std::env::var("TCRAWL_REDDIT_SOURCE") {
            sources.reddit_whitelist = url;
        }
        if let Ok(url) = std::env::var("TCRAWL_WIKIPEDIA_SOURCE") {
            sources.wikipedia_category = url;
        }

        Self {
            host,
            port,
            data_dir,
            fetcher: FetcherConfig::default(),
            sources,
        }
    }

    /// Address string clients dial and the daemon binds.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Directory holding one JSON file per generated domain catalog.
    pub fn catalogs_dir(&self) -> PathBuf {
        self.data_dir.join("catalogs")
    }

    /// Directory crawl jobs write their discovered-URL output files into.
    pub fn crawls_dir(&self) -> PathBuf {
        self.data_dir.join("crawls")
    }
}

fn default_data_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("/tmp"))
        .join(".turbocrawl")
}
