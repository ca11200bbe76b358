//! Run the Turbo Crawl daemon in the foreground.

use anyhow::Result;
use std::sync::Arc;
use tracing::info;

use crate::catalog::CatalogStore;
use crate::cli::output::Styled;
use crate::config::Config;
use crate::fetcher::HttpFetcher;
use crate::registry::Registry;
use crate::server::Server;

/// Start the daemon: open state, bind the socket, serve until shutdown.
pub async fn run(config: Config) -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("turbocrawl=info".parse().expect("static directive parses")),
        )
        .init();

    info!("starting Turbo Crawl v{}", env!("CARGO_PKG_VERSION"));

    let store = Arc::new(CatalogStore::open(config.catalogs_dir())?);
    let fetcher = Arc::new(HttpFetcher::new(config.fetcher.clone(), config.crawls_dir()));
    let registry = Registry::new(fetcher);
    let server = Server::new(config.clone(), registry, store);

    // SIGINT asks for the same orderly shutdown the wire command does.
    let shutdown = server.shutdown_handle();
    tokio::spawn(async move {
        let _ = tokio::signal::ctrl_c().await;
        info!("received shutdown signal");
        shutdown.notify_one();
    });

    let s = Styled::new();
    eprintln!();
    eprintln!(
        "  {} {} is now running",
        s.ok_sym(),
        s.bold("Turbo Crawl Daemon")
    );
    eprintln!("    Listening on PORT: {}", config.port);
    eprintln!(
        "    {}",
        if config.host == "0.0.0.0" {
            "and is accessible on your network"
        } else {
            "and is available locally"
        }
    );
    eprintln!();

    server.listen().await?;

    eprintln!("  {} Turbo Crawl stopped.", s.ok_sym());
    Ok(())
}
