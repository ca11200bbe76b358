//! CLI subcommand implementations for the tcrawl binary.

pub mod control;
pub mod crawl;
pub mod generate;
pub mod list;
pub mod output;
pub mod start;
pub mod stop;

use crate::client;
use crate::config::Config;
use crate::error::Error;
use crate::server::protocol::{Request, Response};
use output::Styled;

/// Send one request to the daemon. When nothing is listening, print the
/// standard guidance and exit — every subcommand shares this behavior.
pub(crate) async fn dial(config: &Config, request: &Request) -> anyhow::Result<Response> {
    match client::call(&config.addr(), request).await {
        Ok(response) => Ok(response),
        Err(Error::DaemonUnreachable(addr)) => {
            let s = Styled::new();
            eprintln!(
                "  {} no Turbo Crawl daemon at {addr}. Start one with 'tcrawl start'.",
                s.fail_sym()
            );
            std::process::exit(1);
        }
        Err(e) => Err(e.into()),
    }
}
