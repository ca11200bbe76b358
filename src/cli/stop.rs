//! Shut down the running daemon.

use anyhow::Result;

use crate::cli::output::Styled;
use crate::config::Config;
use crate::server::protocol::Request;

/// Ask the daemon to end every job and exit. Success is only reported
/// after the daemon has answered, i.e. after its jobs were ended.
pub async fn run(config: &Config) -> Result<()> {
    let s = Styled::new();
    let response = super::dial(config, &Request::bare("shutdown")).await?;

    if response.is_success() {
        let ended = response
            .payload
            .as_ref()
            .and_then(|p| p.get("endedJobs"))
            .and_then(|v| v.as_u64())
            .unwrap_or(0);
        eprintln!(
            "  {} {} ({ended} job{} ended)",
            s.ok_sym(),
            s.green("Turbo Crawl has exited"),
            if ended == 1 { "" } else { "s" }
        );
        if let Some(warning) = response
            .payload
            .as_ref()
            .and_then(|p| p.get("warning"))
            .and_then(|v| v.as_str())
        {
            eprintln!("  {} {warning}", s.warn_sym());
        }
    } else {
        eprintln!(
            "  {} {}: {}",
            s.fail_sym(),
            s.red("Turbo Crawl failed to exit"),
            response.error_message.as_deref().unwrap_or("unknown error")
        );
        std::process::exit(1);
    }
    Ok(())
}
