//! Job-control subcommands: pause, resume, end, endall, resumeall.

use anyhow::Result;

use crate::cli::output::Styled;
use crate::config::Config;
use crate::server::protocol::Request;

/// Send a single-target control command and report the outcome in the
/// daemon's words ("Turbo Crawl paused", "failed to pause", ...).
pub async fn run(config: &Config, action: &str, url: &str) -> Result<()> {
    let s = Styled::new();
    let response = super::dial(config, &Request::new(action, [url])).await?;

    if response.is_success() {
        eprintln!(
            "  {} {} {url}",
            s.ok_sym(),
            s.green(&format!("Turbo Crawl {}", past_tense(action)))
        );
    } else {
        eprintln!(
            "  {} {} {url}: {}",
            s.fail_sym(),
            s.red(&format!("Turbo Crawl failed to {action}")),
            response.error_message.as_deref().unwrap_or("unknown error")
        );
        std::process::exit(1);
    }
    Ok(())
}

/// Send a bulk control command (`endall` / `resumeall`).
pub async fn run_all(config: &Config, action: &str) -> Result<()> {
    let s = Styled::new();
    let response = super::dial(config, &Request::bare(action)).await?;

    if response.is_success() {
        let count = response
            .payload
            .as_ref()
            .and_then(|p| p.get("ended").or_else(|| p.get("resumed")))
            .and_then(|v| v.as_u64())
            .unwrap_or(0);
        let verb = if action == "endall" { "ended" } else { "resumed" };
        eprintln!(
            "  {} {}",
            s.ok_sym(),
            s.green(&format!(
                "Turbo Crawl {verb} {count} crawler{}",
                plural(count)
            ))
        );
    } else {
        eprintln!(
            "  {} {}: {}",
            s.fail_sym(),
            s.red(&format!("Turbo Crawl failed to {action}")),
            response.error_message.as_deref().unwrap_or("unknown error")
        );
        std::process::exit(1);
    }
    Ok(())
}

fn past_tense(action: &str) -> &str {
    match action {
        "pause" => "paused",
        "resume" => "resumed",
        "end" => "ended",
        other => other,
    }
}

fn plural(count: u64) -> &'static str {
    if count == 1 {
        ""
    } else {
        "s"
    }
}
