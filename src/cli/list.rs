//! List all crawl jobs known to the daemon.

use anyhow::Result;

use crate::cli::output::Styled;
use crate::config::Config;
use crate::registry::{CrawlJob, JobState};
use crate::server::protocol::Request;

pub async fn run(config: &Config) -> Result<()> {
    let s = Styled::new();
    let response = super::dial(config, &Request::bare("list")).await?;

    let jobs: Vec<CrawlJob> = response
        .payload
        .as_ref()
        .and_then(|p| p.get("jobs"))
        .cloned()
        .map(serde_json::from_value)
        .transpose()?
        .unwrap_or_default();

    eprintln!();
    eprintln!("  {}", s.bold("Crawlers:"));
    if jobs.is_empty() {
        eprintln!("    None. You can use the following command to start a crawl:");
        eprintln!("      tcrawl www.someurlhere.com");
        return Ok(());
    }

    for job in &jobs {
        let state = match job.state {
            JobState::Running => s.green("running"),
            JobState::Paused => s.yellow("paused"),
            JobState::Ended => s.dim("ended"),
        };
        let mut line = format!("    {:<8} {}", state, job.target);
        if let Some(path) = &job.output_path {
            line.push_str(&s.dim(&format!("  -> {}", path.display())));
        }
        if let Some(error) = &job.error {
            line.push_str(&format!("  {}", s.red(error)));
        }
        eprintln!("{line}");
    }
    Ok(())
}
