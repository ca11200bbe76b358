//! Submit crawls: a URL, `random`, a national key, or a bulk file.

use anyhow::{Context, Result};
use std::path::PathBuf;

use crate::cli::output::Styled;
use crate::config::Config;
use crate::server::protocol::Request;

pub async fn run(config: &Config, file: Option<PathBuf>, mut targets: Vec<String>) -> Result<()> {
    let s = Styled::new();

    if let Some(path) = file {
        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("cannot read {}", path.display()))?;
        let bulk = parse_bulk_file(&content);
        if bulk.is_empty() {
            eprintln!(
                "  {} no URLs found in {}",
                s.fail_sym(),
                path.display()
            );
            std::process::exit(1);
        }
        eprintln!("  Crawling {} domains from {}", bulk.len(), path.display());
        targets.extend(bulk);
    }

    if targets.is_empty() {
        print_help(&s);
        return Ok(());
    }

    let response = super::dial(config, &Request::new("crawl", targets)).await?;
    if response.is_success() {
        let jobs = response
            .payload
            .as_ref()
            .and_then(|p| p.get("jobs"))
            .and_then(|j| j.as_array())
            .cloned()
            .unwrap_or_default();
        for job in &jobs {
            if let Some(target) = job.get("target").and_then(|t| t.as_str()) {
                eprintln!("  {} Crawling {}", s.ok_sym(), s.bold(target));
            }
        }
        if jobs.len() > 1 {
            eprintln!("  {} {} crawlers submitted", s.ok_sym(), jobs.len());
        }
    } else {
        let code = response.code.as_deref().unwrap_or("");
        eprintln!(
            "  {} {}: {}",
            s.fail_sym(),
            s.red("Turbo Crawl failed to crawl"),
            response.error_message.as_deref().unwrap_or("unknown error")
        );
        if code == "CatalogMissing" || code == "CatalogEmpty" {
            eprintln!("  Generate a domain catalog first: tcrawl generate reddit");
        }
        std::process::exit(1);
    }
    Ok(())
}

/// Bulk files are a JSON array of URL strings; plain newline-delimited
/// lists are accepted too.
fn parse_bulk_file(content: &str) -> Vec<String> {
    if let Ok(urls) = serde_json::from_str::<Vec<String>>(content) {
        return urls;
    }
    content
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .collect()
}

fn print_help(s: &Styled) {
    eprintln!();
    eprintln!("  {}", s.bold("The crawl command:"));
    eprintln!("  Submits a crawler to the server for execution");
    eprintln!("    tcrawl crawl www.replacethiswitharealwebsite.com");
    eprintln!("      Begins crawling the website sent in as an argument. See server for logs.");
    eprintln!("    tcrawl crawl random");
    eprintln!("      Crawls a random news website.");
    eprintln!("    tcrawl crawl american");
    eprintln!("      Crawls popular American news websites.");
    eprintln!("    tcrawl crawl -f filename");
    eprintln!("      Pass in a file of URLs to crawl, a JSON array or one URL per line.");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bulk_file_json_array() {
        let urls = parse_bulk_file(r#"["https://cnn.com", "https://bbc.co.uk"]"#);
        assert_eq!(urls, vec!["https://cnn.com", "https://bbc.co.uk"]);
    }

    #[test]
    fn test_parse_bulk_file_newline_delimited() {
        let urls = parse_bulk_file("cnn.com\n\n  bbc.co.uk  \n");
        assert_eq!(urls, vec!["cnn.com", "bbc.co.uk"]);
    }
}
