//! Generate domain catalogs by scraping their sources.

use anyhow::Result;

use crate::cli::output::Styled;
use crate::config::Config;
use crate::server::protocol::Request;

pub async fn run(config: &Config, source: Option<String>) -> Result<()> {
    let s = Styled::new();
    let Some(source) = source else {
        print_help(&s);
        return Ok(());
    };

    match source.as_str() {
        "reddit" => {
            eprintln!(
                "  Scraping {} for domain names",
                s.bold("/r/politics white list")
            );
            let response = super::dial(config, &Request::new("generate", ["reddit"])).await?;
            if response.is_success() {
                let count = payload_count(&response.payload);
                eprintln!(
                    "  {} {}",
                    s.ok_sym(),
                    s.green(&format!(
                        "Scraped {count} domain names from /r/politics white list."
                    ))
                );
            } else {
                eprintln!(
                    "  {} {}",
                    s.fail_sym(),
                    s.red("Failed to scrape anything from /r/politics white list")
                );
                std::process::exit(1);
            }
        }
        "wikipedia" | "countries" => {
            let response = super::dial(config, &Request::new("generate", ["wikipedia"])).await?;
            if !response.is_success() {
                eprintln!(
                    "  {} {}",
                    s.fail_sym(),
                    s.red("Failed to scrape Wikipedia Category: News websites by country")
                );
                std::process::exit(1);
            }
            let state = response
                .payload
                .as_ref()
                .and_then(|p| p.get("state"))
                .and_then(|v| v.as_str())
                .unwrap_or("");
            match state {
                "started" => {
                    eprintln!(
                        "  Scraping {} for domain names",
                        s.bold("Wikipedia Category:News websites by country")
                    );
                    eprintln!("  This takes a few minutes. Check progress with 'tcrawl generate wikipedia'.");
                }
                "running" => {
                    eprintln!("  {} Still scraping Wikipedia. Check back shortly.", s.warn_sym());
                }
                "completed" => {
                    let count = payload_count(&response.payload);
                    eprintln!(
                        "  {} {}",
                        s.ok_sym(),
                        s.green(&format!(
                            "Scraped {count} domain names from Wikipedia Category: News websites by country"
                        ))
                    );
                }
                "failed" => {
                    let message = response
                        .payload
                        .as_ref()
                        .and_then(|p| p.get("message"))
                        .and_then(|v| v.as_str())
                        .unwrap_or("unknown error");
                    eprintln!(
                        "  {} {}: {message}",
                        s.fail_sym(),
                        s.red("Wikipedia scrape failed")
                    );
                    std::process::exit(1);
                }
                other => eprintln!("  {} unexpected generator state: {other}", s.warn_sym()),
            }
        }
        other => {
            eprintln!("  {} unknown catalog source: {other}", s.fail_sym());
            print_help(&s);
            std::process::exit(1);
        }
    }
    Ok(())
}

fn payload_count(payload: &Option<serde_json::Value>) -> u64 {
    payload
        .as_ref()
        .and_then(|p| p.get("count"))
        .and_then(|v| v.as_u64())
        .unwrap_or(0)
}

fn print_help(s: &Styled) {
    eprintln!();
    eprintln!("  {}", s.bold("The generate command:"));
    eprintln!("  Automatically generates lists of websites to be crawled");
    eprintln!("    tcrawl generate reddit");
    eprintln!("      Scrapes news websites from reddit.com/r/politics white list.");
    eprintln!("    tcrawl generate wikipedia");
    eprintln!(
        "      Scrapes national news websites from {}",
        s.bold("Wikipedia Category:News websites by country")
    );
}
