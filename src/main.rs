//! tcrawl binary: the Turbo Crawl daemon and its command-line client.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use turbocrawl::cli;
use turbocrawl::config::Config;
use turbocrawl::target;

#[derive(Parser)]
#[command(
    name = "tcrawl",
    version,
    about = "Turbo Crawl — crawl job orchestration",
    long_about = "Turbo Crawl — submit, pause, resume, and end site crawls.\n\
                  Run 'tcrawl start' once, then drive it from any shell:\n\
                  'tcrawl www.mytotallyrealdomainname.com' starts a crawl."
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the crawl daemon in the foreground.
    Start,
    /// Stop the daemon, ending all jobs first.
    Shutdown,
    /// List all crawl jobs.
    List,
    /// Pause a running crawl.
    Pause { url: String },
    /// Resume a paused crawl.
    Resume { url: String },
    /// End a crawl.
    End { url: String },
    /// End every active crawl.
    Endall,
    /// Resume every paused crawl.
    Resumeall,
    /// Generate a domain catalog (reddit | wikipedia).
    Generate { source: Option<String> },
    /// Submit crawls: URLs, `random`, a national key, or -f <file>.
    Crawl {
        /// File holding a list of URLs (JSON array or one per line).
        #[arg(short = 'f', long = "file")]
        file: Option<PathBuf>,
        targets: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env();

    // `tcrawl www.site.com` submits a crawl directly, without the
    // `crawl` subcommand. Subcommand names never parse as URLs.
    let argv: Vec<String> = std::env::args().collect();
    if argv.len() == 2 && target::normalize_url(&argv[1]).is_some() {
        return cli::crawl::run(&config, None, vec![argv[1].clone()]).await;
    }

    match Cli::parse().command {
        Command::Start => cli::start::run(config).await,
        Command::Shutdown => cli::stop::run(&config).await,
        Command::List => cli::list::run(&config).await,
        Command::Pause { url } => cli::control::run(&config, "pause", &url).await,
        Command::Resume { url } => cli::control::run(&config, "resume", &url).await,
        Command::End { url } => cli::control::run(&config, "end", &url).await,
        Command::Endall => cli::control::run_all(&config, "endall").await,
        Command::Resumeall => cli::control::run_all(&config, "resumeall").await,
        Command::Generate { source } => cli::generate::run(&config, source).await,
        Command::Crawl { file, targets } => cli::crawl::run(&config, file, targets).await,
    }
}
