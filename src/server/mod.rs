//! TCP protocol server: the daemon's network face.
//!
//! Accepts connections on the configured address, decodes exactly one
//! command envelope per connection, dispatches to the job registry and
//! catalog components, writes exactly one response envelope, and closes.
//! Component-level failures become structured error responses; only a
//! bind failure is fatal.

pub mod protocol;

use anyhow::Context;
use chrono::Utc;
use serde_json::json;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{Mutex, Notify};
use tracing::{debug, info, warn};

use crate::catalog::reddit::RedditGenerator;
use crate::catalog::wikipedia::{WikipediaGenerator, WIKIPEDIA_CATALOG};
use crate::catalog::{CatalogStore, GenerationStatus};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::registry::Registry;
use crate::server::protocol::{Request, Response};
use crate::target::{self, Target};

/// How long `shutdown` waits for fetcher tasks to acknowledge
/// cancellation before reporting forced termination.
const SHUTDOWN_DRAIN_TIMEOUT: Duration = Duration::from_secs(10);

/// A dispatched command's response, plus whether the daemon should stop
/// accepting connections once the response is on the wire.
struct Dispatch {
    response: Response,
    shutdown: bool,
}

pub struct Server {
    config: Config,
    registry: Registry,
    store: Arc<CatalogStore>,
    generations: Arc<Mutex<HashMap<String, GenerationStatus>>>,
    shutdown: Arc<Notify>,
    /// Flips to true once the accept loop has exited and the listener
    /// is dropped; `shutdown` reports success only after that.
    closed: tokio::sync::watch::Sender<bool>,
    client: reqwest::Client,
}

impl Server {
    pub fn new(config: Config, registry: Registry, store: Arc<CatalogStore>) -> Arc<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent(concat!("turbocrawl/", env!("CARGO_PKG_VERSION")))
            .build()
            .unwrap_or_default();
        let (closed, _) = tokio::sync::watch::channel(false);
        Arc::new(Self {
            config,
            registry,
            store,
            generations: Arc::new(Mutex::new(HashMap::new())),
            shutdown: Arc::new(Notify::new()),
            closed,
            client,
        })
    }

    /// Handle for requesting shutdown from outside (signal handler).
    pub fn shutdown_handle(&self) -> Arc<Notify> {
        Arc::clone(&self.shutdown)
    }

    /// Bind the configured address and serve until shutdown. A bind
    /// failure is fatal to the daemon process.
    pub async fn listen(self: Arc<Self>) -> anyhow::Result<()> {
        let addr = self.config.addr();
        let listener = TcpListener::bind(&addr)
            .await
            .with_context(|| format!("cannot bind {addr}"))?;
        info!("listening on {addr}");
        self.serve(listener).await;
        Ok(())
    }

    /// Serve connections from an already-bound listener. Tests bind an
    /// ephemeral port themselves and pass it in.
    pub async fn serve(self: Arc<Self>, listener: TcpListener) {
        loop {
            tokio::select! {
                _ = self.shutdown.notified() => {
                    info!("shutdown requested, closing listener");
                    break;
                }
                accepted = listener.accept() => {
                    match accepted {
                        Ok((stream, peer)) => {
                            let server = Arc::clone(&self);
                            tokio::spawn(async move {
                                server.handle_connection(stream, peer).await;
                            });
                        }
                        Err(e) => warn!("accept failed: {e}"),
                    }
                }
            }
        }
        drop(listener);
        let _ = self.closed.send(true);
    }

    async fn handle_connection(self: Arc<Self>, stream: TcpStream, peer: SocketAddr) {
        let (reader, mut writer) = stream.into_split();
        let mut reader = BufReader::new(reader);

        let mut line = String::new();
        match reader.read_line(&mut line).await {
            Ok(0) | Err(_) => return,
            Ok(_) => {}
        }

        let dispatch = match protocol::decode_request(&line) {
            Ok(request) => {
                debug!("{} from {peer}", request.command);
                self.dispatch(request).await
            }
            Err(e) => Dispatch {
                response: Response::failure(&e),
                shutdown: false,
            },
        };

        if dispatch.shutdown {
            // Stop the accept loop and wait for the listener to close
            // before reporting success to the caller.
            let mut closed = self.closed.subscribe();
            self.shutdown.notify_one();
            while !*closed.borrow_and_update() {
                if closed.changed().await.is_err() {
                    break;
                }
            }
        }

        if let Err(e) = writer
            .write_all(protocol::encode(&dispatch.response).as_bytes())
            .await
        {
            warn!("write to {peer} failed: {e}");
        }
        let _ = writer.flush().await;
        let _ = writer.shutdown().await;
    }

    async fn dispatch(&self, request: Request) -> Dispatch {
        if request.command == "shutdown" {
            return self.shutdown_dispatch().await;
        }

        let result = match request.command.as_str() {
            "ping" => Ok(json!({ "version": env!("CARGO_PKG_VERSION") })),
            "list" => Ok(json!({
                "jobs": self.registry.list().await,
                "catalogs": self.store.names(),
            })),
            "crawl" => self.cmd_crawl(&request.args).await,
            "random" => self.cmd_random().await,
            "pause" => match first_arg(&request.args) {
                Ok(raw) => self.registry.pause(raw).await.map(job_payload),
                Err(e) => Err(e),
            },
            "resume" => match first_arg(&request.args) {
                Ok(raw) => self.registry.resume(raw).await.map(job_payload),
                Err(e) => Err(e),
            },
            "end" => match first_arg(&request.args) {
                Ok(raw) => self.registry.end(raw).await.map(job_payload),
                Err(e) => Err(e),
            },
            "endall" => Ok(json!({ "ended": self.registry.end_all().await })),
            "resumeall" => Ok(json!({ "resumed": self.registry.resume_all().await })),
            "generate" => self.cmd_generate(&request.args).await,
            other => Err(Error::Decode(format!("unknown command: {other}"))),
        };

        Dispatch {
            response: match result {
                Ok(payload) => Response::success(payload),
                Err(e) => Response::failure(&e),
            },
            shutdown: false,
        }
    }

    async fn shutdown_dispatch(&self) -> Dispatch {
        let ended = self.registry.end_all().await;
        let drained = self.registry.drain(SHUTDOWN_DRAIN_TIMEOUT).await;
        let mut payload = json!({ "endedJobs": ended });
        if !drained {
            warn!("drain timed out, fetchers terminated forcibly");
            payload["warning"] = json!("some fetchers did not acknowledge cancellation in time");
        }
        Dispatch {
            response: Response::success(payload),
            shutdown: true,
        }
    }

    /// Submit one job per resolved target. A national key fans out into
    /// one submission per cataloged domain.
    async fn cmd_crawl(&self, args: &[String]) -> Result<serde_json::Value> {
        if args.is_empty() {
            return Err(Error::InvalidTarget("<missing>".to_string()));
        }
        let mut jobs = Vec::new();
        for arg in args {
            match target::resolve(arg)? {
                Target::Url(url) => jobs.push(self.registry.submit(&url).await?),
                Target::Random => jobs.push(self.submit_random().await?),
                Target::National(key) => {
                    for domain in self.store.resolve_national(&key)? {
                        let Some(url) = target::normalize_url(&domain) else {
                            warn!("catalog {key} holds an unusable domain: {domain}");
                            continue;
                        };
                        jobs.push(self.registry.submit(&url).await?);
                    }
                }
            }
        }
        Ok(json!({ "jobs": jobs }))
    }

    async fn cmd_random(&self) -> Result<serde_json::Value> {
        let job = self.submit_random().await?;
        Ok(json!({ "target": job.target.clone(), "job": job }))
    }

    async fn submit_random(&self) -> Result<crate::registry::CrawlJob> {
        let domain = {
            let mut rng = rand::thread_rng();
            self.store.random_domain(&mut rng)?
        };
        let url =
            target::normalize_url(&domain).ok_or_else(|| Error::InvalidTarget(domain.clone()))?;
        self.registry.submit(&url).await
    }

    async fn cmd_generate(&self, args: &[String]) -> Result<serde_json::Value> {
        match first_arg(args)?.as_str() {
            "reddit" => {
                let generator = RedditGenerator::new(
                    self.client.clone(),
                    self.config.sources.reddit_whitelist.clone(),
                );
                let report = generator.generate(&self.store).await?;
                Ok(serde_json::to_value(&report)?)
            }
            "wikipedia" | "countries" => self.generate_wikipedia().await,
            other => Err(Error::InvalidTarget(format!("unknown catalog: {other}"))),
        }
    }

    /// Fire-and-forget with poll: the first call starts a background
    /// run; while it runs, calls report `running`; the first call after
    /// it finishes returns the final report and clears it, so a later
    /// call starts a fresh run.
    async fn generate_wikipedia(&self) -> Result<serde_json::Value> {
        let mut runs = self.generations.lock().await;
        match runs.get(WIKIPEDIA_CATALOG).cloned() {
            Some(status @ GenerationStatus::Running { .. }) => Ok(serde_json::to_value(&status)?),
            Some(finished) => {
                runs.remove(WIKIPEDIA_CATALOG);
                Ok(serde_json::to_value(&finished)?)
            }
            None => {
                runs.insert(
                    WIKIPEDIA_CATALOG.to_string(),
                    GenerationStatus::Running {
                        catalog_name: WIKIPEDIA_CATALOG.to_string(),
                        started_at: Utc::now(),
                    },
                );
                let generator = WikipediaGenerator::new(
                    self.client.clone(),
                    self.config.sources.wikipedia_category.clone(),
                );
                let store = Arc::clone(&self.store);
                let generations = Arc::clone(&self.generations);
                tokio::spawn(async move {
                    let status = match generator.generate(&store).await {
                        Ok(report) => GenerationStatus::Completed {
                            report,
                            finished_at: Utc::now(),
                        },
                        Err(e) => GenerationStatus::Failed {
                            catalog_name: WIKIPEDIA_CATALOG.to_string(),
                            message: e.to_string(),
                        },
                    };
                    generations
                        .lock()
                        .await
                        .insert(WIKIPEDIA_CATALOG.to_string(), status);
                });
                Ok(json!({ "state": "started", "catalogName": WIKIPEDIA_CATALOG }))
            }
        }
    }
}

fn first_arg(args: &[String]) -> Result<&String> {
    args.first()
        .ok_or_else(|| Error::InvalidTarget("<missing argument>".to_string()))
}

fn job_payload(job: crate::registry::CrawlJob) -> serde_json::Value {
    json!({ "job": job })
}
