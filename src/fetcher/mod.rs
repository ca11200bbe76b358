//! The fetcher seam: the registry drives page fetching through this
//! boundary but does not implement it.
//!
//! A fetcher runs as a supervised task, one per crawl job. The registry
//! steers it through a [`JobControls`] watch channel (run / pause / stop)
//! and observes it through [`FetchEvent`]s. Pausing suspends forward
//! progress without killing the task; the fetcher keeps its visited set
//! so a resume does not refetch from scratch.

pub mod http;
pub mod limiter;

use async_trait::async_trait;
use std::path::PathBuf;
use tokio::sync::{mpsc, watch};

pub use http::HttpFetcher;

/// Desired execution state for a job's fetch task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlState {
    Run,
    Pause,
    Stop,
}

/// Receiving side of the registry's control channel for one job.
#[derive(Debug)]
pub struct JobControls {
    rx: watch::Receiver<ControlState>,
}

impl JobControls {
    pub fn new(rx: watch::Receiver<ControlState>) -> Self {
        Self { rx }
    }

    /// Current desired state.
    pub fn state(&self) -> ControlState {
        *self.rx.borrow()
    }

    /// Checkpoint between units of work: parks while paused, returns
    /// `true` to continue and `false` to stop. A dropped sender counts
    /// as stop.
    pub async fn checkpoint(&mut self) -> bool {
        loop {
            let state = *self.rx.borrow_and_update();
            match state {
                ControlState::Run => return true,
                ControlState::Stop => return false,
                ControlState::Pause => {
                    if self.rx.changed().await.is_err() {
                        return false;
                    }
                }
            }
        }
    }
}

/// Progress reports a fetch task sends back to the registry.
#[derive(Debug, Clone)]
pub enum FetchEvent {
    /// The fetcher has begun producing output at this path.
    Started { output_path: PathBuf },
    /// The fetch ran to completion or acknowledged a stop.
    Finished { pages: usize },
    /// The fetch failed outright. Recorded on the job only; other jobs
    /// are unaffected.
    Failed { message: String },
}

/// Performs the actual page retrieval and link extraction for one job.
#[async_trait]
pub trait Fetcher: Send + Sync + 'static {
    /// Crawl `target` until done or stopped, reporting on `events` and
    /// obeying `controls`. Must not panic on per-page errors.
    async fn crawl(
        &self,
        target: String,
        controls: JobControls,
        events: mpsc::Sender<FetchEvent>,
    );
}
