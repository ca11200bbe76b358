//! Job registry: the single authority over crawl job state.
//!
//! One entry per distinct normalized target. All mutations go through
//! one async mutex, so transitions on the same target apply in
//! submission order and `list`/`end_all` see consistent snapshots. Each
//! job's fetcher runs as a supervised child task steered over a watch
//! channel; the registry never blocks on fetch progress.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch, Mutex};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::error::{Error, Result};
use crate::fetcher::{ControlState, FetchEvent, Fetcher, JobControls};
use crate::target;

/// Lifecycle states of a crawl job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobState {
    Running,
    Paused,
    Ended,
}

impl JobState {
    pub fn as_str(self) -> &'static str {
        match self {
            JobState::Running => "running",
            JobState::Paused => "paused",
            JobState::Ended => "ended",
        }
    }

    /// The transition table: `Running ⇄ Paused`, both → `Ended`.
    /// `Ended` is terminal.
    fn can_become(self, next: JobState) -> bool {
        matches!(
            (self, next),
            (JobState::Running, JobState::Paused)
                | (JobState::Paused, JobState::Running)
                | (JobState::Running, JobState::Ended)
                | (JobState::Paused, JobState::Ended)
        )
    }
}

/// Snapshot of one crawl job, as returned by `submit` and `list`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CrawlJob {
    /// Stable identity: the normalized target URL.
    pub id: String,
    pub target: String,
    pub state: JobState,
    /// Where the fetcher writes results, once it has confirmed output.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_path: Option<PathBuf>,
    pub created_at: DateTime<Utc>,
    pub last_transition_at: DateTime<Utc>,
    /// Fetcher-level failure recorded on this job only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

struct JobEntry {
    job: CrawlJob,
    /// Distinguishes this incarnation from a superseded one with the
    /// same target, so a stale supervisor cannot mutate the fresh entry.
    epoch: u64,
    control: watch::Sender<ControlState>,
    task: Option<JoinHandle<()>>,
}

#[derive(Default)]
struct Jobs {
    by_id: HashMap<String, JobEntry>,
    /// Creation order, for `list` snapshots.
    order: Vec<String>,
    next_epoch: u64,
}

pub struct Registry {
    jobs: Arc<Mutex<Jobs>>,
    fetcher: Arc<dyn Fetcher>,
}

impl Registry {
    pub fn new(fetcher: Arc<dyn Fetcher>) -> Self {
        Self {
            jobs: Arc::new(Mutex::new(Jobs::default())),
            fetcher,
        }
    }

    /// Create a job for `raw` and start its fetcher, or return the
    /// existing active job unchanged. Does not wait for the first byte.
    pub async fn submit(&self, raw: &str) -> Result<CrawlJob> {
        let id = target::normalize_url(raw)
            .ok_or_else(|| Error::InvalidTarget(raw.to_string()))?;

        let mut jobs = self.jobs.lock().await;
        if let Some(entry) = jobs.by_id.get(&id) {
            if entry.job.state != JobState::Ended {
                return Ok(entry.job.clone());
            }
        }

        let now = Utc::now();
        let epoch = jobs.next_epoch;
        jobs.next_epoch += 1;

        let (control, control_rx) = watch::channel(ControlState::Run);
        let (events_tx, events_rx) = mpsc::channel(16);
        let job = CrawlJob {
            id: id.clone(),
            target: id.clone(),
            state: JobState::Running,
            output_path: None,
            created_at: now,
            last_transition_at: now,
            error: None,
        };

        let fetcher = Arc::clone(&self.fetcher);
        let crawl_target = id.clone();
        let task = tokio::spawn(async move {
            fetcher
                .crawl(crawl_target, JobControls::new(control_rx), events_tx)
                .await;
        });
        tokio::spawn(supervise(
            Arc::clone(&self.jobs),
            id.clone(),
            epoch,
            events_rx,
        ));

        if !jobs.order.contains(&id) {
            jobs.order.push(id.clone());
        }
        jobs.by_id.insert(
            id.clone(),
            JobEntry {
                job: job.clone(),
                epoch,
                control,
                task: Some(task),
            },
        );
        info!("submitted crawl job for {id}");
        Ok(job)
    }

    /// `Running → Paused`. The fetcher parks at its next checkpoint.
    pub async fn pause(&self, raw: &str) -> Result<CrawlJob> {
        self.transition(raw, JobState::Paused, "pause").await
    }

    /// `Paused → Running`.
    pub async fn resume(&self, raw: &str) -> Result<CrawlJob> {
        self.transition(raw, JobState::Running, "resume").await
    }

    /// `Running | Paused → Ended`. The fetcher is told to stop and the
    /// entry is retained for `list`.
    pub async fn end(&self, raw: &str) -> Result<CrawlJob> {
        self.transition(raw, JobState::Ended, "end").await
    }

    /// End every non-ended job. Returns how many actually transitioned.
    pub async fn end_all(&self) -> usize {
        let mut jobs = self.jobs.lock().await;
        apply_all(&mut jobs, JobState::Ended)
    }

    /// Resume every paused job. Returns how many actually transitioned.
    pub async fn resume_all(&self) -> usize {
        let mut jobs = self.jobs.lock().await;
        apply_all(&mut jobs, JobState::Running)
    }

    /// Snapshot of all known jobs in creation order.
    pub async fn list(&self) -> Vec<CrawlJob> {
        let jobs = self.jobs.lock().await;
        jobs.order
            .iter()
            .filter_map(|id| jobs.by_id.get(id))
            .map(|entry| entry.job.clone())
            .collect()
    }

    /// Wait for every fetcher task to acknowledge cancellation. Returns
    /// `false` if the timeout elapsed first (forced termination).
    pub async fn drain(&self, timeout: Duration) -> bool {
        let handles: Vec<JoinHandle<()>> = {
            let mut jobs = self.jobs.lock().await;
            jobs.by_id
                .values_mut()
                .filter_map(|entry| entry.task.take())
                .collect()
        };
        if handles.is_empty() {
            return true;
        }
        tokio::time::timeout(timeout, futures::future::join_all(handles))
            .await
            .is_ok()
    }

    async fn transition(
        &self,
        raw: &str,
        next: JobState,
        action: &'static str,
    ) -> Result<CrawlJob> {
        let id = target::normalize_url(raw)
            .ok_or_else(|| Error::InvalidTarget(raw.to_string()))?;

        let mut jobs = self.jobs.lock().await;
        let entry = jobs
            .by_id
            .get_mut(&id)
            .ok_or_else(|| Error::JobNotFound(id.clone()))?;

        if !entry.job.state.can_become(next) {
            return Err(Error::IllegalTransition {
                target: id,
                state: entry.job.state.as_str(),
                action,
            });
        }
        set_state(entry, next);
        info!("{action} {id}");
        Ok(entry.job.clone())
    }
}

/// Apply a bulk transition to every job the table allows it for.
fn apply_all(jobs: &mut Jobs, next: JobState) -> usize {
    let mut changed = 0;
    for id in jobs.order.clone() {
        if let Some(entry) = jobs.by_id.get_mut(&id) {
            if entry.job.state.can_become(next) {
                set_state(entry, next);
                changed += 1;
            }
        }
    }
    changed
}

fn set_state(entry: &mut JobEntry, next: JobState) {
    entry.job.state = next;
    entry.job.last_transition_at = Utc::now();
    let signal = match next {
        JobState::Running => ControlState::Run,
        JobState::Paused => ControlState::Pause,
        JobState::Ended => ControlState::Stop,
    };
    // The task may already be gone; that is fine.
    let _ = entry.control.send(signal);
}

/// Apply fetch events to the owning entry. Exits when the fetcher drops
/// its event sender, or when the entry has been superseded.
async fn supervise(
    jobs: Arc<Mutex<Jobs>>,
    id: String,
    epoch: u64,
    mut events: mpsc::Receiver<FetchEvent>,
) {
    while let Some(event) = events.recv().await {
        let mut jobs = jobs.lock().await;
        let Some(entry) = jobs.by_id.get_mut(&id) else {
            break;
        };
        if entry.epoch != epoch {
            break;
        }
        match event {
            FetchEvent::Started { output_path } => {
                entry.job.output_path = Some(output_path);
            }
            FetchEvent::Finished { pages } => {
                info!("crawl of {id} finished after {pages} pages");
                if entry.job.state != JobState::Ended {
                    entry.job.state = JobState::Ended;
                    entry.job.last_transition_at = Utc::now();
                }
            }
            FetchEvent::Failed { message } => {
                warn!("crawl of {id} failed: {message}");
                entry.job.error = Some(message);
                if entry.job.state != JobState::Ended {
                    entry.job.state = JobState::Ended;
                    entry.job.last_transition_at = Utc::now();
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    /// Fetcher that reports output immediately, then idles until stopped.
    struct IdleFetcher;

    #[async_trait]
    impl Fetcher for IdleFetcher {
        async fn crawl(
            &self,
            target: String,
            mut controls: JobControls,
            events: mpsc::Sender<FetchEvent>,
        ) {
            let _ = events
                .send(FetchEvent::Started {
                    output_path: PathBuf::from(format!("/tmp/{}.txt", target.len())),
                })
                .await;
            while controls.checkpoint().await {
                tokio::time::sleep(Duration::from_millis(2)).await;
            }
            let _ = events.send(FetchEvent::Finished { pages: 0 }).await;
        }
    }

    /// Fetcher whose crawl completes on its own, right away.
    struct InstantFetcher;

    #[async_trait]
    impl Fetcher for InstantFetcher {
        async fn crawl(
            &self,
            _target: String,
            _controls: JobControls,
            events: mpsc::Sender<FetchEvent>,
        ) {
            let _ = events.send(FetchEvent::Finished { pages: 3 }).await;
        }
    }

    fn idle_registry() -> Registry {
        Registry::new(Arc::new(IdleFetcher))
    }

    #[tokio::test]
    async fn test_submit_is_idempotent() {
        let registry = idle_registry();
        let first = registry.submit("https://cnn.com").await.unwrap();
        let second = registry.submit("cnn.com/").await.unwrap();
        assert_eq!(first.id, second.id);
        assert_eq!(first.created_at, second.created_at);
        assert_eq!(registry.list().await.len(), 1);
    }

    #[tokio::test]
    async fn test_submit_rejects_invalid_target() {
        let registry = idle_registry();
        let err = registry.submit("not a url!").await.unwrap_err();
        assert_eq!(err.code(), "InvalidTarget");
    }

    #[tokio::test]
    async fn test_pause_resume_end_scenario() {
        let registry = idle_registry();
        registry.submit("https://cnn.com").await.unwrap();

        let jobs = registry.list().await;
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].state, JobState::Running);
        assert_eq!(jobs[0].target, "https://cnn.com/");

        let paused = registry.pause("https://cnn.com").await.unwrap();
        assert_eq!(paused.state, JobState::Paused);

        // Pausing a paused job is reported as failure, not a silent repeat.
        let err = registry.pause("https://cnn.com").await.unwrap_err();
        assert_eq!(err.code(), "IllegalTransition");

        let ended = registry.end("https://cnn.com").await.unwrap();
        assert_eq!(ended.state, JobState::Ended);

        // No transition out of Ended.
        let err = registry.pause("https://cnn.com").await.unwrap_err();
        assert_eq!(err.code(), "IllegalTransition");
        let err = registry.resume("https://cnn.com").await.unwrap_err();
        assert_eq!(err.code(), "IllegalTransition");
    }

    #[tokio::test]
    async fn test_resume_requires_paused() {
        let registry = idle_registry();
        registry.submit("https://cnn.com").await.unwrap();
        let err = registry.resume("https://cnn.com").await.unwrap_err();
        assert_eq!(err.code(), "IllegalTransition");

        let err = registry.resume("https://bbc.co.uk").await.unwrap_err();
        assert_eq!(err.code(), "JobNotFound");
    }

    #[tokio::test]
    async fn test_end_all_then_list_shows_nothing_active() {
        let registry = idle_registry();
        registry.submit("https://cnn.com").await.unwrap();
        registry.submit("https://bbc.co.uk").await.unwrap();
        registry.pause("https://bbc.co.uk").await.unwrap();

        assert_eq!(registry.end_all().await, 2);
        assert_eq!(registry.end_all().await, 0);
        assert!(registry
            .list()
            .await
            .iter()
            .all(|j| j.state == JobState::Ended));
    }

    #[tokio::test]
    async fn test_resume_all_touches_only_paused() {
        let registry = idle_registry();
        registry.submit("https://cnn.com").await.unwrap();
        registry.submit("https://bbc.co.uk").await.unwrap();
        registry.submit("https://lemonde.fr").await.unwrap();
        registry.pause("https://cnn.com").await.unwrap();
        registry.pause("https://bbc.co.uk").await.unwrap();

        assert_eq!(registry.resume_all().await, 2);
        assert!(registry
            .list()
            .await
            .iter()
            .all(|j| j.state == JobState::Running));
    }

    #[tokio::test]
    async fn test_list_preserves_creation_order() {
        let registry = idle_registry();
        for t in ["https://a.com", "https://b.com", "https://c.com"] {
            registry.submit(t).await.unwrap();
        }
        let targets: Vec<String> = registry.list().await.into_iter().map(|j| j.target).collect();
        assert_eq!(
            targets,
            vec!["https://a.com/", "https://b.com/", "https://c.com/"]
        );
    }

    #[tokio::test]
    async fn test_finished_fetch_ends_job() {
        let registry = Registry::new(Arc::new(InstantFetcher));
        registry.submit("https://cnn.com").await.unwrap();

        // The supervisor applies the Finished event asynchronously.
        for _ in 0..50 {
            if registry.list().await[0].state == JobState::Ended {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("job never reached Ended after its fetch finished");
    }

    #[tokio::test]
    async fn test_submit_after_end_starts_fresh_job() {
        let registry = idle_registry();
        let first = registry.submit("https://cnn.com").await.unwrap();
        registry.end("https://cnn.com").await.unwrap();

        let second = registry.submit("https://cnn.com").await.unwrap();
        assert_eq!(second.state, JobState::Running);
        assert!(second.created_at >= first.created_at);
        assert_eq!(registry.list().await.len(), 1);
    }

    #[tokio::test]
    async fn test_output_path_recorded_from_fetcher() {
        let registry = idle_registry();
        registry.submit("https://cnn.com").await.unwrap();
        for _ in 0..50 {
            if registry.list().await[0].output_path.is_some() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("output path never recorded");
    }

    #[tokio::test]
    async fn test_drain_waits_for_stopped_fetchers() {
        let registry = idle_registry();
        registry.submit("https://cnn.com").await.unwrap();
        registry.submit("https://bbc.co.uk").await.unwrap();
        registry.end_all().await;
        assert!(registry.drain(Duration::from_secs(2)).await);
    }
}
