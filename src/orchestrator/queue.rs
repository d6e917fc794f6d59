use super::{Job, JobOutcome, JobQueue, LiveScoreWorker, OddsUpdateWorker, QueueName};
use anyhow::{bail, Result};
use async_trait::async_trait;
use chrono::Utc;
use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tokio_stream::StreamExt;
use tracing::{debug, error, info, warn};

/// Attempts a job gets before it is dropped
pub const MAX_ATTEMPTS: u32 = 3;
/// Fixed wait before a failed job runs again
pub const RETRY_BACKOFF: Duration = Duration::from_secs(3 * 60);

/// Delayed job queue on tokio timers feeding an unbounded channel
#[derive(Debug, Clone)]
pub struct TokioJobQueue {
    sender: mpsc::UnboundedSender<Job>,
}

impl TokioJobQueue {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Job>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }
}

#[async_trait]
impl JobQueue for TokioJobQueue {
    async fn enqueue(&self, job: Job, delay: Duration) -> Result<()> {
        if self.sender.is_closed() {
            bail!("{} queue is closed", job.queue);
        }

        let sender = self.sender.clone();
        tokio::spawn(async move {
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            if sender.send(job).is_err() {
                debug!("Queue closed before delayed job was delivered");
            }
        });
        Ok(())
    }
}

/// Queue that only records what was scheduled
#[derive(Debug, Default)]
pub struct RecordingQueue {
    jobs: Mutex<Vec<(Job, Duration)>>,
}

impl RecordingQueue {
    pub fn jobs(&self) -> Vec<(Job, Duration)> {
        self.jobs
            .lock()
            .map(|jobs| jobs.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl JobQueue for RecordingQueue {
    async fn enqueue(&self, job: Job, delay: Duration) -> Result<()> {
        match self.jobs.lock() {
            Ok(mut jobs) => {
                jobs.push((job, delay));
                Ok(())
            }
            Err(_) => bail!("Recording queue poisoned"),
        }
    }
}

/// Both lifecycle workers, shared by every job task
pub struct Workers {
    pub odds_update: OddsUpdateWorker,
    pub live_score: LiveScoreWorker,
}

/// Run one job, scheduling a retry with fixed backoff if it fails
pub async fn handle_job(workers: &Workers, queue: &dyn JobQueue, job: Job) -> Option<JobOutcome> {
    let now = Utc::now();
    let result = match job.queue {
        QueueName::OddsUpdate => workers.odds_update.process(&job.matchup_id, now).await,
        QueueName::LiveScore => workers.live_score.process(&job.matchup_id, now).await,
    };

    match result {
        Ok(outcome) => {
            debug!(queue = %job.queue, matchup_id = %job.matchup_id, ?outcome, "Job completed");
            Some(outcome)
        }
        Err(e) => {
            let attempts_made = job.attempts_made + 1;
            if attempts_made < MAX_ATTEMPTS {
                warn!(
                    queue = %job.queue,
                    matchup_id = %job.matchup_id,
                    attempts_made,
                    error = %e,
                    "Job failed, retrying"
                );
                let retry = Job {
                    attempts_made,
                    ..job
                };
                if let Err(e) = queue.enqueue(retry, RETRY_BACKOFF).await {
                    error!(error = %e, "Failed to schedule retry");
                }
            } else {
                error!(
                    queue = %job.queue,
                    matchup_id = %job.matchup_id,
                    attempts_made,
                    error = %e,
                    "Job failed"
                );
            }
            None
        }
    }
}

/// Consume jobs until `shutdown` resolves or every sender is gone
pub async fn run_workers<F>(
    receiver: mpsc::UnboundedReceiver<Job>,
    workers: Arc<Workers>,
    queue: Arc<dyn JobQueue>,
    shutdown: F,
) where
    F: Future<Output = ()>,
{
    let mut jobs = UnboundedReceiverStream::new(receiver);
    tokio::pin!(shutdown);

    info!("Workers started");
    loop {
        tokio::select! {
            _ = &mut shutdown => {
                info!("Shutting down workers");
                break;
            }
            next = jobs.next() => {
                let Some(job) = next else {
                    info!("Job queue closed");
                    break;
                };
                let workers = Arc::clone(&workers);
                let queue = Arc::clone(&queue);
                tokio::spawn(async move {
                    handle_job(&workers, queue.as_ref(), job).await;
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Matchup;
    use crate::orchestrator::{OddsFeed, QuotedLine, ScoreEvent, ScoreFeed};
    use crate::store::InMemoryStore;

    struct NoFeed;

    #[async_trait]
    impl ScoreFeed for NoFeed {
        async fn lookup_event(&self, _id_event: &str) -> Result<Option<ScoreEvent>> {
            Ok(None)
        }
    }

    #[async_trait]
    impl OddsFeed for NoFeed {
        async fn fetch_line(&self, _matchup: &Matchup) -> Result<Option<QuotedLine>> {
            Ok(None)
        }
    }

    fn workers(queue: Arc<RecordingQueue>) -> Workers {
        let store = Arc::new(InMemoryStore::default());
        let feed = Arc::new(NoFeed);
        Workers {
            odds_update: OddsUpdateWorker::new(store.clone(), feed.clone(), queue.clone()),
            live_score: LiveScoreWorker::new(store, feed, queue),
        }
    }

    #[tokio::test]
    async fn test_failed_job_is_retried_with_backoff() {
        let queue = Arc::new(RecordingQueue::default());
        let workers = workers(queue.clone());

        let outcome = handle_job(&workers, queue.as_ref(), Job::live_score("missing")).await;
        assert!(outcome.is_none());

        let retry = Job {
            attempts_made: 1,
            ..Job::live_score("missing")
        };
        assert_eq!(queue.jobs(), vec![(retry, RETRY_BACKOFF)]);
    }

    #[tokio::test]
    async fn test_job_is_dropped_after_last_attempt() {
        let queue = Arc::new(RecordingQueue::default());
        let workers = workers(queue.clone());

        let last = Job {
            attempts_made: MAX_ATTEMPTS - 1,
            ..Job::odds_update("missing")
        };
        assert!(handle_job(&workers, queue.as_ref(), last).await.is_none());
        assert!(queue.jobs().is_empty());
    }

    #[tokio::test]
    async fn test_tokio_queue_delivers_after_delay() {
        let (queue, mut receiver) = TokioJobQueue::new();

        queue
            .enqueue(Job::odds_update("m1"), Duration::from_millis(10))
            .await
            .unwrap();
        queue
            .enqueue(Job::live_score("m2"), Duration::ZERO)
            .await
            .unwrap();

        let first = receiver.recv().await.unwrap();
        let second = receiver.recv().await.unwrap();
        assert_eq!(first, Job::live_score("m2"));
        assert_eq!(second, Job::odds_update("m1"));
    }

    #[tokio::test]
    async fn test_tokio_queue_rejects_jobs_once_closed() {
        let (queue, receiver) = TokioJobQueue::new();
        drop(receiver);
        assert!(queue.enqueue(Job::live_score("m1"), Duration::ZERO).await.is_err());
    }

    #[tokio::test]
    async fn test_run_workers_stops_on_shutdown() {
        let (queue, receiver) = TokioJobQueue::new();
        let recorder = Arc::new(RecordingQueue::default());
        let workers = Arc::new(workers(recorder));

        queue.enqueue(Job::live_score("missing"), Duration::ZERO).await.unwrap();
        run_workers(receiver, workers, Arc::new(queue), async {
            tokio::time::sleep(Duration::from_millis(50)).await;
        })
        .await;
    }
}
