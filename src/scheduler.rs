//! Periodic background jobs.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

/// Outcome of a single job run.
pub type JobResult = Result<(), Box<dyn std::error::Error + Send + Sync>>;

/// A task the scheduler runs on a fixed interval.
#[async_trait]
pub trait SchedulerJob: Send + Sync {
    /// Name used in logs.
    fn name(&self) -> &'static str;

    /// Time between two runs.
    fn interval(&self) -> Duration;

    /// Run the job once.
    async fn execute(&self) -> JobResult;
}

/// Scheduler service that manages periodic background tasks.
///
/// Each job runs independently in its own tokio task. The first run happens
/// as soon as the job is started, then once per interval.
///
/// # Example
///
/// ```rust,ignore
/// let scheduler = SchedulerService::new().with_job(KeepAliveJob::new(..));
/// let handles = scheduler.start();
/// ```
#[derive(Default)]
pub struct SchedulerService {
    jobs: Vec<Arc<dyn SchedulerJob>>,
}

impl SchedulerService {
    /// Creates a new scheduler service with no jobs.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a job to the scheduler.
    ///
    /// Jobs are not started until [`start`](Self::start) is called.
    pub fn with_job<J: SchedulerJob + 'static>(mut self, job: J) -> Self {
        self.jobs.push(Arc::new(job));
        self
    }

    /// Starts all registered jobs and returns their task handles.
    ///
    /// This method returns immediately after spawning all tasks. Dropping the
    /// handles does not stop the jobs; abort them to do so.
    pub fn start(&self) -> Vec<JoinHandle<()>> {
        self.jobs
            .iter()
            .map(|job| {
                let job = Arc::clone(job);
                tokio::spawn(async move {
                    Self::run_job_loop(job).await;
                })
            })
            .collect()
    }

    /// Runs a single job in an infinite loop.
    async fn run_job_loop(job: Arc<dyn SchedulerJob>) {
        let name = job.name();
        let interval = job.interval().max(Duration::from_millis(1));

        let mut timer = tokio::time::interval(interval);
        timer.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            timer.tick().await;

            match job.execute().await {
                Ok(()) => {
                    tracing::debug!(job = name, "Job completed successfully");
                }
                Err(e) => {
                    tracing::error!(job = name, error = %e, "Job failed");
                }
            }
        }
    }

    /// Returns the number of registered jobs.
    pub fn job_count(&self) -> usize {
        self.jobs.len()
    }
}

impl std::fmt::Debug for SchedulerService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<_> = self.jobs.iter().map(|j| j.name()).collect();
        f.debug_struct("SchedulerService").field("jobs", &names).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingJob {
        runs: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl SchedulerJob for CountingJob {
        fn name(&self) -> &'static str {
            "Counting"
        }

        fn interval(&self) -> Duration {
            Duration::from_secs(600)
        }

        async fn execute(&self) -> JobResult {
            self.runs.fetch_add(1, Ordering::SeqCst);
            Err("always fails".into())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_runs_immediately_then_on_interval() {
        let runs = Arc::new(AtomicUsize::new(0));
        let scheduler = SchedulerService::new().with_job(CountingJob { runs: runs.clone() });
        assert_eq!(scheduler.job_count(), 1);

        let handles = scheduler.start();

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(runs.load(Ordering::SeqCst), 1);

        tokio::time::sleep(Duration::from_secs(600)).await;
        assert_eq!(runs.load(Ordering::SeqCst), 2);

        for handle in handles {
            handle.abort();
        }
    }
}
