use futures::future::BoxFuture;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

/// Counters of a [`ScheduledTask`].
#[derive(Debug, Default)]
pub struct TaskStats {
    pub ticks: AtomicU64,
    pub runs: AtomicU64,
    pub failures: AtomicU64,
    /// Ticks skipped because the previous run was still in flight.
    pub overruns: AtomicU64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TaskStatsSnapshot {
    pub ticks: u64,
    pub runs: u64,
    pub failures: u64,
    pub overruns: u64,
}

impl TaskStats {
    pub fn snapshot(&self) -> TaskStatsSnapshot {
        TaskStatsSnapshot {
            ticks: self.ticks.load(Ordering::Relaxed),
            runs: self.runs.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
            overruns: self.overruns.load(Ordering::Relaxed),
        }
    }
}

/// Releases the busy flag when the run finishes, even if it panicked.
struct BusyGuard(Arc<AtomicBool>);

impl Drop for BusyGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Recurring timer whose body never overlaps with itself.
///
/// Every tick spawns the body unless the previous one is still running, in which case the tick
/// is counted as an overrun and dropped.
pub struct ScheduledTask {
    name: String,
    stats: Arc<TaskStats>,
    busy: Arc<AtomicBool>,
    shutdown_tx: Option<mpsc::Sender<()>>,
    driver: Option<JoinHandle<()>>,
}

impl ScheduledTask {
    pub fn spawn<F>(name: impl Into<String>, period: Duration, body: F) -> Self
    where
        F: Fn() -> BoxFuture<'static, eyre::Result<()>> + Send + Sync + 'static,
    {
        let name = name.into();
        let stats = Arc::new(TaskStats::default());
        let busy = Arc::new(AtomicBool::new(false));
        let (shutdown_tx, mut shutdown_rx) = mpsc::channel::<()>(1);

        let driver = {
            let name = name.clone();
            let stats = stats.clone();
            let busy = busy.clone();
            let period = if period.is_zero() { Duration::from_millis(1) } else { period };

            tokio::spawn(async move {
                info!(task = %name, ?period, "Scheduled task started");
                let mut interval = tokio::time::interval(period);
                interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

                loop {
                    tokio::select! {
                        _ = shutdown_rx.recv() => {
                            info!(task = %name, "Received shutdown signal");
                            break;
                        }
                        _ = interval.tick() => {
                            stats.ticks.fetch_add(1, Ordering::Relaxed);

                            if busy.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire).is_err() {
                                let overruns = stats.overruns.fetch_add(1, Ordering::Relaxed) + 1;
                                warn!(task = %name, overruns, "Previous run still in flight, skipping tick");
                                continue;
                            }

                            let guard = BusyGuard(busy.clone());
                            let run = body();
                            let stats = stats.clone();
                            let name = name.clone();
                            tokio::spawn(async move {
                                let _guard = guard;
                                stats.runs.fetch_add(1, Ordering::Relaxed);
                                if let Err(e) = run.await {
                                    stats.failures.fetch_add(1, Ordering::Relaxed);
                                    error!(task = %name, "Scheduled run failed: {}", e);
                                } else {
                                    debug!(task = %name, "Scheduled run finished");
                                }
                            });
                        }
                    }
                }
            })
        };

        Self { name, stats, busy, shutdown_tx: Some(shutdown_tx), driver: Some(driver) }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn stats(&self) -> TaskStatsSnapshot {
        self.stats.snapshot()
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    pub fn is_running(&self) -> bool {
        self.driver.as_ref().map(|driver| !driver.is_finished()).unwrap_or(false)
    }

    /// Stops scheduling new runs and waits for the driver loop to exit. A run already in flight
    /// is left to finish on its own.
    pub async fn stop(&mut self) {
        if let Some(shutdown_tx) = self.shutdown_tx.take() {
            let _ = shutdown_tx.send(()).await;
        }
        if let Some(driver) = self.driver.take() {
            if let Err(e) = driver.await {
                warn!(task = %self.name, "Scheduled task driver error during shutdown: {}", e);
            }
        }
    }
}

impl Drop for ScheduledTask {
    fn drop(&mut self) {
        if let Some(driver) = self.driver.take() {
            warn!(task = %self.name, "Scheduled task dropped while running, aborting driver");
            driver.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::FutureExt;

    #[tokio::test]
    async fn test_runs_on_every_tick() {
        let counter = Arc::new(AtomicU64::new(0));
        let body_counter = counter.clone();
        let mut task = ScheduledTask::spawn("counter", Duration::from_millis(10), move || {
            let counter = body_counter.clone();
            async move {
                counter.fetch_add(1, Ordering::Relaxed);
                Ok(())
            }
            .boxed()
        });

        tokio::time::sleep(Duration::from_millis(75)).await;
        task.stop().await;

        let runs = counter.load(Ordering::Relaxed);
        assert!(runs >= 3, "expected several runs, got {runs}");
        assert!(!task.is_running());
        assert_eq!(task.stats().overruns, 0);
    }

    #[tokio::test]
    async fn test_slow_body_never_overlaps() {
        let in_flight = Arc::new(AtomicU64::new(0));
        let max_in_flight = Arc::new(AtomicU64::new(0));
        let (body_in_flight, body_max) = (in_flight.clone(), max_in_flight.clone());

        let mut task = ScheduledTask::spawn("slow", Duration::from_millis(5), move || {
            let in_flight = body_in_flight.clone();
            let max_in_flight = body_max.clone();
            async move {
                let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                max_in_flight.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(30)).await;
                in_flight.fetch_sub(1, Ordering::SeqCst);
                Ok(())
            }
            .boxed()
        });

        tokio::time::sleep(Duration::from_millis(15)).await;
        assert!(task.is_busy());
        tokio::time::sleep(Duration::from_millis(85)).await;
        task.stop().await;

        assert_eq!(max_in_flight.load(Ordering::SeqCst), 1);
        assert!(task.stats().overruns > 0);
    }

    #[tokio::test]
    async fn test_failures_are_counted() {
        let mut task = ScheduledTask::spawn("failing", Duration::from_millis(10), || async { Err(eyre::eyre!("boom")) }.boxed());

        tokio::time::sleep(Duration::from_millis(45)).await;
        task.stop().await;

        let stats = task.stats();
        assert!(stats.failures >= 1);
        assert!(stats.failures <= stats.runs);
    }
}
