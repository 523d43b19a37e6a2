use log::{debug, info};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::time::{interval_at, sleep, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

/// Runs recurring and delayed jobs on a bounded number of concurrent workers.
///
/// Each firing of a job runs as its own task, so different jobs overlap the
/// way independent timers would. At most `workers` firings run at once; a
/// tick that finds no free worker waits for one and later missed ticks are
/// skipped. [`Scheduler::shutdown`] stops new firings and waits for the
/// running ones to finish.
pub struct Scheduler {
    token: CancellationToken,
    tracker: TaskTracker,
    permits: Arc<Semaphore>,
}

impl Scheduler {
    pub fn new(workers: usize) -> Self {
        Self {
            token: CancellationToken::new(),
            tracker: TaskTracker::new(),
            permits: Arc::new(Semaphore::new(workers.max(1))),
        }
    }

    /// Fires `job` every `period`, starting one period from now.
    pub fn schedule_every<F, Fut>(&self, name: &'static str, period: Duration, job: F)
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let token = self.token.clone();
        let tracker = self.tracker.clone();
        let permits = self.permits.clone();

        self.tracker.spawn(async move {
            debug!("Scheduling {} every {:?}", name, period);
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = ticker.tick() => {}
                }
                let permit = tokio::select! {
                    _ = token.cancelled() => break,
                    permit = permits.clone().acquire_owned() => permit,
                };
                let Ok(permit) = permit else { break };
                let run = job();
                tracker.spawn(async move {
                    run.await;
                    drop(permit);
                });
            }
            debug!("Stopped scheduling {}", name);
        });
    }

    /// Fires `job` once after `delay`, unless the scheduler shuts down first.
    pub fn schedule_after<F, Fut>(&self, name: &'static str, delay: Duration, job: F)
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let token = self.token.clone();
        let permits = self.permits.clone();

        self.tracker.spawn(async move {
            tokio::select! {
                _ = token.cancelled() => return,
                _ = sleep(delay) => {}
            }
            let permit = tokio::select! {
                _ = token.cancelled() => return,
                permit = permits.acquire_owned() => permit,
            };
            if let Ok(_permit) = permit {
                debug!("Running {}", name);
                job().await;
            }
        });
    }

    pub fn is_running(&self) -> bool {
        !self.token.is_cancelled()
    }

    /// Stops firing jobs and waits for every running firing to complete.
    pub async fn shutdown(&self) {
        if self.token.is_cancelled() && self.tracker.is_closed() && self.tracker.is_empty() {
            return;
        }
        info!("Stopping scheduler, {} task(s) in flight", self.tracker.len());
        self.token.cancel();
        self.tracker.close();
        self.tracker.wait().await;
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        self.token.cancel();
    }
}
