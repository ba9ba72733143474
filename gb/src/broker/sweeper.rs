//! Cancellable periodic background task

use std::future::Future;
use std::time::Duration;

use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

const MIN_PERIOD: Duration = Duration::from_millis(1);

/// A periodic pass running on its own task until stopped or dropped
///
/// Dropping the handle without calling [`Sweeper::stop`] also ends the task
/// on its next wakeup, since the stop channel closes.
pub(crate) struct Sweeper {
    name: &'static str,
    stop_tx: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

impl Sweeper {
    /// Spawn `pass` every `period`; the first pass runs one period after spawn
    pub(crate) fn spawn<F, Fut>(name: &'static str, period: Duration, mut pass: F) -> Self
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        debug!(%name, ?period, "Sweeper::spawn: called");
        let period = period.max(MIN_PERIOD);
        let (stop_tx, mut stop_rx) = oneshot::channel::<()>();

        let task = tokio::spawn(async move {
            info!(%name, ?period, "Sweeper started");
            let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
            loop {
                tokio::select! {
                    _ = &mut stop_rx => break,
                    _ = ticker.tick() => pass().await,
                }
            }
            info!(%name, "Sweeper stopped");
        });

        Self { name, stop_tx, task }
    }

    /// Signal the task and wait for it to exit
    pub(crate) async fn stop(self) {
        debug!(name = %self.name, "Sweeper::stop: called");
        let _ = self.stop_tx.send(());
        if let Err(e) = self.task.await {
            warn!(name = %self.name, error = %e, "Sweeper task ended abnormally");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn test_sweeper_runs_periodically() {
        let count = Arc::new(AtomicUsize::new(0));
        let counter = count.clone();
        let sweeper = Sweeper::spawn("test", Duration::from_millis(10), move || {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
            }
        });

        tokio::time::sleep(Duration::from_millis(75)).await;
        sweeper.stop().await;

        assert!(count.load(Ordering::SeqCst) >= 3);
    }

    #[tokio::test]
    async fn test_sweeper_zero_period_is_clamped() {
        let count = Arc::new(AtomicUsize::new(0));
        let counter = count.clone();
        let sweeper = Sweeper::spawn("test", Duration::ZERO, move || {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
            }
        });

        tokio::time::sleep(Duration::from_millis(20)).await;
        sweeper.stop().await;
        assert!(count.load(Ordering::SeqCst) >= 1);
    }

    #[tokio::test]
    async fn test_sweeper_stops_running_after_stop() {
        let count = Arc::new(AtomicUsize::new(0));
        let counter = count.clone();
        let sweeper = Sweeper::spawn("test", Duration::from_millis(10), move || {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
            }
        });

        tokio::time::sleep(Duration::from_millis(35)).await;
        sweeper.stop().await;
        let after_stop = count.load(Ordering::SeqCst);

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(count.load(Ordering::SeqCst), after_stop);
    }
}
