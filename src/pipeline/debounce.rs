//! Cancellable, last-writer-wins delayed work.

use std::time::Duration;

use tokio::task::JoinHandle;

use super::Generation;

/// Default coalescing window for crop adjustments.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(100);

/// Runs at most one delayed job at a time.
///
/// Scheduling a new job aborts the pending one, so only the most recent
/// request can ever complete. Each job remembers the generation it was
/// scheduled under; the caller compares it against the live generation
/// before applying the output.
#[derive(Debug)]
pub struct Debouncer<T> {
    delay: Duration,
    pending: Option<(Generation, JoinHandle<T>)>,
}

impl<T: Send + 'static> Debouncer<T> {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: None,
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Replace any pending job with `job`, run after the delay.
    ///
    /// Must be called from within a tokio runtime.
    pub fn schedule<F>(&mut self, generation: Generation, job: F)
    where
        F: FnOnce() -> T + Send + 'static,
    {
        if self.cancel() {
            tracing::trace!(%generation, "superseded pending debounced job");
        }
        let delay = self.delay;
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            job()
        });
        self.pending = Some((generation, handle));
    }

    /// Abort the pending job. Returns whether one was pending.
    pub fn cancel(&mut self) -> bool {
        match self.pending.take() {
            Some((_, handle)) => {
                handle.abort();
                true
            }
            None => false,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Wait for the pending job and return its output with its generation.
    ///
    /// Returns `None` when nothing is pending or the job was aborted.
    pub async fn wait(&mut self) -> Option<(Generation, T)> {
        let (generation, handle) = self.pending.take()?;
        match handle.await {
            Ok(output) => Some((generation, output)),
            Err(err) if err.is_cancelled() => None,
            Err(err) => std::panic::resume_unwind(err.into_panic()),
        }
    }
}

impl<T> Drop for Debouncer<T> {
    fn drop(&mut self) {
        if let Some((_, handle)) = self.pending.take() {
            handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[tokio::test(start_paused = true)]
    async fn later_schedule_supersedes_earlier() {
        let runs = Arc::new(AtomicUsize::new(0));
        let mut debouncer = Debouncer::new(DEFAULT_DEBOUNCE);

        for value in 1..=3u64 {
            let runs = Arc::clone(&runs);
            debouncer.schedule(Generation(value), move || {
                runs.fetch_add(1, Ordering::SeqCst);
                value
            });
        }

        let (generation, output) = debouncer.wait().await.expect("last job completes");
        assert_eq!(generation.as_u64(), 3);
        assert_eq!(output, 3);
        assert_eq!(runs.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn job_waits_for_the_delay() {
        let mut debouncer = Debouncer::new(Duration::from_millis(100));
        let start = tokio::time::Instant::now();
        debouncer.schedule(Generation::default(), || ());
        debouncer.wait().await.expect("job completes");
        assert!(start.elapsed() >= Duration::from_millis(100));
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_job_never_runs() {
        let runs = Arc::new(AtomicUsize::new(0));
        let mut debouncer = Debouncer::new(DEFAULT_DEBOUNCE);
        let counter = Arc::clone(&runs);
        debouncer.schedule(Generation::default(), move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        assert!(debouncer.cancel());
        assert!(!debouncer.is_pending());
        tokio::time::sleep(Duration::from_millis(500)).await;

        assert!(debouncer.wait().await.is_none());
        assert_eq!(runs.load(Ordering::SeqCst), 0);
    }
}
