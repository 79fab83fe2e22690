use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, Semaphore};
use tokio::task::JoinSet;
use tokio::time::Instant;
use tracing::{debug, error, instrument};

/// Spaces outbound requests so that consecutive starts, across all holders,
/// are at least `interval` apart.
#[derive(Debug)]
pub struct RateLimiter {
    interval: Duration,
    next_slot: Mutex<Instant>,
}

impl RateLimiter {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            next_slot: Mutex::new(Instant::now()),
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Waits until the caller's reserved slot comes up.
    pub async fn acquire(&self) {
        if self.interval.is_zero() {
            return;
        }

        let slot = {
            let mut next = self.next_slot.lock().await;
            let slot = (*next).max(Instant::now());
            *next = slot + self.interval;
            slot
        };
        tokio::time::sleep_until(slot).await;
    }
}

/// Bounded worker pool: every submitted unit runs in its own task, but at most
/// `concurrency_limit` of them execute at once.
pub struct HarvestExecutor {
    semaphore: Arc<Semaphore>,
    limiter: Arc<RateLimiter>,
    concurrency_limit: usize,
}

impl HarvestExecutor {
    pub fn new(concurrency_limit: usize, request_interval: Duration) -> Self {
        let concurrency_limit = concurrency_limit.max(1);
        Self {
            semaphore: Arc::new(Semaphore::new(concurrency_limit)),
            limiter: Arc::new(RateLimiter::new(request_interval)),
            concurrency_limit,
        }
    }

    pub fn concurrency_limit(&self) -> usize {
        self.concurrency_limit
    }

    /// Shared limiter for requests issued by work units.
    pub fn limiter(&self) -> Arc<RateLimiter> {
        Arc::clone(&self.limiter)
    }

    /// Runs `work` over every item and returns outputs in submission order.
    ///
    /// A slot is `None` when its task panicked or could not obtain a permit;
    /// one unit failing never affects the others.
    #[instrument(skip_all, fields(units = items.len(), workers = self.concurrency_limit))]
    pub async fn run_ordered<T, R, F, Fut>(&self, items: Vec<T>, work: F) -> Vec<Option<R>>
    where
        T: Send + 'static,
        R: Send + 'static,
        F: Fn(T) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = R> + Send + 'static,
    {
        let work = Arc::new(work);
        let mut results: Vec<Option<R>> =
            std::iter::repeat_with(|| None).take(items.len()).collect();
        let mut tasks = JoinSet::new();

        for (index, item) in items.into_iter().enumerate() {
            let semaphore = Arc::clone(&self.semaphore);
            let work = Arc::clone(&work);
            tasks.spawn(async move {
                let _permit = match semaphore.acquire_owned().await {
                    Ok(permit) => permit,
                    Err(e) => {
                        error!(index, "Semaphore error: {}", e);
                        return (index, None);
                    }
                };
                (index, Some(work(item).await))
            });
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, output)) => results[index] = output,
                Err(e) => error!("Work unit task failed: {}", e),
            }
        }

        debug!(
            completed = results.iter().filter(|r| r.is_some()).count(),
            "Work units finished"
        );
        results
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn test_results_keep_submission_order() {
        let executor = HarvestExecutor::new(4, Duration::ZERO);
        let items: Vec<u64> = (0..20).collect();

        let results = executor
            .run_ordered(items, |n| async move {
                // later items finish first
                tokio::time::sleep(Duration::from_millis(20 - n)).await;
                n * 2
            })
            .await;

        let values: Vec<u64> = results.into_iter().map(|r| r.unwrap()).collect();
        assert_eq!(values, (0..20).map(|n| n * 2).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn test_concurrency_is_bounded() {
        let executor = HarvestExecutor::new(3, Duration::ZERO);
        let running = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let (r, p) = (Arc::clone(&running), Arc::clone(&peak));
        executor
            .run_ordered((0..12).collect::<Vec<u32>>(), move |_| {
                let running = Arc::clone(&r);
                let peak = Arc::clone(&p);
                async move {
                    let now = running.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(10)).await;
                    running.fetch_sub(1, Ordering::SeqCst);
                }
            })
            .await;

        assert!(peak.load(Ordering::SeqCst) <= 3);
        assert!(peak.load(Ordering::SeqCst) >= 1);
    }

    #[tokio::test]
    async fn test_panicking_unit_leaves_empty_slot() {
        let executor = HarvestExecutor::new(2, Duration::ZERO);

        let results = executor
            .run_ordered(vec![1, 2, 3], |n| async move {
                if n == 2 {
                    panic!("unit failure");
                }
                n
            })
            .await;

        assert_eq!(results, vec![Some(1), None, Some(3)]);
    }

    #[test]
    fn test_zero_workers_clamped() {
        let executor = HarvestExecutor::new(0, Duration::ZERO);
        assert_eq!(executor.concurrency_limit(), 1);
    }

    #[tokio::test]
    async fn test_rate_limiter_spaces_requests() {
        let limiter = RateLimiter::new(Duration::from_millis(50));
        let start = Instant::now();

        for _ in 0..4 {
            limiter.acquire().await;
        }

        // first slot is immediate, three more at 50ms spacing
        assert!(start.elapsed() >= Duration::from_millis(150));
    }
}
