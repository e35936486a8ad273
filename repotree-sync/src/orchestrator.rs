//! Bounded-concurrency fan-out over repository operations.
//!
//! An operation only starts once it holds a permit from the admission gate, so
//! at most `limit` are ever in flight. Results arrive in completion order.

use std::future::Future;
use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use repotree_git::UpdateResult;

use crate::classify::ActualRepo;

/// Admission-gate size for the update pass.
pub const MAX_CONCURRENT_UPDATES: usize = 30;

/// A repository whose update call succeeded.
#[derive(Debug, Clone)]
pub struct RepoWithUpdateResult {
    pub repo: ActualRepo,
    pub result: UpdateResult,
}

/// Run `op` over `items` with at most `limit` operations in flight.
///
/// A panicking operation is logged and dropped from the output.
pub async fn for_each_bounded<T, R, F, Fut>(items: Vec<T>, limit: usize, op: F) -> Vec<R>
where
    T: Send + 'static,
    R: Send + 'static,
    F: Fn(T) -> Fut,
    Fut: Future<Output = R> + Send + 'static,
{
    let gate = Arc::new(Semaphore::new(limit.max(1)));
    let mut tasks = JoinSet::new();

    for item in items {
        let Ok(permit) = gate.clone().acquire_owned().await else {
            break;
        };
        let fut = op(item);
        tasks.spawn(async move {
            let _permit = permit;
            fut.await
        });
    }

    let mut results = Vec::with_capacity(tasks.len());
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok(result) => results.push(result),
            Err(err) => tracing::error!(error = %err, "repository task failed"),
        }
    }
    results
}

/// Update every repository; failures are logged and left out of the result.
pub async fn update_repos(repos: Vec<ActualRepo>) -> Vec<RepoWithUpdateResult> {
    let outcomes = for_each_bounded(repos, MAX_CONCURRENT_UPDATES, |repo| async move {
        match repo.git.update().await {
            Ok(result) => Some(RepoWithUpdateResult { repo, result }),
            Err(err) => {
                tracing::error!(repo = %repo.actual_relpath, error = %err, "update failed");
                None
            }
        }
    })
    .await;
    outcomes.into_iter().flatten().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[derive(Default)]
    struct InFlightGauge {
        in_flight: AtomicUsize,
        peak: AtomicUsize,
    }

    impl InFlightGauge {
        fn enter(&self) {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
        }

        fn leave(&self) {
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 8)]
    async fn never_more_than_limit_in_flight() {
        let gauge = Arc::new(InFlightGauge::default());
        let items: Vec<usize> = (0..120).collect();

        let results = for_each_bounded(items, MAX_CONCURRENT_UPDATES, |i| {
            let gauge = gauge.clone();
            async move {
                gauge.enter();
                tokio::time::sleep(Duration::from_millis(5 + (i % 7) as u64)).await;
                gauge.leave();
                i
            }
        })
        .await;

        assert_eq!(results.len(), 120);
        let peak = gauge.peak.load(Ordering::SeqCst);
        assert!(peak <= MAX_CONCURRENT_UPDATES, "peak {peak} exceeded the gate");
        assert!(peak > 1, "operations should overlap");
    }

    #[tokio::test]
    async fn panicking_operation_does_not_stop_siblings() {
        let results = for_each_bounded(vec![1, 2, 3, 4], 2, |i| async move {
            if i == 3 {
                panic!("boom");
            }
            i * 10
        })
        .await;

        let mut results = results;
        results.sort();
        assert_eq!(results, vec![10, 20, 40]);
    }
}
