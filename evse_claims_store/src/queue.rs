//! Serial work queue.
//!
//! At most one job runs at a time and jobs start in the order `add` was
//! called. While paused, `add` drops the job and returns `None`.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::Mutex;
use tracing::debug;

#[derive(Debug, Default)]
pub struct SerialQueue {
    // tokio's mutex hands out the lock in request order.
    turn: Mutex<()>,
    paused: AtomicBool,
}

impl SerialQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add<F, Fut, T>(&self, job: F) -> Option<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        if self.is_paused() {
            debug!("serial queue paused, job dropped");
            return None;
        }

        let _turn = self.turn.lock().await;

        // Paused while we were waiting for our turn.
        if self.is_paused() {
            debug!("serial queue paused, job dropped");
            return None;
        }

        Some(job().await)
    }

    pub fn pause(&self) {
        self.paused.store(true, Ordering::SeqCst);
    }

    pub fn resume(&self) {
        self.paused.store(false, Ordering::SeqCst);
    }

    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Arc;
    use std::time::Duration;

    #[tokio::test]
    async fn runs_job_and_returns_result() {
        let q = SerialQueue::new();
        assert!(!q.is_paused());
        assert_eq!(q.add(|| async { "result" }).await, Some("result"));
    }

    #[tokio::test]
    async fn paused_queue_skips_jobs_until_resumed() {
        let q = SerialQueue::new();
        let calls = AtomicUsize::new(0);

        q.pause();
        assert!(q.is_paused());
        let out = q
            .add(|| async {
                calls.fetch_add(1, Ordering::SeqCst);
            })
            .await;
        assert!(out.is_none());
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        q.resume();
        assert!(!q.is_paused());
        assert_eq!(q.add(|| async { "resumed" }).await, Some("resumed"));
    }

    #[tokio::test]
    async fn jobs_never_overlap() {
        let q = Arc::new(SerialQueue::new());
        let running = Arc::new(AtomicUsize::new(0));
        let max_seen = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let q = Arc::clone(&q);
            let running = Arc::clone(&running);
            let max_seen = Arc::clone(&max_seen);
            handles.push(tokio::spawn(async move {
                q.add(|| async {
                    let now = running.fetch_add(1, Ordering::SeqCst) + 1;
                    max_seen.fetch_max(now, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(5)).await;
                    running.fetch_sub(1, Ordering::SeqCst);
                })
                .await
            }));
        }
        for h in handles {
            assert!(h.await.unwrap().is_some());
        }

        assert_eq!(max_seen.load(Ordering::SeqCst), 1);
    }
}
