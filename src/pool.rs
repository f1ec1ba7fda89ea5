//! Bounded worker pool shared by the transfer and scan workflows

use log::{debug, info};
use std::future::Future;
use std::io;
use std::sync::Arc;
use tokio::runtime::{Builder, Handle, Runtime};
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;

use crate::completion::CompletionContext;

/// Runs operations off the caller's thread with at most `limit` in flight.
/// Extra submissions wait for a permit instead of adding workers.
pub struct WorkerPool {
    name: String,
    runtime: Option<Runtime>,
    handle: Handle,
    permits: Arc<Semaphore>,
    limit: usize,
    shutdown: CancellationToken,
}

/// Cancels one submitted operation
#[derive(Debug, Clone)]
pub struct TaskHandle {
    token: CancellationToken,
}

impl TaskHandle {
    /// The operation resolves with its cancelled value if it has not already finished
    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }
}

impl WorkerPool {
    /// Start a pool with its own `workers` threads
    pub fn new(name: &str, workers: usize) -> io::Result<Self> {
        let workers = workers.max(1);
        let runtime = Builder::new_multi_thread()
            .worker_threads(workers)
            .thread_name(format!("{}-worker", name))
            .enable_all()
            .build()?;
        let handle = runtime.handle().clone();
        info!("worker_pool: {} started workers={}", name, workers);
        Ok(Self::build(name, Some(runtime), handle, workers))
    }

    /// Run on an existing runtime, still bounded to `limit` concurrent operations
    pub fn with_handle(name: &str, handle: Handle, limit: usize) -> Self {
        Self::build(name, None, handle, limit.max(1))
    }

    fn build(name: &str, runtime: Option<Runtime>, handle: Handle, limit: usize) -> Self {
        Self {
            name: name.to_string(),
            runtime,
            handle,
            permits: Arc::new(Semaphore::new(limit)),
            limit,
            shutdown: CancellationToken::new(),
        }
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Run `operation` on a worker and hand `on_done` its result through `completion`.
    /// Exactly one of the operation's output or `cancelled` reaches `on_done`, even
    /// when the pool is dropped with the task still pending.
    pub fn submit<T, Fut, Cb>(
        &self,
        completion: &Arc<dyn CompletionContext>,
        operation: Fut,
        cancelled: T,
        on_done: Cb,
    ) -> TaskHandle
    where
        T: Send + 'static,
        Fut: Future<Output = T> + Send + 'static,
        Cb: FnOnce(T) + Send + 'static,
    {
        let token = self.shutdown.child_token();
        let task_token = token.clone();
        let permits = self.permits.clone();
        let delivery = Delivery {
            pending: Some((completion.clone(), cancelled, on_done)),
        };
        let pool = self.name.clone();

        self.handle.spawn(async move {
            let output = tokio::select! {
                biased;
                _ = task_token.cancelled() => {
                    debug!("worker_pool: {} task cancelled", pool);
                    None
                }
                output = run_with_permit(permits, operation) => Some(output),
            };
            delivery.resolve(output);
        });

        TaskHandle { token }
    }

    /// Cancel queued and in-flight work; later submissions resolve as cancelled
    pub fn shutdown(&self) {
        if !self.shutdown.is_cancelled() {
            info!("worker_pool: {} shutting down", self.name);
            self.shutdown.cancel();
        }
    }

    pub fn is_shut_down(&self) -> bool {
        self.shutdown.is_cancelled()
    }
}

/// Pending callback for one task. Dropping it unresolved, as a runtime shutdown
/// does to its tasks, delivers the cancelled value.
struct Delivery<T, Cb>
where
    T: Send + 'static,
    Cb: FnOnce(T) + Send + 'static,
{
    pending: Option<(Arc<dyn CompletionContext>, T, Cb)>,
}

impl<T, Cb> Delivery<T, Cb>
where
    T: Send + 'static,
    Cb: FnOnce(T) + Send + 'static,
{
    fn resolve(mut self, output: Option<T>) {
        if let Some((completion, cancelled, on_done)) = self.pending.take() {
            let value = output.unwrap_or(cancelled);
            completion.dispatch(Box::new(move || on_done(value)));
        }
    }
}

impl<T, Cb> Drop for Delivery<T, Cb>
where
    T: Send + 'static,
    Cb: FnOnce(T) + Send + 'static,
{
    fn drop(&mut self) {
        if let Some((completion, cancelled, on_done)) = self.pending.take() {
            completion.dispatch(Box::new(move || on_done(cancelled)));
        }
    }
}

async fn run_with_permit<Fut: Future>(permits: Arc<Semaphore>, operation: Fut) -> Fut::Output {
    // The semaphore is never closed, so a permit always arrives
    let _permit = permits.acquire_owned().await.ok();
    operation.await
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.shutdown.cancel();
        if let Some(runtime) = self.runtime.take() {
            // Safe to call from inside another runtime, unlike a plain drop
            runtime.shutdown_background();
        }
    }
}

impl std::fmt::Debug for WorkerPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerPool")
            .field("name", &self.name)
            .field("limit", &self.limit)
            .field("owns_runtime", &self.runtime.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::WorkerPool;
    use crate::completion::CompletionQueue;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    #[test]
    fn concurrency_never_exceeds_limit() {
        let pool = WorkerPool::new("test", 3).unwrap();
        let queue = CompletionQueue::new();
        let context = queue.context();
        let active = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));
        let finished = Arc::new(AtomicUsize::new(0));

        for _ in 0..8 {
            let active = active.clone();
            let peak = peak.clone();
            let finished = finished.clone();
            pool.submit(
                &context,
                async move {
                    let now = active.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(30)).await;
                    active.fetch_sub(1, Ordering::SeqCst);
                },
                (),
                move |_| {
                    finished.fetch_add(1, Ordering::SeqCst);
                },
            );
        }

        for _ in 0..8 {
            assert!(queue.run_next(Duration::from_secs(5)));
        }
        assert_eq!(finished.load(Ordering::SeqCst), 8);
        assert!(peak.load(Ordering::SeqCst) <= 3);
        assert!(peak.load(Ordering::SeqCst) >= 2);
    }

    #[test]
    fn callbacks_never_run_on_worker_threads() {
        let pool = WorkerPool::new("test", 2).unwrap();
        let queue = CompletionQueue::new();
        let ran_on = Arc::new(Mutex::new(None));
        let slot = ran_on.clone();

        pool.submit(&queue.context(), async { 7 }, 0, move |value| {
            assert_eq!(value, 7);
            *slot.lock().unwrap() = Some(std::thread::current().id());
        });

        assert!(queue.run_next(Duration::from_secs(5)));
        assert_eq!(*ran_on.lock().unwrap(), Some(std::thread::current().id()));
    }

    #[test]
    fn cancelled_task_resolves_once_with_cancel_value() {
        let pool = WorkerPool::new("test", 1).unwrap();
        let queue = CompletionQueue::new();
        let results = Arc::new(Mutex::new(Vec::new()));
        let sink = results.clone();

        let handle = pool.submit(
            &queue.context(),
            async {
                tokio::time::sleep(Duration::from_secs(60)).await;
                "finished"
            },
            "cancelled",
            move |value| sink.lock().unwrap().push(value),
        );
        handle.cancel();
        assert!(handle.is_cancelled());

        assert!(queue.run_next(Duration::from_secs(5)));
        assert!(!queue.run_next(Duration::from_millis(50)));
        assert_eq!(*results.lock().unwrap(), vec!["cancelled"]);
    }

    #[test]
    fn shutdown_cancels_queued_work() {
        let pool = WorkerPool::new("test", 1).unwrap();
        let queue = CompletionQueue::new();
        let context = queue.context();
        let results = Arc::new(Mutex::new(Vec::new()));

        for _ in 0..3 {
            let sink = results.clone();
            pool.submit(
                &context,
                async {
                    tokio::time::sleep(Duration::from_secs(60)).await;
                    false
                },
                true,
                move |cancelled| sink.lock().unwrap().push(cancelled),
            );
        }
        pool.shutdown();
        assert!(pool.is_shut_down());

        for _ in 0..3 {
            assert!(queue.run_next(Duration::from_secs(5)));
        }
        assert_eq!(*results.lock().unwrap(), vec![true, true, true]);
    }

    #[test]
    fn dropping_the_pool_still_resolves_pending_tasks() {
        let pool = WorkerPool::new("test", 1).unwrap();
        let queue = CompletionQueue::new();
        let context = queue.context();
        let results = Arc::new(Mutex::new(Vec::new()));

        for _ in 0..2 {
            let sink = results.clone();
            pool.submit(
                &context,
                async {
                    tokio::time::sleep(Duration::from_secs(60)).await;
                    "finished"
                },
                "cancelled",
                move |value| sink.lock().unwrap().push(value),
            );
        }
        std::thread::sleep(Duration::from_millis(50));
        drop(pool);

        assert!(queue.run_next(Duration::from_secs(5)));
        assert!(queue.run_next(Duration::from_secs(5)));
        assert!(!queue.run_next(Duration::from_millis(50)));
        assert_eq!(*results.lock().unwrap(), vec!["cancelled", "cancelled"]);
    }
}
