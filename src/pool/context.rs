use crate::error::Status;
use crate::sched::PendingQueue;
use crate::sink::CompletionSink;
use crate::stats::PoolMetrics;
use crate::task::Task;
use crate::util::CancellationToken;
use parking_lot::{Condvar, Mutex};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Shared state a pool's workers operate on. The pending queue (and its
/// insertion sequence) is touched only under `queue`'s lock.
pub(crate) struct WorkerContext {
    pub(crate) queue: Mutex<PendingQueue>,
    pub(crate) available: Condvar,
    pub(crate) pending: AtomicUsize,
    pub(crate) token: CancellationToken,
    pub(crate) sink: Arc<dyn CompletionSink>,
    pub(crate) metrics: Arc<PoolMetrics>,
}

impl WorkerContext {
    pub fn new(sink: Arc<dyn CompletionSink>, metrics: Arc<PoolMetrics>) -> Self {
        Self {
            queue: Mutex::new(PendingQueue::new()),
            available: Condvar::new(),
            pending: AtomicUsize::new(0),
            token: CancellationToken::new(),
            sink,
            metrics,
        }
    }

    pub fn enqueue(&self, task: Task, urgent: bool) {
        self.pending.fetch_add(1, Ordering::SeqCst);
        {
            let mut queue = self.queue.lock();
            if urgent {
                queue.push_front(task);
            } else {
                queue.push(task);
            }
        }
        self.metrics.record_queued();
        self.available.notify_one();
    }

    /// Blocking dequeue. Returns `None` once the pool is cancelled.
    /// Queue and token are re-checked after every lock acquisition, so
    /// a task arriving between the empty check and the wait cannot be
    /// lost.
    pub fn next_task(&self) -> Option<Task> {
        let mut queue = self.queue.lock();
        loop {
            if self.token.is_cancelled() {
                return None;
            }
            if let Some(task) = queue.pop() {
                return Some(task);
            }
            self.available.wait(&mut queue);
        }
    }

    /// Hand an executed task to the completion sink, then retire it
    /// from the pending count. Forwarding first means a pending count
    /// of zero implies every completion has already reached the sink.
    pub fn deliver(&self, task: Task) {
        let tag = task.tag().to_string();
        let status = self.sink.perform_task(task);
        if status != Status::Ok {
            tracing::warn!(tag = %tag, ?status, "completion sink refused a task");
        }
        self.metrics.record_delivered();
        self.pending.fetch_sub(1, Ordering::SeqCst);
    }

    /// Cancel the token under the queue lock and wake every waiter, so
    /// a worker between its token check and its wait cannot miss the
    /// wakeup.
    pub fn shut_down(&self) {
        let queue = self.queue.lock();
        self.token.cancel();
        self.available.notify_all();
        drop(queue);
    }
}
