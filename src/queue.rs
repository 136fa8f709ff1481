//! Single-consumer completion delivery on top of [`ThreadPool`].
//!
//! Hosts that must run completion callbacks on one specific thread (a
//! render or event loop) submit through a [`TaskQueue`]; workers buffer
//! finished tasks into an output context, and the consumer drains them
//! with [`update`](TaskQueue::update) or [`wait`](TaskQueue::wait) on
//! its own stack.

use crate::config::Config;
use crate::error::{Result, Status};
use crate::pool::ThreadPool;
use crate::sink::CompletionSink;
use crate::stats::MetricsSnapshot;
use crate::task::Task;
use parking_lot::{Condvar, Mutex};
use std::mem;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

type AdHocFn = Box<dyn FnOnce() + Send>;

#[derive(Default)]
struct OutputBuffer {
    tasks: Vec<Task>,
    closures: Vec<AdHocFn>,
}

impl OutputBuffer {
    fn is_empty(&self) -> bool {
        self.tasks.is_empty() && self.closures.is_empty()
    }
}

/// Buffered completions awaiting the consumer. The counter mirrors the
/// buffer length and is only written under the buffer lock.
struct OutputContext {
    buffer: Mutex<OutputBuffer>,
    ready: Condvar,
    counter: AtomicUsize,
    wakeup: Option<Arc<dyn Fn() + Send + Sync>>,
}

impl OutputContext {
    fn new(wakeup: Option<Arc<dyn Fn() + Send + Sync>>) -> Self {
        Self {
            buffer: Mutex::new(OutputBuffer::default()),
            ready: Condvar::new(),
            counter: AtomicUsize::new(0),
            wakeup,
        }
    }

    fn notify_host(&self) {
        if let Some(wakeup) = &self.wakeup {
            wakeup();
        }
    }
}

impl CompletionSink for OutputContext {
    fn perform_task(&self, task: Task) -> Status {
        {
            let mut buffer = self.buffer.lock();
            buffer.tasks.push(task);
            self.counter.fetch_add(1, Ordering::SeqCst);
            self.ready.notify_one();
        }
        self.notify_host();
        Status::Ok
    }

    fn perform_fn(&self, _tag: &str, f: AdHocFn) -> Status {
        {
            let mut buffer = self.buffer.lock();
            buffer.closures.push(f);
            self.counter.fetch_add(1, Ordering::SeqCst);
            self.ready.notify_one();
        }
        self.notify_host();
        Status::Ok
    }
}

/// A [`ThreadPool`] whose completions are drained by a single consumer.
///
/// Workers never run complete callbacks themselves: they buffer
/// finished tasks, and whichever thread calls [`update`](Self::update)
/// or [`wait`](Self::wait) runs them there, in the order workers
/// finished.
pub struct TaskQueue {
    pool: ThreadPool,
    output: Arc<OutputContext>,
}

impl TaskQueue {
    /// Build a queue from `config`. Any configured completion sink is
    /// replaced by the queue's own output buffering; `config.wakeup`
    /// is invoked after each buffered completion.
    pub fn new(mut config: Config) -> Result<Self> {
        let output = Arc::new(OutputContext::new(config.wakeup.clone()));
        config.complete = Some(Arc::clone(&output) as Arc<dyn CompletionSink>);
        let pool = ThreadPool::new(config)?;
        Ok(Self { pool, output })
    }

    pub fn pool(&self) -> &ThreadPool {
        &self.pool
    }

    /// See [`ThreadPool::perform`].
    pub fn perform(&self, task: Task) -> Status {
        self.pool.perform(task)
    }

    /// See [`ThreadPool::perform_urgent`].
    pub fn perform_urgent(&self, task: Task) -> Status {
        self.pool.perform_urgent(task)
    }

    /// See [`ThreadPool::perform_fn`].
    pub fn perform_fn<F>(&self, tag: &str, f: F) -> Status
    where
        F: FnOnce() + Send + 'static,
    {
        self.pool.perform_fn(tag, f)
    }

    /// See [`ThreadPool::perform_completed`].
    pub fn perform_completed(&self, task: Task) -> Status {
        self.pool.perform_completed(task)
    }

    /// See [`ThreadPool::perform_completed_fn`].
    pub fn perform_completed_fn<F>(&self, tag: &str, f: F) -> Status
    where
        F: FnOnce() + Send + 'static,
    {
        self.pool.perform_completed_fn(tag, f)
    }

    /// Drain every buffered completion and run it here, on the calling
    /// thread: one lock acquisition swaps the buffers out, the lock is
    /// released, and the callbacks run outside it, so a complete
    /// callback may submit again without deadlocking. Work submitted
    /// from inside a callback becomes visible to a later call, never
    /// this one.
    ///
    /// Returns the number of completions drained.
    pub fn update(&self) -> usize {
        let (tasks, closures) = {
            let mut buffer = self.output.buffer.lock();
            let drained = buffer.tasks.len() + buffer.closures.len();
            self.output.counter.fetch_sub(drained, Ordering::SeqCst);
            (mem::take(&mut buffer.tasks), mem::take(&mut buffer.closures))
        };

        let drained = tasks.len() + closures.len();
        for mut task in tasks {
            task.run();
        }
        for f in closures {
            f();
        }
        drained
    }

    /// Block until at least one completion is buffered or `timeout`
    /// elapses, then drain. Returns [`Status::Declined`] and zero on a
    /// timeout with nothing drained, [`Status::Ok`] and the drain count
    /// otherwise.
    pub fn wait(&self, timeout: Duration) -> (Status, usize) {
        let deadline = Instant::now() + timeout;
        {
            let mut buffer = self.output.buffer.lock();
            while buffer.is_empty() {
                if self.ready_wait(&mut buffer, deadline) {
                    break;
                }
            }
        }

        let drained = self.update();
        if drained == 0 {
            (Status::Declined, 0)
        } else {
            (Status::Ok, drained)
        }
    }

    fn ready_wait(
        &self,
        buffer: &mut parking_lot::MutexGuard<'_, OutputBuffer>,
        deadline: Instant,
    ) -> bool {
        self.output.ready.wait_until(buffer, deadline).timed_out()
    }

    /// Loop [`wait`](Self::wait) until every submitted task has been
    /// executed and its completion drained. `timeout` bounds each
    /// individual wait; a timeout with work still outstanding returns
    /// [`Status::Declined`].
    pub fn wait_for_all(&self, timeout: Duration) -> Status {
        while self.outstanding() {
            let (status, _) = self.wait(timeout);
            if status != Status::Ok {
                // Re-check before reporting: the last worker may have
                // retired its task between our drain and its counter
                // update.
                if !self.outstanding() {
                    break;
                }
                return status;
            }
        }
        Status::Ok
    }

    fn outstanding(&self) -> bool {
        self.pool.pending_tasks() > 0 || self.output_counter() > 0
    }

    /// Buffered completions not yet drained. Hosts poll this to decide
    /// whether to wake their own event loop.
    pub fn output_counter(&self) -> usize {
        self.output.counter.load(Ordering::SeqCst)
    }

    pub fn pending_tasks(&self) -> usize {
        self.pool.pending_tasks()
    }

    pub fn is_running(&self) -> bool {
        self.pool.is_running()
    }

    pub fn worker_count(&self) -> usize {
        self.pool.worker_count()
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.pool.metrics()
    }

    /// Cancel the pool (still-queued tasks complete with failure on
    /// this thread), then drain completions that were already buffered
    /// so none is lost. Same caller contract as
    /// [`ThreadPool::cancel`].
    pub fn cancel(&self) {
        self.pool.cancel();
        self.update();
    }
}

impl Drop for TaskQueue {
    fn drop(&mut self) {
        self.cancel();
    }
}

impl std::fmt::Debug for TaskQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskQueue")
            .field("pool", &self.pool)
            .field("output_counter", &self.output_counter())
            .finish()
    }
}
