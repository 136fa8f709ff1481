use super::context::WorkerContext;
use super::worker::{Worker, WorkerId};
use crate::config::Config;
use crate::error::{Error, Result, Status};
use crate::sink::{CompletionSink, InlineSink};
use crate::stats::{MetricsSnapshot, PoolMetrics};
use crate::task::Task;
use crate::util::thread_name::set_current_thread_name;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

struct WorkerHandle {
    id: WorkerId,
    thread: Option<JoinHandle<()>>,
}

#[derive(Default)]
struct WorkerSet {
    handles: Vec<WorkerHandle>,
    spawned: bool,
    spawn_failed: bool,
}

/// A bounded set of worker threads draining a priority-ordered queue of
/// [`Task`]s.
///
/// Submission (`perform*`), execution (worker threads), and completion
/// delivery (the configured [`CompletionSink`]) are three independently
/// threaded phases. Without a sink, completions run inline on the
/// thread that finished the task; [`TaskQueue`](crate::TaskQueue)
/// layers single-consumer delivery on top.
///
/// # Shutdown
///
/// [`cancel`](ThreadPool::cancel) joins every worker before returning,
/// so no task executes after it returns. This also means it must not
/// be called from inside a task's own execute or complete callback (the
/// worker would be joining itself).
pub struct ThreadPool {
    ctx: Arc<WorkerContext>,
    workers: Mutex<WorkerSet>,
    finalized: AtomicBool,
    thread_count: usize,
    name: String,
    stack_size: Option<usize>,
}

impl ThreadPool {
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;

        let metrics = Arc::new(PoolMetrics::new());
        let sink: Arc<dyn CompletionSink> = match &config.complete {
            Some(sink) => Arc::clone(sink),
            None => Arc::new(InlineSink),
        };

        let pool = Self {
            ctx: Arc::new(WorkerContext::new(sink, metrics)),
            workers: Mutex::new(WorkerSet::default()),
            finalized: AtomicBool::new(false),
            thread_count: config.worker_threads(),
            name: config.name.clone(),
            stack_size: config.stack_size,
        };

        if !config.lazy_init {
            let mut set = pool.workers.lock();
            set.spawned = true;
            let outcome = pool.spawn_into(&mut set);
            drop(set);
            outcome?;
        }

        Ok(pool)
    }

    fn spawn_into(&self, set: &mut WorkerSet) -> Result<()> {
        for id in 0..self.thread_count {
            let ctx = Arc::clone(&self.ctx);
            let name = format!("{}-{}", self.name, id);

            let mut builder = thread::Builder::new().name(name.clone());
            if let Some(stack_size) = self.stack_size {
                builder = builder.stack_size(stack_size);
            }

            let thread = builder
                .spawn(move || {
                    set_current_thread_name(&name);
                    Worker::new(id, ctx).run();
                })
                .map_err(|e| Error::spawn(format!("worker {}: {}", id, e)))?;

            set.handles.push(WorkerHandle {
                id,
                thread: Some(thread),
            });
        }
        tracing::debug!(pool = %self.name, workers = self.thread_count, "workers spawned");
        Ok(())
    }

    /// Spawns workers on the first submission of a lazy pool. The lazy
    /// state is consumed by the first attempt: a later `cancel` is
    /// never followed by an implicit respawn, and a spawn failure
    /// permanently marks the pool as unable to accept work.
    fn ensure_workers(&self) -> bool {
        let mut set = self.workers.lock();
        if !set.spawned {
            set.spawned = true;
            if let Err(e) = self.spawn_into(&mut set) {
                tracing::warn!(pool = %self.name, error = %e, "lazy worker spawn failed");
                set.spawn_failed = true;
            }
        }
        !set.spawn_failed
    }

    /// Submit a task. Its prepare callbacks run synchronously, here, on
    /// the calling thread; on success the task is queued by priority
    /// and one idle worker is signalled.
    pub fn perform(&self, task: Task) -> Status {
        self.submit(task, false)
    }

    /// Submit a task at the immediate front of the queue, bypassing
    /// priority ordering entirely. The latest urgent submission is
    /// always dequeued next.
    pub fn perform_urgent(&self, task: Task) -> Status {
        self.submit(task, true)
    }

    fn submit(&self, mut task: Task, urgent: bool) -> Status {
        if self.finalized.load(Ordering::Acquire) || !self.ensure_workers() {
            tracing::warn!(tag = task.tag(), "submission rejected: pool not accepting work");
            return Status::InvalidArgument;
        }

        if !task.prepare() {
            // Never queued: completion is delivered straight to the
            // sink, and the pending count is untouched.
            tracing::debug!(tag = task.tag(), "prepare failed, task declined");
            let status = self.ctx.sink.perform_task(task);
            if status != Status::Ok {
                tracing::warn!(?status, "completion sink refused a declined task");
            }
            return Status::Declined;
        }

        self.ctx.enqueue(task, urgent);
        Status::Ok
    }

    /// Wrap a bare closure in a task and submit it.
    pub fn perform_fn<F>(&self, tag: &str, f: F) -> Status
    where
        F: FnOnce() + Send + 'static,
    {
        self.perform(Task::from_fn(tag, f))
    }

    /// Hand a task straight to the completion sink, bypassing the
    /// queue. Used when the outcome is already known and only the
    /// completion-side delivery semantics are wanted.
    pub fn perform_completed(&self, task: Task) -> Status {
        if self.finalized.load(Ordering::Acquire) {
            return Status::InvalidArgument;
        }
        self.ctx.sink.perform_task(task)
    }

    /// Hand a bare closure straight to the completion sink.
    pub fn perform_completed_fn<F>(&self, tag: &str, f: F) -> Status
    where
        F: FnOnce() + Send + 'static,
    {
        if self.finalized.load(Ordering::Acquire) {
            return Status::InvalidArgument;
        }
        self.ctx.sink.perform_fn(tag, Box::new(f))
    }

    /// Finalize the pool: stop and join every worker, then route every
    /// still-queued task through completion with `success = false`.
    /// Idempotent. Runs automatically on drop.
    ///
    /// Joining is synchronous, so by the time this returns no task is
    /// executing. Must not be called from inside a task callback.
    pub fn cancel(&self) {
        if self.finalized.swap(true, Ordering::AcqRel) {
            return;
        }

        self.ctx.shut_down();

        // Joining happens outside the worker-set lock so introspection
        // stays responsive while workers wind down.
        let handles = std::mem::take(&mut self.workers.lock().handles);
        for mut handle in handles {
            if let Some(thread) = handle.thread.take() {
                if thread.join().is_err() {
                    tracing::error!(worker = handle.id, "worker thread panicked");
                }
            }
        }

        let drained = self.ctx.queue.lock().take_all();
        let cancelled = drained.len();
        for mut task in drained {
            self.ctx.metrics.record_cancelled();
            task.cancel();
            self.ctx.pending.fetch_sub(1, Ordering::SeqCst);
        }
        tracing::debug!(pool = %self.name, cancelled, "pool cancelled");
    }

    pub fn is_running(&self) -> bool {
        if self.finalized.load(Ordering::Acquire) {
            return false;
        }
        let set = self.workers.lock();
        !set.spawned || !set.handles.is_empty()
    }

    /// Tasks queued or executing, plus completions not yet handed to
    /// the sink.
    pub fn pending_tasks(&self) -> usize {
        self.ctx.pending.load(Ordering::SeqCst)
    }

    pub fn worker_count(&self) -> usize {
        self.workers.lock().handles.len()
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.ctx.metrics.snapshot()
    }
}

impl Drop for ThreadPool {
    fn drop(&mut self) {
        self.cancel();
    }
}

impl std::fmt::Debug for ThreadPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ThreadPool")
            .field("name", &self.name)
            .field("thread_count", &self.thread_count)
            .field("finalized", &self.finalized.load(Ordering::Acquire))
            .field("pending", &self.pending_tasks())
            .finish()
    }
}
