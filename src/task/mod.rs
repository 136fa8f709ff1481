//! Task representation and the three-phase lifecycle.
//!
//! A [`Task`] carries three ordered callback lists: `prepare` runs
//! synchronously on the submitting thread, `execute` runs on a worker
//! thread, and `complete` runs on whichever context drains the
//! completion, with the final success flag. Completion is delivered
//! exactly once for every task that reached [`TaskState::Prepared`],
//! including tasks cancelled during pool shutdown.

mod group;

pub use group::TaskGroup;

use std::any::Any;
use std::mem;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Global task ID counter
static TASK_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Unique identifier for a task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TaskId(u64);

impl TaskId {
    fn next() -> Self {
        TaskId(TASK_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// The raw ID value.
    pub fn get(self) -> u64 {
        self.0
    }
}

/// Lifecycle state of a task.
///
/// Completion is a delivered event, not a state: a task stays in one of
/// the `Executed*` states while its complete callbacks run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    Initial,
    Prepared,
    ExecutedSuccessful,
    ExecutedFailed,
}

type PrepareFn = Box<dyn FnOnce() -> bool + Send>;
type ExecuteFn = Box<dyn FnOnce() -> bool + Send>;
type CompleteFn = Box<dyn FnOnce(bool) + Send>;

/// A schedulable unit of work.
///
/// Built with [`Task::builder`], submitted to a
/// [`ThreadPool`](crate::ThreadPool) or [`TaskQueue`](crate::TaskQueue).
/// Ownership moves through the system (submitter → queue → worker →
/// completion sink → consumer); no two threads ever run a task's
/// callbacks concurrently.
pub struct Task {
    id: TaskId,
    state: TaskState,
    priority: i32,
    tag: String,
    prepare: Vec<PrepareFn>,
    execute: Vec<ExecuteFn>,
    complete: Vec<CompleteFn>,
    group: Option<Arc<TaskGroup>>,
    keep_alive: Vec<Arc<dyn Any + Send + Sync>>,
    group_added: bool,
    completed: bool,
}

impl Task {
    /// Start building a task. The tag defaults to the call site.
    #[track_caller]
    pub fn builder() -> TaskBuilder {
        let loc = std::panic::Location::caller();
        TaskBuilder {
            task: Task {
                id: TaskId::next(),
                state: TaskState::Initial,
                priority: 0,
                tag: format!("{}:{}", loc.file(), loc.line()),
                prepare: Vec::new(),
                execute: Vec::new(),
                complete: Vec::new(),
                group: None,
                keep_alive: Vec::new(),
                group_added: false,
                completed: false,
            },
        }
    }

    /// Wrap a bare closure in a task whose only execute callback runs
    /// the closure and reports success.
    pub fn from_fn<F>(tag: impl Into<String>, f: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        Task::builder()
            .tag(tag)
            .execute(move || {
                f();
                true
            })
            .build()
    }

    pub fn id(&self) -> TaskId {
        self.id
    }

    pub fn state(&self) -> TaskState {
        self.state
    }

    pub fn priority(&self) -> i32 {
        self.priority
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// Whether the task executed (or was forced) to a successful end.
    pub fn succeeded(&self) -> bool {
        self.state == TaskState::ExecutedSuccessful
    }

    /// Whether completion callbacks have already run.
    pub fn is_completed(&self) -> bool {
        self.completed
    }

    /// Runs the prepare callbacks in submission order, on the calling
    /// thread. The first failure marks the task failed and guarantees
    /// no execute callback will ever run. On success the task's group
    /// (if any) is told one task was added.
    pub fn prepare(&mut self) -> bool {
        if self.state != TaskState::Initial {
            tracing::error!(id = self.id.get(), tag = %self.tag, state = ?self.state,
                "prepare called out of state order");
            return self.state == TaskState::Prepared;
        }
        for cb in mem::take(&mut self.prepare) {
            if !cb() {
                self.state = TaskState::ExecutedFailed;
                return false;
            }
        }
        if let Some(group) = &self.group {
            group.note_added();
            self.group_added = true;
        }
        self.state = TaskState::Prepared;
        true
    }

    /// Runs the execute callbacks in order, stopping at the first
    /// failure. Valid only from [`TaskState::Prepared`]; anything else
    /// is a caller bug and is logged and ignored.
    pub fn execute(&mut self) -> bool {
        if self.state != TaskState::Prepared {
            tracing::error!(id = self.id.get(), tag = %self.tag, state = ?self.state,
                "execute called out of state order");
            return self.state == TaskState::ExecutedSuccessful;
        }
        let mut ok = true;
        for cb in mem::take(&mut self.execute) {
            if !cb() {
                ok = false;
                break;
            }
        }
        self.state = if ok {
            TaskState::ExecutedSuccessful
        } else {
            TaskState::ExecutedFailed
        };
        ok
    }

    /// Runs every complete callback with the final success flag, then
    /// notifies the group. Runs at most once; valid only after execute
    /// ran or prepare failed.
    pub fn handle_completed(&mut self) {
        if self.completed {
            tracing::error!(id = self.id.get(), tag = %self.tag,
                "handle_completed called twice");
            return;
        }
        if matches!(self.state, TaskState::Initial | TaskState::Prepared) {
            tracing::error!(id = self.id.get(), tag = %self.tag, state = ?self.state,
                "handle_completed called before execution finished");
            return;
        }
        self.completed = true;
        let ok = self.state == TaskState::ExecutedSuccessful;
        for cb in mem::take(&mut self.complete) {
            cb(ok);
        }
        // Only tasks counted as added may count as completed, so the
        // group's completed counter never passes its added counter.
        if self.group_added {
            if let Some(group) = &self.group {
                group.note_completed();
            }
        }
    }

    /// Cancels a prepared task that will never execute: forces the
    /// failed state and delivers completion on the calling thread.
    pub fn cancel(&mut self) {
        if self.state != TaskState::Prepared {
            tracing::error!(id = self.id.get(), tag = %self.tag, state = ?self.state,
                "cancel called on a task that is not pending execution");
            return;
        }
        self.state = TaskState::ExecutedFailed;
        self.handle_completed();
    }

    /// Drives the task to completion synchronously from whatever state
    /// it is in: an unprepared task runs all three phases inline, an
    /// executed task only delivers its completion.
    pub fn run(&mut self) {
        match self.state {
            TaskState::Initial => {
                if self.prepare() {
                    self.execute();
                }
            }
            TaskState::Prepared => {
                self.execute();
            }
            TaskState::ExecutedSuccessful | TaskState::ExecutedFailed => {}
        }
        if !self.completed {
            self.handle_completed();
        }
    }

    /// Forces the failed state after an execute callback panicked, so
    /// completion can still be delivered exactly once.
    pub(crate) fn note_panicked(&mut self) {
        if !self.completed {
            self.state = TaskState::ExecutedFailed;
        }
    }
}

impl std::fmt::Debug for Task {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Task")
            .field("id", &self.id)
            .field("state", &self.state)
            .field("priority", &self.priority)
            .field("tag", &self.tag)
            .finish()
    }
}

/// Builder for [`Task`].
#[derive(Debug)]
pub struct TaskBuilder {
    task: Task,
}

impl TaskBuilder {
    /// Add a prepare callback, run synchronously at submission.
    pub fn prepare<F>(mut self, f: F) -> Self
    where
        F: FnOnce() -> bool + Send + 'static,
    {
        self.task.prepare.push(Box::new(f));
        self
    }

    /// Add an execute callback, run on a worker thread.
    pub fn execute<F>(mut self, f: F) -> Self
    where
        F: FnOnce() -> bool + Send + 'static,
    {
        self.task.execute.push(Box::new(f));
        self
    }

    /// Add a complete callback, run on the consumer context with the
    /// final success flag.
    pub fn complete<F>(mut self, f: F) -> Self
    where
        F: FnOnce(bool) + Send + 'static,
    {
        self.task.complete.push(Box::new(f));
        self
    }

    /// Scheduling priority; higher dequeues first. Defaults to 0.
    pub fn priority(mut self, priority: i32) -> Self {
        self.task.priority = priority;
        self
    }

    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.task.tag = tag.into();
        self
    }

    /// Attach the task to a group for aggregate completion counting.
    pub fn group(mut self, group: Arc<TaskGroup>) -> Self {
        self.task.group = Some(group);
        self
    }

    /// Keep an object alive for the task's whole lifetime. The object
    /// is never inspected or mutated.
    pub fn keep_alive(mut self, object: Arc<dyn Any + Send + Sync>) -> Self {
        self.task.keep_alive.push(object);
        self
    }

    pub fn build(self) -> Task {
        self.task
    }
}
