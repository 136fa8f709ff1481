// worker thread loop
use super::context::WorkerContext;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

pub(crate) type WorkerId = usize;

// per-worker counters
pub(crate) struct WorkerState {
    pub tasks_executed: AtomicU64,
    pub tasks_panicked: AtomicU64,
}

impl WorkerState {
    fn new() -> Self {
        Self {
            tasks_executed: AtomicU64::new(0),
            tasks_panicked: AtomicU64::new(0),
        }
    }
}

pub(crate) struct Worker {
    pub id: WorkerId,
    pub ctx: Arc<WorkerContext>,
    pub state: WorkerState,
}

impl Worker {
    pub fn new(id: WorkerId, ctx: Arc<WorkerContext>) -> Self {
        Self {
            id,
            ctx,
            state: WorkerState::new(),
        }
    }

    // main loop: idle -> dequeue -> execute -> handoff -> idle
    pub fn run(self) {
        loop {
            if self.ctx.token.is_cancelled() {
                break;
            }

            let Some(mut task) = self.ctx.next_task() else {
                break;
            };

            let start = Instant::now();
            let success = match catch_unwind(AssertUnwindSafe(|| task.execute())) {
                Ok(success) => success,
                Err(_) => {
                    tracing::error!(worker = self.id, tag = task.tag(), "task execute panicked");
                    self.state.tasks_panicked.fetch_add(1, Ordering::Relaxed);
                    task.note_panicked();
                    false
                }
            };
            let duration_ns = start.elapsed().as_nanos() as u64;

            self.state.tasks_executed.fetch_add(1, Ordering::Relaxed);
            self.ctx.metrics.record_execution(duration_ns, success);
            self.ctx.deliver(task);
        }

        tracing::debug!(
            worker = self.id,
            executed = self.state.tasks_executed.load(Ordering::Relaxed),
            "worker stopped"
        );
    }
}
