//! The outward-facing completion interface.

use crate::error::Status;
use crate::task::Task;

/// Receives finished units of work from the engine.
///
/// This is the only interface the engine calls outward on: workers hand
/// executed tasks here, prepare failures are routed here directly, and
/// [`perform_completed`](crate::ThreadPool::perform_completed) bypasses
/// the queue straight into it. The default method bodies refuse with
/// [`Status::NotImplemented`] so a host that forgot to override them is
/// observable rather than silently losing completions.
pub trait CompletionSink: Send + Sync {
    /// Deliver a task whose outcome is decided (or that the host wants
    /// run inline on the consumer context).
    fn perform_task(&self, task: Task) -> Status {
        tracing::warn!(tag = task.tag(), "completion sink does not accept tasks");
        Status::NotImplemented
    }

    /// Deliver an ad-hoc closure to run on the consumer context.
    fn perform_fn(&self, tag: &str, f: Box<dyn FnOnce() + Send>) -> Status {
        let _ = f;
        tracing::warn!(tag, "completion sink does not accept closures");
        Status::NotImplemented
    }
}

/// Fallback sink for pools configured without one: runs the completion
/// path on the delivering thread, keeping the exactly-once completion
/// guarantee.
pub(crate) struct InlineSink;

impl CompletionSink for InlineSink {
    fn perform_task(&self, mut task: Task) -> Status {
        task.run();
        Status::Ok
    }

    fn perform_fn(&self, _tag: &str, f: Box<dyn FnOnce() + Send>) -> Status {
        f();
        Status::Ok
    }
}
