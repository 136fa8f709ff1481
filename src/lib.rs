//! taskforge: a priority worker pool with three-phase tasks.
//!
//! A bounded set of OS worker threads drains a priority-ordered queue
//! of [`Task`]s. Each task carries three ordered callback lists:
//! `prepare` runs synchronously at submission, `execute` runs on a
//! worker thread, and `complete` runs wherever completions are
//! delivered: inline on the finishing worker for a plain
//! [`ThreadPool`], or on a single consumer thread of the host's
//! choosing for a [`TaskQueue`]. Submission, execution, and completion
//! are three independently threaded phases.
//!
//! # Quick Start
//!
//! ```no_run
//! use std::time::Duration;
//! use taskforge::{Config, Status, Task, TaskQueue};
//!
//! let queue = TaskQueue::new(Config::builder().thread_count(2).build().unwrap()).unwrap();
//!
//! let task = Task::builder()
//!     .tag("thumbnail")
//!     .priority(5)
//!     .execute(|| {
//!         // heavy work, off the submitting thread
//!         true
//!     })
//!     .complete(|ok| println!("finished: {ok}"))
//!     .build();
//!
//! assert_eq!(queue.perform(task), Status::Ok);
//!
//! // Completion callbacks run here, on the draining thread.
//! let _ = queue.wait_for_all(Duration::from_secs(5));
//! ```
//!
//! # Guarantees
//!
//! - A task never executes unless its prepare phase succeeded.
//! - Every task that passed prepare receives exactly one completion
//!   delivery, whether it succeeded, failed, or was cancelled at
//!   shutdown.
//! - Dequeue order is priority-major, submission-order-minor, with one
//!   explicit exception: [`ThreadPool::perform_urgent`] places a task
//!   at the immediate queue front.
//! - A task's callbacks never run on two threads at once; ownership
//!   moves from submitter to queue to worker to completion sink.

#![warn(missing_docs, missing_debug_implementations)]

pub mod config;
pub mod error;
pub mod pool;
pub mod queue;
mod sched;
pub mod sink;
pub mod stats;
pub mod task;
pub mod util;

pub use config::{Config, ConfigBuilder};
pub use error::{Error, Result, Status};
pub use pool::ThreadPool;
pub use queue::TaskQueue;
pub use sink::CompletionSink;
pub use stats::MetricsSnapshot;
pub use task::{Task, TaskBuilder, TaskGroup, TaskId, TaskState};
