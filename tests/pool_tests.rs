use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{mpsc, Arc};
use std::time::Duration;
use taskforge::{Config, Status, Task, TaskGroup, ThreadPool};

fn init_logging() {
    use tracing_subscriber::EnvFilter;
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .try_init();
}

fn single_worker_pool() -> ThreadPool {
    ThreadPool::new(Config::builder().thread_count(1).build().unwrap()).unwrap()
}

/// Submits a task that keeps the single worker busy until the returned
/// sender fires. The task has already entered execute when this
/// returns, so later submissions stay queued.
fn block_worker(pool: &ThreadPool) -> mpsc::Sender<()> {
    let (gate_tx, gate_rx) = mpsc::channel();
    let (entered_tx, entered_rx) = mpsc::channel();
    let status = pool.perform(
        Task::builder()
            .tag("gate")
            .execute(move || {
                entered_tx.send(()).unwrap();
                gate_rx.recv().ok();
                true
            })
            .build(),
    );
    assert_eq!(status, Status::Ok);
    entered_rx
        .recv_timeout(Duration::from_secs(5))
        .expect("worker never picked up the gate task");
    gate_tx
}

#[test]
fn test_execute_runs_off_submitting_thread() {
    init_logging();
    let pool = ThreadPool::new(Config::builder().thread_count(2).build().unwrap()).unwrap();

    let submitter = std::thread::current().id();
    let (tx, rx) = mpsc::channel();
    let status = pool.perform_fn("identity", move || {
        tx.send(std::thread::current().id()).unwrap();
    });
    assert_eq!(status, Status::Ok);

    let executor = rx.recv_timeout(Duration::from_secs(5)).unwrap();
    assert_ne!(submitter, executor);
}

#[test]
fn test_priority_major_fifo_minor_dequeue() {
    let pool = single_worker_pool();
    let gate = block_worker(&pool);

    let order = Arc::new(Mutex::new(Vec::new()));
    let (done_tx, done_rx) = mpsc::channel();

    let mut submit = |tag: &'static str, priority: i32, urgent: bool| {
        let order = order.clone();
        let done = done_tx.clone();
        let task = Task::builder()
            .tag(tag)
            .priority(priority)
            .execute(move || {
                order.lock().push(tag);
                done.send(()).unwrap();
                true
            })
            .build();
        let status = if urgent {
            pool.perform_urgent(task)
        } else {
            pool.perform(task)
        };
        assert_eq!(status, Status::Ok);
    };

    submit("p5-first", 5, false);
    submit("p1", 1, false);
    submit("p5-second", 5, false);
    submit("urgent-p1", 1, true);

    gate.send(()).unwrap();
    for _ in 0..4 {
        done_rx.recv_timeout(Duration::from_secs(5)).unwrap();
    }

    assert_eq!(
        *order.lock(),
        vec!["urgent-p1", "p5-first", "p5-second", "p1"]
    );
}

#[test]
fn test_prepare_failure_declines_without_queueing() {
    let pool = single_worker_pool();

    let executed = Arc::new(AtomicUsize::new(0));
    let outcome = Arc::new(Mutex::new(None));
    let e = executed.clone();
    let o = outcome.clone();

    let task = Task::builder()
        .tag("doomed")
        .prepare(|| false)
        .execute(move || {
            e.fetch_add(1, Ordering::SeqCst);
            true
        })
        .complete(move |ok| {
            *o.lock() = Some(ok);
        })
        .build();

    assert_eq!(pool.perform(task), Status::Declined);

    // The pool has no sink configured, so the failed completion ran
    // inline, before perform returned.
    assert_eq!(executed.load(Ordering::SeqCst), 0);
    assert_eq!(*outcome.lock(), Some(false));
    assert_eq!(pool.pending_tasks(), 0);
}

#[test]
fn test_cancel_completes_queued_tasks_without_executing() {
    init_logging();
    let pool = single_worker_pool();
    let gate = block_worker(&pool);

    let executed = Arc::new(AtomicUsize::new(0));
    let failed_completions = Arc::new(AtomicUsize::new(0));

    for i in 0..6 {
        let e = executed.clone();
        let f = failed_completions.clone();
        let status = pool.perform(
            Task::builder()
                .tag(format!("queued-{i}"))
                .execute(move || {
                    e.fetch_add(1, Ordering::SeqCst);
                    true
                })
                .complete(move |ok| {
                    assert!(!ok);
                    f.fetch_add(1, Ordering::SeqCst);
                })
                .build(),
        );
        assert_eq!(status, Status::Ok);
    }

    std::thread::scope(|s| {
        s.spawn(|| pool.cancel());
        // cancel marks the pool finalized before joining; release the
        // gate only once that happened so nothing else is dequeued.
        while pool.is_running() {
            std::thread::yield_now();
        }
        gate.send(()).unwrap();
    });

    assert_eq!(executed.load(Ordering::SeqCst), 0);
    assert_eq!(failed_completions.load(Ordering::SeqCst), 6);
    assert_eq!(pool.pending_tasks(), 0);
    assert_eq!(pool.metrics().tasks_cancelled, 6);
}

#[test]
fn test_submission_rejected_after_cancel() {
    let pool = single_worker_pool();
    pool.cancel();

    assert!(!pool.is_running());
    assert_eq!(pool.perform_fn("late", || {}), Status::InvalidArgument);
    assert_eq!(
        pool.perform_completed(Task::builder().build()),
        Status::InvalidArgument
    );
}

#[test]
fn test_lazy_init_spawns_exactly_once() {
    let pool = ThreadPool::new(
        Config::builder()
            .thread_count(2)
            .lazy_init(true)
            .build()
            .unwrap(),
    )
    .unwrap();

    assert_eq!(pool.worker_count(), 0);
    assert!(pool.is_running());

    assert_eq!(pool.perform_fn("first", || {}), Status::Ok);
    assert_eq!(pool.worker_count(), 2);

    assert_eq!(pool.perform_fn("second", || {}), Status::Ok);
    assert_eq!(pool.worker_count(), 2);

    pool.cancel();
    assert_eq!(pool.worker_count(), 0);

    // The lazy flag was consumed by the first spawn; no respawn.
    assert_eq!(pool.perform_fn("third", || {}), Status::InvalidArgument);
    assert_eq!(pool.worker_count(), 0);
}

#[test]
fn test_group_tracks_batch_completion() {
    let (tx, rx) = mpsc::channel();
    let group = Arc::new(TaskGroup::with_notifier(move |g| {
        if g.added() == 5 && g.is_complete() {
            let _ = tx.send(());
        }
    }));

    let pool = ThreadPool::new(Config::builder().thread_count(2).build().unwrap()).unwrap();
    for i in 0..5 {
        let status = pool.perform(
            Task::builder()
                .tag(format!("member-{i}"))
                .group(group.clone())
                .execute(|| true)
                .build(),
        );
        assert_eq!(status, Status::Ok);
    }

    rx.recv_timeout(Duration::from_secs(5))
        .expect("group never reported completion");
    assert_eq!(group.added(), 5);
    assert_eq!(group.completed(), 5);
}

#[test]
fn test_group_ignores_tasks_that_failed_prepare() {
    let pool = single_worker_pool();
    let group = Arc::new(TaskGroup::new());

    let completed = Arc::new(AtomicUsize::new(0));
    let (done_tx, done_rx) = mpsc::channel();

    for fail_prepare in [false, true, false] {
        let c = completed.clone();
        let done = done_tx.clone();
        let task = Task::builder()
            .group(group.clone())
            .prepare(move || !fail_prepare)
            .execute(|| true)
            .complete(move |_| {
                c.fetch_add(1, Ordering::SeqCst);
                let _ = done.send(());
            })
            .build();
        let expected = if fail_prepare {
            Status::Declined
        } else {
            Status::Ok
        };
        assert_eq!(pool.perform(task), expected);
    }

    for _ in 0..3 {
        done_rx.recv_timeout(Duration::from_secs(5)).unwrap();
    }

    // All three delivered a completion, but only the two that passed
    // prepare count toward the group.
    assert_eq!(completed.load(Ordering::SeqCst), 3);
    assert_eq!(group.added(), 2);
    assert_eq!(group.completed(), 2);
    assert!(group.is_complete());
}

#[test]
fn test_execute_failure_reports_failed_completion() {
    let pool = single_worker_pool();

    let outcome = Arc::new(Mutex::new(None));
    let o = outcome.clone();
    let (done_tx, done_rx) = mpsc::channel();

    let status = pool.perform(
        Task::builder()
            .execute(|| false)
            .complete(move |ok| {
                *o.lock() = Some(ok);
                done_tx.send(()).unwrap();
            })
            .build(),
    );
    assert_eq!(status, Status::Ok);

    done_rx.recv_timeout(Duration::from_secs(5)).unwrap();
    assert_eq!(*outcome.lock(), Some(false));
}

#[test]
fn test_metrics_observe_execution() {
    let pool = single_worker_pool();
    let (done_tx, done_rx) = mpsc::channel();

    for _ in 0..4 {
        let done = done_tx.clone();
        assert_eq!(
            pool.perform_fn("counted", move || {
                done.send(()).unwrap();
            }),
            Status::Ok
        );
    }
    for _ in 0..4 {
        done_rx.recv_timeout(Duration::from_secs(5)).unwrap();
    }
    pool.cancel();

    let snapshot = pool.metrics();
    assert_eq!(snapshot.tasks_queued, 4);
    assert_eq!(snapshot.tasks_executed, 4);
    assert_eq!(snapshot.tasks_failed, 0);
    assert_eq!(snapshot.completions_delivered, 4);
}
