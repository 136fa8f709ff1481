use std::sync::atomic::{AtomicBool, Ordering};

/// Cooperative cancellation flag shared between a pool and its workers.
///
/// Workers check the token once per loop iteration, between tasks; a
/// task that has already started executing always runs to completion.
#[derive(Debug, Default)]
pub struct CancellationToken {
    flag: AtomicBool,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self {
            flag: AtomicBool::new(false),
        }
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }
}
