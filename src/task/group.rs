use std::sync::atomic::{AtomicUsize, Ordering};

type GroupNotifier = Box<dyn Fn(&TaskGroup) + Send + Sync>;

/// Aggregate fence over a batch of related tasks.
///
/// The group counts one "added" per member task that passed prepare and
/// one "completed" per member completion (success or failure), and
/// invokes the notifier on every completion. Hosts use it to detect
/// "all N submitted tasks are done".
pub struct TaskGroup {
    added: AtomicUsize,
    completed: AtomicUsize,
    notifier: Option<GroupNotifier>,
}

impl TaskGroup {
    pub fn new() -> Self {
        Self {
            added: AtomicUsize::new(0),
            completed: AtomicUsize::new(0),
            notifier: None,
        }
    }

    /// A group whose notifier runs on each member completion, on the
    /// thread that delivered the completion.
    pub fn with_notifier<F>(notifier: F) -> Self
    where
        F: Fn(&TaskGroup) + Send + Sync + 'static,
    {
        Self {
            added: AtomicUsize::new(0),
            completed: AtomicUsize::new(0),
            notifier: Some(Box::new(notifier)),
        }
    }

    pub(crate) fn note_added(&self) {
        self.added.fetch_add(1, Ordering::SeqCst);
    }

    pub(crate) fn note_completed(&self) {
        self.completed.fetch_add(1, Ordering::SeqCst);
        if let Some(notifier) = &self.notifier {
            notifier(self);
        }
    }

    pub fn added(&self) -> usize {
        self.added.load(Ordering::SeqCst)
    }

    pub fn completed(&self) -> usize {
        self.completed.load(Ordering::SeqCst)
    }

    /// True once every added member has completed.
    pub fn is_complete(&self) -> bool {
        self.completed() >= self.added()
    }
}

impl Default for TaskGroup {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for TaskGroup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskGroup")
            .field("added", &self.added())
            .field("completed", &self.completed())
            .finish()
    }
}
