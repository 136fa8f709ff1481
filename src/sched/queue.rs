use crate::task::Task;
use std::cmp::Ordering as CmpOrdering;
use std::collections::BinaryHeap;

struct QueuedTask {
    task: Task,
    urgent: bool,
    priority: i32,
    seq: u64,
}

impl PartialEq for QueuedTask {
    fn eq(&self, other: &Self) -> bool {
        self.urgent == other.urgent && self.priority == other.priority && self.seq == other.seq
    }
}

impl Eq for QueuedTask {}

impl PartialOrd for QueuedTask {
    fn partial_cmp(&self, other: &Self) -> Option<CmpOrdering> {
        Some(self.cmp(other))
    }
}

impl Ord for QueuedTask {
    fn cmp(&self, other: &Self) -> CmpOrdering {
        // Urgent entries sort above everything, latest first (each
        // urgent push lands at the immediate queue front). Otherwise
        // higher priority first, insertion order within a priority.
        match (self.urgent, other.urgent) {
            (true, false) => CmpOrdering::Greater,
            (false, true) => CmpOrdering::Less,
            (true, true) => self.seq.cmp(&other.seq),
            (false, false) => self
                .priority
                .cmp(&other.priority)
                .then(other.seq.cmp(&self.seq)),
        }
    }
}

/// The pending-task queue shared by a pool's workers.
///
/// Not synchronized itself; the owning context guards it (and the
/// insertion sequence) with one mutex.
pub(crate) struct PendingQueue {
    heap: BinaryHeap<QueuedTask>,
    next_seq: u64,
}

impl PendingQueue {
    pub fn new() -> Self {
        Self {
            heap: BinaryHeap::new(),
            next_seq: 0,
        }
    }

    fn push_inner(&mut self, task: Task, urgent: bool) {
        let seq = self.next_seq;
        self.next_seq += 1;
        let priority = task.priority();
        self.heap.push(QueuedTask {
            task,
            urgent,
            priority,
            seq,
        });
    }

    pub fn push(&mut self, task: Task) {
        self.push_inner(task, false);
    }

    /// Place a task at the immediate front, bypassing priority order.
    pub fn push_front(&mut self, task: Task) {
        self.push_inner(task, true);
    }

    pub fn pop(&mut self) -> Option<Task> {
        self.heap.pop().map(|qt| qt.task)
    }

    /// Remove every pending task, in dequeue order. Used by shutdown to
    /// route still-queued tasks through completion.
    pub fn take_all(&mut self) -> Vec<Task> {
        let mut tasks = Vec::with_capacity(self.heap.len());
        while let Some(qt) = self.heap.pop() {
            tasks.push(qt.task);
        }
        tasks
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::Task;

    fn tagged(tag: &str, priority: i32) -> Task {
        Task::builder().tag(tag).priority(priority).build()
    }

    fn pop_tags(queue: &mut PendingQueue) -> Vec<String> {
        let mut tags = Vec::new();
        while let Some(task) = queue.pop() {
            tags.push(task.tag().to_string());
        }
        tags
    }

    #[test]
    fn test_priority_major_fifo_minor() {
        let mut queue = PendingQueue::new();
        queue.push(tagged("p5-first", 5));
        queue.push(tagged("p1", 1));
        queue.push(tagged("p5-second", 5));

        assert_eq!(pop_tags(&mut queue), vec!["p5-first", "p5-second", "p1"]);
    }

    #[test]
    fn test_front_insertion_bypasses_priority() {
        let mut queue = PendingQueue::new();
        queue.push(tagged("p5-first", 5));
        queue.push(tagged("p1", 1));
        queue.push(tagged("p5-second", 5));
        queue.push_front(tagged("urgent-p1", 1));

        assert_eq!(
            pop_tags(&mut queue),
            vec!["urgent-p1", "p5-first", "p5-second", "p1"]
        );
    }

    #[test]
    fn test_latest_front_insertion_wins() {
        let mut queue = PendingQueue::new();
        queue.push(tagged("normal", 10));
        queue.push_front(tagged("urgent-1", 0));
        queue.push_front(tagged("urgent-2", 0));

        assert_eq!(
            pop_tags(&mut queue),
            vec!["urgent-2", "urgent-1", "normal"]
        );
    }

    #[test]
    fn test_negative_priorities_sort_last() {
        let mut queue = PendingQueue::new();
        queue.push(tagged("low", -5));
        queue.push(tagged("zero", 0));
        queue.push(tagged("high", 5));

        assert_eq!(pop_tags(&mut queue), vec!["high", "zero", "low"]);
    }

    #[test]
    fn test_take_all_preserves_dequeue_order() {
        let mut queue = PendingQueue::new();
        queue.push(tagged("b", 1));
        queue.push(tagged("a", 2));
        queue.push(tagged("c", 1));
        assert_eq!(queue.len(), 3);

        let tags: Vec<_> = queue
            .take_all()
            .iter()
            .map(|t| t.tag().to_string())
            .collect();
        assert_eq!(tags, vec!["a", "b", "c"]);
        assert!(queue.is_empty());
    }
}
