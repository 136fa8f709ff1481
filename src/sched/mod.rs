pub(crate) mod queue;

pub(crate) use queue::PendingQueue;
