//! Render Task Pool
//!
//! A FIFO queue of deferred render work. Each task gets a [`TaskId`] from a
//! monotonically increasing counter, so ids never collide and drain order is
//! submission order. There is no way to remove a task once queued.

use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;

/// A unit of deferred re-render work.
pub type RenderTask = Box<dyn FnOnce() + Send + 'static>;

/// Position of a task in submission order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId(u64);

impl TaskId {
    /// Get the raw ID value.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "task#{}", self.0)
    }
}

/// FIFO task queue.
#[derive(Default)]
pub struct Pool {
    next: u64,
    tasks: VecDeque<(TaskId, RenderTask)>,
}

impl Pool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a task.
    pub fn enqueue<F>(&mut self, task: F) -> TaskId
    where
        F: FnOnce() + Send + 'static,
    {
        self.enqueue_boxed(Box::new(task))
    }

    pub fn enqueue_boxed(&mut self, task: RenderTask) -> TaskId {
        let id = TaskId(self.next);
        self.next += 1;
        self.tasks.push_back((id, task));
        id
    }

    /// Remove the oldest task.
    pub fn pop(&mut self) -> Option<(TaskId, RenderTask)> {
        self.tasks.pop_front()
    }

    /// The id the next enqueued task will receive.
    pub fn next_id(&self) -> TaskId {
        TaskId(self.next)
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}

impl fmt::Debug for Pool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pool")
            .field("next", &self.next)
            .field("pending", &self.tasks.len())
            .finish()
    }
}

/// Shared handle to a [`Pool`].
///
/// Elements hold a clone to enqueue renders; the frame scheduler holds one to
/// drain them. The lock is never held while a task runs.
#[derive(Clone, Default)]
pub struct RenderPool {
    inner: Arc<Mutex<Pool>>,
}

impl RenderPool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enqueue<F>(&self, task: F) -> TaskId
    where
        F: FnOnce() + Send + 'static,
    {
        let id = self.inner.lock().enqueue(task);
        tracing::trace!(task = %id, "render task queued");
        id
    }

    pub fn pop(&self) -> Option<(TaskId, RenderTask)> {
        self.inner.lock().pop()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }
}

impl fmt::Debug for RenderPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("RenderPool").field(&*self.inner.lock()).finish()
    }
}
