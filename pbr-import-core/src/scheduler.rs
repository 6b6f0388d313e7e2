//! Deferred task queue drained on the host's idle tick.
//!
//! Import callbacks must not touch the asset database, so they only [`DeferredScheduler::enqueue`]
//! work. The host calls [`DeferredScheduler::tick`] on every idle cycle; nothing runs while the
//! host reports itself busy.

use crate::host::HostStatus;
use crate::Result;
use std::collections::VecDeque;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Mutex, MutexGuard, PoisonError};

type TaskFn<C> = Box<dyn FnOnce(&mut C) -> Result<()> + Send>;

/// A queued unit of work
pub struct DeferredTask<C> {
    /// Asset path or other label used in logs
    pub label: String,
    /// Enqueue order
    pub sequence: u64,
    run: TaskFn<C>,
}

impl<C> std::fmt::Debug for DeferredTask<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeferredTask")
            .field("label", &self.label)
            .field("sequence", &self.sequence)
            .finish()
    }
}

/// Result of one [`DeferredScheduler::tick`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    pub executed: usize,
    pub failed: usize,
    /// The host was busy and nothing ran
    pub deferred_busy: bool,
}

struct Queue<C> {
    tasks: VecDeque<DeferredTask<C>>,
    next_sequence: u64,
}

/// FIFO queue of deferred tasks over a context `C`.
///
/// Enqueue may be called from any thread; draining happens from whoever owns the tick.
pub struct DeferredScheduler<C> {
    queue: Mutex<Queue<C>>,
}

impl<C> Default for DeferredScheduler<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C> DeferredScheduler<C> {
    pub fn new() -> Self {
        Self {
            queue: Mutex::new(Queue {
                tasks: VecDeque::new(),
                next_sequence: 0,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Queue<C>> {
        self.queue.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Appends a task. Never runs it and never touches host state.
    pub fn enqueue<F>(&self, label: impl Into<String>, task: F) -> u64
    where
        F: FnOnce(&mut C) -> Result<()> + Send + 'static,
    {
        let mut q = self.lock();
        let sequence = q.next_sequence;
        q.next_sequence += 1;
        let label = label.into();
        tracing::debug!(%label, sequence, "task deferred");
        q.tasks.push_back(DeferredTask {
            label,
            sequence,
            run: Box::new(task),
        });
        sequence
    }

    pub fn pending(&self) -> usize {
        self.lock().tasks.len()
    }

    /// True when a drain is due on the next idle tick.
    pub fn has_pending(&self) -> bool {
        self.pending() > 0
    }

    /// Labels of queued tasks in execution order.
    pub fn pending_labels(&self) -> Vec<String> {
        self.lock().tasks.iter().map(|t| t.label.clone()).collect()
    }
}

impl<C: HostStatus> DeferredScheduler<C> {
    /// Drains every task queued before this call, in enqueue order.
    ///
    /// A busy host defers the whole drain. Failing or panicking tasks are logged and dropped;
    /// they do not stop the rest of the drain. Tasks enqueued while draining run on a later tick.
    pub fn tick(&self, ctx: &mut C) -> TickReport {
        if ctx.is_busy() {
            return TickReport {
                deferred_busy: true,
                ..Default::default()
            };
        }

        let batch = std::mem::take(&mut self.lock().tasks);
        let mut report = TickReport::default();

        for task in batch {
            let DeferredTask {
                label,
                sequence,
                run,
            } = task;
            report.executed += 1;
            match catch_unwind(AssertUnwindSafe(|| run(ctx))) {
                Ok(Ok(())) => {
                    tracing::debug!(%label, sequence, "task finished");
                }
                Ok(Err(e)) => {
                    report.failed += 1;
                    tracing::error!(%label, sequence, error = %e, "deferred task failed");
                }
                Err(_) => {
                    report.failed += 1;
                    tracing::error!(%label, sequence, "deferred task panicked");
                }
            }
        }

        report
    }
}
