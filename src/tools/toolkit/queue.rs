use std::{
    collections::VecDeque,
    sync::{Arc, Mutex, MutexGuard},
};

use chrono::{DateTime, Utc};
use tokio::sync::Notify;
use tracing::debug;
use uuid::Uuid;

/// Ticket identifying one queued toolkit run.
#[derive(Debug, Clone)]
pub struct RunTicket {
    pub run_id: Uuid,
    pub tool: &'static str,
    pub enqueued_at: DateTime<Utc>,
}

/// FIFO queue serializing toolkit runs that modify a project.
#[derive(Clone, Default)]
pub struct ToolkitJobQueue {
    inner: Arc<ToolkitJobQueueInner>,
}

#[derive(Default)]
struct ToolkitJobQueueInner {
    queue: Mutex<VecDeque<RunTicket>>,
    notify: Notify,
}

/// Holds the queue slot. Dropping it (also on cancellation) frees the slot
/// and wakes the next run.
pub struct RunGuard {
    queue: ToolkitJobQueue,
    ticket: RunTicket,
}

impl RunGuard {
    #[cfg(test)]
    fn ticket(&self) -> &RunTicket {
        &self.ticket
    }
}

impl Drop for RunGuard {
    fn drop(&mut self) {
        self.queue.remove(self.ticket.run_id);
    }
}

impl ToolkitJobQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enqueue a run and wait until it reaches the front.
    pub async fn acquire(&self, run_id: Uuid, tool: &'static str) -> RunGuard {
        let ticket = RunTicket {
            run_id,
            tool,
            enqueued_at: Utc::now(),
        };
        self.lock().push_back(ticket.clone());
        let guard = RunGuard {
            queue: self.clone(),
            ticket,
        };

        loop {
            let notified = self.inner.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            if self.is_front(run_id) {
                break;
            }
            notified.await;
        }

        debug!(
            target: "agentkit_mcp::toolkit",
            run_id = %guard.ticket.run_id,
            tool = guard.ticket.tool,
            waited_ms = (Utc::now() - guard.ticket.enqueued_at).num_milliseconds(),
            "Toolkit run reached the front of the queue"
        );
        guard
    }

    /// Number of queued runs, including the one in progress.
    #[cfg(test)]
    pub(crate) fn pending_runs(&self) -> usize {
        self.lock().len()
    }

    fn is_front(&self, run_id: Uuid) -> bool {
        matches!(self.lock().front(), Some(front) if front.run_id == run_id)
    }

    fn remove(&self, run_id: Uuid) {
        self.lock().retain(|ticket| ticket.run_id != run_id);
        self.inner.notify.notify_waiters();
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<RunTicket>> {
        self.inner
            .queue
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
