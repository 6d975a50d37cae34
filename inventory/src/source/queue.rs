//! Ordering for write-through effects.
//!
//! Effects run on their own tasks, so two commands reduced back to back could
//! otherwise reach the source in either order. Each command takes a
//! [`WriteTicket`] while it is reduced; the ticket's writes only start once
//! every earlier ticket has finished or been dropped.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::watch;

#[derive(Debug, Default)]
struct Progress {
    next: u64,
    abandoned: BTreeSet<u64>,
}

impl Progress {
    fn release(&mut self, number: u64) {
        if number != self.next {
            self.abandoned.insert(number);
            return;
        }
        self.next += 1;
        while self.abandoned.remove(&self.next) {
            self.next += 1;
        }
    }
}

/// Hands out write turns in the order commands were reduced
#[derive(Debug)]
pub struct WriteQueue {
    issued: AtomicU64,
    progress: watch::Sender<Progress>,
}

impl WriteQueue {
    /// Creates an empty queue
    #[must_use]
    pub fn new() -> Self {
        let (progress, _) = watch::channel(Progress::default());
        Self {
            issued: AtomicU64::new(0),
            progress,
        }
    }

    /// Reserves the next turn
    #[must_use]
    pub fn ticket(self: &Arc<Self>) -> WriteTicket {
        WriteTicket {
            queue: Arc::clone(self),
            number: self.issued.fetch_add(1, Ordering::SeqCst),
        }
    }
}

impl Default for WriteQueue {
    fn default() -> Self {
        Self::new()
    }
}

/// A reserved turn; dropping it lets the next ticket proceed
#[derive(Debug)]
pub struct WriteTicket {
    queue: Arc<WriteQueue>,
    number: u64,
}

impl WriteTicket {
    /// Waits until every earlier ticket has been released
    pub async fn turn(&self) {
        let mut progress = self.queue.progress.subscribe();
        // The sender lives in `self.queue`, so the channel cannot close here.
        let _ = progress.wait_for(|progress| progress.next == self.number).await;
    }
}

impl Drop for WriteTicket {
    fn drop(&mut self) {
        let number = self.number;
        self.queue.progress.send_modify(|progress| progress.release(number));
    }
}
