//! One-shot handshake between a blocked caller and the worker.
//!
//! [`create`] hands out a zeroed [`Signal`] plus both ends of a single-use
//! response pipe. The caller keeps the [`LocalPort`] and parks on the signal;
//! the worker gets the [`WorkerPort`], posts exactly one encoded response,
//! then flips the signal to 1 and unparks the caller.
//!
//! There is no timeout. A worker that never notifies leaves its caller parked
//! forever.

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::thread::{self, Thread};

use tokio::sync::oneshot;

const PENDING: u32 = 0;
const READY: u32 = 1;

/// A single-slot completion flag owned jointly by one caller and the worker.
#[derive(Debug)]
pub struct Signal {
    state: AtomicU32,
    /// The thread that created the signal; the only one allowed to wait.
    waiter: Thread,
}

impl Signal {
    fn new() -> Self {
        Self {
            state: AtomicU32::new(PENDING),
            waiter: thread::current(),
        }
    }

    /// Block the creating thread until the flag becomes non-zero.
    ///
    /// # Panics
    ///
    /// When called from any thread other than the one that created the
    /// signal; that thread would never be unparked.
    pub fn wait(&self) {
        assert_eq!(
            thread::current().id(),
            self.waiter.id(),
            "a signal may only be awaited by the thread that created it"
        );
        // park() may return spuriously; the flag is the source of truth.
        while self.state.load(Ordering::Acquire) == PENDING {
            thread::park();
        }
    }

    /// Set the flag to 1 and wake the waiter.
    pub fn notify(&self) {
        self.state.store(READY, Ordering::Release);
        self.waiter.unpark();
    }

    #[must_use]
    pub fn is_set(&self) -> bool {
        self.state.load(Ordering::Acquire) != PENDING
    }
}

#[derive(Debug, thiserror::Error)]
#[error("the caller side of the port is closed")]
pub struct PortClosed;

/// Caller end of the response pipe.
#[derive(Debug)]
pub struct LocalPort {
    rx: oneshot::Receiver<Vec<u8>>,
}

impl LocalPort {
    /// Take the posted message without blocking.
    ///
    /// Returns `None` when nothing was posted, either because the worker has
    /// not replied yet or because it closed its end without replying.
    pub fn receive(&mut self) -> Option<Vec<u8>> {
        self.rx.try_recv().ok()
    }
}

/// Worker end of the response pipe. Posting consumes it; dropping closes it.
#[derive(Debug)]
pub struct WorkerPort {
    tx: oneshot::Sender<Vec<u8>>,
}

impl WorkerPort {
    pub fn post(self, message: Vec<u8>) -> Result<(), PortClosed> {
        self.tx.send(message).map_err(|_| PortClosed)
    }
}

/// A fresh signal and channel pair for exactly one invocation.
#[must_use]
pub fn create() -> (Arc<Signal>, LocalPort, WorkerPort) {
    let (tx, rx) = oneshot::channel();
    (
        Arc::new(Signal::new()),
        LocalPort { rx },
        WorkerPort { tx },
    )
}
