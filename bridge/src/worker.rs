//! Worker lifecycle: one background thread for the life of the process.
//!
//! The worker is created lazily by the first synchronized call and memoized
//! in a `OnceLock`, so concurrent first callers share a single spawn. It runs
//! a current-thread tokio runtime and serves envelopes strictly one at a time
//! in arrival order.
//!
//! The thread is detached: its `JoinHandle` is dropped right after spawning,
//! and the process exits when `main` returns whether or not the worker is
//! idle.

use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock};
use std::thread::{self, ThreadId};

use tokio::runtime;
use tokio::sync::mpsc;

use crate::config::{self, RuntimeMode, WorkerConfig};
use crate::error::BridgeError;
use crate::executor::{self, Envelope};
use crate::module::{self, ModuleLoader};

/// Handle to the worker thread.
#[derive(Debug)]
pub struct Worker {
    queue: mpsc::UnboundedSender<Envelope>,
    thread_id: ThreadId,
    thread_name: String,
}

impl Worker {
    /// Spawn a worker serving requests against `loader`.
    pub(crate) fn spawn(config: &WorkerConfig, loader: Arc<dyn ModuleLoader>) -> io::Result<Self> {
        let runtime = runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;
        let (queue, requests) = mpsc::unbounded_channel();
        let mode = config.mode;

        let mut builder = thread::Builder::new().name(config.thread_name.clone());
        if let Some(size) = config.stack_size {
            builder = builder.stack_size(size);
        }
        let handle = builder.spawn(move || runtime.block_on(run(requests, loader, mode)))?;
        let thread_id = handle.thread().id();
        drop(handle);
        SPAWNED.fetch_add(1, Ordering::SeqCst);

        tracing::info!(
            thread = %config.thread_name,
            mode = ?config.mode,
            "worker thread started"
        );

        Ok(Self {
            queue,
            thread_id,
            thread_name: config.thread_name.clone(),
        })
    }

    /// Queue an envelope for the worker.
    pub(crate) fn post(&self, envelope: Envelope) -> Result<(), BridgeError> {
        self.queue
            .send(envelope)
            .map_err(|_| BridgeError::WorkerUnavailable)
    }

    #[must_use]
    pub fn thread_id(&self) -> ThreadId {
        self.thread_id
    }

    #[must_use]
    pub fn thread_name(&self) -> &str {
        &self.thread_name
    }
}

async fn run(
    mut requests: mpsc::UnboundedReceiver<Envelope>,
    loader: Arc<dyn ModuleLoader>,
    mode: RuntimeMode,
) {
    while let Some(envelope) = requests.recv().await {
        executor::serve(envelope, loader.as_ref(), mode).await;
    }
    tracing::debug!("worker queue closed; thread exiting");
}

static WORKER: OnceLock<Result<Worker, String>> = OnceLock::new();
static SPAWNED: AtomicUsize = AtomicUsize::new(0);

/// Number of worker threads started by this process so far.
#[must_use]
pub fn spawned_workers() -> usize {
    SPAWNED.load(Ordering::SeqCst)
}

/// The process-wide worker, spawned on first use.
///
/// A failed spawn is memoized too: every later call reports the same error
/// instead of retrying.
pub fn get_or_create_worker() -> Result<&'static Worker, BridgeError> {
    WORKER
        .get_or_init(|| {
            Worker::spawn(&config::current().worker, module::shared_loader()).map_err(|err| {
                tracing::error!(error = %err, "failed to start worker thread");
                err.to_string()
            })
        })
        .as_ref()
        .map_err(|err| BridgeError::WorkerSpawn(err.clone()))
}
