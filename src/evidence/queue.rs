//! Hand-off between the frame loop and the persistence worker.
//!
//! The queue is bounded. When it is full the oldest pending job is dropped to
//! make room, so a stalled store costs evidence, never frame-loop latency or
//! unbounded memory.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread::JoinHandle;
use std::time::Duration;

use crossbeam_channel::{Receiver, SendTimeoutError, Sender, TryRecvError, TrySendError};

use crate::evidence::job::EvidenceJob;
use crate::evidence::store::EvidenceStore;

pub const DEFAULT_QUEUE_CAPACITY: usize = 64;

/// How long [`EvidenceQueue::stop`] waits for a free slot before evicting.
pub const STOP_GRACE: Duration = Duration::from_secs(5);

/// Messages drained by the persistence worker.
#[derive(Debug)]
pub enum WorkerMessage {
    Job(Box<EvidenceJob>),
    /// Sentinel: the worker exits after draining everything queued before it.
    Stop,
}

/// What happened to a submitted job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    Queued,
    /// Queued after evicting the oldest pending job.
    QueuedDroppingOldest,
    /// The worker is gone; the job was discarded.
    Disconnected,
}

#[derive(Clone)]
pub struct EvidenceQueue {
    tx: Sender<WorkerMessage>,
    rx: Receiver<WorkerMessage>,
    dropped: Arc<AtomicU64>,
}

impl EvidenceQueue {
    pub fn bounded(capacity: usize) -> Self {
        let (tx, rx) = crossbeam_channel::bounded(capacity.max(1));
        Self {
            tx,
            rx,
            dropped: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Enqueue a job without blocking.
    pub fn submit(&self, job: EvidenceJob) -> SubmitOutcome {
        let mut message = WorkerMessage::Job(Box::new(job));
        let mut evicted = false;

        loop {
            match self.tx.try_send(message) {
                Ok(()) => {
                    return if evicted {
                        SubmitOutcome::QueuedDroppingOldest
                    } else {
                        SubmitOutcome::Queued
                    };
                }
                Err(TrySendError::Disconnected(_)) => return SubmitOutcome::Disconnected,
                Err(TrySendError::Full(returned)) => {
                    message = returned;
                    match self.rx.try_recv() {
                        Ok(WorkerMessage::Job(old)) => {
                            self.dropped.fetch_add(1, Ordering::Relaxed);
                            evicted = true;
                            log::warn!(
                                "evidence queue full, dropped job for vehicle {} ({})",
                                old.vehicle_id,
                                old.violation_type
                            );
                        }
                        Ok(WorkerMessage::Stop) => {
                            // Shutdown already requested: put the sentinel back
                            // into the slot it freed and discard the job.
                            let _ = self.tx.try_send(WorkerMessage::Stop);
                            return SubmitOutcome::Disconnected;
                        }
                        // The worker drained it first; just retry.
                        Err(TryRecvError::Empty) => {}
                        Err(TryRecvError::Disconnected) => return SubmitOutcome::Disconnected,
                    }
                }
            }
        }
    }

    /// Ask the worker to exit once it has drained the jobs already queued.
    pub fn stop(&self) {
        self.stop_within(STOP_GRACE);
    }

    /// Like [`EvidenceQueue::stop`], waiting at most `grace` for a free slot.
    ///
    /// A queue still full after that has no live consumer, so the oldest
    /// jobs are evicted to make room for the sentinel.
    pub fn stop_within(&self, grace: Duration) {
        let mut message = match self.tx.send_timeout(WorkerMessage::Stop, grace) {
            Ok(()) => return,
            Err(SendTimeoutError::Disconnected(_)) => {
                log::debug!("evidence worker already gone");
                return;
            }
            Err(SendTimeoutError::Timeout(message)) => message,
        };

        log::warn!("evidence queue still full after {grace:?}, evicting to stop the worker");
        loop {
            match self.tx.try_send(message) {
                Ok(()) | Err(TrySendError::Disconnected(_)) => return,
                Err(TrySendError::Full(returned)) => {
                    message = returned;
                    match self.rx.try_recv() {
                        Ok(WorkerMessage::Job(old)) => {
                            self.dropped.fetch_add(1, Ordering::Relaxed);
                            log::warn!("dropped job for vehicle {} at shutdown", old.vehicle_id);
                        }
                        Ok(WorkerMessage::Stop) => {
                            let _ = self.tx.try_send(WorkerMessage::Stop);
                            return;
                        }
                        Err(TryRecvError::Empty) => {}
                        Err(TryRecvError::Disconnected) => return,
                    }
                }
            }
        }
    }

    pub fn len(&self) -> usize {
        self.tx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tx.is_empty()
    }

    /// Jobs evicted because the queue was full.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Start the background worker that persists jobs through `store`.
    pub fn spawn_worker<S>(&self, store: S) -> EvidenceWorker
    where
        S: EvidenceStore + 'static,
    {
        let rx = self.rx.clone();
        let handle = std::thread::spawn(move || run_worker(store, rx));
        EvidenceWorker { handle }
    }
}

/// Counters reported when the worker exits.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WorkerStats {
    pub persisted: u64,
    pub failed: u64,
}

pub struct EvidenceWorker {
    handle: JoinHandle<WorkerStats>,
}

impl EvidenceWorker {
    /// True once the worker thread has exited, normally or not.
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Wait for the worker to exit. Call after [`EvidenceQueue::stop`].
    pub fn join(self) -> WorkerStats {
        match self.handle.join() {
            Ok(stats) => stats,
            Err(_) => {
                log::error!("evidence worker thread panicked");
                WorkerStats::default()
            }
        }
    }
}

fn run_worker<S: EvidenceStore>(mut store: S, rx: Receiver<WorkerMessage>) -> WorkerStats {
    let mut stats = WorkerStats::default();
    log::info!("evidence worker started");

    for message in rx {
        let job = match message {
            WorkerMessage::Job(job) => job,
            WorkerMessage::Stop => break,
        };

        match store.persist(&job) {
            Ok(()) => {
                stats.persisted += 1;
                log::info!(
                    "saved {} evidence for {} (vehicle {})",
                    job.violation_type,
                    job.identifier,
                    job.vehicle_id
                );
            }
            Err(e) => {
                stats.failed += 1;
                log::error!("dropping evidence for {}: {e}", job.identifier);
            }
        }
    }

    log::info!(
        "evidence worker stopped ({} saved, {} failed)",
        stats.persisted,
        stats.failed
    );
    stats
}
