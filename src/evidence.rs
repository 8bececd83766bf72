//! Evidence capture and the hand-off to asynchronous persistence.

mod frame;
mod job;
mod queue;
mod store;

pub use frame::{Frame, FrameRing};
pub use job::EvidenceJob;
pub use queue::{
    DEFAULT_QUEUE_CAPACITY, EvidenceQueue, EvidenceWorker, STOP_GRACE, SubmitOutcome,
    WorkerMessage, WorkerStats,
};
pub use store::{EvidenceStore, FileEvidenceStore};
