//! Ingestion orchestration: the reconciliation engine, the serialized job
//! queue and the corpus recovery scanner.

pub mod queue;
pub mod reconcile;
pub mod recovery;

pub use queue::{IngestionJob, IngestionQueue, JobStatus, QueueConfig};
pub use reconcile::{
    BatchSummary, MatchStrategy, ReconcileOutcome, Reconciler, RecordDraft, DEFAULT_STRATEGIES,
};
pub use recovery::RecoveryScanner;
