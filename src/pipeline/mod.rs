//! The batch pipeline: registry sync, queue drain, liveness reconciliation.

pub mod activity;
pub mod processor;
pub mod quarantine;
pub mod recorder;
pub mod resolver;
pub mod sync;

pub use activity::{reconcile_activity, ActivityReport};
pub use processor::{Disposition, Processor, RunSummary};
pub use quarantine::{quarantine, ErrorRecord, PROCESSOR_IDENT};
pub use recorder::{record, RecordedRequest, Request};
pub use resolver::{resolve, Resolution};
pub use sync::{sync_registry, SyncReport};
