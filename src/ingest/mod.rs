//! Log intake: the work queue and the access-log grammar.

pub mod parser;
pub mod queue;

pub use parser::{AccessFact, AccessLogParser};
pub use queue::{delete_entry, fetch_batch, QueueEntry};
