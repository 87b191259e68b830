pub mod config;
pub mod error;
pub mod db;
pub mod registry;
pub mod graph;
pub mod ingest;
pub mod outcome;
pub mod pipeline;
pub mod report;

#[cfg(test)]
pub(crate) mod test_support;

pub use config::Config;
pub use error::{TopomapError, Result};
pub use outcome::Outcome;
pub use pipeline::{Processor, RunSummary};
