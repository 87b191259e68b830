//! One run of the processor.

use std::fmt;
use std::time::Instant;

use rusqlite::Connection;
use serde::Serialize;

use super::activity::reconcile_activity;
use super::quarantine::quarantine;
use super::recorder::{record, RecordedRequest};
use super::sync::sync_registry;
use crate::error::Result;
use crate::ingest::{fetch_batch, AccessLogParser, QueueEntry};
use crate::outcome::Outcome;

/// Terminal state of one queue entry after a run handled it.
#[derive(Debug)]
pub enum Disposition {
    /// Stored as a request
    Recorded(RecordedRequest),
    /// Did not match the log grammar; quarantined
    Invalid,
    /// Failed while parsing, resolving or recording; quarantined
    Errored,
    /// Quarantine itself failed; still queued
    Retained,
}

#[derive(Debug, Default, Clone, PartialEq, Serialize)]
pub struct RunSummary {
    pub fetched: usize,
    pub processed: usize,
    pub invalid: usize,
    pub errored: usize,
    /// Entries left queued because quarantine failed
    pub retained: usize,
    pub nodes_created: usize,
    pub links_created: usize,
    pub transitions: usize,
    pub elapsed_secs: f64,
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} processed, {} invalid, {} on error, {} retained ({} nodes, {} links created, {} state changes) in {:.3}s",
            self.processed,
            self.invalid,
            self.errored,
            self.retained,
            self.nodes_created,
            self.links_created,
            self.transitions,
            self.elapsed_secs
        )
    }
}

/// Drives a run over one connection.
pub struct Processor {
    parser: AccessLogParser,
    batch_size: usize,
}

impl Processor {
    pub fn new(batch_size: usize) -> Self {
        Self {
            parser: AccessLogParser::new(),
            batch_size,
        }
    }

    /// Sync the registry, drain one batch, then reconcile node liveness.
    ///
    /// Each phase and each queue entry commits on its own, so a failing entry
    /// never undoes the ones before it.
    pub fn run(&self, conn: &mut Connection) -> Result<RunSummary> {
        let start = Instant::now();
        let mut summary = RunSummary::default();

        log::info!("Start node processing...");
        let sync = sync_registry(conn)?;
        summary.nodes_created += sync.created;

        log::info!("Start request processing...");
        let batch = fetch_batch(conn, self.batch_size)?;
        summary.fetched = batch.len();
        for entry in &batch {
            match self.handle_entry(conn, entry) {
                Disposition::Recorded(recorded) => {
                    summary.processed += 1;
                    summary.nodes_created += recorded.resolution.nodes_created();
                    summary.links_created += recorded.resolution.link_created as usize;
                }
                Disposition::Invalid => summary.invalid += 1,
                Disposition::Errored => summary.errored += 1,
                Disposition::Retained => summary.retained += 1,
            }
        }
        log::info!(
            "Request processing finished with {} processed, {} invalid and on error {}",
            summary.processed,
            summary.invalid,
            summary.errored
        );

        let activity = reconcile_activity(conn)?;
        summary.transitions = activity.updated;

        summary.elapsed_secs = start.elapsed().as_secs_f64();
        log::info!("Processor done: {}", summary);
        Ok(summary)
    }

    /// Parse, resolve and record one entry, quarantining it on any failure.
    pub fn handle_entry(&self, conn: &mut Connection, entry: &QueueEntry) -> Disposition {
        match self.parser.parse(&entry.message) {
            Outcome::Success(fact) => match record(conn, entry, &fact) {
                Ok(recorded) => Disposition::Recorded(recorded),
                Err(e) => {
                    log::error!(
                        "Error when processing request {} from {}: {} [{}]",
                        entry.id,
                        entry.host,
                        e,
                        entry.message
                    );
                    quarantine_as(conn, entry, Disposition::Errored)
                }
            },
            Outcome::Invalid(reason) => {
                log::info!(
                    "Invalid request {} from {}: {} [{}]",
                    entry.id,
                    entry.host,
                    reason,
                    entry.message
                );
                quarantine_as(conn, entry, Disposition::Invalid)
            }
            Outcome::Fault(e) => {
                log::error!(
                    "Error when parsing request {} from {}: {} [{}]",
                    entry.id,
                    entry.host,
                    e,
                    entry.message
                );
                quarantine_as(conn, entry, Disposition::Errored)
            }
        }
    }
}

fn quarantine_as(conn: &mut Connection, entry: &QueueEntry, disposition: Disposition) -> Disposition {
    match quarantine(conn, entry) {
        Ok(()) => disposition,
        Err(e) => {
            log::error!(
                "Uncategorized error: unable to quarantine request {} from {}, left queued: {}",
                entry.id,
                entry.host,
                e
            );
            Disposition::Retained
        }
    }
}
