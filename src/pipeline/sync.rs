//! Registry sync: every registry group gets a node before requests are drained.

use std::collections::HashSet;

use rusqlite::Connection;
use serde::Serialize;

use crate::error::Result;
use crate::graph::find_or_create_node;
use crate::registry::list_all;

#[derive(Debug, Default, Clone, Copy, PartialEq, Serialize)]
pub struct SyncReport {
    pub created: usize,
    pub errors: usize,
}

/// Create an inactive node for each registry group that has none yet.
///
/// A failing group is logged and skipped; the rest of the scan still commits.
pub fn sync_registry(conn: &mut Connection) -> Result<SyncReport> {
    let tx = conn.transaction()?;
    let mut report = SyncReport::default();
    let mut seen = HashSet::new();
    let mut created = Vec::new();

    for entry in list_all(&tx)? {
        if entry.groupname.trim().is_empty() {
            log::warn!("Registration {} has no group name, skipping", entry.id);
            continue;
        }
        if !seen.insert(entry.groupname.to_lowercase()) {
            continue;
        }
        match find_or_create_node(&tx, &entry.groupname) {
            Ok((node, true)) => created.push(node),
            Ok(_) => {}
            Err(e) => {
                report.errors += 1;
                log::error!("Error when syncing group {} (registration {}): {}", entry.groupname, entry.id, e);
            }
        }
    }

    tx.commit()?;
    report.created = created.len();
    for node in &created {
        log::info!("New node registered {} (#{})", node.name, node.id);
    }
    log::info!(
        "Node processing finished with {} created and on error {}",
        report.created,
        report.errors
    );
    Ok(report)
}
