//! Node liveness, recomputed from the registry on every run.

use rusqlite::Connection;
use serde::Serialize;

use crate::error::Result;
use crate::graph::{list_nodes, set_node_active, Node};
use crate::registry::count_active_in_group;

#[derive(Debug, Default, Clone, Copy, PartialEq, Serialize)]
pub struct ActivityReport {
    pub updated: usize,
    pub errors: usize,
}

/// New `active` value for a node, or `None` when it already matches.
pub fn next_state(currently_active: bool, live_instances: i64) -> Option<bool> {
    let live = live_instances > 0;
    (live != currently_active).then_some(live)
}

/// Bring every node's `active` flag in line with the registry.
///
/// Nodes whose flag already matches are not written.
pub fn reconcile_activity(conn: &mut Connection) -> Result<ActivityReport> {
    let tx = conn.transaction()?;
    let mut report = ActivityReport::default();

    for node in list_nodes(&tx)? {
        match reconcile_node(&tx, &node) {
            Ok(true) => report.updated += 1,
            Ok(false) => {}
            Err(e) => {
                report.errors += 1;
                log::error!("Error when updating state of node {}: {}", node.name, e);
            }
        }
    }

    tx.commit()?;
    log::info!(
        "Node state updating finished with {} updated and on error {}",
        report.updated,
        report.errors
    );
    Ok(report)
}

fn reconcile_node(conn: &Connection, node: &Node) -> Result<bool> {
    let live_instances = count_active_in_group(conn, &node.name)?;
    match next_state(node.active, live_instances) {
        Some(active) => {
            set_node_active(conn, node.id, active)?;
            log::info!(
                "Node {} is now {} ({} live instances)",
                node.name,
                if active { "active" } else { "inactive" },
                live_instances
            );
            Ok(true)
        }
        None => Ok(false),
    }
}
