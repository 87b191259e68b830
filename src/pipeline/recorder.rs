//! Persists resolved requests as edge traversals.

use rusqlite::{params, Connection, Row};
use serde::Serialize;

use super::resolver::{resolve, Resolution};
use crate::error::Result;
use crate::ingest::{delete_entry, AccessFact, QueueEntry};

/// One stored request row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Request {
    pub id: i64,
    pub link_id: i64,
    pub from_id: i64,
    pub to_id: i64,
    pub code: u16,
    /// Caller-reported time, RFC 3339
    pub at: String,
    pub request_time: f64,
    pub response_time: f64,
}

fn request_from_row(row: &Row<'_>) -> rusqlite::Result<Request> {
    Ok(Request {
        id: row.get(0)?,
        link_id: row.get(1)?,
        from_id: row.get(2)?,
        to_id: row.get(3)?,
        code: row.get(4)?,
        at: row.get(5)?,
        request_time: row.get(6)?,
        response_time: row.get(7)?,
    })
}

/// What a successful unit of work produced.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedRequest {
    pub request_id: i64,
    pub resolution: Resolution,
}

/// Resolve `fact`, store it and retire `entry`, all in one transaction.
///
/// On error nothing is kept: nodes or links created while resolving are
/// rolled back together with the request row, and the entry stays queued for
/// the caller to quarantine.
pub fn record(conn: &mut Connection, entry: &QueueEntry, fact: &AccessFact) -> Result<RecordedRequest> {
    let tx = conn.transaction()?;

    let resolution = resolve(&tx, &entry.host, &fact.caller_addr)?;
    tx.execute(
        "INSERT INTO request (link, from_id, to_id, code, at, request_time, response_time) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            resolution.link.id,
            resolution.from_id(),
            resolution.to_id(),
            fact.code,
            fact.at.to_rfc3339(),
            fact.request_time,
            fact.response_time,
        ],
    )?;
    let request_id = tx.last_insert_rowid();
    delete_entry(&tx, entry.id)?;

    tx.commit()?;

    for node in &resolution.created_nodes {
        log::info!("New node registered {} (#{})", node.name, node.id);
    }
    if resolution.link_created {
        let link = &resolution.link;
        log::info!(
            "New link registered from node {} (registration {}) to node {}",
            link.from_node_id,
            link.from_id,
            link.to_id
        );
    }

    Ok(RecordedRequest {
        request_id,
        resolution,
    })
}

pub fn requests_for_link(conn: &Connection, link_id: i64) -> Result<Vec<Request>> {
    let mut stmt = conn.prepare(
        "SELECT id, link, from_id, to_id, code, at, request_time, response_time \
         FROM request WHERE link = ?1 ORDER BY id",
    )?;
    let requests = stmt
        .query_map(params![link_id], request_from_row)?
        .collect::<std::result::Result<Vec<_>, rusqlite::Error>>()?;
    Ok(requests)
}
