//! Read-only view over the externally maintained service registry.

use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::Serialize;

use crate::error::Result;

/// One live service instance, as published by the heartbeat agent.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RegistrationEntry {
    pub id: i64,
    pub groupname: String,
    pub namespace: String,
    pub host: String,
    pub ip: String,
    pub port: i64,
    pub pod: String,
    pub service_name: String,
    pub active: bool,
}

pub(crate) const REGISTRATION_COLUMNS: &str =
    "id, groupname, namespace, host, ip, port, pod, service_name, active";

impl RegistrationEntry {
    pub(crate) fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            groupname: row.get(1)?,
            namespace: row.get(2)?,
            host: row.get(3)?,
            ip: row.get(4)?,
            port: row.get(5)?,
            pod: row.get(6)?,
            service_name: row.get(7)?,
            active: row.get(8)?,
        })
    }
}

/// Find the registry entry whose host or ip equals `addr`.
///
/// Hosts compare case-insensitively. When several instances match, a live
/// one wins, then the oldest row. A blank address matches nothing, and
/// neither do blank registry columns.
pub fn find_by_host_or_ip(conn: &Connection, addr: &str) -> Result<Option<RegistrationEntry>> {
    let addr = addr.trim();
    if addr.is_empty() {
        return Ok(None);
    }
    let sql = format!(
        "SELECT {} FROM registration \
         WHERE (host <> '' AND host = ?1 COLLATE NOCASE) OR (ip <> '' AND ip = ?1) \
         ORDER BY active DESC, id ASC LIMIT 1",
        REGISTRATION_COLUMNS
    );
    let entry = conn
        .query_row(&sql, params![addr], RegistrationEntry::from_row)
        .optional()?;
    Ok(entry)
}

/// Every registry entry, in id order.
pub fn list_all(conn: &Connection) -> Result<Vec<RegistrationEntry>> {
    let sql = format!("SELECT {} FROM registration ORDER BY id", REGISTRATION_COLUMNS);
    let mut stmt = conn.prepare(&sql)?;
    let entries = stmt
        .query_map([], RegistrationEntry::from_row)?
        .collect::<std::result::Result<Vec<_>, rusqlite::Error>>()?;
    Ok(entries)
}

/// Number of live instances registered under `groupname`, ignoring case.
pub fn count_active_in_group(conn: &Connection, groupname: &str) -> Result<i64> {
    let count = conn.query_row(
        "SELECT COUNT(*) FROM registration WHERE active = 1 AND groupname = ?1 COLLATE NOCASE",
        params![groupname],
        |row| row.get(0),
    )?;
    Ok(count)
}
