//! The `access` work queue. The processor only reads and deletes.

use rusqlite::{params, Connection};

use crate::error::{Result, TopomapError};

#[derive(Debug, Clone, PartialEq)]
pub struct QueueEntry {
    pub id: i64,
    /// Host that shipped the line; the callee of the logged request
    pub host: String,
    pub message: String,
}

/// Oldest `limit` queued lines.
pub fn fetch_batch(conn: &Connection, limit: usize) -> Result<Vec<QueueEntry>> {
    let mut stmt = conn.prepare("SELECT id, host, message FROM access ORDER BY id LIMIT ?1")?;
    let entries = stmt
        .query_map(params![limit as i64], |row| {
            Ok(QueueEntry {
                id: row.get(0)?,
                host: row.get(1)?,
                message: row.get(2)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, rusqlite::Error>>()?;
    Ok(entries)
}

/// Retire a handled entry.
pub fn delete_entry(conn: &Connection, id: i64) -> Result<()> {
    let deleted = conn.execute("DELETE FROM access WHERE id = ?1", params![id])?;
    if deleted == 0 {
        return Err(TopomapError::QueueEntryMissing(id));
    }
    Ok(())
}
