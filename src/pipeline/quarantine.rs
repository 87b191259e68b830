//! Durable record of queue entries that could not become requests.

use rusqlite::{params, Connection};
use serde::Serialize;

use crate::error::Result;
use crate::ingest::{delete_entry, QueueEntry};

/// Component name written to `error.ident`.
pub const PROCESSOR_IDENT: &str = "processor";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorRecord {
    pub host: String,
    pub ident: String,
    pub message: String,
}

/// Write an error row carrying the raw line and retire the entry.
///
/// Runs in its own transaction. If it fails the entry stays queued and will
/// be picked up again by the next run.
pub fn quarantine(conn: &mut Connection, entry: &QueueEntry) -> Result<()> {
    let tx = conn.transaction()?;
    tx.execute(
        "INSERT INTO error (host, ident, message) VALUES (?1, ?2, ?3)",
        params![entry.host, PROCESSOR_IDENT, entry.message],
    )?;
    delete_entry(&tx, entry.id)?;
    tx.commit()?;
    Ok(())
}

pub fn list_errors(conn: &Connection) -> Result<Vec<ErrorRecord>> {
    let mut stmt = conn.prepare("SELECT host, ident, message FROM error ORDER BY id")?;
    let records = stmt
        .query_map([], |row| {
            Ok(ErrorRecord {
                host: row.get(0)?,
                ident: row.get(1)?,
                message: row.get(2)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, rusqlite::Error>>()?;
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{count_rows, enqueue, memory_store};

    #[test]
    fn test_quarantine_keeps_raw_line() {
        let mut conn = memory_store();
        let id = enqueue(&conn, "backend-0", "not a log line");
        let entry = QueueEntry {
            id,
            host: "backend-0".to_string(),
            message: "not a log line".to_string(),
        };

        quarantine(&mut conn, &entry).unwrap();

        let errors = list_errors(&conn).unwrap();
        assert_eq!(
            errors,
            vec![ErrorRecord {
                host: "backend-0".to_string(),
                ident: "processor".to_string(),
                message: "not a log line".to_string(),
            }]
        );
        assert_eq!(count_rows(&conn, "access"), 0);
    }

    #[test]
    fn test_failed_quarantine_keeps_entry_queued() {
        let mut conn = memory_store();
        let id = enqueue(&conn, "backend-0", "garbage");
        conn.execute("DROP TABLE error", []).unwrap();
        let entry = QueueEntry {
            id,
            host: "backend-0".to_string(),
            message: "garbage".to_string(),
        };

        assert!(quarantine(&mut conn, &entry).is_err());
        assert_eq!(count_rows(&conn, "access"), 1);
    }
}
