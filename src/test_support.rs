//! Store fixtures shared by unit tests.

use rusqlite::{params, Connection};

use crate::db::schema::ensure_schema;

/// In-memory store with the full schema.
pub fn memory_store() -> Connection {
    let conn = Connection::open_in_memory().unwrap();
    conn.execute_batch("PRAGMA foreign_keys = ON;").unwrap();
    ensure_schema(&conn).unwrap();
    conn
}

/// Add a registry instance and return its id.
pub fn register(conn: &Connection, groupname: &str, host: &str, ip: &str, active: bool) -> i64 {
    conn.execute(
        "INSERT INTO registration (groupname, namespace, host, ip, port, pod, service_name, active) \
         VALUES (?1, 'default', ?2, ?3, 8080, ?2, '', ?4)",
        params![groupname, host, ip, active],
    )
    .unwrap();
    conn.last_insert_rowid()
}

/// Queue a raw log line and return its id.
pub fn enqueue(conn: &Connection, host: &str, message: &str) -> i64 {
    conn.execute(
        "INSERT INTO access (host, message) VALUES (?1, ?2)",
        params![host, message],
    )
    .unwrap();
    conn.last_insert_rowid()
}

pub fn count_rows(conn: &Connection, table: &str) -> i64 {
    conn.query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |r| r.get(0))
        .unwrap()
}

/// The sample line from the reference deployment's nginx format.
pub const SAMPLE_LINE: &str = "10.0.0.5 - - [10/Oct/2023:13:55:36 +0000] \"GET /api HTTP/1.1\" 200 512 \"-\" \"-\" - rt=0.012 uct=0.001 uht=0.002 urt=0.010";
