//! Schema bootstrap for a fresh store.
//!
//! `registration` and `access` belong to the agents that fill them; only a
//! fresh store bootstraps them. The processor owns everything in `core.sql`.

use rusqlite::Connection;
use crate::error::Result;

const EXTERNAL_SQL: &str = include_str!("../../sql/external.sql");
const CORE_SQL: &str = include_str!("../../sql/core.sql");

/// Create the processor's own tables, leaving existing ones untouched.
pub fn ensure_core_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(CORE_SQL)?;
    log::debug!("Core schema verified");
    Ok(())
}

/// Create every table the processor touches, including the agent-owned ones.
pub fn ensure_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(EXTERNAL_SQL)?;
    ensure_core_schema(conn)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn index_names(conn: &Connection, table: &str) -> Vec<String> {
        let mut stmt = conn
            .prepare("SELECT name FROM sqlite_master WHERE type = 'index' AND tbl_name = ?1 AND sql IS NOT NULL")
            .unwrap();
        stmt.query_map([table], |r| r.get(0))
            .unwrap()
            .collect::<std::result::Result<Vec<String>, _>>()
            .unwrap()
    }

    #[test]
    fn test_ensure_schema_is_repeatable() {
        let conn = Connection::open_in_memory().unwrap();
        ensure_schema(&conn).unwrap();
        conn.execute("INSERT INTO node (name) VALUES ('frontend')", []).unwrap();

        ensure_schema(&conn).unwrap();

        let count: i64 = conn.query_row("SELECT COUNT(*) FROM node", [], |r| r.get(0)).unwrap();
        assert_eq!(count, 1);
        assert_eq!(index_names(&conn, "registration").len(), 3);
    }

    #[test]
    fn test_core_schema_leaves_agent_tables_alone() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE registration (id INTEGER PRIMARY KEY, groupname TEXT NOT NULL, \
             host TEXT NOT NULL, ip TEXT NOT NULL, active INTEGER NOT NULL);",
        )
        .unwrap();

        ensure_core_schema(&conn).unwrap();

        assert!(index_names(&conn, "registration").is_empty());
        let access: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = 'access'",
                [],
                |r| r.get(0),
            )
            .unwrap();
        assert_eq!(access, 0);
        let node: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = 'node'",
                [],
                |r| r.get(0),
            )
            .unwrap();
        assert_eq!(node, 1);
    }

    #[test]
    fn test_node_name_unique_ignoring_case() {
        let conn = Connection::open_in_memory().unwrap();
        ensure_core_schema(&conn).unwrap();
        conn.execute("INSERT INTO node (name) VALUES ('backend')", []).unwrap();

        let duplicate = conn.execute("INSERT INTO node (name) VALUES ('BACKEND')", []);

        assert!(duplicate.is_err());
    }

    #[test]
    fn test_link_pair_is_unique() {
        let conn = Connection::open_in_memory().unwrap();
        ensure_schema(&conn).unwrap();
        conn.execute("INSERT INTO node (name) VALUES ('backend')", []).unwrap();
        conn.execute("INSERT INTO link (from_node_id, from_id, to_id) VALUES (0, 0, 1)", [])
            .unwrap();

        let duplicate =
            conn.execute("INSERT INTO link (from_node_id, from_id, to_id) VALUES (0, 0, 1)", []);

        assert!(duplicate.is_err());
    }
}
