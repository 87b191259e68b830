//! Persistence for nodes and links.

use rusqlite::{params, Connection, OptionalExtension, Row};

use super::{Link, Node};
use crate::error::Result;

fn node_from_row(row: &Row<'_>) -> rusqlite::Result<Node> {
    Ok(Node {
        id: row.get(0)?,
        name: row.get(1)?,
        active: row.get(2)?,
        created_at: row.get(3)?,
    })
}

pub(crate) fn link_from_row(row: &Row<'_>) -> rusqlite::Result<Link> {
    Ok(Link {
        id: row.get(0)?,
        from_node_id: row.get(1)?,
        from_id: row.get(2)?,
        to_id: row.get(3)?,
    })
}

pub fn find_node_by_name(conn: &Connection, name: &str) -> Result<Option<Node>> {
    let node = conn
        .query_row(
            "SELECT id, name, active, created_at FROM node WHERE name = ?1",
            params![name],
            node_from_row,
        )
        .optional()?;
    Ok(node)
}

/// Return the node named `name`, creating it inactive if it does not exist.
///
/// Names compare case-insensitively. The boolean is true when this call
/// inserted the row.
pub fn find_or_create_node(conn: &Connection, name: &str) -> Result<(Node, bool)> {
    let inserted = conn.execute(
        "INSERT INTO node (name, active) VALUES (?1, 0) ON CONFLICT(name) DO NOTHING",
        params![name],
    )?;
    let node = conn.query_row(
        "SELECT id, name, active, created_at FROM node WHERE name = ?1",
        params![name],
        node_from_row,
    )?;
    Ok((node, inserted > 0))
}

pub fn list_nodes(conn: &Connection) -> Result<Vec<Node>> {
    let mut stmt = conn.prepare("SELECT id, name, active, created_at FROM node ORDER BY id")?;
    let nodes = stmt
        .query_map([], node_from_row)?
        .collect::<std::result::Result<Vec<_>, rusqlite::Error>>()?;
    Ok(nodes)
}

/// Persist a node's liveness flag. Returns false if the node does not exist.
pub fn set_node_active(conn: &Connection, node_id: i64, active: bool) -> Result<bool> {
    let updated = conn.execute(
        "UPDATE node SET active = ?1 WHERE id = ?2",
        params![active, node_id],
    )?;
    Ok(updated > 0)
}

pub fn find_link(conn: &Connection, from_id: i64, to_id: i64) -> Result<Option<Link>> {
    let link = conn
        .query_row(
            "SELECT id, from_node_id, from_id, to_id FROM link WHERE from_id = ?1 AND to_id = ?2",
            params![from_id, to_id],
            link_from_row,
        )
        .optional()?;
    Ok(link)
}

/// Return the link for `(from_id, to_id)`, creating it on first observation.
///
/// An existing link keeps the `from_node_id` it was created with.
pub fn find_or_create_link(
    conn: &Connection,
    from_node_id: i64,
    from_id: i64,
    to_id: i64,
) -> Result<(Link, bool)> {
    if let Some(link) = find_link(conn, from_id, to_id)? {
        return Ok((link, false));
    }

    let inserted = conn.execute(
        "INSERT INTO link (from_node_id, from_id, to_id) VALUES (?1, ?2, ?3) \
         ON CONFLICT(from_id, to_id) DO NOTHING",
        params![from_node_id, from_id, to_id],
    )?;
    let link = conn.query_row(
        "SELECT id, from_node_id, from_id, to_id FROM link WHERE from_id = ?1 AND to_id = ?2",
        params![from_id, to_id],
        link_from_row,
    )?;
    Ok((link, inserted > 0))
}

pub fn list_links(conn: &Connection) -> Result<Vec<Link>> {
    let mut stmt = conn.prepare("SELECT id, from_node_id, from_id, to_id FROM link ORDER BY id")?;
    let links = stmt
        .query_map([], link_from_row)?
        .collect::<std::result::Result<Vec<_>, rusqlite::Error>>()?;
    Ok(links)
}
