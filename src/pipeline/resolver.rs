//! Maps a request's caller and callee onto registry entries, nodes and a link.

use rusqlite::Connection;

use crate::error::{Result, TopomapError};
use crate::graph::{find_or_create_link, find_or_create_node, Link, Node, INGRESS_ID};
use crate::registry::find_by_host_or_ip;

/// Where a request sits in the graph.
///
/// Creations are reported here rather than logged, since the enclosing
/// transaction may still roll them back.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    pub link: Link,
    pub link_created: bool,
    pub created_nodes: Vec<Node>,
}

impl Resolution {
    pub fn nodes_created(&self) -> usize {
        self.created_nodes.len()
    }

    pub fn from_id(&self) -> i64 {
        self.link.from_id
    }

    pub fn from_node_id(&self) -> i64 {
        self.link.from_node_id
    }

    pub fn to_id(&self) -> i64 {
        self.link.to_id
    }
}

/// Resolve a request observed on `callee_host` and sent from `caller_addr`.
///
/// The callee must be registered: the host shipped the line itself, so a
/// missing entry means the registry is out of step. An unregistered caller is
/// ingress traffic and resolves to [`INGRESS_ID`].
pub fn resolve(conn: &Connection, callee_host: &str, caller_addr: &str) -> Result<Resolution> {
    let mut created_nodes = Vec::new();

    let callee = find_by_host_or_ip(conn, callee_host)?
        .ok_or_else(|| TopomapError::CalleeUnregistered(callee_host.to_string()))?;
    let (to_node, created) = find_or_create_node(conn, &callee.groupname)?;
    let to_id = to_node.id;
    if created {
        created_nodes.push(to_node);
    }

    let (from_node_id, from_id) = match find_by_host_or_ip(conn, caller_addr)? {
        Some(caller) => {
            let (from_node, created) = find_or_create_node(conn, &caller.groupname)?;
            let from_node_id = from_node.id;
            if created {
                created_nodes.push(from_node);
            }
            (from_node_id, caller.id)
        }
        None => {
            log::debug!("Caller {} is not registered, treating as ingress", caller_addr);
            (INGRESS_ID, INGRESS_ID)
        }
    };

    let (link, link_created) = find_or_create_link(conn, from_node_id, from_id, to_id)?;

    Ok(Resolution {
        link,
        link_created,
        created_nodes,
    })
}
