//! Topology graph: service-group nodes and the directed links between them.
//!
//! The graph only grows. Nodes and links are created on first observation
//! and never deleted; the only mutation is a node's `active` flag.

mod store;

pub use store::{
    find_link, find_node_by_name, find_or_create_link, find_or_create_node, list_links,
    list_nodes, set_node_active,
};
pub(crate) use store::link_from_row;

use serde::Serialize;

/// Caller identity used for traffic that enters from outside the tracked topology.
pub const INGRESS_ID: i64 = 0;

/// A logical service group, named after a registry group.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Node {
    pub id: i64,
    pub name: String,
    pub active: bool,
    pub created_at: String,
}

/// "Some instance of `from_node_id`, registered as `from_id`, calls node `to_id`."
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Link {
    pub id: i64,
    /// Caller node, or [`INGRESS_ID`]
    pub from_node_id: i64,
    /// Caller registry entry, or [`INGRESS_ID`]
    pub from_id: i64,
    /// Callee node
    pub to_id: i64,
}

impl Link {
    pub fn is_ingress(&self) -> bool {
        self.from_node_id == INGRESS_ID
    }
}
