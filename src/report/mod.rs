//! Read-time aggregates over the persisted graph, for the reporting surface.

mod filter;
mod snapshot;

pub use filter::{ReportFilter, SqlFilter};
pub use snapshot::{
    build_snapshot, LinkView, MetadataEntry, NodeView, ServiceView, Status, StatusMix,
    TopologySnapshot, Traffic, TrafficFlow,
};
