//! Topology snapshot: nodes with their live services, traffic and status mix.

use rusqlite::Connection;
use serde::Serialize;

use super::filter::{ReportFilter, SqlFilter};
use crate::error::Result;
use crate::graph::{link_from_row, list_nodes, Node, INGRESS_ID};
use crate::registry::{RegistrationEntry, REGISTRATION_COLUMNS};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TopologySnapshot {
    pub ingress: bool,
    pub nodes: Vec<NodeView>,
    pub links: Vec<LinkView>,
    pub from: Option<String>,
    pub to: Option<String>,
    pub namespace: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodeView {
    pub id: i64,
    pub name: String,
    pub disabled: bool,
    pub services: Vec<ServiceView>,
    pub metadata: Vec<MetadataEntry>,
    pub traffic: Traffic,
    pub status: Status,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ServiceView {
    pub name: String,
    pub id: i64,
    pub host: String,
    pub pod: String,
    pub ip: String,
    pub port: i64,
    pub namespace: String,
}

impl From<RegistrationEntry> for ServiceView {
    fn from(entry: RegistrationEntry) -> Self {
        let name = if entry.service_name.is_empty() {
            entry.pod.clone()
        } else {
            entry.service_name
        };
        Self {
            name,
            id: entry.id,
            host: entry.host,
            pod: entry.pod,
            ip: entry.ip,
            port: entry.port,
            namespace: entry.namespace,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetadataEntry {
    pub name: String,
    pub value: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Traffic {
    #[serde(rename = "in")]
    pub inbound: TrafficFlow,
    #[serde(rename = "out")]
    pub outbound: TrafficFlow,
}

/// Average time in seconds plus success and error shares in percent.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TrafficFlow {
    pub time: f64,
    pub success: i64,
    pub error: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Status {
    #[serde(rename = "in")]
    pub inbound: StatusMix,
    #[serde(rename = "out")]
    pub outbound: StatusMix,
}

/// Share of each status class, in percent.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StatusMix {
    #[serde(rename = "2xx")]
    pub success: i64,
    #[serde(rename = "3xx")]
    pub redirect: i64,
    #[serde(rename = "4xx")]
    pub client_error: i64,
    #[serde(rename = "5xx")]
    pub server_error: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LinkView {
    pub from: String,
    pub to: String,
}

#[derive(Debug, Default)]
struct CodeCounts {
    total: i64,
    c2xx: i64,
    c3xx: i64,
    c4xx: i64,
    c5xx: i64,
}

/// Build the snapshot served to the topology view.
///
/// Nodes without a live service (in the requested namespace) are left out,
/// and so are links whose endpoints are not shown.
pub fn build_snapshot(conn: &Connection, filter: &ReportFilter) -> Result<TopologySnapshot> {
    let mut snapshot = TopologySnapshot {
        ingress: false,
        nodes: Vec::new(),
        links: Vec::new(),
        from: filter.from.clone(),
        to: filter.to.clone(),
        namespace: filter.namespace.clone(),
    };

    let mut service_ids = vec![INGRESS_ID];
    for node in list_nodes(conn)? {
        let services = live_services(conn, &node, filter)?;
        if services.is_empty() {
            continue;
        }
        let ids: Vec<i64> = services.iter().map(|s| s.id).collect();
        service_ids.extend_from_slice(&ids);

        let traffic = traffic(conn, &node, &ids, filter)?;
        let status = status(conn, &node, &ids, filter)?;
        snapshot.nodes.push(NodeView {
            id: node.id,
            name: node.name.clone(),
            disabled: !node.active,
            metadata: metadata(&node),
            services,
            traffic,
            status,
        });
    }

    if snapshot.nodes.is_empty() {
        return Ok(snapshot);
    }

    let mut link_filter = SqlFilter::new();
    link_filter
        .push_in("from_id", service_ids)
        .push_in("to_id", snapshot.nodes.iter().map(|n| n.id).collect::<Vec<_>>());
    let sql = format!(
        "SELECT id, from_node_id, from_id, to_id FROM link{} ORDER BY id",
        link_filter.where_clause()
    );
    let mut stmt = conn.prepare(&sql)?;
    let links = stmt
        .query_map(link_filter.params(), link_from_row)?
        .collect::<std::result::Result<Vec<_>, rusqlite::Error>>()?;

    for link in links {
        let from = if link.is_ingress() {
            snapshot.ingress = true;
            "ingress".to_string()
        } else {
            format!("{}#{}", link.from_node_id, link.from_id)
        };
        snapshot.links.push(LinkView {
            from,
            to: link.to_id.to_string(),
        });
    }

    Ok(snapshot)
}

fn live_services(conn: &Connection, node: &Node, filter: &ReportFilter) -> Result<Vec<ServiceView>> {
    let mut predicates = SqlFilter::new();
    predicates
        .push_eq_nocase("groupname", node.name.clone())
        .push_eq("active", true);
    if let Some(namespace) = &filter.namespace {
        predicates.push_eq("namespace", namespace.clone());
    }
    let sql = format!(
        "SELECT {} FROM registration{} ORDER BY id",
        REGISTRATION_COLUMNS,
        predicates.where_clause()
    );
    let mut stmt = conn.prepare(&sql)?;
    let services = stmt
        .query_map(predicates.params(), RegistrationEntry::from_row)?
        .map(|row| row.map(ServiceView::from))
        .collect::<std::result::Result<Vec<_>, rusqlite::Error>>()?;
    Ok(services)
}

fn metadata(node: &Node) -> Vec<MetadataEntry> {
    vec![
        MetadataEntry {
            name: "Group ID".to_string(),
            value: format!("#{}", node.id),
        },
        MetadataEntry {
            name: "Group name".to_string(),
            value: node.name.clone(),
        },
        MetadataEntry {
            name: "Creation date".to_string(),
            value: node.created_at.clone(),
        },
    ]
}

/// Requests within the filter's time range.
fn request_scope(filter: &ReportFilter) -> SqlFilter {
    let mut scope = SqlFilter::new();
    if let Some(from) = &filter.from {
        scope.push_gt("created_at", from.clone());
    }
    if let Some(to) = &filter.to {
        scope.push_lt("created_at", to.clone());
    }
    scope
}

fn inbound_scope(node: &Node, filter: &ReportFilter) -> SqlFilter {
    let mut scope = request_scope(filter);
    scope.push_eq("to_id", node.id);
    scope
}

fn outbound_scope(service_ids: &[i64], filter: &ReportFilter) -> SqlFilter {
    let mut scope = request_scope(filter);
    scope.push_in("from_id", service_ids.to_vec());
    scope
}

fn traffic(conn: &Connection, node: &Node, service_ids: &[i64], filter: &ReportFilter) -> Result<Traffic> {
    let inbound = inbound_scope(node, filter);
    let (request_time, response_time) = average_times(conn, &inbound)?;
    let incoming = code_counts(conn, &inbound)?;
    let outgoing = code_counts(conn, &outbound_scope(service_ids, filter))?;

    Ok(Traffic {
        inbound: TrafficFlow {
            time: round_millis(request_time),
            success: percent(incoming.total - incoming.c5xx, incoming.total),
            error: percent(incoming.c5xx, incoming.total),
        },
        outbound: TrafficFlow {
            time: round_millis(response_time),
            success: percent(outgoing.total - outgoing.c5xx, outgoing.total),
            error: percent(outgoing.c5xx, outgoing.total),
        },
    })
}

fn status(conn: &Connection, node: &Node, service_ids: &[i64], filter: &ReportFilter) -> Result<Status> {
    let incoming = code_counts(conn, &inbound_scope(node, filter))?;
    let outgoing = code_counts(conn, &outbound_scope(service_ids, filter))?;
    Ok(Status {
        inbound: status_mix(&incoming),
        outbound: status_mix(&outgoing),
    })
}

fn status_mix(counts: &CodeCounts) -> StatusMix {
    StatusMix {
        success: percent(counts.c2xx, counts.total),
        redirect: percent(counts.c3xx, counts.total),
        client_error: percent(counts.c4xx, counts.total),
        server_error: percent(counts.c5xx, counts.total),
    }
}

fn code_counts(conn: &Connection, scope: &SqlFilter) -> Result<CodeCounts> {
    let sql = format!(
        "SELECT COUNT(*), \
            SUM(CASE WHEN code / 100 = 2 THEN 1 ELSE 0 END), \
            SUM(CASE WHEN code / 100 = 3 THEN 1 ELSE 0 END), \
            SUM(CASE WHEN code / 100 = 4 THEN 1 ELSE 0 END), \
            SUM(CASE WHEN code / 100 = 5 THEN 1 ELSE 0 END) \
         FROM request{}",
        scope.where_clause()
    );
    let counts = conn.query_row(&sql, scope.params(), |row| {
        Ok(CodeCounts {
            total: row.get(0)?,
            c2xx: row.get::<_, Option<i64>>(1)?.unwrap_or(0),
            c3xx: row.get::<_, Option<i64>>(2)?.unwrap_or(0),
            c4xx: row.get::<_, Option<i64>>(3)?.unwrap_or(0),
            c5xx: row.get::<_, Option<i64>>(4)?.unwrap_or(0),
        })
    })?;
    Ok(counts)
}

fn average_times(conn: &Connection, scope: &SqlFilter) -> Result<(f64, f64)> {
    let sql = format!(
        "SELECT AVG(request_time), AVG(response_time) FROM request{}",
        scope.where_clause()
    );
    let times = conn.query_row(&sql, scope.params(), |row| {
        Ok((
            row.get::<_, Option<f64>>(0)?.unwrap_or(0.0),
            row.get::<_, Option<f64>>(1)?.unwrap_or(0.0),
        ))
    })?;
    Ok(times)
}

fn percent(part: i64, total: i64) -> i64 {
    if total <= 0 {
        return 0;
    }
    (100.0 * part as f64 / total as f64).round() as i64
}

fn round_millis(seconds: f64) -> f64 {
    (seconds * 1000.0).round() / 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::Processor;
    use crate::test_support::{enqueue, memory_store, register, SAMPLE_LINE};
    use rusqlite::params;

    fn line(code: u16, request_time: &str) -> String {
        SAMPLE_LINE
            .replace(" 200 ", &format!(" {} ", code))
            .replace("rt=0.012", &format!("rt={}", request_time))
    }

    fn seeded() -> Connection {
        let mut conn = memory_store();
        register(&conn, "frontend", "frontend-0", "10.0.0.5", true);
        register(&conn, "backend", "backend-0", "10.0.0.9", true);
        register(&conn, "batch", "batch-0", "10.0.0.30", false);
        enqueue(&conn, "backend-0", &line(200, "0.010"));
        enqueue(&conn, "backend-0", &line(200, "0.020"));
        enqueue(&conn, "backend-0", &line(404, "0.030"));
        enqueue(&conn, "backend-0", &line(503, "0.040"));
        enqueue(&conn, "backend-0", &SAMPLE_LINE.replace("10.0.0.5", "198.51.100.4"));
        Processor::new(100).run(&mut conn).unwrap();
        conn
    }

    #[test]
    fn test_percent_and_rounding() {
        assert_eq!(percent(1, 3), 33);
        assert_eq!(percent(2, 3), 67);
        assert_eq!(percent(5, 0), 0);
        assert_eq!(round_millis(0.0123456), 0.012);
    }

    #[test]
    fn test_snapshot_nodes_and_links() {
        let conn = seeded();

        let snapshot = build_snapshot(&conn, &ReportFilter::default()).unwrap();

        let names: Vec<_> = snapshot.nodes.iter().map(|n| n.name.as_str()).collect();
        assert_eq!(names, vec!["frontend", "backend"]);
        assert!(snapshot.ingress);
        assert_eq!(snapshot.links.len(), 2);
        let frontend = &snapshot.nodes[0];
        let backend = &snapshot.nodes[1];
        assert!(snapshot
            .links
            .iter()
            .any(|l| l.from == format!("{}#{}", frontend.id, frontend.services[0].id)
                && l.to == backend.id.to_string()));
        assert!(snapshot.links.iter().any(|l| l.from == "ingress"));
        assert_eq!(backend.metadata[0].value, format!("#{}", backend.id));
        assert!(!backend.disabled);
    }

    #[test]
    fn test_services_match_group_ignoring_case() {
        let conn = seeded();
        register(&conn, "Backend", "backend-1", "10.0.0.10", true);

        let snapshot = build_snapshot(&conn, &ReportFilter::default()).unwrap();

        let backend = snapshot.nodes.iter().find(|n| n.name == "backend").unwrap();
        assert_eq!(backend.services.len(), 2);
    }

    #[test]
    fn test_snapshot_aggregates() {
        let conn = seeded();

        let snapshot = build_snapshot(&conn, &ReportFilter::default()).unwrap();

        let backend = snapshot.nodes.iter().find(|n| n.name == "backend").unwrap();
        // 200, 200, 404, 503 from frontend plus one 200 from ingress
        assert_eq!(backend.status.inbound.success, 60);
        assert_eq!(backend.status.inbound.client_error, 20);
        assert_eq!(backend.status.inbound.server_error, 20);
        assert_eq!(backend.traffic.inbound.error, 20);
        assert_eq!(backend.traffic.inbound.success, 80);
        assert_eq!(backend.traffic.inbound.time, 0.022);
        assert_eq!(backend.traffic.outbound, TrafficFlow { time: 0.01, success: 0, error: 0 });

        let frontend = snapshot.nodes.iter().find(|n| n.name == "frontend").unwrap();
        assert_eq!(frontend.status.outbound.success, 50);
        assert_eq!(frontend.traffic.outbound.error, 25);
        assert_eq!(frontend.status.inbound, StatusMix::default());
    }

    #[test]
    fn test_namespace_filter_hides_nodes() {
        let conn = seeded();
        conn.execute(
            "UPDATE registration SET namespace = 'edge' WHERE groupname = ?1",
            params!["frontend"],
        )
        .unwrap();
        let filter = ReportFilter::new(None, None, Some("edge")).unwrap();

        let snapshot = build_snapshot(&conn, &filter).unwrap();

        assert_eq!(snapshot.nodes.len(), 1);
        assert_eq!(snapshot.nodes[0].name, "frontend");
        assert!(snapshot.links.is_empty());
        assert_eq!(snapshot.namespace.as_deref(), Some("edge"));
    }

    #[test]
    fn test_time_range_excludes_requests() {
        let conn = seeded();
        let filter = ReportFilter::new(Some("2999-01-01"), None, None).unwrap();

        let snapshot = build_snapshot(&conn, &filter).unwrap();

        let backend = snapshot.nodes.iter().find(|n| n.name == "backend").unwrap();
        assert_eq!(backend.traffic.inbound, TrafficFlow::default());
        assert_eq!(snapshot.links.len(), 2);
    }

    #[test]
    fn test_empty_store() {
        let conn = memory_store();

        let snapshot = build_snapshot(&conn, &ReportFilter::default()).unwrap();

        assert!(snapshot.nodes.is_empty());
        assert!(!snapshot.ingress);
        let json = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(json["nodes"], serde_json::json!([]));
    }

    #[test]
    fn test_serialized_field_names() {
        let mix = StatusMix {
            success: 1,
            redirect: 2,
            client_error: 3,
            server_error: 4,
        };
        let json = serde_json::to_value(&Status {
            inbound: mix,
            outbound: StatusMix::default(),
        })
        .unwrap();
        assert_eq!(json["in"]["2xx"], 1);
        assert_eq!(json["in"]["5xx"], 4);
        assert_eq!(json["out"]["3xx"], 0);
    }
}
