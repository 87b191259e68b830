//! Parameterized predicate building for report queries.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use rusqlite::{params_from_iter, ToSql};

use crate::error::{Result, TopomapError};

/// Layout of `CURRENT_TIMESTAMP` values in the store.
const STORE_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Optional report restrictions. Empty strings count as absent.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReportFilter {
    /// Exclusive lower bound on `request.created_at`, store format
    pub from: Option<String>,
    /// Exclusive upper bound on `request.created_at`, store format
    pub to: Option<String>,
    pub namespace: Option<String>,
}

impl ReportFilter {
    /// Build a filter, normalizing time bounds to the store's UTC format.
    ///
    /// Accepts RFC 3339, `YYYY-MM-DD HH:MM:SS` (taken as UTC) or `YYYY-MM-DD`.
    pub fn new(from: Option<&str>, to: Option<&str>, namespace: Option<&str>) -> Result<Self> {
        Ok(Self {
            from: non_empty(from).map(normalize_time).transpose()?,
            to: non_empty(to).map(normalize_time).transpose()?,
            namespace: non_empty(namespace).map(str::to_string),
        })
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn normalize_time(value: &str) -> Result<String> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Ok(dt.with_timezone(&Utc).format(STORE_TIME_FORMAT).to_string());
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(value, STORE_TIME_FORMAT) {
        return Ok(dt.format(STORE_TIME_FORMAT).to_string());
    }
    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        return Ok(format!("{} 00:00:00", date.format("%Y-%m-%d")));
    }
    Err(TopomapError::InvalidInput(format!("unrecognized time '{}'", value)))
}

/// Conjunction of SQL predicates with positional parameters.
///
/// Column names are compile-time strings; every value goes through a `?`
/// placeholder.
#[derive(Default)]
pub struct SqlFilter {
    clauses: Vec<String>,
    params: Vec<Box<dyn ToSql>>,
}

impl SqlFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_eq<T: ToSql + 'static>(&mut self, column: &'static str, value: T) -> &mut Self {
        self.push_cmp(column, "=", value)
    }

    /// `column = ? COLLATE NOCASE`, for names the registry spells freely.
    pub fn push_eq_nocase(&mut self, column: &'static str, value: String) -> &mut Self {
        self.clauses.push(format!("{} = ? COLLATE NOCASE", column));
        self.params.push(Box::new(value));
        self
    }

    pub fn push_gt<T: ToSql + 'static>(&mut self, column: &'static str, value: T) -> &mut Self {
        self.push_cmp(column, ">", value)
    }

    pub fn push_lt<T: ToSql + 'static>(&mut self, column: &'static str, value: T) -> &mut Self {
        self.push_cmp(column, "<", value)
    }

    /// `column IN (?, ..)`. An empty set matches no row.
    pub fn push_in<T, I>(&mut self, column: &'static str, values: I) -> &mut Self
    where
        T: ToSql + 'static,
        I: IntoIterator<Item = T>,
    {
        let before = self.params.len();
        for value in values {
            self.params.push(Box::new(value));
        }
        let count = self.params.len() - before;
        if count == 0 {
            self.clauses.push("0 = 1".to_string());
        } else {
            let placeholders = vec!["?"; count].join(", ");
            self.clauses.push(format!("{} IN ({})", column, placeholders));
        }
        self
    }

    fn push_cmp<T: ToSql + 'static>(&mut self, column: &'static str, op: &str, value: T) -> &mut Self {
        self.clauses.push(format!("{} {} ?", column, op));
        self.params.push(Box::new(value));
        self
    }

    /// ` WHERE a AND b`, or an empty string when there are no predicates.
    pub fn where_clause(&self) -> String {
        if self.clauses.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", self.clauses.join(" AND "))
        }
    }

    pub fn params(&self) -> impl rusqlite::Params + '_ {
        params_from_iter(self.params.iter())
    }

    pub fn len(&self) -> usize {
        self.clauses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{memory_store, register};

    #[test]
    fn test_empty_filter_has_no_where() {
        let filter = SqlFilter::new();
        assert_eq!(filter.where_clause(), "");
        assert!(filter.is_empty());
    }

    #[test]
    fn test_clauses_use_placeholders() {
        let mut filter = SqlFilter::new();
        filter
            .push_eq("groupname", "backend'; DROP TABLE node; --".to_string())
            .push_gt("created_at", "2023-01-01 00:00:00".to_string())
            .push_in("id", vec![1_i64, 2, 3]);

        assert_eq!(
            filter.where_clause(),
            " WHERE groupname = ? AND created_at > ? AND id IN (?, ?, ?)"
        );
        assert_eq!(filter.len(), 3);
    }

    #[test]
    fn test_empty_in_matches_nothing() {
        let conn = memory_store();
        register(&conn, "backend", "b0", "10.0.0.1", true);
        let mut filter = SqlFilter::new();
        filter.push_in("id", Vec::<i64>::new());

        let sql = format!("SELECT COUNT(*) FROM registration{}", filter.where_clause());
        let count: i64 = conn.query_row(&sql, filter.params(), |r| r.get(0)).unwrap();

        assert_eq!(count, 0);
    }

    #[test]
    fn test_filter_executes_against_store() {
        let conn = memory_store();
        register(&conn, "backend", "b0", "10.0.0.1", true);
        register(&conn, "backend", "b1", "10.0.0.2", false);
        register(&conn, "frontend", "f0", "10.0.0.3", true);
        let mut filter = SqlFilter::new();
        filter.push_eq("groupname", "backend".to_string()).push_eq("active", true);

        let sql = format!("SELECT COUNT(*) FROM registration{}", filter.where_clause());
        let count: i64 = conn.query_row(&sql, filter.params(), |r| r.get(0)).unwrap();

        assert_eq!(count, 1);
    }

    #[test]
    fn test_nocase_equality() {
        let conn = memory_store();
        register(&conn, "Backend", "b0", "10.0.0.1", true);
        register(&conn, "backend", "b1", "10.0.0.2", true);
        let mut filter = SqlFilter::new();
        filter.push_eq_nocase("groupname", "BACKEND".to_string());

        assert_eq!(filter.where_clause(), " WHERE groupname = ? COLLATE NOCASE");
        let sql = format!("SELECT COUNT(*) FROM registration{}", filter.where_clause());
        let count: i64 = conn.query_row(&sql, filter.params(), |r| r.get(0)).unwrap();

        assert_eq!(count, 2);
    }

    #[test]
    fn test_report_filter_normalizes_times() {
        let filter = ReportFilter::new(
            Some("2023-10-10T15:00:00+02:00"),
            Some("2023-10-11"),
            Some(""),
        )
        .unwrap();

        assert_eq!(filter.from.as_deref(), Some("2023-10-10 13:00:00"));
        assert_eq!(filter.to.as_deref(), Some("2023-10-11 00:00:00"));
        assert_eq!(filter.namespace, None);
    }

    #[test]
    fn test_report_filter_rejects_garbage_time() {
        assert!(matches!(
            ReportFilter::new(Some("yesterday"), None, None),
            Err(TopomapError::InvalidInput(_))
        ));
    }
}
