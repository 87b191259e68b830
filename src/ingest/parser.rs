//! Access log grammar (nginx `combined` plus upstream timings).

use chrono::{DateTime, FixedOffset};
use regex::Regex;

use crate::error::TopomapError;
use crate::outcome::Outcome;

/// `<ip> - .. [<time>] "<request>" <status> <bytes> "<referrer>" "<agent>" - rt= uct= uht= urt=`
const ACCESS_LOG_PATTERN: &str = r#"(?i)^([0-9.]+) - .* \[(.*)\] ".*" ([0-9]+) [0-9]+ ".*" ".*" - rt=([0-9.]+) uct=[0-9.]+ uht=[0-9.]+ urt=([0-9.]+)"#;

const TIMESTAMP_FORMAT: &str = "%d/%b/%Y:%H:%M:%S %z";

/// Structured facts extracted from one access log line.
#[derive(Debug, Clone, PartialEq)]
pub struct AccessFact {
    /// Remote address of the caller as seen by the proxy
    pub caller_addr: String,
    pub at: DateTime<FixedOffset>,
    pub code: u16,
    /// Total request processing time, seconds
    pub request_time: f64,
    /// Upstream response time, seconds
    pub response_time: f64,
}

pub struct AccessLogParser {
    pattern: Regex,
}

impl AccessLogParser {
    pub fn new() -> Self {
        Self {
            pattern: Regex::new(ACCESS_LOG_PATTERN).expect("Invalid access log pattern"),
        }
    }

    /// Parse one raw line.
    ///
    /// A line that does not match the grammar is `Invalid`. A line that
    /// matches but carries an impossible date or number is a `Fault`.
    pub fn parse(&self, line: &str) -> Outcome<AccessFact> {
        let caps = match self.pattern.captures(line) {
            Some(caps) => caps,
            None => return Outcome::Invalid("line does not match the access log format".to_string()),
        };

        let raw_at = &caps[2];
        let at = match DateTime::parse_from_str(raw_at, TIMESTAMP_FORMAT) {
            Ok(at) => at,
            Err(source) => {
                return Outcome::Fault(TopomapError::Timestamp {
                    value: raw_at.to_string(),
                    source,
                })
            }
        };

        let fields = (
            parse_field::<u16>("status code", &caps[3]),
            parse_field::<f64>("request_time", &caps[4]),
            parse_field::<f64>("response_time", &caps[5]),
        );
        match fields {
            (Ok(code), Ok(request_time), Ok(response_time)) => Outcome::Success(AccessFact {
                caller_addr: caps[1].to_string(),
                at,
                code,
                request_time,
                response_time,
            }),
            (Err(e), _, _) | (_, Err(e), _) | (_, _, Err(e)) => Outcome::Fault(e),
        }
    }
}

impl Default for AccessLogParser {
    fn default() -> Self {
        Self::new()
    }
}

fn parse_field<T: std::str::FromStr>(field: &'static str, value: &str) -> Result<T, TopomapError> {
    value.parse().map_err(|_| TopomapError::MalformedField {
        field,
        value: value.to_string(),
    })
}
