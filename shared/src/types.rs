use std::collections::BTreeSet;
use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};

/// One raw usage-telemetry packet.
/// This is the canonical input record consumed by the aggregation engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawRecord {
    /// Comma-separated list of service names. May have been truncated
    /// mid-name by the upstream transport to fit the packet size.
    pub service_list: String,

    /// Integer code for the hosting container kind (1 = standalone,
    /// 2 = servlet, anything else is "other").
    pub container_type: i64,

    /// Textual source IP, possibly prefixed with a `/` marker by the
    /// upstream address renderer.
    pub source_address: String,
}

/// Per-service accumulator, owned by the service table under its name key.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServiceEntry {
    /// Invocations from standalone containers
    pub standalone_count: u64,

    /// Invocations from servlet containers
    pub servlet_count: u64,

    /// Invocations from any other container kind
    pub other_count: u64,

    /// Distinct non-private source addresses that invoked this service
    pub unique_addresses: BTreeSet<String>,

    /// Resolved domains for `unique_addresses`; empty until the
    /// domain-discovery pass has run
    pub domains: BTreeSet<String>,
}

/// Half-open date window `[start, end)` a report covers.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ReportWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl ReportWindow {
    /// Build a window from an anchor date and a day count. Negative counts
    /// extend backwards, ending at the anchor; positive counts start at it.
    pub fn from_anchor(anchor: NaiveDate, days: i64) -> Self {
        if days < 0 {
            Self {
                start: anchor + Duration::days(days),
                end: anchor,
            }
        } else {
            Self {
                start: anchor,
                end: anchor + Duration::days(days),
            }
        }
    }
}

/// One line of the final report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportRow {
    /// Service name
    pub service: String,

    /// Invocations from standalone containers
    pub standalone_count: u64,

    /// Invocations from servlet containers
    pub servlet_count: u64,

    /// Number of distinct non-private source addresses
    pub unique_address_count: u64,

    /// Resolved domains, sorted
    pub domains: Vec<String>,
}

/// The finished per-service usage report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    /// Date window the records were drawn from
    pub window: ReportWindow,

    /// Container-type filter the record query was narrowed to, if any
    pub container_filter: Option<i64>,

    /// One row per service, ordered by service name
    pub rows: Vec<ReportRow>,

    /// Number of distinct services seen
    pub total_services: usize,
}
