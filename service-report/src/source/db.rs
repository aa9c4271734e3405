use std::path::Path;
use anyhow::{Context, Result};
use rusqlite::{params, Connection};
use shared::types::{RawRecord, ReportWindow};

/// Usage packets recorded with this event type carry a service list.
const SERVICE_LIST_EVENT: i64 = 1;

pub struct TelemetryDb {
    conn: Connection,
}

impl TelemetryDb {
    /// Open the telemetry database, creating the packet schema if absent.
    /// `send_time` is RFC 3339 text so date-window compares work
    /// lexicographically.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }

        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open database: {}", path.display()))?;

        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS usage_packets (
                id             INTEGER PRIMARY KEY,
                event_type     INTEGER NOT NULL,
                send_time      TEXT NOT NULL,
                service_list   TEXT,
                container_type INTEGER,
                ip_address     TEXT
            );

            CREATE INDEX IF NOT EXISTS idx_send_time ON usage_packets(send_time);
            "#,
        )
        .context("Failed to create telemetry schema")?;

        Ok(Self { conn })
    }

    /// Fetch the raw records for one report window, optionally narrowed to a
    /// single container type. NULL fields degrade to empty/zero rather than
    /// failing the row.
    pub fn fetch_records(
        &self,
        window: &ReportWindow,
        container_type: Option<i64>,
    ) -> Result<Vec<RawRecord>> {
        let start = window.start.format("%Y-%m-%d").to_string();
        let end = window.end.format("%Y-%m-%d").to_string();

        let mut sql = String::from(
            "SELECT service_list, container_type, ip_address
             FROM usage_packets
             WHERE event_type = ?1 AND send_time >= ?2 AND send_time < ?3",
        );
        if container_type.is_some() {
            sql.push_str(" AND container_type = ?4");
        }

        let mut stmt = self
            .conn
            .prepare(&sql)
            .context("Failed to prepare packet query")?;

        fn map_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawRecord> {
            Ok(RawRecord {
                service_list: row.get::<_, Option<String>>(0)?.unwrap_or_default(),
                container_type: row.get::<_, Option<i64>>(1)?.unwrap_or_default(),
                source_address: row.get::<_, Option<String>>(2)?.unwrap_or_default(),
            })
        }

        let records = match container_type {
            Some(ct) => stmt.query_map(params![SERVICE_LIST_EVENT, start, end, ct], map_row),
            None => stmt.query_map(params![SERVICE_LIST_EVENT, start, end], map_row),
        }
        .context("Failed to query usage packets")?
        .collect::<Result<Vec<_>, _>>()
        .context("Failed to collect usage packets")?;

        Ok(records)
    }
}
