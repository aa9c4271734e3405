use std::io::Write;
use shared::types::{Report, ReportRow, ReportWindow};
use crate::aggregate::ServiceTable;

/// Project the finished table into the ordered report view. Pure; the table
/// is read-only by this point and the rows come out sorted by service name.
pub fn build_report(
    table: &ServiceTable,
    window: ReportWindow,
    container_filter: Option<i64>,
) -> Report {
    let rows = table
        .iter()
        .map(|(service, entry)| ReportRow {
            service: service.clone(),
            standalone_count: entry.standalone_count,
            servlet_count: entry.servlet_count,
            unique_address_count: entry.unique_addresses.len() as u64,
            domains: entry.domains.iter().cloned().collect(),
        })
        .collect();

    Report {
        window,
        container_filter,
        rows,
        total_services: table.len(),
    }
}

/// Render the report in the classic comma-separated layout: one line per
/// service, a blank line, then the distinct-service total.
pub fn render_text(report: &Report, out: &mut impl Write) -> std::io::Result<()> {
    for row in &report.rows {
        writeln!(
            out,
            "{}, {}, {}, {}, [{}]",
            row.service,
            row.standalone_count,
            row.servlet_count,
            row.unique_address_count,
            row.domains.join(", ")
        )?;
    }
    writeln!(out)?;
    writeln!(out, "Total unique services: {}", report.total_services)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use shared::types::ServiceEntry;

    fn window() -> ReportWindow {
        ReportWindow::from_anchor(NaiveDate::from_ymd_opt(2006, 3, 15).unwrap(), 7)
    }

    fn table() -> ServiceTable {
        let mut table = ServiceTable::new();
        table.insert(
            "ShoppingCartService".into(),
            ServiceEntry {
                standalone_count: 2,
                servlet_count: 0,
                other_count: 1,
                unique_addresses: ["140.221.8.4".to_string()].into_iter().collect(),
                domains: ["mcs.anl.gov".to_string()].into_iter().collect(),
            },
        );
        table.insert(
            "CounterService".into(),
            ServiceEntry {
                standalone_count: 1,
                servlet_count: 3,
                other_count: 0,
                unique_addresses: ["8.8.8.8".to_string(), "140.221.8.4".to_string()]
                    .into_iter()
                    .collect(),
                domains: ["dns.google".to_string(), "mcs.anl.gov".to_string()]
                    .into_iter()
                    .collect(),
            },
        );
        table
    }

    #[test]
    fn rows_come_out_sorted_by_service_name() {
        let report = build_report(&table(), window(), None);
        let names: Vec<&str> = report.rows.iter().map(|r| r.service.as_str()).collect();
        assert_eq!(names, vec!["CounterService", "ShoppingCartService"]);
        assert_eq!(report.total_services, 2);
    }

    #[test]
    fn rows_carry_counts_and_sorted_domains() {
        let report = build_report(&table(), window(), Some(2));
        let counter = &report.rows[0];
        assert_eq!(counter.standalone_count, 1);
        assert_eq!(counter.servlet_count, 3);
        assert_eq!(counter.unique_address_count, 2);
        assert_eq!(counter.domains, vec!["dns.google", "mcs.anl.gov"]);
        assert_eq!(report.container_filter, Some(2));
    }

    #[test]
    fn text_rendering_matches_the_classic_layout() {
        let report = build_report(&table(), window(), None);
        let mut out = Vec::new();
        render_text(&report, &mut out).unwrap();

        let text = String::from_utf8(out).unwrap();
        assert_eq!(
            text,
            "CounterService, 1, 3, 2, [dns.google, mcs.anl.gov]\n\
             ShoppingCartService, 2, 0, 1, [mcs.anl.gov]\n\
             \n\
             Total unique services: 2\n"
        );
    }
}
