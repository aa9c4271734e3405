use std::collections::BTreeMap;
use shared::types::{RawRecord, ServiceEntry};
use crate::addr::{is_private_address, normalize_address};

/// Service name -> accumulator, ordered by name for reporting.
pub type ServiceTable = BTreeMap<String, ServiceEntry>;

/// Longest service list the upstream transport delivers intact; at or past
/// this length the final comma-delimited entry may have been cut mid-name.
pub const MAX_SERVICE_LIST_LEN: usize = 1445;

const CONTAINER_STANDALONE: i64 = 1;
const CONTAINER_SERVLET: i64 = 2;

/// Accumulates raw telemetry records into the per-service table.
/// Strictly sequential; call `compute` once per record, then take the
/// finished table with `into_table`.
#[derive(Debug, Default)]
pub struct Aggregator {
    services: ServiceTable,
}

impl Aggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one raw record into the table. Never fails; malformed records
    /// degrade to safe defaults instead of aborting the batch.
    pub fn compute(&mut self, record: &RawRecord) {
        let service_list = repair_truncation(&record.service_list);
        let address = normalize_address(&record.source_address);
        let private = is_private_address(address);

        for name in service_list.split(',').filter(|token| !token.is_empty()) {
            let entry = self.services.entry(name.to_string()).or_default();

            match record.container_type {
                CONTAINER_STANDALONE => entry.standalone_count += 1,
                CONTAINER_SERVLET => entry.servlet_count += 1,
                _ => entry.other_count += 1,
            }

            if !private {
                entry.unique_addresses.insert(address.to_string());
            }
        }
    }

    pub fn service_count(&self) -> usize {
        self.services.len()
    }

    pub fn into_table(self) -> ServiceTable {
        self.services
    }
}

/// Drop everything after the last comma once the list is long enough to have
/// been cut mid-name. Deliberately conservative: a complete trailing name may
/// be discarded, but a partial one is never credited as a distinct service.
/// A list with no comma is kept whole.
fn repair_truncation(list: &str) -> &str {
    if list.len() < MAX_SERVICE_LIST_LEN {
        return list;
    }
    match list.rfind(',') {
        Some(pos) => &list[..pos],
        None => list,
    }
}
