use std::collections::{BTreeSet, HashMap};
use futures::stream::{self, StreamExt};
use tokio_util::sync::CancellationToken;
use crate::aggregate::ServiceTable;
use crate::dns::resolver::DomainResolver;

/// Address -> resolved domain memo for one report run. Populated once by
/// `discover_domains`; shared across every entry so each distinct address is
/// resolved at most once no matter how many services it invoked.
pub type AddressDomainCache = HashMap<String, String>;

/// The batch reverse-lookup pass. Deduplicates addresses across the whole
/// table before dispatching any lookups, resolves them with bounded
/// concurrency, then annotates each entry's domain set from the cache.
///
/// Cancellation stops further lookups; entries are still annotated with
/// whatever resolved before the cut, and unresolved addresses simply leave
/// no domain behind.
pub async fn discover_domains<R: DomainResolver>(
    table: &mut ServiceTable,
    resolver: &R,
    max_concurrent: usize,
    cancel: &CancellationToken,
) -> AddressDomainCache {
    let distinct: BTreeSet<String> = table
        .values()
        .flat_map(|entry| entry.unique_addresses.iter().cloned())
        .collect();

    tracing::info!("Computing domains for {} distinct addresses", distinct.len());

    let mut lookups = stream::iter(distinct)
        .map(|address| async move {
            let domain = resolver.resolve(&address).await;
            (address, domain)
        })
        .buffer_unordered(max_concurrent.max(1));

    let mut cache = AddressDomainCache::new();
    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                tracing::warn!(
                    "Domain discovery cancelled after {} of the pending lookups",
                    cache.len()
                );
                break;
            }
            next = lookups.next() => match next {
                Some((address, domain)) => {
                    cache.insert(address, domain);
                }
                None => break,
            },
        }
    }

    for entry in table.values_mut() {
        for address in &entry.unique_addresses {
            if let Some(domain) = cache.get(address) {
                entry.domains.insert(domain.clone());
            }
        }
    }

    cache
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use async_trait::async_trait;
    use shared::types::ServiceEntry;

    /// Counts calls and resolves every address to a synthetic host name.
    #[derive(Default)]
    struct CountingResolver {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl DomainResolver for CountingResolver {
        async fn resolve(&self, address: &str) -> String {
            self.calls.fetch_add(1, Ordering::SeqCst);
            format!("host-{}.example.org", address.replace('.', "-"))
        }
    }

    fn entry_with_addresses(addresses: &[&str]) -> ServiceEntry {
        ServiceEntry {
            unique_addresses: addresses.iter().map(|a| a.to_string()).collect(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn shared_addresses_are_resolved_once() {
        let mut table = ServiceTable::new();
        table.insert("svcA".into(), entry_with_addresses(&["8.8.8.8", "140.221.8.4"]));
        table.insert("svcB".into(), entry_with_addresses(&["8.8.8.8"]));
        table.insert("svcC".into(), entry_with_addresses(&["8.8.8.8", "140.221.8.4"]));

        let resolver = CountingResolver::default();
        let cancel = CancellationToken::new();
        let cache = discover_domains(&mut table, &resolver, 4, &cancel).await;

        // Three services, two distinct addresses, exactly two lookups
        assert_eq!(resolver.calls.load(Ordering::SeqCst), 2);
        assert_eq!(cache.len(), 2);

        assert!(table["svcA"].domains.contains("host-8-8-8-8.example.org"));
        assert!(table["svcA"].domains.contains("host-140-221-8-4.example.org"));
        assert_eq!(table["svcB"].domains.len(), 1);
        assert_eq!(table["svcC"].domains.len(), 2);
    }

    #[tokio::test]
    async fn empty_address_sets_trigger_no_lookups() {
        let mut table = ServiceTable::new();
        table.insert("svcA".into(), ServiceEntry::default());

        let resolver = CountingResolver::default();
        let cancel = CancellationToken::new();
        discover_domains(&mut table, &resolver, 4, &cancel).await;

        assert_eq!(resolver.calls.load(Ordering::SeqCst), 0);
        assert!(table["svcA"].domains.is_empty());
    }

    #[tokio::test]
    async fn cancelled_discovery_leaves_entries_unannotated() {
        let mut table = ServiceTable::new();
        table.insert("svcA".into(), entry_with_addresses(&["8.8.8.8"]));

        let resolver = CountingResolver::default();
        let cancel = CancellationToken::new();
        cancel.cancel();
        discover_domains(&mut table, &resolver, 4, &cancel).await;

        assert_eq!(resolver.calls.load(Ordering::SeqCst), 0);
        assert!(table["svcA"].domains.is_empty());
    }
}
