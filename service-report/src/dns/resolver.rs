use std::net::IpAddr;
use std::time::Duration;
use async_trait::async_trait;
use trust_dns_resolver::config::{ResolverConfig, ResolverOpts};
use trust_dns_resolver::TokioAsyncResolver;

/// Best-effort reverse lookup of a single address. Implementations never
/// fail: anything that cannot be resolved comes back as the address itself,
/// so domain enrichment can only degrade, not abort, a report.
#[async_trait]
pub trait DomainResolver: Send + Sync {
    async fn resolve(&self, address: &str) -> String;
}

/// PTR lookups against the default nameservers, bounded by a per-lookup
/// timeout so one dead resolver cannot stall the whole discovery pass.
pub struct PtrResolver {
    inner: TokioAsyncResolver,
    lookup_timeout: Duration,
}

impl PtrResolver {
    pub fn new(lookup_timeout: Duration) -> Self {
        let inner = TokioAsyncResolver::tokio(ResolverConfig::default(), ResolverOpts::default());
        Self {
            inner,
            lookup_timeout,
        }
    }
}

#[async_trait]
impl DomainResolver for PtrResolver {
    async fn resolve(&self, address: &str) -> String {
        let ip: IpAddr = match address.parse() {
            Ok(ip) => ip,
            Err(_) => {
                tracing::debug!("Skipping reverse lookup of malformed address {}", address);
                return address.to_string();
            }
        };

        match tokio::time::timeout(self.lookup_timeout, self.inner.reverse_lookup(ip)).await {
            Ok(Ok(lookup)) => match lookup.iter().next() {
                Some(name) => {
                    let host = name.to_utf8();
                    host.strip_suffix('.').unwrap_or(&host).to_string()
                }
                None => address.to_string(),
            },
            Ok(Err(e)) => {
                tracing::debug!("Reverse lookup failed for {}: {}", address, e);
                address.to_string()
            }
            Err(_) => {
                tracing::debug!(
                    "Reverse lookup for {} timed out after {:?}",
                    address,
                    self.lookup_timeout
                );
                address.to_string()
            }
        }
    }
}
