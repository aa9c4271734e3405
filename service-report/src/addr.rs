use std::net::IpAddr;

/// Strip the single leading `/` marker the upstream address renderer
/// sometimes prefixes to the textual IP. At most one character is removed.
pub fn normalize_address(raw: &str) -> &str {
    raw.strip_prefix('/').unwrap_or(raw)
}

/// Whether an address falls in a reserved range excluded from unique-visitor
/// tracking: loopback, link-local, and the private IPv4 blocks (plus their
/// IPv6 equivalents). Malformed input is treated as not-private; exclusion is
/// an optimization, not a security boundary.
pub fn is_private_address(address: &str) -> bool {
    match address.parse::<IpAddr>() {
        Ok(IpAddr::V4(v4)) => v4.is_loopback() || v4.is_link_local() || v4.is_private(),
        Ok(IpAddr::V6(v6)) => {
            let seg = v6.segments();
            // fc00::/7 unique-local, fe80::/10 link-local
            v6.is_loopback() || (seg[0] & 0xfe00) == 0xfc00 || (seg[0] & 0xffc0) == 0xfe80
        }
        Err(_) => false,
    }
}
