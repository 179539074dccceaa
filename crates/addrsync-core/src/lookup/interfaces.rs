// # Local Interface Addresses
//
// Enumerates the addresses assigned to a named local interface so discovery
// requests can be originated from them.

use std::net::IpAddr;

use crate::record::RecordType;

/// Source of local interface addresses
pub trait InterfaceAddresses: Send + Sync {
    /// Addresses assigned to the interface `name`
    ///
    /// # Returns
    ///
    /// - `Some(addrs)`: The interface exists (the list may be empty)
    /// - `None`: No interface by that name
    fn addresses(&self, name: &str) -> Option<Vec<IpAddr>>;
}

/// Interface table of the running system
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemInterfaces;

impl InterfaceAddresses for SystemInterfaces {
    fn addresses(&self, name: &str) -> Option<Vec<IpAddr>> {
        let interfaces = match if_addrs::get_if_addrs() {
            Ok(interfaces) => interfaces,
            Err(e) => {
                tracing::debug!("Failed to read interface table: {}", e);
                return None;
            }
        };

        let addrs: Vec<IpAddr> = interfaces
            .iter()
            .filter(|iface| iface.name == name)
            .map(|iface| iface.ip())
            .collect();

        // Interfaces without any address are not listed at all
        (!addrs.is_empty()).then_some(addrs)
    }
}

/// Addresses of `interface` usable as discovery sources for `record_type`
///
/// Only global unicast addresses of the matching family qualify. An empty
/// result means "use default routing".
pub fn source_addresses(
    interfaces: &dyn InterfaceAddresses,
    record_type: RecordType,
    interface: &str,
) -> Vec<IpAddr> {
    interfaces
        .addresses(interface)
        .unwrap_or_default()
        .into_iter()
        .filter(|ip| record_type.matches(ip) && is_global_unicast(ip))
        .collect()
}

/// Global unicast scope: not unspecified, loopback, multicast, link-local or
/// the limited broadcast address. Private ranges still count.
pub fn is_global_unicast(ip: &IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => {
            !(v4.is_unspecified()
                || v4.is_loopback()
                || v4.is_multicast()
                || v4.is_link_local()
                || v4.is_broadcast())
        }
        IpAddr::V6(v6) => {
            let link_local = (v6.segments()[0] & 0xffc0) == 0xfe80;
            !(v6.is_unspecified() || v6.is_loopback() || v6.is_multicast() || link_local)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    struct Table(HashMap<&'static str, Vec<IpAddr>>);

    impl InterfaceAddresses for Table {
        fn addresses(&self, name: &str) -> Option<Vec<IpAddr>> {
            self.0.get(name).cloned()
        }
    }

    fn ip(s: &str) -> IpAddr {
        s.parse().unwrap()
    }

    #[test]
    fn test_global_unicast() {
        assert!(is_global_unicast(&ip("203.0.113.9")));
        assert!(is_global_unicast(&ip("192.168.1.10")));
        assert!(is_global_unicast(&ip("2001:db8::1")));
        assert!(!is_global_unicast(&ip("127.0.0.1")));
        assert!(!is_global_unicast(&ip("169.254.1.1")));
        assert!(!is_global_unicast(&ip("255.255.255.255")));
        assert!(!is_global_unicast(&ip("224.0.0.1")));
        assert!(!is_global_unicast(&ip("fe80::1")));
        assert!(!is_global_unicast(&ip("::1")));
        assert!(!is_global_unicast(&ip("::")));
    }

    #[test]
    fn test_source_addresses_filter_family_and_scope() {
        let table = Table(HashMap::from([(
            "eth0",
            vec![
                ip("192.168.1.10"),
                ip("169.254.3.3"),
                ip("fe80::1"),
                ip("2001:db8::10"),
            ],
        )]));

        assert_eq!(
            source_addresses(&table, RecordType::A, "eth0"),
            vec![ip("192.168.1.10")]
        );
        assert_eq!(
            source_addresses(&table, RecordType::Aaaa, "eth0"),
            vec![ip("2001:db8::10")]
        );
        assert!(source_addresses(&table, RecordType::A, "wlan0").is_empty());
    }

    #[test]
    fn test_system_interfaces_unknown_name() {
        assert!(SystemInterfaces.addresses("no-such-interface-xyz0").is_none());
    }
}
