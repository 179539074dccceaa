//! Address arithmetic
//!
//! Pure functions used to turn a discovered public address into the value
//! written to a DNS record:
//!
//! ```text
//! record = add(mask(discovered, mask_bits), offset)
//! ```
//!
//! IPv4 values are always handled in their 4-byte form and IPv6 values in
//! their 16-byte form. Nothing here performs I/O or fails.

use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::str::FromStr;

/// Zero out the `bits` lowest-order bits of `ip`.
///
/// Bits are counted from the least-significant end of the address, so the
/// same count means the same thing for both families. `0` leaves the address
/// untouched; a count at or beyond the family width yields the all-zero
/// address of that family.
pub fn mask(ip: IpAddr, bits: u32) -> IpAddr {
    match ip {
        IpAddr::V4(v4) => {
            let value = u32::from(v4);
            let masked = if bits >= 32 { 0 } else { value & (u32::MAX << bits) };
            IpAddr::V4(Ipv4Addr::from(masked))
        }
        IpAddr::V6(v6) => {
            let value = u128::from(v6);
            let masked = if bits >= 128 { 0 } else { value & (u128::MAX << bits) };
            IpAddr::V6(Ipv6Addr::from(masked))
        }
    }
}

/// Add two addresses as big-endian unsigned integers.
///
/// The result has the width of the longer operand. A shorter IPv4 operand is
/// zero-extended on its most-significant side (it is *not* IPv4-mapped).
/// Carry out of the most-significant byte is discarded.
pub fn add(a: IpAddr, b: IpAddr) -> IpAddr {
    match (a, b) {
        (IpAddr::V4(a), IpAddr::V4(b)) => {
            IpAddr::V4(Ipv4Addr::from(u32::from(a).wrapping_add(u32::from(b))))
        }
        _ => IpAddr::V6(Ipv6Addr::from(widen(a).wrapping_add(widen(b)))),
    }
}

fn widen(ip: IpAddr) -> u128 {
    match ip {
        IpAddr::V4(v4) => u128::from(u32::from(v4)),
        IpAddr::V6(v6) => u128::from(v6),
    }
}

/// EUI-64 host identifier for IPv6 stateless autoconfiguration.
///
/// The upper 64 bits are zero. The lower 64 bits are the MAC address with
/// `ff:fe` inserted after the third octet and the universal/local bit of the
/// first octet flipped.
pub fn slaac_host_bits(mac: MacAddr) -> Ipv6Addr {
    let m = mac.octets();
    Ipv6Addr::from([
        0,
        0,
        0,
        0,
        0,
        0,
        0,
        0,
        m[0] ^ 0x02,
        m[1],
        m[2],
        0xff,
        0xfe,
        m[3],
        m[4],
        m[5],
    ])
}

/// A 48-bit hardware address
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MacAddr([u8; 6]);

impl MacAddr {
    /// Create a MAC address from its octets
    pub const fn new(octets: [u8; 6]) -> Self {
        Self(octets)
    }

    /// The six octets, most significant first
    pub const fn octets(&self) -> [u8; 6] {
        self.0
    }
}

impl From<[u8; 6]> for MacAddr {
    fn from(octets: [u8; 6]) -> Self {
        Self(octets)
    }
}

impl fmt::Display for MacAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let m = self.0;
        write!(
            f,
            "{:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}",
            m[0], m[1], m[2], m[3], m[4], m[5]
        )
    }
}

/// Error returned when a MAC address cannot be parsed
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid MAC address: {0}")]
pub struct ParseMacError(String);

impl FromStr for MacAddr {
    type Err = ParseMacError;

    /// Accepts `00:00:5e:00:53:01`, `00-00-5e-00-53-01` and `0000.5e00.5301`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ParseMacError(s.to_string());

        let digits: String = if s.contains('.') {
            let groups: Vec<&str> = s.split('.').collect();
            if groups.len() != 3 || groups.iter().any(|g| g.len() != 4) {
                return Err(invalid());
            }
            groups.concat()
        } else {
            let separator = if s.contains('-') { '-' } else { ':' };
            let groups: Vec<&str> = s.split(separator).collect();
            if groups.len() != 6 || groups.iter().any(|g| g.len() != 2) {
                return Err(invalid());
            }
            groups.concat()
        };

        if !digits.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(invalid());
        }

        let mut octets = [0u8; 6];
        for (i, octet) in octets.iter_mut().enumerate() {
            *octet = u8::from_str_radix(&digits[i * 2..i * 2 + 2], 16).map_err(|_| invalid())?;
        }
        Ok(Self(octets))
    }
}
