//! Public address lookup with caching
//!
//! [`IpLookup`] answers "what public address does the internet see from
//! this machine, for this family, optionally through this interface?" while
//! keeping discovery traffic low.
//!
//! ## Cache Behavior
//!
//! ```text
//! resolve(type, iface)
//!   ├── entry younger than STALE_AFTER ──────────────► cached value
//!   └── stale or missing
//!         ├── shuffle endpoints
//!         ├── for endpoint × source address: discover()
//!         │     └── first valid answer ── store (ip, now) ► new value
//!         └── all attempts failed ─────────────────────► previous value or None
//! ```
//!
//! ## Locking
//!
//! The map lock is held only long enough to find or insert a key's slot.
//! Each slot has its own mutex held across rediscovery, so one key is never
//! rediscovered twice concurrently while other keys proceed independently.

pub mod interfaces;

pub use interfaces::{InterfaceAddresses, SystemInterfaces};

use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;

use rand::seq::SliceRandom;
use tokio::sync::{Mutex, RwLock};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::record::RecordType;
use crate::traits::DiscoveryService;

/// How long a discovered address is trusted before rediscovery
pub const STALE_AFTER: Duration = Duration::from_secs(10 * 60);

/// Identifies a distinct discovery context
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AddressSource {
    /// Address family
    pub record_type: RecordType,
    /// Interface the discovery originates from; `None` is the default route
    pub interface: Option<String>,
}

impl AddressSource {
    /// Create a key; an empty interface name means the default route
    pub fn new(record_type: RecordType, interface: Option<&str>) -> Self {
        Self {
            record_type,
            interface: interface.filter(|name| !name.is_empty()).map(str::to_string),
        }
    }
}

/// A discovered address and when it was discovered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheEntry {
    /// The discovered address
    pub ip: IpAddr,
    /// When it was discovered
    pub retrieved: Instant,
}

impl CacheEntry {
    /// Whether the entry is still inside the staleness window
    pub fn is_fresh(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.retrieved) < STALE_AFTER
    }
}

type Slot = Arc<Mutex<Option<CacheEntry>>>;

/// Shared public address cache
///
/// One instance is shared (behind an `Arc`) by every updater built from the
/// same configuration.
pub struct IpLookup {
    services: Vec<Arc<dyn DiscoveryService>>,
    interfaces: Arc<dyn InterfaceAddresses>,
    cache: RwLock<HashMap<AddressSource, Slot>>,
}

impl IpLookup {
    /// Create a lookup over the given endpoints and interface table
    pub fn new(
        services: Vec<Arc<dyn DiscoveryService>>,
        interfaces: Arc<dyn InterfaceAddresses>,
    ) -> Self {
        Self {
            services,
            interfaces,
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// Create a lookup using the system interface table
    pub fn with_system_interfaces(services: Vec<Arc<dyn DiscoveryService>>) -> Self {
        Self::new(services, Arc::new(SystemInterfaces))
    }

    /// Current public address for `record_type`, optionally via `interface`
    ///
    /// Never fails: discovery problems degrade to the last known value, or
    /// `None` when nothing was ever discovered for this key.
    pub async fn resolve(
        &self,
        record_type: RecordType,
        interface: Option<&str>,
    ) -> Option<IpAddr> {
        let key = AddressSource::new(record_type, interface);
        let slot = self.slot(&key).await;
        let mut entry = slot.lock().await;

        if let Some(cached) = *entry
            && cached.is_fresh(Instant::now())
        {
            debug!(
                "Using cached {} address {} for {:?}",
                record_type, cached.ip, key.interface
            );
            return Some(cached.ip);
        }

        match self.discover(&key).await {
            Some(ip) => {
                if entry.is_none_or(|previous| previous.ip != ip) {
                    info!("Public {} address is now {}", record_type, ip);
                }
                *entry = Some(CacheEntry {
                    ip,
                    retrieved: Instant::now(),
                });
                Some(ip)
            }
            None => {
                warn!(
                    "Failed to discover public {} address (interface: {:?}), keeping {:?}",
                    record_type,
                    key.interface,
                    entry.map(|e| e.ip)
                );
                entry.map(|e| e.ip)
            }
        }
    }

    /// Last stored entry for a key, fresh or not, without any discovery
    pub async fn cached(
        &self,
        record_type: RecordType,
        interface: Option<&str>,
    ) -> Option<CacheEntry> {
        let key = AddressSource::new(record_type, interface);
        let slot = self.cache.read().await.get(&key).cloned()?;
        let entry = *slot.lock().await;
        entry
    }

    async fn slot(&self, key: &AddressSource) -> Slot {
        if let Some(slot) = self.cache.read().await.get(key) {
            return Arc::clone(slot);
        }
        let mut cache = self.cache.write().await;
        Arc::clone(cache.entry(key.clone()).or_default())
    }

    /// Try every endpoint from every candidate source address
    async fn discover(&self, key: &AddressSource) -> Option<IpAddr> {
        let sources: Vec<Option<IpAddr>> = match key.interface.as_deref() {
            Some(name) => {
                let addrs =
                    interfaces::source_addresses(self.interfaces.as_ref(), key.record_type, name);
                if addrs.is_empty() {
                    debug!(
                        "No usable {} addresses on {}, using default route",
                        key.record_type, name
                    );
                    vec![None]
                } else {
                    addrs.into_iter().map(Some).collect()
                }
            }
            None => vec![None],
        };

        let mut services = self.services.clone();
        services.shuffle(&mut rand::rng());

        for service in &services {
            for source in &sources {
                match service.discover(key.record_type, *source).await {
                    Ok(ip) if key.record_type.matches(&ip) => {
                        debug!("{} reported {} (source: {:?})", service.name(), ip, source);
                        return Some(ip);
                    }
                    Ok(ip) => {
                        debug!(
                            "{} reported {} which is not a {} address",
                            service.name(),
                            ip,
                            key.record_type
                        );
                    }
                    Err(e) => {
                        debug!("{} failed (source: {:?}): {}", service.name(), source, e);
                    }
                }
            }
        }

        None
    }
}
