// # addrsync-core
//
// Core library for keeping dynamic DNS records in sync with this machine's
// public addresses.
//
// ## Architecture Overview
//
// - **arith**: Address masking, addition and SLAAC host identifiers
// - **IpLookup**: Shared, staleness-aware public address cache
// - **DiscoveryService**: Trait for "what is my IP" endpoints
// - **RecordService**: Trait for writing one DNS record at a provider
// - **Updater / Updaters**: Per-record reconciliation with provider cooldowns
// - **ServiceRegistry**: Plugin-based registry for record services
//
// ## Design Principles
//
// 1. **Separation of Concerns**: Core logic knows no provider or endpoint
// 2. **Level-Triggered**: Every tick recomputes the desired value; retries
//    fall out of the next tick
// 3. **Plugin-Based**: Services are registered by name, no hardcoded match
// 4. **Library-First**: The daemon is a thin loop around `Updaters`

pub mod arith;
pub mod config;
pub mod error;
pub mod lookup;
pub mod record;
pub mod registry;
pub mod traits;
pub mod updater;

// Re-export core types for convenience
pub use config::{DdnsConfig, RecordConfig, ServiceConfig};
pub use error::{Error, Result, RetryAfter, SubmitError};
pub use lookup::{AddressSource, CacheEntry, InterfaceAddresses, IpLookup, SystemInterfaces};
pub use record::RecordType;
pub use registry::ServiceRegistry;
pub use traits::{DiscoveryService, RecordService, RecordServiceFactory};
pub use updater::{UpdateOutcome, Updater, Updaters};
