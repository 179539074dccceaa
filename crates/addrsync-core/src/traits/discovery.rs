// # Discovery Service Trait
//
// Defines the interface for asking a third party "what address do you see
// me coming from?".
//
// ## Implementations
//
// - icanhazip, ipify, wtfismyip over HTTPS: `addrsync-ip-http` crate

use async_trait::async_trait;
use std::net::IpAddr;

use crate::record::RecordType;

/// Trait for public address discovery endpoints
///
/// Implementations perform a single request and report what came back.
/// They hold no cache; staleness and fallback are owned by
/// [`IpLookup`](crate::lookup::IpLookup).
///
/// # Trust Level: Semi-Trusted
///
/// - ✅ Open outbound connections, optionally bound to a given local address
/// - ❌ Retry, cache, or fall back to other endpoints
#[async_trait]
pub trait DiscoveryService: Send + Sync {
    /// Discover the public address of the requested family
    ///
    /// # Parameters
    ///
    /// - `record_type`: Address family to ask for
    /// - `source`: Local address to originate the request from; `None` lets
    ///   the system pick a route
    ///
    /// # Returns
    ///
    /// - `Ok(IpAddr)`: The address the endpoint reported
    /// - `Err(Error)`: Transport failure, bad status, or unparsable body
    async fn discover(
        &self,
        record_type: RecordType,
        source: Option<IpAddr>,
    ) -> Result<IpAddr, crate::Error>;

    /// Endpoint name (for logging/debugging)
    fn name(&self) -> &str;
}
