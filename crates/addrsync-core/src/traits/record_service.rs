// # Record Service Trait
//
// Defines the interface for writing a new value to a single DNS record held
// by a dynamic DNS service.
//
// ## Implementations
//
// - Cloudflare: `addrsync-provider-cloudflare` crate
// - Duck DNS, Google Domains, No-IP protocol: `addrsync-provider-dyndns` crate
//
// ## Usage
//
// ```rust,ignore
// use addrsync_core::{RecordService, RecordType};
//
// let service = /* RecordService implementation */;
// if let Err(e) = service.submit(RecordType::A, "203.0.113.5".parse()?).await {
//     println!("{} failed, retry {}", service.identifier(), e.retry);
// }
// ```

use async_trait::async_trait;
use std::net::IpAddr;

use crate::error::SubmitError;
use crate::record::RecordType;

/// Trait for record service implementations
///
/// A record service owns exactly one DNS record and knows how to overwrite
/// its value. It is consumed by [`Updater`](crate::updater::Updater), which
/// decides *whether* and *when* to call [`submit`](RecordService::submit).
///
/// # Trust Level: Untrusted
///
/// ## Allowed Capabilities
/// - ✅ Perform HTTP/HTTPS API calls to their endpoints only
/// - ✅ Parse provider-specific responses and map error codes to [`RetryAfter`]
///
/// ## Forbidden Capabilities
/// - ❌ Retry or sleep (the cooldown is owned by `Updater`)
/// - ❌ Remember previously submitted values (owned by `Updater`)
/// - ❌ Decide whether an update is needed (owned by `Updater`)
///
/// A provider that knows a failure is hopeless (bad credentials, unknown
/// host, abuse lock) returns [`RetryAfter::Never`] instead of an arbitrarily
/// long delay.
///
/// [`RetryAfter`]: crate::error::RetryAfter
/// [`RetryAfter::Never`]: crate::error::RetryAfter::Never
#[async_trait]
pub trait RecordService: Send + Sync {
    /// Submit a new record value
    ///
    /// Exactly one attempt is made per call. The returned future may be
    /// dropped at any await point.
    ///
    /// # Returns
    ///
    /// - `Ok(())`: The service accepted the value
    /// - `Err(SubmitError)`: The error and when to try again
    async fn submit(&self, record_type: RecordType, ip: IpAddr) -> Result<(), SubmitError>;

    /// Human-readable name of the managed record, for logging only
    fn identifier(&self) -> String;

    /// Whether the service can hold records of this type
    ///
    /// Checked once while building updaters; an unsupported pairing is a
    /// configuration error.
    fn supports_record_type(&self, record_type: RecordType) -> bool;
}

/// Helper trait for constructing record services from configuration
pub trait RecordServiceFactory: Send + Sync {
    /// Create a RecordService instance from configuration
    ///
    /// # Returns
    ///
    /// A boxed RecordService trait object, or a configuration error if the
    /// configuration is for another service or is incomplete
    fn create(
        &self,
        config: &crate::config::ServiceConfig,
    ) -> Result<Box<dyn RecordService>, crate::Error>;
}
