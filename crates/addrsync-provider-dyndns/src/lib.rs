// # Query-String Dynamic DNS Services
//
// Services whose whole update protocol is one HTTP request carrying the
// hostname and address in the query string, answered with a short text
// status.
//
// ## Services
//
// - `duck`: Duck DNS (`GET /update?domains=&token=&ip=`)
// - `google`: Google Domains dynamic DNS (`POST /nic/update`, basic auth)
// - `noip`: No-IP and compatible `nic/update` endpoints (basic auth)
//
// ## Trust Level: Untrusted
//
// - ✅ One request per submission
// - ❌ NO retry or backoff (the cooldown is owned by `Updater`)

pub mod duck;
pub mod google;
pub mod noip;

pub use duck::{DuckFactory, DuckService};
pub use google::{GoogleFactory, GoogleService};
pub use noip::{NoIpFactory, NoIpService};

use addrsync_core::{Error, Result, ServiceRegistry};
use std::time::Duration;

/// Default HTTP timeout for update requests
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// User agent sent to services that require one
pub fn user_agent() -> String {
    format!(
        "addrsync/{} ({}-{})",
        env!("CARGO_PKG_VERSION"),
        std::env::consts::OS,
        std::env::consts::ARCH
    )
}

fn http_client() -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(DEFAULT_HTTP_TIMEOUT)
        .user_agent(user_agent())
        .build()
        .map_err(|e| Error::http(format!("Failed to build HTTP client: {}", e)))
}

/// Credentials for `nic/update` style endpoints
#[derive(Clone)]
pub(crate) struct BasicAuth {
    pub(crate) username: String,
    /// ⚠️ NEVER log this value
    pub(crate) password: String,
}

/// POST `endpoint?hostname=..&myip=..` and return the status with the body
///
/// Transport failures come back as retryable on the next tick.
pub(crate) async fn nic_update(
    client: &reqwest::Client,
    endpoint: &str,
    auth: &BasicAuth,
    hostname: &str,
    ip: std::net::IpAddr,
) -> std::result::Result<(reqwest::StatusCode, String), addrsync_core::SubmitError> {
    use addrsync_core::SubmitError;

    let ip = ip.to_string();
    let response = client
        .post(endpoint)
        .query(&[("hostname", hostname), ("myip", ip.as_str())])
        .basic_auth(&auth.username, Some(&auth.password))
        .send()
        .await
        .map_err(|e| {
            SubmitError::next_tick(Error::http(format!("HTTP request failed: {}", e)))
        })?;

    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|e| {
            SubmitError::next_tick(Error::http(format!("Failed to read response: {}", e)))
        })?;

    tracing::debug!("{} replied {}: {:?}", endpoint, status, body.trim());
    Ok((status, body))
}

/// First word of a text status reply, e.g. `good` in `good 203.0.113.5`
fn status_word(body: &str) -> &str {
    body.split_whitespace().next().unwrap_or("")
}

/// Register every service in this crate
///
/// # Example
///
/// ```rust
/// use addrsync_core::ServiceRegistry;
///
/// let registry = ServiceRegistry::new();
/// addrsync_provider_dyndns::register(&registry);
/// assert_eq!(registry.list_services(), vec!["duck", "google", "noip"]);
/// ```
pub fn register(registry: &ServiceRegistry) {
    registry.register_service("duck", Box::new(DuckFactory));
    registry.register_service("google", Box::new(GoogleFactory));
    registry.register_service("noip", Box::new(NoIpFactory));
}
