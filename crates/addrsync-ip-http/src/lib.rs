// # HTTP Discovery Endpoints
//
// This crate asks public "what is my IP" services which address our
// requests arrive from.
//
// ## Architecture
//
// Each endpoint has one URL per address family. A request is a plain GET
// whose body is the caller's address as text. Requests can be bound to a
// local source address so the answer reflects a particular interface.
//
// Caching, endpoint rotation and fallback live in
// `addrsync_core::lookup::IpLookup`; this crate performs single requests.

use addrsync_core::traits::DiscoveryService;
use addrsync_core::{Error, RecordType, Result};

use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;

/// Per-request timeout
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Built-in endpoints: (name, IPv4 URL, IPv6 URL)
const DEFAULT_ENDPOINTS: &[(&str, &str, &str)] = &[
    ("icanhazip", "https://v4.icanhazip.com/", "https://v6.icanhazip.com/"),
    ("ipify", "https://api.ipify.org/", "https://api6.ipify.org/"),
    (
        "wtfismyip",
        "https://ipv4.wtfismyip.com/text",
        "https://ipv6.wtfismyip.com/text",
    ),
];

/// A plain-text echo endpoint
pub struct HttpDiscovery {
    name: String,
    v4_url: String,
    v6_url: String,
    timeout: Duration,

    /// Client for requests without a source address
    client: reqwest::Client,
}

impl HttpDiscovery {
    /// Create an endpoint
    ///
    /// # Parameters
    ///
    /// - `name`: Endpoint name used in logs
    /// - `v4_url`: URL answering over IPv4 only
    /// - `v6_url`: URL answering over IPv6 only
    pub fn new(
        name: impl Into<String>,
        v4_url: impl Into<String>,
        v6_url: impl Into<String>,
    ) -> Self {
        Self::with_timeout(name, v4_url, v6_url, REQUEST_TIMEOUT)
    }

    /// Create an endpoint with a custom request timeout
    pub fn with_timeout(
        name: impl Into<String>,
        v4_url: impl Into<String>,
        v6_url: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            name: name.into(),
            v4_url: v4_url.into(),
            v6_url: v6_url.into(),
            timeout,
            client: reqwest::Client::builder()
                .timeout(timeout)
                .build()
                .unwrap_or_default(),
        }
    }

    /// URL queried for the given family
    pub fn url(&self, record_type: RecordType) -> &str {
        match record_type {
            RecordType::A => &self.v4_url,
            RecordType::Aaaa => &self.v6_url,
        }
    }

    fn client_for(&self, source: Option<IpAddr>) -> Result<reqwest::Client> {
        match source {
            None => Ok(self.client.clone()),
            Some(source) => reqwest::Client::builder()
                .timeout(self.timeout)
                .local_address(source)
                .build()
                .map_err(|e| {
                    Error::discovery(format!("{}: cannot bind to {}: {}", self.name, source, e))
                }),
        }
    }
}

/// The built-in endpoints, ready for `IpLookup`
pub fn default_services() -> Vec<Arc<dyn DiscoveryService>> {
    DEFAULT_ENDPOINTS
        .iter()
        .map(|(name, v4, v6)| {
            Arc::new(HttpDiscovery::new(*name, *v4, *v6)) as Arc<dyn DiscoveryService>
        })
        .collect()
}

#[async_trait::async_trait]
impl DiscoveryService for HttpDiscovery {
    async fn discover(&self, record_type: RecordType, source: Option<IpAddr>) -> Result<IpAddr> {
        let url = self.url(record_type);
        let client = self.client_for(source)?;

        tracing::debug!("Querying {} for {} address (source: {:?})", url, record_type, source);

        let response = client
            .get(url)
            .send()
            .await
            .map_err(|e| Error::discovery(format!("{}: request failed: {}", self.name, e)))?;

        if !response.status().is_success() {
            return Err(Error::discovery(format!(
                "{}: HTTP error: {}",
                self.name,
                response.status()
            )));
        }

        let body = response
            .text()
            .await
            .map_err(|e| {
                Error::discovery(format!("{}: failed to read response: {}", self.name, e))
            })?;
        let text = body.trim();

        let ip: IpAddr = text
            .parse()
            .map_err(|_| {
                Error::discovery(format!("{}: invalid IP address: {:?}", self.name, text))
            })?;

        if !record_type.matches(&ip) {
            return Err(Error::discovery(format!(
                "{}: expected {} address, got {}",
                self.name, record_type, ip
            )));
        }

        Ok(ip)
    }

    fn name(&self) -> &str {
        &self.name
    }
}
