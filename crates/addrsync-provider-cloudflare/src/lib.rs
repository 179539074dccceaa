// # Cloudflare Record Service
//
// Overwrites one existing Cloudflare DNS record through API v4.
//
// ## Behavior
//
// - ✅ One PUT per submission, to a record addressed by zone and record ID
// - ✅ API token (bearer) or global API key + account email
// - ✅ HTTP timeout configured (30 seconds)
// - ✅ Status codes (401, 403, 404, 409, 429, 5xx) mapped to specific errors
// - ❌ NO retry or backoff (the cooldown is owned by `Updater`)
// - ❌ NO record lookup or creation (the record must already exist)
//
// ## Failure Mapping
//
// | Failure                                  | Retry            |
// |------------------------------------------|------------------|
// | Transport (connect, timeout, TLS)        | next tick        |
// | Non-2xx status                           | 15 minutes       |
// | 2xx with `"success": false`              | 15 minutes       |
//
// ## Security Requirements
//
// - Credentials NEVER appear in logs or `Debug` output
//
// ## API Reference
//
// - Cloudflare API v4: https://developers.cloudflare.com/api/
// - Overwrite DNS Record: PUT `/zones/:zone_id/dns_records/:record_id`

use addrsync_core::config::ServiceConfig;
use addrsync_core::traits::{RecordService, RecordServiceFactory};
use addrsync_core::{Error, RecordType, Result, ServiceRegistry, SubmitError};
use async_trait::async_trait;
use serde::Deserialize;
use std::net::IpAddr;
use std::time::Duration;

/// Cloudflare API base URL
const CLOUDFLARE_API_BASE: &str = "https://api.cloudflare.com/client/v4";

/// Default HTTP timeout for API requests (30 seconds)
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Cooldown after the API rejects an update
const COOLDOWN: Duration = Duration::from_secs(15 * 60);

/// TTL value meaning "automatic"
const AUTOMATIC_TTL: i64 = 1;

/// How requests are authenticated
#[derive(Clone)]
pub enum Credentials {
    /// Scoped API token, sent as a bearer token
    Token(String),
    /// Global API key with the account email
    Key { key: String, email: String },
}

/// Cloudflare record service
///
/// # Trust Level: Untrusted
///
/// Stateless and single-shot; whether and when to submit is decided by the
/// caller.
pub struct CloudflareService {
    /// ⚠️ NEVER log this value
    credentials: Credentials,
    zone_id: String,
    record_id: String,
    name: String,
    ttl: i64,
    base_url: String,
    client: reqwest::Client,
}

// Custom Debug implementation that hides the credentials
impl std::fmt::Debug for CloudflareService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CloudflareService")
            .field("credentials", &"<REDACTED>")
            .field("zone_id", &self.zone_id)
            .field("record_id", &self.record_id)
            .field("name", &self.name)
            .field("ttl", &self.ttl)
            .finish()
    }
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    success: bool,
    #[serde(default)]
    errors: Vec<ApiMessage>,
}

#[derive(Debug, Deserialize)]
struct ApiMessage {
    #[serde(default)]
    code: i64,
    #[serde(default)]
    message: String,
}

impl CloudflareService {
    /// Create a service for one record
    ///
    /// # Parameters
    ///
    /// - `credentials`: How to authenticate
    /// - `zone_id`, `record_id`: Which record to overwrite
    /// - `name`: Fully-qualified record name, sent with every update
    /// - `ttl`: Record TTL in seconds; `None` or not positive means automatic
    pub fn new(
        credentials: Credentials,
        zone_id: impl Into<String>,
        record_id: impl Into<String>,
        name: impl Into<String>,
        ttl: Option<i64>,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(DEFAULT_HTTP_TIMEOUT)
            .build()
            .map_err(|e| Error::http(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            credentials,
            zone_id: zone_id.into(),
            record_id: record_id.into(),
            name: name.into(),
            ttl: ttl.filter(|ttl| *ttl > 0).unwrap_or(AUTOMATIC_TTL),
            base_url: CLOUDFLARE_API_BASE.to_string(),
            client,
        })
    }

    /// Send requests to another API root
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// TTL sent with updates
    pub fn ttl(&self) -> i64 {
        self.ttl
    }

    fn record_url(&self) -> String {
        format!(
            "{}/zones/{}/dns_records/{}",
            self.base_url, self.zone_id, self.record_id
        )
    }

    fn authenticate(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.credentials {
            Credentials::Token(token) => request.bearer_auth(token),
            Credentials::Key { key, email } => request
                .header("X-Auth-Key", key)
                .header("X-Auth-Email", email),
        }
    }
}

fn rejected(error: Error) -> SubmitError {
    SubmitError::cooldown(error, COOLDOWN)
}

fn status_error(status: reqwest::StatusCode, body: &str) -> Error {
    match status.as_u16() {
        401 | 403 => Error::auth(format!(
            "Invalid credentials or insufficient permissions. Status: {}",
            status
        )),
        404 => Error::service("cloudflare", "DNS record not found"),
        409 => Error::service(
            "cloudflare",
            format!("Conflict: Record is being updated by another process. Status: {}", status),
        ),
        429 => Error::service(
            "cloudflare",
            format!("Rate limit exceeded. Status: {}", status),
        ),
        500..=599 => Error::service(
            "cloudflare",
            format!("Cloudflare server error: {} - {}", status, body),
        ),
        _ => Error::service(
            "cloudflare",
            format!("Failed to update record: {} - {}", status, body),
        ),
    }
}

#[async_trait]
impl RecordService for CloudflareService {
    async fn submit(
        &self,
        record_type: RecordType,
        ip: IpAddr,
    ) -> std::result::Result<(), SubmitError> {
        let payload = serde_json::json!({
            "type": record_type.as_str(),
            "name": self.name,
            "content": ip.to_string(),
            "ttl": self.ttl,
        });

        tracing::debug!("PUT {} ({} {})", self.record_url(), record_type, ip);

        let response = self
            .authenticate(self.client.put(self.record_url()))
            .json(&payload)
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

        if !status.is_success() {
            return Err(rejected(status_error(status, &body)));
        }

        let reply: ApiResponse = serde_json::from_str(&body).map_err(|e| {
            rejected(Error::service(
                "cloudflare",
                format!("Failed to parse response: {}", e),
            ))
        })?;

        if !reply.success {
            let detail = reply
                .errors
                .iter()
                .map(|e| format!("{} ({})", e.message, e.code))
                .collect::<Vec<_>>()
                .join("; ");
            return Err(rejected(Error::service(
                "cloudflare",
                format!("API reported failure: {}", detail),
            )));
        }

        tracing::debug!("Cloudflare accepted {} for {}", ip, self.name);
        Ok(())
    }

    fn identifier(&self) -> String {
        self.name.clone()
    }

    fn supports_record_type(&self, _record_type: RecordType) -> bool {
        true
    }
}

/// Factory for creating Cloudflare services
pub struct CloudflareFactory;

impl RecordServiceFactory for CloudflareFactory {
    fn create(&self, config: &ServiceConfig) -> Result<Box<dyn RecordService>> {
        match config {
            ServiceConfig::Cloudflare {
                api_token,
                api_key,
                api_email,
                zone_id,
                record_id,
                name,
                ttl,
            } => {
                config.validate()?;

                let credentials = match (api_token, api_key, api_email) {
                    (Some(token), _, _) if !token.is_empty() => Credentials::Token(token.clone()),
                    (_, Some(key), Some(email)) if !key.is_empty() && !email.is_empty() => {
                        Credentials::Key {
                            key: key.clone(),
                            email: email.clone(),
                        }
                    }
                    _ => {
                        return Err(Error::config(
                            "Cloudflare requires api_token, or api_key and api_email",
                        ));
                    }
                };

                Ok(Box::new(CloudflareService::new(
                    credentials,
                    zone_id.clone(),
                    record_id.clone(),
                    name.clone(),
                    *ttl,
                )?))
            }
            _ => Err(Error::config("Invalid config for Cloudflare service")),
        }
    }
}

/// Register the Cloudflare service with a registry
///
/// # Example
///
/// ```rust
/// use addrsync_core::ServiceRegistry;
///
/// let registry = ServiceRegistry::new();
/// addrsync_provider_cloudflare::register(&registry);
/// assert!(registry.has_service("cloudflare"));
/// ```
pub fn register(registry: &ServiceRegistry) {
    registry.register_service("cloudflare", Box::new(CloudflareFactory));
}
