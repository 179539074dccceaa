//! No-IP update protocol
//!
//! Also spoken by many other providers and routers; the endpoint is
//! configurable. See <https://www.noip.com/integrate/request>.
//!
//! ## Reply Codes
//!
//! | Reply             | Meaning                        | Retry      |
//! |-------------------|--------------------------------|------------|
//! | `good`, `nochg`   | accepted                       |            |
//! | `911`, empty      | temporary outage               | 30 minutes |
//! | anything else     | fatal for this configuration   | never      |

use addrsync_core::config::ServiceConfig;
use addrsync_core::traits::{RecordService, RecordServiceFactory};
use addrsync_core::{Error, RecordType, Result, SubmitError};
use async_trait::async_trait;
use std::net::IpAddr;
use std::time::Duration;

use crate::BasicAuth;

/// Default update endpoint
pub const NOIP_ENDPOINT: &str = "https://dynupdate.no-ip.com/nic/update";

/// Cooldown after a temporary outage
const COOLDOWN: Duration = Duration::from_secs(30 * 60);

const NOT_AGAIN: &str = "Will not attempt further updates.";

/// One host on a No-IP protocol endpoint
pub struct NoIpService {
    auth: BasicAuth,
    hostname: String,
    endpoint: String,
    client: reqwest::Client,
}

impl std::fmt::Debug for NoIpService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NoIpService")
            .field("username", &self.auth.username)
            .field("password", &"<REDACTED>")
            .field("hostname", &self.hostname)
            .field("endpoint", &self.endpoint)
            .finish()
    }
}

impl NoIpService {
    pub fn new(
        username: impl Into<String>,
        password: impl Into<String>,
        hostname: impl Into<String>,
        endpoint: Option<String>,
    ) -> Result<Self> {
        Ok(Self {
            auth: BasicAuth {
                username: username.into(),
                password: password.into(),
            },
            hostname: hostname.into(),
            endpoint: endpoint
                .filter(|e| !e.trim().is_empty())
                .unwrap_or_else(|| NOIP_ENDPOINT.to_string()),
            client: crate::http_client()?,
        })
    }

    /// Endpoint updates are sent to
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

/// Map a refusal to an error and retry advice
fn refusal(code: &str) -> SubmitError {
    match code {
        "911" | "" => SubmitError::cooldown(Error::service("noip", "Temporary outage."), COOLDOWN),
        "nohost" => SubmitError::permanent(Error::service(
            "noip",
            format!("Hostname supplied does not exist under specified account. {}", NOT_AGAIN),
        )),
        "badauth" => SubmitError::permanent(Error::auth(format!(
            "Invalid username password combination. {}",
            NOT_AGAIN
        ))),
        "badagent" => SubmitError::permanent(Error::service(
            "noip",
            format!("Client disabled. {}", NOT_AGAIN),
        )),
        "abuse" => SubmitError::permanent(Error::service(
            "noip",
            format!("Username is blocked due to abuse. {}", NOT_AGAIN),
        )),
        other => SubmitError::permanent(Error::service(
            "noip",
            format!("Fatal error: {}. {}", other, NOT_AGAIN),
        )),
    }
}

#[async_trait]
impl RecordService for NoIpService {
    async fn submit(
        &self,
        _record_type: RecordType,
        ip: IpAddr,
    ) -> std::result::Result<(), SubmitError> {
        let (status, body) =
            crate::nic_update(&self.client, &self.endpoint, &self.auth, &self.hostname, ip).await?;
        let code = crate::status_word(&body);

        if status.is_success() && matches!(code, "good" | "nochg") {
            return Ok(());
        }

        Err(refusal(code))
    }

    fn identifier(&self) -> String {
        self.hostname.clone()
    }

    fn supports_record_type(&self, _record_type: RecordType) -> bool {
        true
    }
}

/// Factory for creating No-IP protocol services
pub struct NoIpFactory;

impl RecordServiceFactory for NoIpFactory {
    fn create(&self, config: &ServiceConfig) -> Result<Box<dyn RecordService>> {
        match config {
            ServiceConfig::NoIp {
                username,
                password,
                hostname,
                endpoint,
            } => {
                config.validate()?;
                Ok(Box::new(NoIpService::new(
                    username.clone(),
                    password.clone(),
                    hostname.clone(),
                    endpoint.clone(),
                )?))
            }
            _ => Err(Error::config("Invalid config for No-IP service")),
        }
    }
}
