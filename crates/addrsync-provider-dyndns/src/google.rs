//! Google Domains dynamic DNS
//!
//! See <https://support.google.com/domains/answer/6147083>.

use addrsync_core::config::ServiceConfig;
use addrsync_core::traits::{RecordService, RecordServiceFactory};
use addrsync_core::{Error, RecordType, Result, SubmitError};
use async_trait::async_trait;
use std::net::IpAddr;
use std::time::Duration;

use crate::BasicAuth;

const GOOGLE_ENDPOINT: &str = "https://domains.google.com/nic/update";

/// Cooldown after Google rejects an update
const COOLDOWN: Duration = Duration::from_secs(15 * 60);

/// Reply codes that mean the update was refused
const ERROR_CODES: &[&str] = &[
    "nohost", "badauth", "notfqdn", "badagent", "abuse", "911", "conflict",
];

/// One Google Domains dynamic DNS host
pub struct GoogleService {
    auth: BasicAuth,
    hostname: String,
    endpoint: String,
    client: reqwest::Client,
}

impl std::fmt::Debug for GoogleService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GoogleService")
            .field("username", &self.auth.username)
            .field("password", &"<REDACTED>")
            .field("hostname", &self.hostname)
            .finish()
    }
}

impl GoogleService {
    pub fn new(
        username: impl Into<String>,
        password: impl Into<String>,
        hostname: impl Into<String>,
    ) -> Result<Self> {
        Ok(Self {
            auth: BasicAuth {
                username: username.into(),
                password: password.into(),
            },
            hostname: hostname.into(),
            endpoint: GOOGLE_ENDPOINT.to_string(),
            client: crate::http_client()?,
        })
    }

    /// Send requests to another `nic/update` URL
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }
}

/// Human-readable text for a reply code
fn describe(code: &str) -> &'static str {
    match code {
        "nohost" => "The hostname does not exist, or does not have Dynamic DNS enabled.",
        "badauth" => "The username / password combination is not valid for the specified host.",
        "notfqdn" => "The supplied hostname is not a valid fully-qualified domain name.",
        "badagent" => "The client is making bad requests.",
        "abuse" => "Dynamic DNS access for the hostname has been blocked.",
        "911" => "A server error occurred.",
        "conflict" => "A custom record conflicts with the update.",
        _ => "unknown error",
    }
}

#[async_trait]
impl RecordService for GoogleService {
    async fn submit(
        &self,
        _record_type: RecordType,
        ip: IpAddr,
    ) -> std::result::Result<(), SubmitError> {
        let (status, body) =
            crate::nic_update(&self.client, &self.endpoint, &self.auth, &self.hostname, ip).await?;
        let code = crate::status_word(&body);

        if !status.is_success() || ERROR_CODES.contains(&code) {
            let error = if code == "badauth" {
                Error::auth(describe(code))
            } else {
                Error::service("google", format!("{} ({})", describe(code), status))
            };
            return Err(SubmitError::cooldown(error, COOLDOWN));
        }

        Ok(())
    }

    fn identifier(&self) -> String {
        self.hostname.clone()
    }

    fn supports_record_type(&self, _record_type: RecordType) -> bool {
        true
    }
}

/// Factory for creating Google Domains services
pub struct GoogleFactory;

impl RecordServiceFactory for GoogleFactory {
    fn create(&self, config: &ServiceConfig) -> Result<Box<dyn RecordService>> {
        match config {
            ServiceConfig::Google {
                username,
                password,
                hostname,
            } => {
                config.validate()?;
                Ok(Box::new(GoogleService::new(
                    username.clone(),
                    password.clone(),
                    hostname.clone(),
                )?))
            }
            _ => Err(Error::config("Invalid config for Google Domains service")),
        }
    }
}
