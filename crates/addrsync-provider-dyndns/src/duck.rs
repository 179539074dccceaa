//! Duck DNS
//!
//! See <https://www.duckdns.org/install.jsp>. The reply body is `OK` or `KO`.

use addrsync_core::config::ServiceConfig;
use addrsync_core::traits::{RecordService, RecordServiceFactory};
use addrsync_core::{Error, RecordType, Result, SubmitError};
use async_trait::async_trait;
use std::net::IpAddr;
use std::time::Duration;

const DUCK_API_BASE: &str = "https://www.duckdns.org";

/// Cooldown after Duck DNS rejects an update
const COOLDOWN: Duration = Duration::from_secs(15 * 60);

/// One `<subname>.duckdns.org` record
pub struct DuckService {
    subname: String,
    /// ⚠️ NEVER log this value
    token: String,
    base_url: String,
    client: reqwest::Client,
}

impl std::fmt::Debug for DuckService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DuckService")
            .field("subname", &self.subname)
            .field("token", &"<REDACTED>")
            .finish()
    }
}

impl DuckService {
    pub fn new(subname: impl Into<String>, token: impl Into<String>) -> Result<Self> {
        Ok(Self {
            subname: subname.into(),
            token: token.into(),
            base_url: DUCK_API_BASE.to_string(),
            client: crate::http_client()?,
        })
    }

    /// Send requests to another server
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }
}

#[async_trait]
impl RecordService for DuckService {
    async fn submit(
        &self,
        _record_type: RecordType,
        ip: IpAddr,
    ) -> std::result::Result<(), SubmitError> {
        let ip = ip.to_string();
        let response = self
            .client
            .get(format!("{}/update", self.base_url))
            .query(&[
                ("domains", self.subname.as_str()),
                ("token", self.token.as_str()),
                ("ip", ip.as_str()),
            ])
            .send()
            .await
            .map_err(|e| {
                SubmitError::next_tick(Error::http(format!("HTTP request failed: {}", e)))
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(SubmitError::cooldown(
                Error::service("duck", format!("bad response code: {}", status)),
                COOLDOWN,
            ));
        }

        let body = response
            .text()
            .await
            .map_err(|e| {
                SubmitError::next_tick(Error::http(format!("Failed to read response: {}", e)))
            })?;

        if crate::status_word(&body) == "KO" {
            return Err(SubmitError::cooldown(
                Error::service("duck", "update rejected (KO)"),
                COOLDOWN,
            ));
        }

        Ok(())
    }

    fn identifier(&self) -> String {
        format!("{}.duckdns.org", self.subname)
    }

    fn supports_record_type(&self, _record_type: RecordType) -> bool {
        true
    }
}

/// Factory for creating Duck DNS services
pub struct DuckFactory;

impl RecordServiceFactory for DuckFactory {
    fn create(&self, config: &ServiceConfig) -> Result<Box<dyn RecordService>> {
        match config {
            ServiceConfig::Duck { subname, token } => {
                config.validate()?;
                Ok(Box::new(DuckService::new(subname.clone(), token.clone())?))
            }
            _ => Err(Error::config("Invalid config for Duck DNS service")),
        }
    }
}
