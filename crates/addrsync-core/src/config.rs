//! Configuration types for addrsync
//!
//! These structures are the neutral, decoded form of the configuration file.
//! They carry strings where the typed form needs parsing (record type,
//! offsets, MAC addresses); turning them into live [`Updater`]s, with all
//! semantic checks, is done by [`Updaters::from_config`].
//!
//! [`Updater`]: crate::updater::Updater
//! [`Updaters::from_config`]: crate::updater::Updaters::from_config
//!
//! ## File Format
//!
//! ```yaml
//! records:
//!   - service: duck
//!     subname: myhost
//!     token: 00000000-0000-0000-0000-000000000000
//!     type: AAAA
//!     interface: eth0
//!     ip_slaac: "00:00:5e:00:53:01"
//! ```

use serde::{Deserialize, Serialize};

/// Main configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DdnsConfig {
    /// DNS records to manage
    #[serde(default)]
    pub records: Vec<RecordConfig>,
}

impl DdnsConfig {
    /// Decode a configuration from YAML text
    pub fn from_yaml_str(text: &str) -> Result<Self, crate::Error> {
        Ok(serde_yaml::from_str(text)?)
    }

    /// Validate the structural parts of the configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.records.is_empty() {
            return Err(crate::Error::config("No records configured"));
        }

        for record in &self.records {
            record.service.validate()?;
        }

        Ok(())
    }
}

/// One managed DNS record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordConfig {
    /// Which service owns the record, with its credentials
    #[serde(flatten)]
    pub service: ServiceConfig,

    /// Record type: `A` or `AAAA`
    #[serde(rename = "type")]
    pub record_type: String,

    /// Local interface to originate discovery requests from
    #[serde(default)]
    pub interface: Option<String>,

    /// Literal address added to the masked public address
    #[serde(default)]
    pub ip_offset: Option<String>,

    /// MAC address whose EUI-64 identifier is added to the masked public
    /// address; implies 64 mask bits
    #[serde(default)]
    pub ip_slaac: Option<String>,

    /// Number of low-order bits cleared from the public address
    #[serde(default)]
    pub ip_mask_bits: Option<u32>,
}

impl RecordConfig {
    /// Create a record configuration with no interface, offset or mask
    pub fn new(service: ServiceConfig, record_type: impl Into<String>) -> Self {
        Self {
            service,
            record_type: record_type.into(),
            interface: None,
            ip_offset: None,
            ip_slaac: None,
            ip_mask_bits: None,
        }
    }

    /// Bind discovery to a local interface
    pub fn with_interface(mut self, interface: impl Into<String>) -> Self {
        self.interface = Some(interface.into());
        self
    }

    /// Set a literal offset and mask
    pub fn with_offset(mut self, offset: impl Into<String>, mask_bits: u32) -> Self {
        self.ip_offset = Some(offset.into());
        self.ip_mask_bits = Some(mask_bits);
        self
    }

    /// Derive the offset from a MAC address
    pub fn with_slaac(mut self, mac: impl Into<String>) -> Self {
        self.ip_slaac = Some(mac.into());
        self
    }
}

/// Record service configuration, selected by the `service` key
///
/// The tag is lowercase; the capitalized and uppercase spellings are also accepted.
#[derive(Clone, Serialize, Deserialize)]
#[serde(tag = "service", rename_all = "lowercase")]
pub enum ServiceConfig {
    /// Cloudflare API v4
    #[serde(alias = "Cloudflare", alias = "CloudFlare", alias = "CLOUDFLARE")]
    Cloudflare {
        /// Scoped API token
        #[serde(default)]
        api_token: Option<String>,
        /// Global API key (used together with `api_email`)
        #[serde(default)]
        api_key: Option<String>,
        /// Account email for `api_key`
        #[serde(default)]
        api_email: Option<String>,
        /// Zone containing the record
        zone_id: String,
        /// Record to overwrite
        record_id: String,
        /// Fully-qualified record name
        name: String,
        /// Record TTL in seconds; absent or not positive means automatic
        #[serde(default)]
        ttl: Option<i64>,
    },

    /// Duck DNS
    #[serde(alias = "Duck", alias = "DUCK")]
    Duck {
        /// Subdomain below duckdns.org
        subname: String,
        /// Account token
        token: String,
    },

    /// Google Domains dynamic DNS
    #[serde(alias = "Google", alias = "GOOGLE")]
    Google {
        /// Generated username
        username: String,
        /// Generated password
        password: String,
        /// Fully-qualified host name
        hostname: String,
    },

    /// No-IP protocol, spoken by many providers
    #[serde(alias = "NoIP", alias = "NoIp", alias = "Noip", alias = "NOIP")]
    NoIp {
        /// Account username
        username: String,
        /// Account password
        password: String,
        /// Fully-qualified host name
        hostname: String,
        /// Update URL; defaults to No-IP's own
        #[serde(default)]
        endpoint: Option<String>,
    },
}

impl ServiceConfig {
    /// Validate the service configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        match self {
            ServiceConfig::Cloudflare {
                api_token,
                api_key,
                api_email,
                zone_id,
                record_id,
                name,
                ..
            } => {
                let has_token = api_token.as_deref().is_some_and(|t| !t.is_empty());
                let has_key = api_key.as_deref().is_some_and(|k| !k.is_empty())
                    && api_email.as_deref().is_some_and(|e| !e.is_empty());
                if !has_token && !has_key {
                    return Err(crate::Error::config(
                        "Cloudflare requires api_token, or api_key and api_email",
                    ));
                }
                require("zone_id", zone_id)?;
                require("record_id", record_id)?;
                require("name", name)
            }
            ServiceConfig::Duck { subname, token } => {
                require("subname", subname)?;
                require("token", token)
            }
            ServiceConfig::Google {
                username,
                password,
                hostname,
            }
            | ServiceConfig::NoIp {
                username,
                password,
                hostname,
                ..
            } => {
                require("username", username)?;
                require("password", password)?;
                require("hostname", hostname)
            }
        }
    }

    /// Get the service type name
    pub fn type_name(&self) -> &'static str {
        match self {
            ServiceConfig::Cloudflare { .. } => "cloudflare",
            ServiceConfig::Duck { .. } => "duck",
            ServiceConfig::Google { .. } => "google",
            ServiceConfig::NoIp { .. } => "noip",
        }
    }
}

fn require(field: &str, value: &str) -> Result<(), crate::Error> {
    if value.trim().is_empty() {
        return Err(crate::Error::config(format!("{} cannot be empty", field)));
    }
    Ok(())
}

// Credentials never appear in Debug output
impl std::fmt::Debug for ServiceConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        const REDACTED: &str = "<REDACTED>";
        match self {
            ServiceConfig::Cloudflare {
                zone_id,
                record_id,
                name,
                ttl,
                ..
            } => f
                .debug_struct("Cloudflare")
                .field("credentials", &REDACTED)
                .field("zone_id", zone_id)
                .field("record_id", record_id)
                .field("name", name)
                .field("ttl", ttl)
                .finish(),
            ServiceConfig::Duck { subname, .. } => f
                .debug_struct("Duck")
                .field("subname", subname)
                .field("token", &REDACTED)
                .finish(),
            ServiceConfig::Google { hostname, .. } => f
                .debug_struct("Google")
                .field("credentials", &REDACTED)
                .field("hostname", hostname)
                .finish(),
            ServiceConfig::NoIp {
                hostname, endpoint, ..
            } => f
                .debug_struct("NoIp")
                .field("credentials", &REDACTED)
                .field("hostname", hostname)
                .field("endpoint", endpoint)
                .finish(),
        }
    }
}
