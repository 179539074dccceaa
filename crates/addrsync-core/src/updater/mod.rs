//! Record reconciliation
//!
//! An [`Updater`] owns one DNS record. Every tick it works out the value the
//! record should hold and submits it only when that value changed and the
//! service is not cooling down after a failure.
//!
//! ## Tick Flow
//!
//! 1. Resolve the public address through the shared [`IpLookup`]
//! 2. Compute `add(mask(public, mask_bits), offset)`
//! 3. Skip when the value equals the last submitted one
//! 4. Skip when a cooldown is in effect
//! 5. Submit; on success remember the value, on failure start the cooldown
//!    the service asked for
//!
//! Retrying is nothing more than the next tick finding the same unmet value.

use std::net::IpAddr;
use std::sync::Arc;

use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::arith;
use crate::config::{DdnsConfig, RecordConfig};
use crate::error::{Error, Result, RetryAfter};
use crate::lookup::IpLookup;
use crate::record::RecordType;
use crate::registry::ServiceRegistry;
use crate::traits::RecordService;

/// Mask bits implied by a SLAAC offset
const SLAAC_MASK_BITS: u32 = 64;

/// What a single tick decided
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// No public address is known; nothing was done
    Unresolved,

    /// The record already holds the computed value
    Unchanged { ip: IpAddr },

    /// The value changed but the service is cooling down
    CoolingDown { ip: IpAddr },

    /// The service accepted the new value
    Submitted { ip: IpAddr },

    /// The service rejected the new value
    Failed {
        ip: IpAddr,
        error: String,
        retry: RetryAfter,
    },
}

/// Submission gate after a failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Cooldown {
    Until(Instant),
    Forever,
}

/// Reconciler for a single DNS record
pub struct Updater {
    record_type: RecordType,
    interface: Option<String>,
    mask_bits: u32,
    offset: Option<IpAddr>,
    service: Box<dyn RecordService>,
    lookup: Arc<IpLookup>,
    submitted: Option<IpAddr>,
    cooldown: Option<Cooldown>,
}

impl Updater {
    /// Create an updater
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the service cannot hold records of
    /// `record_type`, or if `mask_bits` exceeds 128.
    pub fn new(
        record_type: RecordType,
        service: Box<dyn RecordService>,
        lookup: Arc<IpLookup>,
    ) -> Result<Self> {
        if !service.supports_record_type(record_type) {
            return Err(Error::config(format!(
                "{} does not support {} records",
                service.identifier(),
                record_type
            )));
        }

        Ok(Self {
            record_type,
            interface: None,
            mask_bits: 0,
            offset: None,
            service,
            lookup,
            submitted: None,
            cooldown: None,
        })
    }

    /// Originate discovery from a local interface
    pub fn with_interface(mut self, interface: impl Into<String>) -> Self {
        let interface = interface.into();
        self.interface = (!interface.is_empty()).then_some(interface);
        self
    }

    /// Clear `mask_bits` low-order bits and add `offset`
    ///
    /// An IPv4 offset on an AAAA record is zero-extended; an IPv6 offset on
    /// an A record is rejected.
    pub fn with_offset(mut self, mask_bits: u32, offset: Option<IpAddr>) -> Result<Self> {
        if mask_bits > 128 {
            return Err(Error::config(format!(
                "ip_mask_bits must be between 0 and 128, got {}",
                mask_bits
            )));
        }
        if self.record_type == RecordType::A
            && let Some(offset @ IpAddr::V6(_)) = offset
        {
            return Err(Error::config(format!(
                "offset {} is wider than an A record",
                offset
            )));
        }
        self.mask_bits = mask_bits;
        self.offset = offset;
        Ok(self)
    }

    /// Build an updater from one record entry
    pub fn from_config(
        config: &RecordConfig,
        registry: &ServiceRegistry,
        lookup: Arc<IpLookup>,
    ) -> Result<Self> {
        let record_type: RecordType = config.record_type.parse()?;
        let service = registry.create_service(&config.service)?;
        let (mask_bits, offset) = offset_from_config(config)?;

        let mut updater =
            Self::new(record_type, service, lookup)?.with_offset(mask_bits, offset)?;
        if let Some(interface) = &config.interface {
            updater = updater.with_interface(interface.clone());
        }
        Ok(updater)
    }

    /// Record type managed by this updater
    pub fn record_type(&self) -> RecordType {
        self.record_type
    }

    /// Identifier of the managed record
    pub fn identifier(&self) -> String {
        self.service.identifier()
    }

    /// Value most recently accepted by the service
    pub fn submitted(&self) -> Option<IpAddr> {
        self.submitted
    }

    /// Refresh the record if necessary; call once per tick
    pub async fn update(&mut self) -> UpdateOutcome {
        let Some(ip) = self.target().await else {
            debug!(
                "{} {}: no public address, skipping",
                self.service.identifier(),
                self.record_type
            );
            return UpdateOutcome::Unresolved;
        };

        if self.submitted == Some(ip) {
            return UpdateOutcome::Unchanged { ip };
        }

        if self.cooling_down(Instant::now()) {
            debug!(
                "{} {}: {} pending, cooling down",
                self.service.identifier(),
                self.record_type,
                ip
            );
            return UpdateOutcome::CoolingDown { ip };
        }

        let id = self.service.identifier();
        info!("{} {} ➤ {}", id, self.record_type, ip);

        match self.service.submit(self.record_type, ip).await {
            Ok(()) => {
                self.submitted = Some(ip);
                self.cooldown = None;
                UpdateOutcome::Submitted { ip }
            }
            Err(e) => {
                warn!("{} {} ✗ {}: {}", id, self.record_type, ip, e);
                let until = e
                    .retry
                    .as_duration()
                    .and_then(|delay| Some((delay, Instant::now().checked_add(delay)?)));
                let cooldown = match until {
                    Some((delay, until)) => {
                        warn!(
                            "{} next attempt in {:?} (at {})",
                            id,
                            delay,
                            wall_clock_after(delay)
                        );
                        Cooldown::Until(until)
                    }
                    // A delay past the end of the clock never expires
                    None => {
                        warn!("{} will not attempt further updates", id);
                        Cooldown::Forever
                    }
                };
                self.cooldown = Some(cooldown);
                UpdateOutcome::Failed {
                    ip,
                    error: e.to_string(),
                    retry: e.retry,
                }
            }
        }
    }

    /// Compute and log the record value without submitting it
    pub async fn dry_run(&self) -> Option<IpAddr> {
        let id = self.service.identifier();
        match self.target().await {
            Some(ip) => {
                info!("{} {} ➤ {}", id, self.record_type, ip);
                Some(ip)
            }
            None => {
                warn!("{} {}: failed to look up IP address", id, self.record_type);
                None
            }
        }
    }

    async fn target(&self) -> Option<IpAddr> {
        let raw = self
            .lookup
            .resolve(self.record_type, self.interface.as_deref())
            .await?;
        let masked = arith::mask(raw, self.mask_bits);
        Some(match self.offset {
            Some(offset) => arith::add(masked, offset),
            None => masked,
        })
    }

    fn cooling_down(&self, now: Instant) -> bool {
        match self.cooldown {
            Some(Cooldown::Until(until)) => now < until,
            Some(Cooldown::Forever) => true,
            None => false,
        }
    }
}

impl std::fmt::Debug for Updater {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Updater")
            .field("service", &self.service.identifier())
            .field("record_type", &self.record_type)
            .field("interface", &self.interface)
            .field("mask_bits", &self.mask_bits)
            .field("offset", &self.offset)
            .field("submitted", &self.submitted)
            .field("cooldown", &self.cooldown)
            .finish()
    }
}

/// Mask bits and offset described by a record entry
fn offset_from_config(config: &RecordConfig) -> Result<(u32, Option<IpAddr>)> {
    let mask_bits = config.ip_mask_bits.unwrap_or(0);

    match (config.ip_offset.as_deref(), config.ip_slaac.as_deref()) {
        (Some(_), Some(_)) => Err(Error::config(
            "ip_offset and ip_slaac are mutually exclusive",
        )),
        (Some(offset), None) => {
            let offset: IpAddr = offset
                .trim()
                .parse()
                .map_err(|_| Error::config(format!("malformed ip_offset: {:?}", offset)))?;
            Ok((mask_bits, Some(offset)))
        }
        (None, Some(mac)) => {
            let mac: arith::MacAddr = mac
                .trim()
                .parse()
                .map_err(|e| Error::config(format!("malformed ip_slaac: {}", e)))?;
            if config.ip_mask_bits.is_some_and(|bits| bits != SLAAC_MASK_BITS) {
                return Err(Error::config(format!(
                    "ip_slaac implies {} mask bits, got {}",
                    SLAAC_MASK_BITS, mask_bits
                )));
            }
            Ok((SLAAC_MASK_BITS, Some(IpAddr::V6(arith::slaac_host_bits(mac)))))
        }
        (None, None) => Ok((mask_bits, None)),
    }
}

fn wall_clock_after(delay: std::time::Duration) -> String {
    chrono::Duration::from_std(delay)
        .ok()
        .and_then(|delay| chrono::Utc::now().checked_add_signed(delay))
        .map(|at| at.to_rfc3339())
        .unwrap_or_else(|| "a distant future".to_string())
}

impl std::fmt::Debug for Updaters {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Updaters")
            .field("updaters", &self.updaters)
            .finish()
    }
}

/// All updaters defined by one configuration, sharing one [`IpLookup`]
pub struct Updaters {
    lookup: Arc<IpLookup>,
    updaters: Vec<Updater>,
}

impl Updaters {
    /// Create an empty set around a shared lookup
    pub fn new(lookup: Arc<IpLookup>) -> Self {
        Self {
            lookup,
            updaters: Vec::new(),
        }
    }

    /// Validate a decoded configuration and build its updaters
    ///
    /// Every record is checked before any reconciliation can run: the first
    /// invalid record aborts construction.
    pub fn from_config(
        config: &DdnsConfig,
        registry: &ServiceRegistry,
        lookup: Arc<IpLookup>,
    ) -> Result<Self> {
        config.validate()?;

        let mut updaters = Self::new(lookup);
        for (index, record) in config.records.iter().enumerate() {
            let updater = Updater::from_config(record, registry, updaters.lookup())
                .map_err(|e| match e {
                    Error::Config(msg) => Error::config(format!("record #{}: {}", index + 1, msg)),
                    other => other,
                })?;
            updaters.push(updater);
        }
        Ok(updaters)
    }

    /// The shared lookup
    pub fn lookup(&self) -> Arc<IpLookup> {
        Arc::clone(&self.lookup)
    }

    /// Append an updater
    pub fn push(&mut self, updater: Updater) {
        self.updaters.push(updater);
    }

    /// Number of updaters
    pub fn len(&self) -> usize {
        self.updaters.len()
    }

    /// Whether the set is empty
    pub fn is_empty(&self) -> bool {
        self.updaters.is_empty()
    }

    /// Iterate over the updaters in configuration order
    pub fn iter(&self) -> impl Iterator<Item = &Updater> {
        self.updaters.iter()
    }

    /// Run one tick of every updater, in order
    pub async fn update(&mut self) -> Vec<UpdateOutcome> {
        let mut outcomes = Vec::with_capacity(self.updaters.len());
        for updater in &mut self.updaters {
            outcomes.push(updater.update().await);
        }
        outcomes
    }

    /// Dry-run every updater, in order
    pub async fn dry_run(&self) -> Vec<Option<IpAddr>> {
        let mut values = Vec::with_capacity(self.updaters.len());
        for updater in &self.updaters {
            values.push(updater.dry_run().await);
        }
        values
    }
}
