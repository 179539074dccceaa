//! Test doubles and common utilities for contract tests
//!
//! The doubles script their answers and count their calls; they implement
//! no real protocol.

#![allow(dead_code)]

use addrsync_core::config::ServiceConfig;
use addrsync_core::error::{Error, Result, RetryAfter, SubmitError};
use addrsync_core::lookup::{InterfaceAddresses, IpLookup};
use addrsync_core::record::RecordType;
use addrsync_core::traits::{DiscoveryService, RecordService, RecordServiceFactory};
use std::collections::{HashMap, VecDeque};
use std::net::IpAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

pub fn ip(s: &str) -> IpAddr {
    s.parse().unwrap()
}

/// A discovery endpoint whose answer per family is set by the test
#[derive(Clone)]
pub struct ScriptedDiscovery {
    name: String,
    answers: Arc<Mutex<HashMap<RecordType, IpAddr>>>,
    call_count: Arc<AtomicUsize>,
    sources: Arc<Mutex<Vec<Option<IpAddr>>>>,
}

impl ScriptedDiscovery {
    /// An endpoint that fails until an answer is set
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            answers: Arc::new(Mutex::new(HashMap::new())),
            call_count: Arc::new(AtomicUsize::new(0)),
            sources: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// An endpoint answering `ip` for its family
    pub fn answering(name: &str, answer: IpAddr) -> Self {
        let discovery = Self::new(name);
        let record_type = if answer.is_ipv4() {
            RecordType::A
        } else {
            RecordType::Aaaa
        };
        discovery.set_answer(record_type, Some(answer));
        discovery
    }

    /// Set (or with `None`, remove) the answer for a family
    pub fn set_answer(&self, record_type: RecordType, answer: Option<IpAddr>) {
        let mut answers = self.answers.lock().unwrap();
        match answer {
            Some(ip) => answers.insert(record_type, ip),
            None => answers.remove(&record_type),
        };
    }

    /// Number of discover() calls
    pub fn call_count(&self) -> usize {
        self.call_count.load(Ordering::SeqCst)
    }

    /// Source addresses of every discover() call, in order
    pub fn sources(&self) -> Vec<Option<IpAddr>> {
        self.sources.lock().unwrap().clone()
    }

    pub fn into_service(self) -> Arc<dyn DiscoveryService> {
        Arc::new(self)
    }
}

#[async_trait::async_trait]
impl DiscoveryService for ScriptedDiscovery {
    async fn discover(&self, record_type: RecordType, source: Option<IpAddr>) -> Result<IpAddr> {
        self.call_count.fetch_add(1, Ordering::SeqCst);
        self.sources.lock().unwrap().push(source);

        self.answers
            .lock()
            .unwrap()
            .get(&record_type)
            .copied()
            .ok_or_else(|| Error::discovery(format!("{} has no answer", self.name)))
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// A fixed interface table
#[derive(Default)]
pub struct StaticInterfaces(HashMap<String, Vec<IpAddr>>);

impl StaticInterfaces {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: &str, addrs: &[&str]) -> Self {
        self.0
            .insert(name.to_string(), addrs.iter().map(|a| ip(a)).collect());
        self
    }
}

impl InterfaceAddresses for StaticInterfaces {
    fn addresses(&self, name: &str) -> Option<Vec<IpAddr>> {
        self.0.get(name).cloned()
    }
}

/// Lookup over the given endpoints with no local interfaces
pub fn lookup_with(services: &[&ScriptedDiscovery]) -> Arc<IpLookup> {
    lookup_with_interfaces(services, StaticInterfaces::new())
}

pub fn lookup_with_interfaces(
    services: &[&ScriptedDiscovery],
    interfaces: StaticInterfaces,
) -> Arc<IpLookup> {
    Arc::new(IpLookup::new(
        services.iter().map(|s| (*s).clone().into_service()).collect(),
        Arc::new(interfaces),
    ))
}

/// A record service that records submissions and fails on request
#[derive(Clone)]
pub struct ScriptedService {
    identifier: String,
    supported: Vec<RecordType>,
    failures: Arc<Mutex<VecDeque<RetryAfter>>>,
    submissions: Arc<Mutex<Vec<(RecordType, IpAddr)>>>,
    submit_count: Arc<AtomicUsize>,
}

impl ScriptedService {
    pub fn new(identifier: &str) -> Self {
        Self {
            identifier: identifier.to_string(),
            supported: vec![RecordType::A, RecordType::Aaaa],
            failures: Arc::new(Mutex::new(VecDeque::new())),
            submissions: Arc::new(Mutex::new(Vec::new())),
            submit_count: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Restrict the record types this service accepts
    pub fn supporting(mut self, supported: &[RecordType]) -> Self {
        self.supported = supported.to_vec();
        self
    }

    /// Fail the next submission with the given retry advice
    pub fn fail_next(&self, retry: RetryAfter) {
        self.failures.lock().unwrap().push_back(retry);
    }

    /// Number of submit() calls, successful or not
    pub fn submit_count(&self) -> usize {
        self.submit_count.load(Ordering::SeqCst)
    }

    /// Values passed to every submit() call, in order
    pub fn submissions(&self) -> Vec<IpAddr> {
        self.submissions
            .lock()
            .unwrap()
            .iter()
            .map(|(_, ip)| *ip)
            .collect()
    }

    pub fn boxed(&self) -> Box<dyn RecordService> {
        Box::new(self.clone())
    }
}

#[async_trait::async_trait]
impl RecordService for ScriptedService {
    async fn submit(
        &self,
        record_type: RecordType,
        ip: IpAddr,
    ) -> std::result::Result<(), SubmitError> {
        self.submit_count.fetch_add(1, Ordering::SeqCst);
        self.submissions.lock().unwrap().push((record_type, ip));

        match self.failures.lock().unwrap().pop_front() {
            Some(retry) => Err(SubmitError::new(
                Error::service(&self.identifier, "scripted failure"),
                retry,
            )),
            None => Ok(()),
        }
    }

    fn identifier(&self) -> String {
        self.identifier.clone()
    }

    fn supports_record_type(&self, record_type: RecordType) -> bool {
        self.supported.contains(&record_type)
    }
}

/// Factory handing out services that share counters with one template
pub struct ScriptedFactory(pub ScriptedService);

impl RecordServiceFactory for ScriptedFactory {
    fn create(&self, _config: &ServiceConfig) -> Result<Box<dyn RecordService>> {
        Ok(self.0.boxed())
    }
}

pub fn duck(subname: &str) -> ServiceConfig {
    ServiceConfig::Duck {
        subname: subname.to_string(),
        token: "00000000-0000-0000-0000-000000000000".to_string(),
    }
}
