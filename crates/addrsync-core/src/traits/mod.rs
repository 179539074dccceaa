//! Core traits for addrsync
//!
//! This module defines the abstract interfaces that all implementations must follow.
//!
//! - [`RecordService`]: Write a new value to one DNS record
//! - [`DiscoveryService`]: Ask an echo endpoint for our public address

pub mod discovery;
pub mod record_service;

pub use discovery::DiscoveryService;
pub use record_service::{RecordService, RecordServiceFactory};
