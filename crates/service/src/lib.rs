//! USB device manager services
//!
//! Three layers sit on top of the platform adapters:
//!
//! - [`BaseDeviceService`] scans the device directory, classifies USB
//!   candidates, and resolves per-device details with ancestor fallback.
//! - [`StorageDeviceService`] restricts the base view to mass-storage
//!   devices and joins each one to its mounted volumes.
//! - [`EjectEngine`] drives the ancestor-retry safe-eject protocol.
//!
//! Services are not internally thread-safe: the intended usage model is
//! one mutator at a time from a single worker context, with every read
//! returning an immutable snapshot. Callers serialize `refresh()` and
//! `eject_device()` themselves and use the generation counter to discard
//! superseded refresh results.

pub mod base;
pub mod eject;
pub mod error;
pub mod storage;

pub use base::BaseDeviceService;
pub use eject::EjectEngine;
pub use error::{Result, ServiceError};
pub use storage::StorageDeviceService;
