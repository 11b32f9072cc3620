//! Platform adapters for the USB device manager
//!
//! The OS facilities the manager core consumes are modeled as four traits:
//! the present-device directory, the device-node graph, the per-node
//! property store, and the disk/volume directory. The services in the
//! `service` crate are written against these traits only; the `windows`
//! module implements them over SetupAPI, CfgMgr32, and volume ioctls, and
//! [`testing::FakeHost`] implements them over a scriptable in-memory
//! topology for tests.
//!
//! All adapter calls are blocking and synchronous and are expected to run
//! off any UI thread. No timeouts are applied here.

pub mod directory;
pub mod properties;
pub mod testing;
pub mod topology;
pub mod volumes;

#[cfg(windows)]
pub mod windows;

use thiserror::Error;

pub use directory::{DeviceDirectory, DeviceRecord, is_usb_candidate, is_usb_storage};
pub use properties::{
    DevicePropertyStore, PropertySelector, decode_property_dword, decode_property_string,
    dword_property_with_fallback, string_property_with_fallback,
};
pub use topology::{
    Ancestors, DEFAULT_MAX_ANCESTOR_DEPTH, DeviceNodeGraph, EjectAttempt, NodeHandle, ancestors,
    resolve_with_fallback, self_then_ancestors,
};
pub use volumes::{DiskDriveRecord, LogicalVolumeRecord, PartitionRecord, VolumeDirectory};

/// Adapter construction failures
#[derive(Debug, Error)]
pub enum PlatformError {
    /// The OS device enumeration facility could not be opened
    #[error("unable to open device enumeration: {0}")]
    EnumerationUnavailable(String),
}

pub type Result<T> = std::result::Result<T, PlatformError>;
