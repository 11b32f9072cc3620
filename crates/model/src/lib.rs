//! Data model for the USB device manager
//!
//! This crate defines the value types shared across the manager core:
//! device identity, device/volume snapshots, eject outcomes, and the pure
//! string logic that extracts identifiers and infers USB speed labels from
//! the free-text strings Windows reports for a device.
//!
//! Everything here is an immutable snapshot with no OS handles attached,
//! so values can be handed across thread boundaries freely.
//!
//! # Example
//!
//! ```
//! use model::{DeviceId, parse_ids};
//!
//! let id = DeviceId::new("USB\\VID_0781&PID_5567\\AA11").unwrap();
//! let parsed = parse_ids(id.as_str());
//! assert_eq!(parsed.vendor_id.as_deref(), Some("0781"));
//! assert_eq!(parsed.product_id.as_deref(), Some("5567"));
//! assert_eq!(parsed.serial_number.as_deref(), Some("AA11"));
//! ```

pub mod eject;
pub mod error;
pub mod id;
pub mod info;
pub mod parse;
pub mod speed;

pub use eject::{ConfigRet, EjectResult, VetoType};
pub use error::{ModelError, Result};
pub use id::DeviceId;
pub use info::{BaseDeviceInfo, StorageDeviceInfo, UsbVersion, VolumeInfo};
pub use parse::{ParsedIds, parse_bus_port, parse_ids};
pub use speed::infer_speed;
