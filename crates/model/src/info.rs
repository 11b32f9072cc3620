//! Device and volume snapshots
//!
//! These are the values the services hand out: plain data built during one
//! scan, never mutated afterwards.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::id::DeviceId;

/// Display-level USB protocol version
///
/// Inferred from driver-reported strings, not from the negotiated link
/// speed; see [`crate::speed::infer_speed`] for the heuristic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UsbVersion {
    /// USB 1.0 - 1.5 Mbps
    V1_0,
    /// USB 1.1 - 12 Mbps
    V1_1,
    /// USB 2.0 - 480 Mbps
    V2_0,
    /// USB 3.0 - 5 Gbps
    V3_0,
    /// USB 3.1 - 10 Gbps
    V3_1,
}

impl UsbVersion {
    /// Human-readable version label
    pub fn label(self) -> &'static str {
        match self {
            UsbVersion::V1_0 => "1.0",
            UsbVersion::V1_1 => "1.1",
            UsbVersion::V2_0 => "2.0",
            UsbVersion::V3_0 => "3.0",
            UsbVersion::V3_1 => "3.1",
        }
    }

    /// Nominal bus speed in megabits per second
    pub fn speed_mbps(self) -> f64 {
        match self {
            UsbVersion::V1_0 => 1.5,
            UsbVersion::V1_1 => 12.0,
            UsbVersion::V2_0 => 480.0,
            UsbVersion::V3_0 => 5000.0,
            UsbVersion::V3_1 => 10000.0,
        }
    }
}

/// Snapshot of one USB device
///
/// Every field except the id is optional; devices routinely omit
/// descriptor strings, and bus position only exists for nodes whose
/// ancestor chain exposes it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BaseDeviceInfo {
    /// PnP instance id
    pub id: DeviceId,
    /// Vendor id, four uppercase hex digits
    pub vendor_id: Option<String>,
    /// Product id, four uppercase hex digits
    pub product_id: Option<String>,
    /// Manufacturer string
    pub manufacturer: Option<String>,
    /// Product name string
    pub product: Option<String>,
    /// Serial number, the last instance-id segment
    pub serial_number: Option<String>,
    /// Bus number from the ancestor chain
    pub bus_number: Option<u32>,
    /// Hub port number parsed from location information
    pub port_number: Option<u32>,
    /// Inferred USB version label
    pub usb_version: Option<UsbVersion>,
    /// Nominal speed for the inferred version, in Mbps
    pub speed_mbps: Option<f64>,
    /// Description, falling back to the product name
    pub description: Option<String>,
}

/// One mounted logical volume on a physical disk
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VolumeInfo {
    /// Drive letter, e.g. `E:`
    pub drive_letter: Option<String>,
    /// Mount path derived from the drive letter, e.g. `E:\`
    pub mount_path: Option<PathBuf>,
    /// Filesystem name, e.g. `NTFS`
    pub file_system: Option<String>,
    /// Volume label
    pub volume_label: Option<String>,
    /// Total capacity in bytes
    pub total_bytes: Option<u64>,
    /// Free space in bytes; never exceeds `total_bytes` in well-formed data
    pub free_bytes: Option<u64>,
}

/// Snapshot of one USB mass-storage device with its mounted volumes
///
/// `volumes` is ordered by case-insensitive drive letter and is empty for
/// a disk with nothing mounted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageDeviceInfo {
    /// The underlying device snapshot
    pub base: BaseDeviceInfo,
    /// Mounted volumes, ordered by drive letter
    pub volumes: Vec<VolumeInfo>,
}

impl BaseDeviceInfo {
    /// Empty snapshot for an id, before resolution fills the fields
    pub fn new(id: DeviceId) -> Self {
        Self {
            id,
            vendor_id: None,
            product_id: None,
            manufacturer: None,
            product: None,
            serial_number: None,
            bus_number: None,
            port_number: None,
            usb_version: None,
            speed_mbps: None,
            description: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_labels() {
        assert_eq!(UsbVersion::V3_0.label(), "3.0");
        assert_eq!(UsbVersion::V1_0.label(), "1.0");
    }

    #[test]
    fn test_version_speeds() {
        assert_eq!(UsbVersion::V2_0.speed_mbps(), 480.0);
        assert_eq!(UsbVersion::V3_1.speed_mbps(), 10000.0);
        assert_eq!(UsbVersion::V1_0.speed_mbps(), 1.5);
    }

    #[test]
    fn test_new_base_info_is_blank() {
        let id = DeviceId::new("USB\\VID_0000&PID_0000\\X").unwrap();
        let info = BaseDeviceInfo::new(id.clone());
        assert_eq!(info.id, id);
        assert!(info.vendor_id.is_none());
        assert!(info.usb_version.is_none());
    }
}
