//! Present-device directory
//!
//! One blocking scan over the OS device directory yields raw records;
//! classification into USB candidates and USB mass-storage devices is pure
//! string logic over those records. There is no incremental diffing here -
//! callers decide when to rescan.

/// One raw record from the device directory
///
/// Everything except the instance id is optional; drivers omit fields
/// freely.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DeviceRecord {
    /// PnP instance id, e.g. `USB\VID_0781&PID_5567\AA11`
    pub instance_id: String,
    /// Friendly device name
    pub name: Option<String>,
    /// Manufacturer string
    pub manufacturer: Option<String>,
    /// Device description
    pub description: Option<String>,
    /// Caption, usually mirroring the name
    pub caption: Option<String>,
    /// Driver service name, e.g. `USBSTOR`
    pub service: Option<String>,
    /// PnP class tag, e.g. `USB` or `DiskDrive`
    pub pnp_class: Option<String>,
    /// Compatible ids reported by the device
    pub compatible_ids: Vec<String>,
    /// Hardware ids reported by the device
    pub hardware_ids: Vec<String>,
}

/// Enumeration facility for all currently present devices
pub trait DeviceDirectory {
    /// Scan the directory and return every present device record
    fn enumerate(&self) -> Vec<DeviceRecord>;
}

/// Whether a record looks like a USB device
///
/// Matches when the instance id starts with `USB`, the PnP class equals
/// `USB` (any case), any hardware id starts with `USB\` or `USBSTOR\`, or
/// any compatible id starts with `USB\`.
pub fn is_usb_candidate(record: &DeviceRecord) -> bool {
    if record.instance_id.starts_with("USB") {
        return true;
    }

    if let Some(pnp_class) = &record.pnp_class
        && pnp_class.eq_ignore_ascii_case("USB")
    {
        return true;
    }

    if record
        .hardware_ids
        .iter()
        .any(|hid| hid.starts_with("USB\\") || hid.starts_with("USBSTOR\\"))
    {
        return true;
    }

    record
        .compatible_ids
        .iter()
        .any(|cid| cid.starts_with("USB\\"))
}

/// Whether a record is a USB mass-storage device
///
/// Matches when the instance id or any hardware id starts with
/// `USBSTOR\`, case-insensitively.
pub fn is_usb_storage(record: &DeviceRecord) -> bool {
    let storage_prefix = |s: &str| {
        s.get(..8)
            .is_some_and(|p| p.eq_ignore_ascii_case("USBSTOR\\"))
    };

    storage_prefix(&record.instance_id)
        || record.hardware_ids.iter().any(|hid| storage_prefix(hid))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(instance_id: &str) -> DeviceRecord {
        DeviceRecord {
            instance_id: instance_id.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_usb_prefix_is_candidate() {
        assert!(is_usb_candidate(&record("USB\\VID_0781&PID_5567\\AA11")));
        assert!(is_usb_candidate(&record("USBSTOR\\DISK&VEN_X\\0123")));
    }

    #[test]
    fn test_pnp_class_matches_any_case() {
        let mut r = record("HID\\VID_046D&PID_C534\\7&AB");
        r.pnp_class = Some("usb".to_string());
        assert!(is_usb_candidate(&r));
    }

    #[test]
    fn test_hardware_id_prefixes() {
        let mut r = record("SWD\\SOMETHING\\1");
        r.hardware_ids = vec!["USBSTOR\\DiskSanDisk".to_string()];
        assert!(is_usb_candidate(&r));

        r.hardware_ids = vec!["PCI\\VEN_8086".to_string()];
        assert!(!is_usb_candidate(&r));
    }

    #[test]
    fn test_compatible_id_prefix() {
        let mut r = record("HID\\SOMETHING\\1");
        r.compatible_ids = vec!["USB\\Class_03".to_string()];
        assert!(is_usb_candidate(&r));
    }

    #[test]
    fn test_non_usb_record() {
        assert!(!is_usb_candidate(&record("PCI\\VEN_8086&DEV_9D2F\\3&A0")));
    }

    #[test]
    fn test_storage_by_instance_id_any_case() {
        assert!(is_usb_storage(&record("USBSTOR\\DISK&VEN_X\\0123")));
        assert!(is_usb_storage(&record("usbstor\\disk&ven_x\\0123")));
    }

    #[test]
    fn test_storage_by_hardware_id() {
        let mut r = record("SCSI\\DISK&VEN_X\\5&1");
        r.hardware_ids = vec!["usbstor\\disk".to_string()];
        assert!(is_usb_storage(&r));
    }

    #[test]
    fn test_plain_usb_device_is_not_storage() {
        assert!(!is_usb_storage(&record("USB\\VID_0781&PID_5567\\AA11")));
    }
}
