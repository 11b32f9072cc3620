//! Device identity
//!
//! A `DeviceId` wraps the vendor-supplied PnP instance id string
//! (e.g. `USB\VID_0781&PID_5567\AA11`). Windows treats instance ids as
//! case-insensitive, so equality, ordering, and hashing here are all
//! ASCII-case-insensitive while the original spelling is preserved for
//! display.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ModelError;

/// Normalized PnP instance id
///
/// Construction collapses doubled backslashes (ids copied out of logs or
/// registry exports often arrive escaped) and rejects the empty string.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DeviceId(String);

impl DeviceId {
    /// Create a device id from a raw instance-id string
    pub fn new(raw: impl AsRef<str>) -> Result<Self, ModelError> {
        let normalized = normalize_instance_id(raw.as_ref());
        if normalized.is_empty() {
            return Err(ModelError::EmptyInstanceId);
        }
        Ok(Self(normalized))
    }

    /// The normalized instance-id string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Collapse doubled backslashes into single ones
pub(crate) fn normalize_instance_id(raw: &str) -> String {
    raw.replace("\\\\", "\\")
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl PartialEq for DeviceId {
    fn eq(&self, other: &Self) -> bool {
        self.0.eq_ignore_ascii_case(&other.0)
    }
}

impl Eq for DeviceId {}

impl Hash for DeviceId {
    fn hash<H: Hasher>(&self, state: &mut H) {
        for b in self.0.bytes() {
            state.write_u8(b.to_ascii_lowercase());
        }
    }
}

impl Ord for DeviceId {
    fn cmp(&self, other: &Self) -> Ordering {
        let lhs = self.0.bytes().map(|b| b.to_ascii_lowercase());
        let rhs = other.0.bytes().map(|b| b.to_ascii_lowercase());
        lhs.cmp(rhs)
    }
}

impl PartialOrd for DeviceId {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl FromStr for DeviceId {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for DeviceId {
    type Error = ModelError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<DeviceId> for String {
    fn from(value: DeviceId) -> Self {
        value.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_empty_id() {
        assert!(matches!(DeviceId::new(""), Err(ModelError::EmptyInstanceId)));
    }

    #[test]
    fn test_equality_is_case_insensitive() {
        let a = DeviceId::new("USB\\VID_0781&PID_5567\\AA11").unwrap();
        let b = DeviceId::new("usb\\vid_0781&pid_5567\\aa11").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_hash_matches_equality() {
        use std::collections::HashSet;

        let mut set = HashSet::new();
        set.insert(DeviceId::new("USBSTOR\\DISK&VEN_X\\0123").unwrap());
        assert!(set.contains(&DeviceId::new("usbstor\\disk&ven_x\\0123").unwrap()));
    }

    #[test]
    fn test_ordering_ignores_case() {
        let mut ids = vec![
            DeviceId::new("usb\\b").unwrap(),
            DeviceId::new("USB\\A").unwrap(),
            DeviceId::new("USB\\c").unwrap(),
        ];
        ids.sort();
        let order: Vec<&str> = ids.iter().map(|d| d.as_str()).collect();
        assert_eq!(order, vec!["USB\\A", "usb\\b", "USB\\c"]);
    }

    #[test]
    fn test_normalizes_doubled_backslashes() {
        let id = DeviceId::new("USB\\\\VID_0781&PID_5567\\\\AA11").unwrap();
        assert_eq!(id.as_str(), "USB\\VID_0781&PID_5567\\AA11");
    }

    #[test]
    fn test_display_preserves_spelling() {
        let id = DeviceId::new("UsB\\MiXeD\\case").unwrap();
        assert_eq!(id.to_string(), "UsB\\MiXeD\\case");
    }
}
