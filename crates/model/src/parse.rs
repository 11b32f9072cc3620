//! Identifier extraction from device strings
//!
//! Instance ids and location strings come straight from drivers and are
//! inconsistent by nature, so nothing in here errors: a field that cannot
//! be extracted is simply absent.

use std::sync::LazyLock;

use regex::Regex;

use crate::id::normalize_instance_id;

static VID_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)VID_([0-9A-F]{4})").unwrap());
static PID_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)PID_([0-9A-F]{4})").unwrap());
static PORT_PATTERN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"Port_#(\d+)").unwrap());
static HUB_PATTERN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"Hub_#(\d+)").unwrap());

/// Identifiers extracted from one instance id
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ParsedIds {
    /// Vendor id, four uppercase hex digits
    pub vendor_id: Option<String>,
    /// Product id, four uppercase hex digits
    pub product_id: Option<String>,
    /// Last instance-id segment, when the id has the class\details\serial shape
    pub serial_number: Option<String>,
}

/// Extract vendor id, product id, and serial number from an instance id
///
/// Vendor and product ids are matched independently anywhere in the
/// string, any case, and returned uppercased. The serial number is the
/// last backslash-delimited segment, taken only when the id has at least
/// three segments:
///
/// - `USB\VID_XXXX&PID_YYYY\<serial>`
/// - `USBSTOR\DISK&VEN_...\<serial>`
pub fn parse_ids(instance_id: &str) -> ParsedIds {
    let vendor_id = VID_PATTERN
        .captures(instance_id)
        .map(|c| c[1].to_ascii_uppercase());
    let product_id = PID_PATTERN
        .captures(instance_id)
        .map(|c| c[1].to_ascii_uppercase());

    let normalized = normalize_instance_id(instance_id);
    let segments: Vec<&str> = normalized.split('\\').collect();
    let serial_number = match segments.last() {
        Some(last) if segments.len() >= 3 && !last.is_empty() => Some((*last).to_string()),
        _ => None,
    };

    ParsedIds {
        vendor_id,
        product_id,
        serial_number,
    }
}

/// Extract `(bus_number, port_number)` from a location-information string
///
/// The common shape is `"Port_#0004.Hub_#0001"`; either token may be
/// missing, and an absent or empty input yields `(None, None)`. A digit
/// run too large for u32 degrades to `None` for that field.
pub fn parse_bus_port(location_info: Option<&str>) -> (Option<u32>, Option<u32>) {
    let Some(location) = location_info else {
        return (None, None);
    };
    if location.is_empty() {
        return (None, None);
    }

    let port_number = PORT_PATTERN
        .captures(location)
        .and_then(|c| c[1].parse::<u32>().ok());
    let bus_number = HUB_PATTERN
        .captures(location)
        .and_then(|c| c[1].parse::<u32>().ok());

    (bus_number, port_number)
}
