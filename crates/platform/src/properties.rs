//! Per-node property reads
//!
//! Registry-style device properties arrive as raw bytes and get decoded
//! as either a UTF-16LE string or a little-endian dword. Absence is the
//! normal case, not an error: storage-class nodes routinely lack location
//! and bus-number properties, which is exactly why the
//! ancestor-fallback lookups exist.

use model::DeviceId;
use tracing::debug;

use crate::topology::{DeviceNodeGraph, resolve_with_fallback, self_then_ancestors};

/// The properties the manager consumes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PropertySelector {
    /// Human-readable position string, e.g. `Port_#0004.Hub_#0001`
    /// (SPDRP_LOCATION_INFORMATION)
    LocationInformation,
    /// Raw bus number dword (SPDRP_BUSNUMBER)
    BusNumber,
}

/// Raw per-node property reads
pub trait DevicePropertyStore {
    /// Read a property's raw bytes; `None` when the node or property is
    /// absent
    fn read_property(&self, instance_id: &DeviceId, selector: PropertySelector)
    -> Option<Vec<u8>>;
}

/// Decode a REG_SZ property: UTF-16LE with trailing NULs trimmed
///
/// An odd trailing byte is ignored; a string that is empty after
/// trimming decodes to `None`.
pub fn decode_property_string(raw: &[u8]) -> Option<String> {
    let units: Vec<u16> = raw
        .chunks_exact(2)
        .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
        .collect();
    let decoded = String::from_utf16_lossy(&units);
    let trimmed = decoded.trim_end_matches('\0');
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Decode a REG_DWORD property: first four bytes, little-endian unsigned
///
/// Fewer than four bytes decodes to `None`.
pub fn decode_property_dword(raw: &[u8]) -> Option<u32> {
    let bytes: [u8; 4] = raw.get(..4)?.try_into().ok()?;
    Some(u32::from_le_bytes(bytes))
}

/// String property with ancestor fallback
///
/// Walks self-then-ancestors and returns the first node whose property
/// decodes to a non-empty string.
pub fn string_property_with_fallback(
    graph: &dyn DeviceNodeGraph,
    store: &dyn DevicePropertyStore,
    instance_id: &DeviceId,
    selector: PropertySelector,
    max_depth: usize,
) -> Option<String> {
    let candidates = self_then_ancestors(graph, instance_id.clone(), max_depth);
    let resolved = resolve_with_fallback(candidates, |candidate| {
        store
            .read_property(candidate, selector)
            .as_deref()
            .and_then(decode_property_string)
            .ok_or(())
    });
    match resolved {
        Some(Ok(value)) => Some(value),
        _ => {
            debug!(id = %instance_id, ?selector, "property absent along ancestor chain");
            None
        }
    }
}

/// Dword property with ancestor fallback
pub fn dword_property_with_fallback(
    graph: &dyn DeviceNodeGraph,
    store: &dyn DevicePropertyStore,
    instance_id: &DeviceId,
    selector: PropertySelector,
    max_depth: usize,
) -> Option<u32> {
    let candidates = self_then_ancestors(graph, instance_id.clone(), max_depth);
    let resolved = resolve_with_fallback(candidates, |candidate| {
        store
            .read_property(candidate, selector)
            .as_deref()
            .and_then(decode_property_dword)
            .ok_or(())
    });
    match resolved {
        Some(Ok(value)) => Some(value),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeHost;

    fn id(s: &str) -> DeviceId {
        DeviceId::new(s).unwrap()
    }

    fn utf16le(s: &str) -> Vec<u8> {
        s.encode_utf16()
            .chain(std::iter::once(0))
            .flat_map(u16::to_le_bytes)
            .collect()
    }

    #[test]
    fn test_decode_string_trims_nuls() {
        let raw = utf16le("Port_#0004.Hub_#0001");
        assert_eq!(
            decode_property_string(&raw).as_deref(),
            Some("Port_#0004.Hub_#0001")
        );
    }

    #[test]
    fn test_decode_string_empty_after_trim() {
        assert_eq!(decode_property_string(&utf16le("")), None);
        assert_eq!(decode_property_string(&[]), None);
    }

    #[test]
    fn test_decode_string_ignores_odd_trailing_byte() {
        let mut raw = utf16le("AB");
        raw.push(0x41);
        assert_eq!(decode_property_string(&raw).as_deref(), Some("AB"));
    }

    #[test]
    fn test_decode_dword_little_endian() {
        assert_eq!(decode_property_dword(&[0x01, 0x00, 0x00, 0x00]), Some(1));
        assert_eq!(decode_property_dword(&[0x78, 0x56, 0x34, 0x12]), Some(0x1234_5678));
    }

    #[test]
    fn test_decode_dword_short_buffer() {
        assert_eq!(decode_property_dword(&[0x01, 0x00, 0x00]), None);
        assert_eq!(decode_property_dword(&[]), None);
    }

    #[test]
    fn test_decode_dword_extra_bytes_ignored() {
        assert_eq!(
            decode_property_dword(&[0x02, 0x00, 0x00, 0x00, 0xFF, 0xFF]),
            Some(2)
        );
    }

    #[test]
    fn test_fallback_prefers_own_value() {
        let host = FakeHost::new();
        host.set_parent("USB\\CHILD\\1", "USB\\PARENT\\1");
        host.set_dword_property("USB\\CHILD\\1", PropertySelector::BusNumber, 7);
        host.set_dword_property("USB\\PARENT\\1", PropertySelector::BusNumber, 9);

        let value = dword_property_with_fallback(
            &host,
            &host,
            &id("USB\\CHILD\\1"),
            PropertySelector::BusNumber,
            10,
        );
        assert_eq!(value, Some(7));
    }

    #[test]
    fn test_fallback_inherits_from_parent() {
        let host = FakeHost::new();
        host.set_parent("USB\\CHILD\\1", "USB\\PARENT\\1");
        host.set_dword_property("USB\\PARENT\\1", PropertySelector::BusNumber, 3);

        let value = dword_property_with_fallback(
            &host,
            &host,
            &id("USB\\CHILD\\1"),
            PropertySelector::BusNumber,
            10,
        );
        assert_eq!(value, Some(3));
    }

    #[test]
    fn test_fallback_exhausted_chain() {
        let host = FakeHost::new();
        host.set_parent("USB\\CHILD\\1", "USB\\PARENT\\1");

        let value = string_property_with_fallback(
            &host,
            &host,
            &id("USB\\CHILD\\1"),
            PropertySelector::LocationInformation,
            10,
        );
        assert_eq!(value, None);
    }
}
