//! USB speed inference
//!
//! Windows does not expose the negotiated link speed through the device
//! directory, so the manager infers a display-level version label from the
//! free-text strings the driver stack reports. The rules live in one
//! ordered table: the first matching rule wins, even when a later rule
//! would be more specific (a `SUPERSPEEDPLUS` caption classifies as 3.0
//! because the 3.0 rule already sees `SUPERSPEED` inside it). Oddly-named
//! drivers can and do misclassify; this is a best-effort label, not a
//! measurement.

use crate::info::UsbVersion;

struct SpeedRule {
    version: UsbVersion,
    /// Substrings matched against the concatenated compatible ids
    compatible_markers: &'static [&'static str],
    /// Substrings matched against the service name
    service_markers: &'static [&'static str],
    /// Substrings matched against the device name alone
    name_markers: &'static [&'static str],
    /// Substrings matched against the concatenated free text
    text_markers: &'static [&'static str],
}

/// Ordered first-match rule table; order is a behavioral contract
const SPEED_RULES: &[SpeedRule] = &[
    SpeedRule {
        version: UsbVersion::V3_0,
        compatible_markers: &["USB30"],
        service_markers: &["USBHUB3"],
        name_markers: &["3.0"],
        text_markers: &["SUPERSPEED"],
    },
    SpeedRule {
        version: UsbVersion::V3_1,
        compatible_markers: &[],
        service_markers: &[],
        name_markers: &[],
        text_markers: &["SUPERSPEEDPLUS"],
    },
    SpeedRule {
        version: UsbVersion::V2_0,
        compatible_markers: &[],
        service_markers: &[],
        name_markers: &[],
        text_markers: &["HIGH-SPEED", "HIGHSPEED"],
    },
    SpeedRule {
        version: UsbVersion::V1_1,
        compatible_markers: &[],
        service_markers: &[],
        name_markers: &[],
        text_markers: &["FULL-SPEED", "FULLSPEED"],
    },
    SpeedRule {
        version: UsbVersion::V1_0,
        compatible_markers: &[],
        service_markers: &[],
        name_markers: &[],
        text_markers: &["LOW-SPEED", "LOWSPEED"],
    },
];

impl SpeedRule {
    fn matches(&self, compatible: &str, service: &str, name: &str, text: &str) -> bool {
        let hit = |haystack: &str, markers: &[&str]| {
            markers.iter().any(|marker| haystack.contains(marker))
        };
        hit(compatible, self.compatible_markers)
            || hit(service, self.service_markers)
            || hit(name, self.name_markers)
            || hit(text, self.text_markers)
    }
}

/// Infer a USB version label from driver-reported strings
///
/// `text` is name, description, caption, and service concatenated with
/// absent fields skipped; compatible ids are matched separately. All
/// matching is case-insensitive substring search.
pub fn infer_speed(
    compatible_ids: &[String],
    service: Option<&str>,
    name: Option<&str>,
    description: Option<&str>,
    caption: Option<&str>,
) -> Option<UsbVersion> {
    let text = [name, description, caption, service]
        .iter()
        .flatten()
        .copied()
        .collect::<Vec<_>>()
        .join(" ")
        .to_ascii_uppercase();
    let compatible = compatible_ids.join(" ").to_ascii_uppercase();
    let service = service.unwrap_or_default().to_ascii_uppercase();
    let name = name.unwrap_or_default().to_ascii_uppercase();

    SPEED_RULES
        .iter()
        .find(|rule| rule.matches(&compatible, &service, &name, &text))
        .map(|rule| rule.version)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_ids() -> Vec<String> {
        Vec::new()
    }

    #[test]
    fn test_superspeed_text_is_3_0() {
        let version = infer_speed(
            &no_ids(),
            None,
            Some("SanDisk SuperSpeed Drive"),
            None,
            None,
        );
        assert_eq!(version, Some(UsbVersion::V3_0));
    }

    #[test]
    fn test_usb30_compatible_id_is_3_0() {
        let ids = vec!["USB\\USB30_HUB".to_string()];
        assert_eq!(infer_speed(&ids, None, None, None, None), Some(UsbVersion::V3_0));
    }

    #[test]
    fn test_usbhub3_service_is_3_0() {
        let version = infer_speed(&no_ids(), Some("USBHUB3"), None, None, None);
        assert_eq!(version, Some(UsbVersion::V3_0));
    }

    #[test]
    fn test_high_speed_variants() {
        for marker in ["High-Speed hub", "HighSpeed device"] {
            let version = infer_speed(&no_ids(), None, None, Some(marker), None);
            assert_eq!(version, Some(UsbVersion::V2_0), "marker: {marker}");
        }
    }

    #[test]
    fn test_full_and_low_speed() {
        assert_eq!(
            infer_speed(&no_ids(), None, None, None, Some("full-speed controller")),
            Some(UsbVersion::V1_1)
        );
        assert_eq!(
            infer_speed(&no_ids(), None, None, None, Some("LowSpeed input device")),
            Some(UsbVersion::V1_0)
        );
    }

    #[test]
    fn test_earlier_rule_wins_over_more_specific() {
        // SUPERSPEEDPLUS contains SUPERSPEED, so the 3.0 rule fires first.
        let version = infer_speed(&no_ids(), None, None, Some("SuperSpeedPlus port"), None);
        assert_eq!(version, Some(UsbVersion::V3_0));
    }

    #[test]
    fn test_mixed_markers_take_first_rule() {
        let version = infer_speed(
            &no_ids(),
            None,
            Some("High-Speed SuperSpeed combo"),
            None,
            None,
        );
        assert_eq!(version, Some(UsbVersion::V3_0));
    }

    #[test]
    fn test_unmatched_strings_yield_none() {
        let version = infer_speed(
            &no_ids(),
            Some("USBSTOR"),
            Some("Mass Storage Device"),
            Some("Disk drive"),
            Some("Disk drive"),
        );
        assert_eq!(version, None);
    }

    #[test]
    fn test_deterministic() {
        let ids = vec!["USB\\Class_09".to_string()];
        let a = infer_speed(&ids, Some("usbhub"), Some("Generic Hub"), None, None);
        let b = infer_speed(&ids, Some("usbhub"), Some("Generic Hub"), None, None);
        assert_eq!(a, b);
    }
}
