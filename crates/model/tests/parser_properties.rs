//! Property tests for the identifier parser
//!
//! Device strings are adversarial input; these properties pin down the
//! extraction rules across arbitrary surrounding content.

use model::{parse_bus_port, parse_ids};
use proptest::prelude::*;

fn hex4() -> impl Strategy<Value = String> {
    proptest::string::string_regex("[0-9a-fA-F]{4}").unwrap()
}

// Surrounding content free of backslashes and of the markers themselves.
fn filler() -> impl Strategy<Value = String> {
    proptest::string::string_regex("[A-Z0-9&_]{0,12}").unwrap()
        .prop_filter("no embedded markers", |s| {
            !s.to_ascii_uppercase().contains("VID_") && !s.to_ascii_uppercase().contains("PID_")
        })
}

proptest! {
    #[test]
    fn vid_pid_extracted_uppercased_anywhere(
        vid in hex4(),
        pid in hex4(),
        prefix in filler(),
        middle in filler(),
        serial in proptest::string::string_regex("[A-Z0-9]{1,16}").unwrap(),
    ) {
        let instance_id = format!("USB\\{prefix}vid_{vid}&{middle}Pid_{pid}\\{serial}");
        let parsed = parse_ids(&instance_id);

        prop_assert_eq!(parsed.vendor_id, Some(vid.to_ascii_uppercase()));
        prop_assert_eq!(parsed.product_id, Some(pid.to_ascii_uppercase()));
        prop_assert_eq!(parsed.serial_number, Some(serial));
    }

    #[test]
    fn fewer_than_three_segments_never_yield_a_serial(
        first in filler(),
        second in filler(),
    ) {
        let one = parse_ids(&first);
        prop_assert_eq!(one.serial_number, None);

        let two = parse_ids(&format!("{first}\\{second}"));
        prop_assert_eq!(two.serial_number, None);
    }

    #[test]
    fn parse_never_panics_on_arbitrary_input(s in ".*") {
        let _ = parse_ids(&s);
        let _ = parse_bus_port(Some(&s));
    }

    #[test]
    fn port_and_hub_numbers_round_trip(port in 0u32..100_000, hub in 0u32..100_000) {
        let location = format!("Port_#{port:04}.Hub_#{hub:04}");
        prop_assert_eq!(parse_bus_port(Some(&location)), (Some(hub), Some(port)));
    }
}
