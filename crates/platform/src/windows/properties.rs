//! SetupAPI-backed property store
//!
//! Registry-style properties are addressed by instance id: the
//! present-device list is scanned for the matching entry, then the
//! property bytes are read from it. The two selectors the manager uses
//! map to SPDRP_LOCATION_INFORMATION and SPDRP_BUSNUMBER.

use model::DeviceId;
use windows_sys::Win32::Devices::DeviceAndDriverInstallation::{
    SPDRP_BUSNUMBER, SPDRP_LOCATION_INFORMATION,
};

use crate::properties::{DevicePropertyStore, PropertySelector};
use crate::windows::WindowsHost;
use crate::windows::directory::DevInfoList;

fn spdrp_of(selector: PropertySelector) -> u32 {
    match selector {
        PropertySelector::LocationInformation => SPDRP_LOCATION_INFORMATION,
        PropertySelector::BusNumber => SPDRP_BUSNUMBER,
    }
}

impl DevicePropertyStore for WindowsHost {
    fn read_property(
        &self,
        instance_id: &DeviceId,
        selector: PropertySelector,
    ) -> Option<Vec<u8>> {
        let list = DevInfoList::open_all_present()?;
        for mut devinfo in list.entries() {
            let Some(current_id) = list.instance_id(&mut devinfo) else {
                continue;
            };
            if !current_id.eq_ignore_ascii_case(instance_id.as_str()) {
                continue;
            }
            return list.registry_property(&mut devinfo, spdrp_of(selector));
        }
        None
    }
}
