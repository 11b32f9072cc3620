//! SetupAPI-backed device directory

use std::ptr;

use tracing::warn;
use windows_sys::Win32::Devices::DeviceAndDriverInstallation::{
    DIGCF_ALLCLASSES, DIGCF_DEVICEINTERFACE, DIGCF_PRESENT, HDEVINFO, SP_DEVICE_INTERFACE_DATA,
    SP_DEVICE_INTERFACE_DETAIL_DATA_W, SP_DEVINFO_DATA, SPDRP_CLASS, SPDRP_COMPATIBLEIDS,
    SPDRP_DEVICEDESC, SPDRP_FRIENDLYNAME, SPDRP_HARDWAREID, SPDRP_MFG, SPDRP_SERVICE,
    SetupDiDestroyDeviceInfoList, SetupDiEnumDeviceInfo, SetupDiEnumDeviceInterfaces,
    SetupDiGetClassDevsW, SetupDiGetDeviceInstanceIdW, SetupDiGetDeviceInterfaceDetailW,
    SetupDiGetDeviceRegistryPropertyW,
};
use windows_sys::Win32::Foundation::INVALID_HANDLE_VALUE;
use windows_sys::core::GUID;

use crate::directory::{DeviceDirectory, DeviceRecord};
use crate::properties::decode_property_string;
use crate::windows::WindowsHost;
use crate::windows::wide::{from_wide, multi_sz_from_bytes};

/// RAII guard over a SetupAPI device-info list
pub(crate) struct DevInfoList {
    pub(crate) handle: HDEVINFO,
}

impl DevInfoList {
    /// Open the list of all present devices, all classes
    pub(crate) fn open_all_present() -> Option<Self> {
        let handle = unsafe {
            SetupDiGetClassDevsW(
                ptr::null(),
                ptr::null(),
                ptr::null_mut(),
                DIGCF_PRESENT | DIGCF_ALLCLASSES,
            )
        };
        if handle == INVALID_HANDLE_VALUE {
            warn!("SetupDiGetClassDevsW failed to open the present-device list");
            return None;
        }
        Some(Self { handle })
    }

    /// Open the present devices exposing interfaces of one class
    pub(crate) fn open_interfaces(class_guid: &GUID) -> Option<Self> {
        let handle = unsafe {
            SetupDiGetClassDevsW(
                class_guid,
                ptr::null(),
                ptr::null_mut(),
                DIGCF_PRESENT | DIGCF_DEVICEINTERFACE,
            )
        };
        if handle == INVALID_HANDLE_VALUE {
            warn!("SetupDiGetClassDevsW failed to open the interface list");
            return None;
        }
        Some(Self { handle })
    }

    /// Enumerate `(device_path, owning_instance_id)` pairs for one
    /// interface class
    pub(crate) fn interfaces<'a>(
        &'a self,
        class_guid: &'a GUID,
    ) -> impl Iterator<Item = (String, String)> + 'a {
        let mut index = 0u32;
        std::iter::from_fn(move || {
            loop {
                let mut ifdata: SP_DEVICE_INTERFACE_DATA = unsafe { std::mem::zeroed() };
                ifdata.cbSize = std::mem::size_of::<SP_DEVICE_INTERFACE_DATA>() as u32;
                let ok = unsafe {
                    SetupDiEnumDeviceInterfaces(
                        self.handle,
                        ptr::null_mut(),
                        class_guid,
                        index,
                        &mut ifdata,
                    )
                };
                index += 1;
                if ok == 0 {
                    return None;
                }

                let mut required = 0u32;
                unsafe {
                    SetupDiGetDeviceInterfaceDetailW(
                        self.handle,
                        &mut ifdata,
                        ptr::null_mut(),
                        0,
                        &mut required,
                        ptr::null_mut(),
                    );
                }
                if required == 0 {
                    continue;
                }

                // The detail struct is variable-length; u64 backing keeps
                // the required alignment.
                let mut buf = vec![0u64; (required as usize).div_ceil(8)];
                let detail = buf.as_mut_ptr() as *mut SP_DEVICE_INTERFACE_DETAIL_DATA_W;
                unsafe {
                    (*detail).cbSize =
                        std::mem::size_of::<SP_DEVICE_INTERFACE_DETAIL_DATA_W>() as u32;
                }

                let mut devinfo: SP_DEVINFO_DATA = unsafe { std::mem::zeroed() };
                devinfo.cbSize = std::mem::size_of::<SP_DEVINFO_DATA>() as u32;

                let ok = unsafe {
                    SetupDiGetDeviceInterfaceDetailW(
                        self.handle,
                        &mut ifdata,
                        detail,
                        required,
                        ptr::null_mut(),
                        &mut devinfo,
                    )
                };
                if ok == 0 {
                    continue;
                }

                let path = unsafe {
                    let offset =
                        std::mem::offset_of!(SP_DEVICE_INTERFACE_DETAIL_DATA_W, DevicePath);
                    let base = (detail as *const u8).add(offset) as *const u16;
                    let len = (required as usize - offset) / 2;
                    from_wide(std::slice::from_raw_parts(base, len))
                };
                let Some(owner) = self.instance_id(&mut devinfo) else {
                    continue;
                };
                return Some((path, owner));
            }
        })
    }

    /// Enumerate device-info entries by index until the list ends
    pub(crate) fn entries(&self) -> impl Iterator<Item = SP_DEVINFO_DATA> + '_ {
        let mut index = 0u32;
        std::iter::from_fn(move || {
            let mut devinfo: SP_DEVINFO_DATA = unsafe { std::mem::zeroed() };
            devinfo.cbSize = std::mem::size_of::<SP_DEVINFO_DATA>() as u32;
            let ok = unsafe { SetupDiEnumDeviceInfo(self.handle, index, &mut devinfo) };
            index += 1;
            if ok == 0 { None } else { Some(devinfo) }
        })
    }

    /// Instance id of one entry
    pub(crate) fn instance_id(&self, devinfo: &mut SP_DEVINFO_DATA) -> Option<String> {
        let mut required = 0u32;
        unsafe {
            SetupDiGetDeviceInstanceIdW(self.handle, devinfo, ptr::null_mut(), 0, &mut required);
        }
        if required == 0 {
            return None;
        }

        let mut buf = vec![0u16; required as usize];
        let ok = unsafe {
            SetupDiGetDeviceInstanceIdW(
                self.handle,
                devinfo,
                buf.as_mut_ptr(),
                required,
                &mut required,
            )
        };
        if ok == 0 {
            return None;
        }
        Some(from_wide(&buf))
    }

    /// Raw bytes of one registry-backed property
    pub(crate) fn registry_property(
        &self,
        devinfo: &mut SP_DEVINFO_DATA,
        property: u32,
    ) -> Option<Vec<u8>> {
        let mut data_type = 0u32;
        let mut required = 0u32;
        unsafe {
            SetupDiGetDeviceRegistryPropertyW(
                self.handle,
                devinfo,
                property,
                &mut data_type,
                ptr::null_mut(),
                0,
                &mut required,
            );
        }
        if required == 0 {
            return None;
        }

        let mut buf = vec![0u8; required as usize];
        let ok = unsafe {
            SetupDiGetDeviceRegistryPropertyW(
                self.handle,
                devinfo,
                property,
                &mut data_type,
                buf.as_mut_ptr(),
                required,
                &mut required,
            )
        };
        if ok == 0 {
            return None;
        }
        Some(buf)
    }

    fn string_property(&self, devinfo: &mut SP_DEVINFO_DATA, property: u32) -> Option<String> {
        self.registry_property(devinfo, property)
            .as_deref()
            .and_then(decode_property_string)
    }

    fn multi_sz_property(&self, devinfo: &mut SP_DEVINFO_DATA, property: u32) -> Vec<String> {
        self.registry_property(devinfo, property)
            .map(|raw| multi_sz_from_bytes(&raw))
            .unwrap_or_default()
    }
}

impl Drop for DevInfoList {
    fn drop(&mut self) {
        unsafe {
            SetupDiDestroyDeviceInfoList(self.handle);
        }
    }
}

impl DeviceDirectory for WindowsHost {
    fn enumerate(&self) -> Vec<DeviceRecord> {
        let Some(list) = DevInfoList::open_all_present() else {
            return Vec::new();
        };

        let mut records = Vec::new();
        for mut devinfo in list.entries() {
            let Some(instance_id) = list.instance_id(&mut devinfo) else {
                continue;
            };
            if instance_id.is_empty() {
                continue;
            }

            let name = list.string_property(&mut devinfo, SPDRP_FRIENDLYNAME);
            records.push(DeviceRecord {
                caption: name.clone(),
                name,
                manufacturer: list.string_property(&mut devinfo, SPDRP_MFG),
                description: list.string_property(&mut devinfo, SPDRP_DEVICEDESC),
                service: list.string_property(&mut devinfo, SPDRP_SERVICE),
                pnp_class: list.string_property(&mut devinfo, SPDRP_CLASS),
                compatible_ids: list.multi_sz_property(&mut devinfo, SPDRP_COMPATIBLEIDS),
                hardware_ids: list.multi_sz_property(&mut devinfo, SPDRP_HARDWAREID),
                instance_id,
            });
        }
        records
    }
}
