//! Disk/volume directory over device interfaces and volume ioctls
//!
//! USB disks are the USBSTOR-enumerated device nodes. Each one maps to a
//! physical drive number through its disk device interface, the drive
//! layout yields the partitions, and a partition maps to drive letters by
//! matching volume disk extents against the partition's starting offset.

use std::ptr;

use tracing::warn;
use windows_sys::Win32::Foundation::{CloseHandle, GENERIC_READ, HANDLE, INVALID_HANDLE_VALUE};
use windows_sys::Win32::Storage::FileSystem::{
    CreateFileW, FILE_SHARE_READ, FILE_SHARE_WRITE, GetDiskFreeSpaceExW, GetLogicalDrives,
    GetVolumeInformationW, OPEN_EXISTING,
};
use windows_sys::Win32::System::IO::DeviceIoControl;
use windows_sys::Win32::System::Ioctl::{
    DISK_EXTENT, DRIVE_LAYOUT_INFORMATION_EX, GUID_DEVINTERFACE_DISK,
    IOCTL_DISK_GET_DRIVE_LAYOUT_EX, IOCTL_STORAGE_GET_DEVICE_NUMBER,
    IOCTL_VOLUME_GET_VOLUME_DISK_EXTENTS, PARTITION_INFORMATION_EX, STORAGE_DEVICE_NUMBER,
    VOLUME_DISK_EXTENTS,
};

use crate::volumes::{DiskDriveRecord, LogicalVolumeRecord, PartitionRecord, VolumeDirectory};
use crate::windows::WindowsHost;
use crate::windows::directory::DevInfoList;
use crate::windows::wide::{from_wide, to_wide};

/// RAII guard over an open device handle
struct DeviceFile {
    handle: HANDLE,
}

impl DeviceFile {
    fn open(path: &str) -> Option<Self> {
        let wide = to_wide(path);
        let handle = unsafe {
            CreateFileW(
                wide.as_ptr(),
                GENERIC_READ,
                FILE_SHARE_READ | FILE_SHARE_WRITE,
                ptr::null(),
                OPEN_EXISTING,
                0,
                ptr::null_mut(),
            )
        };
        if handle == INVALID_HANDLE_VALUE {
            return None;
        }
        Some(Self { handle })
    }

    fn ioctl_read<T>(&self, code: u32, out: &mut T) -> bool {
        let mut bytes = 0u32;
        let ok = unsafe {
            DeviceIoControl(
                self.handle,
                code,
                ptr::null(),
                0,
                out as *mut T as *mut _,
                std::mem::size_of::<T>() as u32,
                &mut bytes,
                ptr::null_mut(),
            )
        };
        ok != 0
    }
}

impl Drop for DeviceFile {
    fn drop(&mut self) {
        unsafe {
            CloseHandle(self.handle);
        }
    }
}

/// Drive layout with room for the partition table entries
#[repr(C)]
struct LayoutBuffer {
    info: DRIVE_LAYOUT_INFORMATION_EX,
    extra: [PARTITION_INFORMATION_EX; 63],
}

/// Volume extents with room for spanned volumes
#[repr(C)]
struct ExtentsBuffer {
    info: VOLUME_DISK_EXTENTS,
    extra: [DISK_EXTENT; 15],
}

/// Map a disk's instance id to its physical drive number
///
/// Walks the disk device interfaces, matching each interface's owning
/// device against the instance id, then asks the opened interface for
/// its storage device number.
fn disk_number_for_instance(instance_id: &str) -> Option<u32> {
    let list = DevInfoList::open_interfaces(&GUID_DEVINTERFACE_DISK)?;
    for (path, owner_id) in list.interfaces(&GUID_DEVINTERFACE_DISK) {
        if !owner_id.eq_ignore_ascii_case(instance_id) {
            continue;
        }
        let file = DeviceFile::open(&path)?;
        let mut number: STORAGE_DEVICE_NUMBER = unsafe { std::mem::zeroed() };
        if file.ioctl_read(IOCTL_STORAGE_GET_DEVICE_NUMBER, &mut number) {
            return Some(number.DeviceNumber);
        }
        warn!(instance_id, "device number query failed for disk interface");
        return None;
    }
    None
}

impl VolumeDirectory for WindowsHost {
    fn usb_disk_drives(&self) -> Vec<DiskDriveRecord> {
        let Some(list) = DevInfoList::open_all_present() else {
            return Vec::new();
        };

        let mut disks = Vec::new();
        for mut devinfo in list.entries() {
            let Some(instance_id) = list.instance_id(&mut devinfo) else {
                continue;
            };
            let is_usbstor = instance_id
                .get(..8)
                .is_some_and(|p| p.eq_ignore_ascii_case("USBSTOR\\"));
            if is_usbstor {
                disks.push(DiskDriveRecord { instance_id });
            }
        }
        disks
    }

    fn partitions_of(&self, disk: &DiskDriveRecord) -> Vec<PartitionRecord> {
        let Some(disk_number) = disk_number_for_instance(&disk.instance_id) else {
            return Vec::new();
        };

        let path = format!("\\\\.\\PhysicalDrive{disk_number}");
        let Some(file) = DeviceFile::open(&path) else {
            return Vec::new();
        };

        let mut layout: LayoutBuffer = unsafe { std::mem::zeroed() };
        if !file.ioctl_read(IOCTL_DISK_GET_DRIVE_LAYOUT_EX, &mut layout) {
            return Vec::new();
        }

        let count = (layout.info.PartitionCount as usize).min(64);
        let entries = unsafe {
            std::slice::from_raw_parts(layout.info.PartitionEntry.as_ptr(), count)
        };

        entries
            .iter()
            .filter(|entry| entry.PartitionNumber > 0)
            .map(|entry| PartitionRecord {
                id: format!("Disk #{disk_number}, Partition #{}", entry.PartitionNumber),
                disk_number: Some(disk_number),
                starting_offset: Some(entry.StartingOffset as u64),
            })
            .collect()
    }

    fn logical_volumes_of(&self, partition: &PartitionRecord) -> Vec<LogicalVolumeRecord> {
        let (Some(disk_number), Some(offset)) = (partition.disk_number, partition.starting_offset)
        else {
            return Vec::new();
        };

        let mask = unsafe { GetLogicalDrives() };
        let mut volumes = Vec::new();

        for index in 0..26u32 {
            if mask & (1 << index) == 0 {
                continue;
            }
            let letter = (b'A' + index as u8) as char;

            let Some(file) = DeviceFile::open(&format!("\\\\.\\{letter}:")) else {
                continue;
            };
            let mut extents: ExtentsBuffer = unsafe { std::mem::zeroed() };
            if !file.ioctl_read(IOCTL_VOLUME_GET_VOLUME_DISK_EXTENTS, &mut extents) {
                continue;
            }

            let count = (extents.info.NumberOfDiskExtents as usize).min(16);
            let on_partition = unsafe {
                std::slice::from_raw_parts(extents.info.Extents.as_ptr(), count)
            }
            .iter()
            .any(|extent| {
                extent.DiskNumber == disk_number && extent.StartingOffset as u64 == offset
            });

            if on_partition {
                volumes.push(read_volume(letter));
            }
        }
        volumes
    }
}

/// Filesystem, label, and capacity for one mounted drive letter
fn read_volume(letter: char) -> LogicalVolumeRecord {
    let root = format!("{letter}:\\");
    let root_wide = to_wide(&root);

    let mut label_buf = [0u16; 261];
    let mut fs_buf = [0u16; 261];
    let ok = unsafe {
        GetVolumeInformationW(
            root_wide.as_ptr(),
            label_buf.as_mut_ptr(),
            label_buf.len() as u32,
            ptr::null_mut(),
            ptr::null_mut(),
            ptr::null_mut(),
            fs_buf.as_mut_ptr(),
            fs_buf.len() as u32,
        )
    };
    let (volume_label, file_system) = if ok != 0 {
        let label = from_wide(&label_buf);
        let fs = from_wide(&fs_buf);
        (
            if label.is_empty() { None } else { Some(label) },
            if fs.is_empty() { None } else { Some(fs) },
        )
    } else {
        (None, None)
    };

    let mut free_to_caller = 0u64;
    let mut total = 0u64;
    let mut total_free = 0u64;
    let sized = unsafe {
        GetDiskFreeSpaceExW(
            root_wide.as_ptr(),
            &mut free_to_caller,
            &mut total,
            &mut total_free,
        )
    };
    let (size, free_space) = if sized != 0 {
        (Some(total.to_string()), Some(total_free.to_string()))
    } else {
        (None, None)
    };

    LogicalVolumeRecord {
        drive_letter: Some(format!("{letter}:")),
        file_system,
        volume_label,
        size,
        free_space,
    }
}
