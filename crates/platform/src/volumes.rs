//! Disk and volume directory
//!
//! Storage devices are joined to their mounted volumes through the
//! disk-drive -> partition -> logical-volume association chain. Sizes
//! stay string-typed at this boundary; the storage service parses them
//! defensively.

/// One USB disk drive
#[derive(Debug, Clone, PartialEq)]
pub struct DiskDriveRecord {
    /// PnP instance id of the disk, e.g. `USBSTOR\DISK&VEN_X\0123`
    pub instance_id: String,
}

/// One partition on a disk
#[derive(Debug, Clone, PartialEq)]
pub struct PartitionRecord {
    /// Directory-assigned partition identifier,
    /// e.g. `Disk #1, Partition #0`
    pub id: String,
    /// Disk number the partition lives on, when known
    pub disk_number: Option<u32>,
    /// Byte offset of the partition on its disk, when known
    pub starting_offset: Option<u64>,
}

/// One logical volume mounted from a partition
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LogicalVolumeRecord {
    /// Drive letter, e.g. `E:`
    pub drive_letter: Option<String>,
    /// Filesystem name, e.g. `NTFS`
    pub file_system: Option<String>,
    /// Volume label
    pub volume_label: Option<String>,
    /// Total size in bytes, as reported (string-typed, possibly garbage)
    pub size: Option<String>,
    /// Free space in bytes, as reported (string-typed, possibly garbage)
    pub free_space: Option<String>,
}

/// The disk/volume association directory
pub trait VolumeDirectory {
    /// All present USB disk drives
    fn usb_disk_drives(&self) -> Vec<DiskDriveRecord>;

    /// Partitions of one disk; empty when none are discoverable
    fn partitions_of(&self, disk: &DiskDriveRecord) -> Vec<PartitionRecord>;

    /// Logical volumes mounted from one partition; empty when none
    fn logical_volumes_of(&self, partition: &PartitionRecord) -> Vec<LogicalVolumeRecord>;
}
