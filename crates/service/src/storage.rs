//! USB storage device service
//!
//! Restricts the base view to mass-storage instances and joins each one
//! to its disk-drive -> partition -> logical-volume chain. Storage data
//! is always layered on a fresh base scan: `refresh()` here refreshes
//! the base service first.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use model::{DeviceId, EjectResult, StorageDeviceInfo, VolumeInfo};
use platform::{LogicalVolumeRecord, VolumeDirectory, is_usb_storage};
use tracing::{debug, info};

use crate::base::BaseDeviceService;
use crate::eject::EjectEngine;
use crate::error::{Result, ServiceError};

#[derive(Default)]
struct StorageSnapshot {
    ids: Vec<DeviceId>,
    volumes_by_id: HashMap<DeviceId, Vec<VolumeInfo>>,
}

/// Cached view of USB mass-storage devices and their volumes
pub struct StorageDeviceService {
    base: BaseDeviceService,
    volumes: Arc<dyn VolumeDirectory + Send + Sync>,
    engine: EjectEngine,
    snapshot: StorageSnapshot,
    generation: u64,
}

impl StorageDeviceService {
    pub fn new(
        base: BaseDeviceService,
        volumes: Arc<dyn VolumeDirectory + Send + Sync>,
    ) -> Self {
        let engine =
            EjectEngine::new(base.graph()).with_max_ancestor_depth(base.max_ancestor_depth());
        Self {
            base,
            volumes,
            engine,
            snapshot: StorageSnapshot::default(),
            generation: 0,
        }
    }

    /// The underlying base device service
    pub fn base(&self) -> &BaseDeviceService {
        &self.base
    }

    /// Refresh the base scan, then rebuild the storage snapshot on it
    pub fn refresh(&mut self) -> u64 {
        self.base.refresh();

        let mut ids: Vec<DeviceId> = Vec::new();
        for record in self.base.usb_records() {
            if is_usb_storage(record)
                && let Ok(id) = DeviceId::new(&record.instance_id)
            {
                ids.push(id);
            }
        }
        ids.sort();

        let mut disk_volumes: HashMap<DeviceId, Vec<VolumeInfo>> = HashMap::new();
        for disk in self.volumes.usb_disk_drives() {
            let Ok(disk_id) = DeviceId::new(&disk.instance_id) else {
                continue;
            };
            let mut resolved: Vec<VolumeInfo> = self
                .volumes
                .partitions_of(&disk)
                .iter()
                .flat_map(|partition| self.volumes.logical_volumes_of(partition))
                .map(|record| volume_from_record(&record))
                .collect();
            resolved.sort_by_key(|v| {
                v.drive_letter
                    .as_deref()
                    .unwrap_or_default()
                    .to_ascii_lowercase()
            });
            debug!(disk = %disk_id, volumes = resolved.len(), "volumes resolved");
            disk_volumes.insert(disk_id, resolved);
        }

        let volumes_by_id = ids
            .iter()
            .map(|id| {
                let volumes = disk_volumes.get(id).cloned().unwrap_or_default();
                (id.clone(), volumes)
            })
            .collect();

        info!(devices = ids.len(), "USB storage scan complete");
        self.snapshot = StorageSnapshot { ids, volumes_by_id };
        self.generation += 1;
        self.generation
    }

    /// Generation of the current storage snapshot
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// All cached storage device ids, ordered case-insensitively
    pub fn list_storage_device_ids(&self) -> Vec<DeviceId> {
        self.snapshot.ids.clone()
    }

    /// Storage device info for one cached id, volumes included
    pub fn get_storage_device_info(&self, id: &DeviceId) -> Result<StorageDeviceInfo> {
        if !self.snapshot.volumes_by_id.contains_key(id) {
            return Err(ServiceError::not_found(id));
        }

        let base = self.base.get_device_info(id)?;
        let volumes = self
            .snapshot
            .volumes_by_id
            .get(id)
            .cloned()
            .unwrap_or_default();
        Ok(StorageDeviceInfo { base, volumes })
    }

    /// Safe-eject one cached storage device
    ///
    /// Fails fast with NotFound before any OS call when the id is not in
    /// the current cache; on a successful eject the snapshot is
    /// refreshed so subsequent reads reflect the removal.
    pub fn eject_device(&mut self, id: &DeviceId) -> Result<EjectResult> {
        if !self.snapshot.volumes_by_id.contains_key(id) {
            return Err(ServiceError::not_found(id));
        }

        let result = self.engine.eject(id);
        if result.success {
            self.refresh();
        }
        Ok(result)
    }
}

fn volume_from_record(record: &LogicalVolumeRecord) -> VolumeInfo {
    let mount_path = record
        .drive_letter
        .as_ref()
        .map(|letter| PathBuf::from(format!("{letter}\\")));

    VolumeInfo {
        drive_letter: record.drive_letter.clone(),
        mount_path,
        file_system: record.file_system.clone(),
        volume_label: record.volume_label.clone(),
        total_bytes: parse_optional_u64(record.size.as_deref()),
        free_bytes: parse_optional_u64(record.free_space.as_deref()),
    }
}

/// Size strings come from the directory as-is; garbage decodes to `None`
fn parse_optional_u64(value: Option<&str>) -> Option<u64> {
    let trimmed = value?.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed.parse().ok()
}
