//! Base USB device service
//!
//! Owns the scan-then-cache lifecycle over the device directory. The
//! cache is a copy-on-write snapshot: `refresh()` builds a complete new
//! snapshot before swapping it in, and reads never trigger a scan - a
//! service that has never been refreshed reads as empty.

use std::collections::HashMap;
use std::sync::Arc;

use model::{BaseDeviceInfo, DeviceId, parse_bus_port, parse_ids};
use platform::{
    DeviceDirectory, DeviceNodeGraph, DevicePropertyStore, DeviceRecord,
    DEFAULT_MAX_ANCESTOR_DEPTH, PropertySelector, ancestors, dword_property_with_fallback,
    is_usb_candidate, string_property_with_fallback,
};
use tracing::{debug, info};

use crate::error::{Result, ServiceError};

#[derive(Default)]
struct BaseSnapshot {
    records: Vec<DeviceRecord>,
    index_by_id: HashMap<DeviceId, usize>,
}

impl BaseSnapshot {
    fn record(&self, id: &DeviceId) -> Option<&DeviceRecord> {
        self.index_by_id.get(id).map(|&i| &self.records[i])
    }
}

/// Cached view of all present USB devices
pub struct BaseDeviceService {
    directory: Arc<dyn DeviceDirectory + Send + Sync>,
    graph: Arc<dyn DeviceNodeGraph + Send + Sync>,
    properties: Arc<dyn DevicePropertyStore + Send + Sync>,
    max_ancestor_depth: usize,
    snapshot: Arc<BaseSnapshot>,
    generation: u64,
}

impl BaseDeviceService {
    pub fn new(
        directory: Arc<dyn DeviceDirectory + Send + Sync>,
        graph: Arc<dyn DeviceNodeGraph + Send + Sync>,
        properties: Arc<dyn DevicePropertyStore + Send + Sync>,
    ) -> Self {
        Self {
            directory,
            graph,
            properties,
            max_ancestor_depth: DEFAULT_MAX_ANCESTOR_DEPTH,
            snapshot: Arc::new(BaseSnapshot::default()),
            generation: 0,
        }
    }

    /// Override the ancestor-walk depth bound
    pub fn with_max_ancestor_depth(mut self, max_ancestor_depth: usize) -> Self {
        self.max_ancestor_depth = max_ancestor_depth;
        self
    }

    /// Rescan the device directory and swap in a fresh snapshot
    ///
    /// Returns the new generation; a caller juggling overlapping
    /// refreshes applies a result only when its generation is still the
    /// latest one issued.
    pub fn refresh(&mut self) -> u64 {
        let records: Vec<DeviceRecord> = self
            .directory
            .enumerate()
            .into_iter()
            .filter(|record| !record.instance_id.is_empty())
            .filter(is_usb_candidate)
            .collect();

        let mut index_by_id = HashMap::with_capacity(records.len());
        for (i, record) in records.iter().enumerate() {
            if let Ok(id) = DeviceId::new(&record.instance_id) {
                index_by_id.insert(id, i);
            }
        }

        info!(devices = records.len(), "USB device scan complete");
        self.snapshot = Arc::new(BaseSnapshot {
            records,
            index_by_id,
        });
        self.generation += 1;
        self.generation
    }

    /// Generation of the current snapshot
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// All cached USB device ids, ordered case-insensitively
    pub fn list_device_ids(&self) -> Vec<DeviceId> {
        let mut ids: Vec<DeviceId> = self.snapshot.index_by_id.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// The classified records backing the current snapshot
    pub fn usb_records(&self) -> &[DeviceRecord] {
        &self.snapshot.records
    }

    pub(crate) fn graph(&self) -> Arc<dyn DeviceNodeGraph + Send + Sync> {
        Arc::clone(&self.graph)
    }

    pub(crate) fn max_ancestor_depth(&self) -> usize {
        self.max_ancestor_depth
    }

    /// Full device info for one cached id
    ///
    /// Vendor/product ids come from the instance id itself when present
    /// there, otherwise from the nearest ancestor advertising them;
    /// composite and hub-bridged devices often only carry VID/PID on a
    /// parent node. Location and bus number always go through the
    /// ancestor-fallback property lookup. Speed classification uses the
    /// record's own strings only.
    pub fn get_device_info(&self, id: &DeviceId) -> Result<BaseDeviceInfo> {
        let record = self
            .snapshot
            .record(id)
            .ok_or_else(|| ServiceError::not_found(id))?;

        let parsed = parse_ids(id.as_str());
        let mut vendor_id = parsed.vendor_id;
        let mut product_id = parsed.product_id;
        if vendor_id.is_none() || product_id.is_none() {
            for ancestor in ancestors(&*self.graph, id, self.max_ancestor_depth) {
                let from_ancestor = parse_ids(ancestor.as_str());
                if vendor_id.is_none() {
                    vendor_id = from_ancestor.vendor_id;
                }
                if product_id.is_none() {
                    product_id = from_ancestor.product_id;
                }
                if vendor_id.is_some() && product_id.is_some() {
                    debug!(id = %id, via = %ancestor, "vendor/product resolved from ancestor");
                    break;
                }
            }
        }

        let location = string_property_with_fallback(
            &*self.graph,
            &*self.properties,
            id,
            PropertySelector::LocationInformation,
            self.max_ancestor_depth,
        );
        let (location_bus, port_number) = parse_bus_port(location.as_deref());

        // The dedicated bus-number property wins over the Hub_# token.
        let bus_number = dword_property_with_fallback(
            &*self.graph,
            &*self.properties,
            id,
            PropertySelector::BusNumber,
            self.max_ancestor_depth,
        )
        .or(location_bus);

        let usb_version = model::infer_speed(
            &record.compatible_ids,
            record.service.as_deref(),
            record.name.as_deref(),
            record.description.as_deref(),
            record.caption.as_deref(),
        );

        Ok(BaseDeviceInfo {
            id: id.clone(),
            vendor_id,
            product_id,
            manufacturer: record.manufacturer.clone(),
            product: record.name.clone(),
            serial_number: parsed.serial_number,
            bus_number,
            port_number,
            usb_version,
            speed_mbps: usb_version.map(|v| v.speed_mbps()),
            description: record.description.clone().or_else(|| record.name.clone()),
        })
    }
}
