//! Test host for the platform traits
//!
//! [`FakeHost`] implements every adapter trait over a scriptable
//! in-memory topology: tests register device records, parent links,
//! property bytes, per-node eject outcomes, and disk/partition/volume
//! associations, then drive the services against it. A successful eject
//! removes the ejected node's subtree from the directory, the way a real
//! hub-port eject takes its children with it.
//!
//! # Example
//!
//! ```
//! use platform::testing::FakeHost;
//! use platform::{PropertySelector, dword_property_with_fallback};
//! use model::DeviceId;
//!
//! let host = FakeHost::new();
//! host.set_parent("USBSTOR\\DISK&VEN_X\\SER", "USB\\HUB\\1");
//! host.set_dword_property("USB\\HUB\\1", PropertySelector::BusNumber, 2);
//!
//! let id = DeviceId::new("USBSTOR\\DISK&VEN_X\\SER").unwrap();
//! let bus = dword_property_with_fallback(&host, &host, &id, PropertySelector::BusNumber, 10);
//! assert_eq!(bus, Some(2));
//! ```

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use model::{ConfigRet, DeviceId};

use crate::directory::{DeviceDirectory, DeviceRecord};
use crate::properties::{DevicePropertyStore, PropertySelector};
use crate::topology::{DeviceNodeGraph, EjectAttempt, NodeHandle};
use crate::volumes::{DiskDriveRecord, LogicalVolumeRecord, PartitionRecord, VolumeDirectory};

#[derive(Default)]
struct FakeHostState {
    records: Vec<DeviceRecord>,
    nodes: HashMap<DeviceId, NodeHandle>,
    ids_by_handle: HashMap<NodeHandle, DeviceId>,
    parents: HashMap<NodeHandle, NodeHandle>,
    missing: HashSet<DeviceId>,
    properties: HashMap<(DeviceId, PropertySelector), Vec<u8>>,
    eject_outcomes: HashMap<DeviceId, EjectAttempt>,
    disks: Vec<DiskDriveRecord>,
    partitions: HashMap<DeviceId, Vec<PartitionRecord>>,
    volumes: HashMap<String, Vec<LogicalVolumeRecord>>,
    next_handle: u64,
    graph_calls: usize,
    eject_requests: usize,
}

impl FakeHostState {
    fn ensure_node(&mut self, instance_id: &str) -> NodeHandle {
        let id = DeviceId::new(instance_id).expect("fake host instance id");
        if let Some(handle) = self.nodes.get(&id) {
            return *handle;
        }
        self.next_handle += 1;
        let handle = NodeHandle(self.next_handle);
        self.nodes.insert(id.clone(), handle);
        self.ids_by_handle.insert(handle, id);
        handle
    }

    fn chain_contains(&self, mut node: NodeHandle, target: NodeHandle) -> bool {
        if node == target {
            return true;
        }
        // Bounded like the real walk; fake topologies are tiny anyway.
        for _ in 0..32 {
            match self.parents.get(&node) {
                Some(parent) => {
                    if *parent == target {
                        return true;
                    }
                    node = *parent;
                }
                None => return false,
            }
        }
        false
    }

    fn remove_subtree(&mut self, root: NodeHandle) {
        let removed: Vec<DeviceId> = self
            .nodes
            .iter()
            .filter(|(_, handle)| self.chain_contains(**handle, root))
            .map(|(id, _)| id.clone())
            .collect();

        for id in removed {
            self.missing.insert(id.clone());
            self.records
                .retain(|r| DeviceId::new(&r.instance_id).ok().as_ref() != Some(&id));
            self.disks
                .retain(|d| DeviceId::new(&d.instance_id).ok().as_ref() != Some(&id));
        }
    }
}

/// Scriptable in-memory implementation of all platform traits
#[derive(Default)]
pub struct FakeHost {
    state: Mutex<FakeHostState>,
}

impl FakeHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a directory record (and its device node)
    pub fn add_record(&self, record: DeviceRecord) {
        let mut state = self.state.lock().unwrap();
        state.ensure_node(&record.instance_id);
        state.records.push(record);
    }

    /// Register a bare record carrying only an instance id
    pub fn add_device(&self, instance_id: &str) {
        self.add_record(DeviceRecord {
            instance_id: instance_id.to_string(),
            ..Default::default()
        });
    }

    /// Link `child` to `parent` in the node graph, registering both
    pub fn set_parent(&self, child: &str, parent: &str) {
        let mut state = self.state.lock().unwrap();
        let child_handle = state.ensure_node(child);
        let parent_handle = state.ensure_node(parent);
        state.parents.insert(child_handle, parent_handle);
    }

    /// Store raw property bytes for a node
    pub fn set_property(&self, instance_id: &str, selector: PropertySelector, raw: Vec<u8>) {
        let mut state = self.state.lock().unwrap();
        state.ensure_node(instance_id);
        let id = DeviceId::new(instance_id).expect("fake host instance id");
        state.properties.insert((id, selector), raw);
    }

    /// Store a REG_SZ property (UTF-16LE with terminating NUL)
    pub fn set_string_property(&self, instance_id: &str, selector: PropertySelector, value: &str) {
        let raw: Vec<u8> = value
            .encode_utf16()
            .chain(std::iter::once(0))
            .flat_map(u16::to_le_bytes)
            .collect();
        self.set_property(instance_id, selector, raw);
    }

    /// Store a REG_DWORD property (little-endian)
    pub fn set_dword_property(&self, instance_id: &str, selector: PropertySelector, value: u32) {
        self.set_property(instance_id, selector, value.to_le_bytes().to_vec());
    }

    /// Script the outcome of eject requests against a node
    ///
    /// Unscripted nodes accept ejects.
    pub fn set_eject_outcome(&self, instance_id: &str, outcome: EjectAttempt) {
        let mut state = self.state.lock().unwrap();
        state.ensure_node(instance_id);
        let id = DeviceId::new(instance_id).expect("fake host instance id");
        state.eject_outcomes.insert(id, outcome);
    }

    /// Make locate fail for a node, as for an unplugged device
    pub fn remove_node(&self, instance_id: &str) {
        let mut state = self.state.lock().unwrap();
        let id = DeviceId::new(instance_id).expect("fake host instance id");
        state.missing.insert(id);
    }

    /// Register a USB disk drive
    pub fn add_disk(&self, instance_id: &str) {
        let mut state = self.state.lock().unwrap();
        state.disks.push(DiskDriveRecord {
            instance_id: instance_id.to_string(),
        });
    }

    /// Attach a partition to a disk, returning its directory id
    pub fn add_partition(&self, disk_instance_id: &str, partition_id: &str) {
        let mut state = self.state.lock().unwrap();
        let disk = DeviceId::new(disk_instance_id).expect("fake host instance id");
        state.partitions.entry(disk).or_default().push(PartitionRecord {
            id: partition_id.to_string(),
            disk_number: None,
            starting_offset: None,
        });
    }

    /// Attach a logical volume to a partition
    pub fn add_volume(&self, partition_id: &str, volume: LogicalVolumeRecord) {
        let mut state = self.state.lock().unwrap();
        state
            .volumes
            .entry(partition_id.to_string())
            .or_default()
            .push(volume);
    }

    /// Number of node-graph calls made so far (locate, parent, id, eject)
    pub fn graph_calls(&self) -> usize {
        self.state.lock().unwrap().graph_calls
    }

    /// Number of eject requests issued so far
    pub fn eject_requests(&self) -> usize {
        self.state.lock().unwrap().eject_requests
    }
}

impl DeviceDirectory for FakeHost {
    fn enumerate(&self) -> Vec<DeviceRecord> {
        self.state.lock().unwrap().records.clone()
    }
}

impl DeviceNodeGraph for FakeHost {
    fn locate(&self, instance_id: &DeviceId) -> Result<NodeHandle, ConfigRet> {
        let mut state = self.state.lock().unwrap();
        state.graph_calls += 1;
        if state.missing.contains(instance_id) {
            return Err(ConfigRet::NO_SUCH_DEVNODE);
        }
        state
            .nodes
            .get(instance_id)
            .copied()
            .ok_or(ConfigRet::NO_SUCH_DEVNODE)
    }

    fn parent_of(&self, node: NodeHandle) -> Option<NodeHandle> {
        let mut state = self.state.lock().unwrap();
        state.graph_calls += 1;
        state.parents.get(&node).copied()
    }

    fn instance_id_of(&self, node: NodeHandle) -> Option<String> {
        let mut state = self.state.lock().unwrap();
        state.graph_calls += 1;
        state
            .ids_by_handle
            .get(&node)
            .map(|id| id.as_str().to_string())
    }

    fn request_eject(&self, node: NodeHandle) -> EjectAttempt {
        let mut state = self.state.lock().unwrap();
        state.graph_calls += 1;
        state.eject_requests += 1;

        let outcome = state
            .ids_by_handle
            .get(&node)
            .and_then(|id| state.eject_outcomes.get(id).cloned())
            .unwrap_or_else(EjectAttempt::success);

        if outcome.status.is_success() {
            state.remove_subtree(node);
        }
        outcome
    }
}

impl DevicePropertyStore for FakeHost {
    fn read_property(
        &self,
        instance_id: &DeviceId,
        selector: PropertySelector,
    ) -> Option<Vec<u8>> {
        let state = self.state.lock().unwrap();
        if state.missing.contains(instance_id) {
            return None;
        }
        state.properties.get(&(instance_id.clone(), selector)).cloned()
    }
}

impl VolumeDirectory for FakeHost {
    fn usb_disk_drives(&self) -> Vec<DiskDriveRecord> {
        self.state.lock().unwrap().disks.clone()
    }

    fn partitions_of(&self, disk: &DiskDriveRecord) -> Vec<PartitionRecord> {
        let state = self.state.lock().unwrap();
        DeviceId::new(&disk.instance_id)
            .ok()
            .and_then(|id| state.partitions.get(&id).cloned())
            .unwrap_or_default()
    }

    fn logical_volumes_of(&self, partition: &PartitionRecord) -> Vec<LogicalVolumeRecord> {
        let state = self.state.lock().unwrap();
        state.volumes.get(&partition.id).cloned().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_locate_registered_node() {
        let host = FakeHost::new();
        host.add_device("USB\\A\\1");
        let id = DeviceId::new("USB\\A\\1").unwrap();
        assert!(host.locate(&id).is_ok());
    }

    #[test]
    fn test_locate_unknown_node_fails_with_code() {
        let host = FakeHost::new();
        let id = DeviceId::new("USB\\NOPE\\1").unwrap();
        assert_eq!(host.locate(&id), Err(ConfigRet::NO_SUCH_DEVNODE));
    }

    #[test]
    fn test_successful_eject_removes_subtree() {
        let host = FakeHost::new();
        host.add_device("USB\\HUB\\1");
        host.add_device("USBSTOR\\DISK\\1");
        host.set_parent("USBSTOR\\DISK\\1", "USB\\HUB\\1");

        let hub = host.locate(&DeviceId::new("USB\\HUB\\1").unwrap()).unwrap();
        let attempt = host.request_eject(hub);
        assert!(attempt.status.is_success());

        assert!(host.enumerate().is_empty());
        let child = DeviceId::new("USBSTOR\\DISK\\1").unwrap();
        assert_eq!(host.locate(&child), Err(ConfigRet::NO_SUCH_DEVNODE));
    }

    #[test]
    fn test_graph_call_counting() {
        let host = FakeHost::new();
        host.add_device("USB\\A\\1");
        let id = DeviceId::new("USB\\A\\1").unwrap();
        let before = host.graph_calls();
        let _ = host.locate(&id);
        assert_eq!(host.graph_calls(), before + 1);
    }
}
