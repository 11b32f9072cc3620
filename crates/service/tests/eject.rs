//! Integration tests for the safe-eject protocol
//!
//! Covers idempotence on absent ids, the ancestor-retry walk, veto
//! propagation, and last-failure reporting.

use std::sync::Arc;

use model::{ConfigRet, DeviceId, EjectResult, VetoType};
use platform::testing::FakeHost;
use platform::{DeviceRecord, EjectAttempt};
use service::{BaseDeviceService, EjectEngine, ServiceError, StorageDeviceService};

const DISK_ID: &str = "USBSTOR\\DISK&VEN_X\\SER01";
const HUB_ID: &str = "USB\\VID_05E3&PID_0608\\5&1";
const ROOT_ID: &str = "USB\\ROOT_HUB30\\4&1";

fn make_record(instance_id: &str) -> DeviceRecord {
    DeviceRecord {
        instance_id: instance_id.to_string(),
        ..Default::default()
    }
}

fn make_service(host: &Arc<FakeHost>) -> StorageDeviceService {
    let base = BaseDeviceService::new(host.clone(), host.clone(), host.clone());
    StorageDeviceService::new(base, host.clone())
}

fn veto(veto_type: VetoType, name: &str) -> EjectAttempt {
    EjectAttempt {
        status: ConfigRet::REMOVE_VETOED,
        veto_type: Some(veto_type),
        veto_name: Some(name.to_string()),
    }
}

fn id(s: &str) -> DeviceId {
    DeviceId::new(s).unwrap()
}

#[test]
fn test_eject_absent_id_is_idempotent_and_makes_no_os_calls() {
    let host = Arc::new(FakeHost::new());
    let mut service = make_service(&host);
    service.refresh();

    let missing = id(DISK_ID);
    let calls_after_refresh = host.graph_calls();

    for _ in 0..2 {
        let result = service.eject_device(&missing);
        assert!(matches!(result, Err(ServiceError::NotFound { .. })));
    }

    assert_eq!(host.graph_calls(), calls_after_refresh);
    assert_eq!(host.eject_requests(), 0);
}

#[test]
fn test_direct_eject_succeeds_on_first_node() {
    let host = Arc::new(FakeHost::new());
    host.add_record(make_record(DISK_ID));

    let mut service = make_service(&host);
    service.refresh();

    let result = service.eject_device(&id(DISK_ID)).unwrap();
    assert!(result.success);
    assert_eq!(result.attempted_instance_id, id(DISK_ID));
    assert_eq!(result.status, ConfigRet::SUCCESS);
    assert_eq!(host.eject_requests(), 1);
}

#[test]
fn test_vetoed_node_retries_on_ancestor() {
    let host = Arc::new(FakeHost::new());
    host.add_record(make_record(DISK_ID));
    host.set_parent(DISK_ID, HUB_ID);
    host.set_eject_outcome(DISK_ID, veto(VetoType::OutstandingOpen, "explorer.exe"));

    let mut service = make_service(&host);
    service.refresh();

    let result = service.eject_device(&id(DISK_ID)).unwrap();
    assert!(result.success);
    assert_eq!(result.attempted_instance_id, id(HUB_ID));
    assert_eq!(host.eject_requests(), 2);
}

#[test]
fn test_successful_eject_refreshes_the_cache() {
    let host = Arc::new(FakeHost::new());
    host.add_record(make_record(DISK_ID));
    host.set_parent(DISK_ID, HUB_ID);
    host.set_eject_outcome(DISK_ID, veto(VetoType::PendingClose, "backup.exe"));

    let mut service = make_service(&host);
    service.refresh();
    assert_eq!(service.list_storage_device_ids().len(), 1);
    let generation_before = service.generation();

    let result = service.eject_device(&id(DISK_ID)).unwrap();
    assert!(result.success);

    assert!(service.list_storage_device_ids().is_empty());
    assert_eq!(service.generation(), generation_before + 1);

    // The device is gone now; a second eject fails fast.
    let again = service.eject_device(&id(DISK_ID));
    assert!(matches!(again, Err(ServiceError::NotFound { .. })));
}

#[test]
fn test_exhausted_chain_reports_last_failure() {
    let host = Arc::new(FakeHost::new());
    host.add_record(make_record(DISK_ID));
    host.set_parent(DISK_ID, HUB_ID);
    host.set_parent(HUB_ID, ROOT_ID);
    host.set_eject_outcome(DISK_ID, veto(VetoType::OutstandingOpen, "explorer.exe"));
    host.set_eject_outcome(HUB_ID, veto(VetoType::Device, "hub busy"));
    host.set_eject_outcome(
        ROOT_ID,
        EjectAttempt {
            status: ConfigRet(0x33),
            veto_type: None,
            veto_name: None,
        },
    );

    let mut service = make_service(&host);
    service.refresh();

    let result = service.eject_device(&id(DISK_ID)).unwrap();
    assert!(!result.success);
    // The deepest ancestor's failure is the one reported.
    assert_eq!(result.attempted_instance_id, id(ROOT_ID));
    assert_eq!(result.status, ConfigRet(0x33));
    assert_eq!(result.veto_type, None);
    assert_eq!(host.eject_requests(), 3);
}

#[test]
fn test_veto_details_surface_in_the_result() {
    let host = Arc::new(FakeHost::new());
    host.add_record(make_record(DISK_ID));
    host.set_eject_outcome(DISK_ID, veto(VetoType::WindowsApp, "explorer.exe"));

    let mut service = make_service(&host);
    service.refresh();

    let result = service.eject_device(&id(DISK_ID)).unwrap();
    assert!(!result.success);
    assert_eq!(result.status, ConfigRet::REMOVE_VETOED);
    assert_eq!(result.veto_type, Some(VetoType::WindowsApp));
    assert_eq!(result.veto_name.as_deref(), Some("explorer.exe"));
}

#[test]
fn test_failed_eject_keeps_the_cache() {
    let host = Arc::new(FakeHost::new());
    host.add_record(make_record(DISK_ID));
    host.set_eject_outcome(DISK_ID, veto(VetoType::OutstandingOpen, "explorer.exe"));

    let mut service = make_service(&host);
    service.refresh();
    let generation_before = service.generation();

    let result = service.eject_device(&id(DISK_ID)).unwrap();
    assert!(!result.success);
    assert_eq!(service.generation(), generation_before);
    assert_eq!(service.list_storage_device_ids().len(), 1);
}

#[test]
fn test_stale_node_reports_locate_failure() {
    let host = Arc::new(FakeHost::new());
    host.add_record(make_record(DISK_ID));

    let mut service = make_service(&host);
    service.refresh();

    // Cached, but unplugged from the node graph after the scan.
    host.remove_node(DISK_ID);

    let result = service.eject_device(&id(DISK_ID)).unwrap();
    assert!(!result.success);
    assert_eq!(result.attempted_instance_id, id(DISK_ID));
    assert_eq!(result.status, ConfigRet::NO_SUCH_DEVNODE);
    assert_eq!(result.veto_type, None);
    assert_eq!(host.eject_requests(), 0);
}

#[test]
fn test_engine_walks_locate_failures_to_next_ancestor() {
    // Exercise the engine directly: the target node is gone but its
    // parent is still present and accepts the eject.
    let host = Arc::new(FakeHost::new());
    host.set_parent(DISK_ID, HUB_ID);

    let engine = EjectEngine::new(host.clone());
    host.remove_node(DISK_ID);

    let result: EjectResult = engine.eject(&id(DISK_ID));
    // The ancestor walk starts from the target node, which no longer
    // resolves, so only the target itself is attempted.
    assert!(!result.success);
    assert_eq!(result.attempted_instance_id, id(DISK_ID));
    assert_eq!(result.status, ConfigRet::NO_SUCH_DEVNODE);
}
