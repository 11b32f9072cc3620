//! Eject outcomes
//!
//! A refused eject is an expected, user-actionable result rather than a
//! programming error, so the engine reports it as a plain value: success
//! flag, the node actually attempted, the raw status code, and the veto
//! details when the OS names a blocking resource.

use serde::{Deserialize, Serialize};

use crate::id::DeviceId;

/// Raw configuration-manager status code
///
/// Zero is success; everything else is a CR_* failure. Only the codes the
/// core itself produces get named constants, the rest pass through as-is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigRet(pub u32);

impl ConfigRet {
    /// CR_SUCCESS
    pub const SUCCESS: ConfigRet = ConfigRet(0x0000_0000);
    /// CR_NO_SUCH_DEVNODE - the instance id resolved to no present node
    pub const NO_SUCH_DEVNODE: ConfigRet = ConfigRet(0x0000_000D);
    /// CR_REMOVE_VETOED - the eject request was refused
    pub const REMOVE_VETOED: ConfigRet = ConfigRet(0x0000_0017);

    pub fn is_success(self) -> bool {
        self.0 == 0
    }
}

/// Reason class the OS reports for a refused eject
///
/// Mirrors the PNP_VETO_TYPE codes one-to-one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VetoType {
    TypeUnknown,
    LegacyDevice,
    PendingClose,
    WindowsApp,
    WindowsService,
    OutstandingOpen,
    Device,
    Driver,
    IllegalDeviceRequest,
    InsufficientPower,
    NonDisableable,
    LegacyDriver,
    InsufficientRights,
}

impl VetoType {
    /// Map a raw PNP_VETO_TYPE value; out-of-range values yield `None`
    pub fn from_raw(raw: u32) -> Option<Self> {
        match raw {
            0 => Some(VetoType::TypeUnknown),
            1 => Some(VetoType::LegacyDevice),
            2 => Some(VetoType::PendingClose),
            3 => Some(VetoType::WindowsApp),
            4 => Some(VetoType::WindowsService),
            5 => Some(VetoType::OutstandingOpen),
            6 => Some(VetoType::Device),
            7 => Some(VetoType::Driver),
            8 => Some(VetoType::IllegalDeviceRequest),
            9 => Some(VetoType::InsufficientPower),
            10 => Some(VetoType::NonDisableable),
            11 => Some(VetoType::LegacyDriver),
            12 => Some(VetoType::InsufficientRights),
            _ => None,
        }
    }
}

/// Outcome of one eject request
///
/// `attempted_instance_id` is the node the final request went to, which
/// may be an ancestor of the id the caller asked for. Veto fields are
/// present only when the attempt failed because a resource was in use.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EjectResult {
    /// Whether any node in the chain accepted the eject
    pub success: bool,
    /// The instance id the reported attempt went to
    pub attempted_instance_id: DeviceId,
    /// Raw status code of the reported attempt
    pub status: ConfigRet,
    /// Veto reason class, when the OS reported one
    pub veto_type: Option<VetoType>,
    /// Human-readable name of the vetoing resource
    pub veto_name: Option<String>,
}

impl EjectResult {
    /// Successful attempt against `attempted`
    pub fn succeeded(attempted: DeviceId) -> Self {
        Self {
            success: true,
            attempted_instance_id: attempted,
            status: ConfigRet::SUCCESS,
            veto_type: None,
            veto_name: None,
        }
    }

    /// Failed attempt against `attempted`
    pub fn failed(
        attempted: DeviceId,
        status: ConfigRet,
        veto_type: Option<VetoType>,
        veto_name: Option<String>,
    ) -> Self {
        Self {
            success: false,
            attempted_instance_id: attempted,
            status,
            veto_type,
            veto_name,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_code() {
        assert!(ConfigRet::SUCCESS.is_success());
        assert!(!ConfigRet::NO_SUCH_DEVNODE.is_success());
        assert!(!ConfigRet(0x33).is_success());
    }

    #[test]
    fn test_veto_type_round_trip() {
        assert_eq!(VetoType::from_raw(0), Some(VetoType::TypeUnknown));
        assert_eq!(VetoType::from_raw(5), Some(VetoType::OutstandingOpen));
        assert_eq!(VetoType::from_raw(12), Some(VetoType::InsufficientRights));
        assert_eq!(VetoType::from_raw(13), None);
    }

    #[test]
    fn test_succeeded_carries_zero_status() {
        let id = DeviceId::new("USB\\X\\Y").unwrap();
        let result = EjectResult::succeeded(id.clone());
        assert!(result.success);
        assert_eq!(result.attempted_instance_id, id);
        assert_eq!(result.status, ConfigRet::SUCCESS);
        assert!(result.veto_type.is_none());
    }

    #[test]
    fn test_failed_keeps_veto_details() {
        let id = DeviceId::new("USB\\X\\Y").unwrap();
        let result = EjectResult::failed(
            id,
            ConfigRet::REMOVE_VETOED,
            Some(VetoType::WindowsApp),
            Some("explorer.exe".to_string()),
        );
        assert!(!result.success);
        assert_eq!(result.veto_type, Some(VetoType::WindowsApp));
        assert_eq!(result.veto_name.as_deref(), Some("explorer.exe"));
    }
}
