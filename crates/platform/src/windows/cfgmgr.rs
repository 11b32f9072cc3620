//! CfgMgr32-backed device-node graph and eject requests

use model::{ConfigRet, DeviceId, VetoType};
use tracing::debug;
use windows_sys::Win32::Devices::DeviceAndDriverInstallation::{
    CM_Get_Device_ID_Size, CM_Get_Device_IDW, CM_Get_Parent, CM_LOCATE_DEVNODE_NORMAL,
    CM_Locate_DevNodeW, CM_Request_Device_EjectW, CR_SUCCESS, PNP_VETO_TYPE,
};
use windows_sys::Win32::Foundation::MAX_PATH;

use crate::topology::{DeviceNodeGraph, EjectAttempt, NodeHandle};
use crate::windows::WindowsHost;
use crate::windows::wide::{from_wide, to_wide};

impl DeviceNodeGraph for WindowsHost {
    fn locate(&self, instance_id: &DeviceId) -> Result<NodeHandle, ConfigRet> {
        let wide = to_wide(instance_id.as_str());
        let mut devinst = 0u32;
        let ret = unsafe {
            CM_Locate_DevNodeW(&mut devinst, wide.as_ptr(), CM_LOCATE_DEVNODE_NORMAL)
        };
        if ret == CR_SUCCESS {
            Ok(NodeHandle(devinst as u64))
        } else {
            Err(ConfigRet(ret))
        }
    }

    fn parent_of(&self, node: NodeHandle) -> Option<NodeHandle> {
        let mut parent = 0u32;
        let ret = unsafe { CM_Get_Parent(&mut parent, node.0 as u32, 0) };
        if ret == CR_SUCCESS {
            Some(NodeHandle(parent as u64))
        } else {
            None
        }
    }

    fn instance_id_of(&self, node: NodeHandle) -> Option<String> {
        let mut len = 0u32;
        let ret = unsafe { CM_Get_Device_ID_Size(&mut len, node.0 as u32, 0) };
        if ret != CR_SUCCESS || len == 0 {
            return None;
        }

        let mut buf = vec![0u16; len as usize + 1];
        let ret = unsafe {
            CM_Get_Device_IDW(node.0 as u32, buf.as_mut_ptr(), buf.len() as u32, 0)
        };
        if ret != CR_SUCCESS {
            return None;
        }
        let id = from_wide(&buf);
        if id.is_empty() { None } else { Some(id) }
    }

    fn request_eject(&self, node: NodeHandle) -> EjectAttempt {
        let mut veto_type: PNP_VETO_TYPE = 0;
        let mut veto_name = [0u16; MAX_PATH as usize];
        let ret = unsafe {
            CM_Request_Device_EjectW(
                node.0 as u32,
                &mut veto_type,
                veto_name.as_mut_ptr(),
                veto_name.len() as u32,
                0,
            )
        };

        if ret == CR_SUCCESS {
            return EjectAttempt::success();
        }

        let name = from_wide(&veto_name);
        debug!(
            devinst = node.0,
            status = ret,
            veto_type,
            veto_name = %name,
            "eject request refused"
        );
        EjectAttempt {
            status: ConfigRet(ret),
            veto_type: VetoType::from_raw(veto_type as u32),
            veto_name: if name.is_empty() { None } else { Some(name) },
        }
    }
}
