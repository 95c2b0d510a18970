//! Windows backend via the native WLAN API.
//!
//! Association requests go through the saved profile matching the
//! network name; creating new profiles is out of scope here.

use windows::{
    Win32::{
        Foundation::{ERROR_SUCCESS, HANDLE},
        NetworkManagement::WiFi::*,
    },
    core::{GUID, PCWSTR},
};

use crate::error::{PlatformError, PlatformResult};
use crate::wifi::WifiPlatform;

pub struct NativeWlan;

impl WifiPlatform for NativeWlan {
    fn current_association(&self) -> PlatformResult<Option<String>> {
        let handle = WlanHandle::open()?;
        let guid = handle.interface_guid()?;

        let mut current = None;
        unsafe {
            let mut data_size = 0;
            let mut data_ptr: *mut std::ffi::c_void = std::ptr::null_mut();
            let mut opcode_value_type = wlan_opcode_value_type_invalid;

            let result = WlanQueryInterface(
                handle.as_raw(),
                &guid,
                wlan_intf_opcode_current_connection,
                None,
                &mut data_size,
                &mut data_ptr,
                Some(&mut opcode_value_type),
            );

            // No current connection also surfaces as a failed query; treat
            // only a successful read as proof of association.
            if result == ERROR_SUCCESS.0 {
                let attributes = &*(data_ptr as *const WLAN_CONNECTION_ATTRIBUTES);
                if attributes.isState == wlan_interface_state_connected {
                    let ssid_len =
                        attributes.wlanAssociationAttributes.dot11Ssid.uSSIDLength as usize;
                    let ssid_bytes =
                        &attributes.wlanAssociationAttributes.dot11Ssid.ucSSID[..ssid_len];
                    current = Some(String::from_utf8_lossy(ssid_bytes).to_string());
                }
                WlanFreeMemory(data_ptr);
            }
        }
        Ok(current)
    }

    fn request_association(&self, network: &str) -> PlatformResult<()> {
        let handle = WlanHandle::open()?;
        let guid = handle.interface_guid()?;

        unsafe {
            let name_wide: Vec<u16> = network.encode_utf16().chain(std::iter::once(0)).collect();
            let connection_params = WLAN_CONNECTION_PARAMETERS {
                wlanConnectionMode: wlan_connection_mode_profile,
                strProfile: PCWSTR(name_wide.as_ptr()),
                pDot11Ssid: std::ptr::null_mut(),
                pDesiredBssidList: std::ptr::null_mut(),
                dot11BssType: dot11_BSS_type_infrastructure,
                dwFlags: 0,
            };

            let result = WlanConnect(handle.as_raw(), &guid, &connection_params, None);
            if result != ERROR_SUCCESS.0 {
                return Err(PlatformError::Native {
                    call: "WlanConnect",
                    code: result,
                });
            }
        }
        Ok(())
    }
}

/// Safe wrapper around a WLAN handle that closes on drop
struct WlanHandle {
    handle: HANDLE,
}

impl WlanHandle {
    fn open() -> PlatformResult<Self> {
        let mut negotiated_version = 0;
        let mut handle = HANDLE::default();
        unsafe {
            let result = WlanOpenHandle(2, None, &mut negotiated_version, &mut handle);
            if result != ERROR_SUCCESS.0 {
                return Err(PlatformError::Native {
                    call: "WlanOpenHandle",
                    code: result,
                });
            }
        }
        Ok(Self { handle })
    }

    fn as_raw(&self) -> HANDLE {
        self.handle
    }

    /// GUID of the first wireless interface
    fn interface_guid(&self) -> PlatformResult<GUID> {
        unsafe {
            let mut interface_list: *mut WLAN_INTERFACE_INFO_LIST = std::ptr::null_mut();
            let result = WlanEnumInterfaces(self.handle, None, &mut interface_list);
            if result != ERROR_SUCCESS.0 {
                return Err(PlatformError::Native {
                    call: "WlanEnumInterfaces",
                    code: result,
                });
            }

            if (*interface_list).dwNumberOfItems == 0 {
                WlanFreeMemory(interface_list as *mut _);
                return Err(PlatformError::NoInterface);
            }

            let guid = (*interface_list).InterfaceInfo[0].InterfaceGuid;
            WlanFreeMemory(interface_list as *mut _);
            Ok(guid)
        }
    }
}

impl Drop for WlanHandle {
    fn drop(&mut self) {
        unsafe {
            let _ = WlanCloseHandle(self.handle, None);
        }
    }
}
