//! macOS backend via `networksetup`.
//!
//! Apple removed the `airport` CLI in Sonoma 14.4+, so both the read and
//! the write side go through `networksetup` on the primary Wi-Fi
//! interface.

use std::process::Command;

use crate::config;
use crate::error::{PlatformError, PlatformResult};
use crate::wifi::WifiPlatform;

pub struct AirportWifi;

impl WifiPlatform for AirportWifi {
    fn current_association(&self) -> PlatformResult<Option<String>> {
        let output = Command::new("networksetup")
            .args(["-getairportnetwork", config::MACOS_WIFI_INTERFACE])
            .output()
            .map_err(|source| PlatformError::Spawn {
                command: "networksetup",
                source,
            })?;

        if !output.status.success() {
            return Err(PlatformError::CommandFailed {
                command: "networksetup",
                code: output.status.code().unwrap_or(-1),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        parse_current_network(&String::from_utf8_lossy(&output.stdout))
            .ok_or(PlatformError::UnexpectedOutput {
                command: "networksetup",
            })
    }

    fn request_association(&self, network: &str) -> PlatformResult<()> {
        let output = Command::new("networksetup")
            .args(["-setairportnetwork", config::MACOS_WIFI_INTERFACE, network])
            .output()
            .map_err(|source| PlatformError::Spawn {
                command: "networksetup",
                source,
            })?;

        if !output.status.success() {
            return Err(PlatformError::CommandFailed {
                command: "networksetup",
                code: output.status.code().unwrap_or(-1),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(())
    }
}

/// Interpret `-getairportnetwork` output.
///
/// Returns `Some(None)` flattened as the outer Option: `None` means the
/// output was unrecognizable, `Some(None)` would be "recognized, no
/// association" — encoded here as `Some(None)` via nested Option.
fn parse_current_network(output: &str) -> Option<Option<String>> {
    let line = output.lines().next()?.trim();
    if line.contains("not associated") {
        return Some(None);
    }
    // "Current Wi-Fi Network: <ssid>" (older releases say "AirPort Network")
    let (label, ssid) = line.split_once(": ")?;
    if !label.ends_with("Network") {
        return None;
    }
    Some(Some(ssid.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn associated_output_yields_ssid() {
        assert_eq!(
            parse_current_network("Current Wi-Fi Network: CampusNet\n"),
            Some(Some("CampusNet".into()))
        );
    }

    #[test]
    fn unassociated_output_yields_none() {
        assert_eq!(
            parse_current_network("You are not associated with an AirPort network.\n"),
            Some(None)
        );
    }

    #[test]
    fn garbage_output_is_rejected() {
        assert_eq!(parse_current_network("Wi-Fi Power (en0): On\n"), None);
        assert_eq!(parse_current_network(""), None);
    }

    #[test]
    fn ssid_containing_separator_survives() {
        assert_eq!(
            parse_current_network("Current Wi-Fi Network: Cafe: Upstairs\n"),
            Some(Some("Cafe: Upstairs".into()))
        );
    }
}
