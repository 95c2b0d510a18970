//! NetworkManager (`nmcli`) backend.

use std::process::Command;

use crate::error::{PlatformError, PlatformResult};
use crate::wifi::WifiPlatform;

pub struct NetworkManagerWifi;

impl WifiPlatform for NetworkManagerWifi {
    fn current_association(&self) -> PlatformResult<Option<String>> {
        let output = Command::new("nmcli")
            .args(["--terse", "--fields", "active,ssid", "device", "wifi"])
            .output()
            .map_err(|source| PlatformError::Spawn {
                command: "nmcli",
                source,
            })?;

        if !output.status.success() {
            return Err(PlatformError::CommandFailed {
                command: "nmcli",
                code: output.status.code().unwrap_or(-1),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(parse_active_ssid(&String::from_utf8_lossy(&output.stdout)))
    }

    fn request_association(&self, network: &str) -> PlatformResult<()> {
        let output = Command::new("nmcli")
            .args(["--terse", "device", "wifi", "connect", network])
            .output()
            .map_err(|source| PlatformError::Spawn {
                command: "nmcli",
                source,
            })?;

        if !output.status.success() {
            return Err(PlatformError::CommandFailed {
                command: "nmcli",
                code: output.status.code().unwrap_or(-1),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(())
    }
}

/// Extract the SSID of the active network from terse `active,ssid` output
fn parse_active_ssid(output: &str) -> Option<String> {
    output
        .lines()
        .find_map(|line| line.strip_prefix("yes:"))
        .map(unescape_terse)
        .filter(|ssid| !ssid.is_empty())
}

/// Undo terse-mode escaping (`\:` and `\\`)
fn unescape_terse(field: &str) -> String {
    let mut out = String::with_capacity(field.len());
    let mut chars = field.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(escaped) = chars.next() {
                out.push(escaped);
            }
        } else {
            out.push(c);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn active_line_wins() {
        let output = "no:Neighbor\nyes:CampusNet\nno:Other\n";
        assert_eq!(parse_active_ssid(output), Some("CampusNet".into()));
    }

    #[test]
    fn no_active_line_means_unassociated() {
        assert_eq!(parse_active_ssid("no:Neighbor\nno:Other\n"), None);
        assert_eq!(parse_active_ssid(""), None);
    }

    #[test]
    fn terse_escapes_are_undone() {
        assert_eq!(
            parse_active_ssid(r"yes:Cafe\: Upstairs"),
            Some("Cafe: Upstairs".into())
        );
        assert_eq!(parse_active_ssid(r"yes:Back\\slash"), Some(r"Back\slash".into()));
    }

    #[test]
    fn active_hidden_network_without_ssid_is_ignored() {
        assert_eq!(parse_active_ssid("yes:\n"), None);
    }
}
