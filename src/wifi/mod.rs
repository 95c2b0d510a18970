//! Wireless association management.
//!
//! `WifiPlatform` is the narrow per-OS seam: read the current association,
//! request a new one. Raw command output is interpreted only inside the
//! platform modules; everything above this point works with typed values.

#[cfg(target_os = "linux")]
mod linux;
#[cfg(target_os = "macos")]
mod macos;
#[cfg(windows)]
mod windows;

use std::time::Duration;

use tracing::{info, warn};

use crate::config;
use crate::error::PlatformResult;

#[cfg_attr(test, mockall::automock)]
pub trait WifiPlatform: Send + Sync {
    /// Network name of the current wireless association, if any
    fn current_association(&self) -> PlatformResult<Option<String>>;

    /// Ask the OS to associate with the named network (fire-and-forget)
    fn request_association(&self, network: &str) -> PlatformResult<()>;
}

/// Platform backend for the build target
pub fn default_platform() -> Box<dyn WifiPlatform> {
    #[cfg(target_os = "linux")]
    {
        Box::new(linux::NetworkManagerWifi)
    }
    #[cfg(target_os = "macos")]
    {
        Box::new(macos::AirportWifi)
    }
    #[cfg(windows)]
    {
        Box::new(windows::NativeWlan)
    }
}

/// Association inspector and controller over a platform backend.
///
/// Absence of proof is treated as "not associated": an empty network name
/// or any backend failure yields `false`, never a hard error, so the
/// monitor always has a safe next action.
pub struct Station {
    platform: Box<dyn WifiPlatform>,
    settle: Duration,
}

impl Station {
    pub fn new() -> Self {
        Self::with_platform(
            default_platform(),
            Duration::from_secs(config::ASSOCIATION_SETTLE_SECS),
        )
    }

    pub fn with_platform(platform: Box<dyn WifiPlatform>, settle: Duration) -> Self {
        Self { platform, settle }
    }

    /// Whether the device is currently associated to `network`.
    ///
    /// An empty name returns `false` without touching the platform.
    pub fn is_associated_to(&self, network: &str) -> bool {
        if network.is_empty() {
            return false;
        }
        match self.platform.current_association() {
            Ok(Some(current)) => current == network,
            Ok(None) => false,
            Err(err) => {
                warn!(%err, "could not query wireless association");
                false
            }
        }
    }

    /// Request association with `network`, wait for the OS handshake to
    /// settle, then confirm via inspection. No internal retry; the
    /// monitor retries at poll cadence.
    pub fn associate(&self, network: &str) -> bool {
        if network.is_empty() {
            return false;
        }
        if let Err(err) = self.platform.request_association(network) {
            warn!(network, %err, "association request failed");
            return false;
        }
        info!(network, "association requested, waiting for handshake");
        std::thread::sleep(self.settle);
        self.is_associated_to(network)
    }
}

impl Default for Station {
    fn default() -> Self {
        Self::new()
    }
}
