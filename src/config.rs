/// Centralized configuration constants for wifikeeper

// Reachability probe
pub const PROBE_URL: &str = "https://www.google.com";
pub const PROBE_TIMEOUT_SECS: u64 = 5;

// Association
pub const ASSOCIATION_SETTLE_SECS: u64 = 5;
#[cfg(target_os = "macos")]
pub const MACOS_WIFI_INTERFACE: &str = "en0";

// Captive-portal login
pub const FORM_WAIT_TIMEOUT_SECS: u64 = 10;
pub const LOGIN_SETTLE_SECS: u64 = 5;

// Monitor loop
pub const MIN_CHECK_INTERVAL_SECS: u64 = 10;
pub const DEFAULT_CHECK_INTERVAL_SECS: u64 = 30;
pub const STOP_JOIN_TIMEOUT_MS: u64 = 1000;
pub const SLEEP_SLICE_MS: u64 = 250;
