//! wifikeeper keeps a machine attached to one configured Wi-Fi network
//! and clears captive-portal logins without user intervention.
//!
//! The engine is a poll loop over two externally-observed signals: link
//! association and upstream reachability. When the link drops it
//! re-associates; when the link is up but the internet is gated it drives
//! a headless browser through best-effort login-form discovery. Every
//! fault inside the loop degrades to "try again next tick" rather than
//! terminating.

pub mod config;
pub mod error;
pub mod monitor;
pub mod portal;
pub mod probe;
pub mod settings;
pub mod wifi;

pub use monitor::{ConnectionState, DisplayStatus, Monitor};
pub use portal::{HeadlessLogin, PortalLogin};
pub use probe::{HttpProbe, ReachabilityProbe};
pub use settings::Settings;
pub use wifi::Station;
