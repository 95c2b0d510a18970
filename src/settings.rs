//! Persisted user configuration.
//!
//! One JSON record under the OS config directory. The monitor consumes it
//! read-only at startup; mutation happens only through an explicit
//! [`Settings::save`]. A missing or corrupt file loads as the default
//! (empty network name, so the monitor idles) rather than failing.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::config;
use crate::error::SettingsError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub network_name: String,
    pub login_url: String,
    pub username: String,
    pub password: String,
    pub check_interval: u64,
    pub auto_start: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            network_name: String::new(),
            login_url: String::new(),
            username: String::new(),
            password: String::new(),
            check_interval: config::DEFAULT_CHECK_INTERVAL_SECS,
            auto_start: true,
        }
    }
}

impl Settings {
    /// Default location of the configuration record
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("wifikeeper")
            .join("config.json")
    }

    /// Load settings from `path`, falling back to the default on any failure
    pub fn load(path: &Path) -> Self {
        let raw = match std::fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(err) => {
                if err.kind() != std::io::ErrorKind::NotFound {
                    warn!(path = %path.display(), %err, "could not read configuration, using defaults");
                }
                return Self::default();
            }
        };

        let mut settings: Self = match serde_json::from_str(&raw) {
            Ok(settings) => settings,
            Err(err) => {
                warn!(path = %path.display(), %err, "configuration is not valid JSON, using defaults");
                return Self::default();
            }
        };
        settings.clamp_interval();
        settings
    }

    /// Save settings to `path`, clamping the poll interval first.
    ///
    /// The file is written with mode 0600 on Unix since it may carry
    /// portal credentials.
    pub fn save(&mut self, path: &Path) -> Result<(), SettingsError> {
        self.clamp_interval();

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))?;
        }
        Ok(())
    }

    fn clamp_interval(&mut self) {
        if self.check_interval < config::MIN_CHECK_INTERVAL_SECS {
            warn!(
                requested = self.check_interval,
                minimum = config::MIN_CHECK_INTERVAL_SECS,
                "check interval below minimum, clamping"
            );
            self.check_interval = config::MIN_CHECK_INTERVAL_SECS;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_config() -> (tempfile::TempDir, PathBuf) {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("config.json");
        (dir, path)
    }

    #[test]
    fn missing_file_loads_default() {
        let (_dir, path) = temp_config();
        assert_eq!(Settings::load(&path), Settings::default());
    }

    #[test]
    fn corrupt_file_loads_default() {
        let (_dir, path) = temp_config();
        std::fs::write(&path, "{not json").unwrap();
        assert_eq!(Settings::load(&path), Settings::default());
    }

    #[test]
    fn save_then_load_round_trips() {
        let (_dir, path) = temp_config();
        let mut settings = Settings {
            network_name: "CampusNet".into(),
            login_url: "https://portal.example/login".into(),
            username: "student".into(),
            password: "hunter2".into(),
            check_interval: 45,
            auto_start: false,
        };
        settings.save(&path).unwrap();
        assert_eq!(Settings::load(&path), settings);
    }

    #[test]
    fn save_clamps_short_interval() {
        let (_dir, path) = temp_config();
        let mut settings = Settings {
            check_interval: 3,
            ..Settings::default()
        };
        settings.save(&path).unwrap();
        assert_eq!(settings.check_interval, config::MIN_CHECK_INTERVAL_SECS);
        assert_eq!(
            Settings::load(&path).check_interval,
            config::MIN_CHECK_INTERVAL_SECS
        );
    }

    #[test]
    fn load_clamps_hand_edited_interval() {
        let (_dir, path) = temp_config();
        std::fs::write(&path, r#"{"network_name":"x","check_interval":1}"#).unwrap();
        assert_eq!(
            Settings::load(&path).check_interval,
            config::MIN_CHECK_INTERVAL_SECS
        );
    }

    #[cfg(unix)]
    #[test]
    fn saved_file_is_owner_readable_only() {
        use std::os::unix::fs::PermissionsExt;
        let (_dir, path) = temp_config();
        Settings::default().save(&path).unwrap();
        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }
}
