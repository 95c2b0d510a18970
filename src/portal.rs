//! Best-effort captive-portal form authentication.
//!
//! Login pages behind captive portals are heterogeneous and unversioned,
//! so no single selector is reliable. Each of the three form elements is
//! resolved through an ordered list of selector candidates; the first
//! match wins and exhaustion is a typed failure, never a guess at a
//! partial form. Every attempt runs in a fresh headless browser whose
//! process dies with the `Browser` value, so no error path can leave a
//! session behind.

use std::ffi::OsStr;
use std::time::Duration;

use headless_chrome::{Browser, LaunchOptions};
use secrecy::{ExposeSecret, SecretString};
use tracing::{info, warn};

use crate::config;
use crate::error::AuthError;

/// Candidate selectors tried in priority order: identifier, then name
/// attribute, then type attribute (then generic tag for the submit
/// control). Taken from the portal layouts seen in the field.
const USERNAME_SELECTORS: [&str; 4] =
    ["#username", "[name='username']", "[type='text']", "[type='email']"];
const PASSWORD_SELECTORS: [&str; 3] = ["#password", "[name='password']", "[type='password']"];
const SUBMIT_SELECTORS: [&str; 4] = ["[type='submit']", "button", "#loginButton", ".login-button"];

/// Selector for "anything that looks like a credential field", used to
/// wait out the initial page load.
const CREDENTIAL_FIELD_SELECTOR: &str =
    "input[type='text'], input[type='email'], #username, input[name='username']";

#[cfg_attr(test, mockall::automock)]
pub trait PortalLogin: Send + Sync {
    /// Try to log in at `url`. Always returns a definite boolean; causes
    /// are logged, never raised.
    fn authenticate(&self, url: &str, username: &str, password: &SecretString) -> bool;
}

pub struct HeadlessLogin {
    form_wait: Duration,
    settle: Duration,
}

impl HeadlessLogin {
    pub fn new() -> Self {
        Self {
            form_wait: Duration::from_secs(config::FORM_WAIT_TIMEOUT_SECS),
            settle: Duration::from_secs(config::LOGIN_SETTLE_SECS),
        }
    }

    fn attempt(&self, url: &str, username: &str, password: &SecretString) -> Result<(), AuthError> {
        let options = LaunchOptions {
            headless: true,
            sandbox: false,
            args: vec![
                OsStr::new("--disable-gpu"),
                OsStr::new("--no-sandbox"),
                OsStr::new("--disable-dev-shm-usage"),
            ],
            ..Default::default()
        };

        // The browser process is tied to this value; any early return
        // below tears the session down.
        let browser = Browser::new(options).map_err(|e| AuthError::Browser(e.to_string()))?;
        let tab = browser
            .new_tab()
            .map_err(|e| AuthError::Browser(e.to_string()))?;

        tab.navigate_to(url)
            .map_err(|e| AuthError::Browser(e.to_string()))?;
        tab.wait_for_element_with_custom_timeout(CREDENTIAL_FIELD_SELECTOR, self.form_wait)
            .map_err(|_| AuthError::PageTimeout)?;

        let username_field = first_match(&USERNAME_SELECTORS, |s| tab.find_element(s).ok());
        let password_field = first_match(&PASSWORD_SELECTORS, |s| tab.find_element(s).ok());
        let submit_control = first_match(&SUBMIT_SELECTORS, |s| tab.find_element(s).ok());

        let (Some(username_field), Some(password_field), Some(submit_control)) =
            (username_field, password_field, submit_control)
        else {
            return Err(AuthError::FormNotFound);
        };

        username_field
            .type_into(username)
            .map_err(|e| AuthError::Browser(e.to_string()))?;
        password_field
            .type_into(password.expose_secret())
            .map_err(|e| AuthError::Browser(e.to_string()))?;
        submit_control
            .click()
            .map_err(|e| AuthError::Browser(e.to_string()))?;

        // Let the portal process the submission server-side.
        std::thread::sleep(self.settle);
        Ok(())
    }
}

impl Default for HeadlessLogin {
    fn default() -> Self {
        Self::new()
    }
}

impl PortalLogin for HeadlessLogin {
    fn authenticate(&self, url: &str, username: &str, password: &SecretString) -> bool {
        let outcome = if url.is_empty() || username.is_empty() || password.expose_secret().is_empty()
        {
            Err(AuthError::MissingCredentials)
        } else {
            self.attempt(url, username, password)
        };

        match outcome {
            Ok(()) => {
                info!(url, "portal login submitted");
                true
            }
            Err(err) => {
                warn!(url, %err, "portal login failed");
                false
            }
        }
    }
}

/// Evaluate selector candidates in order; the first one the lookup
/// resolves wins.
fn first_match<T>(candidates: &[&str], mut lookup: impl FnMut(&str) -> Option<T>) -> Option<T> {
    candidates.iter().find_map(|selector| lookup(selector))
}
