//! The connectivity monitor loop.
//!
//! One background worker polls association and reachability, re-associates
//! and drives portal login as needed, and publishes a display status
//! through a watch channel. The worker is the only writer; the CLI (or
//! any other presentation layer) only reads.
//!
//! Cancellation is cooperative: the stop flag is observed at the top of
//! each tick and at the sleep boundary, and an in-flight tick always
//! completes. Interrupting a browser session mid-login could leak a live
//! process, so no tick is ever aborted.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use secrecy::SecretString;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use crate::config;
use crate::error::TickError;
use crate::portal::PortalLogin;
use crate::probe::ReachabilityProbe;
use crate::settings::Settings;
use crate::wifi::Station;

/// Derived snapshot of the connection, recomputed from fresh probes on
/// every tick and never trusted stale across ticks. `Unknown` means no
/// tick has observed anything yet, or the last one failed partway.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    AssociatedAuthenticated,
    AssociatedUnauthenticated,
    Unassociated,
    Unknown,
}

/// Status surfaced to the presentation layer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayStatus {
    Connected,
    Disconnected,
    Monitoring,
    Paused,
}

impl std::fmt::Display for DisplayStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            DisplayStatus::Connected => "Connected",
            DisplayStatus::Disconnected => "Disconnected",
            DisplayStatus::Monitoring => "Monitoring...",
            DisplayStatus::Paused => "Paused",
        };
        f.write_str(label)
    }
}

/// What one tick observed and did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickOutcome {
    pub state: ConnectionState,
    pub reachable: bool,
}

struct Worker {
    settings: Settings,
    password: SecretString,
    station: Station,
    probe: Box<dyn ReachabilityProbe>,
    portal: Box<dyn PortalLogin>,
    running: Arc<AtomicBool>,
    status: watch::Sender<DisplayStatus>,
    state: watch::Sender<ConnectionState>,
    interval: Duration,
}

impl Worker {
    fn run(&self) {
        info!(
            network = %self.settings.network_name,
            interval_secs = self.interval.as_secs(),
            "monitoring started"
        );
        self.status.send_replace(DisplayStatus::Monitoring);

        while self.running.load(Ordering::SeqCst) {
            match self.run_tick() {
                Ok(outcome) => {
                    debug!(state = ?outcome.state, reachable = outcome.reachable, "tick complete");
                    let status = if outcome.reachable {
                        DisplayStatus::Connected
                    } else {
                        DisplayStatus::Disconnected
                    };
                    self.status.send_replace(status);
                }
                Err(err) => error!(%err, "tick failed, continuing"),
            }
            self.sleep_until_next_tick();
        }
        info!("monitoring stopped");
    }

    /// Run one tick, containing any panic at the tick boundary so a
    /// single bad tick can never terminate monitoring. A contained
    /// failure resets the published state to `Unknown`; whatever the
    /// tick observed before panicking cannot be trusted.
    fn run_tick(&self) -> Result<TickOutcome, TickError> {
        let result = std::panic::catch_unwind(AssertUnwindSafe(|| self.tick()))
            .map_err(|payload| TickError::Panicked(panic_message(payload)));
        match &result {
            Ok(outcome) => self.state.send_replace(outcome.state),
            Err(_) => self.state.send_replace(ConnectionState::Unknown),
        };
        result
    }

    fn tick(&self) -> TickOutcome {
        let network = self.settings.network_name.as_str();

        let mut associated = self.station.is_associated_to(network);
        if !associated {
            info!(network, "not associated, attempting to associate");
            associated = self.station.associate(network);
            if associated {
                info!(network, "association restored");
                // Reachable right after associating means no portal is in
                // the way; only an unreachable upstream warrants a login.
                if !self.probe.is_reachable() {
                    self.try_login();
                }
            }
        } else if !self.probe.is_reachable() {
            info!("associated but upstream unreachable, attempting portal login");
            self.try_login();
        } else {
            debug!("connection is stable");
        }

        let reachable = self.probe.is_reachable();
        let state = match (associated, reachable) {
            (true, true) => ConnectionState::AssociatedAuthenticated,
            (true, false) => ConnectionState::AssociatedUnauthenticated,
            (false, _) => ConnectionState::Unassociated,
        };
        TickOutcome { state, reachable }
    }

    fn try_login(&self) {
        let submitted = self.portal.authenticate(
            &self.settings.login_url,
            &self.settings.username,
            &self.password,
        );
        if submitted {
            info!("portal authentication attempt submitted");
        }
    }

    /// Sleep out the poll interval in slices so a stop request is
    /// observed promptly without interrupting an in-flight tick.
    fn sleep_until_next_tick(&self) {
        let deadline = Instant::now() + self.interval;
        let slice = Duration::from_millis(config::SLEEP_SLICE_MS);
        while self.running.load(Ordering::SeqCst) {
            let now = Instant::now();
            if now >= deadline {
                break;
            }
            std::thread::sleep(slice.min(deadline - now));
        }
    }
}

fn panic_message(payload: Box<dyn std::any::Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Handle to the monitoring engine: start/stop lifecycle plus a
/// read-only status feed.
pub struct Monitor {
    worker: Arc<Worker>,
    running: Arc<AtomicBool>,
    status_rx: watch::Receiver<DisplayStatus>,
    state_rx: watch::Receiver<ConnectionState>,
    handle: Option<JoinHandle<()>>,
}

impl Monitor {
    pub fn new(
        settings: Settings,
        station: Station,
        probe: Box<dyn ReachabilityProbe>,
        portal: Box<dyn PortalLogin>,
    ) -> Self {
        let (status_tx, status_rx) = watch::channel(DisplayStatus::Paused);
        let (state_tx, state_rx) = watch::channel(ConnectionState::Unknown);
        let running = Arc::new(AtomicBool::new(false));
        let interval =
            Duration::from_secs(settings.check_interval.max(config::MIN_CHECK_INTERVAL_SECS));
        let password = SecretString::from(settings.password.clone());

        let worker = Arc::new(Worker {
            settings,
            password,
            station,
            probe,
            portal,
            running: Arc::clone(&running),
            status: status_tx,
            state: state_tx,
            interval,
        });

        Self {
            worker,
            running,
            status_rx,
            state_rx,
            handle: None,
        }
    }

    /// Start the background worker. Returns false (no-op) when already
    /// running.
    pub fn start(&mut self) -> bool {
        if self.running.swap(true, Ordering::SeqCst) {
            return false;
        }
        let worker = Arc::clone(&self.worker);
        self.handle = Some(tokio::task::spawn_blocking(move || worker.run()));
        true
    }

    /// Stop the background worker, waiting a bounded time for the final
    /// tick. Returns false (no-op) when not running.
    pub async fn stop(&mut self) -> bool {
        if !self.running.swap(false, Ordering::SeqCst) {
            return false;
        }
        if let Some(handle) = self.handle.take() {
            let join_bound = Duration::from_millis(config::STOP_JOIN_TIMEOUT_MS);
            if tokio::time::timeout(join_bound, handle).await.is_err() {
                // A slow final tick is still in flight; it will observe
                // the cleared flag and exit on its own.
                info!("stop requested while a tick is in flight");
            }
        }
        self.worker.status.send_replace(DisplayStatus::Paused);
        true
    }

    /// Latest published status
    pub fn status(&self) -> DisplayStatus {
        *self.status_rx.borrow()
    }

    /// Snapshot left behind by the most recent tick
    pub fn connection_state(&self) -> ConnectionState {
        *self.state_rx.borrow()
    }

    /// Watch the status feed for changes
    pub fn subscribe(&self) -> watch::Receiver<DisplayStatus> {
        self.status_rx.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::portal::MockPortalLogin;
    use crate::probe::MockReachabilityProbe;
    use crate::wifi::MockWifiPlatform;

    fn settings(network: &str) -> Settings {
        Settings {
            network_name: network.into(),
            login_url: "https://portal.example/login".into(),
            username: "student".into(),
            password: "hunter2".into(),
            check_interval: 10,
            auto_start: true,
        }
    }

    fn monitor(
        network: &str,
        platform: MockWifiPlatform,
        probe: MockReachabilityProbe,
        portal: MockPortalLogin,
    ) -> Monitor {
        Monitor::new(
            settings(network),
            Station::with_platform(Box::new(platform), Duration::ZERO),
            Box::new(probe),
            Box::new(portal),
        )
    }

    fn tick_of(monitor: &Monitor) -> TickOutcome {
        monitor.worker.run_tick().expect("tick must not fail")
    }

    #[test]
    fn reassociation_with_reachable_upstream_skips_login() {
        // Scenario: the link dropped, re-association succeeds and the
        // internet works right away, so no portal is interposed.
        let mut platform = MockWifiPlatform::new();
        let mut calls = 0;
        platform.expect_current_association().returning(move || {
            calls += 1;
            // Unassociated on inspection, associated on the
            // post-request verification.
            if calls == 1 { Ok(None) } else { Ok(Some("CampusNet".into())) }
        });
        platform
            .expect_request_association()
            .once()
            .returning(|_| Ok(()));

        let mut probe = MockReachabilityProbe::new();
        probe.expect_is_reachable().returning(|| true);

        let mut portal = MockPortalLogin::new();
        portal.expect_authenticate().never();

        let monitor = monitor("CampusNet", platform, probe, portal);
        assert_eq!(monitor.connection_state(), ConnectionState::Unknown);
        let outcome = tick_of(&monitor);
        assert_eq!(outcome.state, ConnectionState::AssociatedAuthenticated);
        assert!(outcome.reachable);
        assert_eq!(
            monitor.connection_state(),
            ConnectionState::AssociatedAuthenticated
        );
    }

    #[test]
    fn gated_upstream_triggers_portal_login() {
        // Scenario: associated but unreachable; login is attempted and
        // succeeds, after which the probe reports reachable.
        let mut platform = MockWifiPlatform::new();
        platform
            .expect_current_association()
            .returning(|| Ok(Some("CampusNet".into())));

        let mut probe = MockReachabilityProbe::new();
        let mut probes = 0;
        probe.expect_is_reachable().returning(move || {
            probes += 1;
            probes > 1 // unreachable before login, reachable after
        });

        let mut portal = MockPortalLogin::new();
        portal
            .expect_authenticate()
            .withf(|url, user, _| url == "https://portal.example/login" && user == "student")
            .once()
            .returning(|_, _, _| true);

        let monitor = monitor("CampusNet", platform, probe, portal);
        let outcome = tick_of(&monitor);
        assert_eq!(outcome.state, ConnectionState::AssociatedAuthenticated);
        assert!(outcome.reachable);
    }

    #[test]
    fn failed_login_leaves_status_disconnected_without_erroring() {
        // Scenario: unknown portal layout; the attempt fails and the
        // loop just carries on.
        let mut platform = MockWifiPlatform::new();
        platform
            .expect_current_association()
            .returning(|| Ok(Some("CampusNet".into())));

        let mut probe = MockReachabilityProbe::new();
        probe.expect_is_reachable().returning(|| false);

        let mut portal = MockPortalLogin::new();
        portal.expect_authenticate().once().returning(|_, _, _| false);

        let monitor = monitor("CampusNet", platform, probe, portal);
        let outcome = tick_of(&monitor);
        assert_eq!(outcome.state, ConnectionState::AssociatedUnauthenticated);
        assert!(!outcome.reachable);
    }

    #[test]
    fn empty_network_name_idles_the_tick() {
        let mut platform = MockWifiPlatform::new();
        platform.expect_current_association().never();
        platform.expect_request_association().never();

        let mut probe = MockReachabilityProbe::new();
        probe.expect_is_reachable().returning(|| false);

        let mut portal = MockPortalLogin::new();
        portal.expect_authenticate().never();

        let monitor = monitor("", platform, probe, portal);
        assert_eq!(tick_of(&monitor).state, ConnectionState::Unassociated);
    }

    #[test]
    fn tick_under_total_failure_does_not_hang() {
        // Association fails, probe fails, login fails; with zero settle
        // delays the tick still terminates immediately.
        let mut platform = MockWifiPlatform::new();
        platform.expect_current_association().returning(|| Ok(None));
        platform.expect_request_association().returning(|_| {
            Err(crate::error::PlatformError::UnexpectedOutput { command: "nmcli" })
        });

        let mut probe = MockReachabilityProbe::new();
        probe.expect_is_reachable().returning(|| false);

        let mut portal = MockPortalLogin::new();
        portal.expect_authenticate().returning(|_, _, _| false);

        let monitor = monitor("CampusNet", platform, probe, portal);
        let start = Instant::now();
        let outcome = tick_of(&monitor);
        assert_eq!(outcome.state, ConnectionState::Unassociated);
        assert!(start.elapsed() < Duration::from_secs(1));
    }

    #[test]
    fn panicking_tick_is_contained() {
        struct ExplodingPlatform;
        impl crate::wifi::WifiPlatform for ExplodingPlatform {
            fn current_association(&self) -> crate::error::PlatformResult<Option<String>> {
                panic!("wireless query exploded")
            }
            fn request_association(&self, _network: &str) -> crate::error::PlatformResult<()> {
                Ok(())
            }
        }

        let monitor = Monitor::new(
            settings("CampusNet"),
            Station::with_platform(Box::new(ExplodingPlatform), Duration::ZERO),
            Box::new(MockReachabilityProbe::new()),
            Box::new(MockPortalLogin::new()),
        );
        let err = monitor.worker.run_tick().unwrap_err();
        assert!(err.to_string().contains("wireless query exploded"));
        // Nothing observed by the failed tick is trusted.
        assert_eq!(monitor.connection_state(), ConnectionState::Unknown);
    }

    #[tokio::test]
    async fn start_twice_runs_exactly_one_worker() {
        let mut platform = MockWifiPlatform::new();
        platform.expect_current_association().returning(|| Ok(None));
        platform.expect_request_association().returning(|_| Ok(()));
        let mut probe = MockReachabilityProbe::new();
        probe.expect_is_reachable().returning(|| true);
        let portal = MockPortalLogin::new();

        let mut monitor = monitor("CampusNet", platform, probe, portal);
        assert!(monitor.start());
        assert!(!monitor.start());
        assert!(monitor.stop().await);
    }

    #[tokio::test]
    async fn stop_when_not_running_is_a_no_op() {
        let platform = MockWifiPlatform::new();
        let probe = MockReachabilityProbe::new();
        let portal = MockPortalLogin::new();

        let mut monitor = monitor("", platform, probe, portal);
        assert!(!monitor.stop().await);
        assert_eq!(monitor.status(), DisplayStatus::Paused);
    }

    #[tokio::test]
    async fn stop_publishes_paused_after_monitoring() {
        let mut platform = MockWifiPlatform::new();
        platform.expect_current_association().returning(|| Ok(None));
        platform.expect_request_association().returning(|_| Ok(()));
        let mut probe = MockReachabilityProbe::new();
        probe.expect_is_reachable().returning(|| true);
        let portal = MockPortalLogin::new();

        let mut monitor = monitor("CampusNet", platform, probe, portal);
        assert!(monitor.start());
        assert!(monitor.stop().await);
        assert_eq!(monitor.status(), DisplayStatus::Paused);

        // And the engine can be started again after a stop.
        assert!(monitor.start());
        assert!(monitor.stop().await);
    }
}
