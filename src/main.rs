use std::path::PathBuf;

use clap::{Parser, Subcommand};
use color_eyre::eyre::Result;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use wifikeeper::{HeadlessLogin, HttpProbe, Monitor, ReachabilityProbe, Settings, Station};

/// Keeps a machine on a configured Wi-Fi network and clears
/// captive-portal logins automatically
#[derive(Parser, Debug)]
#[command(
    name = "wifikeeper",
    about = "Keeps a machine on a configured Wi-Fi network and clears captive-portal logins automatically.",
    long_about = None,
    version = env!("CARGO_PKG_VERSION")
)]
struct Args {
    /// Path to the configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Monitor the connection in the foreground until interrupted
    Run,
    /// Probe association and reachability once and exit
    Check,
    /// Update the persisted configuration
    Configure {
        /// Wi-Fi network name to keep the machine on
        #[arg(long)]
        network: Option<String>,
        /// Captive-portal login page URL
        #[arg(long)]
        login_url: Option<String>,
        /// Portal username
        #[arg(long)]
        username: Option<String>,
        /// Portal password
        #[arg(long)]
        password: Option<String>,
        /// Seconds between connection checks (minimum 10)
        #[arg(long)]
        interval: Option<u64>,
        /// Start monitoring when wifikeeper launches with no subcommand
        #[arg(long)]
        auto_start: Option<bool>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let args = Args::parse();
    let path = args.config.unwrap_or_else(Settings::default_path);
    let settings = Settings::load(&path);

    match args.command {
        Some(Command::Run) => run_monitor(settings).await,
        Some(Command::Check) => check(settings).await,
        Some(Command::Configure {
            network,
            login_url,
            username,
            password,
            interval,
            auto_start,
        }) => {
            let mut settings = settings;
            if let Some(network) = network {
                settings.network_name = network;
            }
            if let Some(login_url) = login_url {
                settings.login_url = login_url;
            }
            if let Some(username) = username {
                settings.username = username;
            }
            if let Some(password) = password {
                settings.password = password;
            }
            if let Some(interval) = interval {
                settings.check_interval = interval;
            }
            if let Some(auto_start) = auto_start {
                settings.auto_start = auto_start;
            }
            settings.save(&path)?;
            println!("Settings saved to {}", path.display());
            Ok(())
        }
        None => {
            if settings.auto_start {
                run_monitor(settings).await
            } else {
                info!("auto-start is disabled; use `wifikeeper run` to start monitoring");
                Ok(())
            }
        }
    }
}

async fn run_monitor(settings: Settings) -> Result<()> {
    if settings.network_name.is_empty() {
        warn!("no network configured; the monitor will idle until one is set via `wifikeeper configure`");
    }

    let mut monitor = Monitor::new(
        settings,
        Station::new(),
        Box::new(HttpProbe::new()?),
        Box::new(HeadlessLogin::new()),
    );
    monitor.start();

    // Surface status transitions in the log, the way a menu bar would
    // surface them to a user.
    let mut status_rx = monitor.subscribe();
    tokio::spawn(async move {
        while status_rx.changed().await.is_ok() {
            let status = *status_rx.borrow_and_update();
            info!(%status, "status changed");
        }
    });

    tokio::signal::ctrl_c().await?;
    info!("shutdown requested");
    monitor.stop().await;
    Ok(())
}

async fn check(settings: Settings) -> Result<()> {
    let probe = HttpProbe::new()?;
    let network = settings.network_name.clone();

    let (associated, reachable) = tokio::task::spawn_blocking(move || {
        let station = Station::new();
        (station.is_associated_to(&network), probe.is_reachable())
    })
    .await?;

    if settings.network_name.is_empty() {
        println!("No network configured.");
    } else {
        println!(
            "Associated to \"{}\": {}",
            settings.network_name,
            if associated { "yes" } else { "no" }
        );
    }
    println!("Internet reachable: {}", if reachable { "yes" } else { "no" });
    Ok(())
}
