//! wanwatch CLI entry point.

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use wanwatch::cli::{Cli, Commands, ReconnectArgs, WatchArgs};
use wanwatch::config::{init_logging, Config, LoggingConfig};
use wanwatch::error::{Result, SessionError};
use wanwatch::monitor::{self, ConnectivityChecker, RestorationWaiter};
use wanwatch::probe::IcmpProber;
use wanwatch::session::{RouterClient, SessionController};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_config = LoggingConfig {
        level: cli.log_level.clone(),
        color: !cli.no_color,
        ..Default::default()
    };
    init_logging(&log_config)?;

    let config = if let Some(ref path) = cli.config {
        Config::load(path)?
    } else if Config::default_path().exists() {
        Config::load(Config::default_path())?
    } else {
        Config::default()
    };

    // Command-line flags override the config file.
    let hostname = cli.hostname.clone().unwrap_or(config.router.hostname.clone());
    let username = cli.username.clone().unwrap_or(config.router.username.clone());
    let password = cli.password.clone().unwrap_or(config.router.password.clone());
    let dry_run = cli.no_action || config.router.dry_run;

    let session = RouterClient::new(dry_run, username, password, hostname)?;

    // Root cancellation context for the process lifetime; Ctrl-C tears
    // down every in-flight probe and HTTP request through it.
    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if signal::ctrl_c().await.is_ok() {
                info!("interrupt received, shutting down");
                cancel.cancel();
            }
        });
    }

    match cli.command {
        Commands::Watch(args) => run_watch(args, config, session, cancel).await,
        Commands::Check => run_check(&session).await,
        Commands::Reconnect(args) => run_reconnect(args, &session).await,
    }
}

/// Run the connectivity watchdog until shutdown.
async fn run_watch(
    args: WatchArgs,
    config: Config,
    session: RouterClient,
    cancel: CancellationToken,
) -> Result<()> {
    let destinations = if args.remote.is_empty() {
        config.watch.destinations.clone()
    } else {
        args.remote
    };
    let interval = args
        .interval
        .map_or(config.watch.interval, Duration::from_secs);
    let privileged = args.raw_ping || config.watch.raw_socket;

    let prober = Arc::new(IcmpProber::new(privileged));
    let checker = ConnectivityChecker::new(destinations.clone(), prober.clone());
    let waiter = RestorationWaiter::new(destinations.clone(), prober);

    info!(
        destinations = ?destinations,
        privileged,
        "watching external connectivity"
    );

    monitor::watch_reset(cancel, Arc::new(session), checker, waiter, interval).await;
    Ok(())
}

/// Report the modem's own view of the connection state.
async fn run_check(session: &RouterClient) -> Result<()> {
    session.login().await?;

    if session.modem_is_connected().await? {
        info!("modem believes connection is active");
    } else {
        info!("modem believes connection is down");
    }
    Ok(())
}

/// Force an immediate disconnect/reconnect of the WAN session.
async fn run_reconnect(args: ReconnectArgs, session: &RouterClient) -> Result<()> {
    session.login().await?;

    if !session.test_session().await? {
        error!("login completed but failed, check credentials");
        return Err(SessionError::LoginRejected.into());
    }
    info!("login succeeded, resetting connection");

    if !args.connect_only {
        if let Err(e) = session.set_modem_state(false).await {
            warn!(error = %e, "failed to disconnect modem");
        }
    }

    session.set_modem_state(true).await?;
    info!("done");
    Ok(())
}
