//! CLI interface for wanwatch.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// wanwatch - connectivity watchdog for the Zyxel AMG1302-T11C
#[derive(Parser, Debug)]
#[command(
    name = "wanwatch",
    author,
    version,
    about = "Keeps a broadband connection alive by resetting the modem's WAN session",
    long_about = r#"
wanwatch periodically pings external servers to detect connectivity loss.
When every destination is unreachable it logs into the router's web
interface, forces the PPPoE session through a disconnect/reconnect, and
waits until probes confirm the connection is back before resuming
normal monitoring.

The tool targets the Zyxel AMG1302-T11C and must be given the hostname
and credentials of the router's web interface.
"#
)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Configuration file path
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, global = true, default_value = "info")]
    pub log_level: String,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Hostname or IP of the router
    #[arg(long, global = true)]
    pub hostname: Option<String>,

    /// Username to login with
    #[arg(long, global = true, env = "WANWATCH_USERNAME")]
    pub username: Option<String>,

    /// Password to login with
    #[arg(long, global = true, env = "WANWATCH_PASSWORD")]
    pub password: Option<String>,

    /// Don't make changes to the modem
    #[arg(short = 'n', long, global = true)]
    pub no_action: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Periodically check external connectivity, forcing a reconnect if necessary
    Watch(WatchArgs),

    /// Check the connection state of the modem as reported by its UI
    Check,

    /// Immediately disconnect and reconnect the WAN session
    Reconnect(ReconnectArgs),
}

/// Watch command arguments
#[derive(Args, Debug)]
pub struct WatchArgs {
    /// The interval, in seconds, between connectivity checks
    #[arg(short, long)]
    pub interval: Option<u64>,

    /// Attempt to use raw sockets to send pings
    #[arg(short = 'p', long)]
    pub raw_ping: bool,

    /// Remote addresses to ping, in priority order (first = primary)
    #[arg(short, long = "remote")]
    pub remote: Vec<String>,
}

/// Reconnect command arguments
#[derive(Args, Debug)]
pub struct ReconnectArgs {
    /// Skip the disconnect step
    #[arg(short, long)]
    pub connect_only: bool,
}
