//! # wanwatch
//!
//! Connectivity watchdog for home broadband lines behind a Zyxel
//! AMG1302-T11C. Probes external reachability on a fixed interval and,
//! when the uplink is judged dead, drives the modem's web interface
//! through a WAN session reset, retrying until probes confirm the
//! connection is restored.
//!
//! ## Architecture
//!
//! ┌──────────────────────────────────────────────────────┐
//! │                      Watch Loop                      │
//! ├──────────────────────────┬───────────────────────────┤
//! │   Connectivity Checker   │     Reset Orchestrator    │
//! │  (ordered burst probes,  │  (session → dial → wait,  │
//! │   first-success-wins)    │   retry until restored)   │
//! ├──────────────────────────┼─────────────┬─────────────┤
//! │                          │ Restoration │   Router    │
//! │                          │   Waiter    │   Session   │
//! ├──────────────────────────┴─────────────┤  (HTTP/CGI) │
//! │        ICMP Probe (burst / open-ended) │             │
//! └────────────────────────────────────────┴─────────────┘

#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::cast_precision_loss)] // Acceptable for loss percentages

pub mod cli;
pub mod config;
pub mod error;
pub mod monitor;
pub mod probe;
pub mod session;

pub use config::Config;
pub use error::{Error, Result};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
