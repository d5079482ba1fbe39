//! # pendantlink
//!
//! Serial bridge between a CNC host application and a jog pendant or status
//! display built around a small microcontroller.
//!
//! ## Architecture
//!
//! pendantlink is organized as a workspace with multiple crates:
//!
//! 1. **pendantlink-core** - Data model, collaborator traits, errors, clock
//! 2. **pendantlink-communication** - Serial ports, framing, handshake, session
//! 3. **pendantlink-settings** - Bridge configuration files
//! 4. **pendantlink** - Binary that runs the bridge against a dry-run machine
//!
//! ## Features
//!
//! - **Port Discovery**: scans candidate serial ports and claims the one that answers the handshake
//! - **Three Wire Protocols**: binary `SYNC` frames, compact frames, 20x4 LCD text
//! - **Key Commands**: jogging, step sizes, zeroing, homing, job start/pause/cancel
//! - **Liveness**: silent links are dropped and rediscovered

pub mod dry_run;

pub use dry_run::DryRunMachine;

pub use pendantlink_core::{
    Axis, BridgeError, CNCPoint, Clock, Collaborators, ConnectionError, Error, JogService,
    MachineBackend, MachineEvent, MachineListener, MachineSnapshot, PendantStatus, Result,
    SystemClock, Units,
};

pub use pendantlink_communication::{
    list_ports, ProtocolProfile, ProtocolVariant, SerialPortInfo, SessionHandle, SessionState,
    SessionSupervisor, SystemPorts,
};

pub use pendantlink_settings::BridgeConfig;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Build date (set at compile time)
pub const BUILD_DATE: &str = env!("BUILD_DATE");

/// Initialize logging with the default configuration
///
/// Sets up structured logging with:
/// - Console output with pretty formatting
/// - RUST_LOG environment variable support, `info` when unset
/// - Thread names, so session worker lines are easy to pick out
pub fn init_logging() -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::prelude::*;
    use tracing_subscriber::EnvFilter;

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_level(true)
        .with_thread_names(true)
        .with_line_number(true)
        .pretty();

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init()?;

    Ok(())
}
