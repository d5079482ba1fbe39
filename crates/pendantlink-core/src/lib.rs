//! # pendantlink Core
//!
//! Core types, traits, and utilities for pendantlink.
//! Provides the data model shared with the host backend, the collaborator
//! interfaces, the error taxonomy, and the time source used by every timeout.

pub mod clock;
pub mod core;
pub mod data;
pub mod error;

pub use clock::{Clock, ManualClock, SystemClock};

pub use crate::core::{
    Collaborators, JogService, MachineBackend, MachineEvent, MachineListener,
    MachineListenerHandle,
};

pub use data::{sanitize, Axis, CNCPoint, MachineSnapshot, PendantStatus, Units, MM_PER_INCH};

pub use error::{BridgeError, ConnectionError, Error, Result};
