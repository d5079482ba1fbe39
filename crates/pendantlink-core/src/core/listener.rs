//! Machine listener interface
//!
//! Defines the listener trait the host backend calls when machine state changes.
//! Listeners run on the backend's own thread and must never block.

use crate::data::PendantStatus;
use std::sync::Arc;

/// Events published by the host backend
#[derive(Debug, Clone, PartialEq)]
pub enum MachineEvent {
    /// Controller status report with live values, when the controller provides them
    StatusChanged {
        /// Live feed rate, already scaled to the preferred units
        feed_rate: Option<f64>,
        /// Live spindle speed (RPM)
        spindle_speed: Option<f64>,
    },
    /// Host state changed (idle, run, hold, ...)
    StateChanged(PendantStatus),
    /// A job row was streamed
    JobProgress {
        /// Rows already streamed
        sent: u64,
        /// Rows in the job
        total: u64,
    },
}

impl std::fmt::Display for MachineEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MachineEvent::StatusChanged {
                feed_rate,
                spindle_speed,
            } => write!(f, "Status feed={:?} spindle={:?}", feed_rate, spindle_speed),
            MachineEvent::StateChanged(status) => write!(f, "State: {}", status),
            MachineEvent::JobProgress { sent, total } => write!(f, "Progress {}/{}", sent, total),
        }
    }
}

/// Listener trait for machine events
///
/// Implement this trait to receive notifications from the host backend.
pub trait MachineListener: Send + Sync {
    /// Called on the backend's thread for every machine event
    fn on_machine_event(&self, event: &MachineEvent);
}

/// Shared listener handle as stored by backends
pub type MachineListenerHandle = Arc<dyn MachineListener>;
