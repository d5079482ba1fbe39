//! Collaborator interfaces consumed by the bridge
//!
//! The host motion-control backend and the jog subsystem live outside this
//! workspace. The bridge only talks to them through these traits, and receives
//! them through an explicitly injected [`Collaborators`] registry.

use crate::core::listener::MachineListenerHandle;
use crate::data::{Axis, CNCPoint, Units};
use crate::error::BridgeError;
use parking_lot::RwLock;
use std::sync::Arc;

/// Host motion-control backend
pub trait MachineBackend: Send + Sync {
    /// Current work position, in the backend's native unit
    fn work_position(&self) -> CNCPoint;

    /// Rows in the loaded job
    fn num_rows(&self) -> u64;

    /// Rows already streamed to the controller
    fn num_sent_rows(&self) -> u64;

    /// Job is paused / in feed hold
    fn is_paused(&self) -> bool;

    /// Job is being streamed
    fn is_sending_file(&self) -> bool;

    /// Controller is idle
    fn is_idle(&self) -> bool;

    /// Zero the work coordinate of one axis
    fn reset_coordinate_to_zero(&self, axis: Axis) -> anyhow::Result<()>;

    /// Send a raw command line to the controller
    fn send_gcode_command(&self, command: &str) -> anyhow::Result<()>;

    /// Move back to work zero
    fn return_to_zero(&self) -> anyhow::Result<()>;

    /// Run the homing cycle
    fn perform_homing_cycle(&self) -> anyhow::Result<()>;

    /// Start streaming the loaded job
    fn send_job(&self) -> anyhow::Result<()>;

    /// Toggle pause / resume
    fn pause_resume(&self) -> anyhow::Result<()>;

    /// Cancel the running job
    fn cancel(&self) -> anyhow::Result<()>;

    /// Subscribe to machine events
    fn add_listener(&self, listener: MachineListenerHandle);
}

/// Jog subsystem
pub trait JogService: Send + Sync {
    /// Active measurement unit
    fn units(&self) -> Units;

    /// Jog feed rate
    fn feed_rate(&self) -> f64;

    /// Step size of the XY group
    fn step_size_xy(&self) -> f64;

    /// Step size of the Z axis
    fn step_size_z(&self) -> f64;

    /// Step size of the rotary group
    fn step_size_abc(&self) -> f64;

    /// Set the XY step size
    fn set_step_size_xy(&self, step: f64) -> anyhow::Result<()>;

    /// Set the Z step size
    fn set_step_size_z(&self, step: f64) -> anyhow::Result<()>;

    /// Set the rotary step size
    fn set_step_size_abc(&self, step: f64) -> anyhow::Result<()>;

    /// Jog X/Y by the given number of steps
    fn adjust_manual_location_xy(&self, x: i32, y: i32) -> anyhow::Result<()>;

    /// Jog Z by the given number of steps
    fn adjust_manual_location_z(&self, z: i32) -> anyhow::Result<()>;

    /// Jog the rotary axes by the given number of steps
    fn adjust_manual_location_abc(&self, a: i32, b: i32, c: i32) -> anyhow::Result<()>;
}

/// Registry of the services the bridge depends on
///
/// Built by the surrounding application and handed to the session supervisor.
/// Services may be registered after the supervisor starts; until then every
/// action degrades to [`BridgeError::CollaboratorUnavailable`].
#[derive(Default)]
pub struct Collaborators {
    backend: RwLock<Option<Arc<dyn MachineBackend>>>,
    jog: RwLock<Option<Arc<dyn JogService>>>,
}

impl Collaborators {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry with both services present
    pub fn with(backend: Arc<dyn MachineBackend>, jog: Arc<dyn JogService>) -> Self {
        Self {
            backend: RwLock::new(Some(backend)),
            jog: RwLock::new(Some(jog)),
        }
    }

    /// Register (or replace) the backend
    pub fn register_backend(&self, backend: Arc<dyn MachineBackend>) {
        *self.backend.write() = Some(backend);
    }

    /// Register (or replace) the jog service
    pub fn register_jog(&self, jog: Arc<dyn JogService>) {
        *self.jog.write() = Some(jog);
    }

    /// The backend, if registered
    pub fn backend(&self) -> Result<Arc<dyn MachineBackend>, BridgeError> {
        self.backend
            .read()
            .clone()
            .ok_or(BridgeError::CollaboratorUnavailable {
                service: "MachineBackend",
            })
    }

    /// The jog service, if registered
    pub fn jog(&self) -> Result<Arc<dyn JogService>, BridgeError> {
        self.jog
            .read()
            .clone()
            .ok_or(BridgeError::CollaboratorUnavailable {
                service: "JogService",
            })
    }

    /// Both services, or the first missing one
    pub fn resolve(&self) -> Result<(Arc<dyn MachineBackend>, Arc<dyn JogService>), BridgeError> {
        Ok((self.backend()?, self.jog()?))
    }
}
