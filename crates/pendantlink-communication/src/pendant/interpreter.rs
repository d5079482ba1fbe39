//! Command interpretation
//!
//! Maps peer control lines onto backend and jog actions. The key table is
//! fixed: codes 0-27 are covered, codes without an action (20, 21, 24) and
//! codes outside the table are ignored with a warning. Collaborator failures
//! are logged and never end the session.

use crate::pendant::wire::{PeerMessage, WireFormat};
use pendantlink_core::{Axis, BridgeError, Collaborators, JogService, MachineBackend};
use std::sync::Arc;

/// Step sizes selected by keys 8-11
pub const STEP_SIZES: [f64; 4] = [0.001, 0.01, 0.1, 1.0];

/// Action bound to a pendant key
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PendantAction {
    /// Jog Z by this many steps
    JogZ(i32),
    /// Jog the rotary axis by this many steps
    JogRotary(i32),
    /// Jog X/Y by these many steps
    JogXY {
        /// X steps
        x: i32,
        /// Y steps
        y: i32,
    },
    /// Set the same step size on the XY, Z and rotary groups
    SetStepSize(f64),
    /// Zero the work coordinate of an axis
    ZeroAxis(Axis),
    /// Rapid move of an axis to machine zero
    RapidToMachineZero(Axis),
    /// Return to work zero
    ReturnToZero,
    /// Run the homing cycle
    Home,
    /// Start streaming the loaded job
    SendJob,
    /// Toggle pause / resume
    PauseResume,
    /// Cancel the job
    Cancel,
}

impl PendantAction {
    /// Look up the action for a key code
    pub fn from_code(code: i32) -> Option<Self> {
        let action = match code {
            0 => Self::JogZ(-1),
            1 => Self::JogRotary(-1),
            2 => Self::JogRotary(1),
            3 => Self::JogZ(1),
            4 => Self::JogXY { x: 0, y: -1 },
            5 => Self::JogXY { x: 1, y: 0 },
            6 => Self::JogXY { x: 0, y: 1 },
            7 => Self::JogXY { x: -1, y: 0 },
            8..=11 => Self::SetStepSize(STEP_SIZES[(code - 8) as usize]),
            12 => Self::ZeroAxis(Axis::A),
            13 => Self::ZeroAxis(Axis::Z),
            14 => Self::ZeroAxis(Axis::Y),
            15 => Self::ZeroAxis(Axis::X),
            16 => Self::RapidToMachineZero(Axis::A),
            17 => Self::RapidToMachineZero(Axis::Z),
            18 => Self::RapidToMachineZero(Axis::Y),
            19 => Self::RapidToMachineZero(Axis::X),
            22 => Self::ReturnToZero,
            23 => Self::Home,
            25 => Self::SendJob,
            26 => Self::PauseResume,
            27 => Self::Cancel,
            _ => return None,
        };
        Some(action)
    }

    /// Raw command issued for a rapid move to machine zero
    pub fn machine_zero_command(axis: Axis) -> String {
        format!("G53 G0 {}0", axis.letter())
    }

    /// Perform the action against the collaborators
    pub fn dispatch(&self, backend: &dyn MachineBackend, jog: &dyn JogService) -> anyhow::Result<()> {
        match *self {
            Self::JogZ(steps) => jog.adjust_manual_location_z(steps),
            Self::JogRotary(steps) => jog.adjust_manual_location_abc(steps, 0, 0),
            Self::JogXY { x, y } => jog.adjust_manual_location_xy(x, y),
            Self::SetStepSize(step) => {
                jog.set_step_size_z(step)?;
                jog.set_step_size_xy(step)?;
                jog.set_step_size_abc(step)
            }
            Self::ZeroAxis(axis) => backend.reset_coordinate_to_zero(axis),
            Self::RapidToMachineZero(axis) => {
                backend.send_gcode_command(&Self::machine_zero_command(axis))
            }
            Self::ReturnToZero => backend.return_to_zero(),
            Self::Home => backend.perform_homing_cycle(),
            Self::SendJob => backend.send_job(),
            Self::PauseResume => backend.pause_resume(),
            Self::Cancel => backend.cancel(),
        }
    }
}

/// What a control line turned out to be
#[derive(Debug, Clone, PartialEq)]
pub enum Interpretation {
    /// A key was pressed; `action` is `None` for codes without an effect
    Key {
        /// The key code
        code: i32,
        /// The dispatched action
        action: Option<PendantAction>,
    },
    /// Liveness or snapshot-request token
    Signal(PeerMessage),
    /// The line could not be acted upon
    Rejected(BridgeError),
    /// Not part of the control vocabulary
    Ignored,
}

/// Applies peer control lines to the collaborators
#[derive(Clone)]
pub struct CommandInterpreter {
    wire: Arc<dyn WireFormat>,
}

impl CommandInterpreter {
    /// Create an interpreter using the control vocabulary of `wire`
    pub fn new(wire: Arc<dyn WireFormat>) -> Self {
        Self { wire }
    }

    /// Interpret one line, dispatching key actions to the registered services
    pub fn apply(&self, line: &str, collaborators: &Collaborators) -> Interpretation {
        match self.wire.decode_control(line) {
            Some(PeerMessage::Key(code)) => match collaborators.resolve() {
                Ok((backend, jog)) => self.apply_key(code, backend.as_ref(), jog.as_ref()),
                Err(e) => {
                    tracing::warn!(code, "Ignoring key: {}", e);
                    Interpretation::Rejected(e)
                }
            },
            Some(message) => self.classify(line, message),
            None => {
                tracing::debug!(line = %line, "Ignoring line");
                Interpretation::Ignored
            }
        }
    }

    /// Interpret one line against explicit collaborators
    pub fn apply_with(
        &self,
        line: &str,
        backend: &dyn MachineBackend,
        jog: &dyn JogService,
    ) -> Interpretation {
        match self.wire.decode_control(line) {
            Some(PeerMessage::Key(code)) => self.apply_key(code, backend, jog),
            Some(message) => self.classify(line, message),
            None => {
                tracing::debug!(line = %line, "Ignoring line");
                Interpretation::Ignored
            }
        }
    }

    fn classify(&self, line: &str, message: PeerMessage) -> Interpretation {
        match message {
            PeerMessage::BadKey(_) => {
                tracing::warn!(line = %line, "Malformed key command");
                Interpretation::Rejected(BridgeError::MalformedCommand {
                    line: line.to_string(),
                })
            }
            other => Interpretation::Signal(other),
        }
    }

    fn apply_key(&self, code: i32, backend: &dyn MachineBackend, jog: &dyn JogService) -> Interpretation {
        let action = PendantAction::from_code(code);
        match action {
            Some(action) => {
                tracing::debug!(code, ?action, "Key pressed");
                if let Err(e) = action.dispatch(backend, jog) {
                    tracing::warn!(code, "Handling key failed: {:#}", e);
                }
            }
            None => tracing::warn!(code, "Unknown key code"),
        }
        Interpretation::Key { code, action }
    }
}
