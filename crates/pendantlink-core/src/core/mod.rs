//! Collaborator traits and machine event listeners

pub mod collaborators;
pub mod listener;

pub use collaborators::{Collaborators, JogService, MachineBackend};
pub use listener::{MachineEvent, MachineListener, MachineListenerHandle};
