//! # pendantlink Communication
//!
//! Serial transport and the pendant bridge for pendantlink.
//! Finds the port a jog pendant or status display is attached to, confirms
//! its identity, and runs the session: control lines in, machine snapshots out.

pub mod communication;
pub mod pendant;

pub use communication::{
    framer::LineFramer,
    serial::{list_all_ports, list_ports, PortHandle, PortProvider, SerialPortInfo, SystemPorts},
};

pub use pendant::{
    ClaimedPort, CommandInterpreter, CompactFrame, HandshakeMode, Interpretation, LcdFrame,
    LiveOverrides, PeerMessage, PendantAction, PortScanner, ProtocolProfile, ProtocolVariant,
    SessionHandle, SessionState, SessionSupervisor, SnapshotEncoder, SyncFrame, WireFormat,
};
