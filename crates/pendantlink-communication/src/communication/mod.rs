//! Serial transport for the peer device
//!
//! - [`serial`]: port enumeration, opening, and the [`PortHandle`] abstraction
//! - [`framer`]: line framing of the peer's ASCII control channel

pub mod framer;
pub mod serial;

pub use framer::LineFramer;
pub use serial::{
    list_all_ports, list_ports, PortHandle, PortProvider, RealSerialPort, SerialPortInfo,
    SystemPorts,
};
