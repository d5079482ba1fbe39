//! Serial port communication implementation
//!
//! Provides low-level serial port operations for the link to the peer device.
//!
//! Supports:
//! - Port enumeration and discovery
//! - Opening at a fixed baud rate, 8/N/1, with zero-timeout reads
//! - "Bytes available" / "bytes still queued to write" queries for polling
//!
//! The rest of the bridge only sees the [`PortHandle`] and [`PortProvider`]
//! traits, so tests can substitute in-memory ports.

use pendantlink_core::{ConnectionError, Error, Result};
use std::io::{self, Read, Write};
use std::time::Duration;

/// Information about an available serial port
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SerialPortInfo {
    /// Port name (e.g., "/dev/ttyUSB0", "COM3")
    pub port_name: String,

    /// Port description (e.g., "USB Serial Port")
    pub description: String,

    /// Manufacturer name if available
    pub manufacturer: Option<String>,

    /// Serial number if available
    pub serial_number: Option<String>,

    /// USB vendor ID if applicable
    pub vid: Option<u16>,

    /// USB product ID if applicable
    pub pid: Option<u16>,
}

impl SerialPortInfo {
    /// Create a new port info
    pub fn new(port_name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            port_name: port_name.into(),
            description: description.into(),
            manufacturer: None,
            serial_number: None,
            vid: None,
            pid: None,
        }
    }

    /// Set manufacturer
    pub fn with_manufacturer(mut self, manufacturer: impl Into<String>) -> Self {
        self.manufacturer = Some(manufacturer.into());
        self
    }

    /// Set serial number
    pub fn with_serial_number(mut self, serial_number: impl Into<String>) -> Self {
        self.serial_number = Some(serial_number.into());
        self
    }

    /// Set USB IDs
    pub fn with_usb_ids(mut self, vid: u16, pid: u16) -> Self {
        self.vid = Some(vid);
        self.pid = Some(pid);
        self
    }
}

/// List every serial port the platform reports, in platform order
pub fn list_all_ports() -> Result<Vec<SerialPortInfo>> {
    match serialport::available_ports() {
        Ok(ports) => Ok(ports.iter().map(to_port_info).collect()),
        Err(e) => {
            tracing::error!("Failed to enumerate serial ports: {}", e);
            Err(Error::from(ConnectionError::EnumerationFailed {
                reason: e.to_string(),
            }))
        }
    }
}

/// List serial ports that look like microcontroller USB links
///
/// Filters ports to include only these patterns:
/// - Windows: COM* (e.g., COM1, COM3)
/// - Linux: /dev/ttyUSB*, /dev/ttyACM*
/// - macOS: /dev/cu.usbserial-*, /dev/cu.usbmodem*
pub fn list_ports() -> Result<Vec<SerialPortInfo>> {
    Ok(list_all_ports()?
        .into_iter()
        .filter(|port| is_valid_usb_port(&port.port_name))
        .collect())
}

fn to_port_info(port: &serialport::SerialPortInfo) -> SerialPortInfo {
    let info = SerialPortInfo::new(&port.port_name, get_port_description(port));

    match &port.port_type {
        serialport::SerialPortType::UsbPort(usb_info) => {
            let mut info = info.with_usb_ids(usb_info.vid, usb_info.pid);
            if let Some(ref mfg) = usb_info.manufacturer {
                info = info.with_manufacturer(mfg);
            }
            if let Some(ref serial) = usb_info.serial_number {
                info = info.with_serial_number(serial);
            }
            info
        }
        _ => info,
    }
}

/// Check if a port name matches microcontroller USB patterns
fn is_valid_usb_port(port_name: &str) -> bool {
    // Windows COM ports
    if let Some(num) = port_name.strip_prefix("COM") {
        return !num.is_empty() && num.chars().all(|c| c.is_ascii_digit());
    }

    // Linux USB and ACM devices
    if port_name.starts_with("/dev/ttyUSB") || port_name.starts_with("/dev/ttyACM") {
        return true;
    }

    // macOS serial and modem devices
    if port_name.starts_with("/dev/cu.usbserial-") || port_name.starts_with("/dev/cu.usbmodem") {
        return true;
    }

    false
}

/// Get a user-friendly description for a port
fn get_port_description(port: &serialport::SerialPortInfo) -> String {
    match &port.port_type {
        serialport::SerialPortType::UsbPort(usb_info) => {
            format!(
                "USB {} {}",
                usb_info.manufacturer.as_deref().unwrap_or("Device"),
                usb_info.product.as_deref().unwrap_or("Serial Port")
            )
        }
        serialport::SerialPortType::BluetoothPort => "Bluetooth Serial".to_string(),
        serialport::SerialPortType::PciPort => "PCI Serial".to_string(),
        _ => "Serial Port".to_string(),
    }
}

/// An open, owned serial channel
///
/// Exactly one handle is active per session. Reads never block: callers check
/// [`PortHandle::bytes_to_read`] first.
pub trait PortHandle: Send {
    /// Get the port name
    fn name(&self) -> String;

    /// Bytes currently available to read
    fn bytes_to_read(&mut self) -> io::Result<usize>;

    /// Bytes still queued in the outbound buffer
    fn bytes_to_write(&mut self) -> io::Result<usize>;

    /// Read available data into `buf`; `Ok(0)` means end of stream
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize>;

    /// Write the whole buffer
    fn write_all(&mut self, data: &[u8]) -> io::Result<()>;

    /// Flush queued output
    fn flush(&mut self) -> io::Result<()>;

    /// Close the port
    fn close(&mut self) -> io::Result<()>;
}

/// Enumerates and opens candidate ports
pub trait PortProvider: Send {
    /// Candidate ports in platform-reported order
    fn candidates(&self) -> Result<Vec<SerialPortInfo>>;

    /// Open a candidate at the given baud rate
    fn open(
        &self,
        port: &SerialPortInfo,
        baud_rate: u32,
    ) -> std::result::Result<Box<dyn PortHandle>, ConnectionError>;
}

/// Real serial port implementation using serialport crate
pub struct RealSerialPort {
    name: String,
    port: Option<Box<dyn serialport::SerialPort>>,
}

impl RealSerialPort {
    /// Open a serial port at `baud_rate`, 8/N/1, no flow control, zero read timeout
    pub fn open(port_name: &str, baud_rate: u32) -> std::result::Result<Self, ConnectionError> {
        if baud_rate == 0 {
            return Err(ConnectionError::UnsupportedBaudRate { baud: baud_rate });
        }

        let builder = serialport::new(port_name, baud_rate)
            .timeout(Duration::ZERO)
            .data_bits(serialport::DataBits::Eight)
            .stop_bits(serialport::StopBits::One)
            .parity(serialport::Parity::None)
            .flow_control(serialport::FlowControl::None);

        match builder.open() {
            Ok(port) => Ok(RealSerialPort {
                name: port_name.to_string(),
                port: Some(port),
            }),
            Err(e) => {
                tracing::debug!("Failed to open serial port {}: {}", port_name, e);
                Err(ConnectionError::FailedToOpen {
                    port: port_name.to_string(),
                    reason: e.to_string(),
                })
            }
        }
    }

    fn port_mut(&mut self) -> io::Result<&mut Box<dyn serialport::SerialPort>> {
        self.port
            .as_mut()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotConnected, "port is closed"))
    }
}

impl PortHandle for RealSerialPort {
    fn name(&self) -> String {
        self.name.clone()
    }

    fn bytes_to_read(&mut self) -> io::Result<usize> {
        let available = self.port_mut()?.bytes_to_read().map_err(io::Error::from)?;
        Ok(available as usize)
    }

    fn bytes_to_write(&mut self) -> io::Result<usize> {
        let queued = self.port_mut()?.bytes_to_write().map_err(io::Error::from)?;
        Ok(queued as usize)
    }

    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.port_mut()?.read(buf)
    }

    fn write_all(&mut self, data: &[u8]) -> io::Result<()> {
        self.port_mut()?.write_all(data)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.port_mut()?.flush()
    }

    fn close(&mut self) -> io::Result<()> {
        // Dropping the native handle releases the device.
        self.port.take();
        Ok(())
    }
}

/// Ports of the local machine
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemPorts {
    usb_only: bool,
}

impl SystemPorts {
    /// Create a provider; `usb_only` restricts candidates to USB/ACM/COM names
    pub fn new(usb_only: bool) -> Self {
        Self { usb_only }
    }
}

impl PortProvider for SystemPorts {
    fn candidates(&self) -> Result<Vec<SerialPortInfo>> {
        if self.usb_only {
            list_ports()
        } else {
            list_all_ports()
        }
    }

    fn open(
        &self,
        port: &SerialPortInfo,
        baud_rate: u32,
    ) -> std::result::Result<Box<dyn PortHandle>, ConnectionError> {
        let handle = RealSerialPort::open(&port.port_name, baud_rate)?;
        Ok(Box::new(handle))
    }
}
