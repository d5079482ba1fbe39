//! In-memory ports and recording collaborators shared by the integration tests

#![allow(dead_code)]

use pendantlink_communication::{PortHandle, PortProvider, SerialPortInfo};
use pendantlink_core::{
    Axis, CNCPoint, ConnectionError, JogService, MachineBackend, MachineEvent,
    MachineListenerHandle, Units,
};
use std::collections::VecDeque;
use std::io;
use parking_lot::Mutex;
use std::sync::Arc;

#[derive(Default)]
struct PortState {
    inbound: VecDeque<u8>,
    written: Vec<u8>,
    writes: usize,
    queued: usize,
    closes: usize,
    fail_writes: bool,
}

/// Port whose state is shared between the test and the code under test
#[derive(Clone)]
pub struct MockPort {
    name: String,
    state: Arc<Mutex<PortState>>,
}

impl MockPort {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            state: Arc::new(Mutex::new(PortState::default())),
        }
    }

    pub fn feed(&self, bytes: &[u8]) {
        self.state.lock().inbound.extend(bytes.iter().copied());
    }

    pub fn feed_line(&self, line: &str) {
        self.feed(line.as_bytes());
        self.feed(b"\n");
    }

    pub fn written(&self) -> Vec<u8> {
        self.state.lock().written.clone()
    }

    pub fn take_written(&self) -> Vec<u8> {
        std::mem::take(&mut self.state.lock().written)
    }

    pub fn write_count(&self) -> usize {
        self.state.lock().writes
    }

    pub fn set_queued(&self, queued: usize) {
        self.state.lock().queued = queued;
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.state.lock().fail_writes = fail;
    }

    pub fn close_count(&self) -> usize {
        self.state.lock().closes
    }

    pub fn unread(&self) -> usize {
        self.state.lock().inbound.len()
    }

    pub fn info(&self) -> SerialPortInfo {
        SerialPortInfo::new(self.name.clone(), "Mock port")
    }
}

impl PortHandle for MockPort {
    fn name(&self) -> String {
        self.name.clone()
    }

    fn bytes_to_read(&mut self) -> io::Result<usize> {
        Ok(self.state.lock().inbound.len())
    }

    fn bytes_to_write(&mut self) -> io::Result<usize> {
        Ok(self.state.lock().queued)
    }

    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let mut state = self.state.lock();
        let n = buf.len().min(state.inbound.len());
        for slot in buf.iter_mut().take(n) {
            *slot = state.inbound.pop_front().unwrap();
        }
        Ok(n)
    }

    fn write_all(&mut self, data: &[u8]) -> io::Result<()> {
        let mut state = self.state.lock();
        if state.fail_writes {
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "device unplugged"));
        }
        state.written.extend_from_slice(data);
        state.writes += 1;
        Ok(())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }

    fn close(&mut self) -> io::Result<()> {
        self.state.lock().closes += 1;
        Ok(())
    }
}

/// Provider over a fixed list of mock ports
#[derive(Clone, Default)]
pub struct MockProvider {
    ports: Vec<MockPort>,
    unavailable: Vec<String>,
    opened: Arc<Mutex<Vec<(String, u32)>>>,
}

impl MockProvider {
    pub fn new(ports: Vec<MockPort>) -> Self {
        Self {
            ports,
            ..Default::default()
        }
    }

    /// Make opening `name` fail
    pub fn with_unavailable(mut self, name: &str) -> Self {
        self.unavailable.push(name.to_string());
        self
    }

    pub fn opened(&self) -> Vec<(String, u32)> {
        self.opened.lock().clone()
    }
}

impl PortProvider for MockProvider {
    fn candidates(&self) -> pendantlink_core::Result<Vec<SerialPortInfo>> {
        Ok(self.ports.iter().map(MockPort::info).collect())
    }

    fn open(
        &self,
        port: &SerialPortInfo,
        baud_rate: u32,
    ) -> Result<Box<dyn PortHandle>, ConnectionError> {
        self.opened
            .lock()
            .push((port.port_name.clone(), baud_rate));
        if self.unavailable.contains(&port.port_name) {
            return Err(ConnectionError::FailedToOpen {
                port: port.port_name.clone(),
                reason: "busy".to_string(),
            });
        }
        self.ports
            .iter()
            .find(|p| p.name == port.port_name)
            .map(|p| Box::new(p.clone()) as Box<dyn PortHandle>)
            .ok_or_else(|| ConnectionError::FailedToOpen {
                port: port.port_name.clone(),
                reason: "no such port".to_string(),
            })
    }
}

struct BackendState {
    position: CNCPoint,
    rows: (u64, u64),
    paused: bool,
    sending: bool,
    idle: bool,
    fail: bool,
}

/// Backend that records every action it receives
pub struct RecordingBackend {
    state: Mutex<BackendState>,
    calls: Mutex<Vec<String>>,
    listeners: Mutex<Vec<MachineListenerHandle>>,
}

impl RecordingBackend {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(BackendState {
                position: CNCPoint::new(Units::MM),
                rows: (0, 0),
                paused: false,
                sending: false,
                idle: true,
                fail: false,
            }),
            calls: Mutex::new(Vec::new()),
            listeners: Mutex::new(Vec::new()),
        }
    }

    pub fn set_position(&self, position: CNCPoint) {
        self.state.lock().position = position;
    }

    pub fn set_rows(&self, sent: u64, total: u64) {
        self.state.lock().rows = (sent, total);
    }

    pub fn set_flags(&self, paused: bool, sending: bool, idle: bool) {
        let mut state = self.state.lock();
        state.paused = paused;
        state.sending = sending;
        state.idle = idle;
    }

    /// Make every action return an error
    pub fn set_failing(&self, fail: bool) {
        self.state.lock().fail = fail;
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    pub fn clear_calls(&self) {
        self.calls.lock().clear();
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.lock().len()
    }

    /// Deliver an event to every listener, as the backend thread would
    pub fn emit(&self, event: MachineEvent) {
        let listeners = self.listeners.lock().clone();
        for listener in listeners {
            listener.on_machine_event(&event);
        }
    }

    fn record(&self, call: String) -> anyhow::Result<()> {
        self.calls.lock().push(call);
        if self.state.lock().fail {
            anyhow::bail!("backend rejected the action");
        }
        Ok(())
    }
}

impl MachineBackend for RecordingBackend {
    fn work_position(&self) -> CNCPoint {
        self.state.lock().position
    }

    fn num_rows(&self) -> u64 {
        self.state.lock().rows.1
    }

    fn num_sent_rows(&self) -> u64 {
        self.state.lock().rows.0
    }

    fn is_paused(&self) -> bool {
        self.state.lock().paused
    }

    fn is_sending_file(&self) -> bool {
        self.state.lock().sending
    }

    fn is_idle(&self) -> bool {
        self.state.lock().idle
    }

    fn reset_coordinate_to_zero(&self, axis: Axis) -> anyhow::Result<()> {
        self.record(format!("zero {}", axis))
    }

    fn send_gcode_command(&self, command: &str) -> anyhow::Result<()> {
        self.record(format!("gcode {}", command))
    }

    fn return_to_zero(&self) -> anyhow::Result<()> {
        self.record("return_to_zero".to_string())
    }

    fn perform_homing_cycle(&self) -> anyhow::Result<()> {
        self.record("home".to_string())
    }

    fn send_job(&self) -> anyhow::Result<()> {
        self.record("send_job".to_string())
    }

    fn pause_resume(&self) -> anyhow::Result<()> {
        self.record("pause_resume".to_string())
    }

    fn cancel(&self) -> anyhow::Result<()> {
        self.record("cancel".to_string())
    }

    fn add_listener(&self, listener: MachineListenerHandle) {
        self.listeners.lock().push(listener);
    }
}

struct JogState {
    units: Units,
    feed_rate: f64,
    steps: (f64, f64, f64),
}

/// Jog service that records every action it receives
pub struct RecordingJog {
    state: Mutex<JogState>,
    calls: Mutex<Vec<String>>,
}

impl RecordingJog {
    pub fn new(units: Units) -> Self {
        Self {
            state: Mutex::new(JogState {
                units,
                feed_rate: 500.0,
                steps: (1.0, 1.0, 1.0),
            }),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn set_feed_rate(&self, feed_rate: f64) {
        self.state.lock().feed_rate = feed_rate;
    }

    pub fn steps(&self) -> (f64, f64, f64) {
        self.state.lock().steps
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    fn record(&self, call: String) -> anyhow::Result<()> {
        self.calls.lock().push(call);
        Ok(())
    }
}

impl JogService for RecordingJog {
    fn units(&self) -> Units {
        self.state.lock().units
    }

    fn feed_rate(&self) -> f64 {
        self.state.lock().feed_rate
    }

    fn step_size_xy(&self) -> f64 {
        self.state.lock().steps.0
    }

    fn step_size_z(&self) -> f64 {
        self.state.lock().steps.1
    }

    fn step_size_abc(&self) -> f64 {
        self.state.lock().steps.2
    }

    fn set_step_size_xy(&self, step: f64) -> anyhow::Result<()> {
        self.state.lock().steps.0 = step;
        self.record(format!("step_xy {}", step))
    }

    fn set_step_size_z(&self, step: f64) -> anyhow::Result<()> {
        self.state.lock().steps.1 = step;
        self.record(format!("step_z {}", step))
    }

    fn set_step_size_abc(&self, step: f64) -> anyhow::Result<()> {
        self.state.lock().steps.2 = step;
        self.record(format!("step_abc {}", step))
    }

    fn adjust_manual_location_xy(&self, x: i32, y: i32) -> anyhow::Result<()> {
        self.record(format!("jog_xy {} {}", x, y))
    }

    fn adjust_manual_location_z(&self, z: i32) -> anyhow::Result<()> {
        self.record(format!("jog_z {}", z))
    }

    fn adjust_manual_location_abc(&self, a: i32, b: i32, c: i32) -> anyhow::Result<()> {
        self.record(format!("jog_abc {} {} {}", a, b, c))
    }
}

/// Backend and jog service registered in a fresh registry
pub fn services(units: Units) -> (
    Arc<RecordingBackend>,
    Arc<RecordingJog>,
    Arc<pendantlink_core::Collaborators>,
) {
    let backend = Arc::new(RecordingBackend::new());
    let jog = Arc::new(RecordingJog::new(units));
    let collaborators = Arc::new(pendantlink_core::Collaborators::with(
        backend.clone(),
        jog.clone(),
    ));
    (backend, jog, collaborators)
}

/// Decode the little-endian f32 fields following a binary marker
pub fn decode_floats(frame: &[u8], marker_len: usize) -> Vec<f32> {
    frame[marker_len..]
        .chunks_exact(4)
        .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect()
}
