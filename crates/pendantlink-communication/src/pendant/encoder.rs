//! Snapshot capture and transmission
//!
//! A snapshot is read fresh from the collaborators for every push, converted
//! to the jog unit, sanitized, then serialized by the configured wire format.

use crate::communication::serial::PortHandle;
use crate::pendant::wire::WireFormat;
use pendantlink_core::{
    Collaborators, JogService, MachineBackend, MachineEvent, MachineSnapshot, PendantStatus,
};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

const UNSET: u32 = u32::MAX;

fn store_opt(slot: &AtomicU32, value: Option<f64>) {
    let bits = match value {
        Some(v) if !v.is_nan() => (v as f32).to_bits(),
        _ => UNSET,
    };
    slot.store(bits, Ordering::Release);
}

fn load_opt(slot: &AtomicU32) -> Option<f32> {
    match slot.load(Ordering::Acquire) {
        UNSET => None,
        bits => Some(f32::from_bits(bits)),
    }
}

/// Live feed rate and spindle speed reported by machine events
///
/// Written from the notifier thread, read by the session worker.
#[derive(Debug)]
pub struct LiveOverrides {
    feed_rate: AtomicU32,
    spindle_speed: AtomicU32,
}

impl Default for LiveOverrides {
    fn default() -> Self {
        Self {
            feed_rate: AtomicU32::new(UNSET),
            spindle_speed: AtomicU32::new(UNSET),
        }
    }
}

impl LiveOverrides {
    /// Create with no live values
    pub fn new() -> Self {
        Self::default()
    }

    /// Record live values; `None` clears a value
    pub fn update(&self, feed_rate: Option<f64>, spindle_speed: Option<f64>) {
        store_opt(&self.feed_rate, feed_rate);
        store_opt(&self.spindle_speed, spindle_speed);
    }

    /// Record the live values carried by an event, if any
    pub fn observe(&self, event: &MachineEvent) {
        if let MachineEvent::StatusChanged {
            feed_rate,
            spindle_speed,
        } = event
        {
            self.update(*feed_rate, *spindle_speed);
        }
    }

    /// Last live feed rate
    pub fn feed_rate(&self) -> Option<f32> {
        load_opt(&self.feed_rate)
    }

    /// Last live spindle speed
    pub fn spindle_speed(&self) -> Option<f32> {
        load_opt(&self.spindle_speed)
    }
}

/// Builds and writes snapshot frames
#[derive(Clone)]
pub struct SnapshotEncoder {
    wire: Arc<dyn WireFormat>,
}

impl SnapshotEncoder {
    /// Create an encoder for the given wire format
    pub fn new(wire: Arc<dyn WireFormat>) -> Self {
        Self { wire }
    }

    /// The wire format in use
    pub fn wire(&self) -> &dyn WireFormat {
        self.wire.as_ref()
    }

    /// Read the current machine state
    pub fn capture(
        backend: &dyn MachineBackend,
        jog: &dyn JogService,
        live: &LiveOverrides,
    ) -> MachineSnapshot {
        let position = backend.work_position().convert_to(jog.units());
        let a = if position.a.is_nan() { 0.0 } else { position.a };
        let status = PendantStatus::from_flags(
            backend.is_paused(),
            backend.is_sending_file(),
            backend.is_idle(),
        );

        MachineSnapshot::new()
            .with_position(position.x as f32, position.y as f32, position.z as f32, a as f32)
            .with_status(status)
            .with_feed_rate(jog.feed_rate() as f32)
            .with_rows(backend.num_sent_rows(), backend.num_rows())
            .with_step_size(jog.step_size_xy() as f32)
            .with_live(live.feed_rate(), live.spindle_speed())
            .sanitized()
    }

    /// Encode a frame for `port`, or `None` when the port still has unsent bytes
    pub fn encode(
        &self,
        port: &mut dyn PortHandle,
        backend: &dyn MachineBackend,
        jog: &dyn JogService,
        live: &LiveOverrides,
    ) -> Option<Vec<u8>> {
        match port.bytes_to_write() {
            Ok(0) => {}
            Ok(queued) => {
                tracing::trace!(queued, "Output queue busy, skipping snapshot");
                return None;
            }
            Err(e) => {
                tracing::debug!("Output queue check failed: {}", e);
                return None;
            }
        }
        let snapshot = Self::capture(backend, jog, live);
        Some(self.wire.encode(&snapshot))
    }

    /// Capture, encode and write one frame
    ///
    /// Returns whether a frame was written. Write failures are logged and
    /// swallowed; a dead link is detected by the liveness timeout.
    pub fn push(
        &self,
        port: &mut dyn PortHandle,
        collaborators: &Collaborators,
        live: &LiveOverrides,
    ) -> bool {
        let (backend, jog) = match collaborators.resolve() {
            Ok(services) => services,
            Err(e) => {
                tracing::debug!("Skipping snapshot: {}", e);
                return false;
            }
        };

        let Some(frame) = self.encode(port, backend.as_ref(), jog.as_ref(), live) else {
            return false;
        };

        let result = port.write_all(&frame).and_then(|()| port.flush());
        match result {
            Ok(()) => {
                tracing::trace!(format = self.wire.name(), bytes = frame.len(), "Snapshot sent");
                true
            }
            Err(e) => {
                tracing::warn!(format = self.wire.name(), "Snapshot write failed: {}", e);
                false
            }
        }
    }
}
