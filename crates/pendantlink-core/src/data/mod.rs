//! Data models for positions, units, and machine snapshots
//!
//! This module provides:
//! - Unit management (MM, INCH) and conversion
//! - Axis identifiers used by zeroing and rapid-move commands
//! - 4-axis work positions as reported by the host backend
//! - Status classification of the host backend
//! - The point-in-time machine snapshot pushed to the peer device

use serde::{Deserialize, Serialize};
use std::fmt;

/// Millimeters per inch
pub const MM_PER_INCH: f64 = 25.4;

/// Machine coordinate units (millimeters or inches)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Units {
    /// Millimeters (metric)
    MM,
    /// Inches (imperial)
    INCH,
    /// Unknown or uninitialized
    Unknown,
}

impl Units {
    /// Convert a value from one unit to another
    ///
    /// # Arguments
    /// * `value` - The value to convert
    /// * `from` - The unit of the input value
    /// * `to` - The target unit
    ///
    /// # Returns
    /// The converted value, or the unchanged value if units are the same or unknown
    pub fn convert(value: f64, from: Units, to: Units) -> f64 {
        if from == to {
            return value;
        }

        match (from, to) {
            (Units::MM, Units::INCH) => value / MM_PER_INCH,
            (Units::INCH, Units::MM) => value * MM_PER_INCH,
            _ => value,
        }
    }
}

impl fmt::Display for Units {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Units::MM => write!(f, "mm"),
            Units::INCH => write!(f, "in"),
            Units::Unknown => write!(f, "unknown"),
        }
    }
}

/// Machine axis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Axis {
    /// X linear axis
    X,
    /// Y linear axis
    Y,
    /// Z linear axis
    Z,
    /// A rotary axis
    A,
}

impl Axis {
    /// Axis letter as used in G-code words
    pub fn letter(&self) -> char {
        match self {
            Axis::X => 'X',
            Axis::Y => 'Y',
            Axis::Z => 'Z',
            Axis::A => 'A',
        }
    }

    /// Whether the axis is rotary (measured in degrees, never unit-converted)
    pub fn is_rotary(&self) -> bool {
        matches!(self, Axis::A)
    }
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.letter())
    }
}

/// Work position reported by the host backend
///
/// The rotary axis is `NaN` when the machine has no A axis configured.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CNCPoint {
    /// X-axis position
    pub x: f64,
    /// Y-axis position
    pub y: f64,
    /// Z-axis position
    pub z: f64,
    /// A-axis (rotary) position in degrees
    pub a: f64,
    /// Unit of the linear axes
    pub unit: Units,
}

impl CNCPoint {
    /// Create a new point with all axes at zero
    pub fn new(unit: Units) -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            z: 0.0,
            a: 0.0,
            unit,
        }
    }

    /// Create a point with the given coordinates
    pub fn with_axes(x: f64, y: f64, z: f64, a: f64, unit: Units) -> Self {
        Self { x, y, z, a, unit }
    }

    /// Convert the linear axes of this point to a different unit
    ///
    /// The rotary axis is left untouched.
    pub fn convert_to(&self, target_unit: Units) -> Self {
        Self {
            x: Units::convert(self.x, self.unit, target_unit),
            y: Units::convert(self.y, self.unit, target_unit),
            z: Units::convert(self.z, self.unit, target_unit),
            a: self.a,
            unit: target_unit,
        }
    }
}

impl Default for CNCPoint {
    fn default() -> Self {
        Self::new(Units::MM)
    }
}

impl fmt::Display for CNCPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "X:{:.3} Y:{:.3} Z:{:.3} A:{:.3} ({})",
            self.x, self.y, self.z, self.a, self.unit
        )
    }
}

/// Operational status of the host as reported to the peer device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PendantStatus {
    /// Idle and ready for commands
    Idle,
    /// Job paused / feed hold
    Hold,
    /// Streaming a job
    Run,
    /// Any other state (homing, jogging, alarm, ...)
    Busy,
}

impl PendantStatus {
    /// Classify the backend state.
    ///
    /// Priority: hold/pause, then run, then idle; anything else is busy.
    pub fn from_flags(paused: bool, sending_file: bool, idle: bool) -> Self {
        if paused {
            Self::Hold
        } else if sending_file {
            Self::Run
        } else if idle {
            Self::Idle
        } else {
            Self::Busy
        }
    }

    /// Numeric code carried in binary frames
    pub fn code(&self) -> f32 {
        match self {
            Self::Idle => 0.0,
            Self::Hold => 1.0,
            Self::Run => 2.0,
            Self::Busy => 3.0,
        }
    }

    /// Status word shown on text displays
    pub fn label(&self) -> &'static str {
        match self {
            Self::Idle => "IDLE",
            Self::Hold => "PAUSE",
            Self::Run => "RUN",
            Self::Busy => "BUSY",
        }
    }
}

impl fmt::Display for PendantStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Replace a not-a-number value with zero
pub fn sanitize(value: f32) -> f32 {
    if value.is_nan() {
        0.0
    } else {
        value
    }
}

/// Point-in-time machine state packaged for the peer device
///
/// Built fresh for every transmission. Positions are already expressed in the
/// unit the peer expects.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MachineSnapshot {
    /// X work position
    pub x: f32,
    /// Y work position
    pub y: f32,
    /// Z work position
    pub z: f32,
    /// A work position (degrees)
    pub a: f32,
    /// Host status
    pub status: PendantStatus,
    /// Commanded jog feed rate
    pub feed_rate: f32,
    /// Rows already streamed
    pub sent_rows: u64,
    /// Rows in the loaded job
    pub total_rows: u64,
    /// Jog step size
    pub step_size: f32,
    /// Live feed rate reported by the controller, if any
    pub live_feed_rate: Option<f32>,
    /// Live spindle speed reported by the controller, if any
    pub live_spindle_speed: Option<f32>,
}

impl MachineSnapshot {
    /// Create an empty snapshot
    pub fn new() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            z: 0.0,
            a: 0.0,
            status: PendantStatus::Busy,
            feed_rate: 0.0,
            sent_rows: 0,
            total_rows: 0,
            step_size: 0.0,
            live_feed_rate: None,
            live_spindle_speed: None,
        }
    }

    /// Builder method to set the work position
    pub fn with_position(mut self, x: f32, y: f32, z: f32, a: f32) -> Self {
        self.x = x;
        self.y = y;
        self.z = z;
        self.a = a;
        self
    }

    /// Builder method to set status
    pub fn with_status(mut self, status: PendantStatus) -> Self {
        self.status = status;
        self
    }

    /// Builder method to set the jog feed rate
    pub fn with_feed_rate(mut self, rate: f32) -> Self {
        self.feed_rate = rate;
        self
    }

    /// Builder method to set job progress
    pub fn with_rows(mut self, sent: u64, total: u64) -> Self {
        self.sent_rows = sent;
        self.total_rows = total;
        self
    }

    /// Builder method to set the jog step size
    pub fn with_step_size(mut self, step: f32) -> Self {
        self.step_size = step;
        self
    }

    /// Builder method to set live overrides
    pub fn with_live(mut self, feed_rate: Option<f32>, spindle_speed: Option<f32>) -> Self {
        self.live_feed_rate = feed_rate;
        self.live_spindle_speed = spindle_speed;
        self
    }

    /// Copy of this snapshot with every NaN float replaced by zero
    pub fn sanitized(&self) -> Self {
        Self {
            x: sanitize(self.x),
            y: sanitize(self.y),
            z: sanitize(self.z),
            a: sanitize(self.a),
            feed_rate: sanitize(self.feed_rate),
            step_size: sanitize(self.step_size),
            live_feed_rate: self.live_feed_rate.map(sanitize),
            live_spindle_speed: self.live_spindle_speed.map(sanitize),
            ..*self
        }
    }
}

impl Default for MachineSnapshot {
    fn default() -> Self {
        Self::new()
    }
}
