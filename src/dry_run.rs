//! Dry-run machine
//!
//! A stand-in backend and jog service that log every action and keep a
//! simulated work position, so the bridge can be exercised against a real
//! pendant without a CNC controller attached.

use parking_lot::Mutex;
use pendantlink_core::{
    Axis, CNCPoint, JogService, MachineBackend, MachineEvent, MachineListenerHandle,
    PendantStatus, Units,
};

struct MachineState {
    position: CNCPoint,
    step_xy: f64,
    step_z: f64,
    step_abc: f64,
    sent_rows: u64,
    total_rows: u64,
    running: bool,
    paused: bool,
}

/// Simulated machine implementing both collaborator interfaces
pub struct DryRunMachine {
    state: Mutex<MachineState>,
    feed_rate: f64,
    listeners: Mutex<Vec<MachineListenerHandle>>,
}

impl DryRunMachine {
    /// Create a machine at work zero with a job of `total_rows` rows loaded
    pub fn new(units: Units, feed_rate: f64, total_rows: u64) -> Self {
        Self {
            state: Mutex::new(MachineState {
                position: CNCPoint::new(units),
                step_xy: 1.0,
                step_z: 1.0,
                step_abc: 1.0,
                sent_rows: 0,
                total_rows,
                running: false,
                paused: false,
            }),
            feed_rate,
            listeners: Mutex::new(Vec::new()),
        }
    }

    fn status(state: &MachineState) -> PendantStatus {
        PendantStatus::from_flags(state.paused, state.running, !state.running)
    }

    fn notify(&self, event: MachineEvent) {
        let listeners = self.listeners.lock().clone();
        for listener in listeners {
            listener.on_machine_event(&event);
        }
    }

    fn notify_state(&self) {
        let status = Self::status(&self.state.lock());
        self.notify(MachineEvent::StateChanged(status));
    }

    fn jog(&self, dx: i32, dy: i32, dz: i32, da: i32) {
        let position = {
            let mut state = self.state.lock();
            let (xy, z, abc) = (state.step_xy, state.step_z, state.step_abc);
            state.position.x += f64::from(dx) * xy;
            state.position.y += f64::from(dy) * xy;
            state.position.z += f64::from(dz) * z;
            state.position.a += f64::from(da) * abc;
            state.position
        };
        tracing::info!(%position, "Jog");
        self.notify(MachineEvent::StatusChanged {
            feed_rate: Some(self.feed_rate),
            spindle_speed: None,
        });
    }

    /// Advance the simulated job by one row
    pub fn stream_row(&self) {
        let progress = {
            let mut state = self.state.lock();
            if !state.running || state.paused {
                return;
            }
            state.sent_rows += 1;
            if state.sent_rows >= state.total_rows {
                state.running = false;
            }
            (state.sent_rows, state.total_rows)
        };
        self.notify(MachineEvent::JobProgress {
            sent: progress.0,
            total: progress.1,
        });
    }
}

impl MachineBackend for DryRunMachine {
    fn work_position(&self) -> CNCPoint {
        self.state.lock().position
    }

    fn num_rows(&self) -> u64 {
        self.state.lock().total_rows
    }

    fn num_sent_rows(&self) -> u64 {
        self.state.lock().sent_rows
    }

    fn is_paused(&self) -> bool {
        self.state.lock().paused
    }

    fn is_sending_file(&self) -> bool {
        self.state.lock().running
    }

    fn is_idle(&self) -> bool {
        !self.state.lock().running
    }

    fn reset_coordinate_to_zero(&self, axis: Axis) -> anyhow::Result<()> {
        {
            let mut state = self.state.lock();
            match axis {
                Axis::X => state.position.x = 0.0,
                Axis::Y => state.position.y = 0.0,
                Axis::Z => state.position.z = 0.0,
                Axis::A => state.position.a = 0.0,
            }
        }
        tracing::info!(%axis, "Zero axis");
        Ok(())
    }

    fn send_gcode_command(&self, command: &str) -> anyhow::Result<()> {
        tracing::info!(command = %command, "Send command");
        Ok(())
    }

    fn return_to_zero(&self) -> anyhow::Result<()> {
        let mut state = self.state.lock();
        let unit = state.position.unit;
        state.position = CNCPoint::new(unit);
        tracing::info!("Return to zero");
        Ok(())
    }

    fn perform_homing_cycle(&self) -> anyhow::Result<()> {
        tracing::info!("Homing cycle");
        Ok(())
    }

    fn send_job(&self) -> anyhow::Result<()> {
        {
            let mut state = self.state.lock();
            if state.running {
                anyhow::bail!("job already running");
            }
            state.running = true;
            state.paused = false;
            state.sent_rows = 0;
        }
        tracing::info!("Send job");
        self.notify_state();
        Ok(())
    }

    fn pause_resume(&self) -> anyhow::Result<()> {
        {
            let mut state = self.state.lock();
            if !state.running {
                anyhow::bail!("no job running");
            }
            state.paused = !state.paused;
        }
        tracing::info!("Pause/resume");
        self.notify_state();
        Ok(())
    }

    fn cancel(&self) -> anyhow::Result<()> {
        {
            let mut state = self.state.lock();
            state.running = false;
            state.paused = false;
        }
        tracing::info!("Cancel job");
        self.notify_state();
        Ok(())
    }

    fn add_listener(&self, listener: MachineListenerHandle) {
        self.listeners.lock().push(listener);
    }
}

impl JogService for DryRunMachine {
    fn units(&self) -> Units {
        self.state.lock().position.unit
    }

    fn feed_rate(&self) -> f64 {
        self.feed_rate
    }

    fn step_size_xy(&self) -> f64 {
        self.state.lock().step_xy
    }

    fn step_size_z(&self) -> f64 {
        self.state.lock().step_z
    }

    fn step_size_abc(&self) -> f64 {
        self.state.lock().step_abc
    }

    fn set_step_size_xy(&self, step: f64) -> anyhow::Result<()> {
        self.state.lock().step_xy = step;
        Ok(())
    }

    fn set_step_size_z(&self, step: f64) -> anyhow::Result<()> {
        self.state.lock().step_z = step;
        Ok(())
    }

    fn set_step_size_abc(&self, step: f64) -> anyhow::Result<()> {
        self.state.lock().step_abc = step;
        tracing::info!(step, "Step size");
        Ok(())
    }

    fn adjust_manual_location_xy(&self, x: i32, y: i32) -> anyhow::Result<()> {
        self.jog(x, y, 0, 0);
        Ok(())
    }

    fn adjust_manual_location_z(&self, z: i32) -> anyhow::Result<()> {
        self.jog(0, 0, z, 0);
        Ok(())
    }

    fn adjust_manual_location_abc(&self, a: i32, _b: i32, _c: i32) -> anyhow::Result<()> {
        self.jog(0, 0, 0, a);
        Ok(())
    }
}
