//! Handshake negotiation on a candidate port
//!
//! Confirms that an opened port is connected to the expected peer device.
//! Lines read during the trial are consumed and never replayed.

use crate::communication::framer::LineFramer;
use crate::communication::serial::PortHandle;
use pendantlink_core::{BridgeError, Clock};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

/// Token the active peer sends to ask for a connection
pub const CONNECTION_REQUEST: &str = "CONREQ";

/// Acknowledgment written back to the active peer
pub const CONNECTION_ACK: &str = "CONACK\n";

/// Line the passive peer sends when no key is pressed
pub const IDLE_KEY_SENTINEL: &str = "KEY:-1";

/// How the peer proves its identity
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandshakeMode {
    /// Wait for `request`, answer with `ack`, then let the peer settle
    Active {
        /// Recognition token
        request: &'static str,
        /// Acknowledgment written on success (newline included)
        ack: &'static str,
        /// How long to wait for the token
        window: Duration,
        /// Delay after the acknowledgment
        settle: Duration,
    },
    /// Succeed if the very first line equals `sentinel`; nothing is written
    Passive {
        /// Expected first line
        sentinel: &'static str,
        /// How long to wait for the first line
        window: Duration,
    },
}

impl HandshakeMode {
    /// `CONREQ` / `CONACK` exchange with a 2 s window and 100 ms settle
    pub fn active() -> Self {
        HandshakeMode::Active {
            request: CONNECTION_REQUEST,
            ack: CONNECTION_ACK,
            window: Duration::from_millis(2000),
            settle: Duration::from_millis(100),
        }
    }

    /// First line must be the idle key, 1 s window
    pub fn passive() -> Self {
        HandshakeMode::Passive {
            sentinel: IDLE_KEY_SENTINEL,
            window: Duration::from_millis(1000),
        }
    }

    /// The waiting window
    pub fn window(&self) -> Duration {
        match self {
            HandshakeMode::Active { window, .. } | HandshakeMode::Passive { window, .. } => {
                *window
            }
        }
    }

    /// Copy of this mode with a different waiting window
    pub fn with_window(&self, new_window: Duration) -> Self {
        let mut mode = self.clone();
        match &mut mode {
            HandshakeMode::Active { window, .. } | HandshakeMode::Passive { window, .. } => {
                *window = new_window;
            }
        }
        mode
    }
}

/// Runs one handshake trial
pub struct HandshakeNegotiator<'a> {
    mode: &'a HandshakeMode,
    clock: &'a dyn Clock,
    poll_interval: Duration,
    stop: Option<&'a AtomicBool>,
}

impl<'a> HandshakeNegotiator<'a> {
    /// Create a negotiator polling the port every `poll_interval`
    pub fn new(mode: &'a HandshakeMode, clock: &'a dyn Clock, poll_interval: Duration) -> Self {
        Self {
            mode,
            clock,
            poll_interval,
            stop: None,
        }
    }

    /// Abort the trial early when `stop` is raised
    pub fn with_stop_signal(mut self, stop: &'a AtomicBool) -> Self {
        self.stop = Some(stop);
        self
    }

    fn stopped(&self) -> bool {
        self.stop.is_some_and(|s| s.load(Ordering::Acquire))
    }

    /// Run the trial on `port`
    ///
    /// Returns `Ok(())` when the peer identified itself. Any other outcome means
    /// "not this port".
    pub fn negotiate(&self, port: &mut dyn PortHandle) -> Result<(), BridgeError> {
        let name = port.name();
        let window = self.mode.window();
        let deadline = self.clock.now() + window;
        let mut framer = LineFramer::new();

        loop {
            for line in framer.drain(port)? {
                tracing::debug!(port = %name, line = %line, "Handshake read");
                match self.mode {
                    HandshakeMode::Active {
                        request,
                        ack,
                        settle,
                        ..
                    } => {
                        if line == *request {
                            port.write_all(ack.as_bytes())?;
                            port.flush()?;
                            self.clock.sleep(*settle);
                            tracing::info!(port = %name, "Acknowledged connection request");
                            return Ok(());
                        }
                    }
                    HandshakeMode::Passive { sentinel, .. } => {
                        if line == *sentinel {
                            tracing::info!(port = %name, "Pendant identified");
                            return Ok(());
                        }
                        // Only the first line counts.
                        return Err(BridgeError::HandshakeTimeout {
                            port: name,
                            window_ms: window.as_millis() as u64,
                        });
                    }
                }
            }

            if self.stopped() || self.clock.now() >= deadline {
                break;
            }
            self.clock.sleep(self.poll_interval);
        }

        Err(BridgeError::HandshakeTimeout {
            port: name,
            window_ms: window.as_millis() as u64,
        })
    }
}
