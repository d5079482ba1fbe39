//! Port discovery
//!
//! Single linear pass over the candidate ports: open, trial handshake, and
//! either claim the port or close it and move on. A port that fails is not
//! retried within the same pass.

use crate::communication::serial::{PortHandle, PortProvider, SerialPortInfo};
use crate::pendant::handshake::{HandshakeMode, HandshakeNegotiator};
use pendantlink_core::{BridgeError, Clock};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// A port that completed the handshake and now belongs to the caller
pub struct ClaimedPort {
    /// Where the port came from
    pub info: SerialPortInfo,
    /// The open handle
    pub port: Box<dyn PortHandle>,
}

impl std::fmt::Debug for ClaimedPort {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClaimedPort")
            .field("info", &self.info)
            .finish_non_exhaustive()
    }
}

/// Finds the port the peer device is attached to
pub struct PortScanner {
    provider: Box<dyn PortProvider>,
    baud_rate: u32,
    handshake: HandshakeMode,
    clock: Arc<dyn Clock>,
    poll_interval: Duration,
    stop: Option<Arc<AtomicBool>>,
}

impl PortScanner {
    /// Create a scanner opening ports at `baud_rate`
    pub fn new(
        provider: Box<dyn PortProvider>,
        baud_rate: u32,
        handshake: HandshakeMode,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            provider,
            baud_rate,
            handshake,
            clock,
            poll_interval: Duration::from_millis(10),
            stop: None,
        }
    }

    /// Poll interval used while waiting for handshake lines
    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Abort scanning when `stop` is raised
    pub fn with_stop_signal(mut self, stop: Arc<AtomicBool>) -> Self {
        self.stop = Some(stop);
        self
    }

    fn stopped(&self) -> bool {
        self.stop
            .as_ref()
            .is_some_and(|s| s.load(Ordering::Acquire))
    }

    /// Enumerate candidates and scan them
    pub fn discover(&self) -> Option<ClaimedPort> {
        match self.provider.candidates() {
            Ok(candidates) => self.discover_from(&candidates),
            Err(e) => {
                tracing::warn!("Port enumeration failed: {}", e);
                None
            }
        }
    }

    /// Scan the given candidates in order
    pub fn discover_from(&self, candidates: &[SerialPortInfo]) -> Option<ClaimedPort> {
        for info in candidates {
            if self.stopped() {
                tracing::debug!("Scan aborted");
                return None;
            }

            tracing::debug!(port = %info.port_name, baud = self.baud_rate, "Trying port");
            match self.try_port(info) {
                Ok(port) => {
                    tracing::info!(port = %info.port_name, "Pendant found");
                    return Some(ClaimedPort {
                        info: info.clone(),
                        port,
                    });
                }
                Err(e) if e.is_port_skip() => {
                    tracing::debug!(port = %info.port_name, "Skipping port: {}", e);
                }
                Err(e) => {
                    tracing::warn!(port = %info.port_name, "Handshake failed: {}", e);
                }
            }
        }

        tracing::debug!("No compatible port found among {} candidates", candidates.len());
        None
    }

    /// Open one candidate and run the handshake on it
    pub fn try_port(&self, info: &SerialPortInfo) -> Result<Box<dyn PortHandle>, BridgeError> {
        let mut port = self.provider.open(info, self.baud_rate).map_err(|e| {
            BridgeError::PortUnavailable {
                port: info.port_name.clone(),
                reason: e.to_string(),
            }
        })?;

        let mut negotiator =
            HandshakeNegotiator::new(&self.handshake, self.clock.as_ref(), self.poll_interval);
        if let Some(stop) = self.stop.as_deref() {
            negotiator = negotiator.with_stop_signal(stop);
        }

        match negotiator.negotiate(port.as_mut()) {
            Ok(()) => Ok(port),
            Err(e) => {
                if let Err(close_err) = port.close() {
                    tracing::debug!(port = %info.port_name, "Close failed: {}", close_err);
                }
                Err(e)
            }
        }
    }
}
