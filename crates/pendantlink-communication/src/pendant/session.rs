//! Session supervision
//!
//! One worker owns the port and the line buffer for the whole lifecycle:
//! discovery, handshake, and the connected poll loop. Other threads only see
//! the [`SessionHandle`], which touches atomics and never blocks.

use crate::communication::framer::LineFramer;
use crate::communication::serial::PortProvider;
use crate::pendant::connection_watch::{
    ConnectionWatchConfig, ConnectionWatchState, ConnectionWatcher,
};
use crate::pendant::encoder::{LiveOverrides, SnapshotEncoder};
use crate::pendant::interpreter::{CommandInterpreter, Interpretation};
use crate::pendant::scanner::{ClaimedPort, PortScanner};
use crate::pendant::wire::PeerMessage;
use crate::pendant::ProtocolProfile;
use parking_lot::RwLock;
use pendantlink_core::{BridgeError, Clock, Collaborators, MachineEvent, MachineListener};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

/// Name of the worker thread
pub const SESSION_THREAD_NAME: &str = "pendantlink-session";

/// Lifecycle state of the bridge
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No port claimed
    Disconnected,
    /// A discovery pass is running
    Handshaking,
    /// A port is claimed and polled
    Connected,
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionState::Disconnected => write!(f, "Disconnected"),
            SessionState::Handshaking => write!(f, "Handshaking"),
            SessionState::Connected => write!(f, "Connected"),
        }
    }
}

struct SessionShared {
    state: RwLock<SessionState>,
    watcher: ConnectionWatcher,
    live: LiveOverrides,
    shutdown: Arc<AtomicBool>,
    push_requested: AtomicBool,
    collecting: AtomicBool,
    peer_request_active: AtomicBool,
    push_on_event: bool,
}

/// Thread-safe view of a running session
///
/// Registered as the backend's machine listener. Every method returns
/// immediately.
#[derive(Clone)]
pub struct SessionHandle {
    shared: Arc<SessionShared>,
}

impl SessionHandle {
    /// Ask the worker to stop at its next tick
    pub fn shutdown(&self) {
        self.shared.shutdown.store(true, Ordering::Release);
    }

    /// Check if shutdown was requested
    pub fn is_shutdown(&self) -> bool {
        self.shared.shutdown.load(Ordering::Acquire)
    }

    /// Current lifecycle state
    pub fn state(&self) -> SessionState {
        *self.shared.state.read()
    }

    /// Check if a port is claimed
    pub fn is_connected(&self) -> bool {
        self.state() == SessionState::Connected
    }

    /// Milliseconds since the supervisor started at which the peer was last seen
    pub fn last_seen_ms(&self) -> u64 {
        self.shared.watcher.last_seen_ms()
    }

    /// Live values last reported by the backend
    pub fn live(&self) -> &LiveOverrides {
        &self.shared.live
    }

    /// Ask for an out-of-band snapshot push
    ///
    /// Skipped (returns `false`) when not connected, while the worker is
    /// serving a peer request, or when a request is already pending.
    pub fn request_snapshot(&self) -> bool {
        if !self.is_connected() {
            return false;
        }
        if self.shared.peer_request_active.load(Ordering::Acquire) {
            tracing::trace!("Peer request in progress, skipping snapshot request");
            return false;
        }
        if self
            .shared
            .collecting
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return false;
        }
        self.shared.push_requested.store(true, Ordering::Release);
        true
    }
}

impl MachineListener for SessionHandle {
    fn on_machine_event(&self, event: &MachineEvent) {
        tracing::trace!(%event, "Machine event");
        self.shared.live.observe(event);
        if self.shared.push_on_event {
            self.request_snapshot();
        }
    }
}

/// Drives discovery and the connected session
pub struct SessionSupervisor {
    profile: ProtocolProfile,
    scanner: PortScanner,
    collaborators: Arc<Collaborators>,
    clock: Arc<dyn Clock>,
    interpreter: CommandInterpreter,
    encoder: SnapshotEncoder,
    framer: LineFramer,
    port: Option<ClaimedPort>,
    shared: Arc<SessionShared>,
    listener_registered: bool,
}

impl SessionSupervisor {
    /// Create a supervisor; nothing happens until [`tick`](Self::tick) or
    /// [`run`](Self::run)
    pub fn new(
        profile: ProtocolProfile,
        provider: Box<dyn PortProvider>,
        collaborators: Arc<Collaborators>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let shutdown = Arc::new(AtomicBool::new(false));
        let watch_config = ConnectionWatchConfig {
            timeout_ms: profile.link_timeout.as_millis() as u64,
        };
        let shared = Arc::new(SessionShared {
            state: RwLock::new(SessionState::Disconnected),
            watcher: ConnectionWatcher::new(watch_config, clock.now()),
            live: LiveOverrides::new(),
            shutdown: shutdown.clone(),
            push_requested: AtomicBool::new(false),
            collecting: AtomicBool::new(false),
            peer_request_active: AtomicBool::new(false),
            push_on_event: profile.push_on_event,
        });

        let scanner = PortScanner::new(
            provider,
            profile.baud_rate,
            profile.handshake.clone(),
            clock.clone(),
        )
        .with_poll_interval(profile.poll_interval)
        .with_stop_signal(shutdown);

        Self {
            interpreter: CommandInterpreter::new(profile.wire.clone()),
            encoder: SnapshotEncoder::new(profile.wire.clone()),
            profile,
            scanner,
            collaborators,
            clock,
            framer: LineFramer::new(),
            port: None,
            shared,
            listener_registered: false,
        }
    }

    /// Handle for other threads
    pub fn handle(&self) -> SessionHandle {
        SessionHandle {
            shared: self.shared.clone(),
        }
    }

    /// The active profile
    pub fn profile(&self) -> &ProtocolProfile {
        &self.profile
    }

    /// Current lifecycle state
    pub fn state(&self) -> SessionState {
        *self.shared.state.read()
    }

    /// Name of the claimed port, if connected
    pub fn port_name(&self) -> Option<&str> {
        self.port.as_ref().map(|p| p.info.port_name.as_str())
    }

    /// Partial line received but not yet terminated
    pub fn pending_line(&self) -> &str {
        self.framer.pending()
    }

    fn set_state(&self, state: SessionState) {
        *self.shared.state.write() = state;
    }

    fn ensure_listener(&mut self) {
        if self.listener_registered {
            return;
        }
        if let Ok(backend) = self.collaborators.backend() {
            backend.add_listener(Arc::new(self.handle()));
            self.listener_registered = true;
            tracing::debug!("Registered machine listener");
        }
    }

    /// Run one step of the lifecycle
    ///
    /// Disconnected: one discovery pass. Connected: drain input, handle lines,
    /// serve pending snapshot requests, then check the liveness timeout.
    pub fn tick(&mut self) -> SessionState {
        if self.shared.shutdown.load(Ordering::Acquire) {
            if self.port.is_some() {
                self.disconnect("shutdown requested");
            }
            return self.state();
        }

        self.ensure_listener();

        if self.port.is_none() {
            self.set_state(SessionState::Handshaking);
            match self.scanner.discover() {
                Some(claimed) => self.on_connect(claimed),
                None => self.set_state(SessionState::Disconnected),
            }
            return self.state();
        }

        if let Err(e) = self.poll_connected() {
            debug_assert!(e.ends_session());
            tracing::warn!(port = ?self.port_name(), "Session ended: {}", e);
            self.disconnect(&e.to_string());
        }
        self.state()
    }

    fn on_connect(&mut self, claimed: ClaimedPort) {
        tracing::info!(
            port = %claimed.info.port_name,
            protocol = %self.profile.variant,
            baud = self.profile.baud_rate,
            "Pendant connected"
        );
        self.port = Some(claimed);
        self.framer.reset();
        self.shared.watcher.heartbeat_with(self.clock.as_ref());
        self.set_state(SessionState::Connected);

        if self.profile.push_on_connect {
            self.push_snapshot();
        }
    }

    fn poll_connected(&mut self) -> Result<(), BridgeError> {
        let lines = match self.port.as_mut() {
            Some(claimed) => self.framer.drain(claimed.port.as_mut())?,
            None => return Ok(()),
        };

        for line in lines {
            self.handle_line(&line)?;
        }

        if self.shared.push_requested.swap(false, Ordering::AcqRel) {
            self.push_snapshot();
            self.shared.collecting.store(false, Ordering::Release);
        }

        let now = self.clock.now();
        match self.shared.watcher.state(now) {
            ConnectionWatchState::Healthy => Ok(()),
            ConnectionWatchState::Lost => Err(BridgeError::LinkTimeout {
                elapsed_ms: self.shared.watcher.time_since_heartbeat(now),
            }),
        }
    }

    fn handle_line(&mut self, line: &str) -> Result<(), BridgeError> {
        let message = self.profile.wire.decode_control(line);
        if self.profile.counts_as_liveness(message.as_ref()) {
            self.shared.watcher.heartbeat_with(self.clock.as_ref());
        }

        match message {
            Some(PeerMessage::Ping) => self.reply_to_ping()?,
            Some(PeerMessage::Request) => {
                if self.profile.push_on_request {
                    self.shared.peer_request_active.store(true, Ordering::Release);
                    self.push_snapshot();
                    self.clock.sleep(self.profile.pacing_delay);
                    self.shared.peer_request_active.store(false, Ordering::Release);
                }
            }
            Some(PeerMessage::Key(_)) | Some(PeerMessage::BadKey(_)) => {
                let outcome = self.interpreter.apply(line, &self.collaborators);
                if matches!(outcome, Interpretation::Key { .. }) && self.profile.push_after_key {
                    self.push_snapshot();
                    self.clock.sleep(self.profile.pacing_delay);
                }
            }
            Some(PeerMessage::Heartbeat) => {}
            None => tracing::trace!(line = %line, "Unrecognized line"),
        }
        Ok(())
    }

    fn reply_to_ping(&mut self) -> Result<(), BridgeError> {
        let Some(reply) = self.profile.ping_reply else {
            return Ok(());
        };
        if let Some(claimed) = self.port.as_mut() {
            claimed.port.write_all(reply.as_bytes())?;
            claimed.port.flush()?;
            self.clock.sleep(self.profile.reply_settle);
        }
        Ok(())
    }

    fn push_snapshot(&mut self) -> bool {
        match self.port.as_mut() {
            Some(claimed) => {
                self.encoder
                    .push(claimed.port.as_mut(), &self.collaborators, &self.shared.live)
            }
            None => false,
        }
    }

    /// Close the port (once) and return to `Disconnected`
    pub fn disconnect(&mut self, reason: &str) {
        if let Some(mut claimed) = self.port.take() {
            tracing::info!(port = %claimed.info.port_name, reason = %reason, "Pendant disconnected");
            if let Err(e) = claimed.port.close() {
                tracing::warn!(port = %claimed.info.port_name, "Close failed: {}", e);
            }
        }
        self.framer.reset();
        self.shared.push_requested.store(false, Ordering::Release);
        self.shared.collecting.store(false, Ordering::Release);
        self.set_state(SessionState::Disconnected);
    }

    fn pause(&self, duration: Duration) {
        let step = self.profile.poll_interval.max(Duration::from_millis(1));
        let deadline = self.clock.now() + duration;
        while !self.shared.shutdown.load(Ordering::Acquire) && self.clock.now() < deadline {
            self.clock.sleep(step);
        }
    }

    /// Run until shutdown is requested
    pub fn run(mut self) {
        tracing::info!(protocol = %self.profile.variant, "Session supervisor started");
        while !self.shared.shutdown.load(Ordering::Acquire) {
            match self.tick() {
                SessionState::Connected => self.clock.sleep(self.profile.poll_interval),
                _ => self.pause(self.profile.rescan_delay),
            }
        }
        self.disconnect("shutdown requested");
        tracing::info!("Session supervisor stopped");
    }

    /// Run on a dedicated, named thread
    pub fn spawn(self) -> pendantlink_core::Result<JoinHandle<()>> {
        let worker = std::thread::Builder::new()
            .name(SESSION_THREAD_NAME.to_string())
            .spawn(move || self.run())?;
        Ok(worker)
    }
}
