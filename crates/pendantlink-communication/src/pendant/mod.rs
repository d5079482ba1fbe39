//! # Pendant bridge
//!
//! Discovery, handshake, and session handling for a serial jog pendant or
//! status display attached to the host.
//!
//! A deployment selects one [`ProtocolProfile`]. The profile fixes the baud
//! rate, the handshake, the control vocabulary, the snapshot wire format, and
//! when snapshots are pushed.

pub mod connection_watch;
pub mod encoder;
pub mod handshake;
pub mod interpreter;
pub mod scanner;
pub mod session;
pub mod wire;

pub use connection_watch::{ConnectionWatchConfig, ConnectionWatchState, ConnectionWatcher};
pub use encoder::{LiveOverrides, SnapshotEncoder};
pub use handshake::{HandshakeMode, HandshakeNegotiator};
pub use interpreter::{CommandInterpreter, Interpretation, PendantAction};
pub use scanner::{ClaimedPort, PortScanner};
pub use session::{SessionHandle, SessionState, SessionSupervisor};
pub use wire::{CompactFrame, LcdFrame, PeerMessage, SyncFrame, WireFormat};

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Reply line the compact pendant expects after `NANO`
pub const PING_REPLY: &str = "UGS\n";

/// Wire protocol variants found in the field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProtocolVariant {
    /// Binary `SYNC` frame, active handshake, pushes after every key
    #[default]
    Sync,
    /// Compact binary frame, active handshake, `NANO` keep-alive
    Compact,
    /// 20x4 text display, passive handshake
    Lcd,
}

impl fmt::Display for ProtocolVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProtocolVariant::Sync => write!(f, "sync"),
            ProtocolVariant::Compact => write!(f, "compact"),
            ProtocolVariant::Lcd => write!(f, "lcd"),
        }
    }
}

impl std::str::FromStr for ProtocolVariant {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "sync" => Ok(ProtocolVariant::Sync),
            "compact" => Ok(ProtocolVariant::Compact),
            "lcd" => Ok(ProtocolVariant::Lcd),
            other => Err(format!("unknown protocol variant: {}", other)),
        }
    }
}

/// Which received lines count as liveness signals
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LivenessPolicy {
    /// Only the variant's liveness tokens
    TokensOnly,
    /// Every received line
    AnyLine,
}

/// Everything that differs between protocol variants
#[derive(Clone)]
pub struct ProtocolProfile {
    /// Variant this profile describes
    pub variant: ProtocolVariant,
    /// Serial baud rate
    pub baud_rate: u32,
    /// Identity check run on each candidate port
    pub handshake: HandshakeMode,
    /// Snapshot encoding and control vocabulary
    pub wire: Arc<dyn WireFormat>,
    /// Liveness rule
    pub liveness: LivenessPolicy,
    /// Line written back on a ping
    pub ping_reply: Option<&'static str>,
    /// Delay after writing the ping reply
    pub reply_settle: Duration,
    /// Push a snapshot after every valid key
    pub push_after_key: bool,
    /// Push a snapshot on request tokens
    pub push_on_request: bool,
    /// Push a snapshot right after connecting
    pub push_on_connect: bool,
    /// Push a snapshot on every machine event
    pub push_on_event: bool,
    /// Delay after a peer-triggered push
    pub pacing_delay: Duration,
    /// Liveness timeout
    pub link_timeout: Duration,
    /// Connected poll tick
    pub poll_interval: Duration,
    /// Delay between failed discovery passes
    pub rescan_delay: Duration,
}

impl fmt::Debug for ProtocolProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProtocolProfile")
            .field("variant", &self.variant)
            .field("baud_rate", &self.baud_rate)
            .field("handshake", &self.handshake)
            .field("wire", &self.wire.name())
            .field("liveness", &self.liveness)
            .field("link_timeout", &self.link_timeout)
            .finish_non_exhaustive()
    }
}

impl ProtocolProfile {
    fn base(variant: ProtocolVariant, baud_rate: u32, handshake: HandshakeMode, wire: Arc<dyn WireFormat>) -> Self {
        Self {
            variant,
            baud_rate,
            handshake,
            wire,
            liveness: LivenessPolicy::TokensOnly,
            ping_reply: None,
            reply_settle: Duration::ZERO,
            push_after_key: false,
            push_on_request: false,
            push_on_connect: false,
            push_on_event: false,
            pacing_delay: Duration::ZERO,
            link_timeout: Duration::from_millis(10_000),
            poll_interval: Duration::from_millis(10),
            rescan_delay: Duration::from_millis(1000),
        }
    }

    /// Binary `SYNC` pendant at 9600 baud
    pub fn sync(include_live_feed: bool) -> Self {
        Self {
            push_after_key: true,
            push_on_request: true,
            pacing_delay: Duration::from_millis(30),
            ..Self::base(
                ProtocolVariant::Sync,
                9600,
                HandshakeMode::active(),
                Arc::new(SyncFrame::new(include_live_feed)),
            )
        }
    }

    /// Compact binary pendant at 9600 baud
    pub fn compact() -> Self {
        Self {
            ping_reply: Some(PING_REPLY),
            reply_settle: Duration::from_millis(100),
            push_on_request: true,
            ..Self::base(
                ProtocolVariant::Compact,
                9600,
                HandshakeMode::active(),
                Arc::new(CompactFrame),
            )
        }
    }

    /// 20x4 LCD display at 115200 baud
    pub fn lcd() -> Self {
        Self {
            liveness: LivenessPolicy::AnyLine,
            push_on_connect: true,
            push_on_event: true,
            ..Self::base(
                ProtocolVariant::Lcd,
                115_200,
                HandshakeMode::passive(),
                Arc::new(LcdFrame),
            )
        }
    }

    /// Default profile for a variant
    pub fn for_variant(variant: ProtocolVariant, include_live_feed: bool) -> Self {
        match variant {
            ProtocolVariant::Sync => Self::sync(include_live_feed),
            ProtocolVariant::Compact => Self::compact(),
            ProtocolVariant::Lcd => Self::lcd(),
        }
    }

    /// Override the baud rate
    pub fn with_baud_rate(mut self, baud_rate: u32) -> Self {
        self.baud_rate = baud_rate;
        self
    }

    /// Override the handshake window
    pub fn with_handshake_window(mut self, window: Duration) -> Self {
        self.handshake = self.handshake.with_window(window);
        self
    }

    /// Override the liveness timeout
    pub fn with_link_timeout(mut self, timeout: Duration) -> Self {
        self.link_timeout = timeout;
        self
    }

    /// Override the connected poll tick
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Override the delay between discovery passes
    pub fn with_rescan_delay(mut self, delay: Duration) -> Self {
        self.rescan_delay = delay;
        self
    }

    /// Check if `message` refreshes the liveness clock
    pub fn counts_as_liveness(&self, message: Option<&PeerMessage>) -> bool {
        match self.liveness {
            LivenessPolicy::AnyLine => true,
            LivenessPolicy::TokensOnly => message.is_some_and(PeerMessage::is_liveness),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_variant_parse() {
        assert_eq!("LCD".parse::<ProtocolVariant>(), Ok(ProtocolVariant::Lcd));
        assert_eq!("compact".parse::<ProtocolVariant>(), Ok(ProtocolVariant::Compact));
        assert!("modbus".parse::<ProtocolVariant>().is_err());
        assert_eq!(ProtocolVariant::Sync.to_string(), "sync");
    }

    #[test]
    fn test_profiles() {
        let sync = ProtocolProfile::sync(true);
        assert_eq!(sync.baud_rate, 9600);
        assert_eq!(sync.wire.frame_len(), 44);
        assert!(sync.push_after_key);
        assert_eq!(sync.pacing_delay, Duration::from_millis(30));

        let compact = ProtocolProfile::compact();
        assert_eq!(compact.ping_reply, Some("UGS\n"));
        assert_eq!(compact.wire.frame_len(), 29);
        assert!(!compact.push_after_key);

        let lcd = ProtocolProfile::lcd();
        assert_eq!(lcd.baud_rate, 115_200);
        assert!(matches!(lcd.handshake, HandshakeMode::Passive { .. }));
        assert!(lcd.push_on_event);
        assert_eq!(lcd.link_timeout, Duration::from_secs(10));
    }

    #[test]
    fn test_liveness_policy() {
        let sync = ProtocolProfile::sync(false);
        assert!(sync.counts_as_liveness(Some(&PeerMessage::Request)));
        assert!(!sync.counts_as_liveness(Some(&PeerMessage::Key(3))));
        assert!(!sync.counts_as_liveness(None));

        let lcd = ProtocolProfile::lcd();
        assert!(lcd.counts_as_liveness(None));
        assert!(lcd.counts_as_liveness(Some(&PeerMessage::Key(3))));
    }
}
