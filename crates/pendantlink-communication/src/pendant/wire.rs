//! Wire formats spoken with the peer device
//!
//! Three formats exist in the field; a deployment picks exactly one:
//! - [`SyncFrame`]: `SYNC` + little-endian f32 block (40 or 44 bytes)
//! - [`CompactFrame`]: `SYNC\n` line + 24-byte little-endian f32 block
//! - [`LcdFrame`]: four fixed-width `LCD:<row>:` text rows for a 20x4 display
//!
//! Every format encodes a sanitized copy of the snapshot, so a NaN never
//! reaches the wire.

use crate::communication::framer::trim_line;
use pendantlink_core::MachineSnapshot;

/// Key code the passive pendant sends when no key is pressed
pub const IDLE_KEY_CODE: i32 = -1;

const KEY_PREFIX: &str = "KEY:";

/// Control message decoded from one peer line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PeerMessage {
    /// `KEY:<code>`
    Key(i32),
    /// `KEY:` followed by something that is not an integer
    BadKey(String),
    /// Peer is alive, nothing else requested
    Heartbeat,
    /// Peer asks for a snapshot
    Request,
    /// Peer is alive and expects an acknowledgment line
    Ping,
}

impl PeerMessage {
    /// Check if this message proves the peer is still present
    pub fn is_liveness(&self) -> bool {
        matches!(
            self,
            PeerMessage::Heartbeat | PeerMessage::Request | PeerMessage::Ping
        )
    }
}

/// Parse a `KEY:<signed-int>` line
pub fn parse_key(line: &str) -> Option<PeerMessage> {
    let rest = line.strip_prefix(KEY_PREFIX)?;
    match trim_line(rest).parse::<i32>() {
        Ok(code) => Some(PeerMessage::Key(code)),
        Err(_) => Some(PeerMessage::BadKey(line.to_string())),
    }
}

/// A pluggable snapshot encoding and control-line vocabulary
pub trait WireFormat: Send + Sync {
    /// Short identifier used in logs
    fn name(&self) -> &'static str;

    /// Fixed size of every encoded frame
    fn frame_len(&self) -> usize;

    /// Serialize a snapshot
    fn encode(&self, snapshot: &MachineSnapshot) -> Vec<u8>;

    /// Decode a control line; `None` for lines this format ignores
    fn decode_control(&self, line: &str) -> Option<PeerMessage>;
}

fn put_f32(buf: &mut Vec<u8>, value: f32) {
    buf.extend_from_slice(&value.to_le_bytes());
}

/// `SYNC` marker followed by nine or ten little-endian f32 fields
///
/// Field order: X, Y, Z, A, status code, feed rate, sent rows, total rows,
/// step size, and optionally the live feed rate.
#[derive(Debug, Clone, Copy)]
pub struct SyncFrame {
    include_live_feed: bool,
}

impl SyncFrame {
    /// Sync marker preceding the payload
    pub const MARKER: &'static [u8; 4] = b"SYNC";

    /// Create the format; `include_live_feed` appends the tenth field
    pub fn new(include_live_feed: bool) -> Self {
        Self { include_live_feed }
    }

    fn field_count(&self) -> usize {
        if self.include_live_feed {
            10
        } else {
            9
        }
    }
}

impl WireFormat for SyncFrame {
    fn name(&self) -> &'static str {
        "sync"
    }

    fn frame_len(&self) -> usize {
        Self::MARKER.len() + 4 * self.field_count()
    }

    fn encode(&self, snapshot: &MachineSnapshot) -> Vec<u8> {
        let s = snapshot.sanitized();
        let mut buf = Vec::with_capacity(self.frame_len());
        buf.extend_from_slice(Self::MARKER);
        put_f32(&mut buf, s.x);
        put_f32(&mut buf, s.y);
        put_f32(&mut buf, s.z);
        put_f32(&mut buf, s.a);
        put_f32(&mut buf, s.status.code());
        put_f32(&mut buf, s.feed_rate);
        put_f32(&mut buf, s.sent_rows as f32);
        put_f32(&mut buf, s.total_rows as f32);
        put_f32(&mut buf, s.step_size);
        if self.include_live_feed {
            put_f32(&mut buf, s.live_feed_rate.unwrap_or(0.0));
        }
        buf
    }

    fn decode_control(&self, line: &str) -> Option<PeerMessage> {
        match line {
            "REQ" => Some(PeerMessage::Request),
            _ => parse_key(line),
        }
    }
}

/// `SYNC\n` marker line followed by six little-endian f32 fields
///
/// Field order: X, Y, Z, A, feed rate, step size.
#[derive(Debug, Clone, Copy, Default)]
pub struct CompactFrame;

impl CompactFrame {
    /// Marker line preceding the payload
    pub const MARKER: &'static [u8; 5] = b"SYNC\n";

    /// Payload size
    pub const PAYLOAD_LEN: usize = 24;
}

impl WireFormat for CompactFrame {
    fn name(&self) -> &'static str {
        "compact"
    }

    fn frame_len(&self) -> usize {
        Self::MARKER.len() + Self::PAYLOAD_LEN
    }

    fn encode(&self, snapshot: &MachineSnapshot) -> Vec<u8> {
        let s = snapshot.sanitized();
        let mut buf = Vec::with_capacity(self.frame_len());
        buf.extend_from_slice(Self::MARKER);
        put_f32(&mut buf, s.x);
        put_f32(&mut buf, s.y);
        put_f32(&mut buf, s.z);
        put_f32(&mut buf, s.a);
        put_f32(&mut buf, s.feed_rate);
        put_f32(&mut buf, s.step_size);
        buf
    }

    fn decode_control(&self, line: &str) -> Option<PeerMessage> {
        match line {
            "NANO" => Some(PeerMessage::Ping),
            "REQ" => Some(PeerMessage::Request),
            _ => parse_key(line),
        }
    }
}

/// Four text rows for a 20x4 character display
///
/// ```text
/// LCD:0:<status  ><|X+0.000 >
/// LCD:1:<F<feed> ><|Y+0.000 >
/// LCD:2:<        ><|Z+0.000 >
/// LCD:3:<L<s>/<t>><|A+0.000 >
/// ```
///
/// Rows are separated by `\r` and the block ends with `\n`.
#[derive(Debug, Clone, Copy, Default)]
pub struct LcdFrame;

impl LcdFrame {
    /// Visible characters per row
    pub const ROW_WIDTH: usize = 20;

    /// Number of rows
    pub const ROWS: usize = 4;

    const CELL_WIDTH: usize = 10;

    fn cell(text: &str) -> String {
        format!("{:<width$.width$}", text, width = Self::CELL_WIDTH)
    }

    fn axis(label: char, value: f32) -> String {
        Self::cell(&format!("|{}{:+06.3}", label, value))
    }

    /// The four 20-character rows for a snapshot
    pub fn rows(snapshot: &MachineSnapshot) -> [String; 4] {
        let s = snapshot.sanitized();
        [
            Self::cell(s.status.label()) + &Self::axis('X', s.x),
            Self::cell(&format!("F{:.0}", s.feed_rate)) + &Self::axis('Y', s.y),
            Self::cell("") + &Self::axis('Z', s.z),
            Self::cell(&format!("L{}/{}", s.sent_rows, s.total_rows)) + &Self::axis('A', s.a),
        ]
    }
}

impl WireFormat for LcdFrame {
    fn name(&self) -> &'static str {
        "lcd"
    }

    fn frame_len(&self) -> usize {
        // "LCD:n:" + row + "\r" per row, then "\n"
        Self::ROWS * (6 + Self::ROW_WIDTH + 1) + 1
    }

    fn encode(&self, snapshot: &MachineSnapshot) -> Vec<u8> {
        let mut block = String::with_capacity(self.frame_len());
        for (index, row) in Self::rows(snapshot).iter().enumerate() {
            block.push_str(&format!("LCD:{}:{}\r", index, row));
        }
        block.push('\n');
        block.into_bytes()
    }

    fn decode_control(&self, line: &str) -> Option<PeerMessage> {
        match parse_key(line) {
            Some(PeerMessage::Key(IDLE_KEY_CODE)) => Some(PeerMessage::Heartbeat),
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pendantlink_core::PendantStatus;

    fn sample() -> MachineSnapshot {
        MachineSnapshot::new()
            .with_position(1.5, -2.25, 0.5, 90.0)
            .with_status(PendantStatus::Run)
            .with_feed_rate(500.0)
            .with_rows(12, 340)
            .with_step_size(0.1)
            .with_live(Some(480.0), Some(12000.0))
    }

    #[test]
    fn test_parse_key() {
        assert_eq!(parse_key("KEY:25"), Some(PeerMessage::Key(25)));
        assert_eq!(parse_key("KEY:-1"), Some(PeerMessage::Key(-1)));
        assert_eq!(
            parse_key("KEY:abc"),
            Some(PeerMessage::BadKey("KEY:abc".to_string()))
        );
        assert_eq!(parse_key("KEY:"), Some(PeerMessage::BadKey("KEY:".to_string())));
        assert_eq!(parse_key("HELLO"), None);
    }

    #[test]
    fn test_sync_frame_layout() {
        let frame = SyncFrame::new(true).encode(&sample());
        assert_eq!(frame.len(), 44);
        assert_eq!(&frame[..4], b"SYNC");
        assert_eq!(&frame[4..8], &1.5f32.to_le_bytes());
        assert_eq!(&frame[20..24], &2.0f32.to_le_bytes());
        assert_eq!(&frame[40..44], &480.0f32.to_le_bytes());

        let short = SyncFrame::new(false).encode(&sample());
        assert_eq!(short.len(), 40);
        assert_eq!(short.len(), SyncFrame::new(false).frame_len());
    }

    #[test]
    fn test_sync_frame_without_live_feed_sends_zero() {
        let snap = sample().with_live(None, None);
        let frame = SyncFrame::new(true).encode(&snap);
        assert_eq!(&frame[40..44], &0.0f32.to_le_bytes());
    }

    #[test]
    fn test_compact_frame_layout() {
        let frame = CompactFrame.encode(&sample());
        assert_eq!(frame.len(), 29);
        assert_eq!(&frame[..5], b"SYNC\n");
        assert_eq!(&frame[21..25], &500.0f32.to_le_bytes());
        assert_eq!(&frame[25..29], &0.1f32.to_le_bytes());
    }

    #[test]
    fn test_lcd_rows() {
        let rows = LcdFrame::rows(&sample());
        assert_eq!(rows[0], "RUN       |X+1.500  ");
        assert_eq!(rows[1], "F500      |Y-2.250  ");
        assert_eq!(rows[2], "          |Z+0.500  ");
        assert_eq!(rows[3], "L12/340   |A+90.000 ");
        for row in &rows {
            assert_eq!(row.len(), LcdFrame::ROW_WIDTH);
        }
    }

    #[test]
    fn test_lcd_frame_is_fixed_length() {
        let frame = LcdFrame.encode(&sample());
        assert_eq!(frame.len(), LcdFrame.frame_len());
        let text = String::from_utf8(frame).unwrap();
        assert!(text.starts_with("LCD:0:RUN"));
        assert!(text.ends_with("\r\n"));

        let huge = sample().with_position(-12345.678, 0.0, 0.0, 0.0);
        assert_eq!(LcdFrame.encode(&huge).len(), LcdFrame.frame_len());
    }

    #[test]
    fn test_decode_vocabularies() {
        assert_eq!(SyncFrame::new(true).decode_control("REQ"), Some(PeerMessage::Request));
        assert_eq!(SyncFrame::new(true).decode_control("NANO"), None);
        assert_eq!(CompactFrame.decode_control("NANO"), Some(PeerMessage::Ping));
        assert_eq!(LcdFrame.decode_control("KEY:-1"), Some(PeerMessage::Heartbeat));
        assert_eq!(LcdFrame.decode_control("KEY:3"), Some(PeerMessage::Key(3)));
        assert_eq!(LcdFrame.decode_control("REQ"), None);
    }
}
