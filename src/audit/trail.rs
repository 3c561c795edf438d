//! Audit Log
//!
//! Appends encoded consensus events to a writer as checksummed frames and
//! reads them back for inspection.

use std::io::Write;

use byteorder::{ByteOrder, LittleEndian};
use serde::Serialize;

use crate::election::{ElectionObserver, StateChange};
use crate::error::{Error, Result};
use crate::term::LeadershipTerm;
use super::encoder::{
    decode_election_state_change, decode_leadership_term_change, election_state_change_length,
    encode_election_state_change, encode_leadership_term, LEADERSHIP_TERM_CHANGE_LENGTH,
};

/// Current audit frame format version
pub const FORMAT_VERSION: u16 = 1;

/// Event codes carried in the frame header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum ClusterEventCode {
    ElectionStateChange = 1,
    NewLeadershipTerm = 2,
}

impl ClusterEventCode {
    pub fn from_u16(code: u16) -> Option<Self> {
        match code {
            1 => Some(ClusterEventCode::ElectionStateChange),
            2 => Some(ClusterEventCode::NewLeadershipTerm),
            _ => None,
        }
    }
}

/// Frame header preceding each audit payload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuditFrameHeader {
    pub event_code: u16,
    pub version: u16,
    /// Payload length
    pub length: u32,
    /// CRC32 of the payload
    pub checksum: u32,
}

impl AuditFrameHeader {
    /// Header size in bytes
    pub const SIZE: usize = 12;

    pub fn new(event_code: ClusterEventCode, payload: &[u8]) -> Self {
        Self {
            event_code: event_code as u16,
            version: FORMAT_VERSION,
            length: payload.len() as u32,
            checksum: crc32fast::hash(payload),
        }
    }

    pub fn to_bytes(&self) -> [u8; Self::SIZE] {
        let mut bytes = [0u8; Self::SIZE];
        LittleEndian::write_u16(&mut bytes[0..2], self.event_code);
        LittleEndian::write_u16(&mut bytes[2..4], self.version);
        LittleEndian::write_u32(&mut bytes[4..8], self.length);
        LittleEndian::write_u32(&mut bytes[8..12], self.checksum);
        bytes
    }

    pub fn from_bytes(bytes: &[u8; Self::SIZE]) -> Self {
        Self {
            event_code: LittleEndian::read_u16(&bytes[0..2]),
            version: LittleEndian::read_u16(&bytes[2..4]),
            length: LittleEndian::read_u32(&bytes[4..8]),
            checksum: LittleEndian::read_u32(&bytes[8..12]),
        }
    }
}

/// Election observer writing every event to an audit trail.
///
/// The log stops at the first I/O error so no frame is ever appended after a
/// partially written one. Later events are counted as dropped.
pub struct AuditLog<W: Write + Send> {
    writer: W,
    /// Reused frame buffer: header followed by the encoded payload
    scratch: Vec<u8>,
    /// Frames written successfully
    events_written: u64,
    /// Events that never reached the writer
    events_dropped: u64,
    /// Set after a write failure
    failed: bool,
}

impl<W: Write + Send> AuditLog<W> {
    /// Create an audit log with an initial encoding buffer of `buffer_capacity` bytes
    pub fn new(writer: W, buffer_capacity: usize) -> Self {
        Self {
            writer,
            scratch: vec![0u8; AuditFrameHeader::SIZE + buffer_capacity.max(LEADERSHIP_TERM_CHANGE_LENGTH)],
            events_written: 0,
            events_dropped: 0,
            failed: false,
        }
    }

    pub fn events_written(&self) -> u64 {
        self.events_written
    }

    pub fn events_dropped(&self) -> u64 {
        self.events_dropped
    }

    /// Whether a write failure has stopped the log
    pub fn is_failed(&self) -> bool {
        self.failed
    }

    pub fn into_inner(self) -> W {
        self.writer
    }

    /// Append an election state change
    pub fn log_election_state_change(&mut self, change: &StateChange) -> Result<()> {
        let name = change.state.name();
        let required = AuditFrameHeader::SIZE + election_state_change_length(name);
        if self.scratch.len() < required {
            self.scratch.resize(required, 0);
        }

        self.append(ClusterEventCode::ElectionStateChange, |buffer| {
            encode_election_state_change(buffer, name, change.timestamp_ms)
        })
    }

    /// Append a new leadership term
    pub fn log_new_leadership_term(&mut self, term: &LeadershipTerm) -> Result<()> {
        self.append(ClusterEventCode::NewLeadershipTerm, |buffer| {
            encode_leadership_term(buffer, term)
        })
    }

    /// Encode a payload behind the header slot and write the whole frame at once
    fn append(&mut self, code: ClusterEventCode, encode: impl FnOnce(&mut [u8]) -> Result<usize>) -> Result<()> {
        if self.failed {
            self.events_dropped += 1;
            return Err(Error::Internal(
                "audit log stopped after an earlier write failure".into(),
            ));
        }

        let length = match encode(&mut self.scratch[AuditFrameHeader::SIZE..]) {
            Ok(length) => length,
            Err(e) => {
                self.events_dropped += 1;
                return Err(e);
            }
        };

        let (header, payload) = self.scratch.split_at_mut(AuditFrameHeader::SIZE);
        header.copy_from_slice(&AuditFrameHeader::new(code, &payload[..length]).to_bytes());

        let frame = &self.scratch[..AuditFrameHeader::SIZE + length];
        if let Err(e) = self.writer.write_all(frame).and_then(|()| self.writer.flush()) {
            self.failed = true;
            self.events_dropped += 1;
            tracing::error!("Audit log write failed, no further events will be written: {}", e);
            return Err(e.into());
        }

        self.events_written += 1;
        Ok(())
    }
}

impl<W: Write + Send> ElectionObserver for AuditLog<W> {
    fn on_state_change(&mut self, change: &StateChange) {
        if let Err(e) = self.log_election_state_change(change) {
            tracing::warn!("Failed to write election state change to audit log: {}", e);
        }
    }

    fn on_new_leadership_term(&mut self, term: &LeadershipTerm) {
        if let Err(e) = self.log_new_leadership_term(term) {
            tracing::warn!("Failed to write leadership term to audit log: {}", e);
        }
    }
}

/// Decoded audit event
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum AuditEvent {
    ElectionStateChange {
        state: String,
        timestamp_ms: i64,
    },
    NewLeadershipTerm {
        log_leadership_term_id: i64,
        log_position: i64,
        leadership_term_id: i64,
        max_log_position: i64,
        leader_member_id: i32,
        log_session_id: i32,
    },
}

impl std::fmt::Display for AuditEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuditEvent::ElectionStateChange { state, timestamp_ms } => {
                let at = chrono::DateTime::<chrono::Utc>::from_timestamp_millis(*timestamp_ms)
                    .map(|t| t.format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string())
                    .unwrap_or_else(|| timestamp_ms.to_string());
                write!(f, "ELECTION_STATE_CHANGE {} at {}", state, at)
            }
            AuditEvent::NewLeadershipTerm {
                log_leadership_term_id,
                log_position,
                leadership_term_id,
                max_log_position,
                leader_member_id,
                log_session_id,
            } => write!(
                f,
                "NEW_LEADERSHIP_TERM logLeadershipTermId={} logPosition={} leadershipTermId={} \
                 maxLogPosition={} leaderMemberId={} logSessionId={}",
                log_leadership_term_id,
                log_position,
                leadership_term_id,
                max_log_position,
                leader_member_id,
                log_session_id
            ),
        }
    }
}

/// Iterator over the frames of an audit trail
pub struct AuditReader<'a> {
    data: &'a [u8],
    offset: usize,
}

impl<'a> AuditReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, offset: 0 }
    }

    fn read_frame(&mut self) -> Result<AuditEvent> {
        let remaining = &self.data[self.offset..];
        if remaining.len() < AuditFrameHeader::SIZE {
            return Err(Error::Decode(format!(
                "truncated frame header at offset {}",
                self.offset
            )));
        }

        let mut header_bytes = [0u8; AuditFrameHeader::SIZE];
        header_bytes.copy_from_slice(&remaining[..AuditFrameHeader::SIZE]);
        let header = AuditFrameHeader::from_bytes(&header_bytes);

        if header.version != FORMAT_VERSION {
            return Err(Error::Decode(format!(
                "unsupported audit format version {}",
                header.version
            )));
        }

        let end = AuditFrameHeader::SIZE + header.length as usize;
        if remaining.len() < end {
            return Err(Error::Decode(format!(
                "truncated frame payload at offset {}",
                self.offset
            )));
        }

        let payload = &remaining[AuditFrameHeader::SIZE..end];
        let actual = crc32fast::hash(payload);
        if actual != header.checksum {
            return Err(Error::ChecksumMismatch {
                expected: header.checksum,
                actual,
            });
        }

        let event = match ClusterEventCode::from_u16(header.event_code) {
            Some(ClusterEventCode::ElectionStateChange) => {
                let (event, _) = decode_election_state_change(payload)?;
                AuditEvent::ElectionStateChange {
                    state: event.state_name,
                    timestamp_ms: event.timestamp_ms,
                }
            }
            Some(ClusterEventCode::NewLeadershipTerm) => {
                let event = decode_leadership_term_change(payload)?;
                AuditEvent::NewLeadershipTerm {
                    log_leadership_term_id: event.log_leadership_term_id,
                    log_position: event.log_position,
                    leadership_term_id: event.leadership_term_id,
                    max_log_position: event.max_log_position,
                    leader_member_id: event.leader_member_id,
                    log_session_id: event.log_session_id,
                }
            }
            None => {
                return Err(Error::Decode(format!(
                    "unknown event code {}",
                    header.event_code
                )))
            }
        };

        self.offset += end;
        Ok(event)
    }
}

impl<'a> Iterator for AuditReader<'a> {
    type Item = Result<AuditEvent>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.offset >= self.data.len() {
            return None;
        }

        match self.read_frame() {
            Ok(event) => Some(Ok(event)),
            Err(e) => {
                // Stop after the first bad frame
                self.offset = self.data.len();
                Some(Err(e))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::election::ElectionState;

    fn change(state: ElectionState, timestamp_ms: i64) -> StateChange {
        StateChange { state, timestamp_ms }
    }

    #[test]
    fn test_frame_header() {
        let header = AuditFrameHeader::new(ClusterEventCode::NewLeadershipTerm, b"payload");
        let restored = AuditFrameHeader::from_bytes(&header.to_bytes());

        assert_eq!(header, restored);
        assert_eq!(restored.event_code, 2);
        assert_eq!(restored.version, FORMAT_VERSION);
        assert_eq!(restored.length, 7);
    }

    #[test]
    fn test_write_and_read_trail() {
        let mut log = AuditLog::new(Vec::new(), 64);
        let term = LeadershipTerm::finalize(5, 1000, 6, 1200, 3, 42).unwrap();

        log.on_state_change(&change(ElectionState::Canvass, 10));
        log.on_state_change(&change(ElectionState::LeaderReplay, 20));
        log.on_new_leadership_term(&term);
        assert_eq!(log.events_written(), 3);

        let bytes = log.into_inner();
        let events: Vec<_> = AuditReader::new(&bytes).collect::<Result<_>>().unwrap();

        assert_eq!(
            events,
            vec![
                AuditEvent::ElectionStateChange { state: "CANVASS".into(), timestamp_ms: 10 },
                AuditEvent::ElectionStateChange { state: "LEADER_REPLAY".into(), timestamp_ms: 20 },
                AuditEvent::NewLeadershipTerm {
                    log_leadership_term_id: 5,
                    log_position: 1000,
                    leadership_term_id: 6,
                    max_log_position: 1200,
                    leader_member_id: 3,
                    log_session_id: 42,
                },
            ]
        );
    }

    #[test]
    fn test_small_scratch_grows() {
        let mut log = AuditLog::new(Vec::new(), 0);
        log.log_election_state_change(&change(ElectionState::FollowerTransition, 1)).unwrap();
        let bytes = log.into_inner();
        assert_eq!(bytes.len(), AuditFrameHeader::SIZE + 4 + "FOLLOWER_TRANSITION".len() + 8);
    }

    #[test]
    fn test_corrupted_frame_detected() {
        let mut log = AuditLog::new(Vec::new(), 64);
        log.on_state_change(&change(ElectionState::Canvass, 10));
        let mut bytes = log.into_inner();
        let last = bytes.len() - 1;
        bytes[last] ^= 0xff;

        let mut reader = AuditReader::new(&bytes);
        assert!(matches!(reader.next(), Some(Err(Error::ChecksumMismatch { .. }))));
        assert!(reader.next().is_none());
    }

    #[test]
    fn test_truncated_trail() {
        let mut log = AuditLog::new(Vec::new(), 64);
        log.on_state_change(&change(ElectionState::Canvass, 10));
        log.on_state_change(&change(ElectionState::Nominate, 11));
        let bytes = log.into_inner();

        let results: Vec<_> = AuditReader::new(&bytes[..bytes.len() - 3]).collect();
        assert_eq!(results.len(), 2);
        assert!(results[0].is_ok());
        assert!(matches!(results[1], Err(Error::Decode(_))));
    }

    /// Accepts `budget` bytes, then fails every write
    struct FailingWriter {
        written: Vec<u8>,
        budget: usize,
    }

    impl Write for FailingWriter {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            if self.budget == 0 {
                return Err(std::io::Error::new(std::io::ErrorKind::Other, "disk full"));
            }
            let n = buf.len().min(self.budget);
            self.written.extend_from_slice(&buf[..n]);
            self.budget -= n;
            Ok(n)
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_frame_written_in_one_piece() {
        let mut log = AuditLog::new(Vec::new(), 64);
        log.on_state_change(&change(ElectionState::Canvass, 10));

        let bytes = log.into_inner();
        let mut header = [0u8; AuditFrameHeader::SIZE];
        header.copy_from_slice(&bytes[..AuditFrameHeader::SIZE]);
        let header = AuditFrameHeader::from_bytes(&header);

        assert_eq!(header.event_code, ClusterEventCode::ElectionStateChange as u16);
        assert_eq!(bytes.len(), AuditFrameHeader::SIZE + header.length as usize);
    }

    #[test]
    fn test_stops_after_failed_write() {
        let writer = FailingWriter {
            written: Vec::new(),
            budget: AuditFrameHeader::SIZE + 4,
        };
        let mut log = AuditLog::new(writer, 64);

        assert!(log.log_election_state_change(&change(ElectionState::Canvass, 10)).is_err());
        assert!(log.is_failed());

        // Refused without touching the writer
        log.on_state_change(&change(ElectionState::Nominate, 11));
        let term = LeadershipTerm::finalize(5, 1000, 6, 1200, 3, 42).unwrap();
        assert!(log.log_new_leadership_term(&term).is_err());

        assert_eq!(log.events_written(), 0);
        assert_eq!(log.events_dropped(), 3);
        assert_eq!(log.into_inner().written.len(), AuditFrameHeader::SIZE + 4);
    }

    #[test]
    fn test_good_prefix_readable_after_failure() {
        let writer = FailingWriter {
            written: Vec::new(),
            budget: 50,
        };
        let mut log = AuditLog::new(writer, 64);

        // 12 + 4 + 7 + 8 = 31 bytes fits, the second frame is torn
        log.on_state_change(&change(ElectionState::Canvass, 10));
        log.on_state_change(&change(ElectionState::Nominate, 11));
        log.on_state_change(&change(ElectionState::CandidateBallot, 12));
        assert_eq!(log.events_written(), 1);
        assert_eq!(log.events_dropped(), 2);

        let bytes = log.into_inner().written;
        let results: Vec<_> = AuditReader::new(&bytes).collect();
        assert_eq!(results.len(), 2);
        assert_eq!(
            results[0].as_ref().unwrap(),
            &AuditEvent::ElectionStateChange { state: "CANVASS".into(), timestamp_ms: 10 }
        );
        assert!(results[1].is_err());
    }

    #[test]
    fn test_display() {
        let event = AuditEvent::ElectionStateChange { state: "CANVASS".into(), timestamp_ms: 0 };
        assert_eq!(event.to_string(), "ELECTION_STATE_CHANGE CANVASS at 1970-01-01T00:00:00.000Z");
    }
}
