//! Cluster Event Encoder
//!
//! Fixed binary layouts for the two consensus events. All integers are
//! little-endian and every encoding starts at offset 0 of the caller's buffer.
//!
//! Election state change:
//! - 4 bytes: name length (u32)
//! - N bytes: ASCII state name
//! - 8 bytes: timestamp in ms (i64)
//!
//! Leadership term change (40 bytes):
//! - 8 bytes each: log leadership term id, log position,
//!   leadership term id, max log position (i64)
//! - 4 bytes each: leader member id, log session id (i32)

use byteorder::{ByteOrder, LittleEndian};

use crate::error::{Error, Result};
use crate::term::LeadershipTerm;

const LONG_SIZE: usize = 8;
const INT_SIZE: usize = 4;

/// Encoded size of a leadership term change
pub const LEADERSHIP_TERM_CHANGE_LENGTH: usize = 4 * LONG_SIZE + 2 * INT_SIZE;

/// Encoded size of an election state change for a given name
pub fn election_state_change_length(state_name: &str) -> usize {
    INT_SIZE + state_name.len() + LONG_SIZE
}

fn check_capacity(buffer: &[u8], required: usize) -> Result<()> {
    if buffer.len() < required {
        return Err(Error::BufferTooSmall {
            required,
            capacity: buffer.len(),
        });
    }
    Ok(())
}

/// Encode an election state change, returning the bytes written.
///
/// Non-ASCII characters are written as `?`.
pub fn encode_election_state_change(buffer: &mut [u8], state_name: &str, now_ms: i64) -> Result<usize> {
    let required = election_state_change_length(state_name);
    check_capacity(buffer, required)?;

    let name = state_name.as_bytes();
    LittleEndian::write_u32(&mut buffer[0..INT_SIZE], name.len() as u32);

    let timestamp_offset = INT_SIZE + name.len();
    for (dst, &b) in buffer[INT_SIZE..timestamp_offset].iter_mut().zip(name) {
        *dst = if b.is_ascii() { b } else { b'?' };
    }

    LittleEndian::write_i64(&mut buffer[timestamp_offset..required], now_ms);
    Ok(required)
}

/// Encode a leadership term change, returning the bytes written (always 40)
pub fn encode_leadership_term_change(
    buffer: &mut [u8],
    log_leadership_term_id: i64,
    log_position: i64,
    leadership_term_id: i64,
    max_log_position: i64,
    leader_member_id: i32,
    log_session_id: i32,
) -> Result<usize> {
    check_capacity(buffer, LEADERSHIP_TERM_CHANGE_LENGTH)?;

    let mut offset = 0;
    for value in [log_leadership_term_id, log_position, leadership_term_id, max_log_position] {
        LittleEndian::write_i64(&mut buffer[offset..offset + LONG_SIZE], value);
        offset += LONG_SIZE;
    }
    for value in [leader_member_id, log_session_id] {
        LittleEndian::write_i32(&mut buffer[offset..offset + INT_SIZE], value);
        offset += INT_SIZE;
    }

    Ok(offset)
}

/// Encode a finalized term record
pub fn encode_leadership_term(buffer: &mut [u8], term: &LeadershipTerm) -> Result<usize> {
    encode_leadership_term_change(
        buffer,
        term.log_leadership_term_id(),
        term.log_position(),
        term.leadership_term_id(),
        term.max_log_position(),
        term.leader_member_id(),
        term.log_session_id(),
    )
}

/// Decoded election state change
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElectionStateChangeEvent {
    pub state_name: String,
    pub timestamp_ms: i64,
}

/// Decoded leadership term change.
///
/// Decoding does not re-check the term invariants: the trail may hold
/// records written by another version.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LeadershipTermChangeEvent {
    pub log_leadership_term_id: i64,
    pub log_position: i64,
    pub leadership_term_id: i64,
    pub max_log_position: i64,
    pub leader_member_id: i32,
    pub log_session_id: i32,
}

/// Decode an election state change, returning the event and bytes consumed
pub fn decode_election_state_change(buffer: &[u8]) -> Result<(ElectionStateChangeEvent, usize)> {
    if buffer.len() < INT_SIZE {
        return Err(Error::Decode("election state change truncated before name length".into()));
    }

    let name_len = LittleEndian::read_u32(&buffer[0..INT_SIZE]) as usize;
    let timestamp_offset = INT_SIZE + name_len;
    let end = timestamp_offset + LONG_SIZE;
    if buffer.len() < end {
        return Err(Error::Decode(format!(
            "election state change needs {} bytes, have {}",
            end,
            buffer.len()
        )));
    }

    let name = &buffer[INT_SIZE..timestamp_offset];
    if !name.is_ascii() {
        return Err(Error::Decode("state name is not ASCII".into()));
    }

    let event = ElectionStateChangeEvent {
        // ASCII is valid UTF-8
        state_name: String::from_utf8_lossy(name).into_owned(),
        timestamp_ms: LittleEndian::read_i64(&buffer[timestamp_offset..end]),
    };
    Ok((event, end))
}

/// Decode a leadership term change
pub fn decode_leadership_term_change(buffer: &[u8]) -> Result<LeadershipTermChangeEvent> {
    if buffer.len() < LEADERSHIP_TERM_CHANGE_LENGTH {
        return Err(Error::Decode(format!(
            "leadership term change needs {} bytes, have {}",
            LEADERSHIP_TERM_CHANGE_LENGTH,
            buffer.len()
        )));
    }

    Ok(LeadershipTermChangeEvent {
        log_leadership_term_id: LittleEndian::read_i64(&buffer[0..8]),
        log_position: LittleEndian::read_i64(&buffer[8..16]),
        leadership_term_id: LittleEndian::read_i64(&buffer[16..24]),
        max_log_position: LittleEndian::read_i64(&buffer[24..32]),
        leader_member_id: LittleEndian::read_i32(&buffer[32..36]),
        log_session_id: LittleEndian::read_i32(&buffer[36..40]),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::election::ElectionState;

    #[test]
    fn test_election_state_change_layout() {
        let mut buffer = [0u8; 64];
        let written = encode_election_state_change(&mut buffer, "CANVASS", 1_700_000_000_123).unwrap();

        assert_eq!(written, 4 + 7 + 8);
        assert_eq!(&buffer[0..4], &7u32.to_le_bytes());
        assert_eq!(&buffer[4..11], b"CANVASS");
        assert_eq!(&buffer[11..19], &1_700_000_000_123i64.to_le_bytes());
    }

    #[test]
    fn test_election_state_change_decodes() {
        let mut buffer = [0u8; 64];
        let state = ElectionState::FollowerCatchup;
        let written = encode_election_state_change(&mut buffer, state.name(), 42).unwrap();

        let (event, consumed) = decode_election_state_change(&buffer).unwrap();
        assert_eq!(consumed, written);
        assert_eq!(ElectionState::from_name(&event.state_name), Some(state));
        assert_eq!(event.timestamp_ms, 42);
    }

    #[test]
    fn test_non_ascii_name_is_replaced() {
        let mut buffer = [0u8; 32];
        let written = encode_election_state_change(&mut buffer, "Ä", 1).unwrap();
        // Two UTF-8 bytes, each replaced
        assert_eq!(written, 4 + 2 + 8);
        assert_eq!(&buffer[4..6], b"??");
    }

    #[test]
    fn test_leadership_term_change_layout() {
        let mut buffer = [0xffu8; 44];
        let written = encode_leadership_term_change(&mut buffer, 5, 1000, 6, 1200, 3, 42).unwrap();

        assert_eq!(written, 40);
        assert_eq!(&buffer[0..8], &5i64.to_le_bytes());
        assert_eq!(&buffer[8..16], &1000i64.to_le_bytes());
        assert_eq!(&buffer[16..24], &6i64.to_le_bytes());
        assert_eq!(&buffer[24..32], &1200i64.to_le_bytes());
        assert_eq!(&buffer[32..36], &3i32.to_le_bytes());
        assert_eq!(&buffer[36..40], &42i32.to_le_bytes());
        // Nothing past the record is touched
        assert_eq!(&buffer[40..], &[0xffu8; 4]);
    }

    #[test]
    fn test_leadership_term_round_trip() {
        let term = LeadershipTerm::finalize(-1, 0, i64::MAX, 0, i32::MIN, -7).unwrap();
        let mut buffer = [0u8; LEADERSHIP_TERM_CHANGE_LENGTH];
        encode_leadership_term(&mut buffer, &term).unwrap();

        let event = decode_leadership_term_change(&buffer).unwrap();
        assert_eq!(event.log_leadership_term_id, -1);
        assert_eq!(event.log_position, 0);
        assert_eq!(event.leadership_term_id, i64::MAX);
        assert_eq!(event.max_log_position, 0);
        assert_eq!(event.leader_member_id, i32::MIN);
        assert_eq!(event.log_session_id, -7);
    }

    #[test]
    fn test_small_buffers_are_reported() {
        let mut buffer = [0u8; 10];
        assert!(matches!(
            encode_leadership_term_change(&mut buffer, 1, 2, 3, 4, 5, 6),
            Err(Error::BufferTooSmall { required: 40, capacity: 10 })
        ));
        assert!(matches!(
            encode_election_state_change(&mut buffer, "CANVASS", 1),
            Err(Error::BufferTooSmall { required: 19, capacity: 10 })
        ));
    }

    #[test]
    fn test_truncated_input_fails_to_decode() {
        let mut buffer = [0u8; 64];
        let written = encode_election_state_change(&mut buffer, "INIT", 5).unwrap();
        assert!(decode_election_state_change(&buffer[..written - 1]).is_err());
        assert!(decode_leadership_term_change(&buffer[..39]).is_err());
    }
}
