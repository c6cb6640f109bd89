//! Telemetry record layout and decoding.
//!
//! The simulation publishes one fixed-size, versioned, little-endian record
//! into shared memory and rewrites it in place at high frequency. This module
//! owns the layout of that record and the single boundary function that turns
//! a raw byte buffer into an owned [`TelemetrySnapshot`]. Nothing outside this
//! module knows byte offsets.
//!
//! ## Record layout
//!
//! ```text
//! offset    0  u32  format version
//! offset    4  u32  sequence number (odd while the producer is mid-write)
//! offset    8  u32  session state
//! offset   12  i32  viewed participant index (-1 when none)
//! offset   16  i32  participant count
//! offset   20  u32  race states[64]
//! offset  276  participant entries[64]: u32 active, u8 name[64], u32 position
//! offset 4884  u8   car names[64][64]
//! offset 8980  u8   car class names[64][64]
//! offset 13076 u8   track location[64]
//! offset 13140 u8   track variation[64]
//! offset 13204 u8   translated track location[64]
//! offset 13268 u8   translated track variation[64]
//! ```

use crate::{Error, Result};
use std::io::Read;

/// Record format version this consumer was built against.
pub const SHARED_MEMORY_VERSION: u32 = 14;

/// Maximum number of participant slots stored in the record.
pub const MAX_PARTICIPANTS: usize = 64;

/// Length of every fixed string field, including the NUL padding.
pub const STRING_LEN: usize = 64;

/// Byte offset of the sequence number within the record.
pub const SEQUENCE_OFFSET: usize = 4;

/// Total size of the record in bytes.
pub const RECORD_SIZE: usize = 20
    + MAX_PARTICIPANTS * 4
    + MAX_PARTICIPANTS * (4 + STRING_LEN + 4)
    + MAX_PARTICIPANTS * STRING_LEN * 2
    + STRING_LEN * 4;

/// Meta-phase of the simulated activity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Invalid,
    Practice,
    Test,
    Qualify,
    FormationLap,
    Race,
    TimeAttack,
    Unknown,
}

impl From<u32> for SessionState {
    fn from(raw: u32) -> Self {
        match raw {
            0 => SessionState::Invalid,
            1 => SessionState::Practice,
            2 => SessionState::Test,
            3 => SessionState::Qualify,
            4 => SessionState::FormationLap,
            5 => SessionState::Race,
            6 => SessionState::TimeAttack,
            _ => SessionState::Unknown,
        }
    }
}

impl SessionState {
    /// Display name, as it appears in exported artifacts.
    pub fn name(&self) -> &'static str {
        match self {
            SessionState::Invalid => "Invalid",
            SessionState::Practice => "Practice",
            SessionState::Test => "Test",
            SessionState::Qualify => "Qualify",
            SessionState::FormationLap => "Formation Lap",
            SessionState::Race => "Race",
            SessionState::TimeAttack => "Time Attack",
            SessionState::Unknown => "Unknown",
        }
    }
}

/// Per-participant lifecycle status within a race.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RaceState {
    Invalid,
    NotStarted,
    Racing,
    Finished,
    Disqualified,
    Retired,
    Dnf,
    Unknown,
}

impl From<u32> for RaceState {
    fn from(raw: u32) -> Self {
        match raw {
            0 => RaceState::Invalid,
            1 => RaceState::NotStarted,
            2 => RaceState::Racing,
            3 => RaceState::Finished,
            4 => RaceState::Disqualified,
            5 => RaceState::Retired,
            6 => RaceState::Dnf,
            _ => RaceState::Unknown,
        }
    }
}

impl RaceState {
    /// Whether the participant has reached a terminal state for this race.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            RaceState::Finished | RaceState::Disqualified | RaceState::Retired | RaceState::Dnf
        )
    }

    /// Display name for operator logging.
    pub fn name(&self) -> &'static str {
        match self {
            RaceState::Invalid => "Invalid",
            RaceState::NotStarted => "Not Started",
            RaceState::Racing => "Racing",
            RaceState::Finished => "Finished",
            RaceState::Disqualified => "Disqualified",
            RaceState::Retired => "Retired",
            RaceState::Dnf => "DNF",
            RaceState::Unknown => "Unknown",
        }
    }
}

/// One participant slot of the record.
#[derive(Debug, Clone)]
pub struct ParticipantEntry {
    pub is_active: bool,
    pub name: String,
    pub race_position: u32,
}

/// One consistent, owned copy of the telemetry record.
#[derive(Debug, Clone)]
pub struct TelemetrySnapshot {
    pub version: u32,
    pub sequence_number: u32,
    pub session_state: SessionState,
    pub viewed_participant_index: i32,
    pub num_participants: i32,
    pub race_states: Vec<RaceState>,
    pub participants: Vec<ParticipantEntry>,
    pub car_names: Vec<String>,
    pub car_class_names: Vec<String>,
    pub track_location: String,
    pub track_variation: String,
    pub translated_track_location: String,
    pub translated_track_variation: String,
}

impl TelemetrySnapshot {
    /// Decode an owned snapshot from a raw record buffer.
    ///
    /// The buffer must be a complete, consistent copy of the record; tearing
    /// is the caller's concern (see the snapshot reader). This is the only
    /// place in the crate that interprets record bytes.
    pub fn decode(buf: &[u8]) -> Result<Self> {
        if buf.len() < RECORD_SIZE {
            return Err(Error::parse_error(
                "telemetry record",
                format!("buffer is {} bytes, record needs {}", buf.len(), RECORD_SIZE),
            ));
        }

        let mut cursor = std::io::Cursor::new(buf);

        let version = read_u32(&mut cursor)?;
        let sequence_number = read_u32(&mut cursor)?;
        let session_state = SessionState::from(read_u32(&mut cursor)?);
        let viewed_participant_index = read_i32(&mut cursor)?;
        let num_participants = read_i32(&mut cursor)?;

        let mut race_states = Vec::with_capacity(MAX_PARTICIPANTS);
        for _ in 0..MAX_PARTICIPANTS {
            race_states.push(RaceState::from(read_u32(&mut cursor)?));
        }

        let mut participants = Vec::with_capacity(MAX_PARTICIPANTS);
        for _ in 0..MAX_PARTICIPANTS {
            let is_active = read_u32(&mut cursor)? != 0;
            let name = read_string(&mut cursor)?;
            let race_position = read_u32(&mut cursor)?;
            participants.push(ParticipantEntry { is_active, name, race_position });
        }

        let mut car_names = Vec::with_capacity(MAX_PARTICIPANTS);
        for _ in 0..MAX_PARTICIPANTS {
            car_names.push(read_string(&mut cursor)?);
        }

        let mut car_class_names = Vec::with_capacity(MAX_PARTICIPANTS);
        for _ in 0..MAX_PARTICIPANTS {
            car_class_names.push(read_string(&mut cursor)?);
        }

        let track_location = read_string(&mut cursor)?;
        let track_variation = read_string(&mut cursor)?;
        let translated_track_location = read_string(&mut cursor)?;
        let translated_track_variation = read_string(&mut cursor)?;

        Ok(Self {
            version,
            sequence_number,
            session_state,
            viewed_participant_index,
            num_participants,
            race_states,
            participants,
            car_names,
            car_class_names,
            track_location,
            track_variation,
            translated_track_location,
            translated_track_variation,
        })
    }

    /// Participant count clamped to the stored slot range.
    pub fn participant_count(&self) -> usize {
        self.num_participants.clamp(0, MAX_PARTICIPANTS as i32) as usize
    }

    /// Race state of the viewed participant, when the index is in range.
    ///
    /// The index is -1 when no participant is viewed and can transiently run
    /// past the participant count while the grid changes; both cases yield
    /// `None` rather than a guess.
    pub fn viewed_race_state(&self) -> Option<RaceState> {
        let idx = self.viewed_participant_index;
        if idx < 0 || idx as usize >= self.participant_count() {
            return None;
        }
        self.race_states.get(idx as usize).copied()
    }
}

/// Sequence word of a raw record buffer, without a full decode.
pub fn sequence_word(buf: &[u8]) -> Option<u32> {
    let bytes = buf.get(SEQUENCE_OFFSET..SEQUENCE_OFFSET + 4)?;
    Some(u32::from_le_bytes(bytes.try_into().ok()?))
}

fn read_u32<R: Read>(reader: &mut R) -> Result<u32> {
    let mut bytes = [0u8; 4];
    reader
        .read_exact(&mut bytes)
        .map_err(|e| Error::parse_error("telemetry record", format!("short read: {}", e)))?;
    Ok(u32::from_le_bytes(bytes))
}

fn read_i32<R: Read>(reader: &mut R) -> Result<i32> {
    let mut bytes = [0u8; 4];
    reader
        .read_exact(&mut bytes)
        .map_err(|e| Error::parse_error("telemetry record", format!("short read: {}", e)))?;
    Ok(i32::from_le_bytes(bytes))
}

/// Read one fixed-width NUL-padded string field.
fn read_string<R: Read>(reader: &mut R) -> Result<String> {
    let mut bytes = [0u8; STRING_LEN];
    reader
        .read_exact(&mut bytes)
        .map_err(|e| Error::parse_error("telemetry record", format!("short read: {}", e)))?;
    let end = bytes.iter().position(|&b| b == 0).unwrap_or(STRING_LEN);
    Ok(String::from_utf8_lossy(&bytes[..end]).into_owned())
}
