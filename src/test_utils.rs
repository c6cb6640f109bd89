//! Test helpers: raw record assembly and scripted doubles for the region
//! and collector seams.

#![cfg(test)]

use crate::delivery::Collector;
use crate::schema::{
    self, MAX_PARTICIPANTS, RECORD_SIZE, RaceState, STRING_LEN, SHARED_MEMORY_VERSION,
    SessionState,
};
use crate::source::TelemetryRegion;
use crate::{Error, Result};
use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Assembles raw telemetry record buffers field by field.
#[derive(Clone)]
pub struct RegionBuilder {
    version: u32,
    sequence: u32,
    session: SessionState,
    viewed_index: i32,
    num_participants: i32,
    race_states: Vec<RaceState>,
    active: Vec<bool>,
    names: Vec<String>,
    positions: Vec<u32>,
    car_names: Vec<String>,
    car_class_names: Vec<String>,
    track: [String; 4],
}

impl RegionBuilder {
    pub fn new() -> Self {
        Self {
            version: SHARED_MEMORY_VERSION,
            sequence: 0,
            session: SessionState::Invalid,
            viewed_index: -1,
            num_participants: 0,
            race_states: vec![RaceState::Invalid; MAX_PARTICIPANTS],
            active: vec![false; MAX_PARTICIPANTS],
            names: vec![String::new(); MAX_PARTICIPANTS],
            positions: vec![0; MAX_PARTICIPANTS],
            car_names: vec![String::new(); MAX_PARTICIPANTS],
            car_class_names: vec![String::new(); MAX_PARTICIPANTS],
            track: Default::default(),
        }
    }

    pub fn version(mut self, version: u32) -> Self {
        self.version = version;
        self
    }

    pub fn sequence(mut self, sequence: u32) -> Self {
        self.sequence = sequence;
        self
    }

    pub fn session(mut self, session: SessionState) -> Self {
        self.session = session;
        self
    }

    pub fn viewed_index(mut self, index: i32) -> Self {
        self.viewed_index = index;
        self
    }

    pub fn participant(
        mut self,
        slot: usize,
        name: &str,
        position: u32,
        active: bool,
        state: RaceState,
        car_name: &str,
        car_class: &str,
    ) -> Self {
        self.active[slot] = active;
        self.names[slot] = name.to_string();
        self.positions[slot] = position;
        self.race_states[slot] = state;
        self.car_names[slot] = car_name.to_string();
        self.car_class_names[slot] = car_class.to_string();
        self.num_participants = self.num_participants.max(slot as i32 + 1);
        self
    }

    pub fn track(
        mut self,
        location: &str,
        variation: &str,
        translated_location: &str,
        translated_variation: &str,
    ) -> Self {
        self.track = [
            location.to_string(),
            variation.to_string(),
            translated_location.to_string(),
            translated_variation.to_string(),
        ];
        self
    }

    pub fn build(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(RECORD_SIZE);
        buf.extend_from_slice(&self.version.to_le_bytes());
        buf.extend_from_slice(&self.sequence.to_le_bytes());
        buf.extend_from_slice(&session_raw(self.session).to_le_bytes());
        buf.extend_from_slice(&self.viewed_index.to_le_bytes());
        buf.extend_from_slice(&self.num_participants.to_le_bytes());
        for state in &self.race_states {
            buf.extend_from_slice(&race_state_raw(*state).to_le_bytes());
        }
        for i in 0..MAX_PARTICIPANTS {
            buf.extend_from_slice(&u32::from(self.active[i]).to_le_bytes());
            push_string(&mut buf, &self.names[i]);
            buf.extend_from_slice(&self.positions[i].to_le_bytes());
        }
        for name in &self.car_names {
            push_string(&mut buf, name);
        }
        for name in &self.car_class_names {
            push_string(&mut buf, name);
        }
        for field in &self.track {
            push_string(&mut buf, field);
        }
        assert_eq!(buf.len(), RECORD_SIZE);
        buf
    }
}

fn push_string(buf: &mut Vec<u8>, value: &str) {
    let bytes = value.as_bytes();
    assert!(bytes.len() < STRING_LEN, "string field too long: {}", value);
    buf.extend_from_slice(bytes);
    buf.resize(buf.len() + STRING_LEN - bytes.len(), 0);
}

fn session_raw(session: SessionState) -> u32 {
    match session {
        SessionState::Invalid => 0,
        SessionState::Practice => 1,
        SessionState::Test => 2,
        SessionState::Qualify => 3,
        SessionState::FormationLap => 4,
        SessionState::Race => 5,
        SessionState::TimeAttack => 6,
        SessionState::Unknown => 99,
    }
}

fn race_state_raw(state: RaceState) -> u32 {
    match state {
        RaceState::Invalid => 0,
        RaceState::NotStarted => 1,
        RaceState::Racing => 2,
        RaceState::Finished => 3,
        RaceState::Disqualified => 4,
        RaceState::Retired => 5,
        RaceState::Dnf => 6,
        RaceState::Unknown => 99,
    }
}

/// Scripted telemetry region.
///
/// Serves a queue of record buffers: each copy consumes one record until a
/// single record remains, which then repeats forever. The reported sequence
/// word can be overridden to fake a producer publishing between the
/// sequence read and the copy.
pub struct FakeRegion {
    records: Mutex<VecDeque<Vec<u8>>>,
    reported_sequence: Mutex<Option<u32>>,
    copies: AtomicUsize,
}

impl FakeRegion {
    pub fn new(record: Vec<u8>) -> Self {
        Self {
            records: Mutex::new(VecDeque::from([record])),
            reported_sequence: Mutex::new(None),
            copies: AtomicUsize::new(0),
        }
    }

    /// Append a record to the script.
    pub fn push(&self, record: Vec<u8>) {
        self.records.lock().unwrap().push_back(record);
    }

    /// Force `sequence_number()` to report `sequence` regardless of the
    /// current record's actual word.
    pub fn report_sequence(&self, sequence: u32) {
        *self.reported_sequence.lock().unwrap() = Some(sequence);
    }

    pub fn clear_reported_sequence(&self) {
        *self.reported_sequence.lock().unwrap() = None;
    }

    /// Number of full-record copies performed.
    pub fn copies(&self) -> usize {
        self.copies.load(Ordering::SeqCst)
    }
}

impl TelemetryRegion for FakeRegion {
    fn len(&self) -> usize {
        self.records.lock().unwrap().front().map_or(0, Vec::len)
    }

    fn sequence_number(&self) -> u32 {
        if let Some(sequence) = *self.reported_sequence.lock().unwrap() {
            return sequence;
        }
        let records = self.records.lock().unwrap();
        records.front().and_then(|r| schema::sequence_word(r)).unwrap_or(1)
    }

    fn copy_into(&self, buf: &mut [u8]) {
        self.copies.fetch_add(1, Ordering::SeqCst);
        let mut records = self.records.lock().unwrap();
        let record = records.front().expect("scripted region is empty");
        buf.copy_from_slice(record);
        if records.len() > 1 {
            records.pop_front();
        }
    }
}

/// Scripted collector: fails a fixed number of attempts, then accepts
/// everything, recording payloads in arrival order.
pub struct FakeCollector {
    fail_remaining: AtomicUsize,
    attempts: AtomicUsize,
    payloads: Mutex<Vec<Vec<u8>>>,
}

impl FakeCollector {
    pub fn failing(failures: usize) -> Self {
        Self {
            fail_remaining: AtomicUsize::new(failures),
            attempts: AtomicUsize::new(0),
            payloads: Mutex::new(Vec::new()),
        }
    }

    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    pub fn payloads(&self) -> Vec<Vec<u8>> {
        self.payloads.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl Collector for FakeCollector {
    async fn upload(&self, payload: &[u8]) -> Result<()> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        let remaining = self.fail_remaining.load(Ordering::SeqCst);
        if remaining > 0 {
            self.fail_remaining.store(remaining - 1, Ordering::SeqCst);
            return Err(Error::upload_rejected(503));
        }
        self.payloads.lock().unwrap().push(payload.to_vec());
        Ok(())
    }
}
