//! Race lifecycle detection over successive snapshots.
//!
//! The record carries no discrete events, only continuously-changing state;
//! this module derives them. The tracker holds a small amount of state across
//! polls and emits [`RaceEvent`]s when the session changes or a race starts
//! or ends. Which of start/end detection is armed depends on the configured
//! export cadence: early standings as soon as a grid is known, or final
//! results once every active participant reaches a terminal state. The modes
//! are configured, never concurrent, so one race never produces two
//! semantically different artifacts under ambiguous naming.

use crate::schema::{RaceState, SessionState, TelemetrySnapshot};
use tracing::{debug, info};

/// Discrete lifecycle event derived from the snapshot stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RaceEvent {
    /// The session meta-phase changed.
    SessionChanged(SessionState),
    /// A grid is known and early export is armed. Fires once per race.
    RaceStarted,
    /// Every active participant reached a terminal state. Fires once per race.
    RaceEnded,
}

/// State machine consuming successive snapshots.
pub struct RaceTracker {
    last_session: SessionState,
    race_started: bool,
    race_ended: bool,
    last_viewed_state: RaceState,
    export_at_start: bool,
}

impl RaceTracker {
    /// `export_at_start` selects the delivery cadence: `true` arms start
    /// detection, `false` arms end detection.
    pub fn new(export_at_start: bool) -> Self {
        Self {
            last_session: SessionState::Invalid,
            race_started: false,
            race_ended: false,
            last_viewed_state: RaceState::Invalid,
            export_at_start,
        }
    }

    /// Consume one snapshot and emit any lifecycle events it implies.
    pub fn observe(&mut self, snapshot: &TelemetrySnapshot) -> Vec<RaceEvent> {
        let mut events = Vec::new();

        // Session transitions come first: leaving Race mid-race without a
        // detected end must not block the next race's start detection.
        if snapshot.session_state != self.last_session {
            info!("Session name: {}", snapshot.session_state.name());
            events.push(RaceEvent::SessionChanged(snapshot.session_state));
            if self.last_session == SessionState::Race
                && snapshot.session_state != SessionState::Race
            {
                info!("Session ends, resetting race start flag");
                self.race_started = false;
            }
            self.last_session = snapshot.session_state;
        }

        // Viewed-participant status. Skipped wholesale when the index is out
        // of range (no viewed participant, or the grid is mid-change).
        let viewed = snapshot.viewed_race_state();
        let previous_viewed = self.last_viewed_state;
        if let Some(state) = viewed {
            if state != self.last_viewed_state {
                info!("Race status: {}", state.name());
                self.last_viewed_state = state;
            }
        }

        if self.export_at_start {
            if snapshot.num_participants > 0 && !self.race_started {
                info!(
                    participants = snapshot.num_participants,
                    "Grid known, race start detected"
                );
                events.push(RaceEvent::RaceStarted);
                self.race_started = true;
            }
        } else if snapshot.session_state == SessionState::Race && !self.race_ended {
            let all_finished = (0..snapshot.participant_count()).all(|i| {
                !snapshot.participants[i].is_active || snapshot.race_states[i].is_terminal()
            });
            // A race with zero active participants is trivially finished.
            if all_finished {
                info!("Race ends");
                events.push(RaceEvent::RaceEnded);
                self.race_ended = true;
            }
        }

        // Reset: the viewed participant resuming racing under the same Race
        // session means a new race instance. Keyed on the transition into
        // Racing so a race in progress does not re-arm every poll; keyed on
        // the viewed participant because it is the cheapest reliable signal
        // that lap timing has resumed for the locally observed driver.
        if snapshot.session_state == SessionState::Race
            && (self.race_ended || self.race_started)
            && viewed == Some(RaceState::Racing)
            && previous_viewed != RaceState::Racing
        {
            info!("New race started, resetting lifecycle flags");
            self.race_ended = false;
            self.race_started = false;
        }

        if !events.is_empty() {
            debug!(?events, "Lifecycle events emitted");
        }
        events
    }
}
