//! The poll/export/deliver pipeline.
//!
//! One cooperative loop drives the whole system: read a snapshot, advance
//! the race state machine, and on a lifecycle event aggregate, write and
//! deliver, strictly in that order, with no overlap between exporting one
//! race's results and polling for the next. Suspension points are explicit
//! fixed-duration pauses; the loop runs until its cancellation token fires.

use crate::artifact::{ArtifactPaths, ArtifactWriter};
use crate::config::Config;
use crate::delivery::{self, Collector, DeliveryQueue};
use crate::notify;
use crate::reader::SnapshotReader;
use crate::results;
use crate::schema::{RaceState, SessionState, TelemetrySnapshot};
use crate::source::TelemetryRegion;
use crate::tracker::{RaceEvent, RaceTracker};
use crate::Result;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

/// Fixed pause durations for the cooperative loop.
#[derive(Debug, Clone, Copy)]
pub struct Timing {
    /// Pause between snapshot polls.
    pub poll_interval: Duration,
    /// Pause between delivery retry attempts.
    pub retry_interval: Duration,
    /// Pause between attempts to open the telemetry region at startup.
    pub reconnect_interval: Duration,
}

impl Default for Timing {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(500),
            retry_interval: delivery::RETRY_INTERVAL,
            reconnect_interval: Duration::from_secs(30),
        }
    }
}

/// Owns the full capture-to-delivery chain for one telemetry region.
pub struct Pipeline<R: TelemetryRegion, C: Collector> {
    reader: SnapshotReader<R>,
    tracker: RaceTracker,
    writer: ArtifactWriter,
    queue: DeliveryQueue<C>,
    paths: ArtifactPaths,
    config: Config,
    timing: Timing,
    enable_csv: bool,
    last_participants: i32,
    last_session: SessionState,
    last_lead_state: RaceState,
}

impl<R: TelemetryRegion, C: Collector> Pipeline<R, C> {
    pub fn new(
        region: R,
        collector: C,
        config: Config,
        paths: ArtifactPaths,
        timing: Timing,
        enable_csv: bool,
    ) -> Self {
        let queue = DeliveryQueue::new(
            collector,
            paths.sent_dir.clone(),
            timing.retry_interval,
            config.disable_upload,
        );
        Self {
            reader: SnapshotReader::new(region),
            tracker: RaceTracker::new(config.create_json_at_race_start),
            writer: ArtifactWriter::new(paths.clone()),
            queue,
            paths,
            config,
            timing,
            enable_csv,
            last_participants: 0,
            last_session: SessionState::Invalid,
            last_lead_state: RaceState::Invalid,
        }
    }

    /// Poll until a consistent snapshot arrives and validate its format
    /// version. Must succeed before [`run`](Self::run).
    pub async fn verify_version(&mut self) -> Result<()> {
        let snapshot = self.reader.verify_version(self.timing.poll_interval).await?;
        info!(version = snapshot.version, "Telemetry format version validated");
        Ok(())
    }

    /// Run the pipeline until `cancel` fires.
    ///
    /// Cycle failures (write errors, listing errors) are logged and the loop
    /// continues; nothing past startup is fatal.
    pub async fn run(&mut self, cancel: CancellationToken) {
        info!("Pipeline started");
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                result = self.cycle() => {
                    if let Err(e) = result {
                        error!("Export cycle failed: {}", e);
                    }
                }
            }
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(self.timing.poll_interval) => {}
            }
        }
        info!("Pipeline stopped");
    }

    /// One poll cycle: snapshot, lifecycle events, export on event.
    async fn cycle(&mut self) -> Result<()> {
        let Some(snapshot) = self.reader.poll()? else {
            // Mid-write or torn; the next poll will try again.
            return Ok(());
        };

        self.log_state_changes(&snapshot);

        for event in self.tracker.observe(&snapshot) {
            match event {
                RaceEvent::SessionChanged(_) => {}
                RaceEvent::RaceStarted => self.export(&snapshot, true).await?,
                RaceEvent::RaceEnded => self.export(&snapshot, false).await?,
            }
        }
        Ok(())
    }

    /// Aggregate, write and deliver one export event.
    async fn export(&mut self, snapshot: &TelemetrySnapshot, early: bool) -> Result<()> {
        let standings = results::aggregate(snapshot, self.config.sort_order());

        if self.enable_csv {
            self.writer.write_csv(&standings)?;
        } else {
            debug!("CSV creation disabled, skipping");
        }
        self.writer.write_json(&standings, early)?;
        notify::race_saved();

        self.queue.flush_all(&self.paths).await
    }

    /// Flush artifacts left over from a previous run.
    pub async fn recover_leftovers(&self) -> Result<()> {
        self.queue.flush_all(&self.paths).await
    }

    fn log_state_changes(&mut self, snapshot: &TelemetrySnapshot) {
        let lead_state = snapshot.race_states.first().copied().unwrap_or(RaceState::Invalid);
        if snapshot.num_participants != self.last_participants
            || snapshot.session_state != self.last_session
            || lead_state != self.last_lead_state
        {
            debug!(
                participants = snapshot.num_participants,
                session = snapshot.session_state.name(),
                lead_race_state = lead_state.name(),
                "Telemetry state changed"
            );
            self.last_participants = snapshot.num_participants;
            self.last_session = snapshot.session_state;
            self.last_lead_state = lead_state;
        }
    }
}
