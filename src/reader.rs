//! Torn-read-safe snapshot copies of the telemetry region.
//!
//! The producer publishes the record optimistically: it increments the
//! sequence word to an odd value, rewrites the record in place, then
//! increments again. The reader takes no locks; it detects write-in-progress
//! via sequence parity and tearing via a pre/post sequence comparison. Both
//! outcomes are transient absences, not errors, and are silently retried on
//! the caller's next poll.

use crate::schema::{self, SHARED_MEMORY_VERSION, TelemetrySnapshot};
use crate::source::TelemetryRegion;
use crate::{Error, Result};
use tracing::{debug, trace};

/// Performs consistent copies of a [`TelemetryRegion`].
pub struct SnapshotReader<R: TelemetryRegion> {
    region: R,
    /// Private copy buffer, reused across polls.
    buf: Vec<u8>,
}

impl<R: TelemetryRegion> SnapshotReader<R> {
    pub fn new(region: R) -> Self {
        let buf = vec![0u8; region.len()];
        Self { region, buf }
    }

    /// Attempt one consistent snapshot.
    ///
    /// Returns `Ok(None)` when the producer is mid-write (odd sequence word)
    /// or the copy spanned a write (sequence changed underneath the copy).
    /// Neither case touches the region beyond the reads themselves, and
    /// neither blocks: the caller re-polls on its own cadence. The check
    /// assumes the producer never parks the sequence word odd and that one
    /// copy is short relative to the producer's write period.
    pub fn poll(&mut self) -> Result<Option<TelemetrySnapshot>> {
        let before = self.region.sequence_number();
        if before % 2 != 0 {
            trace!(sequence = before, "Producer mid-write, snapshot unavailable");
            return Ok(None);
        }

        self.region.copy_into(&mut self.buf);

        let copied = schema::sequence_word(&self.buf).ok_or_else(|| {
            Error::parse_error("telemetry record", "record too small for sequence word")
        })?;
        if copied != before {
            debug!(before, after = copied, "Sequence number changed during copy, discarding");
            return Ok(None);
        }

        let snapshot = TelemetrySnapshot::decode(&self.buf)?;
        Ok(Some(snapshot))
    }

    /// Poll until a consistent snapshot arrives and validate its format
    /// version against [`SHARED_MEMORY_VERSION`].
    ///
    /// Intended for the first successful connection. A mismatch is fatal:
    /// the layouts are not compatible across versions and every derived
    /// artifact would be garbage. Returns the validated snapshot so callers
    /// can feed it straight into the state machine.
    pub async fn verify_version(
        &mut self,
        poll_interval: std::time::Duration,
    ) -> Result<TelemetrySnapshot> {
        loop {
            if let Some(snapshot) = self.poll()? {
                verify_version(&snapshot)?;
                return Ok(snapshot);
            }
            tokio::time::sleep(poll_interval).await;
        }
    }
}

/// Check a snapshot's declared format version against the one this consumer
/// was built for.
pub fn verify_version(snapshot: &TelemetrySnapshot) -> Result<()> {
    if snapshot.version != SHARED_MEMORY_VERSION {
        return Err(Error::Version { expected: SHARED_MEMORY_VERSION, found: snapshot.version });
    }
    Ok(())
}
