//! Source abstraction for the shared telemetry region.

/// Read-only view of the producer's telemetry region.
///
/// Implementations abstract over where the record bytes live (a Windows
/// file mapping in production, an in-memory buffer in tests) so the
/// snapshot-consistency protocol above this trait is source-agnostic.
/// The region is single-writer/single-reader; implementations take no
/// locks and must tolerate the producer rewriting the record at any time.
pub trait TelemetryRegion {
    /// Size of the mapped record in bytes.
    fn len(&self) -> usize;

    /// Whether the region maps zero bytes.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Current value of the producer's sequence word.
    ///
    /// Reads only the sequence field; the rest of the record is untouched.
    fn sequence_number(&self) -> u32;

    /// Copy the entire record into `buf`.
    ///
    /// `buf.len()` must equal [`len`](Self::len). The copy is not atomic with
    /// respect to the producer; callers detect tearing via the sequence
    /// protocol.
    fn copy_into(&self, buf: &mut [u8]);
}

impl<R: TelemetryRegion + ?Sized> TelemetryRegion for std::sync::Arc<R> {
    fn len(&self) -> usize {
        (**self).len()
    }

    fn sequence_number(&self) -> u32 {
        (**self).sequence_number()
    }

    fn copy_into(&self, buf: &mut [u8]) {
        (**self).copy_into(buf)
    }
}
