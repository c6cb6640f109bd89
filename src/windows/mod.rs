//! Shared memory mapping for the simulation's telemetry record.
//!
//! Maps the named region the simulation publishes and exposes it through
//! [`TelemetryRegion`]. All raw-pointer access is confined to this module;
//! consistency of what is read is the snapshot reader's concern.

use crate::schema::{RECORD_SIZE, SEQUENCE_OFFSET};
use crate::source::TelemetryRegion;
use crate::{Error, Result};
use std::ptr::NonNull;
use tracing::{debug, trace};
use windows::Win32::Foundation::{CloseHandle, HANDLE};
use windows::Win32::System::Memory::{
    FILE_MAP_READ, MEMORY_MAPPED_VIEW_ADDRESS, MapViewOfFile, OpenFileMappingW, UnmapViewOfFile,
};
use windows::core::PCWSTR;

/// Name of the region the simulation publishes.
const SHARED_MEMORY_NAME: &str = "$pcars2$";

/// Read-only mapping of the simulation's telemetry record.
pub struct SharedMemoryRegion {
    mapping: HANDLE,
    base: NonNull<u8>,
}

impl SharedMemoryRegion {
    /// Attempt to map the simulation's shared memory.
    ///
    /// Fails with a retryable [`Error::Connection`]-class error while the
    /// simulation is not running; callers re-attempt on their own cadence.
    pub fn open() -> Result<Self> {
        trace!("Attempting to open simulation shared memory");

        let mapping = unsafe {
            let wide_name = wide_string(SHARED_MEMORY_NAME);
            OpenFileMappingW(FILE_MAP_READ.0, false, PCWSTR::from_raw(wide_name.as_ptr()))
                .map_err(|e| Error::windows_api_error("OpenFileMappingW", e))?
        };

        let base = unsafe {
            let ptr = MapViewOfFile(mapping, FILE_MAP_READ, 0, 0, RECORD_SIZE);
            NonNull::new(ptr.Value as *mut u8).ok_or_else(|| {
                let win_err = windows::core::Error::from_thread();
                let _ = CloseHandle(mapping);
                Error::windows_api_error("MapViewOfFile", win_err)
            })?
        };

        debug!("Mapped simulation shared memory ({} bytes)", RECORD_SIZE);
        Ok(Self { mapping, base })
    }
}

impl TelemetryRegion for SharedMemoryRegion {
    fn len(&self) -> usize {
        RECORD_SIZE
    }

    fn sequence_number(&self) -> u32 {
        // Volatile read: the producer rewrites this word on every publish and
        // the compiler must not cache it across polls.
        unsafe {
            let ptr = self.base.as_ptr().add(SEQUENCE_OFFSET) as *const u32;
            std::ptr::read_volatile(ptr)
        }
    }

    fn copy_into(&self, buf: &mut [u8]) {
        assert_eq!(buf.len(), RECORD_SIZE, "copy buffer must match record size");
        unsafe {
            std::ptr::copy_nonoverlapping(self.base.as_ptr(), buf.as_mut_ptr(), RECORD_SIZE);
        }
    }
}

impl Drop for SharedMemoryRegion {
    fn drop(&mut self) {
        unsafe {
            let addr = MEMORY_MAPPED_VIEW_ADDRESS { Value: self.base.as_ptr() as *mut _ };
            let _ = UnmapViewOfFile(addr);
            let _ = CloseHandle(self.mapping);
        }
    }
}

// SAFETY: The region holds a handle and a pointer into a read-only file
// mapping; both are safe to move across threads for our read-only use case.
unsafe impl Send for SharedMemoryRegion {}

/// Convert string to null-terminated wide string for Windows APIs
pub(crate) fn wide_string(s: &str) -> Vec<u16> {
    use std::ffi::OsStr;
    use std::os::windows::ffi::OsStrExt;
    OsStr::new(s).encode_wide().chain(std::iter::once(0)).collect()
}

#[cfg(all(test, windows))]
mod tests {
    use super::*;

    #[test]
    fn region_name_matches_simulation() {
        assert_eq!(SHARED_MEMORY_NAME, "$pcars2$");
    }

    #[test]
    fn wide_string_is_nul_terminated() {
        let wide = wide_string("$pcars2$");
        assert_eq!(wide.last(), Some(&0));
        assert_eq!(wide.len(), "$pcars2$".len() + 1);
    }
}
