//! Best-effort audio notifications.
//!
//! Playback failures are logged and ignored; the pipeline never waits on or
//! reacts to a notification. Off Windows this whole module is a no-op.

#[cfg(windows)]
use tracing::{error, info};

#[cfg(not(windows))]
use tracing::debug;

const STARTUP_SOUND: &str = "audio/startup.wav";
const RACE_SAVED_SOUND: &str = "audio/racesavednotify.wav";

/// Test notification played once at startup so the operator hears a broken
/// audio setup immediately, not after the first race.
pub fn startup() {
    play(STARTUP_SOUND);
}

/// Played after result artifacts are written.
pub fn race_saved() {
    play(RACE_SAVED_SOUND);
}

#[cfg(windows)]
fn play(path: &str) {
    use windows::Win32::Media::Audio::{PlaySoundW, SND_ASYNC, SND_FILENAME};
    use windows::core::PCWSTR;

    let wide = crate::windows::wide_string(path);
    let played = unsafe { PlaySoundW(PCWSTR::from_raw(wide.as_ptr()), None, SND_FILENAME | SND_ASYNC) };
    if played.as_bool() {
        info!("Notification sound played: {}", path);
    } else {
        error!("Failed to play {}", path);
    }
}

#[cfg(not(windows))]
fn play(path: &str) {
    debug!("Audio notifications unavailable on this platform, skipping {}", path);
}
