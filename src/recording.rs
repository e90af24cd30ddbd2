//! Recording-signal collaborator boundary.

/// Read side of the host's recording timers. The push side ("recording just
/// finished") arrives as [`crate::events::ArchiverEvent::RecordingFinished`]
/// on the event bus.
pub trait RecordingSignal {
    /// Number of recordings currently running.
    fn recording_count(&self) -> usize;

    /// Epoch seconds of the next scheduled recording start; negative when
    /// none is scheduled.
    fn next_recording_start_secs(&self) -> i64;
}

/// Null implementation for hosts without a recording backend.
pub struct NoRecordings;

impl RecordingSignal for NoRecordings {
    fn recording_count(&self) -> usize {
        0
    }

    fn next_recording_start_secs(&self) -> i64 {
        -1
    }
}
