//! Event bus decoupling the policy engine from its notification consumers.

use std::sync::mpsc::{channel, Receiver, Sender};
use std::sync::{Arc, Mutex};
use tracing::error;

/// Events emitted by the engine and queue towards UI/log consumers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArchiverEvent {
    /// A user-visible info message with a display timeout.
    ShowAlert { message: String, timeout_secs: u32 },
    /// The execution queue drained. `did_work` is false when nothing needed
    /// archiving (backup already in sync).
    QueueFinished { did_work: bool },
    /// A recording just ended, pushed by the recording collaborator.
    RecordingFinished,
}

/// Broadcast-style bus using fan-out to per-subscriber channels. Events are
/// produced synchronously on the emitting thread; subscribers drain their
/// receiver when they get control.
#[derive(Default)]
pub struct EventBus {
    subscribers: Mutex<Vec<Sender<ArchiverEvent>>>,
}

impl EventBus {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Subscribe to events. Returns a receiver that sees all future events.
    pub fn subscribe(self: &Arc<Self>) -> Receiver<ArchiverEvent> {
        let (tx, rx) = channel();
        match self.subscribers.lock() {
            Ok(mut subs) => subs.push(tx),
            Err(_) => error!("EventBus: subscriber lock poisoned; subscriber not registered"),
        }
        rx
    }

    /// Broadcast an event to all subscribers. Best-effort, a closed receiver
    /// is skipped.
    pub fn emit(&self, event: ArchiverEvent) {
        if let Ok(subs) = self.subscribers.lock() {
            for sub in subs.iter() {
                let _ = sub.send(event.clone());
            }
        } else {
            error!("EventBus: subscriber lock poisoned; dropping event");
        }
    }
}
