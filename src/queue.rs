//! Ordered, deduplicated queue of shell-level move/copy commands with
//! strictly sequential execution.

use crate::events::{ArchiverEvent, EventBus};
use crate::process::{CommandExecutor, ExitInfo};
use std::collections::VecDeque;
use std::sync::Arc;
use tracing::{debug, error, info};

/// FIFO of opaque command strings. At most one command is in flight at any
/// time; the next is dispatched only when the external executor reports the
/// prior one finished. This protects the volumes from overlapping move/copy
/// operations racing on the same sidecar files.
pub struct ArchiveQueue {
    queue: VecDeque<String>,
    in_flight: Option<String>,
    processed: usize,
    events: Arc<EventBus>,
}

impl ArchiveQueue {
    pub fn new(events: Arc<EventBus>) -> Self {
        Self {
            queue: VecDeque::new(),
            in_flight: None,
            processed: 0,
            events,
        }
    }

    /// True while a command is bound to the external executor.
    pub fn is_running(&self) -> bool {
        self.in_flight.is_some()
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Pending commands in order, without clearing.
    pub fn snapshot(&self) -> Vec<String> {
        self.queue.iter().cloned().collect()
    }

    /// Append a command unless an equal one is already in flight or queued.
    /// Commands are opaque here; the queue never interprets move vs copy.
    pub fn enqueue(&mut self, command: String) {
        if self.in_flight.as_deref() == Some(command.as_str()) || self.queue.contains(&command) {
            debug!("Skipping duplicate command: {}", command);
            return;
        }
        self.queue.push_back(command);
    }

    /// Pop the front command and dispatch it. A synchronous dispatch failure
    /// clears the whole queue; there is no partial retry.
    pub fn run_next(&mut self, executor: &mut dyn CommandExecutor) {
        let Some(command) = self.queue.pop_front() else {
            return;
        };
        debug!("Executing: {}", command);
        self.in_flight = Some(command.clone());
        if let Err(err) = executor.execute(&command) {
            error!("Queue dispatch failed, clearing queue: {}", err);
            self.clear();
        }
    }

    /// Completion signal from the external executor: release the in-flight
    /// slot and either dispatch the next command back-to-back or finish.
    pub fn on_process_completed(&mut self, executor: &mut dyn CommandExecutor, exit: ExitInfo) {
        if self.in_flight.take().is_some() {
            self.processed += 1;
        }
        if !exit.success() {
            info!("Command exited with status {:?}", exit.code);
        }
        if !self.queue.is_empty() {
            self.run_next(executor);
        } else {
            info!("Queue finished");
            let did_work = self.processed > 0;
            self.processed = 0;
            self.events.emit(ArchiverEvent::QueueFinished { did_work });
        }
    }

    /// Report completion without ever starting: nothing needed doing.
    pub fn finish_empty(&self) {
        self.events.emit(ArchiverEvent::QueueFinished { did_work: false });
    }

    /// Empty the queue and reset in-flight bookkeeping. A command already
    /// handed to the executor is not cancelled, it completes on its own.
    pub fn clear(&mut self) {
        self.in_flight = None;
        self.queue.clear();
        self.processed = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    #[derive(Default)]
    struct RecordingExecutor {
        executed: Vec<String>,
        fail_dispatch: bool,
    }

    impl CommandExecutor for RecordingExecutor {
        fn execute(&mut self, command: &str) -> Result<(), Error> {
            if self.fail_dispatch {
                return Err(Error::Dispatch("boom".into()));
            }
            self.executed.push(command.to_string());
            Ok(())
        }

        fn wait_for_exit(&mut self) -> Option<ExitInfo> {
            Some(ExitInfo { code: Some(0) })
        }
    }

    fn ok() -> ExitInfo {
        ExitInfo { code: Some(0) }
    }

    #[test]
    fn test_enqueue_dedups_exact_commands() {
        let mut queue = ArchiveQueue::new(EventBus::new());
        queue.enqueue("mv \"/m/a.\"* \"/a\"".to_string());
        queue.enqueue("mv \"/m/a.\"* \"/a\"".to_string());
        queue.enqueue("mv \"/m/b.\"* \"/a\"".to_string());
        assert_eq!(queue.len(), 2);
    }

    #[test]
    fn test_in_flight_command_is_not_requeued() {
        let bus = EventBus::new();
        let mut queue = ArchiveQueue::new(bus);
        let mut executor = RecordingExecutor::default();

        queue.enqueue("cp \"/m/a\" \"/b/a\"".to_string());
        queue.run_next(&mut executor);
        assert!(queue.is_running());

        queue.enqueue("cp \"/m/a\" \"/b/a\"".to_string());
        assert!(queue.is_empty());
    }

    #[test]
    fn test_sequential_fifo_execution() {
        let bus = EventBus::new();
        let rx = bus.subscribe();
        let mut queue = ArchiveQueue::new(bus);
        let mut executor = RecordingExecutor::default();

        for name in ["a", "b", "c"] {
            queue.enqueue(format!("mv \"/m/{name}.\"* \"/a\""));
        }
        queue.run_next(&mut executor);
        // one dispatch per completion signal, never ahead of it
        assert_eq!(executor.executed.len(), 1);
        queue.on_process_completed(&mut executor, ok());
        assert_eq!(executor.executed.len(), 2);
        queue.on_process_completed(&mut executor, ok());
        assert_eq!(executor.executed.len(), 3);
        assert!(rx.try_recv().is_err());

        queue.on_process_completed(&mut executor, ok());
        assert_eq!(
            executor.executed,
            vec![
                "mv \"/m/a.\"* \"/a\"",
                "mv \"/m/b.\"* \"/a\"",
                "mv \"/m/c.\"* \"/a\"",
            ]
        );
        assert!(!queue.is_running());
        assert_eq!(
            rx.try_recv().unwrap(),
            ArchiverEvent::QueueFinished { did_work: true }
        );
    }

    #[test]
    fn test_dispatch_failure_clears_queue() {
        let bus = EventBus::new();
        let rx = bus.subscribe();
        let mut queue = ArchiveQueue::new(bus);
        let mut executor = RecordingExecutor {
            fail_dispatch: true,
            ..Default::default()
        };

        queue.enqueue("mv \"/m/a.\"* \"/a\"".to_string());
        queue.enqueue("mv \"/m/b.\"* \"/a\"".to_string());
        queue.run_next(&mut executor);

        assert!(queue.is_empty());
        assert!(!queue.is_running());
        // the run ends without a queue-finished signal
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_finish_empty_reports_no_work() {
        let bus = EventBus::new();
        let rx = bus.subscribe();
        let queue = ArchiveQueue::new(bus);
        queue.finish_empty();
        assert_eq!(
            rx.try_recv().unwrap(),
            ArchiverEvent::QueueFinished { did_work: false }
        );
    }
}
