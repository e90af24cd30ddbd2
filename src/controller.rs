//! Session controller: lifecycle, recording-event reaction and single-flight
//! archiving invocation.

use crate::config::ArchiverConfig;
use crate::engine::ArchiveEngine;
use crate::events::{ArchiverEvent, EventBus};
use crate::process::CommandExecutor;
use colored::Colorize;
use std::sync::mpsc::Receiver;
use std::sync::Arc;
use tracing::info;

/// Explicitly constructed and owned controller instance; whatever external
/// lifecycle (startup/shutdown hooks, a host loop) needs it holds it directly
/// instead of reaching for a process-wide singleton.
pub struct NotificationController {
    engine: ArchiveEngine,
    events: Arc<EventBus>,
    inbox: Receiver<ArchiverEvent>,
    enabled: bool,
    armed: bool,
    user_initiated: bool,
}

impl NotificationController {
    pub fn new(config: ArchiverConfig) -> Self {
        let events = EventBus::new();
        let inbox = events.subscribe();
        let enabled = config.enabled;
        let engine = ArchiveEngine::new(config, events.clone());
        Self {
            engine,
            events,
            inbox,
            enabled,
            armed: false,
            user_initiated: false,
        }
    }

    /// Build around a prepared engine sharing `events`; the controller still
    /// needs its own subscription taken from the same bus.
    pub fn with_engine(engine: ArchiveEngine, events: Arc<EventBus>) -> Self {
        let inbox = events.subscribe();
        let enabled = engine.config().enabled;
        Self {
            engine,
            events,
            inbox,
            enabled,
            armed: false,
            user_initiated: false,
        }
    }

    /// Bus handle for external collaborators, e.g. a recording backend
    /// pushing [`ArchiverEvent::RecordingFinished`].
    pub fn events(&self) -> Arc<EventBus> {
        self.events.clone()
    }

    /// Arm automatic archiving after finished recordings, when enabled.
    pub fn start(&mut self) {
        if self.enabled && !self.armed {
            self.armed = true;
            info!("MovieArchiver armed, waiting for finished recordings");
        }
    }

    pub fn stop(&mut self) {
        self.armed = false;
    }

    /// True while an archiving or backup run is in progress.
    pub fn is_archiving(&self) -> bool {
        self.engine.is_running()
    }

    /// Kick off one run and drive it to completion. Single-flight: a no-op
    /// when a run is already in progress. `user_initiated` decides whether
    /// alerts and the finished message are rendered or only logged.
    pub fn start_archiving(&mut self, executor: &mut dyn CommandExecutor, user_initiated: bool) {
        if self.is_archiving() {
            return;
        }
        self.user_initiated = user_initiated;
        self.engine.start_archiving(executor);
        self.pump(executor);
    }

    /// Clears the pending queue; the in-flight command completes on its own.
    pub fn stop_archiving(&mut self) {
        self.engine.stop_archiving();
        self.show_message("MovieArchiver: stop archiving.", 5);
    }

    /// Drain and handle any events produced outside an archiving run, e.g. a
    /// pushed recording-finished signal.
    pub fn poll(&mut self, executor: &mut dyn CommandExecutor) {
        self.drain_events(executor);
    }

    /// Feed executor completion signals back into the engine until the queue
    /// drains, then render the produced events.
    fn pump(&mut self, executor: &mut dyn CommandExecutor) {
        while self.engine.is_running() {
            match executor.wait_for_exit() {
                Some(exit) => self.engine.on_process_completed(executor, exit),
                None => break,
            }
        }
        self.drain_events(executor);
    }

    fn drain_events(&mut self, executor: &mut dyn CommandExecutor) {
        while let Ok(event) = self.inbox.try_recv() {
            self.handle_event(event, executor);
        }
    }

    fn handle_event(&mut self, event: ArchiverEvent, executor: &mut dyn CommandExecutor) {
        match event {
            ArchiverEvent::ShowAlert {
                message,
                timeout_secs,
            } => {
                if self.user_initiated {
                    self.show_message(&message, timeout_secs);
                } else {
                    info!("{}", message);
                }
            }
            ArchiverEvent::QueueFinished { did_work } => {
                let message = if did_work {
                    "MovieArchiver: archiving finished."
                } else {
                    "MovieArchiver: movies already archived."
                };
                if self.user_initiated {
                    self.show_message(message, 5);
                } else {
                    info!("{}", message);
                }
            }
            ArchiverEvent::RecordingFinished => {
                info!("Record finished");
                if self.armed && !self.is_archiving() {
                    self.user_initiated = false;
                    self.engine.start_archiving(executor);
                    self.pump(executor);
                }
            }
        }
    }

    /// CLI rendering of the host's message box; the timeout only matters for
    /// on-screen surfaces.
    fn show_message(&self, message: &str, _timeout_secs: u32) {
        println!("{}", message.cyan());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::process::ExitInfo;
    use std::path::PathBuf;

    #[derive(Default)]
    struct InertExecutor {
        executed: Vec<String>,
    }

    impl CommandExecutor for InertExecutor {
        fn execute(&mut self, command: &str) -> Result<(), Error> {
            self.executed.push(command.to_string());
            Ok(())
        }

        fn wait_for_exit(&mut self) -> Option<ExitInfo> {
            Some(ExitInfo { code: Some(0) })
        }
    }

    fn config(enabled: bool) -> ArchiverConfig {
        let tmp = std::env::temp_dir();
        ArchiverConfig {
            enabled,
            backup_mode: false,
            skip_during_records: true,
            show_limit_reached_notification: true,
            source_path: tmp.join("movie-archiver-src"),
            source_limit_gb: 30,
            exclude_dirs: Vec::<PathBuf>::new(),
            target_path: tmp.join("movie-archiver-dst"),
            target_limit_gb: 30,
        }
    }

    #[test]
    fn test_same_mount_point_aborts_without_dispatch() {
        // both paths live on the same volume, the first precondition trips
        let mut controller = NotificationController::new(config(false));
        let mut executor = InertExecutor::default();
        controller.start_archiving(&mut executor, false);
        assert!(executor.executed.is_empty());
        assert!(!controller.is_archiving());
    }

    #[test]
    fn test_start_only_arms_when_enabled() {
        let mut disabled = NotificationController::new(config(false));
        disabled.start();
        assert!(!disabled.armed);

        let mut enabled = NotificationController::new(config(true));
        enabled.start();
        assert!(enabled.armed);
        enabled.stop();
        assert!(!enabled.armed);
    }

    #[test]
    fn test_recording_finished_triggers_run_when_armed() {
        let mut controller = NotificationController::new(config(true));
        controller.start();
        let mut executor = InertExecutor::default();

        controller.events().emit(ArchiverEvent::RecordingFinished);
        controller.poll(&mut executor);
        // same-volume config: the run aborts at the precondition, but it ran
        assert!(!controller.is_archiving());
    }
}
