//! Policy engine orchestrating one archiving or backup run.

use crate::config::ArchiverConfig;
use crate::disk::{DiskSpace, SystemDisk};
use crate::events::{ArchiverEvent, EventBus};
use crate::process::{CommandExecutor, ExitInfo};
use crate::queue::ArchiveQueue;
use crate::recording::{NoRecordings, RecordingSignal};
use crate::selector::{self, DEFAULT_EXCLUDED_DIR_NAMES, MOVIE_EXTENSIONS};
use chrono::Utc;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, error, info};

/// Hard cap on candidates considered per run, bounding worst-case run time
/// regardless of the limit checks.
pub const MAX_TRIES: u32 = 50;

/// Guard window: archiving is suppressed when a recording is scheduled to
/// start within this many seconds.
pub const NEXT_RECORD_GUARD_SECS: i64 = 600;

/// Validates run preconditions, selects candidate files under dual capacity
/// constraints and delegates execution to the [`ArchiveQueue`].
pub struct ArchiveEngine {
    config: ArchiverConfig,
    disk: Box<dyn DiskSpace>,
    recordings: Box<dyn RecordingSignal>,
    events: Arc<EventBus>,
    queue: ArchiveQueue,
}

impl ArchiveEngine {
    pub fn new(config: ArchiverConfig, events: Arc<EventBus>) -> Self {
        let queue = ArchiveQueue::new(events.clone());
        Self {
            config,
            disk: Box::new(SystemDisk),
            recordings: Box::new(NoRecordings),
            events,
            queue,
        }
    }

    pub fn with_disk(mut self, disk: Box<dyn DiskSpace>) -> Self {
        self.disk = disk;
        self
    }

    pub fn with_recording_signal(mut self, recordings: Box<dyn RecordingSignal>) -> Self {
        self.recordings = recordings;
        self
    }

    pub fn config(&self) -> &ArchiverConfig {
        &self.config
    }

    pub fn queue(&self) -> &ArchiveQueue {
        &self.queue
    }

    /// True while a move or copy is bound to the external executor.
    pub fn is_running(&self) -> bool {
        self.queue.is_running()
    }

    /// One archiving/backup run. Precondition failures abort cleanly with an
    /// alert; nothing escapes to the caller.
    pub fn start_archiving(&mut self, executor: &mut dyn CommandExecutor) {
        let source = self.config.source_path.clone();
        let target = self.config.target_path.clone();

        if self.disk.mount_point(&source) == self.disk.mount_point(&target) {
            self.alert(
                "Stop archiving!\nCan't archive movies to the same hard drive!\n\
                 Please change the paths in the MovieArchiver settings.",
                10,
            );
            return;
        }

        if !self.config.backup_mode && self.config.skip_during_records && self.recording_imminent()
        {
            self.alert(
                "Skip archiving!\nA record is running or starts in the next minutes.",
                10,
            );
            return;
        }

        if self
            .disk
            .is_below_limit(&target, self.config.target_limit_gb)
        {
            let msg = "Stop archiving!\nCan't archive movie because archive-harddisk limit is reached!";
            info!("{}", msg);
            if self.config.show_limit_reached_notification {
                self.alert(msg, 20);
            }
            return;
        }

        if self.config.backup_mode {
            self.backup_files(&source, &target, executor);
        } else {
            self.archive_movies(&source, &target, executor);
        }
    }

    /// Clears the pending queue. The move or copy currently running in the
    /// external executor is not cancelled.
    pub fn stop_archiving(&mut self) {
        if self.queue.is_running() {
            self.queue.clear();
        }
    }

    /// Completion signal for the in-flight command, forwarded to the queue.
    pub fn on_process_completed(&mut self, executor: &mut dyn CommandExecutor, exit: ExitInfo) {
        self.queue.on_process_completed(executor, exit);
    }

    /// A recording is imminent when one is running now or the next scheduled
    /// start falls inside the guard window. A negative next-start time means
    /// nothing is scheduled.
    fn recording_imminent(&self) -> bool {
        if self.recordings.recording_count() > 0 {
            return true;
        }
        let next = self.recordings.next_recording_start_secs();
        next >= 0 && next - Utc::now().timestamp() <= NEXT_RECORD_GUARD_SECS
    }

    /// Archive mode: demand-driven. Only runs when the source has dropped
    /// below its limit, then walks the oldest-first candidates until moving
    /// the accumulated total would satisfy the source limit, push the target
    /// past its own bound, or hit the iteration cap.
    fn archive_movies(&mut self, source: &Path, target: &Path, executor: &mut dyn CommandExecutor) {
        if !self
            .disk
            .is_below_limit(source, self.config.source_limit_gb)
        {
            self.alert("Limit not reached. Waiting for the next event.", 5);
            return;
        }

        let files = selector::files_oldest_first(source, MOVIE_EXTENSIONS);
        if files.is_empty() {
            debug!("No candidate movies found in {}", source.display());
            return;
        }

        let mut tries = 0u32;
        let mut total_mb = 0u64;
        for file in &files {
            total_mb += file_size_mb(file);
            // Source disk: is moving the batch up to this file already enough?
            let source_satisfied =
                self.disk
                    .would_exceed_limit_if_moved(source, self.config.source_limit_gb, total_mb);
            self.enqueue_move(file, target);
            if source_satisfied || tries > MAX_TRIES {
                break;
            }
            // Target disk: stop before the batch pushes the archive below its
            // own free-space bound.
            if !self
                .disk
                .would_exceed_limit_if_moved(target, self.config.target_limit_gb, total_mb)
            {
                break;
            }
            tries += 1;
        }

        self.alert("Start archiving.", 5);
        self.queue.run_next(executor);
    }

    /// Backup mode: differential sync. Copies every source file absent from
    /// the target index or present with a differing size fingerprint.
    fn backup_files(&mut self, source: &Path, target: &Path, executor: &mut dyn CommandExecutor) {
        if !self.disk.is_writable(target) {
            self.alert(
                "Backup target folder is not writable.\nPlease check the permissions.",
                10,
            );
            return;
        }

        let source_index =
            selector::build_file_index(source, DEFAULT_EXCLUDED_DIR_NAMES, &self.config.exclude_dirs);
        if source_index.is_empty() {
            self.alert("No files for backup found.", 10);
            return;
        }

        self.alert("Backup archive: synchronization started.", 5);
        let target_index = selector::build_file_index(target, DEFAULT_EXCLUDED_DIR_NAMES, &[]);

        for (relative, source_file) in &source_index {
            match target_index.get(relative) {
                None => {
                    debug!("File is new, adding to backup: {}", source_file.display());
                    self.enqueue_copy(source_file, source, target);
                }
                Some(target_file) => {
                    if fingerprints_differ(source_file, target_file) {
                        debug!(
                            "File is different, adding to backup: {}",
                            source_file.display()
                        );
                        self.enqueue_copy(source_file, source, target);
                    }
                }
            }
        }

        if self.queue.is_empty() {
            self.queue.finish_empty();
        } else {
            self.queue.run_next(executor);
        }
    }

    /// Queue a move of the movie plus its sidecar files: the command globs on
    /// the basename without extension so subtitles and metadata travel along.
    fn enqueue_move(&mut self, movie: &Path, target: &Path) {
        if !target.is_dir() || movie.parent() == Some(target) || !self.disk.is_writable(target) {
            return;
        }
        let base = movie.with_extension("");
        let command = format!("mv \"{}.\"* \"{}\"", base.display(), target.display());
        self.queue.enqueue(command);
    }

    /// Queue a copy of a single file, recreating its relative subdirectory
    /// under the target.
    fn enqueue_copy(&mut self, source_file: &Path, source_root: &Path, target: &Path) {
        if !target.is_dir()
            || source_file.parent() == Some(target)
            || !self.disk.is_writable(target)
        {
            return;
        }
        let relative = source_file.strip_prefix(source_root).unwrap_or(source_file);
        let destination = target.join(relative);
        if let Some(folder) = destination.parent() {
            if !folder.exists() {
                if let Err(err) = fs::create_dir_all(folder) {
                    error!(
                        "Could not create backup folder {}: {}",
                        folder.display(),
                        err
                    );
                    return;
                }
            }
        }
        let command = format!(
            "cp \"{}\" \"{}\"",
            source_file.display(),
            destination.display()
        );
        self.queue.enqueue(command);
    }

    fn alert(&self, message: &str, timeout_secs: u32) {
        self.events.emit(ArchiverEvent::ShowAlert {
            message: message.to_string(),
            timeout_secs,
        });
    }
}

/// Size-fingerprint comparison for sync. Unreadable metadata counts as a
/// difference; copying again is harmless.
fn fingerprints_differ(a: &Path, b: &Path) -> bool {
    match (
        selector::content_fingerprint(a),
        selector::content_fingerprint(b),
    ) {
        (Ok(fa), Ok(fb)) => fa != fb,
        _ => true,
    }
}

fn file_size_mb(path: &Path) -> u64 {
    fs::metadata(path).map(|meta| meta.len() / 1024 / 1024).unwrap_or(0)
}
