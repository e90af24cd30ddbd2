pub mod config;
pub mod controller;
pub mod disk;
pub mod engine;
pub mod error;
pub mod events;
pub mod process;
pub mod queue;
pub mod recording;
pub mod selector;

pub use config::ArchiverConfig;
pub use controller::NotificationController;
pub use disk::{DiskSpace, SystemDisk};
pub use engine::ArchiveEngine;
pub use error::Error;
pub use events::{ArchiverEvent, EventBus};
pub use process::{CommandExecutor, ExitInfo, ShellExecutor};
pub use queue::ArchiveQueue;
pub use recording::{NoRecordings, RecordingSignal};
