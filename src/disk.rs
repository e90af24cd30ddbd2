use nix::sys::statvfs::statvfs;
use nix::unistd::{access, AccessFlags};
use std::fs;
use std::os::unix::fs::MetadataExt;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Free-space measurement and threshold policy for a volume.
///
/// The three primitive operations hit the live filesystem and are overridable
/// for tests; the limit checks are derived from `free_space_mb` and use
/// integer-floor arithmetic on purpose. The selection logic in the engine was
/// tuned against exactly this granularity, so a volume at 1535 MB free reads
/// as below a 2 GB limit.
pub trait DiskSpace {
    /// Free space on the volume containing `path` in MB. A missing path
    /// reports 0, which blocks archiving instead of raising an error.
    fn free_space_mb(&self, path: &Path) -> u64;

    /// Walks from the symlink-resolved location of `path` upward until a
    /// mount boundary or the filesystem root is reached.
    fn mount_point(&self, path: &Path) -> PathBuf;

    /// True iff the containing directory of `path` exists, sits under a
    /// recognized mount point and is writable by the current process.
    fn is_writable(&self, path: &Path) -> bool;

    /// Human-readable free space, switching to GB at 10 GiB.
    fn free_space_label(&self, path: &Path) -> String {
        let free = self.free_space_mb(path);
        if free >= 10 * 1024 {
            format!("{} GB", free / 1024)
        } else {
            format!("{} MB", free)
        }
    }

    /// True iff free space has dropped below `limit_gb` (whole GB).
    fn is_below_limit(&self, path: &Path, limit_gb: u64) -> bool {
        limit_gb > self.free_space_mb(path) / 1024
    }

    /// True iff freeing `incoming_mb` would land the volume at or above
    /// `limit_gb`. Used both to stop feeding the source during dry accounting
    /// and to ensure the destination will not overflow.
    fn would_exceed_limit_if_moved(&self, path: &Path, limit_gb: u64, incoming_mb: u64) -> bool {
        self.free_space_mb(path) + incoming_mb >= limit_gb * 1024
    }
}

/// `DiskSpace` backed by `statvfs` and the live filesystem.
pub struct SystemDisk;

impl DiskSpace for SystemDisk {
    fn free_space_mb(&self, path: &Path) -> u64 {
        if !path.exists() {
            return 0;
        }
        match statvfs(path) {
            Ok(stat) => {
                // prefer blocks available to unprivileged users, some
                // filesystems report 0 there and only fill f_bfree
                let blocks = if stat.blocks_available() != 0 {
                    stat.blocks_available()
                } else {
                    stat.blocks_free()
                };
                blocks as u64 * stat.block_size() as u64 / 1024 / 1024
            }
            Err(err) => {
                debug!("statvfs failed for {}: {}", path.display(), err);
                0
            }
        }
    }

    fn mount_point(&self, path: &Path) -> PathBuf {
        let mut current = fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
        loop {
            if current.as_os_str().is_empty() || is_mount(&current) {
                return current;
            }
            match current.parent() {
                Some(parent) => current = parent.to_path_buf(),
                None => return current,
            }
        }
    }

    fn is_writable(&self, path: &Path) -> bool {
        let dir = if path.is_file() {
            match path.parent() {
                Some(parent) => parent.to_path_buf(),
                None => return false,
            }
        } else {
            path.to_path_buf()
        };
        dir.is_dir() && self.mount_point(&dir).is_dir() && access(&dir, AccessFlags::W_OK).is_ok()
    }
}

/// A directory is a mount boundary when its device number differs from its
/// parent's, or when it is its own parent (the root).
fn is_mount(path: &Path) -> bool {
    let meta = match fs::metadata(path) {
        Ok(meta) => meta,
        Err(_) => return false,
    };
    if !meta.is_dir() {
        return false;
    }
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => return true,
    };
    match fs::metadata(parent) {
        Ok(parent_meta) => parent_meta.dev() != meta.dev() || parent_meta.ino() == meta.ino(),
        Err(_) => false,
    }
}
