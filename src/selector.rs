use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::error;
use walkdir::WalkDir;

/// File extensions eligible for archiving or backup.
pub const MOVIE_EXTENSIONS: &[&str] = &[".ts", ".avi", ".mkv", ".mp4", ".iso"];

/// Trash-like directory names skipped during index traversal.
pub const DEFAULT_EXCLUDED_DIR_NAMES: &[&str] = &[".Trash", "trashcan"];

/// Non-recursive, unsorted listing. Enumeration failures degrade to an empty
/// result instead of surfacing to the caller.
pub fn list_files(dir: &Path) -> Vec<PathBuf> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(err) => {
            error!("Error reading directory {}: {}", dir.display(), err);
            return Vec::new();
        }
    };
    entries
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry.path()),
            Err(err) => {
                error!("Error reading entry in {}: {}", dir.display(), err);
                None
            }
        })
        .collect()
}

/// Case-insensitive suffix match against an extension allow-list. An empty
/// list passes everything through.
pub fn filter_by_extension(files: Vec<PathBuf>, extensions: &[&str]) -> Vec<PathBuf> {
    if extensions.is_empty() {
        return files;
    }
    files
        .into_iter()
        .filter(|file| {
            let name = file.to_string_lossy().to_lowercase();
            extensions.iter().any(|ext| name.ends_with(ext))
        })
        .collect()
}

/// Oldest matching file in a single directory, by modification time.
pub fn oldest_file(dir: &Path, extensions: &[&str]) -> Option<PathBuf> {
    filter_by_extension(list_files(dir), extensions)
        .into_iter()
        .min_by_key(|file| modified_at(file))
}

/// Matching files sorted ascending by modification time. The oldest eligible
/// media is archived before newer media.
pub fn files_oldest_first(dir: &Path, extensions: &[&str]) -> Vec<PathBuf> {
    let mut files = filter_by_extension(list_files(dir), extensions);
    files.sort_by_key(|file| modified_at(file));
    files
}

/// Recursive index of `root`, keyed by the path relative to `root`.
///
/// Directories whose base name appears in `excluded_dir_names` are pruned
/// whole; files whose parent directory (normalized with a trailing separator)
/// starts with any of `excluded_path_prefixes` are skipped individually.
pub fn build_file_index(
    root: &Path,
    excluded_dir_names: &[&str],
    excluded_path_prefixes: &[PathBuf],
) -> HashMap<String, PathBuf> {
    let mut index = HashMap::new();
    let walker = WalkDir::new(root).into_iter().filter_entry(|entry| {
        !(entry.file_type().is_dir()
            && excluded_dir_names
                .iter()
                .any(|name| entry.file_name() == std::ffi::OsStr::new(name)))
    });
    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                error!("Error walking {}: {}", root.display(), err);
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }
        if let Some(dir) = entry.path().parent() {
            let mut dir_str = dir.to_string_lossy().into_owned();
            if !dir_str.ends_with('/') {
                dir_str.push('/');
            }
            if excluded_path_prefixes
                .iter()
                .any(|prefix| dir_str.starts_with(&*prefix.to_string_lossy()))
            {
                continue;
            }
        }
        let relative = entry.path().strip_prefix(root).unwrap_or(entry.path());
        index.insert(
            relative.to_string_lossy().into_owned(),
            entry.path().to_path_buf(),
        );
    }
    index
}

/// Cheap equality proxy for sync comparison: the file's byte size rendered as
/// a string. Opening large recordings to hash their content is too slow on
/// the target hardware, so two files of equal size count as equal. A false
/// "equal" for same-size, different-content files is an accepted risk.
pub fn content_fingerprint(path: &Path) -> io::Result<String> {
    Ok(fs::metadata(path)?.len().to_string())
}

/// Drops symbolic links from a path list. Used to sanitize user-chosen
/// exclusion lists before persisting them.
pub fn remove_symlinks(paths: &[PathBuf]) -> Vec<PathBuf> {
    paths
        .iter()
        .filter(|path| {
            !path
                .symlink_metadata()
                .map(|meta| meta.file_type().is_symlink())
                .unwrap_or(false)
        })
        .cloned()
        .collect()
}

fn modified_at(path: &Path) -> SystemTime {
    fs::metadata(path)
        .and_then(|meta| meta.modified())
        .unwrap_or(UNIX_EPOCH)
}
