//! Scanner module - builds the complete task list before any check starts

use std::collections::HashSet;
use std::path::Path;
use walkdir::WalkDir;

use crate::error::{ScanError, ScanErrorKind};
use crate::models::{extension_of, Task};

/// Walk `root` and collect every file whose extension is in `allow_list`.
///
/// With `recursive == false` only the direct children of `root` are looked
/// at. Unreadable subdirectories are logged and skipped; an unreadable root
/// is an error.
pub fn scan(
    root: &Path,
    recursive: bool,
    allow_list: &HashSet<String>,
) -> Result<Vec<Task>, ScanError> {
    let metadata =
        std::fs::metadata(root).map_err(|e| ScanError::from(e).with_path(root.to_path_buf()))?;
    if !metadata.is_dir() {
        return Err(ScanError::invalid_path(root.to_path_buf()));
    }
    // fail early on a root we can stat but not list
    std::fs::read_dir(root).map_err(|e| ScanError::from(e).with_path(root.to_path_buf()))?;

    let max_depth = if recursive { usize::MAX } else { 1 };
    let walker = WalkDir::new(root)
        .min_depth(1)
        .max_depth(max_depth)
        .follow_links(false)
        .sort_by_file_name();

    let mut tasks = Vec::new();
    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                let kind = if e.io_error().map(|e| e.kind())
                    == Some(std::io::ErrorKind::PermissionDenied)
                {
                    ScanErrorKind::PermissionDenied
                } else {
                    ScanErrorKind::IoError
                };
                let err = ScanError::new(kind, e.path().map(|p| p.to_path_buf()), e.to_string());
                log::warn!("Skipping entry: {}", err);
                continue;
            }
        };

        if entry.file_type().is_dir() {
            continue;
        }

        let path = entry.path();
        if is_target_file(path, allow_list) {
            tasks.push(Task::new(path.to_path_buf()));
        }
    }

    log::debug!("Found {} files to check under {}", tasks.len(), root.display());
    Ok(tasks)
}

/// Whether the file's lowercase extension is in the allow-list
pub fn is_target_file(path: &Path, allow_list: &HashSet<String>) -> bool {
    extension_of(path).is_some_and(|ext| allow_list.contains(&ext))
}
