//! Directory scanning and the eligibility filter.

use super::TransferItem;
use crate::error::{FilesystemError, TerraError};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

/// Extensions accepted for upload, compared case-insensitively.
pub const ELIGIBLE_EXTENSIONS: [&str; 5] = ["jpg", "jpeg", "dng", "heic", "heif"];

/// Returns true if the file extension is one of [`ELIGIBLE_EXTENSIONS`].
pub fn is_eligible(path: impl AsRef<Path>) -> bool {
    path.as_ref()
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            ELIGIBLE_EXTENSIONS
                .iter()
                .any(|eligible| ext.eq_ignore_ascii_case(eligible))
        })
        .unwrap_or(false)
}

/// List every regular file under `root` as a `/`-separated relative path.
///
/// Symbolic links are neither reported nor descended into. Files whose path
/// is not valid UTF-8 cannot become storage keys and are skipped with a
/// warning. Entries are visited in file name order, so the result is stable
/// for an unchanged tree.
pub fn scan_directory(root: &Path) -> Result<Vec<String>, TerraError> {
    if !root.is_dir() {
        return Err(FilesystemError::NotADirectory {
            path: root.to_path_buf(),
        }
        .into());
    }

    let mut files = Vec::new();
    let walker = WalkDir::new(root)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter();

    for entry in walker {
        let entry = entry.map_err(|e| FilesystemError::Walk {
            message: e.to_string(),
        })?;
        if !entry.file_type().is_file() {
            continue;
        }
        let relative = entry
            .path()
            .strip_prefix(root)
            .map_err(|e| FilesystemError::Walk {
                message: e.to_string(),
            })?;
        match to_key_path(relative) {
            Ok(key) => files.push(key),
            Err(e) => warn!(error = %e, "Skipping file"),
        }
    }

    debug!(root = %root.display(), files = files.len(), "Scanned directory");
    Ok(files)
}

/// Scan `root` off the async runtime and keep only eligible files.
pub async fn scan_eligible(root: impl Into<PathBuf>) -> Result<Vec<TransferItem>, TerraError> {
    let root = root.into();
    let scan_root = root.clone();
    let files = tokio::task::spawn_blocking(move || scan_directory(&scan_root))
        .await
        .map_err(|e| FilesystemError::Walk {
            message: e.to_string(),
        })??;

    let total = files.len();
    let items: Vec<TransferItem> = files
        .into_iter()
        .filter(|relative| is_eligible(relative))
        .map(|relative| TransferItem::new(&root, relative))
        .collect();

    debug!(
        total = total,
        eligible = items.len(),
        skipped = total - items.len(),
        "Filtered eligible files"
    );
    Ok(items)
}

fn to_key_path(relative: &Path) -> Result<String, FilesystemError> {
    let parts = relative
        .components()
        .map(|c| c.as_os_str().to_str())
        .collect::<Option<Vec<_>>>()
        .ok_or_else(|| FilesystemError::NonUtf8Path {
            path: relative.to_path_buf(),
        })?;
    Ok(parts.join("/"))
}
