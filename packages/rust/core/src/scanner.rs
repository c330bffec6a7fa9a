//! Chapter directory discovery.

use std::path::Path;

use tracing::{debug, instrument};

use coursebook_shared::{
    ChapterDirectorySet, ChapterId, CoursebookError, NamingConvention, Ordering, Result,
};

/// Collect every immediate subdirectory of `root` whose name marks a chapter.
///
/// Files and non-matching directories are skipped silently. A missing or
/// unreadable `root` is an error. With [`Ordering::Filesystem`] the result
/// follows directory enumeration order, which is platform dependent.
#[instrument(skip_all, fields(root = %root.display(), ?ordering))]
pub fn scan_chapters(
    root: &Path,
    naming: &NamingConvention,
    ordering: Ordering,
) -> Result<ChapterDirectorySet> {
    let entries = std::fs::read_dir(root).map_err(|e| CoursebookError::io(root, e))?;

    let mut chapters = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| CoursebookError::io(root, e))?;
        let path = entry.path();

        // `Path::is_dir` follows symlinks, so linked chapters are included.
        if !path.is_dir() {
            continue;
        }

        let Some(name) = entry.file_name().to_str().map(str::to_owned) else {
            debug!(path = %path.display(), "skipping non UTF-8 directory name");
            continue;
        };

        if naming.is_chapter(&name) {
            debug!(chapter = %name, "found chapter directory");
            chapters.push((ChapterId::new(name), root.join(entry.file_name())));
        }
    }

    if ordering == Ordering::Alphabetical {
        chapters.sort_by(|a, b| a.0.cmp(&b.0));
    }

    Ok(chapters.into_iter().collect())
}
