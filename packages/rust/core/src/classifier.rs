//! Source file classification per chapter.

use tracing::{debug, instrument, warn};

use coursebook_shared::{
    ChapterDirectorySet, ChapterSourceMap, CoursebookError, NamingConvention, Ordering, Result,
};

/// List the source files of every chapter.
///
/// Only regular files directly inside the chapter directory are considered.
/// Chapters without any source file are left out of the result entirely.
#[instrument(skip_all, fields(chapters = chapters.len()))]
pub fn classify_sources(
    chapters: &ChapterDirectorySet,
    naming: &NamingConvention,
    ordering: Ordering,
) -> Result<ChapterSourceMap> {
    let mut classified = Vec::with_capacity(chapters.len());

    for (chapter, dir) in chapters.iter() {
        let entries = std::fs::read_dir(dir).map_err(|e| CoursebookError::io(dir, e))?;

        let mut files = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| CoursebookError::io(dir, e))?;
            if !entry.path().is_file() {
                continue;
            }

            let file_name = entry.file_name();
            let Some(name) = file_name.to_str() else {
                // Include directives are text, so such a file cannot be referenced.
                warn!(%chapter, file = %file_name.to_string_lossy(), "skipping non UTF-8 file name");
                continue;
            };

            if naming.is_source(name) {
                files.push(name.to_owned());
            } else if naming.is_backup(name) {
                debug!(%chapter, file = %name, "skipping backup file");
            }
        }

        if ordering == Ordering::Alphabetical {
            files.sort();
        }

        debug!(%chapter, count = files.len(), "classified sources");
        classified.push((chapter.clone(), files));
    }

    Ok(classified.into_iter().collect())
}
