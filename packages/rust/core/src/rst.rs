//! Bulk markdown → reStructuredText conversion for the Sphinx docs tree.

use std::path::{Path, PathBuf};

use tracing::{info, instrument, warn};
use walkdir::WalkDir;

use coursebook_render::{ToolCommand, run_tool};
use coursebook_shared::{CoursebookError, Result};

/// Default converter invocation: `pandoc -s <file>.md -o <file>.rst`.
pub fn default_rst_converter() -> ToolCommand {
    ToolCommand::new("pandoc", ["-s", "{input}", "-o", "{output}"])
}

/// Files converted and files that failed during a tree conversion.
#[derive(Debug, Default)]
pub struct ConversionSummary {
    pub converted: Vec<PathBuf>,
    pub failed: Vec<(PathBuf, String)>,
}

/// Convert every `*.md` under `root` to a sibling `*.rst`.
///
/// A file that fails to convert is logged and recorded; the walk continues.
#[instrument(skip_all, fields(root = %root.display()))]
pub fn convert_markdown_tree(root: &Path, converter: &ToolCommand) -> Result<ConversionSummary> {
    if !root.is_dir() {
        return Err(CoursebookError::validation(format!(
            "{} is not a directory",
            root.display()
        )));
    }

    let mut summary = ConversionSummary::default();

    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!(error = %e, "skipping unreadable entry");
                continue;
            }
        };

        let md = entry.path();
        if !entry.file_type().is_file() || md.extension().is_none_or(|ext| ext != "md") {
            continue;
        }

        let rst = md.with_extension("rst");
        info!(from = %md.display(), to = %rst.display(), "converting");

        match run_tool(&converter.program, converter.command(md, &rst)) {
            Ok(_) => summary.converted.push(md.to_path_buf()),
            Err(e) => {
                warn!(file = %md.display(), error = %e, "conversion failed");
                summary.failed.push((md.to_path_buf(), e.to_string()));
            }
        }
    }

    Ok(summary)
}
