//! Chapter document emission.
//!
//! For every classified chapter this writes one line to the aggregation
//! manifest, writes the chapter's intermediate markdown document and hands
//! it to a [`Renderer`]:
//!
//! ```text
//! <output_dir>/
//! ├── cpp_chapters.tex     \input{ch_intro}, \input{ch_loops}, ...
//! ├── ch_intro.md          heading + one fenced include per source file
//! ├── ch_intro.tex         render target
//! └── ...
//! ```

use std::fmt::Write as _;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, info, instrument, warn};

use coursebook_render::Renderer;
use coursebook_shared::{
    ChapterId, ChapterOutcome, ChapterSourceMap, ChaptersConfig, CoursebookError,
    INTERMEDIATE_EXTENSION, RenderStatus, Result, ToolsConfig,
};

use crate::pipeline::ProgressReporter;

/// Where and how chapter documents are written.
#[derive(Debug, Clone)]
pub struct EmitConfig {
    /// Prefix of every include path, as given (not canonicalized).
    pub source_root: PathBuf,
    pub output_dir: PathBuf,
    pub manifest_name: String,
    pub code_language: String,
    pub render_extension: String,
}

impl EmitConfig {
    pub fn new(chapters: &ChaptersConfig, tools: &ToolsConfig) -> Self {
        Self {
            source_root: chapters.source_root.clone(),
            output_dir: chapters.output_dir.clone(),
            manifest_name: chapters.manifest_name.clone(),
            code_language: chapters.code_language.clone(),
            render_extension: tools.render_extension.clone(),
        }
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.output_dir.join(&self.manifest_name)
    }

    pub fn intermediate_path(&self, chapter: &ChapterId) -> PathBuf {
        self.output_dir
            .join(format!("{chapter}.{INTERMEDIATE_EXTENSION}"))
    }

    pub fn target_path(&self, chapter: &ChapterId) -> PathBuf {
        self.output_dir
            .join(format!("{chapter}.{}", self.render_extension))
    }
}

/// Emit every chapter in `sources`, in map order.
///
/// Manifest I/O failures abort the run. A chapter whose document cannot be
/// written or rendered is logged and recorded as failed, and the remaining
/// chapters are still processed.
#[instrument(skip_all, fields(chapters = sources.len(), output_dir = %config.output_dir.display()))]
pub fn emit_chapters(
    config: &EmitConfig,
    sources: &ChapterSourceMap,
    renderer: &dyn Renderer,
    progress: &dyn ProgressReporter,
) -> Result<Vec<ChapterOutcome>> {
    let manifest_path = config.manifest_path();
    let file = File::create(&manifest_path).map_err(|e| CoursebookError::io(&manifest_path, e))?;
    let mut manifest = BufWriter::new(file);

    let total = sources.len();
    let mut outcomes = Vec::with_capacity(total);

    for (i, (chapter, files)) in sources.iter().enumerate() {
        writeln!(manifest, "\\input{{{chapter}}}")
            .map_err(|e| CoursebookError::io(&manifest_path, e))?;

        info!(%chapter, files = files.len(), "generating chapter document");
        let outcome = emit_chapter(config, chapter, files, renderer);
        progress.chapter_emitted(&outcome, i + 1, total);
        outcomes.push(outcome);
    }

    manifest
        .flush()
        .map_err(|e| CoursebookError::io(&manifest_path, e))?;
    debug!(path = %manifest_path.display(), "wrote manifest");

    Ok(outcomes)
}

/// Write and render one chapter, folding any failure into the outcome.
fn emit_chapter(
    config: &EmitConfig,
    chapter: &ChapterId,
    files: &[String],
    renderer: &dyn Renderer,
) -> ChapterOutcome {
    let intermediate = config.intermediate_path(chapter);
    let target = config.target_path(chapter);

    let document = chapter_document(&config.source_root, chapter, files, &config.code_language);

    let status = match std::fs::write(&intermediate, document) {
        Ok(()) => renderer.render(chapter, &intermediate, &target),
        Err(e) => {
            let err = CoursebookError::io(&intermediate, e);
            warn!(%chapter, error = %err, "failed to write chapter document");
            RenderStatus::Failed {
                reason: err.to_string(),
            }
        }
    };

    ChapterOutcome {
        chapter: chapter.clone(),
        source_count: files.len(),
        intermediate,
        target,
        status,
    }
}

/// Build the intermediate markdown for one chapter.
///
/// Each source file gets its own fenced block holding a single `gpp`
/// include directive, so the preprocessor splices the code in verbatim.
pub fn chapter_document(
    source_root: &Path,
    chapter: &ChapterId,
    files: &[String],
    code_language: &str,
) -> String {
    let mut doc = format!("# {chapter} #\n\n");

    for file in files {
        let include = source_root.join(chapter.as_str()).join(file);
        let _ = write!(
            doc,
            "```{code_language}\n<#include \"{}\">\n```\n\n",
            include.display()
        );
    }

    doc
}
