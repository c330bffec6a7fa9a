//! End-to-end `chapters` pipeline: scan → classify → emit → render.

use std::time::Instant;

use chrono::Utc;
use tracing::{info, instrument};

use coursebook_render::Renderer;
use coursebook_shared::{
    ChapterOutcome, ChaptersConfig, ChaptersReport, CoursebookError, NamingConvention, Result,
    ToolsConfig,
};

use crate::classifier::classify_sources;
use crate::emitter::{EmitConfig, emit_chapters};
use crate::scanner::scan_chapters;

/// Progress callback for reporting pipeline status.
pub trait ProgressReporter {
    /// Called when entering a new phase.
    fn phase(&self, name: &str);
    /// Called after each chapter has been written and rendered.
    fn chapter_emitted(&self, outcome: &ChapterOutcome, current: usize, total: usize);
    /// Called when the pipeline completes.
    fn done(&self, report: &ChaptersReport);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn phase(&self, _name: &str) {}
    fn chapter_emitted(&self, _outcome: &ChapterOutcome, _current: usize, _total: usize) {}
    fn done(&self, _report: &ChaptersReport) {}
}

/// Run the full chapter-assembly pipeline.
///
/// 1. Scan `source_root` for chapter directories
/// 2. Classify each chapter's source files
/// 3. Write the manifest and one intermediate document per chapter
/// 4. Render each document through `renderer`
#[instrument(skip_all, fields(source_root = %chapters.source_root.display()))]
pub fn build_chapters(
    chapters: &ChaptersConfig,
    tools: &ToolsConfig,
    renderer: &dyn Renderer,
    progress: &dyn ProgressReporter,
) -> Result<ChaptersReport> {
    let start = Instant::now();
    let naming = NamingConvention::try_from(chapters)?;
    tools.validate()?;

    progress.phase("Scanning chapter directories");
    let dirs = scan_chapters(&chapters.source_root, &naming, chapters.ordering)?;
    info!(chapters = dirs.len(), "chapter directories found");

    progress.phase("Classifying source files");
    let sources = classify_sources(&dirs, &naming, chapters.ordering)?;
    info!(
        chapters = sources.len(),
        files = sources.file_count(),
        "source files classified"
    );

    progress.phase("Generating chapter documents");
    std::fs::create_dir_all(&chapters.output_dir)
        .map_err(|e| CoursebookError::io(&chapters.output_dir, e))?;

    let emit_config = EmitConfig::new(chapters, tools);
    let outcomes = emit_chapters(&emit_config, &sources, renderer, progress)?;

    let report = ChaptersReport {
        source_root: chapters.source_root.clone(),
        output_dir: chapters.output_dir.clone(),
        manifest: emit_config.manifest_path(),
        generated_at: Utc::now(),
        chapters: outcomes,
    };

    progress.done(&report);

    info!(
        chapters = report.chapters.len(),
        rendered = report.rendered(),
        failed = report.failed(),
        elapsed_ms = start.elapsed().as_millis(),
        "chapters pipeline complete"
    );

    Ok(report)
}
