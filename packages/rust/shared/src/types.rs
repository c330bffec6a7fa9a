//! Core domain types for chapter assembly.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// ChapterId
// ---------------------------------------------------------------------------

/// A chapter identifier: the base name of its directory (e.g., `ch_loops`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChapterId(String);

impl ChapterId {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ChapterId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ChapterId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

// ---------------------------------------------------------------------------
// ChapterDirectorySet
// ---------------------------------------------------------------------------

/// Chapter directories found under a source root, keyed by chapter id.
///
/// Iteration follows insertion order, which is whatever order the scanner
/// produced them in.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChapterDirectorySet {
    dirs: IndexMap<ChapterId, PathBuf>,
}

impl ChapterDirectorySet {
    pub fn get(&self, chapter: &ChapterId) -> Option<&Path> {
        self.dirs.get(chapter).map(PathBuf::as_path)
    }

    pub fn contains(&self, chapter: &ChapterId) -> bool {
        self.dirs.contains_key(chapter)
    }

    pub fn len(&self) -> usize {
        self.dirs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dirs.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ChapterId, &Path)> {
        self.dirs.iter().map(|(id, path)| (id, path.as_path()))
    }
}

impl FromIterator<(ChapterId, PathBuf)> for ChapterDirectorySet {
    fn from_iter<I: IntoIterator<Item = (ChapterId, PathBuf)>>(iter: I) -> Self {
        Self {
            dirs: iter.into_iter().collect(),
        }
    }
}

// ---------------------------------------------------------------------------
// ChapterSourceMap
// ---------------------------------------------------------------------------

/// Source file names per chapter, in classification order.
///
/// A chapter with no source files is never stored: building the map from an
/// iterator drops empty entries.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChapterSourceMap {
    sources: IndexMap<ChapterId, Vec<String>>,
}

impl ChapterSourceMap {
    pub fn get(&self, chapter: &ChapterId) -> Option<&[String]> {
        self.sources.get(chapter).map(Vec::as_slice)
    }

    pub fn contains(&self, chapter: &ChapterId) -> bool {
        self.sources.contains_key(chapter)
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    pub fn chapters(&self) -> impl Iterator<Item = &ChapterId> {
        self.sources.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ChapterId, &[String])> {
        self.sources.iter().map(|(id, files)| (id, files.as_slice()))
    }

    /// Total number of source files across all chapters.
    pub fn file_count(&self) -> usize {
        self.sources.values().map(Vec::len).sum()
    }
}

impl FromIterator<(ChapterId, Vec<String>)> for ChapterSourceMap {
    fn from_iter<I: IntoIterator<Item = (ChapterId, Vec<String>)>>(iter: I) -> Self {
        Self {
            sources: iter
                .into_iter()
                .filter(|(_, files)| !files.is_empty())
                .collect(),
        }
    }
}

// ---------------------------------------------------------------------------
// Emission results
// ---------------------------------------------------------------------------

/// What happened when a chapter's intermediate document was rendered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RenderStatus {
    /// Both tools ran and exited successfully.
    Rendered,
    /// Rendering was disabled for this run.
    Skipped,
    /// A tool could not be started or exited unsuccessfully.
    Failed { reason: String },
}

impl RenderStatus {
    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }
}

/// Result of emitting one chapter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChapterOutcome {
    pub chapter: ChapterId,
    /// Number of source files included in the intermediate document.
    pub source_count: usize,
    /// Path of the generated intermediate markdown document.
    pub intermediate: PathBuf,
    /// Path the converter was asked to write.
    pub target: PathBuf,
    #[serde(flatten)]
    pub status: RenderStatus,
}

/// Summary of a full `chapters` run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChaptersReport {
    pub source_root: PathBuf,
    pub output_dir: PathBuf,
    pub manifest: PathBuf,
    pub generated_at: DateTime<Utc>,
    pub chapters: Vec<ChapterOutcome>,
}

impl ChaptersReport {
    pub fn rendered(&self) -> usize {
        self.count(|s| matches!(s, RenderStatus::Rendered))
    }

    pub fn skipped(&self) -> usize {
        self.count(|s| matches!(s, RenderStatus::Skipped))
    }

    pub fn failed(&self) -> usize {
        self.count(RenderStatus::is_failed)
    }

    fn count(&self, pred: impl Fn(&RenderStatus) -> bool) -> usize {
        self.chapters.iter().filter(|c| pred(&c.status)).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn source_map_drops_empty_chapters() {
        let map: ChapterSourceMap = [
            (ChapterId::from("ch_intro"), vec!["main.cpp".to_string()]),
            (ChapterId::from("ch_empty"), vec![]),
        ]
        .into_iter()
        .collect();

        assert_eq!(map.len(), 1);
        assert!(map.contains(&"ch_intro".into()));
        assert!(!map.contains(&"ch_empty".into()));
    }

    #[test]
    fn directory_set_preserves_insertion_order() {
        let set: ChapterDirectorySet = [
            (ChapterId::from("ch_b"), PathBuf::from("book/ch_b")),
            (ChapterId::from("ch_a"), PathBuf::from("book/ch_a")),
        ]
        .into_iter()
        .collect();

        let ids: Vec<_> = set.iter().map(|(id, _)| id.as_str()).collect();
        assert_eq!(ids, ["ch_b", "ch_a"]);
        assert_eq!(set.get(&"ch_a".into()), Some(Path::new("book/ch_a")));
    }

    #[test]
    fn outcome_serializes_flat_status() {
        let outcome = ChapterOutcome {
            chapter: "ch_loops".into(),
            source_count: 2,
            intermediate: "out/ch_loops.md".into(),
            target: "out/ch_loops.tex".into(),
            status: RenderStatus::Failed {
                reason: "pandoc exited with status 1".into(),
            },
        };

        let json = serde_json::to_value(&outcome).expect("serialize");
        assert_eq!(json["chapter"], "ch_loops");
        assert_eq!(json["status"], "failed");
        assert_eq!(json["reason"], "pandoc exited with status 1");
    }

    #[test]
    fn report_counts_statuses() {
        let outcome = |status| ChapterOutcome {
            chapter: "ch_x".into(),
            source_count: 1,
            intermediate: "ch_x.md".into(),
            target: "ch_x.tex".into(),
            status,
        };
        let report = ChaptersReport {
            source_root: "..".into(),
            output_dir: ".".into(),
            manifest: "cpp_chapters.tex".into(),
            generated_at: Utc::now(),
            chapters: vec![
                outcome(RenderStatus::Rendered),
                outcome(RenderStatus::Skipped),
                outcome(RenderStatus::Failed { reason: "x".into() }),
                outcome(RenderStatus::Rendered),
            ],
        };

        assert_eq!(report.rendered(), 2);
        assert_eq!(report.skipped(), 1);
        assert_eq!(report.failed(), 1);
    }
}
