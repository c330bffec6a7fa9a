//! Shared types, error model, and configuration for Coursebook.
//!
//! This crate is the foundation depended on by all other Coursebook crates.
//! It provides:
//! - [`CoursebookError`]: the unified error type
//! - Domain types ([`ChapterId`], [`ChapterDirectorySet`], [`ChapterSourceMap`], [`ChaptersReport`])
//! - Configuration ([`AppConfig`], [`NamingConvention`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, ChaptersConfig, CmakeConfig, INTERMEDIATE_EXTENSION, NamingConvention, Ordering,
    ToolsConfig, config_dir, config_file_path, find_config_file, init_config, load_config,
    load_config_from,
};
pub use error::{CoursebookError, Result};
pub use types::{
    ChapterDirectorySet, ChapterId, ChapterOutcome, ChapterSourceMap, ChaptersReport,
    RenderStatus,
};
