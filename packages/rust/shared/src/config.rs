//! Application configuration for Coursebook.
//!
//! Config lookup order: an explicit `--config` path, then `coursebook.toml`
//! in the working directory, then `~/.coursebook/coursebook.toml`.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{CoursebookError, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "coursebook.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".coursebook";

/// Extension of the per-chapter intermediate document.
pub const INTERMEDIATE_EXTENSION: &str = "md";

// ---------------------------------------------------------------------------
// Config structs (matching coursebook.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Chapter discovery and document generation.
    #[serde(default)]
    pub chapters: ChaptersConfig,

    /// External preprocessor/converter commands.
    #[serde(default)]
    pub tools: ToolsConfig,

    /// CMake preset and build directories.
    #[serde(default)]
    pub cmake: CmakeConfig,
}

/// Order in which chapters and their source files are processed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Ordering {
    /// Directory enumeration order; platform and filesystem dependent.
    #[default]
    Filesystem,
    /// Sorted by name, reproducible across machines.
    Alphabetical,
}

/// `[chapters]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChaptersConfig {
    /// Directory whose immediate children are candidate chapters.
    #[serde(default = "default_source_root")]
    pub source_root: PathBuf,

    /// Where the manifest, intermediate documents and render targets go.
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Regex matched against a directory's base name.
    #[serde(default = "default_chapter_pattern")]
    pub chapter_pattern: String,

    /// Source file extension, without the dot.
    #[serde(default = "default_source_extension")]
    pub source_extension: String,

    /// Suffix editors append to backup copies (`main.cpp~`).
    #[serde(default = "default_backup_suffix")]
    pub backup_suffix: String,

    /// File name of the aggregation manifest.
    #[serde(default = "default_manifest_name")]
    pub manifest_name: String,

    /// Info string of the fenced code blocks.
    #[serde(default = "default_code_language")]
    pub code_language: String,

    #[serde(default)]
    pub ordering: Ordering,
}

impl Default for ChaptersConfig {
    fn default() -> Self {
        Self {
            source_root: default_source_root(),
            output_dir: default_output_dir(),
            chapter_pattern: default_chapter_pattern(),
            source_extension: default_source_extension(),
            backup_suffix: default_backup_suffix(),
            manifest_name: default_manifest_name(),
            code_language: default_code_language(),
            ordering: Ordering::default(),
        }
    }
}

fn default_source_root() -> PathBuf {
    "..".into()
}
fn default_output_dir() -> PathBuf {
    ".".into()
}
fn default_chapter_pattern() -> String {
    "^ch_".into()
}
fn default_source_extension() -> String {
    "cpp".into()
}
fn default_backup_suffix() -> String {
    "~".into()
}
fn default_manifest_name() -> String {
    "cpp_chapters.tex".into()
}
fn default_code_language() -> String {
    "cpp".into()
}

/// `[tools]` section.
///
/// Argument lists may contain `{input}` and `{output}` placeholders, which
/// are replaced with the intermediate document and render target paths.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolsConfig {
    #[serde(default = "default_preprocessor")]
    pub preprocessor: String,

    #[serde(default = "default_preprocessor_args")]
    pub preprocessor_args: Vec<String>,

    #[serde(default = "default_converter")]
    pub converter: String,

    #[serde(default = "default_converter_args")]
    pub converter_args: Vec<String>,

    /// Extension of the converter's output file.
    #[serde(default = "default_render_extension")]
    pub render_extension: String,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            preprocessor: default_preprocessor(),
            preprocessor_args: default_preprocessor_args(),
            converter: default_converter(),
            converter_args: default_converter_args(),
            render_extension: default_render_extension(),
        }
    }
}

impl ToolsConfig {
    /// Reject a render target that would overwrite the intermediate document
    /// while the preprocessor is still reading it.
    pub fn validate(&self) -> Result<()> {
        let extension = self.render_extension.trim_start_matches('.');
        if extension.is_empty() {
            return Err(CoursebookError::config("render_extension must not be empty"));
        }
        if extension.eq_ignore_ascii_case(INTERMEDIATE_EXTENSION) {
            return Err(CoursebookError::config(format!(
                "render_extension '{}' clashes with the intermediate .{INTERMEDIATE_EXTENSION} documents",
                self.render_extension
            )));
        }
        Ok(())
    }
}

fn default_preprocessor() -> String {
    "gpp".into()
}
fn default_preprocessor_args() -> Vec<String> {
    vec!["-H".into(), "{input}".into()]
}
fn default_converter() -> String {
    "pandoc".into()
}
fn default_converter_args() -> Vec<String> {
    ["-f", "markdown", "-t", "latex", "-o", "{output}"]
        .map(String::from)
        .to_vec()
}
fn default_render_extension() -> String {
    "tex".into()
}

/// `[cmake]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CmakeConfig {
    /// Directory holding the top-level `CMakeLists.txt`.
    #[serde(default = "default_cmake_source_dir")]
    pub source_dir: PathBuf,

    /// Toolchain file referenced by the generated preset.
    #[serde(default = "default_toolchain_file")]
    pub toolchain_file: PathBuf,

    #[serde(default = "default_preset")]
    pub preset: String,

    #[serde(default = "default_debug_dir")]
    pub debug_dir: PathBuf,

    #[serde(default = "default_release_dir")]
    pub release_dir: PathBuf,

    /// Pass `--preset` when configuring. Defaults to on for Windows only.
    #[serde(default = "default_use_preset")]
    pub use_preset: bool,
}

impl Default for CmakeConfig {
    fn default() -> Self {
        Self {
            source_dir: default_cmake_source_dir(),
            toolchain_file: default_toolchain_file(),
            preset: default_preset(),
            debug_dir: default_debug_dir(),
            release_dir: default_release_dir(),
            use_preset: default_use_preset(),
        }
    }
}

fn default_cmake_source_dir() -> PathBuf {
    ".".into()
}
fn default_toolchain_file() -> PathBuf {
    "c:/vcpkg/scripts/buildsystems/vcpkg.cmake".into()
}
fn default_preset() -> String {
    "default".into()
}
fn default_debug_dir() -> PathBuf {
    "build-debug".into()
}
fn default_release_dir() -> PathBuf {
    "build-release".into()
}
fn default_use_preset() -> bool {
    cfg!(windows)
}

// ---------------------------------------------------------------------------
// Naming convention (validated view of [chapters])
// ---------------------------------------------------------------------------

/// Compiled naming rules for chapter directories and source files.
#[derive(Debug, Clone)]
pub struct NamingConvention {
    chapter_pattern: Regex,
    source_suffix: String,
    backup_suffix: String,
}

impl NamingConvention {
    /// Build the convention, rejecting an invalid pattern or empty extension.
    pub fn new(chapter_pattern: &str, source_extension: &str, backup_suffix: &str) -> Result<Self> {
        let chapter_pattern = Regex::new(chapter_pattern).map_err(|e| {
            CoursebookError::config(format!("invalid chapter_pattern '{chapter_pattern}': {e}"))
        })?;

        let extension = source_extension.trim_start_matches('.');
        if extension.is_empty() {
            return Err(CoursebookError::config("source_extension must not be empty"));
        }

        Ok(Self {
            chapter_pattern,
            source_suffix: format!(".{extension}"),
            backup_suffix: backup_suffix.to_string(),
        })
    }

    /// Whether a directory base name marks a chapter.
    pub fn is_chapter(&self, dir_name: &str) -> bool {
        self.chapter_pattern.is_match(dir_name)
    }

    /// Whether a file name is a source file (and not a backup of one).
    ///
    /// Both checks are true suffix checks, so `main.cpp~` is rejected while
    /// `old.cpp~new.cpp` is accepted.
    pub fn is_source(&self, file_name: &str) -> bool {
        // A bare ".cpp" is a hidden file with no stem.
        file_name.len() > self.source_suffix.len()
            && file_name.ends_with(&self.source_suffix)
            && !self.is_backup(file_name)
    }

    /// Whether a file name is an editor backup of a source file.
    pub fn is_backup(&self, file_name: &str) -> bool {
        !self.backup_suffix.is_empty()
            && file_name
                .strip_suffix(&self.backup_suffix)
                .is_some_and(|rest| rest.ends_with(&self.source_suffix))
    }
}

impl TryFrom<&ChaptersConfig> for NamingConvention {
    type Error = CoursebookError;

    fn try_from(config: &ChaptersConfig) -> Result<Self> {
        Self::new(
            &config.chapter_pattern,
            &config.source_extension,
            &config.backup_suffix,
        )
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.coursebook/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| CoursebookError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the user config file (`~/.coursebook/coursebook.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Find the config file to use, if any.
///
/// A project-local `coursebook.toml` wins over the user config.
pub fn find_config_file() -> Result<Option<PathBuf>> {
    let local = PathBuf::from(CONFIG_FILE_NAME);
    if local.is_file() {
        return Ok(Some(local));
    }

    let user = config_file_path()?;
    Ok(user.is_file().then_some(user))
}

/// Load the application config. Returns defaults if no config file exists.
pub fn load_config(explicit: Option<&Path>) -> Result<AppConfig> {
    if let Some(path) = explicit {
        return load_config_from(path);
    }

    match find_config_file()? {
        Some(path) => load_config_from(&path),
        None => {
            tracing::debug!("config file not found, using defaults");
            Ok(AppConfig::default())
        }
    }
}

/// Load and validate the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| CoursebookError::io(path, e))?;

    let config: AppConfig = toml::from_str(&content).map_err(|e| {
        CoursebookError::config(format!("failed to parse {}: {e}", path.display()))
    })?;

    NamingConvention::try_from(&config.chapters)?;
    config.tools.validate()?;
    tracing::debug!(path = %path.display(), "loaded config");

    Ok(config)
}

/// Write a default config file at `path`, creating parent directories.
/// Refuses to overwrite an existing file.
pub fn init_config(path: &Path) -> Result<PathBuf> {
    if path.exists() {
        return Err(CoursebookError::config(format!(
            "{} already exists",
            path.display()
        )));
    }

    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir).map_err(|e| CoursebookError::io(dir, e))?;
    }

    let content = toml::to_string_pretty(&AppConfig::default())
        .map_err(|e| CoursebookError::config(e.to_string()))?;

    std::fs::write(path, content).map_err(|e| CoursebookError::io(path, e))?;
    tracing::info!(path = %path.display(), "created default config file");

    Ok(path.to_path_buf())
}
