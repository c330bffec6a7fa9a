//! `CMakePresets.json` generation.

use std::path::{Path, PathBuf};

use serde_json::json;
use tracing::info;

use coursebook_shared::{CoursebookError, Result};

pub const PRESET_FILE_NAME: &str = "CMakePresets.json";

/// Schema version understood by CMake 3.21+.
const PRESET_SCHEMA_VERSION: u32 = 3;

/// Whether [`write_preset`] wrote a file or found one already there.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PresetOutcome {
    Written(PathBuf),
    AlreadyExists(PathBuf),
}

/// The preset document: a single `default` configure preset using `toolchain_file`.
pub fn preset_document(toolchain_file: &Path) -> serde_json::Value {
    json!({
        "version": PRESET_SCHEMA_VERSION,
        "configurePresets": [
            {
                "name": "default",
                "toolchainFile": toolchain_file.to_string_lossy(),
            }
        ]
    })
}

/// Write `CMakePresets.json` into `source_dir`.
///
/// An existing preset file is left alone unless `force` is set. The
/// toolchain file must exist.
pub fn write_preset(source_dir: &Path, toolchain_file: &Path, force: bool) -> Result<PresetOutcome> {
    let path = source_dir.join(PRESET_FILE_NAME);

    if path.exists() && !force {
        info!(path = %path.display(), "preset file already exists, skipping");
        return Ok(PresetOutcome::AlreadyExists(path));
    }

    if !toolchain_file.is_file() {
        return Err(CoursebookError::validation(format!(
            "toolchain file not found at {}",
            toolchain_file.display()
        )));
    }

    let content = serde_json::to_string_pretty(&preset_document(toolchain_file))
        .map_err(|e| CoursebookError::validation(format!("JSON serialization failed: {e}")))?;
    std::fs::write(&path, content).map_err(|e| CoursebookError::io(&path, e))?;

    info!(path = %path.display(), toolchain = %toolchain_file.display(), "wrote preset file");
    Ok(PresetOutcome::Written(path))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_shape() {
        let doc = preset_document(Path::new("c:/vcpkg/scripts/buildsystems/vcpkg.cmake"));
        assert_eq!(doc["version"], 3);
        assert_eq!(doc["configurePresets"][0]["name"], "default");
        assert_eq!(
            doc["configurePresets"][0]["toolchainFile"],
            "c:/vcpkg/scripts/buildsystems/vcpkg.cmake"
        );
    }

    #[test]
    fn writes_preset_when_toolchain_exists() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let toolchain = tmp.path().join("vcpkg.cmake");
        std::fs::write(&toolchain, "# toolchain\n").unwrap();

        let outcome = write_preset(tmp.path(), &toolchain, false).unwrap();
        let path = tmp.path().join(PRESET_FILE_NAME);
        assert_eq!(outcome, PresetOutcome::Written(path.clone()));

        let written: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(written, preset_document(&toolchain));
    }

    #[test]
    fn existing_preset_is_kept_unless_forced() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let path = tmp.path().join(PRESET_FILE_NAME);
        std::fs::write(&path, "{}").unwrap();
        let toolchain = tmp.path().join("vcpkg.cmake");
        std::fs::write(&toolchain, "").unwrap();

        let outcome = write_preset(tmp.path(), &toolchain, false).unwrap();
        assert_eq!(outcome, PresetOutcome::AlreadyExists(path.clone()));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "{}");

        write_preset(tmp.path(), &toolchain, true).unwrap();
        assert!(std::fs::read_to_string(&path).unwrap().contains("configurePresets"));
    }

    #[test]
    fn missing_toolchain_is_validation_error() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let err = write_preset(tmp.path(), &tmp.path().join("nope.cmake"), false).unwrap_err();

        assert!(matches!(err, CoursebookError::Validation { .. }));
        assert!(err.to_string().contains("nope.cmake"));
        assert!(!tmp.path().join(PRESET_FILE_NAME).exists());
    }
}
