//! Thin wrapper around the `cmake` command line.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Command;

use tracing::{debug, info, instrument};

use coursebook_shared::{CmakeConfig, CoursebookError, Result};

/// CMake build type; selects the build directory as well as `CMAKE_BUILD_TYPE`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum BuildType {
    #[default]
    Debug,
    Release,
}

impl BuildType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Debug => "Debug",
            Self::Release => "Release",
        }
    }
}

impl std::fmt::Display for BuildType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Runs configure/build steps with one build directory per build type.
///
/// Build directories are resolved against `source_dir`.
#[derive(Debug, Clone)]
pub struct CMakeRunner {
    /// Executable to invoke; `cmake` unless overridden.
    pub program: String,
    pub source_dir: PathBuf,
    pub debug_dir: PathBuf,
    pub release_dir: PathBuf,
    pub preset: String,
    /// Pass `--preset=<preset>` when configuring.
    pub use_preset: bool,
}

impl From<&CmakeConfig> for CMakeRunner {
    fn from(config: &CmakeConfig) -> Self {
        Self {
            program: "cmake".into(),
            source_dir: config.source_dir.clone(),
            debug_dir: config.debug_dir.clone(),
            release_dir: config.release_dir.clone(),
            preset: config.preset.clone(),
            use_preset: config.use_preset,
        }
    }
}

impl CMakeRunner {
    /// The build directory for `build_type`.
    pub fn build_dir(&self, build_type: BuildType) -> PathBuf {
        let dir = match build_type {
            BuildType::Debug => &self.debug_dir,
            BuildType::Release => &self.release_dir,
        };
        self.source_dir.join(dir)
    }

    /// Remove both build directories. Returns the ones that existed.
    #[instrument(skip(self))]
    pub fn clean(&self) -> Result<Vec<PathBuf>> {
        let mut removed = Vec::new();

        for build_type in [BuildType::Debug, BuildType::Release] {
            let dir = self.build_dir(build_type);
            if !dir.exists() {
                continue;
            }
            std::fs::remove_dir_all(&dir).map_err(|e| CoursebookError::io(&dir, e))?;
            info!(dir = %dir.display(), "removed build directory");
            removed.push(dir);
        }

        Ok(removed)
    }

    /// Arguments for `cmake -S <src> -B <build> -DCMAKE_BUILD_TYPE=<type> [--preset=<name>]`.
    pub fn configure_args(&self, build_type: BuildType) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec![
            "-S".into(),
            self.source_dir.clone().into(),
            "-B".into(),
            self.build_dir(build_type).into(),
            format!("-DCMAKE_BUILD_TYPE={build_type}").into(),
        ];
        if self.use_preset {
            args.push(format!("--preset={}", self.preset).into());
        }
        args
    }

    /// Arguments for `cmake --build <build> --config <type>`.
    pub fn build_args(&self, build_type: BuildType) -> Vec<OsString> {
        vec![
            "--build".into(),
            self.build_dir(build_type).into(),
            "--config".into(),
            build_type.as_str().into(),
        ]
    }

    #[instrument(skip(self), fields(preset = %self.preset))]
    pub fn configure(&self, build_type: BuildType) -> Result<()> {
        info!("configuring CMake project");
        self.run(self.configure_args(build_type))
    }

    #[instrument(skip(self))]
    pub fn build(&self, build_type: BuildType) -> Result<()> {
        info!(dir = %self.build_dir(build_type).display(), "building CMake project");
        self.run(self.build_args(build_type))
    }

    /// Run with inherited stdio so compiler output streams to the terminal.
    fn run(&self, args: Vec<OsString>) -> Result<()> {
        let mut command = Command::new(&self.program);
        command.args(&args);
        debug!(?command, "running cmake");

        let status = command.status().map_err(|e| {
            CoursebookError::tool(&self.program, format!("failed to start: {e}"))
        })?;

        if status.success() {
            Ok(())
        } else {
            Err(CoursebookError::tool(
                &self.program,
                match status.code() {
                    Some(code) => format!("exited with status {code}"),
                    None => "terminated by signal".to_string(),
                },
            ))
        }
    }
}

/// Whether `dir` looks like a CMake source tree.
pub fn has_cmake_lists(dir: &Path) -> bool {
    dir.join("CMakeLists.txt").is_file()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn runner(source_dir: &Path) -> CMakeRunner {
        CMakeRunner {
            source_dir: source_dir.into(),
            use_preset: false,
            ..CMakeRunner::from(&CmakeConfig::default())
        }
    }

    fn strings(args: Vec<OsString>) -> Vec<String> {
        args.into_iter()
            .map(|a| a.to_string_lossy().into_owned())
            .collect()
    }

    #[test]
    fn build_dir_follows_build_type() {
        let r = runner(Path::new("course"));
        assert_eq!(r.build_dir(BuildType::Debug), Path::new("course/build-debug"));
        assert_eq!(r.build_dir(BuildType::Release), Path::new("course/build-release"));
    }

    #[test]
    fn configure_args_without_preset() {
        let r = runner(Path::new("."));
        let build_dir = Path::new(".").join("build-release");
        assert_eq!(
            strings(r.configure_args(BuildType::Release)),
            [
                "-S".to_string(),
                ".".to_string(),
                "-B".to_string(),
                build_dir.to_string_lossy().into_owned(),
                "-DCMAKE_BUILD_TYPE=Release".to_string(),
            ]
        );
    }

    #[test]
    fn configure_args_with_preset() {
        let r = CMakeRunner {
            use_preset: true,
            preset: "ninja".into(),
            ..runner(Path::new("."))
        };
        let args = strings(r.configure_args(BuildType::Debug));
        assert_eq!(args.last().map(String::as_str), Some("--preset=ninja"));
        assert!(args.contains(&"-DCMAKE_BUILD_TYPE=Debug".to_string()));
    }

    #[test]
    fn build_args_use_matching_dir_and_config() {
        let r = runner(Path::new("src"));
        let build_dir = Path::new("src").join("build-debug");
        assert_eq!(
            strings(r.build_args(BuildType::Debug)),
            [
                "--build".to_string(),
                build_dir.to_string_lossy().into_owned(),
                "--config".to_string(),
                "Debug".to_string(),
            ]
        );
    }

    #[test]
    fn clean_removes_existing_build_dirs() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let r = runner(tmp.path());
        std::fs::create_dir_all(tmp.path().join("build-debug").join("CMakeFiles")).unwrap();

        let removed = r.clean().unwrap();
        assert_eq!(removed, [tmp.path().join("build-debug")]);
        assert!(!tmp.path().join("build-debug").exists());

        assert!(r.clean().unwrap().is_empty());
    }

    #[test]
    fn missing_program_is_tool_error() {
        let r = CMakeRunner {
            program: "coursebook-test-no-cmake".into(),
            ..runner(Path::new("."))
        };
        let err = r.build(BuildType::Debug).unwrap_err();
        assert!(matches!(err, CoursebookError::Tool { .. }));
    }

    #[cfg(unix)]
    #[test]
    fn non_zero_exit_is_tool_error() {
        let r = CMakeRunner {
            program: "false".into(),
            ..runner(Path::new("."))
        };
        let err = r.configure(BuildType::Release).unwrap_err();
        assert_eq!(err.to_string(), "false failed: exited with status 1");

        let ok = CMakeRunner {
            program: "true".into(),
            ..runner(Path::new("."))
        };
        assert!(ok.configure(BuildType::Release).is_ok());
    }

    #[test]
    fn detects_cmake_lists() {
        let tmp = tempfile::tempdir().expect("tempdir");
        assert!(!has_cmake_lists(tmp.path()));
        std::fs::write(tmp.path().join("CMakeLists.txt"), "project(course)\n").unwrap();
        assert!(has_cmake_lists(tmp.path()));
    }
}
