//! CMake presets and build-directory management for the course's C++ tree.
//!
//! This crate provides:
//! - [`write_preset`]: writes `CMakePresets.json` pointing at a toolchain file
//! - [`CMakeRunner`]: clean / configure / build with per-build-type directories

pub mod preset;
pub mod runner;

pub use preset::{PRESET_FILE_NAME, PresetOutcome, preset_document, write_preset};
pub use runner::{BuildType, CMakeRunner, has_cmake_lists};
