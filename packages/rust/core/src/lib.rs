//! Core pipeline orchestration for Coursebook.
//!
//! This crate ties together chapter scanning, source classification and
//! document emission into the end-to-end `build_chapters` workflow, plus the
//! markdown → reStructuredText bulk conversion.

pub mod classifier;
pub mod emitter;
pub mod pipeline;
pub mod rst;
pub mod scanner;
