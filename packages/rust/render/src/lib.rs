//! External tool invocation for rendering chapter documents.
//!
//! This crate provides:
//! - [`ToolCommand`]: a program plus argument template with `{input}`/`{output}` placeholders
//! - [`run_tool`]: run a command to completion and check its exit status
//! - [`Renderer`]: the seam the chapter emitter renders through
//! - [`ToolPipeline`]: preprocessor stdout piped into a format converter

pub mod pipeline;
pub mod tool;

pub use pipeline::{Renderer, SkipRender, ToolPipeline};
pub use tool::{INPUT_PLACEHOLDER, OUTPUT_PLACEHOLDER, ToolCommand, ToolOutput, run_tool};
