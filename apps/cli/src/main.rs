//! Coursebook CLI: authoring and build tooling for the C++ course book.
//!
//! Generates chapter documents from example sources, renders them through
//! `gpp` and `pandoc`, and drives the CMake build of the example tree.

mod commands;

use clap::Parser;
use color_eyre::eyre::Result;

use commands::Cli;

fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    commands::init_tracing(&cli);
    commands::run(cli)
}
