//! CLI command definitions, routing, and tracing setup.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use coursebook_cmake::{BuildType, CMakeRunner, PresetOutcome, has_cmake_lists, write_preset};
use coursebook_core::pipeline::{ProgressReporter, build_chapters};
use coursebook_core::rst::{convert_markdown_tree, default_rst_converter};
use coursebook_render::{Renderer, SkipRender, ToolPipeline};
use coursebook_shared::{
    AppConfig, ChapterOutcome, ChaptersReport, Ordering, RenderStatus, config_file_path,
    init_config, load_config,
};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{info, warn};

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// Coursebook: build tooling for the C++ course book.
#[derive(Parser)]
#[command(
    name = "coursebook",
    version,
    about = "Generate chapter documents from course sources and drive the course build.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Config file (defaults to ./coursebook.toml, then ~/.coursebook/coursebook.toml).
    #[arg(long, global = true, env = "COURSEBOOK_CONFIG")]
    pub config: Option<PathBuf>,

    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Generate chapter documents and render them with the preprocessor/converter.
    Chapters {
        /// Directory holding the chapter directories.
        #[arg(long)]
        source_root: Option<PathBuf>,

        /// Directory for the manifest, chapter documents and render targets.
        #[arg(short, long)]
        output_dir: Option<PathBuf>,

        /// Write the manifest and chapter documents without running external tools.
        #[arg(long)]
        no_render: bool,

        /// Process chapters and files in name order instead of directory order.
        #[arg(long)]
        alphabetical: bool,

        /// Print the run report as JSON.
        #[arg(long)]
        json: bool,
    },

    /// CMake preset and build management.
    Cmake {
        #[command(subcommand)]
        action: CmakeAction,
    },

    /// Convert every markdown file under a directory to reStructuredText.
    ConvertRst {
        /// Directory to walk.
        #[arg(default_value = ".")]
        dir: PathBuf,
    },

    /// Configuration management.
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// CMake subcommands.
#[derive(Subcommand)]
pub(crate) enum CmakeAction {
    /// Write CMakePresets.json pointing at a toolchain file.
    Preset {
        /// Toolchain file (defaults to the configured one).
        #[arg(long)]
        toolchain_file: Option<PathBuf>,

        /// Overwrite an existing preset file.
        #[arg(long)]
        force: bool,
    },
    /// Remove the debug and release build directories.
    Clean,
    /// Configure the project.
    Configure(BuildArgs),
    /// Configure, then build the project.
    Build(BuildArgs),
}

#[derive(clap::Args)]
pub(crate) struct BuildArgs {
    #[arg(long, value_enum, default_value = "debug")]
    pub build_type: BuildTypeArg,

    /// CMake preset name (defaults to the configured one).
    #[arg(long)]
    pub preset: Option<String>,
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub(crate) enum BuildTypeArg {
    Debug,
    Release,
}

impl From<BuildTypeArg> for BuildType {
    fn from(arg: BuildTypeArg) -> Self {
        match arg {
            BuildTypeArg::Debug => Self::Debug,
            BuildTypeArg::Release => Self::Release,
        }
    }
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Write a config file with defaults.
    Init {
        /// Write ./coursebook.toml instead of the user config file.
        #[arg(long)]
        local: bool,
    },
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
///
/// Logs go to stderr so `--json` output on stdout stays parseable.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "coursebook=info",
        1 => "coursebook=debug",
        _ => "coursebook=trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .with_target(false)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) fn run(cli: Cli) -> Result<()> {
    let config_path = cli.config.as_deref();

    match cli.command {
        Command::Chapters {
            source_root,
            output_dir,
            no_render,
            alphabetical,
            json,
        } => {
            let mut config = load_config(config_path)?;
            if let Some(root) = source_root {
                config.chapters.source_root = root;
            }
            if let Some(out) = output_dir {
                config.chapters.output_dir = out;
            }
            if alphabetical {
                config.chapters.ordering = Ordering::Alphabetical;
            }
            cmd_chapters(&config, no_render, json)
        }
        Command::Cmake { action } => {
            let config = load_config(config_path)?;
            match action {
                CmakeAction::Preset {
                    toolchain_file,
                    force,
                } => cmd_cmake_preset(&config, toolchain_file.as_deref(), force),
                CmakeAction::Clean => cmd_cmake_clean(&config),
                CmakeAction::Configure(args) => cmd_cmake_build(&config, &args, false),
                CmakeAction::Build(args) => cmd_cmake_build(&config, &args, true),
            }
        }
        Command::ConvertRst { dir } => cmd_convert_rst(&dir),
        Command::Config { action } => match action {
            ConfigAction::Init { local } => cmd_config_init(local),
            ConfigAction::Show => cmd_config_show(config_path),
        },
    }
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

fn cmd_chapters(config: &AppConfig, no_render: bool, json: bool) -> Result<()> {
    info!(
        source_root = %config.chapters.source_root.display(),
        output_dir = %config.chapters.output_dir.display(),
        no_render,
        "generating chapters"
    );

    let pipeline;
    let renderer: &dyn Renderer = if no_render {
        &SkipRender
    } else {
        pipeline = ToolPipeline::from(&config.tools);
        &pipeline
    };

    let progress = CliProgress::new(!json);
    let report = build_chapters(&config.chapters, &config.tools, renderer, &progress)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_summary(&report);
    }

    Ok(())
}

fn print_summary(report: &ChaptersReport) {
    println!();
    println!("  Chapters:  {}", report.chapters.len());
    println!("  Rendered:  {}", report.rendered());
    if report.skipped() > 0 {
        println!("  Skipped:   {}", report.skipped());
    }
    if report.failed() > 0 {
        println!("  Failed:    {}", report.failed());
        for outcome in &report.chapters {
            if let RenderStatus::Failed { reason } = &outcome.status {
                println!("    {}: {reason}", outcome.chapter);
            }
        }
    }
    println!("  Manifest:  {}", report.manifest.display());
    println!();
}

fn cmd_cmake_preset(config: &AppConfig, toolchain_file: Option<&Path>, force: bool) -> Result<()> {
    let toolchain = toolchain_file.unwrap_or(&config.cmake.toolchain_file);

    match write_preset(&config.cmake.source_dir, toolchain, force)? {
        PresetOutcome::Written(path) => println!("Preset written to: {}", path.display()),
        PresetOutcome::AlreadyExists(path) => {
            println!("{} already exists. Skipping (use --force to overwrite).", path.display());
        }
    }
    Ok(())
}

fn cmd_cmake_clean(config: &AppConfig) -> Result<()> {
    let removed = CMakeRunner::from(&config.cmake).clean()?;
    if removed.is_empty() {
        println!("Nothing to clean.");
    }
    for dir in removed {
        println!("Removed {}", dir.display());
    }
    Ok(())
}

fn cmd_cmake_build(config: &AppConfig, args: &BuildArgs, build: bool) -> Result<()> {
    let mut runner = CMakeRunner::from(&config.cmake);
    if let Some(preset) = &args.preset {
        runner.preset = preset.clone();
    }
    let build_type = BuildType::from(args.build_type);

    if !has_cmake_lists(&runner.source_dir) {
        warn!(dir = %runner.source_dir.display(), "no CMakeLists.txt found in source directory");
    }

    runner.configure(build_type)?;
    if build {
        runner.build(build_type)?;
    }
    Ok(())
}

fn cmd_convert_rst(dir: &Path) -> Result<()> {
    let summary = convert_markdown_tree(dir, &default_rst_converter())?;

    println!("Converted {} file(s).", summary.converted.len());
    if !summary.failed.is_empty() {
        for (path, reason) in &summary.failed {
            println!("  failed: {} ({reason})", path.display());
        }
        return Err(eyre!("{} file(s) failed to convert", summary.failed.len()));
    }
    Ok(())
}

fn cmd_config_init(local: bool) -> Result<()> {
    let path = if local {
        PathBuf::from("coursebook.toml")
    } else {
        config_file_path()?
    };
    let path = init_config(&path)?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

fn cmd_config_show(config_path: Option<&Path>) -> Result<()> {
    let config = load_config(config_path)?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// CLI progress reporter using an indicatif spinner.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new(visible: bool) -> Self {
        if !visible {
            return Self {
                spinner: ProgressBar::hidden(),
            };
        }

        let spinner = ProgressBar::new_spinner();
        spinner.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
        );
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { spinner }
    }
}

impl ProgressReporter for CliProgress {
    fn phase(&self, name: &str) {
        self.spinner.set_message(name.to_string());
    }

    fn chapter_emitted(&self, outcome: &ChapterOutcome, current: usize, total: usize) {
        self.spinner
            .set_message(format!("Chapter [{current}/{total}] {}", outcome.chapter));
    }

    fn done(&self, _report: &ChaptersReport) {
        self.spinner.finish_and_clear();
    }
}

impl Drop for CliProgress {
    // Covers early returns, where `done` is never reached.
    fn drop(&mut self) {
        if !self.spinner.is_finished() {
            self.spinner.finish_and_clear();
        }
    }
}
