//! A single external program and how to call it.

use std::ffi::OsString;
use std::path::Path;
use std::process::{Command, ExitStatus, Output, Stdio};

use tracing::debug;

use coursebook_shared::{CoursebookError, Result};

/// Replaced with the document being processed.
pub const INPUT_PLACEHOLDER: &str = "{input}";
/// Replaced with the file the tool should produce.
pub const OUTPUT_PLACEHOLDER: &str = "{output}";

/// Longest stderr excerpt carried into error messages.
const STDERR_EXCERPT_LEN: usize = 200;

/// A program and its argument template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolCommand {
    pub program: String,
    pub args: Vec<String>,
}

impl ToolCommand {
    pub fn new(program: impl Into<String>, args: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    /// Expand placeholders in the argument template.
    ///
    /// An argument that is exactly a placeholder becomes the path unchanged,
    /// so non-UTF-8 paths survive. Embedded placeholders are substituted
    /// textually.
    pub fn expand_args(&self, input: &Path, output: &Path) -> Vec<OsString> {
        self.args
            .iter()
            .map(|arg| match arg.as_str() {
                INPUT_PLACEHOLDER => input.as_os_str().to_owned(),
                OUTPUT_PLACEHOLDER => output.as_os_str().to_owned(),
                other => other
                    .replace(INPUT_PLACEHOLDER, &input.to_string_lossy())
                    .replace(OUTPUT_PLACEHOLDER, &output.to_string_lossy())
                    .into(),
            })
            .collect()
    }

    /// Build a [`Command`] for one input/output pair.
    pub fn command(&self, input: &Path, output: &Path) -> Command {
        let mut command = Command::new(&self.program);
        command.args(self.expand_args(input, output));
        command
    }
}

/// Captured result of a finished tool.
#[derive(Debug, Clone)]
pub struct ToolOutput {
    pub status: ExitStatus,
    pub stdout: String,
    pub stderr: String,
}

impl From<Output> for ToolOutput {
    fn from(output: Output) -> Self {
        Self {
            status: output.status,
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        }
    }
}

/// Run `command` to completion with stdout and stderr captured.
///
/// A program that cannot be started or exits non-zero is a
/// [`CoursebookError::Tool`] naming `tool`.
pub fn run_tool(tool: &str, mut command: Command) -> Result<ToolOutput> {
    debug!(tool, ?command, "running tool");

    let output: ToolOutput = command
        .stdin(Stdio::null())
        .output()
        .map_err(|e| spawn_error(tool, &e))?
        .into();

    check_status(tool, output.status, &output.stderr)?;
    Ok(output)
}

pub(crate) fn spawn_error(tool: &str, err: &std::io::Error) -> CoursebookError {
    if err.kind() == std::io::ErrorKind::NotFound {
        CoursebookError::tool(tool, format!("`{tool}` not found on PATH"))
    } else {
        CoursebookError::tool(tool, format!("failed to start: {err}"))
    }
}

pub(crate) fn check_status(tool: &str, status: ExitStatus, stderr: &str) -> Result<()> {
    if status.success() {
        return Ok(());
    }

    let mut message = match status.code() {
        Some(code) => format!("exited with status {code}"),
        None => "terminated by signal".to_string(),
    };
    if let Some(excerpt) = stderr_excerpt(stderr) {
        message.push_str(": ");
        message.push_str(&excerpt);
    }

    Err(CoursebookError::tool(tool, message))
}

/// Last non-empty stderr line, shortened for log output.
fn stderr_excerpt(stderr: &str) -> Option<String> {
    let line = stderr.lines().map(str::trim).rfind(|l| !l.is_empty())?;
    Some(line.chars().take(STDERR_EXCERPT_LEN).collect())
}
