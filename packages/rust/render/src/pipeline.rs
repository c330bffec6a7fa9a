//! Preprocessor → converter pipeline.

use std::io::Read;
use std::path::Path;
use std::process::{Child, Stdio};
use std::thread::JoinHandle;

use tracing::{debug, instrument, warn};

use coursebook_shared::{ChapterId, CoursebookError, RenderStatus, Result, ToolsConfig};

use crate::tool::{ToolCommand, check_status, spawn_error};

/// Turns a chapter's intermediate document into its render target.
pub trait Renderer {
    /// Render `input` into `output`. Failures are reported in the returned
    /// status rather than as errors, so one chapter cannot stop the rest.
    fn render(&self, chapter: &ChapterId, input: &Path, output: &Path) -> RenderStatus;
}

/// Renderer used when rendering is turned off; leaves targets untouched.
pub struct SkipRender;

impl Renderer for SkipRender {
    fn render(&self, _chapter: &ChapterId, _input: &Path, _output: &Path) -> RenderStatus {
        RenderStatus::Skipped
    }
}

/// Runs `preprocessor | converter` for each chapter.
///
/// With the default configuration this is
/// `gpp -H <chapter>.md | pandoc -f markdown -t latex -o <chapter>.tex`.
#[derive(Debug, Clone)]
pub struct ToolPipeline {
    pub preprocessor: ToolCommand,
    pub converter: ToolCommand,
}

impl From<&ToolsConfig> for ToolPipeline {
    fn from(config: &ToolsConfig) -> Self {
        Self {
            preprocessor: ToolCommand::new(&config.preprocessor, &config.preprocessor_args),
            converter: ToolCommand::new(&config.converter, &config.converter_args),
        }
    }
}

impl ToolPipeline {
    /// Run both tools and wait for them, checking each exit status.
    pub fn run(&self, input: &Path, output: &Path) -> Result<()> {
        let pre_name = self.preprocessor.program.as_str();
        let conv_name = self.converter.program.as_str();

        let mut pre = self
            .preprocessor
            .command(input, output)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| spawn_error(pre_name, &e))?;

        let pre_stdout = pre
            .stdout
            .take()
            .ok_or_else(|| CoursebookError::tool(pre_name, "failed to capture stdout"))?;
        // Drained on its own thread so a chatty preprocessor cannot block
        // while we wait on the converter.
        let pre_stderr = drain_stderr(&mut pre);

        let conv = self
            .converter
            .command(input, output)
            .stdin(Stdio::from(pre_stdout))
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn();

        let conv = match conv {
            Ok(child) => child,
            Err(e) => {
                abandon(&mut pre);
                return Err(spawn_error(conv_name, &e));
            }
        };

        let conv_output = match conv.wait_with_output() {
            Ok(output) => output,
            Err(e) => {
                abandon(&mut pre);
                return Err(CoursebookError::tool(conv_name, format!("failed to wait: {e}")));
            }
        };
        let pre_status = pre
            .wait()
            .map_err(|e| CoursebookError::tool(pre_name, format!("failed to wait: {e}")))?;
        let pre_stderr = pre_stderr
            .and_then(|handle| handle.join().ok())
            .unwrap_or_default();

        let pre_result = check_status(pre_name, pre_status, &pre_stderr);
        let conv_result = check_status(
            conv_name,
            conv_output.status,
            &String::from_utf8_lossy(&conv_output.stderr),
        );

        match (pre_result, conv_result) {
            (Ok(()), Ok(())) => Ok(()),
            (Err(e), Ok(())) | (Ok(()), Err(e)) => Err(e),
            // A converter that quits without draining its input breaks the
            // pipe, so a preprocessor killed by a signal is the consequence.
            (Err(pre_err), Err(conv_err)) if pre_status.code().is_none() => {
                Err(both_failed(conv_err, &pre_err))
            }
            (Err(pre_err), Err(conv_err)) => Err(both_failed(pre_err, &conv_err)),
        }
    }
}

impl Renderer for ToolPipeline {
    #[instrument(skip_all, fields(chapter = %chapter))]
    fn render(&self, chapter: &ChapterId, input: &Path, output: &Path) -> RenderStatus {
        match self.run(input, output) {
            Ok(()) => {
                debug!(target = %output.display(), "rendered chapter");
                RenderStatus::Rendered
            }
            Err(e) => {
                warn!(%chapter, error = %e, "rendering failed");
                RenderStatus::Failed {
                    reason: e.to_string(),
                }
            }
        }
    }
}

/// Stop a preprocessor whose converter is gone and reap it.
fn abandon(pre: &mut Child) {
    let _ = pre.kill();
    let _ = pre.wait();
}

/// Report `first` while keeping the other tool's failure in the message.
fn both_failed(first: CoursebookError, second: &CoursebookError) -> CoursebookError {
    match first {
        CoursebookError::Tool { tool, message } => {
            CoursebookError::tool(tool, format!("{message} (also {second})"))
        }
        other => other,
    }
}

fn drain_stderr(child: &mut Child) -> Option<JoinHandle<String>> {
    let mut stderr = child.stderr.take()?;
    Some(std::thread::spawn(move || {
        let mut buf = String::new();
        let _ = stderr.read_to_string(&mut buf);
        buf
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_input(dir: &Path) -> std::path::PathBuf {
        let input = dir.join("ch_intro.md");
        std::fs::write(&input, "# ch_intro #\n").expect("write input");
        input
    }

    #[test]
    fn skip_render_leaves_target_absent() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let input = write_input(tmp.path());
        let output = tmp.path().join("ch_intro.tex");

        let status = SkipRender.render(&"ch_intro".into(), &input, &output);
        assert_eq!(status, RenderStatus::Skipped);
        assert!(!output.exists());
    }

    #[test]
    fn pipeline_from_default_tools_config() {
        let pipeline = ToolPipeline::from(&ToolsConfig::default());
        assert_eq!(pipeline.preprocessor.program, "gpp");
        assert_eq!(pipeline.converter.program, "pandoc");
        assert!(pipeline.converter.args.iter().any(|a| a == "{output}"));
    }

    #[test]
    fn missing_preprocessor_fails_chapter() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let input = write_input(tmp.path());
        let pipeline = ToolPipeline {
            preprocessor: ToolCommand::new("coursebook-test-missing-gpp", ["{input}"]),
            converter: ToolCommand::new("coursebook-test-missing-pandoc", ["-o", "{output}"]),
        };

        let status = pipeline.render(&"ch_intro".into(), &input, &tmp.path().join("out.tex"));
        match status {
            RenderStatus::Failed { reason } => {
                assert!(reason.contains("coursebook-test-missing-gpp"), "{reason}");
            }
            other => panic!("expected failure, got {other:?}"),
        }
    }

    #[cfg(unix)]
    fn copy_converter() -> ToolCommand {
        ToolCommand::new("sh", ["-c", "cat > \"$1\"", "sh", "{output}"])
    }

    #[cfg(unix)]
    #[test]
    fn pipes_preprocessor_output_into_converter() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let input = write_input(tmp.path());
        let output = tmp.path().join("ch_intro.tex");
        let pipeline = ToolPipeline {
            preprocessor: ToolCommand::new("cat", ["{input}"]),
            converter: copy_converter(),
        };

        let status = pipeline.render(&"ch_intro".into(), &input, &output);
        assert_eq!(status, RenderStatus::Rendered);
        assert_eq!(
            std::fs::read_to_string(&output).expect("read output"),
            "# ch_intro #\n"
        );
    }

    #[cfg(unix)]
    #[test]
    fn failing_converter_reports_exit_code() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let input = write_input(tmp.path());
        let pipeline = ToolPipeline {
            preprocessor: ToolCommand::new("cat", ["{input}"]),
            converter: ToolCommand::new(
                "sh",
                ["-c", "cat > /dev/null; echo 'unknown writer' >&2; exit 3"],
            ),
        };

        match pipeline.render(&"ch_intro".into(), &input, &tmp.path().join("x.tex")) {
            RenderStatus::Failed { reason } => {
                assert!(reason.contains("status 3"), "{reason}");
                assert!(reason.contains("unknown writer"), "{reason}");
            }
            other => panic!("expected failure, got {other:?}"),
        }
    }

    #[cfg(unix)]
    #[test]
    fn failing_preprocessor_is_reported_first() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let input = write_input(tmp.path());
        let pipeline = ToolPipeline {
            preprocessor: ToolCommand::new("sh", ["-c", "echo 'include not found' >&2; exit 2"]),
            converter: copy_converter(),
        };

        match pipeline.render(&"ch_intro".into(), &input, &tmp.path().join("x.tex")) {
            RenderStatus::Failed { reason } => {
                assert!(reason.starts_with("sh failed: exited with status 2"), "{reason}");
                assert!(reason.contains("include not found"), "{reason}");
            }
            other => panic!("expected failure, got {other:?}"),
        }
    }

    #[cfg(unix)]
    #[test]
    fn converter_failure_wins_over_broken_pipe() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let input = write_input(tmp.path());
        // Far more output than a pipe buffer holds, into a converter that never reads it.
        let pipeline = ToolPipeline {
            preprocessor: ToolCommand::new("head", ["-c", "2000000", "/dev/zero"]),
            converter: ToolCommand::new(
                "sh",
                ["-c", "echo 'Unknown output format latexx' >&2; exit 3"],
            ),
        };

        match pipeline.render(&"ch_big".into(), &input, &tmp.path().join("x.tex")) {
            RenderStatus::Failed { reason } => {
                assert!(reason.contains("sh failed: exited with status 3"), "{reason}");
                assert!(reason.contains("Unknown output format latexx"), "{reason}");
            }
            other => panic!("expected failure, got {other:?}"),
        }
    }

    #[cfg(unix)]
    #[test]
    fn missing_converter_stops_preprocessor() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let input = write_input(tmp.path());
        let pipeline = ToolPipeline {
            preprocessor: ToolCommand::new("cat", ["/dev/zero"]),
            converter: ToolCommand::new("coursebook-test-missing-pandoc", ["-o", "{output}"]),
        };

        match pipeline.render(&"ch_intro".into(), &input, &tmp.path().join("x.tex")) {
            RenderStatus::Failed { reason } => {
                assert!(reason.contains("coursebook-test-missing-pandoc"), "{reason}");
            }
            other => panic!("expected failure, got {other:?}"),
        }
    }
}
