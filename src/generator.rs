//! Runs the upstream diagram generator and captures its output.
//!
//! The generator is an external command; this wrapper pins its working
//! directory to the source file's directory (relative asset references in
//! the source resolve from there), injects the output directory unless the
//! caller already passed one, and on failure leaves a readable error log
//! next to the outputs.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use crate::error::WirePostError;

const ERROR_LOG_NAME: &str = "generator-error.log";

/// Captured result of one generator invocation.
#[derive(Debug)]
pub struct GeneratorRun {
    pub command: Vec<String>,
    pub stdout: String,
    pub stderr: String,
}

fn has_output_dir_flag(extra_args: &[String]) -> bool {
    extra_args
        .iter()
        .any(|arg| arg == "-o" || arg == "--output-dir" || arg.starts_with("--output-dir="))
}

/// Invokes `program` on `source`, writing outputs into `output_dir`. On a
/// non-zero exit the captured streams are written to an error log in
/// `output_dir` and the run fails with a generator error.
pub fn run_generator(
    program: &Path,
    source: &Path,
    output_dir: &Path,
    extra_args: &[String],
) -> Result<GeneratorRun, WirePostError> {
    let source = source.canonicalize()?;
    fs::create_dir_all(output_dir)?;
    let work_dir: PathBuf = source
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));

    let mut command = Command::new(program);
    command.arg(&source).args(extra_args).current_dir(&work_dir);
    if !has_output_dir_flag(extra_args) {
        command.arg("--output-dir").arg(output_dir);
    }

    let display_command: Vec<String> = std::iter::once(program.display().to_string())
        .chain(
            command
                .get_args()
                .map(|arg| arg.to_string_lossy().into_owned()),
        )
        .collect();
    tracing::info!(command = ?display_command, "running diagram generator");

    let output = command.output()?;
    let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
    let stderr = String::from_utf8_lossy(&output.stderr).into_owned();

    if !output.status.success() {
        let exit = output
            .status
            .code()
            .map(|code| code.to_string())
            .unwrap_or_else(|| "terminated by signal".to_string());
        let log = format!(
            "=== GENERATOR FAILURE ===\nCommand: {}\nExit code: {}\n\n\
             === STDOUT ===\n{}\n\n=== STDERR ===\n{}\n",
            display_command.join(" "),
            exit,
            stdout,
            stderr
        );
        let log_path = output_dir.join(ERROR_LOG_NAME);
        fs::write(&log_path, log)?;
        tracing::error!(log = %log_path.display(), "diagram generator failed");
        return Err(WirePostError::Generator(format!(
            "exit code {exit}, details in {}",
            log_path.display()
        )));
    }

    Ok(GeneratorRun {
        command: display_command,
        stdout,
        stderr,
    })
}
