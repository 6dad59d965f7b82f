use std::io::ErrorKind;
use std::process::Stdio;

use thiserror::Error;
use tokio::process::Command;
use tracing::trace;

/// Raw outcome of running one argv to completion. A non-zero exit code is a
/// normal `ExecOutput`, not an error – interpreting it is the caller's job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecOutput {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
}

#[derive(Debug, Error)]
pub enum ExecError {
    #[error("Cannot execute an empty command.")]
    EmptyCommand,
    #[error("Executable '{0}' not found.")]
    ExecutableNotFound(String),
    #[error("Failed to spawn '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
}

/// Runs `argv` as a literal process image plus arguments – never through a
/// shell – and buffers its entire output. Spawns exactly one child per call
/// and waits for it synchronously; there is no streaming.
pub async fn execute(argv: &[String]) -> Result<ExecOutput, ExecError> {
    let (program, args) = argv.split_first().ok_or(ExecError::EmptyCommand)?;
    trace!("execute: {argv:?}");

    let output = Command::new(program)
        .args(args)
        // Never give children a real stdin: a command that decides to read
        // from it would hang the whole broker call.
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .await
        .map_err(|source| match source.kind() {
            ErrorKind::NotFound => ExecError::ExecutableNotFound(program.clone()),
            _ => ExecError::Spawn {
                program: program.clone(),
                source,
            },
        })?;

    // On Unix a `None` code means the child was killed by a signal; report it
    // as a generic failure code rather than inventing a success.
    let exit_code = output.status.code().unwrap_or(-1);
    Ok(ExecOutput {
        stdout: String::from_utf8_lossy(&output.stdout)
            .trim_end()
            .to_string(),
        stderr: String::from_utf8_lossy(&output.stderr)
            .trim_end()
            .to_string(),
        exit_code,
    })
}
