//! External command execution.
//!
//! Shared plumbing for verify steps and post-deploy actions: run an argument
//! list to completion and capture its combined, trimmed output. Non-zero
//! exits are reported in the output, not as errors; callers decide what a
//! rejection means.

use std::process::Stdio;
use std::time::Duration;

use thiserror::Error;
use tokio::process::Command;

/// Result of a finished command.
#[derive(Debug)]
pub struct ExecOutput {
    /// Combined stdout and stderr, trimmed of surrounding whitespace.
    pub output: String,
    /// Exit code, if the process exited normally.
    pub code: Option<i32>,
    /// Whether the command exited with status zero.
    pub success: bool,
}

/// Errors that prevent a command from producing an exit status at all.
#[derive(Debug, Error)]
pub enum ExecError {
    /// The argument list was empty
    #[error("empty command")]
    EmptyCommand,

    /// The command could not be started
    #[error("failed to run `{program}`: {source}")]
    Spawn {
        /// The program that failed to start
        program: String,
        /// The underlying I/O error
        source: std::io::Error,
    },

    /// The command did not finish within the configured bound
    #[error("`{program}` did not finish within {}s", .timeout.as_secs())]
    TimedOut {
        /// The program that was killed
        program: String,
        /// The configured bound
        timeout: Duration,
    },
}

/// Runs `argv` to completion, optionally bounded by `timeout`.
///
/// On timeout the child is killed when its handle is dropped.
pub async fn run(argv: &[String], timeout: Option<Duration>) -> Result<ExecOutput, ExecError> {
    let (program, args) = argv.split_first().ok_or(ExecError::EmptyCommand)?;

    let mut cmd = Command::new(program);
    cmd.args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let result = match timeout {
        Some(limit) => tokio::time::timeout(limit, cmd.output())
            .await
            .map_err(|_| ExecError::TimedOut {
                program: program.clone(),
                timeout: limit,
            })?,
        None => cmd.output().await,
    };

    let output = result.map_err(|source| ExecError::Spawn {
        program: program.clone(),
        source,
    })?;

    Ok(ExecOutput {
        output: combine_output(&output.stdout, &output.stderr),
        code: output.status.code(),
        success: output.status.success(),
    })
}

/// Merges captured stdout and stderr, trimmed of surrounding whitespace.
fn combine_output(stdout: &[u8], stderr: &[u8]) -> String {
    let stdout = String::from_utf8_lossy(stdout);
    let stderr = String::from_utf8_lossy(stderr);
    let stdout = stdout.trim();
    let stderr = stderr.trim();

    match (stdout.is_empty(), stderr.is_empty()) {
        (false, false) => format!("{stdout}\n{stderr}"),
        (true, false) => stderr.to_string(),
        _ => stdout.to_string(),
    }
}
