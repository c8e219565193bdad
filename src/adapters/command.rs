//! External tool invocation shared by the source and writer adapters

use std::process::Stdio;
use std::time::Duration;
use thiserror::Error;

/// Captured output of a finished command
#[derive(Debug, Clone)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
}

/// Why an external command did not succeed
#[derive(Debug, Error)]
pub enum CommandFailure {
    #[error("failed to start {program}: {source}")]
    Launch {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{program} did not finish within {}s", .timeout.as_secs())]
    TimedOut { program: String, timeout: Duration },

    #[error("{program} exited with {status}: {stderr}")]
    Exit {
        program: String,
        status: String,
        stderr: String,
    },
}

/// Runs `program` with `args` and waits for it, killing it after `timeout`
pub async fn run(
    program: &str,
    args: &[String],
    timeout: Duration,
) -> Result<CommandOutput, CommandFailure> {
    tracing::debug!(program, args = ?args, "Running external command");

    let child = tokio::process::Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .output();

    let output = match tokio::time::timeout(timeout, child).await {
        Ok(Ok(output)) => output,
        Ok(Err(source)) => {
            return Err(CommandFailure::Launch {
                program: program.to_string(),
                source,
            })
        }
        Err(_) => {
            return Err(CommandFailure::TimedOut {
                program: program.to_string(),
                timeout,
            })
        }
    };

    let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
    let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();

    if !output.status.success() {
        return Err(CommandFailure::Exit {
            program: program.to_string(),
            status: output.status.to_string(),
            stderr,
        });
    }

    if !stderr.is_empty() {
        tracing::debug!(program, stderr = %stderr, "Command wrote to stderr");
    }

    Ok(CommandOutput { stdout, stderr })
}
