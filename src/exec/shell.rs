// src/exec/shell.rs

//! Run a single external command and capture its output.

use std::process::Stdio;

use anyhow::{Context, Result};
use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};
use tokio::process::Command;
use tracing::{debug, info};

/// Captured result of a finished command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShellOutput {
    /// Exit code, or -1 if the process was terminated by a signal.
    pub code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl ShellOutput {
    pub fn success(&self) -> bool {
        self.code == 0
    }
}

/// Run `cmd` through the platform shell with `args` appended.
///
/// On Unix the arguments are passed positionally (`sh -c '<cmd> "$@"' sh
/// args...`) so they never go through shell word splitting. The child is
/// killed if the returned future is dropped, which is how request timeouts
/// and cancellations reach the process.
pub async fn run_shell(cmd: &str, args: &[&str]) -> Result<ShellOutput> {
    let mut command = if cfg!(windows) {
        let mut c = Command::new("cmd");
        let mut line = cmd.to_string();
        for arg in args {
            line.push(' ');
            line.push_str(arg);
        }
        c.arg("/C").arg(line);
        c
    } else {
        let mut c = Command::new("sh");
        c.arg("-c").arg(format!("{cmd} \"$@\"")).arg("sh").args(args);
        c
    };

    command
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    debug!(cmd = %cmd, ?args, "spawning external command");

    let mut child = command
        .spawn()
        .with_context(|| format!("spawning process for command '{cmd}'"))?;

    let stdout = child.stdout.take();
    let stderr = child.stderr.take();

    // Drain both pipes concurrently so neither buffer can fill up and stall
    // the child.
    let stdout_reader = async move {
        let mut buf = String::new();
        if let Some(mut out) = stdout {
            out.read_to_string(&mut buf).await?;
        }
        Ok::<_, std::io::Error>(buf)
    };
    let stderr_reader = async move {
        let mut collected = String::new();
        if let Some(err) = stderr {
            let mut lines = BufReader::new(err).lines();
            while let Some(line) = lines.next_line().await? {
                debug!(cmd_stderr = %line, "stderr");
                collected.push_str(&line);
                collected.push('\n');
            }
        }
        Ok::<_, std::io::Error>(collected)
    };

    let (stdout, stderr, status) = tokio::join!(stdout_reader, stderr_reader, child.wait());

    let status = status.with_context(|| format!("waiting for process of command '{cmd}'"))?;
    let stdout = stdout.with_context(|| format!("reading stdout of command '{cmd}'"))?;
    let stderr = stderr.with_context(|| format!("reading stderr of command '{cmd}'"))?;

    let code = status.code().unwrap_or(-1);
    info!(cmd = %cmd, exit_code = code, success = status.success(), "external command exited");

    Ok(ShellOutput {
        code,
        stdout,
        stderr,
    })
}
