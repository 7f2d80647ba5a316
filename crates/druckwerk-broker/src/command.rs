// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Subprocess runner for the CUPS command-line tools.
//
// Everything the CLI backend does goes through the CommandRunner trait,
// so backend behavior is testable against scripted output without a
// print server in reach. Captured bytes stay raw until a caller asks
// for text: the historical server emits Latin-1 where UTF-8 is claimed,
// so decoding is strict UTF-8 first with a Latin-1 fallback.

use std::borrow::Cow;
use std::process::{Output, Stdio};
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::process::{Child, Command};
use tracing::debug;

use druckwerk_core::error::{DruckwerkError, Result};

/// Default wall-clock limit for one tool invocation.
pub const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(30);

/// Captured result of one finished subprocess.
#[derive(Debug, Clone, Default)]
pub struct CommandOutput {
    pub status_ok: bool,
    /// Exit code, absent when the process died to a signal.
    pub code: Option<i32>,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
}

impl CommandOutput {
    pub fn stdout_text(&self) -> Cow<'_, str> {
        decode_console_bytes(&self.stdout)
    }

    pub fn stderr_text(&self) -> Cow<'_, str> {
        decode_console_bytes(&self.stderr)
    }

    /// One-line summary for error payloads: exit code plus trimmed stderr.
    pub fn failure_summary(&self) -> String {
        let stderr = self.stderr_text();
        let stderr = stderr.trim();
        match (self.code, stderr.is_empty()) {
            (Some(code), false) => format!("exit code {code}: {stderr}"),
            (Some(code), true) => format!("exit code {code}"),
            (None, false) => format!("terminated by signal: {stderr}"),
            (None, true) => "terminated by signal".to_string(),
        }
    }
}

/// Decode console output, preferring strict UTF-8 and falling back to
/// Latin-1. Latin-1 maps every byte to a scalar value, so the fallback
/// cannot fail; mojibake on a truly foreign encoding beats losing the
/// listing.
pub fn decode_console_bytes(bytes: &[u8]) -> Cow<'_, str> {
    match std::str::from_utf8(bytes) {
        Ok(text) => Cow::Borrowed(text),
        Err(_) => encoding_rs::mem::decode_latin1(bytes),
    }
}

/// Seam between the CLI backend and the operating system.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Run `program` with `args` and capture its output.
    async fn run(&self, program: &str, args: &[String]) -> Result<CommandOutput>;

    /// Run `program` with `input` piped to its stdin.
    async fn run_with_stdin(
        &self,
        program: &str,
        args: &[String],
        input: &[u8],
    ) -> Result<CommandOutput>;
}

/// Real subprocess execution via tokio, with a per-invocation timeout.
/// A timed-out child is killed rather than orphaned.
#[derive(Debug, Clone)]
pub struct ProcessRunner {
    timeout: Duration,
}

impl ProcessRunner {
    pub fn new() -> Self {
        Self {
            timeout: DEFAULT_COMMAND_TIMEOUT,
        }
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Self { timeout }
    }

    fn command(&self, program: &str, args: &[String]) -> Command {
        let mut command = Command::new(program);
        command
            .args(args)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        command
    }

    async fn wait(&self, program: &str, child: Child) -> Result<CommandOutput> {
        let output = tokio::time::timeout(self.timeout, child.wait_with_output())
            .await
            .map_err(|_| self.timeout_error(program))?
            .map_err(|e| DruckwerkError::Command(format!("{program}: {e}")))?;
        Ok(capture(program, output))
    }

    /// Feed `input` to the child's stdin, then collect its output. The
    /// whole exchange runs under the one timeout, so a child that never
    /// drains the pipe cannot block past the deadline.
    async fn feed_and_wait(
        &self,
        program: &str,
        mut child: Child,
        input: &[u8],
    ) -> Result<CommandOutput> {
        let stdin = child.stdin.take();
        let fed = async move {
            let mut write_error = None;
            if let Some(mut stdin) = stdin {
                if let Err(e) = stdin.write_all(input).await {
                    write_error = Some(e);
                }
                // dropping the handle closes the pipe so the child sees EOF
            }
            (write_error, child.wait_with_output().await)
        };

        let (write_error, waited) = tokio::time::timeout(self.timeout, fed)
            .await
            .map_err(|_| self.timeout_error(program))?;
        let output = waited.map_err(|e| DruckwerkError::Command(format!("{program}: {e}")))?;

        // BrokenPipe means the child already exited; its exit status and
        // stderr are reported instead of the failed write
        if let Some(e) = write_error
            && e.kind() != std::io::ErrorKind::BrokenPipe
        {
            return Err(DruckwerkError::Command(format!("{program} stdin: {e}")));
        }

        Ok(capture(program, output))
    }

    fn timeout_error(&self, program: &str) -> DruckwerkError {
        DruckwerkError::Command(format!(
            "{program} timed out after {}s",
            self.timeout.as_secs()
        ))
    }
}

fn capture(program: &str, output: Output) -> CommandOutput {
    debug!(
        program,
        ok = output.status.success(),
        stdout_bytes = output.stdout.len(),
        stderr_bytes = output.stderr.len(),
        "subprocess finished"
    );
    CommandOutput {
        status_ok: output.status.success(),
        code: output.status.code(),
        stdout: output.stdout,
        stderr: output.stderr,
    }
}

impl Default for ProcessRunner {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CommandRunner for ProcessRunner {
    async fn run(&self, program: &str, args: &[String]) -> Result<CommandOutput> {
        debug!(program, ?args, "spawning subprocess");
        let child = self
            .command(program, args)
            .stdin(Stdio::null())
            .spawn()
            .map_err(|e| DruckwerkError::Command(format!("spawn {program}: {e}")))?;
        self.wait(program, child).await
    }

    async fn run_with_stdin(
        &self,
        program: &str,
        args: &[String],
        input: &[u8],
    ) -> Result<CommandOutput> {
        debug!(program, ?args, input_bytes = input.len(), "spawning subprocess with stdin");
        let child = self
            .command(program, args)
            .stdin(Stdio::piped())
            .spawn()
            .map_err(|e| DruckwerkError::Command(format!("spawn {program}: {e}")))?;
        self.feed_and_wait(program, child, input).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn utf8_bytes_decode_borrowed() {
        let text = decode_console_bytes("printer maria is idle".as_bytes());
        assert_eq!(text, "printer maria is idle");
        assert!(matches!(text, Cow::Borrowed(_)));
    }

    #[test]
    fn latin1_bytes_fall_back() {
        // "Kælderen" in Latin-1: 0xE6 is æ, invalid as UTF-8
        let bytes = b"K\xe6lderen";
        let text = decode_console_bytes(bytes);
        assert_eq!(text, "Kælderen");
    }

    #[test]
    fn failure_summary_includes_stderr() {
        let output = CommandOutput {
            status_ok: false,
            code: Some(1),
            stdout: Vec::new(),
            stderr: b"lpstat: Connection refused\n".to_vec(),
        };
        assert_eq!(output.failure_summary(), "exit code 1: lpstat: Connection refused");
    }

    #[test]
    fn failure_summary_without_stderr() {
        let output = CommandOutput {
            status_ok: false,
            code: None,
            stdout: Vec::new(),
            stderr: Vec::new(),
        };
        assert_eq!(output.failure_summary(), "terminated by signal");
    }

    #[tokio::test]
    async fn echo_round_trip() {
        let runner = ProcessRunner::new();
        let output = runner
            .run("echo", &["hello".to_string()])
            .await
            .unwrap();
        assert!(output.status_ok);
        assert_eq!(output.stdout_text().trim(), "hello");
    }

    #[tokio::test]
    async fn stdin_is_piped_through() {
        let runner = ProcessRunner::new();
        let output = runner
            .run_with_stdin("cat", &[], b"piped payload")
            .await
            .unwrap();
        assert!(output.status_ok);
        assert_eq!(output.stdout_text(), "piped payload");
    }

    #[tokio::test]
    async fn missing_program_is_a_command_error() {
        let runner = ProcessRunner::new();
        let result = runner.run("druckwerk-no-such-tool", &[]).await;
        assert!(matches!(result, Err(DruckwerkError::Command(_))));
    }

    #[tokio::test]
    async fn timeout_kills_the_child() {
        let runner = ProcessRunner::with_timeout(Duration::from_millis(50));
        let result = runner.run("sleep", &["5".to_string()]).await;
        match result {
            Err(DruckwerkError::Command(message)) => {
                assert!(message.contains("timed out"), "unexpected message: {message}");
            }
            other => panic!("expected timeout error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn stdin_write_is_bounded_by_the_timeout() {
        // sleep never reads stdin, so a payload past the pipe buffer
        // blocks the writer until the deadline cuts the exchange off
        let runner = ProcessRunner::with_timeout(Duration::from_millis(100));
        let payload = vec![b'x'; 1024 * 1024];
        let started = std::time::Instant::now();
        let result = runner
            .run_with_stdin("sleep", &["2".to_string()], &payload)
            .await;
        assert!(started.elapsed() < Duration::from_secs(1));
        match result {
            Err(DruckwerkError::Command(message)) => {
                assert!(message.contains("timed out"), "unexpected message: {message}");
            }
            other => panic!("expected timeout error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn early_exit_reports_stderr_not_broken_pipe() {
        let runner = ProcessRunner::new();
        let payload = vec![b'x'; 1024 * 1024];
        let output = runner
            .run_with_stdin(
                "sh",
                &["-c".to_string(), "echo oops >&2; exit 3".to_string()],
                &payload,
            )
            .await
            .unwrap();
        assert!(!output.status_ok);
        assert_eq!(output.code, Some(3));
        assert!(output.stderr_text().contains("oops"));
    }
}
