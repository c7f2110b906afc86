use std::{
    io::{self, Read, Write},
    path::Path,
    process::{Command, Stdio},
    thread,
};

use anyhow::{Context, Result};

use crate::core::error::ProvisionError;

const DEFAULT_MAX_CAPTURE_BYTES: usize = 64 * 1024;
const STDERR_TAIL_BYTES: usize = 4 * 1024;

#[derive(Debug, Clone)]
pub struct RunOutput {
    pub code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl RunOutput {
    /// Converts a non-zero exit into a [`ProvisionError::ProcessFailed`].
    ///
    /// # Errors
    ///
    /// Returns an error when the recorded exit code is not zero.
    pub fn ensure_success(self, program: &Path) -> Result<Self> {
        if self.code == 0 {
            return Ok(self);
        }
        Err(ProvisionError::ProcessFailed {
            program: program.display().to_string(),
            code: self.code,
            stderr: stderr_tail(&self.stderr),
        }
        .into())
    }
}

fn stderr_tail(stderr: &str) -> String {
    let trimmed = stderr.trim_end();
    if trimmed.len() <= STDERR_TAIL_BYTES {
        return trimmed.to_string();
    }
    let mut start = trimmed.len() - STDERR_TAIL_BYTES;
    while !trimmed.is_char_boundary(start) {
        start += 1;
    }
    trimmed[start..].to_string()
}

/// Execute a program while streaming stdout/stderr to the parent process.
///
/// Output is also captured (bounded) so failures can report the tail of stderr.
///
/// # Errors
///
/// Returns an error when the program cannot be spawned or its output streams
/// cannot be read.
pub fn run_command_streaming(program: &Path, args: &[String], cwd: &Path) -> Result<RunOutput> {
    let mut command = configured_command(program, args, cwd);
    command.stdin(Stdio::null());
    command.stdout(Stdio::piped());
    command.stderr(Stdio::piped());

    let mut child = command
        .spawn()
        .with_context(|| format!("failed to start {}", program.display()))?;
    let mut stdout = child
        .stdout
        .take()
        .ok_or_else(|| anyhow::anyhow!("stdout missing for {}", program.display()))?;
    let mut stderr = child
        .stderr
        .take()
        .ok_or_else(|| anyhow::anyhow!("stderr missing for {}", program.display()))?;

    let limit = DEFAULT_MAX_CAPTURE_BYTES;
    let stdout_handle = thread::spawn(move || tee_to_string_limited(&mut stdout, io::stdout(), limit));
    let stderr_handle = thread::spawn(move || tee_to_string_limited(&mut stderr, io::stderr(), limit));

    let status = child
        .wait()
        .with_context(|| format!("failed to wait for {}", program.display()))?;
    let code = status.code().unwrap_or(-1);
    let stdout = stdout_handle
        .join()
        .map_err(|_| anyhow::anyhow!("stdout thread panicked"))??;
    let stderr = stderr_handle
        .join()
        .map_err(|_| anyhow::anyhow!("stderr thread panicked"))??;

    Ok(RunOutput {
        code,
        stdout,
        stderr,
    })
}

fn configured_command(program: &Path, args: &[String], cwd: &Path) -> Command {
    let mut command = Command::new(program);
    command.args(args);
    command.current_dir(cwd);
    command
}

fn tee_to_string_limited(
    reader: &mut dyn Read,
    mut writer: impl Write,
    limit: usize,
) -> Result<String> {
    let mut buffer = Vec::new();
    let mut chunk = [0u8; 8192];
    loop {
        let read = reader.read(&mut chunk)?;
        if read == 0 {
            break;
        }
        writer.write_all(&chunk[..read])?;
        append_limited(&mut buffer, &chunk[..read], limit);
    }
    writer.flush().ok();
    Ok(String::from_utf8_lossy(&buffer).to_string())
}

// Keeps the most recent `limit` bytes; the tail is what explains a failure.
fn append_limited(buffer: &mut Vec<u8>, chunk: &[u8], limit: usize) {
    if limit == 0 {
        return;
    }
    buffer.extend_from_slice(chunk);
    if buffer.len() > limit {
        let excess = buffer.len() - limit;
        buffer.drain(0..excess);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(unix)]
    #[test]
    fn run_command_streaming_captures_output_and_status_unix() -> Result<()> {
        let output = run_command_streaming(
            Path::new("/bin/sh"),
            &[
                "-c".to_string(),
                "printf out && printf err >&2; exit 7".to_string(),
            ],
            Path::new("."),
        )?;
        assert_eq!(output.code, 7);
        assert_eq!(output.stdout, "out");
        assert_eq!(output.stderr, "err");
        Ok(())
    }

    #[cfg(unix)]
    #[test]
    fn ensure_success_reports_exit_code_and_stderr() {
        let output = run_command_streaming(
            Path::new("/bin/sh"),
            &["-c".to_string(), "echo boom >&2; exit 3".to_string()],
            Path::new("."),
        )
        .expect("spawn sh");
        let err = output
            .ensure_success(Path::new("/bin/sh"))
            .expect_err("non-zero exit must fail");
        match err.downcast_ref::<ProvisionError>() {
            Some(ProvisionError::ProcessFailed { code, stderr, .. }) => {
                assert_eq!(*code, 3);
                assert_eq!(stderr, "boom");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn append_limited_keeps_tail() {
        let mut buffer = Vec::new();
        append_limited(&mut buffer, b"abcdef", 4);
        append_limited(&mut buffer, b"gh", 4);
        assert_eq!(buffer, b"efgh");
    }

    #[test]
    fn stderr_tail_respects_char_boundaries() {
        let long = "é".repeat(STDERR_TAIL_BYTES);
        let tail = stderr_tail(&long);
        assert!(tail.len() <= STDERR_TAIL_BYTES);
        assert!(tail.chars().all(|c| c == 'é'));
    }
}
