use crate::error::{CoreError, Result};
use process_control::{ChildExt, Control};
use std::{
    process::{Command, Stdio},
    time::Duration,
};

/// Runs external OS utilities with a wall-clock limit.
///
/// Only a zero exit status counts as success; stdout is returned trimmed.
#[derive(Debug, Clone, Copy)]
pub struct CommandRunner {
    time_limit: Duration,
}

impl CommandRunner {
    pub fn new(time_limit: Duration) -> Self {
        Self { time_limit }
    }

    pub fn run(&self, program: &str, args: &[&str]) -> Result<String> {
        let child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| CoreError::command(program, e.to_string()))?;

        let output = child
            .controlled_with_output()
            .time_limit(self.time_limit)
            .terminate_for_timeout()
            .wait()
            .map_err(|e| CoreError::command(program, e.to_string()))?
            .ok_or_else(|| {
                CoreError::command(program, format!("timed out after {:?}", self.time_limit))
            })?;

        if !output.status.success() {
            return Err(CoreError::command(
                program,
                format!("exited with {:?}", output.status),
            ));
        }

        let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if stdout.is_empty() {
            return Err(CoreError::command(program, "produced no output"));
        }
        Ok(stdout)
    }

    /// Tries each command in order and returns the first usable output
    pub fn first_success(&self, candidates: &[(&str, &[&str])]) -> Result<String> {
        let mut last_error = CoreError::command("<none>", "no candidate commands");
        for (program, args) in candidates {
            match self.run(program, args) {
                Ok(out) => return Ok(out),
                Err(e) => last_error = e,
            }
        }
        Err(last_error)
    }
}

impl Default for CommandRunner {
    fn default() -> Self {
        Self::new(Duration::from_secs(2))
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[test]
    fn test_run_returns_trimmed_stdout() {
        let runner = CommandRunner::default();
        assert_eq!(runner.run("echo", &["  hello  "]).unwrap(), "hello");
    }

    #[test]
    fn test_non_zero_exit_is_an_error() {
        let runner = CommandRunner::default();
        let err = runner.run("sh", &["-c", "echo out; exit 3"]).unwrap_err();
        assert!(matches!(err, CoreError::Command { .. }));
    }

    #[test]
    fn test_missing_program_is_an_error() {
        let runner = CommandRunner::default();
        assert!(runner.run("definitely-not-a-real-utility-xyz", &[]).is_err());
    }

    #[test]
    fn test_time_limit_kills_slow_commands() {
        let runner = CommandRunner::new(Duration::from_millis(100));
        let err = runner.run("sleep", &["5"]).unwrap_err();
        assert!(err.to_string().contains("timed out"));
    }

    #[test]
    fn test_first_success_falls_through() {
        let runner = CommandRunner::default();
        let no_args: &[&str] = &[];
        let fallback: &[&str] = &["fallback"];
        let out = runner
            .first_success(&[
                ("definitely-not-a-real-utility-xyz", no_args),
                ("echo", fallback),
            ])
            .unwrap();
        assert_eq!(out, "fallback");
    }
}
