// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use async_trait::async_trait;
use meshgate_server_registry::TunnelError;
use tokio::process::Command;
use tracing::{trace, warn};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
	pub success: bool,
	/// Exit code, `None` when the process was killed by a signal.
	pub code: Option<i32>,
	pub stdout: String,
	pub stderr: String,
}

impl CommandOutput {
	pub fn ok(stdout: impl Into<String>) -> Self {
		Self {
			success: true,
			code: Some(0),
			stdout: stdout.into(),
			stderr: String::new(),
		}
	}

	pub fn failed(code: i32, stderr: impl Into<String>) -> Self {
		Self {
			success: false,
			code: Some(code),
			stdout: String::new(),
			stderr: stderr.into(),
		}
	}

	fn describe_failure(&self) -> String {
		let status = match self.code {
			Some(code) => format!("exit status {code}"),
			None => "terminated by signal".to_string(),
		};
		let output = [self.stdout.trim(), self.stderr.trim()]
			.into_iter()
			.filter(|s| !s.is_empty())
			.collect::<Vec<_>>()
			.join("\n");
		if output.is_empty() {
			status
		} else {
			format!("{status}: {output}")
		}
	}
}

/// Executes external programs.
#[async_trait]
pub trait CommandRunner: Send + Sync {
	/// Runs `program` to completion. Only a failure to spawn is an error; a
	/// non-zero exit is reported through [`CommandOutput::success`].
	async fn run(&self, program: &str, args: &[&str]) -> Result<CommandOutput, TunnelError>;
}

/// Runs commands as child processes.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessRunner;

impl ProcessRunner {
	pub fn new() -> Self {
		Self
	}
}

#[async_trait]
impl CommandRunner for ProcessRunner {
	async fn run(&self, program: &str, args: &[&str]) -> Result<CommandOutput, TunnelError> {
		trace!(cmd = %format!("{} {}", program, args.join(" ")), "running command");

		let output = Command::new(program)
			.args(args)
			.kill_on_drop(true)
			.output()
			.await
			.map_err(|e| {
				if e.kind() == std::io::ErrorKind::NotFound {
					warn!(%program, "program not found in PATH");
					TunnelError::MissingTool(program.to_string())
				} else {
					TunnelError::program(program, e.to_string())
				}
			})?;

		Ok(CommandOutput {
			success: output.status.success(),
			code: output.status.code(),
			stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
			stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
		})
	}
}

/// Runs a command and turns a non-zero exit into [`TunnelError::Program`]
/// labelled with `operation`. Returns trimmed stdout.
pub async fn run_checked(
	runner: &dyn CommandRunner,
	operation: &str,
	program: &str,
	args: &[&str],
) -> Result<String, TunnelError> {
	let output = runner.run(program, args).await?;
	if output.success {
		Ok(output.stdout.trim().to_string())
	} else {
		Err(TunnelError::program(operation, output.describe_failure()))
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::testing::RecordingRunner;

	#[test]
	fn failure_description_includes_status_and_output() {
		let output = CommandOutput {
			success: false,
			code: Some(1),
			stdout: "partial\n".into(),
			stderr: "RTNETLINK answers: File exists\n".into(),
		};
		assert_eq!(
			output.describe_failure(),
			"exit status 1: partial\nRTNETLINK answers: File exists"
		);
		assert_eq!(
			CommandOutput {
				success: false,
				code: None,
				..Default::default()
			}
			.describe_failure(),
			"terminated by signal"
		);
	}

	#[tokio::test]
	async fn run_checked_maps_non_zero_exit() {
		let runner = RecordingRunner::new();
		runner.respond("wg", CommandOutput::failed(1, "Invalid key"));

		let err = run_checked(&runner, "add peer", "wg", &["set", "wg0"])
			.await
			.unwrap_err();
		assert_eq!(err.to_string(), "add peer failed: exit status 1: Invalid key");
	}

	#[tokio::test]
	async fn process_runner_reports_missing_program() {
		let err = ProcessRunner::new()
			.run("meshgate-definitely-not-installed", &[])
			.await
			.unwrap_err();
		assert!(matches!(err, TunnelError::MissingTool(ref p) if p == "meshgate-definitely-not-installed"));
	}

	#[tokio::test]
	async fn process_runner_captures_output() {
		let output = ProcessRunner::new()
			.run("sh", &["-c", "echo hello; echo oops >&2; exit 3"])
			.await
			.unwrap();
		assert!(!output.success);
		assert_eq!(output.code, Some(3));
		assert_eq!(output.stdout.trim(), "hello");
		assert_eq!(output.stderr.trim(), "oops");
	}
}
