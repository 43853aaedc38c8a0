// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Command runner double that records invocations instead of executing them.

use crate::runner::{CommandOutput, CommandRunner};
use async_trait::async_trait;
use meshgate_server_registry::TunnelError;
use std::collections::HashMap;
use std::sync::Mutex;

/// Records each invocation as a single space-joined line. Programs without a
/// configured response succeed with empty output.
#[derive(Debug, Default)]
pub struct RecordingRunner {
	commands: Mutex<Vec<String>>,
	responses: Mutex<HashMap<String, CommandOutput>>,
}

impl RecordingRunner {
	pub fn new() -> Self {
		Self::default()
	}

	/// Sets the output for every later invocation whose command line starts
	/// with `prefix`. The longest matching prefix wins.
	pub fn respond(&self, prefix: &str, output: CommandOutput) {
		self
			.responses
			.lock()
			.unwrap()
			.insert(prefix.to_string(), output);
	}

	pub fn commands(&self) -> Vec<String> {
		self.commands.lock().unwrap().clone()
	}
}

#[async_trait]
impl CommandRunner for RecordingRunner {
	async fn run(&self, program: &str, args: &[&str]) -> Result<CommandOutput, TunnelError> {
		let line = std::iter::once(program)
			.chain(args.iter().copied())
			.collect::<Vec<_>>()
			.join(" ");
		self.commands.lock().unwrap().push(line.clone());

		let responses = self.responses.lock().unwrap();
		let output = responses
			.iter()
			.filter(|(prefix, _)| line.starts_with(prefix.as_str()))
			.max_by_key(|(prefix, _)| prefix.len())
			.map(|(_, output)| output.clone())
			.unwrap_or_else(|| CommandOutput::ok(""));
		Ok(output)
	}
}
