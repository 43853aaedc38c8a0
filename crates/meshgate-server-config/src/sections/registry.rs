// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct RegistryConfigLayer {
	pub deadline_secs: Option<u64>,
	pub sweep_interval_secs: Option<u64>,
}

impl RegistryConfigLayer {
	pub fn merge(&mut self, other: Self) {
		if other.deadline_secs.is_some() {
			self.deadline_secs = other.deadline_secs;
		}
		if other.sweep_interval_secs.is_some() {
			self.sweep_interval_secs = other.sweep_interval_secs;
		}
	}

	pub fn finalize(self) -> RegistryConfig {
		RegistryConfig {
			deadline_secs: self.deadline_secs.unwrap_or(10),
			sweep_interval_secs: self.sweep_interval_secs.unwrap_or(10),
		}
	}
}

#[derive(Debug, Clone, PartialEq)]
pub struct RegistryConfig {
	pub deadline_secs: u64,
	pub sweep_interval_secs: u64,
}

impl RegistryConfig {
	pub fn deadline(&self) -> Duration {
		Duration::from_secs(self.deadline_secs)
	}

	pub fn sweep_interval(&self) -> Duration {
		Duration::from_secs(self.sweep_interval_secs)
	}
}

impl Default for RegistryConfig {
	fn default() -> Self {
		RegistryConfigLayer::default().finalize()
	}
}
