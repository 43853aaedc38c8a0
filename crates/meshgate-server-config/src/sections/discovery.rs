// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! mDNS advertisement section.

use serde::Deserialize;

pub const DEFAULT_SERVICE_TYPE: &str = "_meshgate._tcp.local.";

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct DiscoveryConfigLayer {
	pub enabled: Option<bool>,
	pub service_type: Option<String>,
	/// Instance name; the host name when unset.
	pub instance_name: Option<String>,
	pub description: Option<String>,
}

impl DiscoveryConfigLayer {
	pub fn merge(&mut self, other: Self) {
		if other.enabled.is_some() {
			self.enabled = other.enabled;
		}
		if other.service_type.is_some() {
			self.service_type = other.service_type;
		}
		if other.instance_name.is_some() {
			self.instance_name = other.instance_name;
		}
		if other.description.is_some() {
			self.description = other.description;
		}
	}

	pub fn finalize(self) -> DiscoveryConfig {
		DiscoveryConfig {
			enabled: self.enabled.unwrap_or(true),
			service_type: self
				.service_type
				.unwrap_or_else(|| DEFAULT_SERVICE_TYPE.to_string()),
			instance_name: self.instance_name,
			description: self.description.unwrap_or_default(),
		}
	}
}

#[derive(Debug, Clone, PartialEq)]
pub struct DiscoveryConfig {
	pub enabled: bool,
	pub service_type: String,
	pub instance_name: Option<String>,
	pub description: String,
}

impl Default for DiscoveryConfig {
	fn default() -> Self {
		DiscoveryConfigLayer::default().finalize()
	}
}
