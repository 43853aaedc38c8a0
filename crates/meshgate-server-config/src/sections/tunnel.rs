// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! WireGuard interface section.

use serde::Deserialize;

pub const DEFAULT_WG_INTERFACE: &str = "wg0";
pub const DEFAULT_WG_PORT: u16 = 51820;
pub const DEFAULT_CIDR: &str = "10.24.1.0/24";

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct TunnelConfigLayer {
	/// Uplink NIC; its first IPv4 address is the public endpoint.
	pub interface: Option<String>,
	pub wg_interface: Option<String>,
	pub wg_port: Option<u16>,
	pub cidr: Option<String>,
	pub post_up: Option<String>,
	pub post_down: Option<String>,
}

impl TunnelConfigLayer {
	pub fn merge(&mut self, other: Self) {
		if other.interface.is_some() {
			self.interface = other.interface;
		}
		if other.wg_interface.is_some() {
			self.wg_interface = other.wg_interface;
		}
		if other.wg_port.is_some() {
			self.wg_port = other.wg_port;
		}
		if other.cidr.is_some() {
			self.cidr = other.cidr;
		}
		if other.post_up.is_some() {
			self.post_up = other.post_up;
		}
		if other.post_down.is_some() {
			self.post_down = other.post_down;
		}
	}

	pub fn finalize(self) -> TunnelConfig {
		let interface = self.interface.unwrap_or_default();
		let wg_interface = self
			.wg_interface
			.unwrap_or_else(|| DEFAULT_WG_INTERFACE.to_string());
		let post_up = self
			.post_up
			.unwrap_or_else(|| forwarding_rules("-A", &wg_interface, &interface));
		let post_down = self
			.post_down
			.unwrap_or_else(|| forwarding_rules("-D", &wg_interface, &interface));

		TunnelConfig {
			interface,
			wg_interface,
			wg_port: self.wg_port.unwrap_or(DEFAULT_WG_PORT),
			cidr: self.cidr.unwrap_or_else(|| DEFAULT_CIDR.to_string()),
			post_up,
			post_down,
		}
	}
}

/// Forwarding and NAT rules letting tunnel traffic out through the uplink.
fn forwarding_rules(action: &str, wg_interface: &str, uplink: &str) -> String {
	format!(
		"iptables {action} FORWARD -i {wg_interface} -j ACCEPT; \
		 iptables {action} FORWARD -o {wg_interface} -j ACCEPT; \
		 iptables -t nat {action} POSTROUTING -o {uplink} -j MASQUERADE"
	)
}

#[derive(Debug, Clone, PartialEq)]
pub struct TunnelConfig {
	pub interface: String,
	pub wg_interface: String,
	pub wg_port: u16,
	pub cidr: String,
	pub post_up: String,
	pub post_down: String,
}
