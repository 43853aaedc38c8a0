// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use meshgate_server_registry::TunnelError;
use meshgate_server_tunnel::{run_checked, CommandRunner};
use meshgate_wg_common::{format_allowed_ips, RegistrationReply};
use std::net::Ipv4Addr;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, instrument};

/// The node's local WireGuard interface.
pub struct ClientInterface {
	runner: Arc<dyn CommandRunner>,
	name: String,
}

impl ClientInterface {
	pub fn new(name: impl Into<String>, runner: Arc<dyn CommandRunner>) -> Self {
		Self {
			runner,
			name: name.into(),
		}
	}

	pub fn name(&self) -> &str {
		&self.name
	}

	/// Creates the interface and points its only peer, the server, at every
	/// address in the reply.
	#[instrument(skip(self, reply, private_key_path), fields(interface = %self.name, node_ip = %reply.node_ip))]
	pub async fn bring_up(
		&self,
		reply: &RegistrationReply,
		private_key_path: &Path,
	) -> Result<(), TunnelError> {
		let name = self.name.as_str();
		let address = format!("{}/{}", reply.node_ip, reply.node_cidr);
		let key_path = private_key_path.to_string_lossy();
		let allowed = peer_allowed_ips(&reply.allowed_ips, reply.server_peer_ip);

		self
			.run("create interface", "ip", &["link", "add", "dev", name, "type", "wireguard"])
			.await?;
		self
			.run("assign address", "ip", &["address", "add", "dev", name, &address])
			.await?;
		self
			.run(
				"configure peer",
				"wg",
				&[
					"set",
					name,
					"private-key",
					&key_path,
					"peer",
					&reply.server_public_key,
					"endpoint",
					&reply.endpoint_ip_port_pair,
					"allowed-ips",
					&allowed,
				],
			)
			.await?;
		self
			.run("bring interface up", "ip", &["link", "set", "up", "dev", name])
			.await?;

		info!(endpoint = %reply.endpoint_ip_port_pair, "interface up");
		Ok(())
	}

	/// Replaces the server peer's allowed addresses.
	pub async fn set_allowed_ips(
		&self,
		server_public_key: &str,
		allowed_ips: &[Ipv4Addr],
		server_peer_ip: Ipv4Addr,
	) -> Result<(), TunnelError> {
		let allowed = peer_allowed_ips(allowed_ips, server_peer_ip);
		debug!(interface = %self.name, %allowed, "updating allowed addresses");
		self
			.run(
				"update allowed addresses",
				"wg",
				&["set", &self.name, "peer", server_public_key, "allowed-ips", &allowed],
			)
			.await?;
		Ok(())
	}

	#[instrument(skip(self), fields(interface = %self.name))]
	pub async fn tear_down(&self) -> Result<(), TunnelError> {
		self
			.run("delete interface", "ip", &["link", "delete", "dev", &self.name])
			.await?;
		info!("interface removed");
		Ok(())
	}

	async fn run(&self, operation: &str, program: &str, args: &[&str]) -> Result<String, TunnelError> {
		run_checked(self.runner.as_ref(), operation, program, args).await
	}
}

/// Member addresses plus the server's own tunnel address, each as a host route.
pub fn peer_allowed_ips(allowed_ips: &[Ipv4Addr], server_peer_ip: Ipv4Addr) -> String {
	let mut ips: Vec<Ipv4Addr> = allowed_ips.to_vec();
	if !ips.contains(&server_peer_ip) {
		ips.push(server_peer_ip);
	}
	format_allowed_ips(&ips)
}
