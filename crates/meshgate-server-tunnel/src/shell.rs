// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use crate::runner::{run_checked, CommandRunner};
use async_trait::async_trait;
use meshgate_server_registry::{TunnelController, TunnelError};
use std::ffi::OsStr;
use std::net::Ipv4Addr;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Programs that must be on `PATH` before any interface work starts.
pub const REQUIRED_TOOLS: &[&str] = &["ip", "wg"];

/// Checks that every tool in [`REQUIRED_TOOLS`] resolves on the process `PATH`.
pub fn preflight() -> Result<(), TunnelError> {
	let path = std::env::var_os("PATH").unwrap_or_default();
	preflight_in(&path)
}

fn preflight_in(path: &OsStr) -> Result<(), TunnelError> {
	for tool in REQUIRED_TOOLS {
		let found = std::env::split_paths(path).any(|dir| dir.join(tool).is_file());
		if !found {
			return Err(TunnelError::MissingTool(tool.to_string()));
		}
	}
	Ok(())
}

/// Server-side WireGuard interface settings.
#[derive(Debug, Clone)]
pub struct InterfaceSpec {
	pub name: String,
	pub address: Ipv4Addr,
	pub prefix_len: u8,
	pub listen_port: u16,
	pub private_key_path: PathBuf,
	/// Shell snippet run through `sh -c` once the interface is up.
	pub post_up: Option<String>,
	/// Shell snippet run through `sh -c` after the interface is deleted.
	pub post_down: Option<String>,
}

pub struct ShellTunnelController {
	runner: Arc<dyn CommandRunner>,
	spec: InterfaceSpec,
}

impl ShellTunnelController {
	pub fn new(spec: InterfaceSpec, runner: Arc<dyn CommandRunner>) -> Self {
		Self { runner, spec }
	}

	pub fn spec(&self) -> &InterfaceSpec {
		&self.spec
	}

	#[instrument(skip(self), fields(interface = %self.spec.name, address = %self.spec.address))]
	pub async fn create_interface(&self) -> Result<(), TunnelError> {
		let name = self.spec.name.as_str();
		let cidr = format!("{}/{}", self.spec.address, self.spec.prefix_len);
		let port = self.spec.listen_port.to_string();
		let key_path = self.spec.private_key_path.to_string_lossy();

		self
			.run("create interface", "ip", &["link", "add", "dev", name, "type", "wireguard"])
			.await?;
		self
			.run("assign address", "ip", &["-4", "address", "add", &cidr, "dev", name])
			.await?;
		self
			.run(
				"configure interface",
				"wg",
				&["set", name, "listen-port", &port, "private-key", &key_path],
			)
			.await?;
		self
			.run("bring interface up", "ip", &["link", "set", "up", "dev", name])
			.await?;

		if let Some(post_up) = self.spec.post_up.as_deref().filter(|s| !s.trim().is_empty()) {
			self.run("post-up hook", "sh", &["-c", post_up]).await?;
		}

		info!(listen_port = self.spec.listen_port, "tunnel interface up");
		Ok(())
	}

	/// Deletes the interface and runs the post-down hook. The hook runs even
	/// if the delete fails; the first error is returned.
	#[instrument(skip(self), fields(interface = %self.spec.name))]
	pub async fn destroy_interface(&self) -> Result<(), TunnelError> {
		let name = self.spec.name.as_str();

		let deleted = self
			.run("delete interface", "ip", &["link", "delete", "dev", name, "type", "wireguard"])
			.await;
		if let Err(e) = &deleted {
			warn!(error = %e, "failed to delete tunnel interface");
		}

		let hook = match self.spec.post_down.as_deref().filter(|s| !s.trim().is_empty()) {
			Some(post_down) => self.run("post-down hook", "sh", &["-c", post_down]).await.map(|_| ()),
			None => Ok(()),
		};

		deleted?;
		hook?;

		info!("tunnel interface removed");
		Ok(())
	}

	async fn run(&self, operation: &str, program: &str, args: &[&str]) -> Result<String, TunnelError> {
		run_checked(self.runner.as_ref(), operation, program, args).await
	}
}

#[async_trait]
impl TunnelController for ShellTunnelController {
	#[instrument(skip(self, public_key), fields(interface = %self.spec.name, public_key = %public_key))]
	async fn add_peer(&self, public_key: &str, address: Ipv4Addr) -> Result<(), TunnelError> {
		let allowed = format!("{address}/32");
		self
			.run(
				"add peer",
				"wg",
				&["set", &self.spec.name, "peer", public_key, "allowed-ips", &allowed],
			)
			.await?;
		debug!(%address, "peer added");
		Ok(())
	}

	#[instrument(skip(self, public_key), fields(interface = %self.spec.name, public_key = %public_key))]
	async fn remove_peer(&self, public_key: &str) -> Result<(), TunnelError> {
		self
			.run("remove peer", "wg", &["set", &self.spec.name, "peer", public_key, "remove"])
			.await?;
		debug!("peer removed");
		Ok(())
	}
}
