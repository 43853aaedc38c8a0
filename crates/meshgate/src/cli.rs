// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use clap::{Args, Parser, Subcommand};
use meshgate_client::{ClientOptions, DEFAULT_SERVICE_TYPE};
use meshgate_common_secret::SecretString;
use meshgate_server_config::{
	AuthConfigLayer, DiscoveryConfigLayer, HttpConfigLayer, RegistryConfigLayer, ServerConfigLayer,
	TunnelConfigLayer,
};
use std::path::PathBuf;
use std::time::Duration;

/// meshgate - ad-hoc WireGuard VPN for the local network.
#[derive(Parser, Debug)]
#[command(name = "meshgate", about = "Ad-hoc WireGuard VPN for the local network", version)]
pub struct Cli {
	#[command(subcommand)]
	pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
	/// Run the VPN server: lease addresses, admit nodes, evict silent ones
	Server(ServerArgs),
	/// Find a server on the local network and join its VPN
	Client(ClientArgs),
	/// Show version and build information
	Version,
}

/// Flags override the config file and `MESHGATE_*` environment variables.
#[derive(Args, Debug, Default)]
pub struct ServerArgs {
	/// Config file (default: /etc/meshgate/server.toml)
	#[arg(long)]
	pub config: Option<PathBuf>,

	/// Uplink network interface; its IPv4 address is the VPN endpoint
	#[arg(long)]
	pub interface: Option<String>,

	/// Name for the WireGuard interface
	#[arg(long)]
	pub wg_interface: Option<String>,

	/// WireGuard listen port
	#[arg(long)]
	pub wg_port: Option<u16>,

	/// IPv4 subnet for the VPN; the server takes its network address
	#[arg(long)]
	pub wg_cidr: Option<String>,

	/// Control-plane HTTPS port
	#[arg(long)]
	pub http_port: Option<u16>,

	/// Password nodes present when registering
	#[arg(long)]
	pub vpn_password: Option<String>,

	/// Seconds between sweeps, also used as the liveness deadline
	#[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
	pub purge_interval: Option<u64>,

	/// Description published with the mDNS advertisement
	#[arg(long, alias = "http-service-description")]
	pub service_description: Option<String>,
}

impl ServerArgs {
	/// The highest-precedence configuration layer.
	pub fn to_layer(&self) -> ServerConfigLayer {
		ServerConfigLayer {
			http: Some(HttpConfigLayer {
				host: None,
				port: self.http_port,
			}),
			tunnel: Some(TunnelConfigLayer {
				interface: self.interface.clone(),
				wg_interface: self.wg_interface.clone(),
				wg_port: self.wg_port,
				cidr: self.wg_cidr.clone(),
				..Default::default()
			}),
			registry: Some(RegistryConfigLayer {
				deadline_secs: self.purge_interval,
				sweep_interval_secs: self.purge_interval,
			}),
			auth: Some(AuthConfigLayer {
				password: self.vpn_password.clone().map(SecretString::new),
			}),
			discovery: Some(DiscoveryConfigLayer {
				description: self.service_description.clone(),
				..Default::default()
			}),
			..Default::default()
		}
	}
}

#[derive(Args, Debug)]
pub struct ClientArgs {
	/// Name for the local WireGuard interface
	#[arg(long, env = "MESHGATE_CLIENT_WG_INTERFACE", default_value = "wg0")]
	pub wg_interface: String,

	/// mDNS service type to browse for
	#[arg(long, env = "MESHGATE_CLIENT_SERVICE_TYPE", default_value = DEFAULT_SERVICE_TYPE)]
	pub service_type: String,

	/// Seconds to wait for mDNS answers
	#[arg(
		long,
		env = "MESHGATE_CLIENT_DISCOVERY_TIMEOUT_SECS",
		default_value_t = 3,
		value_parser = clap::value_parser!(u64).range(1..)
	)]
	pub discovery_timeout_secs: u64,

	/// Seconds between heartbeats
	#[arg(
		long,
		env = "MESHGATE_CLIENT_HEARTBEAT_SECS",
		default_value_t = 5,
		value_parser = clap::value_parser!(u64).range(1..)
	)]
	pub heartbeat_secs: u64,

	/// VPN password; prompted for when absent
	#[arg(long, env = "MESHGATE_CLIENT_PASSWORD", hide_env_values = true)]
	pub password: Option<String>,
}

impl ClientArgs {
	pub fn to_options(&self) -> ClientOptions {
		ClientOptions {
			wg_interface: self.wg_interface.clone(),
			service_type: self.service_type.clone(),
			discovery_timeout: Duration::from_secs(self.discovery_timeout_secs),
			heartbeat_interval: Duration::from_secs(self.heartbeat_secs),
			password: self.password.clone().map(SecretString::new),
		}
	}
}
