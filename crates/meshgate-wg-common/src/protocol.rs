// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! JSON bodies exchanged on the control plane.
//!
//! Field names are camelCase on the wire (`publicKey`, `allowedIPs`, ...) to
//! stay compatible with existing clients.

use meshgate_common_secret::SecretString;
use serde::{Deserialize, Serialize};
use std::net::Ipv4Addr;

pub const REGISTER_PATH: &str = "/register";
pub const UNREGISTER_PATH: &str = "/unregister";
pub const HEARTBEAT_PATH: &str = "/beat";

/// Default control-plane port.
pub const DEFAULT_HTTP_PORT: u16 = 38490;

#[derive(Debug, Deserialize)]
pub struct RegistrationRequest {
	#[serde(rename = "publicKey", alias = "PublicKey")]
	pub public_key: String,
	#[serde(default, alias = "Password")]
	pub password: SecretString,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrationReply {
	#[serde(rename = "nodeIp")]
	pub node_ip: Ipv4Addr,
	/// Prefix length of the VPN subnet, as a decimal string.
	#[serde(rename = "nodeCIDR")]
	pub node_cidr: String,
	#[serde(rename = "endpointIPPortPair")]
	pub endpoint_ip_port_pair: String,
	#[serde(rename = "allowedIPs")]
	pub allowed_ips: Vec<Ipv4Addr>,
	#[serde(rename = "serverPublicKey")]
	pub server_public_key: String,
	#[serde(rename = "serverPeerIp")]
	pub server_peer_ip: Ipv4Addr,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeregistrationRequest {
	#[serde(rename = "publicKey", alias = "PublicKey")]
	pub public_key: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeartbeatRequest {
	#[serde(rename = "publicKey", alias = "PublicKey")]
	pub public_key: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeartbeatReply {
	#[serde(rename = "allowedIPs")]
	pub allowed_ips: Vec<Ipv4Addr>,
}

/// Renders addresses as a `wg set ... allowed-ips` argument: `a/32,b/32`.
pub fn format_allowed_ips<'a>(ips: impl IntoIterator<Item = &'a Ipv4Addr>) -> String {
	ips
		.into_iter()
		.map(|ip| format!("{ip}/32"))
		.collect::<Vec<_>>()
		.join(",")
}
