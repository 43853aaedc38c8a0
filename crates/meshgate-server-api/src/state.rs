// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use meshgate_common_secret::SecretString;
use meshgate_server_registry::NodeRegistry;
use meshgate_wg_common::WgPublicKey;
use std::net::SocketAddrV4;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
	pub registry: Arc<NodeRegistry>,
	/// Public WireGuard endpoint clients connect their tunnel to.
	pub endpoint: SocketAddrV4,
	pub server_public_key: WgPublicKey,
	pub password: SecretString,
}

impl AppState {
	pub fn new(
		registry: Arc<NodeRegistry>,
		endpoint: SocketAddrV4,
		server_public_key: WgPublicKey,
		password: SecretString,
	) -> Self {
		Self {
			registry,
			endpoint,
			server_public_key,
			password,
		}
	}
}
