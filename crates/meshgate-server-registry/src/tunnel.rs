// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use crate::error::TunnelError;
use async_trait::async_trait;
use std::net::Ipv4Addr;

/// Programs peers on the server's tunnel interface.
///
/// Each call either fully applies or returns an error. Removing a peer that is
/// not configured is not an error for the registry to handle; implementations
/// report whatever the underlying tool reports.
#[async_trait]
pub trait TunnelController: Send + Sync {
	async fn add_peer(&self, public_key: &str, address: Ipv4Addr) -> Result<(), TunnelError>;

	async fn remove_peer(&self, public_key: &str) -> Result<(), TunnelError>;
}
