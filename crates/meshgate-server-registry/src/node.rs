// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::net::Ipv4Addr;
use std::time::Duration;
use tokio::time::Instant;

/// An admitted member of the mesh.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
	pub public_key: String,
	pub address: Ipv4Addr,
	pub prefix_len: u8,
	pub last_seen: Instant,
}

impl Node {
	pub fn new(public_key: String, address: Ipv4Addr, prefix_len: u8) -> Self {
		Self {
			public_key,
			address,
			prefix_len,
			last_seen: Instant::now(),
		}
	}

	pub fn beat(&mut self) {
		self.last_seen = Instant::now();
	}

	/// A node is expired once strictly more than `deadline` has passed since
	/// its last heartbeat. A `last_seen` in the future is never expired.
	pub fn is_expired(&self, now: Instant, deadline: Duration) -> bool {
		now.saturating_duration_since(self.last_seen) > deadline
	}
}
