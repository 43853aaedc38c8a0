// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use crate::runner::{run_checked, CommandRunner};
use meshgate_server_registry::TunnelError;
use std::net::Ipv4Addr;
use tracing::{debug, instrument};

/// First IPv4 address configured on `interface`.
#[instrument(skip(runner))]
pub async fn uplink_ipv4(runner: &dyn CommandRunner, interface: &str) -> Result<Ipv4Addr, TunnelError> {
	let output = run_checked(
		runner,
		"resolve uplink address",
		"ip",
		&["-4", "-o", "address", "show", "dev", interface],
	)
	.await?;

	let address = parse_ipv4_address(&output).ok_or_else(|| {
		TunnelError::program(
			"resolve uplink address",
			format!("interface {interface} has no IPv4 address"),
		)
	})?;

	debug!(%address, "resolved uplink address");
	Ok(address)
}

/// Extracts the address from the first `inet a.b.c.d/p` token of
/// `ip -4 -o address show` output.
pub fn parse_ipv4_address(output: &str) -> Option<Ipv4Addr> {
	output.lines().find_map(|line| {
		let mut tokens = line.split_whitespace();
		tokens.find(|t| *t == "inet")?;
		let cidr = tokens.next()?;
		let address = cidr.split('/').next()?;
		address.parse().ok()
	})
}
