// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Leasable VPN addresses.

use crate::error::PoolError;
use ipnet::Ipv4Net;
use std::collections::BTreeMap;
use std::net::Ipv4Addr;
use tracing::debug;

/// Smallest accepted prefix. Larger subnets would allocate a lease entry per
/// host up front.
pub const MIN_PREFIX_LEN: u8 = 16;
/// Largest accepted prefix; `/31` and `/32` have no host addresses.
pub const MAX_PREFIX_LEN: u8 = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Lease {
	pub address: Ipv4Addr,
	pub prefix_len: u8,
}

/// Source of per-node addresses.
///
/// Callers serialize access; implementations need no interior locking.
pub trait AddressPool: Send {
	/// Reserves an unleased address. Never returns an address that is already
	/// leased or outside the pool.
	fn lease(&mut self) -> Result<Lease, PoolError>;

	/// Returns an address to the pool. Releasing a free address is a no-op.
	fn release(&mut self, address: Ipv4Addr) -> Result<(), PoolError>;

	/// Address reserved for the server's own tunnel endpoint. Never leased.
	fn server_address(&self) -> Ipv4Addr;

	fn prefix_len(&self) -> u8;

	/// Number of leasable addresses, leased or not.
	fn capacity(&self) -> usize;

	fn available(&self) -> usize;

	fn is_leased(&self, address: Ipv4Addr) -> bool;
}

/// Pool over the host range of an IPv4 subnet.
///
/// The network base address is reserved for the server; every address strictly
/// between it and the broadcast address is leasable. Leases are handed out
/// lowest address first.
#[derive(Debug, Clone)]
pub struct SubnetPool {
	network: Ipv4Net,
	leases: BTreeMap<Ipv4Addr, bool>,
}

impl SubnetPool {
	pub fn from_cidr(cidr: &str) -> Result<Self, PoolError> {
		let parsed: Ipv4Net = cidr
			.trim()
			.parse()
			.map_err(|e| PoolError::InvalidSubnet(format!("{cidr}: {e}")))?;
		Self::new(parsed)
	}

	pub fn new(network: Ipv4Net) -> Result<Self, PoolError> {
		let network = network.trunc();
		let prefix_len = network.prefix_len();

		if !(MIN_PREFIX_LEN..=MAX_PREFIX_LEN).contains(&prefix_len) {
			return Err(PoolError::InvalidSubnet(format!(
				"{network}: prefix must be between /{MIN_PREFIX_LEN} and /{MAX_PREFIX_LEN}"
			)));
		}

		let leases: BTreeMap<Ipv4Addr, bool> = network.hosts().map(|ip| (ip, false)).collect();

		debug!(%network, capacity = leases.len(), "built address pool");

		Ok(Self { network, leases })
	}

	pub fn network(&self) -> Ipv4Net {
		self.network
	}

	pub fn leased_addresses(&self) -> impl Iterator<Item = Ipv4Addr> + '_ {
		self
			.leases
			.iter()
			.filter(|(_, leased)| **leased)
			.map(|(ip, _)| *ip)
	}
}

impl AddressPool for SubnetPool {
	fn lease(&mut self) -> Result<Lease, PoolError> {
		let (address, leased) = self
			.leases
			.iter_mut()
			.find(|(_, leased)| !**leased)
			.ok_or(PoolError::Exhausted)?;
		*leased = true;

		Ok(Lease {
			address: *address,
			prefix_len: self.network.prefix_len(),
		})
	}

	fn release(&mut self, address: Ipv4Addr) -> Result<(), PoolError> {
		match self.leases.get_mut(&address) {
			Some(leased) => {
				*leased = false;
				Ok(())
			}
			None => Err(PoolError::UnknownAddress(address)),
		}
	}

	fn server_address(&self) -> Ipv4Addr {
		self.network.network()
	}

	fn prefix_len(&self) -> u8 {
		self.network.prefix_len()
	}

	fn capacity(&self) -> usize {
		self.leases.len()
	}

	fn available(&self) -> usize {
		self.leases.values().filter(|leased| !**leased).count()
	}

	fn is_leased(&self, address: Ipv4Addr) -> bool {
		self.leases.get(&address).copied().unwrap_or(false)
	}
}
