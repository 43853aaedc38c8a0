// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use crate::error::{RegistryError, Result};
use crate::node::Node;
use crate::pool::AddressPool;
use crate::tunnel::TunnelController;
use std::collections::HashMap;
use std::net::Ipv4Addr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, info, instrument, warn};

/// Result of a successful admission.
///
/// `allowed_ips` is read in the same critical section as the insert, so it
/// always contains the new node's own address.
#[derive(Debug, Clone)]
pub struct Admission {
	pub node: Node,
	pub allowed_ips: Vec<Ipv4Addr>,
}

#[derive(Debug, Default)]
pub struct SweepReport {
	pub evicted: Vec<Node>,
	pub failures: Vec<(String, RegistryError)>,
}

struct Inner {
	nodes: HashMap<String, Node>,
	pool: Box<dyn AddressPool>,
}

impl Inner {
	fn allowed_ips(&self) -> Vec<Ipv4Addr> {
		let mut ips: Vec<Ipv4Addr> = self.nodes.values().map(|n| n.address).collect();
		ips.sort();
		ips
	}
}

/// Membership state of the mesh.
///
/// Node map, address pool and tunnel programming share one lock: every
/// operation below is a critical section relative to every other, and tunnel
/// calls are awaited while it is held.
pub struct NodeRegistry {
	inner: Mutex<Inner>,
	tunnel: Arc<dyn TunnelController>,
	server_address: Ipv4Addr,
	prefix_len: u8,
}

impl NodeRegistry {
	pub fn new(pool: Box<dyn AddressPool>, tunnel: Arc<dyn TunnelController>) -> Self {
		let server_address = pool.server_address();
		let prefix_len = pool.prefix_len();
		Self {
			inner: Mutex::new(Inner {
				nodes: HashMap::new(),
				pool,
			}),
			tunnel,
			server_address,
			prefix_len,
		}
	}

	pub fn server_address(&self) -> Ipv4Addr {
		self.server_address
	}

	pub fn prefix_len(&self) -> u8 {
		self.prefix_len
	}

	/// Admits a new node: lease, program the tunnel, then record.
	///
	/// A tunnel failure releases the lease again, leaving no trace of the
	/// attempt.
	#[instrument(skip(self, public_key), fields(public_key = %public_key))]
	pub async fn admit(&self, public_key: &str) -> Result<Admission> {
		let mut inner = self.inner.lock().await;

		if inner.nodes.contains_key(public_key) {
			return Err(RegistryError::DuplicateIdentity(public_key.to_string()));
		}

		let lease = inner.pool.lease()?;

		if let Err(e) = self.tunnel.add_peer(public_key, lease.address).await {
			warn!(error = %e, address = %lease.address, "tunnel rejected peer, releasing lease");
			if let Err(release_err) = inner.pool.release(lease.address) {
				warn!(error = %release_err, address = %lease.address, "failed to release lease after tunnel error");
			}
			return Err(e.into());
		}

		let node = Node::new(public_key.to_string(), lease.address, lease.prefix_len);
		inner.nodes.insert(public_key.to_string(), node.clone());

		info!(address = %node.address, nodes = inner.nodes.len(), "node admitted");

		Ok(Admission {
			node,
			allowed_ips: inner.allowed_ips(),
		})
	}

	/// Refreshes liveness and returns the current allowed-address list.
	#[instrument(skip(self, public_key), fields(public_key = %public_key))]
	pub async fn touch(&self, public_key: &str) -> Result<Vec<Ipv4Addr>> {
		let mut inner = self.inner.lock().await;

		let node = inner
			.nodes
			.get_mut(public_key)
			.ok_or_else(|| RegistryError::UnknownIdentity(public_key.to_string()))?;
		node.beat();

		debug!("heartbeat");

		Ok(inner.allowed_ips())
	}

	/// Removes a node. If the tunnel refuses, the node stays admitted and its
	/// address stays leased.
	#[instrument(skip(self, public_key), fields(public_key = %public_key))]
	pub async fn remove(&self, public_key: &str) -> Result<Node> {
		let mut inner = self.inner.lock().await;
		let node = self.remove_locked(&mut inner, public_key).await?;

		info!(address = %node.address, nodes = inner.nodes.len(), "node removed");

		Ok(node)
	}

	async fn remove_locked(&self, inner: &mut Inner, public_key: &str) -> Result<Node> {
		if !inner.nodes.contains_key(public_key) {
			return Err(RegistryError::UnknownIdentity(public_key.to_string()));
		}

		self.tunnel.remove_peer(public_key).await?;

		let node = inner
			.nodes
			.remove(public_key)
			.ok_or_else(|| RegistryError::UnknownIdentity(public_key.to_string()))?;

		// The peer is gone from the tunnel, so the entry goes regardless.
		if let Err(e) = inner.pool.release(node.address) {
			warn!(error = %e, address = %node.address, "failed to release address");
		}

		Ok(node)
	}

	/// Evicts every node silent for longer than `deadline`.
	///
	/// Per-node failures are logged and collected; the pass always visits
	/// every expired node.
	#[instrument(skip(self, deadline), fields(deadline_secs = deadline.as_secs()))]
	pub async fn sweep(&self, deadline: Duration) -> SweepReport {
		let mut inner = self.inner.lock().await;
		let now = Instant::now();

		let expired: Vec<String> = inner
			.nodes
			.values()
			.filter(|n| n.is_expired(now, deadline))
			.map(|n| n.public_key.clone())
			.collect();

		let mut report = SweepReport::default();

		for public_key in expired {
			match self.remove_locked(&mut inner, &public_key).await {
				Ok(node) => {
					info!(public_key = %node.public_key, address = %node.address, "evicted stale node");
					report.evicted.push(node);
				}
				Err(e) => {
					warn!(error = %e, %public_key, "failed to evict stale node");
					report.failures.push((public_key, e));
				}
			}
		}

		if !report.evicted.is_empty() || !report.failures.is_empty() {
			debug!(
				evicted = report.evicted.len(),
				failed = report.failures.len(),
				"sweep pass complete"
			);
		}

		report
	}

	pub async fn get(&self, public_key: &str) -> Result<Node> {
		let inner = self.inner.lock().await;
		inner
			.nodes
			.get(public_key)
			.cloned()
			.ok_or_else(|| RegistryError::UnknownIdentity(public_key.to_string()))
	}

	/// Addresses of every admitted node, ascending.
	pub async fn list_addresses(&self) -> Vec<Ipv4Addr> {
		self.inner.lock().await.allowed_ips()
	}

	pub async fn len(&self) -> usize {
		self.inner.lock().await.nodes.len()
	}

	pub async fn is_empty(&self) -> bool {
		self.len().await == 0
	}

	pub async fn is_leased(&self, address: Ipv4Addr) -> bool {
		self.inner.lock().await.pool.is_leased(address)
	}

	pub async fn available_addresses(&self) -> usize {
		self.inner.lock().await.pool.available()
	}

	#[cfg(test)]
	pub(crate) async fn set_last_seen(&self, public_key: &str, last_seen: Instant) {
		if let Some(node) = self.inner.lock().await.nodes.get_mut(public_key) {
			node.last_seen = last_seen;
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::error::PoolError;
	use crate::pool::SubnetPool;
	use crate::testing::{FakeTunnel, TunnelCall};

	fn registry(cidr: &str) -> (NodeRegistry, Arc<FakeTunnel>) {
		let tunnel = Arc::new(FakeTunnel::new());
		let pool = SubnetPool::from_cidr(cidr).unwrap();
		(NodeRegistry::new(Box::new(pool), tunnel.clone()), tunnel)
	}

	#[tokio::test]
	async fn admit_leases_and_programs_tunnel() {
		let (registry, tunnel) = registry("10.24.1.0/24");

		let admission = registry.admit("alice").await.unwrap();
		assert_eq!(admission.node.address, Ipv4Addr::new(10, 24, 1, 1));
		assert_eq!(admission.node.prefix_len, 24);
		assert_eq!(admission.allowed_ips, vec![Ipv4Addr::new(10, 24, 1, 1)]);
		assert_eq!(
			tunnel.calls(),
			vec![TunnelCall::Add("alice".into(), Ipv4Addr::new(10, 24, 1, 1))]
		);
		assert!(registry.is_leased(admission.node.address).await);
	}

	#[tokio::test]
	async fn duplicate_admit_keeps_original() {
		let (registry, _) = registry("10.24.1.0/24");

		let first = registry.admit("alice").await.unwrap();
		let err = registry.admit("alice").await.unwrap_err();
		assert!(matches!(err, RegistryError::DuplicateIdentity(ref k) if k == "alice"));
		assert_eq!(err.to_string(), "Node with pubkey alice already exists");

		assert_eq!(registry.len().await, 1);
		assert_eq!(registry.get("alice").await.unwrap().address, first.node.address);
	}

	#[tokio::test]
	async fn admit_on_exhausted_pool_changes_nothing() {
		let (registry, tunnel) = registry("192.168.1.0/30");

		registry.admit("a").await.unwrap();
		registry.admit("b").await.unwrap();
		let err = registry.admit("c").await.unwrap_err();

		assert!(matches!(err, RegistryError::Pool(PoolError::Exhausted)));
		assert_eq!(registry.len().await, 2);
		assert_eq!(tunnel.calls().len(), 2);
	}

	#[tokio::test]
	async fn tunnel_failure_on_admit_releases_lease() {
		let (registry, tunnel) = registry("10.24.1.0/24");
		tunnel.fail_next_add();

		let err = registry.admit("alice").await.unwrap_err();
		assert!(matches!(err, RegistryError::Tunnel(_)));
		assert!(registry.is_empty().await);
		assert!(!registry.is_leased(Ipv4Addr::new(10, 24, 1, 1)).await);

		let admission = registry.admit("alice").await.unwrap();
		assert_eq!(admission.node.address, Ipv4Addr::new(10, 24, 1, 1));
	}

	#[tokio::test]
	async fn touch_only_refreshes_liveness() {
		let (registry, tunnel) = registry("10.24.1.0/24");
		registry.admit("alice").await.unwrap();
		let before = registry.get("alice").await.unwrap();
		let stale = before.last_seen - Duration::from_secs(5);
		registry.set_last_seen("alice", stale).await;

		let allowed = registry.touch("alice").await.unwrap();
		let after = registry.get("alice").await.unwrap();

		assert_eq!(allowed, vec![before.address]);
		assert_eq!(after.address, before.address);
		assert_eq!(after.public_key, before.public_key);
		assert!(after.last_seen > stale);
		assert_eq!(tunnel.calls().len(), 1);
	}

	#[tokio::test]
	async fn touch_unknown_fails() {
		let (registry, _) = registry("10.24.1.0/24");
		assert!(matches!(
			registry.touch("ghost").await,
			Err(RegistryError::UnknownIdentity(_))
		));
	}

	#[tokio::test]
	async fn remove_then_get_is_unknown() {
		let (registry, tunnel) = registry("10.24.1.0/24");
		let admission = registry.admit("alice").await.unwrap();

		let removed = registry.remove("alice").await.unwrap();
		assert_eq!(removed.address, admission.node.address);
		assert!(matches!(
			registry.get("alice").await,
			Err(RegistryError::UnknownIdentity(_))
		));
		assert!(!registry.is_leased(removed.address).await);
		assert_eq!(tunnel.calls().last(), Some(&TunnelCall::Remove("alice".into())));
	}

	#[tokio::test]
	async fn remove_unknown_leaves_size_unchanged() {
		let (registry, tunnel) = registry("10.24.1.0/24");
		registry.admit("alice").await.unwrap();

		assert!(matches!(
			registry.remove("ghost").await,
			Err(RegistryError::UnknownIdentity(_))
		));
		assert_eq!(registry.len().await, 1);
		assert_eq!(tunnel.calls().len(), 1);
	}

	#[tokio::test]
	async fn tunnel_failure_on_remove_keeps_node() {
		let (registry, tunnel) = registry("10.24.1.0/24");
		let admission = registry.admit("alice").await.unwrap();
		tunnel.fail_next_remove();

		assert!(matches!(
			registry.remove("alice").await,
			Err(RegistryError::Tunnel(_))
		));
		assert_eq!(registry.get("alice").await.unwrap(), admission.node);
		assert!(registry.is_leased(admission.node.address).await);
	}

	#[tokio::test]
	async fn list_addresses_tracks_membership() {
		let (registry, _) = registry("10.24.1.0/24");
		for key in ["a", "b", "c"] {
			registry.admit(key).await.unwrap();
		}
		registry.remove("b").await.unwrap();

		let addresses = registry.list_addresses().await;
		assert_eq!(addresses.len(), registry.len().await);
		assert_eq!(
			addresses,
			vec![Ipv4Addr::new(10, 24, 1, 1), Ipv4Addr::new(10, 24, 1, 3)]
		);
		for address in addresses {
			assert!(registry.is_leased(address).await);
		}
	}

	#[tokio::test]
	async fn sweep_evicts_only_expired() {
		let (registry, _) = registry("10.24.1.0/24");
		registry.admit("stale").await.unwrap();
		let fresh = registry.admit("fresh").await.unwrap();
		let now = Instant::now();
		registry
			.set_last_seen("stale", now - Duration::from_secs(30))
			.await;

		let report = registry.sweep(Duration::from_secs(10)).await;

		assert_eq!(report.evicted.len(), 1);
		assert_eq!(report.evicted[0].public_key, "stale");
		assert!(report.failures.is_empty());
		assert_eq!(registry.get("fresh").await.unwrap().address, fresh.node.address);
		assert!(registry.get("stale").await.is_err());
	}

	#[tokio::test]
	async fn sweep_continues_past_failures() {
		let (registry, tunnel) = registry("10.24.1.0/24");
		registry.admit("a").await.unwrap();
		registry.admit("b").await.unwrap();
		let past = Instant::now() - Duration::from_secs(30);
		registry.set_last_seen("a", past).await;
		registry.set_last_seen("b", past).await;
		tunnel.fail_next_remove();

		let report = registry.sweep(Duration::from_secs(10)).await;

		assert_eq!(report.evicted.len(), 1);
		assert_eq!(report.failures.len(), 1);
		assert_eq!(registry.len().await, 1);

		// The survivor is still expired and goes on the next pass.
		let report = registry.sweep(Duration::from_secs(10)).await;
		assert_eq!(report.evicted.len(), 1);
		assert!(registry.is_empty().await);
	}

	#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
	async fn parallel_admits_stay_consistent() {
		use std::collections::HashSet;

		let (registry, tunnel) = registry("10.24.1.0/27");
		let registry = Arc::new(registry);

		// 35 identities over 40 calls on a pool of 30 addresses.
		let tasks: Vec<_> = (0..40)
			.map(|i| {
				let registry = registry.clone();
				let key = format!("k{}", i % 35);
				tokio::spawn(async move { (key.clone(), registry.admit(&key).await) })
			})
			.collect();

		let mut admitted = Vec::new();
		let mut rejected = 0;
		for task in tasks {
			let (key, result) = task.await.unwrap();
			match result {
				Ok(admission) => admitted.push((key, admission.node.address)),
				Err(RegistryError::DuplicateIdentity(_)) | Err(RegistryError::Pool(PoolError::Exhausted)) => {
					rejected += 1
				}
				Err(e) => panic!("unexpected error: {e}"),
			}
		}

		assert_eq!(admitted.len(), 30);
		assert_eq!(rejected, 10);

		let keys: HashSet<&String> = admitted.iter().map(|(k, _)| k).collect();
		assert_eq!(keys.len(), 30, "an identity was admitted twice");
		let addresses: HashSet<Ipv4Addr> = admitted.iter().map(|(_, a)| *a).collect();
		assert_eq!(addresses.len(), 30, "an address was leased twice");

		assert_eq!(registry.len().await, 30);
		assert_eq!(registry.available_addresses().await, 0);
		for (key, address) in &admitted {
			assert_eq!(registry.get(key).await.unwrap().address, *address);
			assert!(registry.is_leased(*address).await);
		}

		let mut expected: Vec<Ipv4Addr> = addresses.into_iter().collect();
		expected.sort();
		assert_eq!(registry.list_addresses().await, expected);

		let peers: HashSet<String> = tunnel.peers().into_iter().collect();
		let admitted_keys: HashSet<String> = admitted.into_iter().map(|(k, _)| k).collect();
		assert_eq!(peers, admitted_keys);
	}
}
